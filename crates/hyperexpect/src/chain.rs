//! Assertion chains: path tracking and failure state.
//!
//! Every wrapper in the assertion tree owns a [`Chain`]. The chain carries
//! the immutable [`AssertionPath`] describing how the value was reached,
//! an optional alias, a shared [`ChainContext`] (reporting pipeline plus
//! request/response snapshots), and an explicit [`ChainState`].
//!
//! Children are created with [`Chain::child`] and inherit the parent's
//! state at that moment. Once a chain is `Failed`, every assertion on it is
//! a no-op, so a lineage reports at most one failure.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::failure::{AssertionContext, AssertionFailure, FailureKind, RequestInfo, ResponseInfo};
use crate::reporter::AssertionHandler;

struct PathNode {
    parent: Option<Arc<PathNode>>,
    segment: String,
}

/// An append-only sequence of call segments.
///
/// Appending shares the prefix with the original, so sibling chains never
/// alias each other's suffixes.
#[derive(Clone, Default)]
pub struct AssertionPath {
    tail: Option<Arc<PathNode>>,
}

impl AssertionPath {
    /// The empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// A path with a single root segment.
    pub fn root(segment: impl Into<String>) -> Self {
        Self::new().push(segment)
    }

    /// Return a new path with `segment` appended.
    #[must_use]
    pub fn push(&self, segment: impl Into<String>) -> Self {
        Self {
            tail: Some(Arc::new(PathNode {
                parent: self.tail.clone(),
                segment: segment.into(),
            })),
        }
    }

    /// Segments from root to tail.
    pub fn segments(&self) -> Vec<&str> {
        let mut segments = Vec::new();
        let mut node = self.tail.as_deref();
        while let Some(current) = node {
            segments.push(current.segment.as_str());
            node = current.parent.as_deref();
        }
        segments.reverse();
        segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        let mut len = 0;
        let mut node = self.tail.as_deref();
        while let Some(current) = node {
            len += 1;
            node = current.parent.as_deref();
        }
        len
    }

    /// Returns true for the empty path.
    pub fn is_empty(&self) -> bool {
        self.tail.is_none()
    }
}

impl fmt::Display for AssertionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments().join("."))
    }
}

impl fmt::Debug for AssertionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssertionPath({self})")
    }
}

/// Whether a chain has already failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainState {
    /// No failure so far.
    #[default]
    Ok,
    /// A failure was reported on this lineage.
    Failed,
}

/// Data shared by every chain descending from one request.
#[derive(Clone)]
pub struct ChainContext {
    pub(crate) handler: Arc<dyn AssertionHandler>,
    pub(crate) test_name: Option<String>,
    pub(crate) request_name: Option<String>,
    pub(crate) request: Option<RequestInfo>,
    pub(crate) response: Option<ResponseInfo>,
}

impl ChainContext {
    pub(crate) fn new(handler: Arc<dyn AssertionHandler>) -> Self {
        Self {
            handler,
            test_name: None,
            request_name: None,
            request: None,
            response: None,
        }
    }
}

/// Path, alias, reporting context, and failure state of one wrapper.
#[derive(Clone)]
pub struct Chain {
    context: Arc<ChainContext>,
    path: AssertionPath,
    alias: Option<AssertionPath>,
    state: Cell<ChainState>,
}

impl Chain {
    pub(crate) fn new(context: ChainContext, root: impl Into<String>) -> Self {
        Self {
            context: Arc::new(context),
            path: AssertionPath::root(root),
            alias: None,
            state: Cell::new(ChainState::Ok),
        }
    }

    /// Create a child chain with `segment` appended, inheriting the current state.
    pub(crate) fn child(&self, segment: impl Into<String>) -> Self {
        let segment = segment.into();
        Self {
            context: Arc::clone(&self.context),
            path: self.path.push(segment.clone()),
            alias: self.alias.as_ref().map(|alias| alias.push(segment)),
            state: Cell::new(self.state.get()),
        }
    }

    /// Replace the displayed path prefix with `name`.
    pub(crate) fn set_alias(&mut self, name: impl Into<String>) {
        self.alias = Some(AssertionPath::root(name));
    }

    /// Rebuild the shared context, e.g. to attach a response snapshot.
    pub(crate) fn update_context(&mut self, update: impl FnOnce(&mut ChainContext)) {
        let mut context = (*self.context).clone();
        update(&mut context);
        self.context = Arc::new(context);
    }

    pub(crate) fn context(&self) -> &ChainContext {
        &self.context
    }

    /// Current path.
    pub fn path(&self) -> &AssertionPath {
        &self.path
    }

    /// Current alias path, if any.
    pub fn alias(&self) -> Option<&AssertionPath> {
        self.alias.as_ref()
    }

    /// Current state.
    pub fn state(&self) -> ChainState {
        self.state.get()
    }

    /// Returns true once a failure was reported on this lineage.
    pub fn is_failed(&self) -> bool {
        self.state.get() == ChainState::Failed
    }

    /// Mark failed without reporting; used when a parent already reported.
    pub(crate) fn set_failed(&self) {
        self.state.set(ChainState::Failed);
    }

    fn assertion_context(&self, segment: Option<&str>) -> AssertionContext {
        let (path, alias) = match segment {
            Some(segment) => (
                self.path.push(segment),
                self.alias.as_ref().map(|alias| alias.push(segment)),
            ),
            None => (self.path.clone(), self.alias.clone()),
        };
        AssertionContext {
            test_name: self.context.test_name.clone(),
            request_name: self.context.request_name.clone(),
            path: path.to_string(),
            alias_path: alias.map(|alias| alias.to_string()),
            request: self.context.request.clone(),
            response: self.context.response.clone(),
        }
    }

    /// Report `failure` at the current path and mark this chain failed.
    ///
    /// No-op if the chain already failed.
    pub(crate) fn fail(&self, failure: AssertionFailure) {
        self.report(None, failure);
    }

    /// Report `failure` for the assertion call `segment` and mark this chain failed.
    ///
    /// No-op if the chain already failed.
    pub(crate) fn fail_at(&self, segment: impl AsRef<str>, failure: AssertionFailure) {
        self.report(Some(segment.as_ref()), failure);
    }

    fn report(&self, segment: Option<&str>, failure: AssertionFailure) {
        if self.is_failed() {
            return;
        }
        self.state.set(ChainState::Failed);
        let ctx = self.assertion_context(segment);
        tracing::debug!(path = %ctx.path, kind = ?failure.kind, "assertion failed");
        self.context.handler.failure(&ctx, &failure);
    }

    /// Notify the handler that the assertion call `segment` passed.
    pub(crate) fn pass_at(&self, segment: impl AsRef<str>) {
        let ctx = self.assertion_context(Some(segment.as_ref()));
        self.context.handler.success(&ctx);
    }

    /// Run a check for the assertion `segment`: report its failure or its success.
    ///
    /// `check` is not called when the chain already failed.
    pub(crate) fn check(
        &self,
        segment: impl AsRef<str>,
        check: impl FnOnce() -> Option<AssertionFailure>,
    ) {
        if self.is_failed() {
            return;
        }
        match check() {
            Some(failure) => self.fail_at(segment, failure),
            None => self.pass_at(segment),
        }
    }

    /// Like [`check`](Self::check) for an assertion `method(arg)` taking a
    /// serializable argument.
    ///
    /// An argument that cannot be represented as JSON is reported as
    /// [`FailureKind::InvalidRequest`].
    pub(crate) fn check_arg<T: Serialize>(
        &self,
        method: &str,
        arg: T,
        check: impl FnOnce(JsonValue) -> Option<AssertionFailure>,
    ) {
        self.check_arg_with(
            arg,
            |arg| match arg {
                Some(arg) => format!("{method}({arg})"),
                None => format!("{method}(?)"),
            },
            check,
        );
    }

    /// Like [`check_arg`](Self::check_arg) with the segment rendered by `segment`.
    pub(crate) fn check_arg_with<T: Serialize>(
        &self,
        arg: T,
        segment: impl FnOnce(Option<&JsonValue>) -> String,
        check: impl FnOnce(JsonValue) -> Option<AssertionFailure>,
    ) {
        if self.is_failed() {
            return;
        }
        match serde_json::to_value(arg) {
            Ok(arg) => self.check(segment(Some(&arg)), || check(arg)),
            Err(e) => self.fail_at(
                segment(None),
                AssertionFailure::new(FailureKind::InvalidRequest)
                    .error(format!("argument is not serializable: {e}")),
            ),
        }
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("path", &self.path)
            .field("alias", &self.alias)
            .field("state", &self.state.get())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::chain;
    use super::*;

    #[test]
    fn test_path_push_is_persistent() {
        let root = AssertionPath::root("Request(\"GET\", \"/\")");
        let expect = root.push("expect()");
        let json = expect.push("json()");
        let text = expect.push("text()");

        assert_eq!(root.to_string(), "Request(\"GET\", \"/\")");
        assert_eq!(json.to_string(), "Request(\"GET\", \"/\").expect().json()");
        assert_eq!(text.to_string(), "Request(\"GET\", \"/\").expect().text()");
        assert_eq!(json.len(), 3);
        assert!(AssertionPath::new().is_empty());
    }

    #[test]
    fn test_fail_reports_once() {
        let (chain, reporter) = chain("Value()");
        chain.fail_at("is_equal(1)", AssertionFailure::new(FailureKind::Equal));
        chain.fail_at("is_equal(2)", AssertionFailure::new(FailureKind::Equal));

        assert!(chain.is_failed());
        assert_eq!(reporter.len(), 1);
        assert!(reporter.messages()[0].contains("Value().is_equal(1)"));
    }

    #[test]
    fn test_child_inherits_failure() {
        let (parent, reporter) = chain("Value()");
        parent.fail(AssertionFailure::new(FailureKind::Type));
        let child = parent.child("object()");
        assert!(child.is_failed());
        child.fail(AssertionFailure::new(FailureKind::ContainsKey));
        assert_eq!(reporter.len(), 1);
    }

    #[test]
    fn test_child_failure_does_not_touch_sibling() {
        let (parent, reporter) = chain("Value()");
        let first = parent.child("object()");
        let second = parent.child("array()");
        first.fail(AssertionFailure::new(FailureKind::Type));

        assert!(first.is_failed());
        assert!(!second.is_failed());
        assert!(!parent.is_failed());
        assert_eq!(reporter.len(), 1);
    }

    #[test]
    fn test_alias_replaces_prefix() {
        let (parent, reporter) = chain("Request(\"GET\", \"/user\")");
        let mut user = parent.child("expect()").child("json()");
        user.set_alias("user");
        let id = user.child("value(\"id\")");
        id.fail_at("is_equal(1)", AssertionFailure::new(FailureKind::Equal));

        let message = &reporter.messages()[0];
        assert!(message.contains("assertion: user.value(\"id\").is_equal(1)"));
        assert!(message.contains(
            "full path: Request(\"GET\", \"/user\").expect().json().value(\"id\").is_equal(1)"
        ));
    }

    #[test]
    fn test_check_skips_when_failed() {
        let (chain, reporter) = chain("Value()");
        chain.set_failed();
        let mut called = false;
        chain.check("is_null()", || {
            called = true;
            None
        });
        assert!(!called);
        assert!(reporter.is_empty());
    }
}
