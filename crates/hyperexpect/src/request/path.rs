//! Path templates with `{name}` placeholders.

use crate::error::ExpectError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param { name: String, value: Option<String> },
}

/// A request path such as `/repos/{owner}/{repo}` with its bound values.
///
/// Bound values are percent-encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PathTemplate {
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Split `template` into literals and placeholders.
    pub(crate) fn parse(template: &str) -> Result<Self, ExpectError> {
        let mut segments = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                ExpectError::invalid_request(format!("unterminated placeholder in path {template:?}"))
            })?;
            let name = after[..close].trim();
            if name.is_empty() || name.contains('{') {
                return Err(ExpectError::invalid_request(format!(
                    "invalid placeholder in path {template:?}"
                )));
            }
            segments.push(Segment::Param {
                name: name.to_string(),
                value: None,
            });
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Ok(Self { segments })
    }

    /// Bind the first unbound placeholder.
    pub(crate) fn bind_next(&mut self, value: &str) -> Result<(), ExpectError> {
        let slot = self.segments.iter_mut().find_map(|segment| match segment {
            Segment::Param { value, .. } if value.is_none() => Some(value),
            _ => None,
        });
        match slot {
            Some(slot) => {
                *slot = Some(urlencoding::encode(value).into_owned());
                Ok(())
            }
            None => Err(ExpectError::invalid_request(
                "too many path arguments: every placeholder is already bound",
            )),
        }
    }

    /// Bind every placeholder called `name`, ignoring ASCII case.
    pub(crate) fn bind_name(&mut self, name: &str, value: &str) -> Result<(), ExpectError> {
        let encoded = urlencoding::encode(value).into_owned();
        let mut found = false;
        for segment in &mut self.segments {
            if let Segment::Param { name: param, value } = segment {
                if param.eq_ignore_ascii_case(name) {
                    *value = Some(encoded.clone());
                    found = true;
                }
            }
        }
        if found {
            Ok(())
        } else {
            Err(ExpectError::invalid_request(format!(
                "unknown path parameter {name:?}"
            )))
        }
    }

    /// The path with every placeholder substituted.
    pub(crate) fn render(&self) -> Result<String, ExpectError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Param {
                    value: Some(value), ..
                } => out.push_str(value),
                Segment::Param { name, value: None } => {
                    return Err(ExpectError::invalid_request(format!(
                        "unbound path parameter {name:?}"
                    )))
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_path() {
        let template = PathTemplate::parse("/users").unwrap();
        assert_eq!(template.render().unwrap(), "/users");
    }

    #[test]
    fn test_positional_binding() {
        let mut template = PathTemplate::parse("/repos/{owner}/{repo}").unwrap();
        template.bind_next("octo cat").unwrap();
        template.bind_next("a/b").unwrap();
        assert_eq!(template.render().unwrap(), "/repos/octo%20cat/a%2Fb");
        assert!(template.bind_next("extra").is_err());
    }

    #[test]
    fn test_named_binding_ignores_case() {
        let mut template = PathTemplate::parse("/users/{ID}/posts/{id}").unwrap();
        template.bind_name("id", "7").unwrap();
        assert_eq!(template.render().unwrap(), "/users/7/posts/7");
        assert!(matches!(
            template.bind_name("missing", "x"),
            Err(ExpectError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_unbound_placeholder() {
        let template = PathTemplate::parse("/users/{id}").unwrap();
        let err = template.render().unwrap_err();
        assert!(err.to_string().contains("unbound path parameter \"id\""));
    }

    #[test]
    fn test_malformed_templates() {
        assert!(PathTemplate::parse("/users/{id").is_err());
        assert!(PathTemplate::parse("/users/{}").is_err());
    }
}
