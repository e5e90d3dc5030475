//! Session-scoped key/value store.
//!
//! An [`Environment`] lets chained requests pass data to each other, e.g. a
//! login request storing a token that later requests send as a header.
//! Clones share the same underlying map.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// A thread-safe map from string keys to serializable values.
///
/// # Example
///
/// ```
/// use hyperexpect::Environment;
///
/// let env = Environment::new();
/// env.put("token", "abc123");
/// env.put("user_id", 42);
///
/// assert_eq!(env.get::<String>("token").as_deref(), Some("abc123"));
/// assert_eq!(env.get::<u64>("user_id"), Some(42));
/// assert!(env.get::<u64>("token").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Environment {
    data: Arc<RwLock<HashMap<String, JsonValue>>>,
}

impl Environment {
    /// Create a new, empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under `key`, replacing any previous value.
    ///
    /// Values that cannot be represented as JSON are stored as `null`.
    pub fn put(&self, key: impl Into<String>, value: impl Serialize) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "environment value is not serializable, storing null");
                JsonValue::Null
            }
        };
        self.data.write().insert(key.into(), value);
    }

    /// Fetch the value under `key`, decoded as `T`.
    ///
    /// Returns `None` when the key is missing or the stored value has a
    /// different shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key)?;
        serde_json::from_value(value).ok()
    }

    /// Fetch the raw JSON value under `key`.
    pub fn get_value(&self, key: &str) -> Option<JsonValue> {
        self.data.read().get(key).cloned()
    }

    /// Returns true if `key` is present.
    pub fn has(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Remove `key`, returning whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        self.data.write().remove(key).is_some()
    }

    /// Remove every key.
    pub fn clear(&self) {
        self.data.write().clear();
    }

    /// All keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Returns true if both handles refer to the same store.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_put_get() {
        let env = Environment::new();
        env.put("name", "alice");
        env.put("count", 3);
        env.put("ratio", 0.5);
        env.put("flag", true);

        assert_eq!(env.get::<String>("name"), Some("alice".to_string()));
        assert_eq!(env.get::<i64>("count"), Some(3));
        assert_eq!(env.get::<f64>("ratio"), Some(0.5));
        assert_eq!(env.get::<bool>("flag"), Some(true));
    }

    #[test]
    fn test_get_wrong_type() {
        let env = Environment::new();
        env.put("name", "alice");
        assert_eq!(env.get::<i64>("name"), None);
        assert_eq!(env.get::<String>("missing"), None);
    }

    #[test]
    fn test_duration_roundtrip() {
        let env = Environment::new();
        env.put("timeout", Duration::from_millis(1500));
        assert_eq!(
            env.get::<Duration>("timeout"),
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_has_delete_clear() {
        let env = Environment::new();
        env.put("a", 1);
        env.put("b", 2);
        assert!(env.has("a"));
        assert!(env.delete("a"));
        assert!(!env.delete("a"));
        assert!(!env.has("a"));
        assert_eq!(env.len(), 1);

        env.clear();
        assert!(env.is_empty());
    }

    #[test]
    fn test_keys_sorted() {
        let env = Environment::new();
        env.put("zeta", 1);
        env.put("alpha", 2);
        env.put("mid", 3);
        assert_eq!(env.keys(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_clones_share_state() {
        let env = Environment::new();
        let other = env.clone();
        env.put("token", "t");
        assert_eq!(other.get::<String>("token").as_deref(), Some("t"));
        assert!(env.ptr_eq(&other));
    }

    #[test]
    fn test_independent_environments() {
        let first = Environment::new();
        let second = Environment::new();
        first.put("token", "t");
        assert!(!second.has("token"));
        assert!(!first.ptr_eq(&second));
    }

    #[test]
    fn test_concurrent_puts() {
        let env = Environment::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let env = env.clone();
                std::thread::spawn(move || {
                    for j in 0..100 {
                        env.put(format!("k{i}-{j}"), j);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(env.len(), 800);
    }
}
