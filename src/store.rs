use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, Instant};

use crate::config::Settings;

/// The Store manages key-value pairs, each with an optional absolute expiry
/// deadline. Expiry is lazy: an entry past its deadline is treated as absent
/// and removed when a read observes it, never swept in the background. The
/// store is thread-safe and cheap to clone, so every connection task holds
/// its own handle to the same underlying map.
#[derive(Clone)]
pub struct Store {
    inner: Arc<InnerStore>,
}

struct InnerStore {
    state: Mutex<State>,
    settings: Settings,
}

struct State {
    keys: HashMap<String, Value>,
}

struct Value {
    data: Bytes,
    expires_at: Option<Instant>,
}

impl Store {
    pub fn new(settings: Settings) -> Store {
        let state = State {
            keys: HashMap::new(),
        };

        Store {
            inner: Arc::new(InnerStore {
                state: Mutex::new(state),
                settings,
            }),
        }
    }

    /// Inserts or overwrites unconditionally. The expiry deadline is computed
    /// here, once, from the requested time-to-live.
    pub fn set(&self, key: String, data: Bytes, ttl: Option<Duration>) {
        let value = Value {
            data,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };

        let mut state = self.inner.state.lock().unwrap();
        state.keys.insert(key, value);
    }

    /// Returns the value for `key`, or `None` if the key is absent or its
    /// deadline has passed. An expired entry is removed as a side effect so
    /// it can never resurface.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let mut state = self.inner.state.lock().unwrap();

        let expired = match state.keys.get(key) {
            Some(value) => value.expires_at.is_some_and(|at| Instant::now() >= at),
            None => return None,
        };

        if expired {
            state.keys.remove(key);
            return None;
        }

        state.keys.get(key).map(|value| value.data.clone())
    }

    pub fn size(&self) -> usize {
        self.inner.state.lock().unwrap().keys.len()
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time;

    fn store() -> Store {
        Store::new(Settings::default())
    }

    #[tokio::test]
    async fn set_then_get() {
        let store = store();

        store.set("key1".to_string(), Bytes::from("value1"), None);

        assert_eq!(store.get("key1"), Some(Bytes::from("value1")));
    }

    #[tokio::test]
    async fn get_missing_key() {
        let store = store();

        assert_eq!(store.get("nope"), None);
    }

    #[tokio::test]
    async fn overwrite_replaces_value() {
        let store = store();

        store.set("key1".to_string(), Bytes::from("v1"), None);
        store.set("key1".to_string(), Bytes::from("v2"), None);

        assert_eq!(store.get("key1"), Some(Bytes::from("v2")));
    }

    #[tokio::test]
    async fn overwrite_replaces_expiry() {
        time::pause();

        let store = store();

        store.set(
            "key1".to_string(),
            Bytes::from("v1"),
            Some(Duration::from_millis(100)),
        );
        store.set("key1".to_string(), Bytes::from("v2"), None);

        time::advance(Duration::from_millis(200)).await;

        assert_eq!(store.get("key1"), Some(Bytes::from("v2")));
    }

    #[tokio::test]
    async fn lazy_expiry() {
        time::pause();

        let store = store();

        store.set(
            "key1".to_string(),
            Bytes::from("value1"),
            Some(Duration::from_millis(100)),
        );
        store.set("key2".to_string(), Bytes::from("value2"), None);

        assert_eq!(store.get("key1"), Some(Bytes::from("value1")));

        time::advance(Duration::from_millis(100)).await;

        // Strict comparison: now >= deadline counts as expired.
        assert_eq!(store.get("key1"), None);
        assert_eq!(store.get("key2"), Some(Bytes::from("value2")));

        // The expired entry was removed on read and must not resurface.
        assert_eq!(store.size(), 1);
        time::advance(Duration::from_millis(1000)).await;
        assert_eq!(store.get("key1"), None);
    }

    #[tokio::test]
    async fn zero_ttl_expires_immediately() {
        time::pause();

        let store = store();

        store.set(
            "key1".to_string(),
            Bytes::from("value1"),
            Some(Duration::from_millis(0)),
        );

        assert_eq!(store.get("key1"), None);
        assert_eq!(store.size(), 0);
    }
}
