use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Untyped value held by [`State`].
pub type Value = Arc<dyn Any + Send + Sync>;

/// Key/value store shared by every step of a plan run.
///
/// Backed by a [`DashMap`], so it can be read and written from any hook
/// without extra locking. Values are stored untyped and read back either as
/// a raw [`Value`] or downcast to a concrete type.
///
/// # Examples
///
/// ```
/// use tejun::State;
///
/// let state = State::new();
/// state.store("host", "db-1".to_string());
///
/// assert_eq!(state.get::<String>("host"), Some("db-1".to_string()));
/// assert!(state.get::<String>("port").is_none());
/// ```
#[derive(Default)]
pub struct State {
    entries: DashMap<String, Value>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the value under `key`.
    pub fn store<V>(&self, key: impl Into<String>, value: V)
    where
        V: Any + Send + Sync,
    {
        self.entries.insert(key.into(), Arc::new(value));
    }

    /// Returns the value under `key`, if any.
    pub fn load(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns the value under `key` as an `Arc<T>`.
    ///
    /// `None` if the key is absent or holds another type.
    pub fn load_as<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.load(key).and_then(|value| value.downcast::<T>().ok())
    }

    /// Returns a clone of the value under `key`, or `None` when there is
    /// nothing of type `T` stored there.
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Any + Clone,
    {
        self.entries
            .get(key)
            .and_then(|entry| entry.value().downcast_ref::<T>().cloned())
    }

    /// Atomically replaces the value under `key` with `f(current)`.
    ///
    /// `current` is `None` when the key is absent or holds another type.
    /// The key is locked while `f` runs, so `f` must not touch this state.
    pub fn update<T, F>(&self, key: &str, f: F)
    where
        T: Any + Send + Sync,
        F: FnOnce(Option<&T>) -> T,
    {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let next = f(entry.get().downcast_ref::<T>());
                entry.insert(Arc::new(next));
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(f(None)));
            }
        }
    }

    /// Removes `key`, returning its value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the stored keys, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State").field("keys", &self.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_store_and_get() {
        let state = State::new();
        state.store("test", "blah".to_string());

        assert_eq!(state.get::<String>("test"), Some("blah".to_string()));
        assert_eq!(state.get::<String>("lolnope"), None);
        // wrong type reads as absent
        assert_eq!(state.get::<u32>("test"), None);
    }

    #[test]
    fn test_load_found_flag() {
        let state = State::new();
        state.store("n", 7u32);

        let value = state.load("n").unwrap();
        assert_eq!(value.downcast_ref::<u32>(), Some(&7));
        assert!(state.load("missing").is_none());
        assert_eq!(state.load_as::<u32>("n").as_deref(), Some(&7));
    }

    #[test]
    fn test_store_overwrites() {
        let state = State::new();
        state.store("k", 1i64);
        state.store("k", "now a string");

        assert_eq!(state.len(), 1);
        assert_eq!(state.get::<&str>("k"), Some("now a string"));
        assert_eq!(state.get::<i64>("k"), None);
    }

    #[test]
    fn test_update_and_remove() {
        let state = State::new();
        for suffix in ["a", "b"] {
            state.update::<String, _>("word", |cur| {
                format!("{}{}", cur.map(String::as_str).unwrap_or(""), suffix)
            });
        }

        assert_eq!(state.get::<String>("word"), Some("ab".to_string()));
        assert!(state.remove("word").is_some());
        assert!(!state.contains_key("word"));
        assert!(state.is_empty());
    }

    #[test]
    fn test_concurrent_updates() {
        let state = Arc::new(State::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    for _ in 0..100 {
                        state.update::<u64, _>("count", |cur| cur.copied().unwrap_or(0) + 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(state.get::<u64>("count"), Some(800));
    }
}
