//! Per-request scratch space for plugins that need to talk to each other.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// String-keyed map of arbitrary values, scoped to one request.
#[derive(Default)]
pub struct StoreHandler {
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl StoreHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing whatever was there.
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Fetch a value. Returns `None` when the key is missing or holds another type.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| (**v).downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key).and_then(|v| (**v).downcast_mut::<T>())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Drop a key. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for StoreHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}
