use indexmap::IndexMap;
use serde_json::Value;

/// Untyped request values available for binding.
///
/// Keys are consumed as they are bound, leaving the residual values that
/// are applied through setters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputBag {
    values: IndexMap<String, Value>,
}

impl InputBag {
    pub fn new() -> Self {
        InputBag {
            values: IndexMap::new(),
        }
    }

    /// Merges path variables with filters. Filters win on duplicate keys.
    pub fn merge<P, F, K, V>(path_vars: P, filters: F) -> Self
    where
        P: IntoIterator<Item = (K, V)>,
        F: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut bag = InputBag::new();
        bag.extend(path_vars);
        bag.extend(filters);
        bag
    }

    /// Inserts a value, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn extend<K, V>(&mut self, values: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in values {
            self.insert(key, value);
        }
    }

    /// Removes and returns the value for `key`, keeping the order of the rest.
    pub fn take(&mut self, key: &str) -> Option<Value> {
        self.values.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consumes the bag, yielding the remaining values in insertion order.
    pub fn into_residual(self) -> impl Iterator<Item = (String, Value)> {
        self.values.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for InputBag {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut bag = InputBag::new();
        bag.extend(iter);
        bag
    }
}
