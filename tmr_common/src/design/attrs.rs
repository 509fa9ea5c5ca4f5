use indexmap::IndexMap;
use std::fmt;

/// Value of an attribute or cell parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AttrValue {
    /// Integer value.
    Int(i64),
    /// String value.
    Str(String),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// Ordered map of attribute (or parameter) names to values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttrMap {
    /// Entries in insertion order.
    entries: IndexMap<String, AttrValue>,
}

impl AttrMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: AttrValue) {
        self.entries.insert(key.into(), value);
    }

    /// Sets an integer value.
    pub fn set_int(&mut self, key: impl Into<String>, value: i64) {
        self.set(key, AttrValue::Int(value));
    }

    /// Sets a string value.
    pub fn set_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key, AttrValue::Str(value.into()));
    }

    /// Sets a boolean flag (integer 1).
    pub fn set_flag(&mut self, key: impl Into<String>) {
        self.set_int(key, 1);
    }

    /// Raw value lookup.
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.entries.get(key)
    }

    /// Integer value of `key`, if present and integral.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.entries.get(key) {
            Some(AttrValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// String value of `key`, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(AttrValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Whether `key` is present at all.
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Whether `key` is present with a truthy value (non-zero int or any string).
    pub fn is_set(&self, key: &str) -> bool {
        match self.entries.get(key) {
            Some(AttrValue::Int(v)) => *v != 0,
            Some(AttrValue::Str(_)) => true,
            None => false,
        }
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.entries.shift_remove(key)
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, AttrValue)> for AttrMap {
    fn from_iter<T: IntoIterator<Item = (K, AttrValue)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
