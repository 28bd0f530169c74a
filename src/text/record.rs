use serde::{Serialize, Serializer, ser::SerializeMap};

/// Insertion-ordered field name → value mapping for one voter box.
///
/// Keys and values are optional: an empty OCR'd label or value is stored as
/// `None` and serialized as JSON `null` (a `None` key becomes the string
/// `"null"`). Inserting an existing key overwrites its value in place, so a
/// key keeps the position of its first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRecord {
    entries: Vec<(Option<String>, Option<String>)>,
}

impl FieldRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold ordered pairs into a record; empty strings become `None`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::new();
        for (key, value) in pairs {
            record.insert(non_empty(key.into()), non_empty(value.into()));
        }
        record
    }

    /// Last write wins; the key keeps its original position.
    pub fn insert(&mut self, key: Option<String>, value: Option<String>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.insert(Some(key.to_string()), Some(value.into()));
    }

    /// Value of `key`, `None` when absent or null.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_deref() == Some(key))
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.as_deref() == Some(key))
    }

    pub fn key_at(&self, index: usize) -> Option<Option<&str>> {
        self.entries.get(index).map(|(k, _)| k.as_deref())
    }

    pub fn keys(&self) -> impl Iterator<Item = Option<&str>> {
        self.entries.iter().map(|(k, _)| k.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, Option<&str>)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_deref(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Give the entry at `index` a new key.
    ///
    /// The record is rebuilt by re-inserting every entry in order, so when
    /// `key` already exists elsewhere the later of the two values survives
    /// at the earlier position.
    pub fn rename_at(&mut self, index: usize, key: &str) {
        if index >= self.entries.len() || self.entries[index].0.as_deref() == Some(key) {
            return;
        }

        let entries = std::mem::take(&mut self.entries);
        for (i, (k, v)) in entries.into_iter().enumerate() {
            let k = if i == index { Some(key.to_string()) } else { k };
            self.insert(k, v);
        }
    }

    /// Overlay `other` onto `self`; colliding keys take `other`'s value.
    pub fn merge(&mut self, other: FieldRecord) {
        for (k, v) in other.entries {
            self.insert(k, v);
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

impl Serialize for FieldRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k.as_deref().unwrap_or("null"), v)?;
        }
        map.end()
    }
}
