//! Ordered, case-preserving header map.
//!
//! Header names keep the spelling they were inserted or received with, and
//! iteration follows insertion order so encoded bytes are deterministic.
//! Lookups are ASCII case-insensitive. At most one value is held per name.

use serde::ser::{Serialize, SerializeMap, Serializer};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a header value by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Set a header, replacing any existing value in place.
    ///
    /// A replaced header keeps its original position and spelling.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder form of [`Headers::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Remove a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    /// Append a received field line, folding repeats into one
    /// comma-separated value as list-valued fields allow.
    pub(crate) fn append_folded(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(i) => {
                let existing = &mut self.entries[i].1;
                existing.push_str(", ");
                existing.push_str(value);
            }
            None => self.entries.push((name.to_string(), value.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if the comma-separated value of `name` contains `token`.
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.get(name)
            .map(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case(token)))
            .unwrap_or(false)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

/// Serializes as a JSON object keyed by lower-cased names.
impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(&k.to_ascii_lowercase(), v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let headers = Headers::new().with("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut headers = Headers::new()
            .with("Host", "a")
            .with("Accept", "*/*");
        headers.insert("host", "b");
        let names: Vec<_> = headers.iter().collect();
        assert_eq!(names, vec![("Host", "b"), ("Accept", "*/*")]);
    }

    #[test]
    fn append_folded_joins_repeats() {
        let mut headers = Headers::new();
        headers.append_folded("Accept", "text/html");
        headers.append_folded("accept", "application/json");
        assert_eq!(headers.get("Accept"), Some("text/html, application/json"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn has_token_matches_list_members() {
        let headers = Headers::new().with("Connection", "Upgrade, Keep-Alive");
        assert!(headers.has_token("connection", "keep-alive"));
        assert!(!headers.has_token("connection", "close"));
    }

    #[test]
    fn remove_returns_value() {
        let mut headers = Headers::new().with("Content-Length", "3");
        assert_eq!(headers.remove("content-length").as_deref(), Some("3"));
        assert!(headers.is_empty());
    }
}
