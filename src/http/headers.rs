//! Header map with case-insensitive name lookup.
//!
//! Header names compare case-insensitively per [RFC 9110 §5]. The normalizer
//! additionally stores every name lower-cased, so a normalized request's headers can be
//! iterated without any further case folding.

use std::fmt;

/// A case-insensitive, multi-value header map.
///
/// Preserves insertion order and allows multiple values per header name.
///
/// # Examples
///
/// ```
/// use restcore::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("Content-Type", "application/json");
/// headers.insert("Link", "</a>; rel=\"self\"");
/// headers.insert("Link", "</b>; rel=\"next\"");
///
/// assert_eq!(headers.get("content-type"), Some("application/json"));
/// assert_eq!(headers.get_all("link").count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a header map with pre-allocated capacity for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Vec::with_capacity(capacity),
        }
    }

    /// Appends a header entry. Multiple values for the same name are preserved.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Replaces every existing value for `name` with a single `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&name);
        self.inner.push((name, value.into()));
    }

    /// Returns the first value for the given header name (case-insensitive), or `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns an iterator over all values for the given header name (case-insensitive).
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.inner
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Removes all entries with the given header name (case-insensitive).
    ///
    /// Returns `true` if any entries were removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.inner.len();
        self.inner.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.inner.len() < before
    }

    /// Returns `true` if the map contains at least one entry with the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Returns the total number of header entries (not unique names).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if there are no header entries.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns an iterator over all `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns a copy with every header name lower-cased and values untouched.
    pub fn to_lowercase_names(&self) -> Self {
        Self {
            inner: self
                .inner
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
                .collect(),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.inner {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_get() {
        let mut h = Headers::new();
        h.insert("Accept", "application/json");
        assert_eq!(h.get("accept"), Some("application/json"));
        assert_eq!(h.get("ACCEPT"), Some("application/json"));
    }

    #[test]
    fn set_replaces_all_values() {
        let mut h = Headers::new();
        h.insert("Cache-Control", "no-cache");
        h.insert("cache-control", "no-store");
        h.set("Cache-Control", "public, max-age=60");
        let vals: Vec<_> = h.get_all("cache-control").collect();
        assert_eq!(vals, vec!["public, max-age=60"]);
    }

    #[test]
    fn lowercase_names_keeps_values() {
        let h: Headers = [("X-Trace-ID", "AbC")].into_iter().collect();
        let lower = h.to_lowercase_names();
        assert_eq!(lower.iter().next(), Some(("x-trace-id", "AbC")));
    }

    #[test]
    fn remove() {
        let mut h = Headers::new();
        h.insert("Link", "a");
        h.insert("link", "b");
        assert!(h.remove("LINK"));
        assert!(h.is_empty());
        assert!(!h.remove("link"));
    }
}
