//! Case-insensitive header container with insertion-preserving reads.
//!
//! Keys fold `-` and `_` to the same canonical form on input (`X-Test`,
//! `X_test`, `x-TESt` and `X_tesT` all address the same slot) but the
//! *display* form of the most recent write is what iteration yields.

use indexmap::IndexMap;

fn canonicalize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '_' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// A case-insensitive, insertion-ordered header map.
///
/// `-` and `_` are folded to the same canonical key on every read and
/// write; the display name of the most recent write to a given canonical
/// key is what `iter()` yields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: IndexMap<String, (String, String)>,
}

impl HeaderMap {
    /// Create an empty header map.
    pub fn new() -> Self {
        Self { entries: IndexMap::new() }
    }

    /// Insert or overwrite a header. The display form passed here is what
    /// later iteration will show for this canonical key.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let key = canonicalize(&name);
        self.entries.insert(key, (name, value.into()));
    }

    /// Look up a header's value, case- and `-`/`_`-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(&canonicalize(name)).map(|(_, v)| v.as_str())
    }

    /// True iff the exact value (case-insensitive) of the named header
    /// equals `value` (case-insensitive). Used by the Cacheability Oracle,
    /// which matches whole directive values rather than parsing lists.
    pub fn value_eq_ignore_ascii_case(&self, name: &str, value: &str) -> bool {
        self.get(name).is_some_and(|v| v.eq_ignore_ascii_case(value))
    }

    /// Remove a header, returning its last-written value if present.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.shift_remove(&canonicalize(name)).map(|(_, v)| v)
    }

    /// True if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct canonical keys stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate `(display_name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.values().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Merge `other` into `self`. Entries already present in `self` are
    /// left untouched; only headers absent from `self` are copied in.
    /// Used by the Origin Fetcher, which must not clobber headers a
    /// plugin already seeded via `origin_required`.
    pub fn merge(&mut self, other: &HeaderMap) {
        for (key, (name, value)) in &other.entries {
            self.entries.entry(key.clone()).or_insert_with(|| (name.clone(), value.clone()));
        }
    }
}

impl<'a> IntoIterator for &'a HeaderMap {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl FromIterator<(String, String)> for HeaderMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut map = HeaderMap::new();
        for (name, value) in iter {
            map.set(name, value);
        }
        map
    }
}
