//! Boot parameter primitives shared between the command line reader and the
//! option resolver.

use std::collections::BTreeSet;

/// A single boot parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// The key appeared once.
    Scalar(String),
    /// The key appeared several times, in order of appearance.
    List(Vec<String>),
}

impl ParamValue {
    /// Consumes the parameter and returns its raw values.
    #[must_use]
    pub fn into_values(self) -> Vec<String> {
        match self {
            Self::Scalar(value) => vec![value],
            Self::List(values) => values,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

/// Flat string-keyed multimap of boot parameters.
///
/// Entries keep their order of appearance. Keys are stored verbatim;
/// namespace filtering and normalisation happen in [`crate::config`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootParams(Vec<(String, String)>);

impl BootParams {
    /// Creates an empty parameter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value for `key` after every existing entry.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Sets `key` to `value`, replacing any previous entry.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        self.0.retain(|(existing, _)| *existing != key);
        for value in value.into().into_values() {
            self.0.push((key.clone(), value));
        }
    }

    /// Collects the raw values for `key`.
    ///
    /// A single occurrence yields a scalar; repeated occurrences yield a
    /// list in order of appearance.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ParamValue> {
        let mut values: Vec<String> = self
            .iter()
            .filter(|(existing, _)| *existing == key)
            .map(|(_, value)| value.to_owned())
            .collect();
        match values.len() {
            0 => None,
            1 => values.pop().map(ParamValue::Scalar),
            _ => Some(ParamValue::List(values)),
        }
    }

    /// Iterates over every entry in order of appearance.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0
            .iter()
            .map(|(key, _)| key.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Returns whether no parameters are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for BootParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.push(key, value);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_occurrence_is_scalar() {
        let params: BootParams = [("layerinit.cmd", "/sbin/init")].into_iter().collect();
        assert_eq!(params.get("layerinit.cmd"), Some(ParamValue::from("/sbin/init")));
    }

    #[test]
    fn repeated_key_becomes_ordered_list() {
        let params: BootParams = [("k", "a"), ("k", "b"), ("k", "c")].into_iter().collect();
        assert_eq!(
            params.get("k"),
            Some(ParamValue::List(vec!["a".into(), "b".into(), "c".into()]))
        );
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn set_replaces_previous_values() {
        let mut params: BootParams = [("k", "a"), ("k", "b")].into_iter().collect();
        params.set("k", "z");
        assert_eq!(params.get("k"), Some(ParamValue::from("z")));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn iteration_keeps_appearance_order_across_keys() {
        let params: BootParams = [("b", "1"), ("a", "2"), ("b", "3")].into_iter().collect();
        let entries: Vec<_> = params.iter().collect();
        assert_eq!(entries, vec![("b", "1"), ("a", "2"), ("b", "3")]);
        assert_eq!(params.len(), 2);
    }
}
