//! Element lifecycle shared by every interaction component.

use std::collections::BTreeMap;

use crate::effect::{Effects, TimerTarget};

/// Snapshot of an element's `data-*` attributes, keyed in kebab-case
/// without the `data-` prefix (`data-selected-indices` -> `selected-indices`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataAttributes(BTreeMap<String, String>);

impl DataAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// A component bound to one DOM element for the element's lifetime.
///
/// `on_attach` runs when the element is mounted, `on_data_change` after the
/// server re-renders it, and `on_detach` when it is removed. `on_detach`
/// must cancel every timer and be safe to call more than once.
pub trait Hook: TimerTarget {
    fn on_attach(&mut self, attrs: &DataAttributes) -> Effects;

    fn on_data_change(&mut self, attrs: &DataAttributes) -> Effects;

    fn on_detach(&mut self) -> Effects;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_lookup() {
        let mut attrs = DataAttributes::from_pairs([("position", "0.5")]);
        attrs.set("frames", "[]");
        assert_eq!(attrs.get("position"), Some("0.5"));
        assert_eq!(attrs.get("frames"), Some("[]"));
        assert_eq!(attrs.get("missing"), None);
    }
}
