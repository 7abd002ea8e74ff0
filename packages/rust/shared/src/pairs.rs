//! Ordered key/value pair lists backing assembly and component inputs/outputs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single named string value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonPair {
    pub key: String,
    pub value: String,
}

impl JsonPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An ordered list of [`JsonPair`]s. Keys may repeat; lookups see the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonPairs(pub Vec<JsonPair>);

impl JsonPairs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of the first pair named `key`, or `""` when there is none.
    pub fn lookup(&self, key: &str) -> &str {
        self.0
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
            .unwrap_or("")
    }

    /// Append a pair, keeping any existing pairs with the same key.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push(JsonPair::new(key, value));
    }

    /// Replace every key named in `replacements`.
    ///
    /// All existing pairs for such a key are dropped, then one pair per
    /// supplied value is appended in the supplied order. Keys absent from
    /// `replacements` keep their position. Applying the same map twice gives
    /// the same list as applying it once.
    pub fn nuke_and_set(&self, replacements: &BTreeMap<String, Vec<String>>) -> JsonPairs {
        let mut pairs: Vec<JsonPair> = self
            .0
            .iter()
            .filter(|p| !replacements.contains_key(&p.key))
            .cloned()
            .collect();

        for (key, values) in replacements {
            pairs.extend(values.iter().map(|v| JsonPair::new(key.clone(), v.clone())));
        }
        JsonPairs(pairs)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JsonPair> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for JsonPairs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        JsonPairs(iter.into_iter().map(|(k, v)| JsonPair::new(k, v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn replacements(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
            .collect()
    }

    #[test]
    fn lookup_returns_first_match() {
        let pairs: JsonPairs = [("status", "launching"), ("cpu", "1"), ("status", "running")]
            .into_iter()
            .collect();
        assert_eq!(pairs.lookup("status"), "launching");
        assert_eq!(pairs.lookup("cpu"), "1");
    }

    #[test]
    fn lookup_missing_is_empty() {
        assert_eq!(JsonPairs::new().lookup("publicip"), "");
        let pairs: JsonPairs = [("cpu", "1")].into_iter().collect();
        assert_eq!(pairs.lookup("ram"), "");
    }

    #[test]
    fn nuke_and_set_replaces_all_pairs_for_key() {
        let pairs: JsonPairs = [
            ("publicip", "10.0.0.1"),
            ("hostname", "box1"),
            ("publicip", "10.0.0.2"),
        ]
        .into_iter()
        .collect();

        let out =
            pairs.nuke_and_set(&replacements(&[("publicip", &["192.168.1.5", "192.168.1.6"])]));

        let expected: JsonPairs = [
            ("hostname", "box1"),
            ("publicip", "192.168.1.5"),
            ("publicip", "192.168.1.6"),
        ]
        .into_iter()
        .collect();
        assert_eq!(out, expected);
        // source list is untouched
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn nuke_and_set_keeps_untouched_keys_in_order() {
        let pairs: JsonPairs = [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
        let out = pairs.nuke_and_set(&replacements(&[("b", &["20"])]));
        let keys: Vec<&str> = out.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "c", "b"]);
        assert_eq!(out.lookup("b"), "20");
    }

    #[test]
    fn nuke_and_set_with_empty_values_removes_key() {
        let pairs: JsonPairs = [("a", "1"), ("b", "2")].into_iter().collect();
        let out = pairs.nuke_and_set(&replacements(&[("a", &[])]));
        assert_eq!(out.lookup("a"), "");
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn nuke_and_set_is_idempotent() {
        let pairs: JsonPairs = [("x", "1"), ("publicip", "old"), ("y", "2"), ("x", "3")]
            .into_iter()
            .collect();
        let r = replacements(&[("x", &["9", "8"]), ("publicip", &["new"]), ("z", &["0"])]);

        let once = pairs.nuke_and_set(&r);
        let twice = once.nuke_and_set(&r);
        assert_eq!(once, twice);
    }

    #[test]
    fn serializes_as_key_value_objects() {
        let pairs: JsonPairs = [("sshkey", "abc")].into_iter().collect();
        let json = serde_json::to_string(&pairs).expect("serialize");
        assert_eq!(json, r#"[{"key":"sshkey","value":"abc"}]"#);
    }

    // ---------------------------------------------------------------------------
    // Property tests
    // ---------------------------------------------------------------------------

    /// Pair lists drawn from a small key alphabet, so keys repeat.
    fn arb_pairs() -> impl Strategy<Value = JsonPairs> {
        prop::collection::vec(("[a-d]", "[a-z0-9]{0,3}"), 0..16)
            .prop_map(|pairs| pairs.into_iter().collect())
    }

    fn arb_replacements() -> impl Strategy<Value = BTreeMap<String, Vec<String>>> {
        prop::collection::btree_map(
            "[a-f]",
            prop::collection::vec("[a-z0-9]{0,3}", 0..4),
            0..5,
        )
    }

    proptest! {
        #[test]
        fn nuke_and_set_twice_equals_once(pairs in arb_pairs(), r in arb_replacements()) {
            let once = pairs.nuke_and_set(&r);
            prop_assert_eq!(once.nuke_and_set(&r), once);
        }

        #[test]
        fn lookup_of_absent_key_is_empty(pairs in arb_pairs(), key in "[x-z]{1,3}") {
            prop_assert_eq!(pairs.lookup(&key), "");
        }

        #[test]
        fn lookup_sees_first_pair(pairs in arb_pairs(), key in "[a-d]") {
            let first = pairs.iter().find(|p| p.key == key).map(|p| p.value.as_str());
            prop_assert_eq!(pairs.lookup(&key), first.unwrap_or(""));
        }

        #[test]
        fn untouched_keys_keep_relative_order(pairs in arb_pairs(), r in arb_replacements()) {
            let out = pairs.nuke_and_set(&r);
            let untouched = |p: &&JsonPair| !r.contains_key(&p.key);
            let kept: Vec<&JsonPair> = pairs.iter().filter(untouched).collect();
            let after: Vec<&JsonPair> = out.iter().filter(untouched).collect();
            prop_assert_eq!(after, kept);
        }

        #[test]
        fn replaced_keys_hold_exactly_the_new_values(
            pairs in arb_pairs(),
            r in arb_replacements(),
        ) {
            let out = pairs.nuke_and_set(&r);
            for (key, values) in &r {
                let got: Vec<&str> = out
                    .iter()
                    .filter(|p| &p.key == key)
                    .map(|p| p.value.as_str())
                    .collect();
                let want: Vec<&str> = values.iter().map(String::as_str).collect();
                prop_assert_eq!(got, want);
            }
        }
    }
}
