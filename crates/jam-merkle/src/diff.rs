//! `MerklizationDictionary` diff and canonical printing (spec §4.7, C8).
//!
//! New — the teacher has no diff tool of its own; designed directly from
//! spec.md §4.7 and kept deliberately simple (a `BTreeMap` compare), since
//! this component exists purely for test/debug tooling.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::dictionary::DictKey;

/// The flat key→encoded-value map the state Merkle root is computed from.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MerklizationDictionary {
    pub entries: BTreeMap<DictKey, Vec<u8>>,
}

impl MerklizationDictionary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: DictKey, value: Vec<u8>) {
        self.entries.insert(key, value);
    }

    /// Entry-by-entry comparison producing a deterministic ordered report.
    #[must_use]
    pub fn diff(&self, other: &Self) -> DictionaryDiff {
        let mut added = Vec::new();
        let mut removed = Vec::new();
        let mut changed = Vec::new();

        for (key, value) in &other.entries {
            match self.entries.get(key) {
                None => added.push((*key, value.clone())),
                Some(prev) if prev != value => {
                    changed.push((*key, prev.clone(), value.clone()));
                }
                Some(_) => {}
            }
        }
        for (key, value) in &self.entries {
            if !other.entries.contains_key(key) {
                removed.push((*key, value.clone()));
            }
        }

        added.sort_by(|a, b| a.0.cmp(&b.0));
        removed.sort_by(|a, b| a.0.cmp(&b.0));
        changed.sort_by(|a, b| a.0.cmp(&b.0));

        DictionaryDiff {
            added,
            removed,
            changed,
        }
    }

    /// Canonical pretty-printer: walks every entry in key order.
    #[must_use]
    pub fn pretty_print(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            let _ = writeln!(out, "{} => {}", hex(key), hex(value));
        }
        out
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DictionaryDiff {
    pub added: Vec<(DictKey, Vec<u8>)>,
    pub removed: Vec<(DictKey, Vec<u8>)>,
    pub changed: Vec<(DictKey, Vec<u8>, Vec<u8>)>,
}

impl DictionaryDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_detects_added_removed_changed() {
        let mut a = MerklizationDictionary::new();
        a.insert([1u8; 32], vec![1]);
        a.insert([2u8; 32], vec![2]);

        let mut b = MerklizationDictionary::new();
        b.insert([2u8; 32], vec![22]);
        b.insert([3u8; 32], vec![3]);

        let diff = a.diff(&b);
        assert_eq!(diff.added, vec![([3u8; 32], vec![3])]);
        assert_eq!(diff.removed, vec![([1u8; 32], vec![1])]);
        assert_eq!(diff.changed, vec![([2u8; 32], vec![2], vec![22])]);
    }

    #[test]
    fn identical_dictionaries_diff_empty() {
        let mut a = MerklizationDictionary::new();
        a.insert([9u8; 32], vec![9]);
        let b = a.clone();
        assert!(a.diff(&b).is_empty());
    }
}
