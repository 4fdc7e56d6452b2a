use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::entry::{Entry, EntryName};

/// Name of a `Row` within a `Table`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowName(pub String);

impl RowName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for RowName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mapping from `EntryName` to `Entry`. Join is per-key union with
/// `Entry::join_entry`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Row {
    entries: BTreeMap<EntryName, Entry>,
}

impl Row {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &EntryName) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&EntryName, &Entry)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn join_entry(&self, name: EntryName, entry: &Entry) -> Self {
        let mut entries = self.entries.clone();
        entries
            .entry(name)
            .and_modify(|existing| *existing = existing.join_entry(entry))
            .or_insert_with(|| entry.clone());
        Self { entries }
    }

    #[must_use]
    pub fn join_row(&self, other: &Row) -> Self {
        let mut joined = self.clone();
        for (name, entry) in &other.entries {
            joined = joined.join_entry(name.clone(), entry);
        }
        joined
    }
}
