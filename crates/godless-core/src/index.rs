use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::hash::IpfsPath;
use crate::link::Link;
use crate::table::TableName;

/// Mapping from `TableName` to the set of signed links pointing at the
/// namespace blobs that carry that table's data.
///
/// Links are keyed by path internally so that joining two indices merges
/// same-path links by signature union, rather than keeping duplicate
/// entries (spec §3: "Join = per-table union of link sets, with
/// link-level signature union").
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Index {
    tables: BTreeMap<TableName, BTreeMap<IpfsPath, Link>>,
}

impl Index {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Links filed under `table`, in path order.
    pub fn links(&self, table: &TableName) -> Vec<Link> {
        self.tables
            .get(table)
            .map(|links| links.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &TableName> {
        self.tables.keys()
    }

    /// Every link in the index, across all tables — used by wildcard
    /// (dump-namespace) traversal.
    pub fn all_links(&self) -> Vec<(TableName, Link)> {
        self.tables
            .iter()
            .flat_map(|(name, links)| links.values().map(move |l| (name.clone(), l.clone())))
            .collect()
    }

    #[must_use]
    pub fn join_link(&self, table: TableName, link: Link) -> Self {
        let mut tables = self.tables.clone();
        let entry = tables.entry(table).or_default();
        entry
            .entry(link.path())
            .and_modify(|existing| *existing = existing.join_link(&link))
            .or_insert(link);
        Self { tables }
    }

    #[must_use]
    pub fn join_index(&self, other: &Index) -> Self {
        let mut joined = self.clone();
        for (table, links) in &other.tables {
            for link in links.values() {
                joined = joined.join_link(table.clone(), link.clone());
            }
        }
        joined
    }
}
