use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entry::{Entry, EntryName};
use crate::point::Point;
use crate::row::{Row, RowName};
use crate::table::{Table, TableName};

/// The outer CRDT map: `table -> row -> entry -> set-of-points`.
///
/// Join is per-key union all the way down, via `Table::join_table`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Namespace {
    tables: BTreeMap<TableName, Table>,
}

impl Namespace {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn get(&self, name: &TableName) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&TableName, &Table)> {
        self.tables.iter()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &TableName> {
        self.tables.keys()
    }

    #[must_use]
    pub fn join_table(&self, name: TableName, table: &Table) -> Self {
        let mut tables = self.tables.clone();
        tables
            .entry(name)
            .and_modify(|existing| *existing = existing.join_table(table))
            .or_insert_with(|| table.clone());
        Self { tables }
    }

    #[must_use]
    pub fn join_namespace(&self, other: &Namespace) -> Self {
        let mut joined = self.clone();
        for (name, table) in &other.tables {
            joined = joined.join_table(name.clone(), table);
        }
        joined
    }

    /// Convenience builder used by the stream codec: fold a single point
    /// into the (table, row, entry) addressed by the given keys.
    #[must_use]
    pub fn join_point(
        &self,
        table_key: TableName,
        row_key: RowName,
        entry_key: EntryName,
        point: Point,
    ) -> Self {
        let entry = Entry::empty().join_point(point);
        let row = Row::empty().join_entry(entry_key, &entry);
        let table = Table::empty().join_row(row_key, &row);
        self.join_table(table_key, &table)
    }

    /// Visit every (table, row, entry, points) quadruple in canonical
    /// (table, row, entry) order. Used by the canonical codec to flatten
    /// the namespace into a stream.
    pub fn for_each_entry<F: FnMut(&TableName, &RowName, &EntryName, &Entry)>(&self, mut f: F) {
        for (table_name, table) in &self.tables {
            for (row_name, row) in table.rows() {
                for (entry_name, entry) in row.entries() {
                    f(table_name, row_name, entry_name, entry);
                }
            }
        }
    }
}

impl FromIterator<(TableName, Table)> for Namespace {
    fn from_iter<I: IntoIterator<Item = (TableName, Table)>>(iter: I) -> Self {
        let mut ns = Namespace::empty();
        for (name, table) in iter {
            ns = ns.join_table(name, &table);
        }
        ns
    }
}
