use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::row::{Row, RowName};

/// Name of a `Table` within a `Namespace`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableName(pub String);

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mapping from `RowName` to `Row`. Join is per-key union with `Row::join_row`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Table {
    rows: BTreeMap<RowName, Row>,
}

impl Table {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, name: &RowName) -> Option<&Row> {
        self.rows.get(name)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&RowName, &Row)> {
        self.rows.iter()
    }

    #[must_use]
    pub fn join_row(&self, name: RowName, row: &Row) -> Self {
        let mut rows = self.rows.clone();
        rows.entry(name)
            .and_modify(|existing| *existing = existing.join_row(row))
            .or_insert_with(|| row.clone());
        Self { rows }
    }

    #[must_use]
    pub fn join_table(&self, other: &Table) -> Self {
        let mut joined = self.clone();
        for (name, row) in &other.rows {
            joined = joined.join_row(name.clone(), row);
        }
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_table_is_commutative_and_idempotent() {
        let a = Table::empty().join_row(RowName::new("R0"), &Row::empty());
        let b = Table::empty().join_row(RowName::new("R1"), &Row::empty());
        assert_eq!(a.join_table(&b), b.join_table(&a));
        assert_eq!(a.join_table(&a), a);
    }
}
