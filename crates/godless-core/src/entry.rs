use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::point::{Point, PointText};

/// Name of an `Entry` within a `Row`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryName(pub String);

impl EntryName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A set of `Point`s. Points sharing the same text are kept as a single
/// point whose signature set is the union of the originals (spec §3:
/// "Points with the same text but different signature sets join by union
/// of signatures"); points with distinct text remain distinct set members.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Entry {
    points: BTreeMap<PointText, Point>,
}

impl Entry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Merge a single point into this entry.
    #[must_use]
    pub fn join_point(&self, point: Point) -> Self {
        let mut points = self.points.clone();
        points
            .entry(point.text().clone())
            .and_modify(|existing| *existing = existing.join(&point))
            .or_insert(point);
        Self { points }
    }

    /// Merge two entries (set union with per-text point merging).
    #[must_use]
    pub fn join_entry(&self, other: &Entry) -> Self {
        let mut joined = self.clone();
        for point in other.points.values() {
            joined = joined.join_point(point.clone());
        }
        joined
    }

    /// The entry's values, in canonical (text) order.
    pub fn values(&self) -> impl Iterator<Item = &Point> {
        self.points.values()
    }
}

impl FromIterator<Point> for Entry {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        let mut entry = Entry::empty();
        for point in iter {
            entry = entry.join_point(point);
        }
        entry
    }
}
