#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
//! # Godless Core — CRDT lattice model
//!
//! The namespace/table/row/entry/point/link/index lattice described by the
//! Godless data model, plus point and link signing. Every lattice type here
//! supports a commutative, associative, idempotent `join`; joining is the
//! only mutation, and every mutation returns a new value.

pub mod entry;
pub mod error;
pub mod hash;
pub mod index;
pub mod keys;
pub mod link;
pub mod namespace;
pub mod point;
pub mod row;
pub mod table;

pub use entry::{Entry, EntryName};
pub use error::CryptoError;
pub use hash::IpfsPath;
pub use index::Index;
pub use keys::{PrivateKey, PublicKey, PublicKeyHash};
pub use link::Link;
pub use namespace::Namespace;
pub use point::{Point, PointText, SignatureText};
pub use row::{Row, RowName};
pub use table::{Table, TableName};
