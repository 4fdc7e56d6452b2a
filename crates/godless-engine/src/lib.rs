#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
//! # Godless Engine — remote namespace / merge engine
//!
//! The single place namespace and index persistence, index loading,
//! table-namespace traversal with lookahead prefetch, and peer-index
//! replication happen. All mutation funnels through two single-consumer
//! tasks so head advancement is always serialized, regardless of how many
//! callers concurrently call `persist_index`.

pub mod error;
pub mod remote_namespace;
pub mod store;

pub use error::EngineError;
pub use remote_namespace::{
    index_bytes, index_from_bytes, namespace_bytes, namespace_from_bytes, RemoteNamespace,
    RemoteNamespaceOptions, ReplicationReport,
};
pub use store::{HeadCache, IndexCache, KeyStore, NamespaceReader, ObjectStore, TraversalUpdate};
