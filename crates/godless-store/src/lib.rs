#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
//! # Godless Store — reference `ObjectStore`/cache/key-store implementations
//!
//! `godless-engine::store` defines the traits the merge engine consumes;
//! this crate supplies concrete instances so the engine, dispatcher, and
//! CLI have something to run against without a real IPFS-backed object
//! store. `mem` is the default for tests and the CLI demo; `disk` is a
//! minimal durable head/index cache reference instance.

pub mod disk;
pub mod error;
pub mod mem;

pub use disk::{FileHeadCache, FileIndexCache};
pub use error::StoreError;
pub use mem::{MemoryHeadCache, MemoryIndexCache, MemoryKeyStore, MemoryStore};
