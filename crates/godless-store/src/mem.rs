use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use godless_core::{Index, IpfsPath, Namespace, PrivateKey, PublicKey};
use godless_engine::{EngineError, HeadCache, IndexCache, KeyStore, ObjectStore};

use crate::error::StoreError;

/// Content-addressed blob store backed by two `HashMap`s guarded by
/// `parking_lot::Mutex`. A production on-disk/IPFS backend is out of
/// scope here; this in-memory stand-in serves tests and the CLI demo.
#[derive(Default)]
pub struct MemoryStore {
    namespaces: Mutex<HashMap<IpfsPath, Namespace>>,
    indices: Mutex<HashMap<IpfsPath, Index>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace_count(&self) -> usize {
        self.namespaces.lock().len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.lock().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn add_namespace(&self, ns: &Namespace) -> Result<IpfsPath, EngineError> {
        let bytes = godless_engine::namespace_bytes(ns)?;
        let addr = IpfsPath::of_bytes(&bytes);
        self.namespaces.lock().insert(addr, ns.clone());
        Ok(addr)
    }

    async fn add_index(&self, idx: &Index) -> Result<IpfsPath, EngineError> {
        let bytes = godless_engine::index_bytes(idx)?;
        let addr = IpfsPath::of_bytes(&bytes);
        self.indices.lock().insert(addr, idx.clone());
        Ok(addr)
    }

    async fn cat_namespace(&self, path: IpfsPath) -> Result<Namespace, EngineError> {
        self.namespaces
            .lock()
            .get(&path)
            .cloned()
            .ok_or_else(|| EngineError::Store(StoreError::NotFound(path.to_hex()).to_string()))
    }

    async fn cat_index(&self, path: IpfsPath) -> Result<Index, EngineError> {
        self.indices
            .lock()
            .get(&path)
            .cloned()
            .ok_or_else(|| EngineError::Store(StoreError::NotFound(path.to_hex()).to_string()))
    }
}

/// An in-memory head pointer. `commit`/`rollback` are no-ops: every
/// `set_head` is already final, matching `HeadCache`'s default.
#[derive(Default)]
pub struct MemoryHeadCache {
    head: Mutex<IpfsPath>,
}

impl MemoryHeadCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HeadCache for MemoryHeadCache {
    async fn get_head(&self) -> Result<IpfsPath, EngineError> {
        Ok(*self.head.lock())
    }

    async fn set_head(&self, head: IpfsPath) -> Result<(), EngineError> {
        *self.head.lock() = head;
        Ok(())
    }
}

/// An advisory in-memory index cache. `set_index` never fails in
/// practice, but still reports `Result` per the trait so a caller cannot
/// assume caching always succeeds.
#[derive(Default)]
pub struct MemoryIndexCache {
    indices: Mutex<HashMap<IpfsPath, Index>>,
}

impl MemoryIndexCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IndexCache for MemoryIndexCache {
    async fn get_index(&self, addr: IpfsPath) -> Option<Index> {
        self.indices.lock().get(&addr).cloned()
    }

    async fn set_index(&self, addr: IpfsPath, idx: Index) -> Result<(), EngineError> {
        self.indices.lock().insert(addr, idx);
        Ok(())
    }
}

/// An in-memory key-store: the set of keys this instance signs with and
/// verifies against, with `all_private_keys`/`all_public_keys` plus
/// store/lookup helpers for the CLI and tests.
#[derive(Default)]
pub struct MemoryKeyStore {
    private: Mutex<Vec<PrivateKey>>,
    public: Mutex<Vec<PublicKey>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor used by tests and the CLI demo: one
    /// generated private key, whose public half is trusted by this same
    /// instance.
    pub fn with_generated_key<R: rand_core::RngCore + rand_core::CryptoRng>(rng: &mut R) -> Self {
        let key = PrivateKey::generate(rng);
        let store = Self::default();
        store.store_public(key.public_key());
        store.store_private(key);
        store
    }

    pub fn store_private(&self, key: PrivateKey) {
        self.private.lock().push(key);
    }

    pub fn store_public(&self, key: PublicKey) {
        self.public.lock().push(key);
    }
}

impl KeyStore for MemoryKeyStore {
    fn all_public_keys(&self) -> Vec<PublicKey> {
        self.public.lock().clone()
    }

    fn all_private_keys(&self) -> Vec<PrivateKey> {
        self.private.lock().clone()
    }
}
