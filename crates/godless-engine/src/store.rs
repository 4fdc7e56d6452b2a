use async_trait::async_trait;

use godless_core::{Index, IpfsPath, Namespace, PrivateKey, PublicKey};

use crate::error::EngineError;

/// Content-addressed storage for namespaces and indices. Implementations
/// are expected to be the hashing boundary: `add_namespace`/`add_index`
/// encode and hash their argument, returning the resulting `IpfsPath`.
///
/// `publish`/`resolve` model an optional naming layer on top of content
/// addressing (e.g. IPNS) and default to no-ops; most deployments only
/// need content addressing.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn add_namespace(&self, ns: &Namespace) -> Result<IpfsPath, EngineError>;
    async fn add_index(&self, idx: &Index) -> Result<IpfsPath, EngineError>;
    async fn cat_namespace(&self, path: IpfsPath) -> Result<Namespace, EngineError>;
    async fn cat_index(&self, path: IpfsPath) -> Result<Index, EngineError>;

    async fn publish(&self, _path: IpfsPath) -> Result<(), EngineError> {
        Ok(())
    }

    async fn resolve(&self) -> Result<IpfsPath, EngineError> {
        Ok(IpfsPath::NIL)
    }
}

/// The single pointer to "the current index". `IpfsPath::NIL` means no
/// index has ever been persisted.
#[async_trait]
pub trait HeadCache: Send + Sync {
    async fn get_head(&self) -> Result<IpfsPath, EngineError>;
    async fn set_head(&self, head: IpfsPath) -> Result<(), EngineError>;

    /// Durable backends may stage `set_head` writes and only make them
    /// visible on `commit`; the default no-ops, matching an in-memory
    /// cache where every `set_head` is already final.
    async fn commit(&self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Discards any staged-but-uncommitted `set_head` write.
    async fn rollback(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

/// An advisory cache in front of `ObjectStore::cat_index`. A miss is
/// never fatal — the engine always falls back to the store.
#[async_trait]
pub trait IndexCache: Send + Sync {
    async fn get_index(&self, addr: IpfsPath) -> Option<Index>;
    async fn set_index(&self, addr: IpfsPath, idx: Index) -> Result<(), EngineError>;
}

/// The set of keys this instance signs with and verifies against. No I/O
/// boundary — key material is assumed resident.
pub trait KeyStore: Send + Sync {
    fn all_public_keys(&self) -> Vec<PublicKey>;
    fn all_private_keys(&self) -> Vec<PrivateKey>;
}

/// The result of one step of a namespace traversal: whether to continue,
/// and whether the step failed.
#[derive(Debug, Default)]
pub struct TraversalUpdate {
    pub more: bool,
    pub error: Option<EngineError>,
}

impl TraversalUpdate {
    pub fn continue_() -> Self {
        Self {
            more: true,
            error: None,
        }
    }

    pub fn stop() -> Self {
        Self {
            more: false,
            error: None,
        }
    }

    pub fn fail(error: EngineError) -> Self {
        Self {
            more: false,
            error: Some(error),
        }
    }

    pub fn should_continue(&self) -> bool {
        self.more && self.error.is_none()
    }
}

/// Consumes namespaces delivered by a traversal, one at a time.
pub trait NamespaceReader: Send {
    fn read_namespace(&mut self, ns: Namespace) -> TraversalUpdate;
}

impl<F> NamespaceReader for F
where
    F: FnMut(Namespace) -> TraversalUpdate + Send,
{
    fn read_namespace(&mut self, ns: Namespace) -> TraversalUpdate {
        self(ns)
    }
}
