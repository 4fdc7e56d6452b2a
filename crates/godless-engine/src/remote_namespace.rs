use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use godless_codec::{decode_index, decode_namespace, encode_index, encode_namespace};
use godless_core::{Index, IpfsPath, Link, Namespace, Table, TableName};

use crate::error::EngineError;
use crate::store::{HeadCache, IndexCache, KeyStore, NamespaceReader, ObjectStore};

struct AddNamespaceRequest {
    namespace: Namespace,
    reply: oneshot::Sender<Result<IpfsPath, EngineError>>,
}

struct AddIndexRequest {
    index: Index,
    reply: oneshot::Sender<Result<IpfsPath, EngineError>>,
}

/// The report returned from replicating a set of peer index links.
#[derive(Debug, Clone, Copy)]
pub struct ReplicationReport {
    pub index_addr: IpfsPath,
    pub some_failed: bool,
}

/// Construction options for [`RemoteNamespace`].
pub struct RemoteNamespaceOptions {
    pub store: Arc<dyn ObjectStore>,
    pub head_cache: Arc<dyn HeadCache>,
    pub index_cache: Arc<dyn IndexCache>,
    pub key_store: Arc<dyn KeyStore>,
    /// When true, `replicate` requires every peer link to carry a
    /// signature verifiable under a known public key.
    pub is_public_index: bool,
}

/// The merge engine: the single place namespace/index persistence,
/// traversal, and replication happen.
///
/// All mutation funnels through the two rendezvous workers spawned in
/// `new`, so head advancement is always serialized regardless of how
/// many callers call `persist_index` concurrently.
///
/// `tokio::sync::mpsc` requires a nonzero buffer (a true zero-capacity
/// rendezvous channel would panic at construction), so a capacity-1
/// channel stands in: exactly one request may be in flight to each
/// worker, which preserves "persistence is strictly one-at-a-time" even
/// though it is not a literal rendezvous.
pub struct RemoteNamespace {
    store: Arc<dyn ObjectStore>,
    head_cache: Arc<dyn HeadCache>,
    index_cache: Arc<dyn IndexCache>,
    key_store: Arc<dyn KeyStore>,
    is_public_index: bool,
    namespace_tx: mpsc::Sender<AddNamespaceRequest>,
    index_tx: mpsc::Sender<AddIndexRequest>,
}

impl RemoteNamespace {
    pub fn new(options: RemoteNamespaceOptions) -> Arc<RemoteNamespace> {
        let (namespace_tx, namespace_rx) = mpsc::channel(1);
        let (index_tx, index_rx) = mpsc::channel(1);

        let remote = Arc::new(RemoteNamespace {
            store: options.store,
            head_cache: options.head_cache,
            index_cache: options.index_cache,
            key_store: options.key_store,
            is_public_index: options.is_public_index,
            namespace_tx,
            index_tx,
        });

        tokio::spawn(Self::run_add_namespaces(remote.store.clone(), namespace_rx));
        tokio::spawn(Self::run_add_indices(remote.clone(), index_rx));

        remote
    }

    async fn run_add_namespaces(
        store: Arc<dyn ObjectStore>,
        mut rx: mpsc::Receiver<AddNamespaceRequest>,
    ) {
        while let Some(request) = rx.recv().await {
            let result = store.add_namespace(&request.namespace).await;
            if let Ok(path) = &result {
                tracing::info!(%path, "persisted namespace");
            }
            let _ = request.reply.send(result);
        }
    }

    /// Implements the index-add worker's state machine: `idle →
    /// load_head → [persist straight through | load_head_index → join →
    /// persist → advance_head] → reply → idle`, with any failure replying
    /// an error and leaving head unchanged.
    async fn run_add_indices(remote: Arc<RemoteNamespace>, mut rx: mpsc::Receiver<AddIndexRequest>) {
        while let Some(request) = rx.recv().await {
            let result = remote.handle_add_index(request.index).await;
            let _ = request.reply.send(result);
        }
    }

    async fn handle_add_index(&self, incoming: Index) -> Result<IpfsPath, EngineError> {
        match self.try_add_index(incoming).await {
            Ok(path) => {
                // `commit()` is what makes a staged `set_head` write
                // durable; the head pointer is only advanced once the new
                // index is successfully persisted, so commit only happens
                // on this success path.
                self.head_cache.commit().await?;
                Ok(path)
            }
            Err(err) => {
                if let Err(rollback_err) = self.head_cache.rollback().await {
                    tracing::error!(%rollback_err, "failed to roll back staged head write");
                }
                Err(err)
            }
        }
    }

    async fn try_add_index(&self, incoming: Index) -> Result<IpfsPath, EngineError> {
        let head = self.head_cache.get_head().await?;

        let current = if head.is_nil() {
            Index::empty()
        } else {
            self.load_index(head).await?
        };

        let joined = current.join_index(&incoming);
        let path = self.persist_index_unconditionally(&joined).await?;
        self.head_cache.set_head(path).await?;
        tracing::info!(%path, "advanced head");

        Ok(path)
    }

    async fn persist_index_unconditionally(&self, index: &Index) -> Result<IpfsPath, EngineError> {
        let addr = self.store.add_index(index).await?;
        if let Err(err) = self.index_cache.set_index(addr, index.clone()).await {
            tracing::error!(%addr, %err, "failed to populate index cache");
        }
        Ok(addr)
    }

    /// Enqueue a namespace for persistence and await its content address.
    pub async fn persist_namespace(&self, namespace: Namespace) -> Result<IpfsPath, EngineError> {
        let (reply, recv) = oneshot::channel();
        self.namespace_tx
            .send(AddNamespaceRequest { namespace, reply })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        recv.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Enqueue an index to be joined into the current head and persisted,
    /// advancing head on success.
    pub async fn persist_index(&self, index: Index) -> Result<IpfsPath, EngineError> {
        let (reply, recv) = oneshot::channel();
        self.index_tx
            .send(AddIndexRequest { index, reply })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        recv.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// The key-store this engine instance signs with and verifies
    /// against. Exposed so the evaluator (`godless-eval`) can sign a
    /// JOIN's points before handing the built table to `join_table`.
    pub fn key_store(&self) -> Arc<dyn KeyStore> {
        self.key_store.clone()
    }

    pub async fn head(&self) -> Result<IpfsPath, EngineError> {
        self.head_cache
            .get_head()
            .await
            .map_err(|e| EngineError::HeadCache(e.to_string()))
    }

    /// Load an index, consulting the cache first and populating it on a
    /// store fetch. A cache write failure is logged, never fatal.
    pub async fn load_index(&self, addr: IpfsPath) -> Result<Index, EngineError> {
        if let Some(cached) = self.index_cache.get_index(addr).await {
            return Ok(cached);
        }
        tracing::warn!(%addr, "index cache miss");

        let index = self.store.cat_index(addr).await?;

        let cache = self.index_cache.clone();
        let to_cache = index.clone();
        tokio::spawn(async move {
            if let Err(err) = cache.set_index(addr, to_cache).await {
                tracing::error!(%addr, %err, "failed to update index cache");
            }
        });

        Ok(index)
    }

    pub async fn load_current_index(&self) -> Result<Index, EngineError> {
        let head = self.head().await?;
        if head.is_nil() {
            return Err(EngineError::NoCurrentIndex);
        }
        self.load_index(head).await
    }

    /// Construct a namespace from a single table, persist it, sign a link
    /// to it with every known private key, and persist an index
    /// referencing that link under `table_key` — the JOIN evaluator's
    /// core operation.
    pub async fn join_table(&self, table_key: TableName, table: Table) -> Result<(), EngineError> {
        let namespace = Namespace::empty().join_table(table_key.clone(), &table);
        let addr = self.persist_namespace(namespace).await?;

        let keys = self.key_store.all_private_keys();
        let signed = Link::signed(addr, &keys)?;

        let index = Index::empty().join_link(table_key, signed);
        self.persist_index(index).await?;

        Ok(())
    }

    /// Select the links for `tables` from the current index and traverse
    /// their namespaces, invoking `reader` on each as it is preloaded.
    pub async fn load_traverse<R: NamespaceReader>(
        &self,
        tables: &[TableName],
        reader: R,
    ) -> Result<(), EngineError> {
        let index = self.load_current_index().await?;
        let mut links = Vec::new();
        for table in tables {
            links.extend(index.links(table));
        }
        self.traverse_links(links, reader).await
    }

    /// Traverse every link in the current index, across all tables — the
    /// "wildcard" traversal used by the dump-namespace reflection.
    pub async fn load_traverse_all<R: NamespaceReader>(&self, reader: R) -> Result<(), EngineError> {
        let index = self.load_current_index().await?;
        let links = index.all_links().into_iter().map(|(_, link)| link).collect();
        self.traverse_links(links, reader).await
    }

    /// Preload namespaces one ahead of the reader over a bounded channel.
    /// Cancellation: the reader signals stop by returning `more=false` or
    /// an error; the preloader observes this on its next send attempt and
    /// exits, and the caller joins the preloader task before returning so
    /// no task is ever leaked.
    async fn traverse_links<R: NamespaceReader>(
        &self,
        links: Vec<Link>,
        mut reader: R,
    ) -> Result<(), EngineError> {
        let (ns_tx, mut ns_rx) = mpsc::channel::<Namespace>(1);
        let (cancel_tx, mut cancel_rx) = mpsc::channel::<()>(1);
        let store = self.store.clone();
        let addrs: Vec<IpfsPath> = links.iter().map(Link::path).collect();

        let preloader = tokio::spawn(async move {
            for addr in addrs {
                let namespace = match store.cat_namespace(addr).await {
                    Ok(ns) => ns,
                    Err(err) => {
                        tracing::error!(%addr, %err, "namespace preload failed");
                        return;
                    }
                };

                tokio::select! {
                    _ = cancel_rx.recv() => return,
                    send_result = ns_tx.send(namespace) => {
                        if send_result.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        let mut outcome = Ok(());
        while let Some(namespace) = ns_rx.recv().await {
            let update = reader.read_namespace(namespace);
            if !update.should_continue() {
                let _ = cancel_tx.send(()).await;
                if let Some(err) = update.error {
                    outcome = Err(err);
                }
                break;
            }
        }

        drop(ns_rx);
        let _ = preloader.await;
        outcome
    }

    /// Join a list of peer index links into the local head. On a public
    /// index, a link must verify under a known public key or it is
    /// skipped and `some_failed` is set.
    pub async fn replicate(&self, links: &[Link]) -> Result<ReplicationReport, EngineError> {
        tracing::info!(count = links.len(), "replicating peer indices");
        let known_keys = self.key_store.all_public_keys();

        let mut joined = Index::empty();
        let mut some_failed = false;

        for link in links {
            if self.is_public_index && !link.is_verified_by_any(&known_keys) {
                tracing::warn!(path = %link.path(), "skipping unverified index link");
                some_failed = true;
                continue;
            }

            match self.load_index(link.path()).await {
                Ok(theirs) => joined = joined.join_index(&theirs),
                Err(err) => {
                    tracing::error!(path = %link.path(), %err, "failed to replicate index");
                    some_failed = true;
                }
            }
        }

        let addr = self.persist_index(joined).await?;
        tracing::info!(%addr, "replicated index");

        Ok(ReplicationReport {
            index_addr: addr,
            some_failed,
        })
    }
}

/// Re-export of the codec entry points the engine round-trips namespaces
/// and indices through when a store backend needs canonical bytes rather
/// than in-memory values (e.g. a content-addressed `ObjectStore` impl).
pub fn namespace_bytes(ns: &Namespace) -> Result<Vec<u8>, EngineError> {
    Ok(encode_namespace(ns)?)
}

pub fn namespace_from_bytes(bytes: &[u8]) -> Result<Namespace, EngineError> {
    let (ns, _invalid) = decode_namespace(bytes)?;
    Ok(ns)
}

pub fn index_bytes(idx: &Index) -> Result<Vec<u8>, EngineError> {
    Ok(encode_index(idx)?)
}

pub fn index_from_bytes(bytes: &[u8]) -> Result<Index, EngineError> {
    let (idx, _invalid) = decode_index(bytes)?;
    Ok(idx)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use rand::rngs::OsRng;

    use godless_core::{EntryName, Link, PrivateKey, Row, RowName, Table};

    use super::*;

    struct MockStore {
        namespaces: Mutex<HashMap<IpfsPath, Namespace>>,
        indices: Mutex<HashMap<IpfsPath, Index>>,
        cat_namespace_calls: AtomicUsize,
    }

    impl MockStore {
        fn new() -> Self {
            Self {
                namespaces: Mutex::new(HashMap::new()),
                indices: Mutex::new(HashMap::new()),
                cat_namespace_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ObjectStore for MockStore {
        async fn add_namespace(&self, ns: &Namespace) -> Result<IpfsPath, EngineError> {
            let bytes = namespace_bytes(ns)?;
            let addr = IpfsPath::of_bytes(&bytes);
            self.namespaces.lock().insert(addr, ns.clone());
            Ok(addr)
        }

        async fn add_index(&self, idx: &Index) -> Result<IpfsPath, EngineError> {
            let bytes = index_bytes(idx)?;
            let addr = IpfsPath::of_bytes(&bytes);
            self.indices.lock().insert(addr, idx.clone());
            Ok(addr)
        }

        async fn cat_namespace(&self, path: IpfsPath) -> Result<Namespace, EngineError> {
            self.cat_namespace_calls.fetch_add(1, Ordering::SeqCst);
            self.namespaces
                .lock()
                .get(&path)
                .cloned()
                .ok_or_else(|| EngineError::Store("namespace not found".into()))
        }

        async fn cat_index(&self, path: IpfsPath) -> Result<Index, EngineError> {
            self.indices
                .lock()
                .get(&path)
                .cloned()
                .ok_or_else(|| EngineError::Store("index not found".into()))
        }
    }

    struct MockHeadCache {
        head: Mutex<IpfsPath>,
    }

    impl MockHeadCache {
        fn new() -> Self {
            Self {
                head: Mutex::new(IpfsPath::NIL),
            }
        }
    }

    #[async_trait]
    impl HeadCache for MockHeadCache {
        async fn get_head(&self) -> Result<IpfsPath, EngineError> {
            Ok(*self.head.lock())
        }

        async fn set_head(&self, head: IpfsPath) -> Result<(), EngineError> {
            *self.head.lock() = head;
            Ok(())
        }
    }

    struct MockIndexCache {
        entries: Mutex<HashMap<IpfsPath, Index>>,
    }

    impl MockIndexCache {
        fn new() -> Self {
            Self {
                entries: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl IndexCache for MockIndexCache {
        async fn get_index(&self, addr: IpfsPath) -> Option<Index> {
            self.entries.lock().get(&addr).cloned()
        }

        async fn set_index(&self, addr: IpfsPath, idx: Index) -> Result<(), EngineError> {
            self.entries.lock().insert(addr, idx);
            Ok(())
        }
    }

    struct MockKeyStore {
        private: Vec<PrivateKey>,
    }

    impl KeyStore for MockKeyStore {
        fn all_public_keys(&self) -> Vec<godless_core::PublicKey> {
            self.private.iter().map(PrivateKey::public_key).collect()
        }

        fn all_private_keys(&self) -> Vec<PrivateKey> {
            self.private.clone()
        }
    }

    fn harness(is_public_index: bool) -> Arc<RemoteNamespace> {
        RemoteNamespace::new(RemoteNamespaceOptions {
            store: Arc::new(MockStore::new()),
            head_cache: Arc::new(MockHeadCache::new()),
            index_cache: Arc::new(MockIndexCache::new()),
            key_store: Arc::new(MockKeyStore { private: Vec::new() }),
            is_public_index,
        })
    }

    fn row_with(entry: &str, value: &str) -> Row {
        let point = godless_core::Point::unsigned(godless_core::PointText::new(value));
        let e = godless_core::Entry::empty().join_point(point);
        Row::empty().join_entry(EntryName::new(entry), &e)
    }

    #[tokio::test]
    async fn join_table_then_load_traverse_round_trips() {
        let remote = harness(false);
        let table = Table::empty().join_row(RowName::new("R0"), &row_with("A", "Hi"));
        remote
            .join_table(TableName::new("T"), table)
            .await
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let collector = seen.clone();
        remote
            .load_traverse(&[TableName::new("T")], move |ns: Namespace| {
                collector.lock().push(ns);
                TraversalUpdate::continue_()
            })
            .await
            .unwrap();

        assert_eq!(seen.lock().len(), 1);
        let row = seen.lock()[0]
            .get(&TableName::new("T"))
            .unwrap()
            .get(&RowName::new("R0"))
            .unwrap()
            .clone();
        assert!(row.get(&EntryName::new("A")).is_some());
    }

    #[tokio::test]
    async fn head_advances_monotonically_under_concurrent_insert_index() {
        let remote = harness(false);

        let mut handles = Vec::new();
        for i in 0..8 {
            let remote = remote.clone();
            handles.push(tokio::spawn(async move {
                let table = Table::empty()
                    .join_row(RowName::new(format!("R{i}")), &row_with("A", &format!("v{i}")));
                remote.join_table(TableName::new("T"), table).await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let index = remote.load_current_index().await.unwrap();
        assert_eq!(index.links(&TableName::new("T")).len(), 8);
    }

    #[tokio::test]
    async fn cancellation_stops_further_namespace_loads() {
        let remote = harness(false);
        for i in 0..5 {
            let table = Table::empty()
                .join_row(RowName::new(format!("R{i}")), &row_with("A", &format!("v{i}")));
            remote.join_table(TableName::new("T"), table).await.unwrap();
        }

        let seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen_writer = seen.clone();
        remote
            .load_traverse(&[TableName::new("T")], move |_ns: Namespace| {
                let count = seen_writer.fetch_add(1, Ordering::SeqCst) + 1;
                if count >= 2 {
                    TraversalUpdate::stop()
                } else {
                    TraversalUpdate::continue_()
                }
            })
            .await
            .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn replicate_skips_unverified_link_on_public_index() {
        let signer = PrivateKey::generate(&mut OsRng);
        let stranger = PrivateKey::generate(&mut OsRng);

        let remote = Arc::new(RemoteNamespace::new(RemoteNamespaceOptions {
            store: Arc::new(MockStore::new()),
            head_cache: Arc::new(MockHeadCache::new()),
            index_cache: Arc::new(MockIndexCache::new()),
            key_store: Arc::new(MockKeyStore {
                private: vec![signer.clone()],
            }),
            is_public_index: true,
        }));

        let peer_index = Index::empty().join_link(
            TableName::new("T"),
            Link::unsigned(IpfsPath::of_bytes(b"peer-blob")),
        );
        let peer_addr = remote.store.add_index(&peer_index).await.unwrap();

        let signed_link = Link::signed(peer_addr, &[signer]).unwrap();
        let unsigned_link = Link::signed(IpfsPath::of_bytes(b"other"), &[stranger]).unwrap();

        let report = remote
            .replicate(&[signed_link, unsigned_link])
            .await
            .unwrap();

        assert!(report.some_failed);
        let merged = remote.load_current_index().await.unwrap();
        assert_eq!(merged.links(&TableName::new("T")).len(), 1);
    }
}
