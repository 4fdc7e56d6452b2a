use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{oneshot, Semaphore};

use godless_core::Namespace;
use godless_engine::{RemoteNamespace, TraversalUpdate};
use godless_eval::{JoinEvaluator, RequestKind, Response, ResponseBody, Responder, SelectEvaluator};
use godless_query::QueryBody;

use crate::queue::{FifoQueue, RequestQueue};
use crate::request::{QueuedRequest, ReflectKind, Request, RequestPayload};

/// Tunables for a [`Dispatcher`]: the backing engine and the fixed-size
/// query-concurrency semaphore.
pub struct DispatcherOptions {
    pub remote: Arc<RemoteNamespace>,
    pub query_concurrency: usize,
}

/// The dispatcher worker: drains the queue one request at a time,
/// spawning a handler per request that first acquires a semaphore permit.
/// Grounded in `internal/service/key_value_store.go`'s `executeLoop` —
/// `kv.queue.Drain()` becomes `queue.drain_one()` in a loop, and
/// `kv.lockResource()`/`unlockResource()` (a buffered channel used as a
/// counting lock) becomes a `tokio::sync::Semaphore` permit held for the
/// handler's lifetime.
pub struct Dispatcher {
    queue: Arc<dyn RequestQueue>,
}

impl Dispatcher {
    /// Builds a dispatcher with the default FIFO queue.
    pub fn new(options: DispatcherOptions) -> Arc<Dispatcher> {
        Self::spawn(Arc::new(FifoQueue::new()), options)
    }

    fn spawn(queue: Arc<dyn RequestQueue>, options: DispatcherOptions) -> Arc<Dispatcher> {
        let dispatcher = Arc::new(Dispatcher {
            queue: queue.clone(),
        });
        let semaphore = Arc::new(Semaphore::new(options.query_concurrency.max(1)));
        tokio::spawn(run_worker(queue, options.remote, semaphore));
        dispatcher
    }

    /// Enqueues `request` and returns a receiver that yields exactly one
    /// `Response`, then closes — every code path through `handle` sends
    /// exactly once.
    pub fn call(&self, request: Request) -> oneshot::Receiver<Response> {
        let (reply, receiver) = oneshot::channel();
        self.queue.enqueue(QueuedRequest { request, reply });
        receiver
    }
}

async fn run_worker(queue: Arc<dyn RequestQueue>, remote: Arc<RemoteNamespace>, semaphore: Arc<Semaphore>) {
    loop {
        let queued = queue.drain_one().await;
        let remote = remote.clone();
        let semaphore = semaphore.clone();
        tokio::spawn(async move {
            let permit = semaphore.acquire().await;
            let response = handle(&remote, queued.request).await;
            drop(permit);
            // A receiver dropped without awaiting (the caller gave up) is
            // not this handler's problem to report.
            let _ = queued.reply.send(response);
        });
    }
}

async fn handle(remote: &Arc<RemoteNamespace>, request: Request) -> Response {
    match request.payload {
        RequestPayload::Query(query) => {
            tracing::info!(table = %query.table_key, "dispatcher running query");
            let table_key = query.table_key.clone();
            match query.body {
                QueryBody::Select(select) => {
                    let evaluator =
                        SelectEvaluator::new(remote.clone(), table_key, select.where_tree, select.limit);
                    evaluator.run().await
                }
                QueryBody::Join(join) => {
                    let evaluator = JoinEvaluator::new(remote.clone(), table_key, join);
                    evaluator.run().await
                }
            }
        }
        RequestPayload::Replicate(links) => {
            tracing::info!(count = links.len(), "dispatcher running replicate");
            match remote.replicate(&links).await {
                Ok(report) => Response::ok(
                    RequestKind::Replicate,
                    ResponseBody::Replicated {
                        some_failed: report.some_failed,
                    },
                ),
                Err(err) => Response::fail(RequestKind::Replicate, err),
            }
        }
        RequestPayload::Reflect(kind) => run_reflect(remote, kind).await,
    }
}

async fn run_reflect(remote: &Arc<RemoteNamespace>, kind: ReflectKind) -> Response {
    match kind {
        ReflectKind::Head => match remote.head().await {
            Ok(head) if !head.is_nil() => Response::ok(RequestKind::Reflect, ResponseBody::Head(head)),
            Ok(_) => Response::fail(RequestKind::Reflect, "no index available"),
            Err(err) => Response::fail(RequestKind::Reflect, err),
        },
        ReflectKind::Index => match remote.load_current_index().await {
            Ok(index) => Response::ok(RequestKind::Reflect, ResponseBody::Index(index)),
            Err(err) => Response::fail(RequestKind::Reflect, err),
        },
        ReflectKind::DumpNamespace => {
            let everything = Arc::new(Mutex::new(Namespace::empty()));
            let collector = everything.clone();
            let result = remote
                .load_traverse_all(move |ns: Namespace| {
                    let mut guard = collector.lock();
                    *guard = guard.join_namespace(&ns);
                    TraversalUpdate::continue_()
                })
                .await;

            match result {
                Ok(()) => {
                    let dump = Arc::try_unwrap(everything)
                        .map(Mutex::into_inner)
                        .unwrap_or_else(|shared| shared.lock().clone());
                    Response::ok(RequestKind::Reflect, ResponseBody::Namespace(dump))
                }
                Err(err) => Response::fail(RequestKind::Reflect, err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use godless_core::{Index, IpfsPath as Ipfs, Link, Namespace as Ns, PrivateKey, TableName};
    use godless_engine::{EngineError, HeadCache, IndexCache, KeyStore, ObjectStore, RemoteNamespaceOptions};
    use godless_query::parse_query;
    use rand::rngs::OsRng;

    use super::*;
    use crate::request::Request;

    struct MockStore {
        namespaces: Mutex<HashMap<Ipfs, Ns>>,
        indices: Mutex<HashMap<Ipfs, Index>>,
    }

    impl MockStore {
        fn new() -> Self {
            Self {
                namespaces: Mutex::new(HashMap::new()),
                indices: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ObjectStore for MockStore {
        async fn add_namespace(&self, ns: &Ns) -> Result<Ipfs, EngineError> {
            let bytes = godless_engine::namespace_bytes(ns)?;
            let addr = Ipfs::of_bytes(&bytes);
            self.namespaces.lock().insert(addr, ns.clone());
            Ok(addr)
        }

        async fn add_index(&self, idx: &Index) -> Result<Ipfs, EngineError> {
            let bytes = godless_engine::index_bytes(idx)?;
            let addr = Ipfs::of_bytes(&bytes);
            self.indices.lock().insert(addr, idx.clone());
            Ok(addr)
        }

        async fn cat_namespace(&self, path: Ipfs) -> Result<Ns, EngineError> {
            self.namespaces
                .lock()
                .get(&path)
                .cloned()
                .ok_or_else(|| EngineError::Store("missing namespace".into()))
        }

        async fn cat_index(&self, path: Ipfs) -> Result<Index, EngineError> {
            self.indices
                .lock()
                .get(&path)
                .cloned()
                .ok_or_else(|| EngineError::Store("missing index".into()))
        }
    }

    struct MockHeadCache(Mutex<Ipfs>);

    #[async_trait::async_trait]
    impl HeadCache for MockHeadCache {
        async fn get_head(&self) -> Result<Ipfs, EngineError> {
            Ok(*self.0.lock())
        }
        async fn set_head(&self, head: Ipfs) -> Result<(), EngineError> {
            *self.0.lock() = head;
            Ok(())
        }
    }

    struct MockIndexCache;

    #[async_trait::async_trait]
    impl IndexCache for MockIndexCache {
        async fn get_index(&self, _addr: Ipfs) -> Option<Index> {
            None
        }
        async fn set_index(&self, _addr: Ipfs, _idx: Index) -> Result<(), EngineError> {
            Ok(())
        }
    }

    struct OneKey(PrivateKey);
    impl KeyStore for OneKey {
        fn all_public_keys(&self) -> Vec<godless_core::PublicKey> {
            vec![self.0.public_key()]
        }
        fn all_private_keys(&self) -> Vec<PrivateKey> {
            vec![self.0.clone()]
        }
    }

    fn harness() -> Arc<RemoteNamespace> {
        let key = PrivateKey::generate(&mut OsRng);
        RemoteNamespace::new(RemoteNamespaceOptions {
            store: Arc::new(MockStore::new()),
            head_cache: Arc::new(MockHeadCache(Mutex::new(Ipfs::NIL))),
            index_cache: Arc::new(MockIndexCache),
            key_store: Arc::new(OneKey(key)),
            is_public_index: false,
        })
    }

    #[tokio::test]
    async fn reflect_head_fails_before_any_join() {
        let dispatcher = Dispatcher::new(DispatcherOptions {
            remote: harness(),
            query_concurrency: 2,
        });

        let response = dispatcher
            .call(Request::reflect(ReflectKind::Head))
            .await
            .unwrap();
        assert!(!response.is_ok());
    }

    #[tokio::test]
    async fn join_then_reflect_head_and_select_round_trip() {
        let remote = harness();
        let dispatcher = Dispatcher::new(DispatcherOptions {
            remote: remote.clone(),
            query_concurrency: 2,
        });

        let query = parse_query("join T rows (@key=R0, A='Hi')").unwrap();
        let joined = dispatcher.call(Request::query(query)).await.unwrap();
        assert!(joined.is_ok());

        let head = dispatcher
            .call(Request::reflect(ReflectKind::Head))
            .await
            .unwrap();
        assert!(head.is_ok());
        assert!(matches!(head.body, Some(ResponseBody::Head(addr)) if !addr.is_nil()));

        let select = parse_query("select T where str_eq('Hi', A) limit 1").unwrap();
        let selected = dispatcher.call(Request::query(select)).await.unwrap();
        let Some(ResponseBody::Rows(rows)) = selected.body else {
            panic!("expected rows")
        };
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn reflect_dump_namespace_merges_every_table() {
        let remote = harness();
        let dispatcher = Dispatcher::new(DispatcherOptions {
            remote: remote.clone(),
            query_concurrency: 1,
        });

        for (table, row_key) in [("T", "R0"), ("U", "R1")] {
            let query = parse_query(&format!("join {table} rows (@key={row_key}, A='x')")).unwrap();
            let response = dispatcher.call(Request::query(query)).await.unwrap();
            assert!(response.is_ok());
        }

        let dump = dispatcher
            .call(Request::reflect(ReflectKind::DumpNamespace))
            .await
            .unwrap();
        let Some(ResponseBody::Namespace(ns)) = dump.body else {
            panic!("expected namespace dump")
        };
        assert!(ns.get(&TableName::new("T")).is_some());
        assert!(ns.get(&TableName::new("U")).is_some());
    }

    #[tokio::test]
    async fn replicate_reports_partial_success_when_a_peer_index_cannot_load() {
        let remote = harness();
        let dispatcher = Dispatcher::new(DispatcherOptions {
            remote: remote.clone(),
            query_concurrency: 1,
        });

        let orphan_addr = Ipfs::of_bytes(b"nonexistent");
        let dangling = Link::unsigned(orphan_addr);

        let response = dispatcher
            .call(Request::replicate(vec![dangling]))
            .await
            .unwrap();
        assert!(response.is_ok());
        assert_eq!(
            response.body,
            Some(ResponseBody::Replicated { some_failed: true })
        );
    }
}
