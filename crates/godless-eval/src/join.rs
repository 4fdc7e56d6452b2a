use std::sync::Arc;

use async_trait::async_trait;

use godless_core::{Entry, Point, Row, Table, TableName};
use godless_engine::RemoteNamespace;
use godless_query::QueryJoin;

use crate::response::{RequestKind, Response, ResponseBody};
use crate::Responder;

/// Evaluates a compiled JOIN: signs every row's entry values with every
/// private key in the key-store to produce `Point`s, builds a `Table`,
/// and hands it to the merge engine, which persists the namespace and
/// advances the head with a signed link to it.
pub struct JoinEvaluator {
    remote: Arc<RemoteNamespace>,
    table_key: TableName,
    join: QueryJoin,
}

impl JoinEvaluator {
    pub fn new(remote: Arc<RemoteNamespace>, table_key: TableName, join: QueryJoin) -> Self {
        Self {
            remote,
            table_key,
            join,
        }
    }

    fn build_table(&self) -> Result<Table, godless_core::CryptoError> {
        let keys = self.remote.key_store().all_private_keys();
        let mut table = Table::empty();

        for row_join in &self.join.rows {
            let mut row = Row::empty();
            for (entry_name, point_text) in &row_join.entries {
                let point = Point::signed(point_text.clone(), &keys)?;
                let entry = Entry::empty().join_point(point);
                row = row.join_entry(entry_name.clone(), &entry);
            }
            table = table.join_row(row_join.row_key.clone(), &row);
        }

        Ok(table)
    }
}

#[async_trait]
impl Responder for JoinEvaluator {
    async fn run(&self) -> Response {
        let table = match self.build_table() {
            Ok(table) => table,
            Err(err) => return Response::fail(RequestKind::Query, err),
        };

        match self.remote.join_table(self.table_key.clone(), table).await {
            Ok(()) => Response::ok(RequestKind::Query, ResponseBody::Joined),
            Err(err) => Response::fail(RequestKind::Query, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use parking_lot::Mutex;
    use rand::rngs::OsRng;

    use godless_core::{EntryName, Index, IpfsPath, Namespace, PointText, PrivateKey, RowName};
    use godless_engine::{EngineError, HeadCache, IndexCache, KeyStore, ObjectStore, RemoteNamespaceOptions};
    use godless_query::{parse_query, QueryBody};

    use super::*;

    struct MockStore {
        namespaces: Mutex<HashMap<IpfsPath, Namespace>>,
        indices: Mutex<HashMap<IpfsPath, Index>>,
    }

    impl MockStore {
        fn new() -> Self {
            Self {
                namespaces: Mutex::new(HashMap::new()),
                indices: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl ObjectStore for MockStore {
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
                .ok_or_else(|| EngineError::Store("missing namespace".into()))
        }

        async fn cat_index(&self, path: IpfsPath) -> Result<Index, EngineError> {
            self.indices
                .lock()
                .get(&path)
                .cloned()
                .ok_or_else(|| EngineError::Store("missing index".into()))
        }
    }

    struct MockHeadCache(Mutex<IpfsPath>);

    #[async_trait]
    impl HeadCache for MockHeadCache {
        async fn get_head(&self) -> Result<IpfsPath, EngineError> {
            Ok(*self.0.lock())
        }
        async fn set_head(&self, head: IpfsPath) -> Result<(), EngineError> {
            *self.0.lock() = head;
            Ok(())
        }
    }

    struct MockIndexCache;

    #[async_trait]
    impl IndexCache for MockIndexCache {
        async fn get_index(&self, _addr: IpfsPath) -> Option<Index> {
            None
        }
        async fn set_index(&self, _addr: IpfsPath, _idx: Index) -> Result<(), EngineError> {
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

    #[tokio::test]
    async fn s5_join_persists_a_signed_point_and_advances_head() {
        let key = PrivateKey::generate(&mut OsRng);
        let remote = RemoteNamespace::new(RemoteNamespaceOptions {
            store: Arc::new(MockStore::new()),
            head_cache: Arc::new(MockHeadCache(Mutex::new(IpfsPath::NIL))),
            index_cache: Arc::new(MockIndexCache),
            key_store: Arc::new(OneKey(key.clone())),
            is_public_index: false,
        });

        let query = parse_query("join T rows (@key=R0, A='Hi')").unwrap();
        let QueryBody::Join(join) = query.body else { panic!("expected join") };
        let evaluator = JoinEvaluator::new(remote.clone(), query.table_key, join);

        let response = evaluator.run().await;
        assert!(response.is_ok());
        assert_eq!(response.body, Some(ResponseBody::Joined));

        let index = remote.load_current_index().await.unwrap();
        let links = index.links(&TableName::new("T"));
        assert_eq!(links.len(), 1);
        assert!(links[0].is_verified_by_any(&[key.public_key()]));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let collector = seen.clone();
        remote
            .load_traverse(&[TableName::new("T")], move |ns: Namespace| {
                collector.lock().push(ns);
                godless_engine::TraversalUpdate::continue_()
            })
            .await
            .unwrap();

        let ns = seen.lock().remove(0);
        let table = ns.get(&TableName::new("T")).unwrap();
        let row = table.get(&RowName::new("R0")).unwrap();
        let entry = row.get(&EntryName::new("A")).unwrap();
        let point = entry.values().next().unwrap();
        assert_eq!(point.text(), &PointText::new("Hi"));
        assert!(point.is_verified_by_any(&[key.public_key()]));
    }
}
