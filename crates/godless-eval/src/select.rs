use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use godless_core::{Namespace, Row, RowName, TableName};
use godless_engine::{NamespaceReader, RemoteNamespace, TraversalUpdate};
use godless_query::QueryWhere;

use crate::predicate::where_matches;
use crate::response::{RequestKind, Response, ResponseBody, ResponseRow};
use crate::Responder;

/// Evaluates a compiled SELECT: traverses every namespace under the
/// query's table, keeping every row whose where-tree matches, up to
/// `limit`. Reaching `limit` stops the traversal: once the limit is hit,
/// traversal signals "stop" to the loader and no further namespaces are
/// fetched.
pub struct SelectEvaluator {
    remote: Arc<RemoteNamespace>,
    table_key: TableName,
    where_tree: Option<QueryWhere>,
    limit: u32,
}

impl SelectEvaluator {
    pub fn new(
        remote: Arc<RemoteNamespace>,
        table_key: TableName,
        where_tree: Option<QueryWhere>,
        limit: u32,
    ) -> Self {
        Self {
            remote,
            table_key,
            where_tree,
            limit,
        }
    }
}

#[async_trait]
impl Responder for SelectEvaluator {
    async fn run(&self) -> Response {
        let matched = Arc::new(Mutex::new(Vec::new()));
        let reader = SelectReader {
            table_key: self.table_key.clone(),
            where_tree: self.where_tree.clone(),
            limit: self.limit as usize,
            matched: matched.clone(),
        };

        match self.remote.load_traverse(&[self.table_key.clone()], reader).await {
            Ok(()) => {
                let rows = Arc::try_unwrap(matched)
                    .map(Mutex::into_inner)
                    .unwrap_or_else(|shared| shared.lock().clone());
                Response::ok(RequestKind::Query, ResponseBody::Rows(rows))
            }
            Err(err) => Response::fail(RequestKind::Query, err),
        }
    }
}

struct SelectReader {
    table_key: TableName,
    where_tree: Option<QueryWhere>,
    limit: usize,
    matched: Arc<Mutex<Vec<ResponseRow>>>,
}

impl NamespaceReader for SelectReader {
    fn read_namespace(&mut self, ns: Namespace) -> TraversalUpdate {
        if let Some(table) = ns.get(&self.table_key) {
            let mut matched = self.matched.lock();
            for (row_name, row) in table.rows() {
                if matched.len() >= self.limit {
                    break;
                }
                if self.row_matches(row_name, row) {
                    matched.push(to_response_row(row_name.clone(), row));
                }
            }
        }

        if self.matched.lock().len() >= self.limit {
            TraversalUpdate::stop()
        } else {
            TraversalUpdate::continue_()
        }
    }
}

impl SelectReader {
    fn row_matches(&self, row_name: &RowName, row: &Row) -> bool {
        match &self.where_tree {
            Some(where_tree) => where_matches(where_tree, row_name, row),
            None => true,
        }
    }
}

fn to_response_row(row_key: RowName, row: &Row) -> ResponseRow {
    let entries = row
        .entries()
        .map(|(name, entry)| {
            let values = entry.values().map(|p| p.text().clone()).collect();
            (name.clone(), values)
        })
        .collect();
    ResponseRow { row_key, entries }
}
