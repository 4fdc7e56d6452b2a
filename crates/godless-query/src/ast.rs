use std::collections::BTreeMap;

use godless_core::{EntryName, PointText, PublicKeyHash, RowName, TableName};

/// Which of `Query::body`'s variants applies.
///
/// Carried alongside `QueryBody` (rather than inferred from it) because
/// the compiled form mirrors the wire shape queries arrive in: callers
/// that only need to route a request don't need to match on the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Select,
    Join,
}

/// A fully compiled, validated query, ready for the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub op_code: OpCode,
    pub table_key: TableName,
    /// Public keys a replication/validation caller associated with this
    /// query. Never produced by the text grammar itself; set by the
    /// caller (e.g. a dispatcher enforcing a public index's signature
    /// policy) via `with_public_keys`.
    pub public_keys: Vec<PublicKeyHash>,
    pub body: QueryBody,
}

impl Query {
    #[must_use]
    pub fn with_public_keys(mut self, keys: Vec<PublicKeyHash>) -> Self {
        self.public_keys = keys;
        self
    }

    pub fn select(&self) -> Option<&QuerySelect> {
        match &self.body {
            QueryBody::Select(select) => Some(select),
            QueryBody::Join(_) => None,
        }
    }

    pub fn join(&self) -> Option<&QueryJoin> {
        match &self.body {
            QueryBody::Join(join) => Some(join),
            QueryBody::Select(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryBody {
    Select(QuerySelect),
    Join(QueryJoin),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySelect {
    pub where_tree: Option<QueryWhere>,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryJoin {
    pub rows: Vec<QueryRowJoin>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRowJoin {
    pub row_key: RowName,
    pub entries: BTreeMap<EntryName, PointText>,
}

/// A node in a where-tree. `And`/`Or` always carry at least one clause —
/// the grammar's `("," where)*` repetition cannot produce an empty list,
/// since the first `where` is mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryWhere {
    And(Vec<QueryWhere>),
    Or(Vec<QueryWhere>),
    Predicate(QueryPredicate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateOpCode {
    StrEq,
    StrNeq,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPredicate {
    pub op_code: PredicateOpCode,
    pub values: Vec<QueryValue>,
}

/// One operand of a predicate: a quoted literal, a named key (projects to
/// the row's entry value(s)), or `@key` (projects to the row's own name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Literal(String),
    Key(EntryName),
    RowKey,
}
