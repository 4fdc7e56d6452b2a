use std::collections::BTreeMap;
use std::fmt;

use godless_core::{EntryName, Index, IpfsPath, Namespace, PointText, RowName};

/// Which of the dispatcher's three request kinds produced this response.
/// Carried on every `Response`, including failures, so a caller can route
/// an error without having kept the original request around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Query,
    Replicate,
    Reflect,
}

/// One row matched by a SELECT, carrying every entry on the row (not only
/// the entries a predicate happened to reference).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRow {
    pub row_key: RowName,
    pub entries: BTreeMap<EntryName, Vec<PointText>>,
}

/// The successful payload of a `Response`. Absent on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// SELECT's matched rows, in traversal order, up to the query's limit.
    Rows(Vec<ResponseRow>),
    /// JOIN completed and the head now includes the new table data.
    Joined,
    /// REPLICATE completed; `some_failed` is set if any peer link was
    /// skipped (unverified) or failed to load.
    Replicated { some_failed: bool },
    Head(IpfsPath),
    Index(Index),
    Namespace(Namespace),
}

/// The wire response a dispatcher call or reflection request resolves to.
/// A failure carries `{kind, err, msg}` and no body — this type makes
/// "only these three fields" the only representable failure shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub kind: RequestKind,
    pub body: Option<ResponseBody>,
    pub err: Option<String>,
    pub msg: Option<String>,
}

impl Response {
    pub fn ok(kind: RequestKind, body: ResponseBody) -> Self {
        Self {
            kind,
            body: Some(body),
            err: None,
            msg: None,
        }
    }

    pub fn ok_with_msg(kind: RequestKind, body: ResponseBody, msg: impl Into<String>) -> Self {
        Self {
            kind,
            body: Some(body),
            err: None,
            msg: Some(msg.into()),
        }
    }

    pub fn fail(kind: RequestKind, err: impl fmt::Display) -> Self {
        Self {
            kind,
            body: None,
            err: Some(err.to_string()),
            msg: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }
}
