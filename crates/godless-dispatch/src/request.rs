use godless_core::Link;
use godless_eval::Response;
use godless_query::Query;
use tokio::sync::oneshot;

/// Which reflection a `Reflect` request asks for: the current head hash,
/// the decoded index, or a wildcard-traversal dump of every namespace the
/// index reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflectKind {
    Head,
    Index,
    DumpNamespace,
}

/// The body of one call into the dispatcher: a query, a replication
/// request, or a reflection request, carried here as an enum instead of a
/// tag-plus-optional-fields struct since Rust's enums make the "exactly
/// one of these" constraint a type-level fact.
#[derive(Debug, Clone)]
pub enum RequestPayload {
    Query(Query),
    Replicate(Vec<Link>),
    Reflect(ReflectKind),
}

/// One call into the dispatcher.
#[derive(Debug, Clone)]
pub struct Request {
    pub payload: RequestPayload,
}

impl Request {
    pub fn query(query: Query) -> Self {
        Self {
            payload: RequestPayload::Query(query),
        }
    }

    pub fn replicate(links: Vec<Link>) -> Self {
        Self {
            payload: RequestPayload::Replicate(links),
        }
    }

    pub fn reflect(kind: ReflectKind) -> Self {
        Self {
            payload: RequestPayload::Reflect(kind),
        }
    }
}

/// A request paired with the reply channel its handler must send exactly
/// one `Response` on. Lives only inside the queue and the worker loop —
/// callers only ever see `Request`/the receiving half of the channel.
pub(crate) struct QueuedRequest {
    pub request: Request,
    pub reply: oneshot::Sender<Response>,
}
