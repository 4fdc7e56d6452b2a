#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
//! # Godless Eval — query evaluator
//!
//! Two evaluators (`SelectEvaluator`, `JoinEvaluator`), each implementing
//! a shared `Responder` capability: `run() -> Response`. Both hold a
//! `RemoteNamespace` handle and do their own traversal/signing
//! before handing off to the merge engine; neither ever panics on a user
//! error — engine failures are caught and turned into a failed `Response`.

pub mod join;
pub mod predicate;
pub mod response;
pub mod select;

use async_trait::async_trait;

pub use join::JoinEvaluator;
pub use response::{RequestKind, Response, ResponseBody, ResponseRow};
pub use select::SelectEvaluator;

/// A query evaluator that always produces exactly one `Response`, never a
/// `Result` — errors are represented *as* a failed response rather than
/// propagated, since the dispatcher (`godless-dispatch`) guarantees
/// exactly one reply per request regardless of outcome.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn run(&self) -> Response;
}
