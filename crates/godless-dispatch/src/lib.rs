#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
//! # Godless Dispatch — request queue and API surface
//!
//! The single entry point external callers use: `Dispatcher::call(request)
//! -> response_channel`. A FIFO queue (the default; `RequestQueue` is a
//! hook for other orderings) feeds a worker that spawns one handler task
//! per request, each gated on a fixed-size `Semaphore` permit (the query
//! concurrency cap). Every handler sends exactly one
//! `Response` on its request's reply channel, win or fail.

mod dispatcher;
mod queue;
mod request;

pub use dispatcher::{Dispatcher, DispatcherOptions};
pub use request::{ReflectKind, Request, RequestPayload};
