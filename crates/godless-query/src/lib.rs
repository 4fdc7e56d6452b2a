#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
//! # Godless Query — grammar, AST, and compiler
//!
//! Parses the `select`/`join` query language into a validated `Query`.
//! Unlike the generated-PEG-parser original this implements, the grammar
//! here is a small set of `nom` combinators; validation (missing limit,
//! empty join row) happens once, in `parse_query`, rather than being
//! spread across a separate AST-walking compile step.

pub mod ast;
pub mod error;
pub mod parser;

pub use ast::{
    OpCode, PredicateOpCode, Query, QueryBody, QueryJoin, QueryPredicate, QueryRowJoin,
    QuerySelect, QueryValue, QueryWhere,
};
pub use error::QueryError;
pub use parser::parse_query;
