use thiserror::Error;

/// Errors raised while parsing or compiling a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The input text did not match the query grammar.
    #[error("query parse error: {0}")]
    Parse(String),

    /// The text parsed but violates a compile-time rule (missing limit,
    /// empty join row, trailing input).
    #[error("invalid query: {0}")]
    Invalid(String),
}
