use thiserror::Error;

/// Errors raised by the reference store/cache implementations. Every
/// variant converts into `EngineError::Store`/`HeadCache`/`IndexCache` at
/// the trait boundary — callers outside this crate only ever see the
/// engine's own error type.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("codec error: {0}")]
    Codec(#[from] godless_codec::CodecError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed cache file: {0}")]
    Corrupt(String),
}
