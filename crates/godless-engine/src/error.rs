use thiserror::Error;

use godless_codec::CodecError;
use godless_core::CryptoError;

/// Errors raised by the merge engine: store/cache failures, signing
/// failures, and codec failures surfacing through the object store.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("object store failed: {0}")]
    Store(String),

    #[error("head cache failed: {0}")]
    HeadCache(String),

    #[error("index cache failed: {0}")]
    IndexCache(String),

    #[error("no current index")]
    NoCurrentIndex,

    #[error("signing failed: {0}")]
    Sign(#[from] CryptoError),

    #[error("stream codec failed: {0}")]
    Codec(#[from] CodecError),

    #[error("engine worker channel closed unexpectedly")]
    ChannelClosed,
}
