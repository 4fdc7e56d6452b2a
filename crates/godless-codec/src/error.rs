use thiserror::Error;

/// Errors raised while decoding a canonical stream.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A point or link batch's header tuple did not match one of its
    /// successors — the byte stream is not in canonical form.
    #[error("corrupt stream: {0}")]
    CorruptStream(String),

    /// The binary framing itself could not be parsed.
    #[error("malformed stream bytes: {0}")]
    Malformed(String),
}

impl From<bincode::Error> for CodecError {
    fn from(err: bincode::Error) -> Self {
        CodecError::Malformed(err.to_string())
    }
}
