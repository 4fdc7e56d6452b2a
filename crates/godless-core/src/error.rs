use thiserror::Error;

/// Errors raised while signing or verifying points and links.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// A private key failed to produce a signature.
    #[error("signing failed: {0}")]
    SignFailed(String),

    /// A signature's printable form could not be parsed back into bytes.
    #[error("bad signature: {0}")]
    BadSignature(String),
}
