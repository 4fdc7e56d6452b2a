use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::CryptoError;
use crate::keys::{PrivateKey, PublicKey};

/// The user's value: an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PointText(pub String);

impl PointText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl fmt::Display for PointText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The opaque printable form of a digital signature over a `PointText`.
///
/// An empty signature text stands for "no signature" (the point was never
/// signed); it is never produced by `sign`, only by the stream codec to
/// represent an unsigned point (see `godless-codec`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SignatureText(pub String);

impl SignatureText {
    pub fn is_nil(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SignatureText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value together with the set of signatures witnessing it.
///
/// Points with the same text but different signature sets join by union of
/// signatures (`join`). A point with no signatures is valid: it represents
/// an unsigned write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    text: PointText,
    signatures: BTreeSet<SignatureText>,
}

impl Point {
    /// A point with no signatures.
    pub fn unsigned(text: PointText) -> Self {
        Self {
            text,
            signatures: BTreeSet::new(),
        }
    }

    /// A point signed once per key in `keys`.
    pub fn signed(text: PointText, keys: &[PrivateKey]) -> Result<Self, CryptoError> {
        let mut signatures = BTreeSet::new();
        for key in keys {
            signatures.insert(key.sign(&text.0)?);
        }
        Ok(Self { text, signatures })
    }

    /// Reconstruct a point from an already-computed signature set (used by
    /// the stream decoder, which has validated each signature's printable
    /// form but does not re-derive it).
    pub fn presigned(text: PointText, signatures: BTreeSet<SignatureText>) -> Self {
        Self { text, signatures }
    }

    pub fn text(&self) -> &PointText {
        &self.text
    }

    pub fn signatures(&self) -> &BTreeSet<SignatureText> {
        &self.signatures
    }

    /// True iff at least one signature validates under some key in `keys`.
    pub fn is_verified_by_any(&self, keys: &[PublicKey]) -> bool {
        self.signatures
            .iter()
            .any(|sig| keys.iter().any(|key| key.verify(&self.text.0, sig)))
    }

    /// Join two points. This is only meaningful for points sharing the
    /// same text; joining points with different text unions their
    /// signatures under the caller's text (callers — `Entry::join` — never
    /// do this; they keep points with differing text as distinct set
    /// members).
    pub fn join(&self, other: &Point) -> Point {
        let mut signatures = self.signatures.clone();
        signatures.extend(other.signatures.iter().cloned());
        Point {
            text: self.text.clone(),
            signatures,
        }
    }
}
