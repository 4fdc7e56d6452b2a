use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::CryptoError;
use crate::hash::IpfsPath;
use crate::keys::{PrivateKey, PublicKey};
use crate::point::SignatureText;

/// A content hash plus the set of signatures witnessing it.
///
/// Links are never mutated in place; new signatures extend a link only via
/// `join_link`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Link {
    path: IpfsPath,
    signatures: BTreeSet<SignatureText>,
}

impl Link {
    pub fn unsigned(path: IpfsPath) -> Self {
        Self {
            path,
            signatures: BTreeSet::new(),
        }
    }

    /// Sign `path` once per key in `keys`.
    pub fn signed(path: IpfsPath, keys: &[PrivateKey]) -> Result<Self, CryptoError> {
        let mut signatures = BTreeSet::new();
        for key in keys {
            signatures.insert(key.sign(&path.to_hex())?);
        }
        Ok(Self { path, signatures })
    }

    pub fn presigned(path: IpfsPath, signatures: BTreeSet<SignatureText>) -> Self {
        Self { path, signatures }
    }

    pub fn path(&self) -> IpfsPath {
        self.path
    }

    pub fn signatures(&self) -> &BTreeSet<SignatureText> {
        &self.signatures
    }

    /// True iff some signature validates under some key in `keys`.
    pub fn is_verified_by_any(&self, keys: &[PublicKey]) -> bool {
        self.signatures
            .iter()
            .any(|sig| keys.iter().any(|key| key.verify(&self.path.to_hex(), sig)))
    }

    /// Join two links over the same path (signature union). Joining links
    /// over different paths is a caller bug; `Index::join_table` never
    /// does this — it keys links by path before merging.
    #[must_use]
    pub fn join_link(&self, other: &Link) -> Link {
        let mut signatures = self.signatures.clone();
        signatures.extend(other.signatures.iter().cloned());
        Link {
            path: self.path,
            signatures,
        }
    }
}
