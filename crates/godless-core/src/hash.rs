use serde::{Deserialize, Serialize};
use std::fmt;

/// Content hash identifying a blob in the object store.
///
/// Conceptually an IPFS path: the hash of a canonically-encoded namespace
/// or index, as returned by `ObjectStore::add_namespace`/`add_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IpfsPath(pub [u8; 32]);

impl IpfsPath {
    /// The nil path: "no index published yet".
    pub const NIL: IpfsPath = IpfsPath([0u8; 32]);

    /// Hash arbitrary bytes into a path.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub fn is_nil(&self) -> bool {
        *self == Self::NIL
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut array = [0u8; 32];
        array.copy_from_slice(&bytes);
        Ok(Self(array))
    }
}

impl Default for IpfsPath {
    fn default() -> Self {
        Self::NIL
    }
}

impl fmt::Display for IpfsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for IpfsPath {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_path_is_nil() {
        assert!(IpfsPath::NIL.is_nil());
        assert!(!IpfsPath::of_bytes(b"hello").is_nil());
    }

    #[test]
    fn hex_round_trips() {
        let path = IpfsPath::of_bytes(b"godless");
        let hex = path.to_hex();
        assert_eq!(IpfsPath::from_hex(&hex).unwrap(), path);
    }

    #[test]
    fn hashing_is_deterministic() {
        assert_eq!(IpfsPath::of_bytes(b"x"), IpfsPath::of_bytes(b"x"));
    }
}
