use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use godless_core::hash::IpfsPath;
use godless_core::index::Index;
use godless_core::link::Link;
use godless_core::point::SignatureText;
use godless_core::table::TableName;

use crate::error::CodecError;

/// One tuple of the canonical index stream: `(table, link_hash,
/// signature_text)`. Field order is the sort key order, so the derived
/// `Ord` gives the canonical order directly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamLink {
    pub table: TableName,
    pub link_hash: IpfsPath,
    pub signature_text: SignatureText,
}

impl StreamLink {
    fn same_link(&self, other: &StreamLink) -> bool {
        self.table == other.table && self.link_hash == other.link_hash
    }
}

/// A stream tuple whose signature text failed to parse.
pub type InvalidStreamLink = StreamLink;

/// Flatten an index into its canonical stream form: one tuple per
/// signature on every link, sorted and deduplicated on
/// `(table, link_hash, signature_text)`.
pub fn make_index_stream(idx: &Index) -> Vec<StreamLink> {
    let mut stream = Vec::new();

    for (table, link) in idx.all_links() {
        if link.signatures().is_empty() {
            stream.push(StreamLink {
                table: table.clone(),
                link_hash: link.path(),
                signature_text: SignatureText(String::new()),
            });
            continue;
        }

        for sig in link.signatures() {
            stream.push(StreamLink {
                table: table.clone(),
                link_hash: link.path(),
                signature_text: sig.clone(),
            });
        }
    }

    stream.sort();
    stream.dedup();
    stream
}

/// Encode an index to its canonical binary form.
pub fn encode_index(idx: &Index) -> Result<Vec<u8>, CodecError> {
    let stream = make_index_stream(idx);
    Ok(bincode::serialize(&stream)?)
}

/// Decode an index from its canonical binary form, returning any tuples
/// whose signature text failed to parse alongside the decoded index.
pub fn decode_index(bytes: &[u8]) -> Result<(Index, Vec<InvalidStreamLink>), CodecError> {
    let stream: Vec<StreamLink> = bincode::deserialize(bytes)?;
    read_index_stream(&stream)
}

/// Reassemble an index from an already-parsed stream, grouping
/// consecutive tuples that share `(table, link_hash)` into a single link.
pub fn read_index_stream(
    stream: &[StreamLink],
) -> Result<(Index, Vec<InvalidStreamLink>), CodecError> {
    let mut idx = Index::empty();
    let mut invalid = Vec::new();

    let mut batch_start = 0;
    for batch_end in 1..=stream.len() {
        let start_entry = &stream[batch_start];
        let write_link = if batch_end < stream.len() {
            !stream[batch_end].same_link(start_entry)
        } else {
            true
        };

        if write_link {
            let batch = &stream[batch_start..batch_end];
            let (link, mut bad) = read_link_batch(batch)?;
            invalid.append(&mut bad);

            idx = idx.join_link(start_entry.table.clone(), link);
            batch_start = batch_end;
        }
    }

    Ok((idx, invalid))
}

/// Combine one batch of tuples sharing the same link hash into a single
/// `Link`, segregating unparseable signatures into an invalid list.
///
/// Returns `CorruptStream` if any tuple in the batch does not share the
/// batch's header `(table, link_hash)`.
pub fn read_link_batch(batch: &[StreamLink]) -> Result<(Link, Vec<InvalidStreamLink>), CodecError> {
    let first = batch
        .first()
        .expect("read_link_batch called with an empty batch");

    let mut signatures = BTreeSet::new();
    let mut invalid = Vec::new();

    for entry in batch {
        if !entry.same_link(first) {
            return Err(CodecError::CorruptStream(format!(
                "batch header {}/{} did not match successor tuple",
                first.table, first.link_hash
            )));
        }

        if entry.signature_text.is_nil() {
            continue;
        }

        if parse_signature_text(&entry.signature_text).is_ok() {
            signatures.insert(entry.signature_text.clone());
        } else {
            invalid.push(entry.clone());
        }
    }

    Ok((Link::presigned(first.link_hash, signatures), invalid))
}

fn parse_signature_text(sig: &SignatureText) -> Result<(), ()> {
    let bytes = hex::decode(&sig.0).map_err(|_| ())?;
    if bytes.len() == 64 {
        Ok(())
    } else {
        Err(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use godless_core::keys::PrivateKey;
    use rand::rngs::OsRng;

    #[test]
    fn stream_is_sorted_and_unique() {
        let key = PrivateKey::generate(&mut OsRng);
        let idx = Index::empty()
            .join_link(
                TableName::new("T"),
                Link::signed(IpfsPath::of_bytes(b"b"), &[key.clone()]).unwrap(),
            )
            .join_link(
                TableName::new("T"),
                Link::signed(IpfsPath::of_bytes(b"a"), &[key]).unwrap(),
            );

        let stream = make_index_stream(&idx);
        let mut sorted = stream.clone();
        sorted.sort();
        assert_eq!(stream, sorted);

        let mut unique = stream.clone();
        unique.dedup();
        assert_eq!(stream.len(), unique.len());
    }

    #[test]
    fn round_trip_preserves_encoding() {
        let key = PrivateKey::generate(&mut OsRng);
        let idx = Index::empty().join_link(
            TableName::new("T"),
            Link::signed(IpfsPath::of_bytes(b"blob"), &[key]).unwrap(),
        );

        let encoded = encode_index(&idx).unwrap();
        let (decoded, invalid) = decode_index(&encoded).unwrap();
        assert!(invalid.is_empty());
        assert_eq!(encode_index(&decoded).unwrap(), encoded);
    }

    #[test]
    fn unsigned_link_round_trips_with_empty_signature_tuple() {
        let idx = Index::empty().join_link(
            TableName::new("T"),
            Link::unsigned(IpfsPath::of_bytes(b"blob")),
        );

        let stream = make_index_stream(&idx);
        assert_eq!(stream.len(), 1);
        assert!(stream[0].signature_text.is_nil());

        let (decoded, invalid) = read_index_stream(&stream).unwrap();
        assert!(invalid.is_empty());
        assert_eq!(decoded, idx);
    }

    #[test]
    fn corrupting_one_signature_segregates_only_that_signature() {
        let a = PrivateKey::generate(&mut OsRng);
        let b = PrivateKey::generate(&mut OsRng);
        let idx = Index::empty().join_link(
            TableName::new("T"),
            Link::signed(IpfsPath::of_bytes(b"blob"), &[a, b]).unwrap(),
        );

        let mut stream = make_index_stream(&idx);
        assert_eq!(stream.len(), 2);
        stream[0].signature_text = SignatureText("not-hex!!".to_string());

        let (decoded, invalid) = read_index_stream(&stream).unwrap();
        assert_eq!(invalid.len(), 1);

        let links = decoded.links(&TableName::new("T"));
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].signatures().len(), 1);
    }

    #[test]
    fn mismatched_batch_header_is_corrupt_stream() {
        let bad = vec![
            StreamLink {
                table: TableName::new("T"),
                link_hash: IpfsPath::of_bytes(b"a"),
                signature_text: SignatureText(String::new()),
            },
            StreamLink {
                table: TableName::new("T"),
                link_hash: IpfsPath::of_bytes(b"b"),
                signature_text: SignatureText(String::new()),
            },
        ];

        let err = read_link_batch(&bad).unwrap_err();
        assert!(matches!(err, CodecError::CorruptStream(_)));
    }
}
