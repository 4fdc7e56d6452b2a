use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use godless_core::entry::EntryName;
use godless_core::namespace::Namespace;
use godless_core::point::{Point, PointText, SignatureText};
use godless_core::row::RowName;
use godless_core::table::TableName;

use crate::error::CodecError;

/// One tuple of the canonical namespace stream: `(table, row, entry,
/// point_text, signature_text)`. Field declaration order is the canonical
/// sort key order, so the derived `Ord` is the canonical one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamEntry {
    pub table: TableName,
    pub row: RowName,
    pub entry: EntryName,
    pub point_text: PointText,
    pub signature_text: SignatureText,
}

impl StreamEntry {
    fn same_point(&self, other: &StreamEntry) -> bool {
        self.table == other.table
            && self.row == other.row
            && self.entry == other.entry
            && self.point_text == other.point_text
    }
}

/// A stream tuple whose signature text failed to parse. Carries the full
/// tuple so callers can report which point/signature was dropped.
pub type InvalidStreamEntry = StreamEntry;

/// Flatten a namespace into its canonical stream form: one tuple per
/// signature on every point, sorted and deduplicated on
/// `(table, row, entry, point_text, signature_text)`.
pub fn make_namespace_stream(ns: &Namespace) -> Vec<StreamEntry> {
    let mut stream = Vec::new();

    ns.for_each_entry(|table, row, entry, value| {
        for point in value.values() {
            if point.signatures().is_empty() {
                stream.push(StreamEntry {
                    table: table.clone(),
                    row: row.clone(),
                    entry: entry.clone(),
                    point_text: point.text().clone(),
                    signature_text: SignatureText(String::new()),
                });
                continue;
            }

            for sig in point.signatures() {
                stream.push(StreamEntry {
                    table: table.clone(),
                    row: row.clone(),
                    entry: entry.clone(),
                    point_text: point.text().clone(),
                    signature_text: sig.clone(),
                });
            }
        }
    });

    stream.sort();
    stream.dedup();
    stream
}

/// Encode a namespace to its canonical binary form. Total and
/// deterministic: repeated calls on equal namespaces produce
/// byte-identical output.
pub fn encode_namespace(ns: &Namespace) -> Result<Vec<u8>, CodecError> {
    let stream = make_namespace_stream(ns);
    Ok(bincode::serialize(&stream)?)
}

/// Decode a namespace from its canonical binary form, returning any
/// tuples whose signature text failed to parse alongside the decoded
/// namespace.
pub fn decode_namespace(bytes: &[u8]) -> Result<(Namespace, Vec<InvalidStreamEntry>), CodecError> {
    let stream: Vec<StreamEntry> = bincode::deserialize(bytes)?;
    read_namespace_stream(&stream)
}

/// Reassemble a namespace from an already-parsed stream, grouping
/// consecutive tuples that share `(table, row, entry, point_text)` into a
/// single point.
pub fn read_namespace_stream(
    stream: &[StreamEntry],
) -> Result<(Namespace, Vec<InvalidStreamEntry>), CodecError> {
    let mut ns = Namespace::empty();
    let mut invalid = Vec::new();

    let mut batch_start = 0;
    for batch_end in 1..=stream.len() {
        let start_entry = &stream[batch_start];
        let write_point = if batch_end < stream.len() {
            !stream[batch_end].same_point(start_entry)
        } else {
            true
        };

        if write_point {
            let batch = &stream[batch_start..batch_end];
            let (point, mut bad) = read_point_batch(batch)?;
            invalid.append(&mut bad);

            ns = ns.join_point(
                start_entry.table.clone(),
                start_entry.row.clone(),
                start_entry.entry.clone(),
                point,
            );

            batch_start = batch_end;
        }
    }

    Ok((ns, invalid))
}

/// Combine one batch of tuples sharing the same point into a single
/// `Point`, segregating unparseable signatures into an invalid list.
///
/// Returns `CorruptStream` if any tuple in the batch does not share the
/// batch's header `(table, row, entry, point_text)` — this indicates the
/// input bytes were not in canonical (sorted, grouped) form.
pub fn read_point_batch(
    batch: &[StreamEntry],
) -> Result<(Point, Vec<InvalidStreamEntry>), CodecError> {
    let first = batch
        .first()
        .expect("read_point_batch called with an empty batch");

    let mut signatures = BTreeSet::new();
    let mut invalid = Vec::new();

    for entry in batch {
        if !entry.same_point(first) {
            return Err(CodecError::CorruptStream(format!(
                "batch header {}/{}/{}/{} did not match successor tuple",
                first.table, first.row, first.entry, first.point_text
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

    Ok((
        Point::presigned(first.point_text.clone(), signatures),
        invalid,
    ))
}

/// A signature text parses iff it is hex-encoding of a 64-byte Ed25519
/// signature. Nil (empty) signature text is handled separately by callers.
fn parse_signature_text(sig: &SignatureText) -> Result<(), ()> {
    let bytes = hex::decode(&sig.0).map_err(|_| ())?;
    if bytes.len() == 64 {
        Ok(())
    } else {
        Err(())
    }
}
