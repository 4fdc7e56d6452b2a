#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
//! # Godless Codec — canonical stream encoding
//!
//! Namespaces and indices are only ever hashed, signed, or stored through
//! the byte form produced here. The stream form is a flat, sorted,
//! deduplicated sequence of tuples; encoding the same value twice always
//! produces the same bytes, which is what makes content-addressing and
//! signature verification meaningful in the first place.

pub mod error;
pub mod index_stream;
pub mod namespace_stream;

pub use error::CodecError;
pub use index_stream::{
    decode_index, encode_index, make_index_stream, read_index_stream, read_link_batch,
    InvalidStreamLink, StreamLink,
};
pub use namespace_stream::{
    decode_namespace, encode_namespace, make_namespace_stream, read_namespace_stream,
    read_point_batch, InvalidStreamEntry, StreamEntry,
};
