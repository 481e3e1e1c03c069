//! Hand-rolled MIME decoding for proxied messages: boundary splitting,
//! transfer-encoding decode, body selection and attachment extraction. All of
//! it is pure and non-panicking over already-buffered input; malformed input
//! degrades to fewer parts or pass-through content, never to an error.

pub mod attachments;
pub mod body;
pub mod encoding;
pub mod parts;
