//! Byte-level decoding helpers shared by the HTML input sources.
//!
//! Decoding is incremental: bytes may arrive split at any offset and the
//! decoded text is identical to decoding the concatenated input.

pub mod encoding;

pub use encoding::{Decoder, Encoding, c1_to_char};
