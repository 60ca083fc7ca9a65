//! Streaming HTML tokenizer and structural normalizer for untrusted input.
//!
//! [`Tokenizer`] turns a character stream into tokens; [`Normalizer`] sits
//! on top and repairs the structure so every event stream it produces is
//! well-formed and bounded in depth, whatever the input.
//!
//! ```
//! use html::{Normalizer, ParserConfig, TokenKind, TokenizeResult, format_token};
//!
//! let mut normalizer = Normalizer::from_str("<b>A<div>B</b>C</div>", ParserConfig::default());
//! let mut lines = Vec::new();
//! while let Ok(TokenizeResult::Token(kind)) = normalizer.parse() {
//!     lines.push(format_token(normalizer.token()));
//!     if kind == TokenKind::EndOfFile {
//!         break;
//!     }
//! }
//! assert_eq!(lines[4], "OverlappedClose(1)");
//! ```

pub mod char_class;
pub mod error;
pub mod input;
pub mod normalizer;
pub mod tables;
pub mod token;
pub mod token_fmt;
pub mod tokenizer;

#[cfg(any(test, feature = "test-harness"))]
pub mod chunker;

pub use crate::error::{InputError, ParseError};
pub use crate::input::{ByteSource, InputSource, Restartable, StringSource};
pub use crate::normalizer::{Normalizer, NormalizerConfig, NormalizerStats, ParserConfig};
pub use crate::tables::TagId;
pub use crate::token::{Token, TokenKind};
pub use crate::token_fmt::format_token;
pub use crate::tokenizer::{TokenizeResult, Tokenizer, TokenizerConfig, TokenizerStats};
