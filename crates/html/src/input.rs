//! Decoded input for the tokenizer.
//!
//! A source fills the tokenizer's bounded [`CharBuffer`] on demand. Sources
//! are push-based: the caller appends text or bytes and the next `parse()`
//! picks them up, so the pipeline never blocks.
//!
//! Offsets passed to [`InputSource::report_processed`] are absolute byte
//! offsets into the decoded character stream, counted from the last
//! (re)start.

use crate::error::{InputError, ParseError};
use std::io::Read;
use tools::{Decoder, Encoding};

/// Capacity-bounded decoded text owned by the tokenizer.
#[derive(Debug)]
pub struct CharBuffer {
    text: String,
    capacity: usize,
}

impl CharBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.text.len())
    }

    /// Append as much of `text` as fits, cut at a character boundary.
    /// Returns the number of bytes taken.
    pub fn push_str(&mut self, text: &str) -> usize {
        let mut take = text.len().min(self.remaining_capacity());
        while !text.is_char_boundary(take) {
            take -= 1;
        }
        self.text.push_str(&text[..take]);
        take
    }

    /// Drop the first `len` bytes (already consumed by the tokenizer).
    pub fn discard_prefix(&mut self, len: usize) {
        debug_assert!(self.text.is_char_boundary(len));
        self.text.drain(..len);
    }

    /// Remove `range` in place, shifting the tail down.
    pub fn remove_gap(&mut self, range: std::ops::Range<usize>) {
        debug_assert!(self.text.is_char_boundary(range.start));
        debug_assert!(self.text.is_char_boundary(range.end));
        self.text.replace_range(range, "");
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

/// Outcome of [`InputSource::read`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadStatus {
    /// Text was appended to the buffer.
    Data,
    /// Nothing available yet; the caller has to supply more input.
    Pending,
    /// The stream is complete.
    Eof,
}

/// Restart protocol shared by every pipeline stage.
///
/// A restart replays the stream from the beginning. It is only possible
/// until output became unrecoverable; after `disable_restart` every
/// `restart` fails with [`ParseError::RestartDisabled`].
pub trait Restartable {
    fn can_restart(&self) -> bool;
    fn restart(&mut self) -> Result<(), ParseError>;
    fn disable_restart(&mut self);
}

/// Decoding collaborator of the tokenizer.
pub trait InputSource: Restartable {
    /// Append available text to `buffer`.
    fn read(&mut self, buffer: &mut CharBuffer) -> Result<ReadStatus, InputError>;

    /// Everything before `offset` has been consumed and will not be asked
    /// for again (unless the stream restarts).
    fn report_processed(&mut self, offset: usize);

    /// Switch to the encoding named by `label` and replay from the start.
    /// Returns false when the label is unknown, the encoding would not
    /// change, or restart is no longer possible.
    fn restart_with_encoding(&mut self, label: &str) -> bool;

    /// Canonical name of the encoding currently decoded, if any.
    fn encoding_name(&self) -> Option<&'static str> {
        None
    }
}

/// Already-decoded text pushed by the caller.
#[derive(Debug, Default)]
pub struct StringSource {
    text: String,
    /// Absolute offset of `text[0]`.
    base: usize,
    read_pos: usize,
    finished: bool,
    restart_disabled: bool,
}

impl StringSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A finished source holding the whole document.
    pub fn complete(text: &str) -> Self {
        let mut source = Self::new();
        source.push_str(text);
        source.finish();
        source
    }

    pub fn push_str(&mut self, text: &str) {
        debug_assert!(!self.finished, "push_str after finish");
        self.text.push_str(text);
    }

    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bytes of pushed text still held, consumed or not.
    pub fn retained_len(&self) -> usize {
        self.text.len()
    }
}

impl Restartable for StringSource {
    fn can_restart(&self) -> bool {
        !self.restart_disabled
    }

    fn restart(&mut self) -> Result<(), ParseError> {
        if self.restart_disabled {
            return Err(ParseError::RestartDisabled);
        }
        debug_assert_eq!(self.base, 0);
        self.read_pos = 0;
        Ok(())
    }

    fn disable_restart(&mut self) {
        self.restart_disabled = true;
    }
}

impl InputSource for StringSource {
    fn read(&mut self, buffer: &mut CharBuffer) -> Result<ReadStatus, InputError> {
        let start = self.read_pos - self.base;
        if start == self.text.len() {
            return Ok(if self.finished {
                ReadStatus::Eof
            } else {
                ReadStatus::Pending
            });
        }
        let taken = buffer.push_str(&self.text[start..]);
        self.read_pos += taken;
        Ok(if taken == 0 {
            ReadStatus::Pending
        } else {
            ReadStatus::Data
        })
    }

    fn report_processed(&mut self, offset: usize) {
        // Everything is kept while a restart may still replay it.
        if self.restart_disabled && offset > self.base {
            let mut drop = (offset.min(self.read_pos) - self.base).min(self.text.len());
            while !self.text.is_char_boundary(drop) {
                drop -= 1;
            }
            self.text.drain(..drop);
            self.base += drop;
        }
    }

    fn restart_with_encoding(&mut self, _label: &str) -> bool {
        false
    }
}

const READ_CHUNK: usize = 8 * 1024;

/// Raw bytes decoded through a [`tools::Decoder`].
///
/// Bytes are pushed by the caller or pulled from an attached reader. While
/// restart is possible the raw bytes are retained so the stream can be
/// re-decoded under another encoding.
pub struct ByteSource {
    decoder: Decoder,
    raw: Vec<u8>,
    decoded: String,
    decoded_pos: usize,
    finished: bool,
    restart_disabled: bool,
    reader: Option<Box<dyn Read>>,
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteSource")
            .field("encoding", &self.encoding())
            .field("raw", &self.raw.len())
            .field("decoded", &(self.decoded.len() - self.decoded_pos))
            .field("finished", &self.finished)
            .field("reader", &self.reader.is_some())
            .finish()
    }
}

impl Default for ByteSource {
    fn default() -> Self {
        Self::new(Encoding::windows_1252())
    }
}

impl ByteSource {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            decoder: Decoder::new(encoding),
            raw: Vec::new(),
            decoded: String::new(),
            decoded_pos: 0,
            finished: false,
            restart_disabled: false,
            reader: None,
        }
    }

    /// A finished source holding the whole document.
    pub fn complete(bytes: &[u8], encoding: Encoding) -> Self {
        let mut source = Self::new(encoding);
        source.push_bytes(bytes);
        source.finish();
        source
    }

    /// Pull bytes from `reader` whenever the decoded text runs dry.
    pub fn from_reader(reader: impl Read + 'static, encoding: Encoding) -> Self {
        let mut source = Self::new(encoding);
        source.reader = Some(Box::new(reader));
        source
    }

    pub fn encoding(&self) -> Encoding {
        self.decoder.encoding()
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        debug_assert!(!self.finished, "push_bytes after finish");
        if !self.restart_disabled {
            self.raw.extend_from_slice(bytes);
        }
        self.decoder.decode(bytes, &mut self.decoded);
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Raw bytes held for re-decoding on restart.
    pub fn retained_len(&self) -> usize {
        self.raw.len()
    }

    pub fn finish(&mut self) {
        if !self.finished {
            self.decoder.finish(&mut self.decoded);
            self.finished = true;
        }
    }

    fn pull(&mut self) -> Result<(), InputError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(());
        };
        let mut chunk = [0u8; READ_CHUNK];
        let read = loop {
            match reader.read(&mut chunk) {
                Ok(read) => break read,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        };
        if read == 0 {
            self.reader = None;
            self.finish();
        } else {
            self.push_bytes(&chunk[..read]);
        }
        Ok(())
    }

    fn redecode(&mut self, encoding: Encoding) {
        self.decoder = Decoder::new(encoding);
        self.decoded.clear();
        self.decoded_pos = 0;
        self.decoder.decode(&self.raw, &mut self.decoded);
        if self.finished {
            self.decoder.finish(&mut self.decoded);
        }
    }
}

impl Restartable for ByteSource {
    fn can_restart(&self) -> bool {
        !self.restart_disabled
    }

    fn restart(&mut self) -> Result<(), ParseError> {
        if self.restart_disabled {
            return Err(ParseError::RestartDisabled);
        }
        self.redecode(self.encoding());
        Ok(())
    }

    fn disable_restart(&mut self) {
        self.restart_disabled = true;
        self.raw = Vec::new();
    }
}

impl InputSource for ByteSource {
    fn read(&mut self, buffer: &mut CharBuffer) -> Result<ReadStatus, InputError> {
        while self.decoded_pos == self.decoded.len() && !self.finished && self.reader.is_some() {
            self.pull()?;
        }
        if self.decoded_pos == self.decoded.len() {
            self.decoded.clear();
            self.decoded_pos = 0;
            return Ok(if self.finished {
                ReadStatus::Eof
            } else {
                ReadStatus::Pending
            });
        }
        let taken = buffer.push_str(&self.decoded[self.decoded_pos..]);
        self.decoded_pos += taken;
        if self.decoded_pos > READ_CHUNK && self.decoded_pos * 2 > self.decoded.len() {
            self.decoded.drain(..self.decoded_pos);
            self.decoded_pos = 0;
        }
        Ok(if taken == 0 {
            ReadStatus::Pending
        } else {
            ReadStatus::Data
        })
    }

    fn report_processed(&mut self, _offset: usize) {
        // Decoded text is handed over on read; only the raw bytes are
        // retained, and only until restart is disabled.
    }

    fn restart_with_encoding(&mut self, label: &str) -> bool {
        if self.restart_disabled {
            return false;
        }
        let Some(encoding) = Encoding::for_label(label) else {
            log::debug!(target: "html.input", "unknown charset label {label:?}");
            return false;
        };
        if encoding == self.encoding() {
            return false;
        }
        log::debug!(
            target: "html.input",
            "restarting input: {} -> {}",
            self.encoding().name(),
            encoding.name()
        );
        self.redecode(encoding);
        true
    }

    fn encoding_name(&self) -> Option<&'static str> {
        Some(self.encoding().name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(source: &mut impl InputSource, capacity: usize) -> String {
        let mut buffer = CharBuffer::with_capacity(capacity);
        let mut out = String::new();
        loop {
            match source.read(&mut buffer).expect("read") {
                ReadStatus::Data => {
                    out.push_str(buffer.as_str());
                    let len = buffer.len();
                    buffer.discard_prefix(len);
                }
                ReadStatus::Pending | ReadStatus::Eof => break,
            }
        }
        out
    }

    #[test]
    fn char_buffer_cuts_at_char_boundaries() {
        let mut buffer = CharBuffer::with_capacity(4);
        assert_eq!(buffer.push_str("ab\u{e9}\u{e9}"), 4);
        assert_eq!(buffer.as_str(), "ab\u{e9}");
        assert_eq!(buffer.push_str("x"), 0);
        buffer.remove_gap(1..2);
        assert_eq!(buffer.as_str(), "a\u{e9}");
        buffer.discard_prefix(1);
        assert_eq!(buffer.as_str(), "\u{e9}");
        assert_eq!(buffer.remaining_capacity(), 2);
    }

    #[test]
    fn string_source_reports_pending_until_finished() {
        let mut source = StringSource::new();
        let mut buffer = CharBuffer::with_capacity(16);
        assert_eq!(source.read(&mut buffer).unwrap(), ReadStatus::Pending);
        source.push_str("abc");
        assert_eq!(source.read(&mut buffer).unwrap(), ReadStatus::Data);
        assert_eq!(source.read(&mut buffer).unwrap(), ReadStatus::Pending);
        source.finish();
        assert_eq!(source.read(&mut buffer).unwrap(), ReadStatus::Eof);
        assert_eq!(buffer.as_str(), "abc");
    }

    #[test]
    fn string_source_replays_after_restart() {
        let mut source = StringSource::complete("hello world");
        assert_eq!(drain(&mut source, 4), "hello world");
        source.report_processed(5);
        source.restart().unwrap();
        assert_eq!(drain(&mut source, 64), "hello world");
        source.disable_restart();
        assert!(matches!(source.restart(), Err(ParseError::RestartDisabled)));
    }

    #[test]
    fn string_source_drops_processed_text_once_restart_is_disabled() {
        let mut source = StringSource::complete("abcdef");
        source.disable_restart();
        let mut buffer = CharBuffer::with_capacity(3);
        source.read(&mut buffer).unwrap();
        source.report_processed(3);
        assert_eq!(source.text, "def");
        assert_eq!(source.base, 3);
    }

    #[test]
    fn byte_source_redecodes_on_encoding_change() {
        let mut source = ByteSource::complete(b"caf\xc3\xa9", Encoding::windows_1252());
        assert_eq!(drain(&mut source, 64), "caf\u{c3}\u{a9}");
        assert!(source.restart_with_encoding("UTF-8"));
        assert_eq!(source.encoding_name(), Some("UTF-8"));
        assert_eq!(drain(&mut source, 64), "caf\u{e9}");
        assert!(!source.restart_with_encoding("utf8"), "same encoding");
        assert!(!source.restart_with_encoding("x-unknown"));
    }

    #[test]
    fn byte_source_refuses_restart_once_disabled() {
        let mut source = ByteSource::complete(b"abc", Encoding::utf8());
        source.disable_restart();
        assert!(!source.restart_with_encoding("latin1"));
        assert!(matches!(source.restart(), Err(ParseError::RestartDisabled)));
    }

    #[test]
    fn byte_source_redecodes_multibyte_encodings() {
        let mut source = ByteSource::complete(b"\x93\xfa\x96\x7b \xb3", Encoding::windows_1252());
        assert!(source.restart_with_encoding("shift_jis"));
        assert_eq!(source.encoding_name(), Some("Shift_JIS"));
        assert_eq!(drain(&mut source, 64), "\u{65e5}\u{672c} \u{ff73}");
        assert!(source.restart_with_encoding("iso-8859-2"));
        assert_eq!(drain(&mut source, 64), "\u{93}\u{fa}\u{96}{ \u{142}");
    }

    #[test]
    fn byte_source_releases_raw_bytes_once_restart_is_disabled() {
        let mut source = ByteSource::new(Encoding::utf8());
        source.push_bytes(b"abc");
        assert_eq!(source.retained_len(), 3);
        source.disable_restart();
        assert_eq!(source.retained_len(), 0);
        source.push_bytes(b"def");
        assert_eq!(source.retained_len(), 0);
        source.finish();
        assert_eq!(drain(&mut source, 64), "abcdef");
    }

    #[test]
    fn byte_source_pulls_from_reader() {
        let reader = std::io::Cursor::new(b"<p>\xe2\x82\xac</p>".to_vec());
        let mut source = ByteSource::from_reader(reader, Encoding::utf8());
        assert_eq!(drain(&mut source, 5), "<p>\u{20ac}</p>");
        let mut buffer = CharBuffer::with_capacity(8);
        assert_eq!(source.read(&mut buffer).unwrap(), ReadStatus::Eof);
    }

    #[test]
    fn byte_source_surfaces_reader_errors() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk on fire"))
            }
        }
        let mut source = ByteSource::from_reader(Broken, Encoding::utf8());
        let mut buffer = CharBuffer::with_capacity(8);
        assert!(matches!(source.read(&mut buffer), Err(InputError::Io(_))));
    }
}
