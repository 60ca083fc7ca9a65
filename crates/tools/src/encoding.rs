use encoding_rs::CoderResult;

/// A character encoding the input sources can decode.
///
/// Any WHATWG encoding is accepted. Labels resolve to the encoding used for
/// output, so a UTF-16 declaration inside an ASCII-compatible stream
/// decodes as UTF-8.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Encoding(&'static encoding_rs::Encoding);

impl Encoding {
    pub fn utf8() -> Self {
        Self(encoding_rs::UTF_8)
    }

    pub fn windows_1252() -> Self {
        Self(encoding_rs::WINDOWS_1252)
    }

    /// Resolve an encoding label as found in a `charset` declaration.
    /// Surrounding whitespace and ASCII case are ignored.
    ///
    /// Labels of the replacement encoding resolve to `None`: content
    /// declared that way cannot be decoded meaningfully.
    pub fn for_label(label: &str) -> Option<Self> {
        let encoding = encoding_rs::Encoding::for_label(label.trim().as_bytes())?;
        if encoding == encoding_rs::REPLACEMENT {
            return None;
        }
        Some(Self(encoding.output_encoding()))
    }

    /// Canonical WHATWG name, for example `UTF-8` or `Shift_JIS`.
    pub fn name(self) -> &'static str {
        self.0.name()
    }
}

/// Streaming decoder for one [`Encoding`].
///
/// Byte order marks are not sniffed; the encoding is decided by the caller.
pub struct Decoder {
    encoding: Encoding,
    inner: encoding_rs::Decoder,
}

impl Decoder {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            inner: encoding.0.new_decoder_without_bom_handling(),
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Decode `bytes` and append the text to `out`. An incomplete sequence
    /// at the end is carried into the next call.
    pub fn decode(&mut self, bytes: &[u8], out: &mut String) {
        self.feed(bytes, out, false);
    }

    /// Flush a carried incomplete sequence as U+FFFD. The decoder must not
    /// be fed again afterwards.
    pub fn finish(&mut self, out: &mut String) {
        self.feed(&[], out, true);
    }

    fn feed(&mut self, mut bytes: &[u8], out: &mut String, last: bool) {
        loop {
            let needed = self
                .inner
                .max_utf8_buffer_length(bytes.len())
                .unwrap_or(bytes.len());
            out.reserve(needed);
            let (result, read, _) = self.inner.decode_to_string(bytes, out, last);
            bytes = &bytes[read..];
            match result {
                CoderResult::InputEmpty => return,
                CoderResult::OutputFull => out.reserve(bytes.len().max(16)),
            }
        }
    }
}

/// Map a value in 0x80..=0x9F through the Windows-1252 C1 row.
///
/// Returns `None` outside the row and for the five positions Windows-1252
/// leaves undefined.
pub fn c1_to_char(value: u32) -> Option<char> {
    let byte = u8::try_from(value).ok().filter(|b| (0x80..=0x9F).contains(b))?;
    let bytes = [byte];
    let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(&bytes);
    text.chars()
        .next()
        .filter(|c| !('\u{80}'..='\u{9F}').contains(c))
}
