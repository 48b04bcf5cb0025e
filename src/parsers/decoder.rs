//! Incremental UTF-8 line decoding over arbitrarily chunked bytes.
//!
//! Chunk boundaries may fall anywhere: in the middle of a line, or in the middle
//! of a multi-byte character. Complete lines are handed out as soon as their
//! terminating `\n` arrives; the trailing partial line is carried over to the
//! next chunk and only released by [`LineDecoder::finish`]. A UTF-8 byte order
//! mark at the very start of the stream is dropped.

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Streaming line decoder, one per parse
#[derive(Debug, Default)]
pub struct LineDecoder {
    /// Bytes of an incomplete UTF-8 sequence at the end of the last chunk
    pending: Vec<u8>,
    /// Decoded text after the last newline seen so far
    carry: String,
    /// Set once the stream start has been checked for a byte order mark
    bom_checked: bool,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk and hand every line it completes to `on_line`, in order.
    ///
    /// Lines are split on `\n` only and passed without the separator.
    pub fn feed<F: FnMut(&str)>(&mut self, chunk: &[u8], mut on_line: F) {
        let search_from = self.carry.len();
        self.decode_into_carry(chunk);

        if let Some(offset) = self.carry[search_from..].rfind('\n') {
            let end = search_from + offset;
            for line in self.carry[..end].split('\n') {
                on_line(line);
            }
            self.carry.drain(..=end);
        }
    }

    /// Flush the decoder at end of stream. A dangling partial character becomes
    /// U+FFFD and a non-empty trailing line is emitted without a separator.
    pub fn finish<F: FnMut(&str)>(mut self, mut on_line: F) {
        if !self.pending.is_empty() {
            self.carry.push(char::REPLACEMENT_CHARACTER);
            self.pending.clear();
        }

        if self.carry.is_empty() {
            return;
        }

        // feed() leaves no newline behind, so the carry is a single line
        on_line(&self.carry);
    }

    /// Text held back waiting for a newline
    pub fn carry(&self) -> &str {
        &self.carry
    }

    fn decode_into_carry(&mut self, chunk: &[u8]) {
        let joined: Vec<u8>;
        let mut bytes: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            let mut buf = std::mem::take(&mut self.pending);
            buf.extend_from_slice(chunk);
            joined = buf;
            &joined
        };

        if !self.bom_checked {
            if bytes.len() < BOM.len() && BOM.starts_with(bytes) {
                // could still be a BOM split across chunks
                self.pending.extend_from_slice(bytes);
                return;
            }
            self.bom_checked = true;
            if let Some(rest) = bytes.strip_prefix(BOM) {
                bytes = rest;
            }
        }

        loop {
            match std::str::from_utf8(bytes) {
                Ok(text) => {
                    self.carry.push_str(text);
                    return;
                }
                Err(e) => {
                    let (valid, rest) = bytes.split_at(e.valid_up_to());
                    self.carry.push_str(&String::from_utf8_lossy(valid));

                    match e.error_len() {
                        Some(len) => {
                            self.carry.push(char::REPLACEMENT_CHARACTER);
                            bytes = &rest[len..];
                        }
                        None => {
                            // incomplete sequence at the end of input, wait for more bytes
                            self.pending.extend_from_slice(rest);
                            return;
                        }
                    }
                }
            }
        }
    }
}
