//! Incremental UTF-8 decoding
//!
//! HTTP chunk boundaries do not respect character boundaries: a three-byte
//! Hangul syllable can arrive split across two reads. [`Utf8Decoder`] carries
//! an incomplete trailing sequence over to the next call instead of replacing
//! it, so the concatenated output equals a one-shot decode of the whole body.

/// Replacement for undecodable input
const REPLACEMENT: char = '\u{FFFD}';

/// Stateful UTF-8 decoder
#[derive(Clone, Debug, Default)]
pub struct Utf8Decoder {
    /// Bytes of a sequence that has started but not finished (at most 3)
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create a decoder with no pending bytes
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk
    ///
    /// Invalid sequences become U+FFFD. An incomplete sequence at the end of
    /// `bytes` is held back and completed by the next call.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(bytes);

        let mut out = String::with_capacity(input.len());
        let mut rest = input.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));

                    match e.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush at end of input
    ///
    /// A sequence cut off by the end of the stream decodes to a single U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            REPLACEMENT.to_string()
        }
    }

    /// Number of bytes waiting for the rest of their sequence
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
