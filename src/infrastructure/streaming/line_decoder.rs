//! Incremental chunk-to-line decoding
//!
//! Transport hands the pipeline raw byte chunks with no alignment
//! guarantees: a chunk may end mid-line or mid-UTF-8-sequence. The decoder
//! absorbs chunks and emits exactly the complete `\n`-terminated lines, in
//! order, independent of how the bytes were partitioned.

/// Streaming UTF-8 line decoder.
///
/// An incomplete multi-byte sequence at the end of a chunk is held back and
/// completed by the next chunk. Truly invalid sequences decode to U+FFFD,
/// the same replacement behavior browsers apply to event streams. `\r` is
/// not a line terminator here; payload parsing trims it.
#[derive(Debug)]
pub struct LineDecoder {
    /// Undecoded tail bytes, a prefix of a valid sequence (at most 3 bytes)
    carry: Vec<u8>,
    /// Decoded text not yet terminated by `\n`
    pending: String,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self {
            carry: Vec::new(),
            pending: String::new(),
        }
    }

    /// Absorbs one chunk and returns every line it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decode(chunk);
        self.take_complete_lines()
    }

    /// Ends the stream, yielding any unterminated fragment.
    ///
    /// The fragment is for diagnostics only; it never forms a line. Bytes
    /// still waiting for sequence completion surface as one U+FFFD, matching
    /// a flushing text decoder.
    pub fn finish(&mut self) -> Option<String> {
        let mut tail = std::mem::take(&mut self.pending);
        if !self.carry.is_empty() {
            tail.push(char::REPLACEMENT_CHARACTER);
            self.carry.clear();
        }
        if tail.is_empty() { None } else { Some(tail) }
    }

    fn decode(&mut self, chunk: &[u8]) {
        let joined: Vec<u8>;
        let mut rest: &[u8] = if self.carry.is_empty() {
            chunk
        } else {
            let mut bytes = std::mem::take(&mut self.carry);
            bytes.extend_from_slice(chunk);
            joined = bytes;
            &joined
        };

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.pending.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        self.pending.push_str(text);
                    }
                    match err.error_len() {
                        Some(invalid_len) => {
                            self.pending.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[invalid_len..];
                        }
                        None => {
                            // Incomplete sequence at chunk end: hold it back
                            self.carry = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
    }

    fn take_complete_lines(&mut self) -> Vec<String> {
        let Some(last_newline) = self.pending.rfind('\n') else {
            return Vec::new();
        };
        let tail = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, tail);
        // `complete` always ends with the terminator byte
        let body = &complete[..complete.len() - 1];
        body.split('\n').map(str::to_owned).collect()
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}
