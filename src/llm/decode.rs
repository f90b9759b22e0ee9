//! Incremental UTF-8 decoding of sampled token bytes

use encoding_rs::{CoderResult, Decoder, UTF_8};

/// Fallback growth when the decoder cannot size its output
const MIN_RESERVE: usize = 32;

/// Turns token byte pieces into text, carrying partial characters
/// over to the next piece
pub struct TokenDecoder {
    decoder: Decoder,
}

impl Default for TokenDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenDecoder {
    pub fn new() -> Self {
        Self {
            decoder: UTF_8.new_decoder(),
        }
    }

    /// Decode one token's bytes. An incomplete trailing sequence stays
    /// buffered and is emitted with the next piece.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        let mut piece = String::new();
        let mut input = bytes;
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(input.len())
                .unwrap_or(MIN_RESERVE)
                .max(MIN_RESERVE);
            piece.reserve(needed);

            let (result, read, _) = self.decoder.decode_to_string(input, &mut piece, false);
            input = &input[read..];
            match result {
                CoderResult::InputEmpty => return piece,
                CoderResult::OutputFull => continue,
            }
        }
    }
}
