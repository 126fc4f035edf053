// SPDX-License-Identifier: Apache-2.0

use std::borrow::Cow;

use crate::ParseError;

/// Decodes the raw bytes between a string's quotes.
///
/// Escape syntax has already been checked by the tokenizer, so the errors
/// here are about what the escapes decode to. `position` is the stream offset
/// of the string's opening quote and is only used for error reporting.
pub(crate) struct EscapeProcessor {
    position: usize,
}

impl EscapeProcessor {
    pub fn new(position: usize) -> Self {
        Self { position }
    }

    /// Borrow the content when it has no escapes, otherwise build the unescaped string.
    pub fn decode<'a>(&self, raw: Cow<'a, [u8]>) -> Result<Cow<'a, str>, ParseError> {
        if !raw.contains(&b'\\') {
            return match raw {
                Cow::Borrowed(bytes) => std::str::from_utf8(bytes)
                    .map(Cow::Borrowed)
                    .map_err(|_| self.invalid_utf8()),
                Cow::Owned(bytes) => String::from_utf8(bytes)
                    .map(Cow::Owned)
                    .map_err(|_| self.invalid_utf8()),
            };
        }
        self.unescape(&raw).map(Cow::Owned)
    }

    fn unescape(&self, raw: &[u8]) -> Result<String, ParseError> {
        let mut out = Vec::with_capacity(raw.len());
        let mut pending_high_surrogate = None;
        let mut rest = raw;

        while let Some(at) = rest.iter().position(|&b| b == b'\\') {
            let (literal, escape) = rest.split_at(at);
            if pending_high_surrogate.is_some() && !literal.is_empty() {
                return Err(self.invalid_codepoint());
            }
            out.extend_from_slice(literal);

            match escape.get(1) {
                Some(b'u') => {
                    let hex = escape.get(2..6).ok_or_else(|| self.invalid_escape())?;
                    let codepoint = self.hex_value(hex)?;
                    pending_high_surrogate =
                        self.push_codepoint(&mut out, codepoint, pending_high_surrogate)?;
                    rest = &escape[6..];
                }
                Some(&ch) => {
                    if pending_high_surrogate.is_some() {
                        return Err(self.invalid_codepoint());
                    }
                    out.push(self.process_simple_escape(ch)?);
                    rest = &escape[2..];
                }
                None => return Err(self.invalid_escape()),
            }
        }
        if pending_high_surrogate.is_some() {
            return Err(self.invalid_codepoint());
        }
        out.extend_from_slice(rest);
        String::from_utf8(out).map_err(|_| self.invalid_utf8())
    }

    /// Process a simple escape sequence character and return the unescaped byte.
    fn process_simple_escape(&self, escape_char: u8) -> Result<u8, ParseError> {
        match escape_char {
            b'n' => Ok(b'\n'),
            b't' => Ok(b'\t'),
            b'r' => Ok(b'\r'),
            b'\\' => Ok(b'\\'),
            b'"' => Ok(b'"'),
            b'/' => Ok(b'/'),
            b'b' => Ok(0x08), // Backspace
            b'f' => Ok(0x0C), // Form feed
            _ => Err(self.invalid_escape()),
        }
    }

    fn hex_value(&self, hex: &[u8]) -> Result<u32, ParseError> {
        hex.iter().try_fold(0u32, |acc, &byte| {
            let digit = (byte as char)
                .to_digit(16)
                .ok_or_else(|| self.invalid_escape())?;
            Ok((acc << 4) | digit)
        })
    }

    /// Append one `\uXXXX` codepoint, pairing surrogates.
    ///
    /// Returns the high surrogate still waiting for its low half.
    fn push_codepoint(
        &self,
        out: &mut Vec<u8>,
        codepoint: u32,
        pending_high_surrogate: Option<u32>,
    ) -> Result<Option<u32>, ParseError> {
        let combined = match (pending_high_surrogate, codepoint) {
            (None, 0xD800..=0xDBFF) => return Ok(Some(codepoint)),
            (None, 0xDC00..=0xDFFF) => return Err(self.invalid_codepoint()),
            (None, _) => codepoint,
            (Some(high), 0xDC00..=0xDFFF) => 0x10000 + ((high & 0x3FF) << 10) + (codepoint & 0x3FF),
            (Some(_), _) => return Err(self.invalid_codepoint()),
        };
        let ch = char::from_u32(combined).ok_or_else(|| self.invalid_codepoint())?;
        let mut utf8_buffer = [0u8; 4];
        out.extend_from_slice(ch.encode_utf8(&mut utf8_buffer).as_bytes());
        Ok(None)
    }

    fn invalid_escape(&self) -> ParseError {
        ParseError::InvalidEscapeSequence {
            position: self.position,
        }
    }

    fn invalid_codepoint(&self) -> ParseError {
        ParseError::InvalidUnicodeCodepoint {
            position: self.position,
        }
    }

    fn invalid_utf8(&self) -> ParseError {
        ParseError::InvalidUtf8 {
            position: self.position,
        }
    }
}
