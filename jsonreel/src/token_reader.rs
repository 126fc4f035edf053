// SPDX-License-Identifier: Apache-2.0

use std::borrow::Cow;

use log::trace;
use ujson::{Event, EventToken, Flow, Tokenizer};

use crate::escape_processor::EscapeProcessor;
use crate::{JsonNumber, ParseError};

/// Tokenizer with a 128-level nesting stack.
type Scanner = Tokenizer<u128>;

/// A complete JSON token.
///
/// Strings and keys borrow from the parse window when they sit in one
/// contiguous buffer and contain no escapes.
#[derive(Debug, PartialEq)]
pub enum Token<'w> {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    PropertyName(Cow<'w, str>),
    String(Cow<'w, str>),
    Number(JsonNumber<'w>),
    Bool(bool),
    Null,
}

/// Where a parse left off.
///
/// Returned by every parse attempt and handed back to the next one. The next
/// window must start at [`ResumeState::position`]. The tokenizer itself has
/// already scanned further, up to [`ResumeState::scanned`], and picks up there
/// instead of reading the bytes of an unfinished token again.
#[derive(Debug, Clone, Default)]
pub struct ResumeState {
    scan: Scanner,
    consumed: usize,
    /// Absolute start of the token the scan is inside of.
    open: Option<usize>,
}

impl ResumeState {
    /// Absolute stream offset of the first byte the caller still has to keep.
    pub fn position(&self) -> usize {
        self.consumed
    }

    /// Absolute stream offset the tokenizer has scanned through.
    pub fn scanned(&self) -> usize {
        self.scan.position()
    }

    /// Object/array nesting depth at the resume point.
    pub fn depth(&self) -> usize {
        self.scan.depth()
    }
}

/// Stream bytes held across several buffers, in stream order.
pub(crate) trait Parts {
    /// The bytes from window offset `at` to the end of the buffer holding it.
    fn rest_of_part(&self, at: usize) -> Option<&[u8]>;
}

/// The bytes a parse attempt sees, either one slice or several chained ones.
#[derive(Clone, Copy)]
pub(crate) enum Window<'w> {
    Contiguous(&'w [u8]),
    Chained(&'w dyn Parts),
}

impl<'w> Window<'w> {
    fn rest_of_part(self, at: usize) -> Option<&'w [u8]> {
        let rest = match self {
            Window::Contiguous(data) => data.get(at..),
            Window::Chained(parts) => parts.rest_of_part(at),
        };
        rest.filter(|rest| !rest.is_empty())
    }

    /// Borrow the window-relative range `start..end`, or copy it when it
    /// straddles parts.
    fn range(self, start: usize, end: usize) -> Cow<'w, [u8]> {
        let len = end - start;
        match self.rest_of_part(start) {
            None => Cow::Borrowed(&[]),
            Some(part) if len <= part.len() => Cow::Borrowed(&part[..len]),
            Some(_) => {
                let mut copied = Vec::with_capacity(len);
                let mut at = start;
                while let Some(part) = self.rest_of_part(at).filter(|_| at < end) {
                    let take = part.len().min(end - at);
                    copied.extend_from_slice(&part[..take]);
                    at += take;
                }
                Cow::Owned(copied)
            }
        }
    }
}

/// Pulls complete tokens out of a byte window.
///
/// Handed to the state machine on every parse attempt. When the window ends
/// in the middle of a token, [`Tokens::next_token`] returns `None`. The
/// partial token's bytes stay in the window for the next attempt, while the
/// tokenizer carries on from the byte after the last one it scanned.
pub struct Tokens<'w> {
    window: Window<'w>,
    /// Absolute stream offset of the window's first byte.
    base: usize,
    scan: Scanner,
    /// Absolute start of the token being scanned.
    open: Option<usize>,
    /// Window-relative end of the last complete token or separator.
    consumed: usize,
    /// Absolute offset where the last returned token starts.
    last_start: usize,
    exhausted: bool,
}

impl<'w> Tokens<'w> {
    pub(crate) fn new(window: Window<'w>, resume: ResumeState) -> Self {
        let base = resume.consumed;
        Tokens {
            window,
            base,
            scan: resume.scan,
            open: resume.open,
            consumed: 0,
            last_start: base,
            exhausted: false,
        }
    }

    /// Tokens over a single contiguous slice starting at the resume point.
    pub fn from_slice(data: &'w [u8], resume: ResumeState) -> Self {
        Self::new(Window::Contiguous(data), resume)
    }

    /// Next complete token, or `None` once the window runs out.
    pub fn next_token(&mut self) -> Result<Option<Token<'w>>, ParseError> {
        if self.exhausted {
            return Ok(None);
        }
        loop {
            let scanned = self.scan.position() - self.base;
            let Some(chunk) = self.window.rest_of_part(scanned) else {
                self.exhausted = true;
                // Whitespace and separators need not be kept, a partial token does.
                self.consumed = self.open.map_or(scanned, |start| start - self.base);
                trace!(
                    "window ends after {} bytes, {} consumed",
                    scanned,
                    self.consumed
                );
                return Ok(None);
            };

            let mut open = self.open;
            let mut ended = None;
            let result = self.scan.parse_chunk(chunk, &mut |event, pos| match event {
                Event::Begin(_) => {
                    open = Some(pos);
                    Flow::Continue
                }
                _ => {
                    ended = Some((event, pos));
                    Flow::Stop
                }
            });
            self.open = open;
            if let Err(err) = result {
                self.exhausted = true;
                return Err(err.into());
            }

            if let Some((event, pos)) = ended {
                let start = self.open.take().unwrap_or(pos);
                let token = self.complete(event, start, pos)?;
                self.consumed = self.scan.position() - self.base;
                return Ok(Some(token));
            }
        }
    }

    fn complete(&mut self, event: Event, start: usize, end: usize) -> Result<Token<'w>, ParseError> {
        self.last_start = start;
        let token = match event {
            Event::ObjectStart => Token::StartObject,
            Event::ObjectEnd => Token::EndObject,
            Event::ArrayStart => Token::StartArray,
            Event::ArrayEnd => Token::EndArray,
            Event::End(EventToken::True) => Token::Bool(true),
            Event::End(EventToken::False) => Token::Bool(false),
            Event::End(EventToken::Null) => Token::Null,
            Event::End(EventToken::String) => Token::String(self.string(start, end)?),
            Event::End(EventToken::Key) => Token::PropertyName(self.string(start, end)?),
            // The number's delimiter is at `end` and is not part of it.
            Event::End(EventToken::Number) => {
                let raw = self.window.range(start - self.base, end - self.base);
                let invalid = ParseError::InvalidUtf8 { position: start };
                let text = match raw {
                    Cow::Borrowed(bytes) => {
                        Cow::Borrowed(std::str::from_utf8(bytes).map_err(|_| invalid)?)
                    }
                    Cow::Owned(bytes) => Cow::Owned(String::from_utf8(bytes).map_err(|_| invalid)?),
                };
                Token::Number(JsonNumber::new(text))
            }
            Event::Begin(_) => unreachable!("begin events never stop the scan"),
        };
        Ok(token)
    }

    /// Decode the string between the quotes at `start` and `end`.
    fn string(&self, start: usize, end: usize) -> Result<Cow<'w, str>, ParseError> {
        let raw = self.window.range(start + 1 - self.base, end - self.base);
        EscapeProcessor::new(start).decode(raw)
    }

    /// Window-relative byte count the next window may drop.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Absolute stream offset the next window has to start at.
    pub fn position(&self) -> usize {
        self.base + self.consumed
    }

    /// Nesting depth after the last complete token.
    pub fn depth(&self) -> usize {
        self.scan.depth()
    }

    /// Error for a state machine that got a token it did not expect.
    pub fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::UnexpectedToken {
            expected,
            position: self.last_start,
        }
    }

    /// Error for a number that does not fit the requested type.
    pub fn overflow(&self) -> ParseError {
        ParseError::NumericOverflow {
            position: self.last_start,
        }
    }

    /// Resume point matching [`Tokens::consumed`].
    pub fn into_resume(self) -> ResumeState {
        ResumeState {
            scan: self.scan,
            consumed: self.base + self.consumed,
            open: self.open,
        }
    }
}
