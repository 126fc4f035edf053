// SPDX-License-Identifier: Apache-2.0

use log::trace;

use crate::BitBucket;

#[derive(Debug, Clone)]
struct ParseContext<T> {
    /// Current nesting depth
    depth: usize,
    /// Object (true) / array (false) per open level
    stack: T,
}

impl<T: BitBucket> ParseContext<T> {
    fn new() -> Self {
        ParseContext {
            depth: 0,
            stack: T::default(),
        }
    }

    fn enter(&mut self, object: bool, data: u8, pos: usize) -> Result<(), Error> {
        if self.depth >= T::capacity() {
            return Error::new(ErrKind::MaxDepthReached, data, pos);
        }
        self.stack.push(object);
        self.depth += 1;
        Ok(())
    }

    fn exit(&mut self, object: bool, data: u8, pos: usize) -> Result<(), Error> {
        if self.depth == 0 || self.stack.top() != object {
            let kind = if object {
                ErrKind::UnopenedObject
            } else {
                ErrKind::UnopenedArray
            };
            return Error::new(kind, data, pos);
        }
        self.stack.pop();
        self.depth -= 1;
        Ok(())
    }

    /// `Some(true)` inside an object, `Some(false)` inside an array.
    fn innermost(&self) -> Option<bool> {
        (self.depth > 0).then(|| self.stack.top())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Idle,
    String { key: bool, escape: Escape },
    Number(Num),
    Literal { kind: Literal, matched: u8 },
    Object(Object),
    Array(Array),
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Escape {
    None,
    Backslash,
    /// Hex digits still expected
    Unicode(u8),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    Sign,
    LeadingZero,
    Integer,
    Point,
    Fraction,
    Exponent,
    ExponentSign,
    ExponentDigits,
}

impl Num {
    fn advance(self, ch: u8) -> Option<Num> {
        match (self, ch) {
            (Num::Sign, b'0') => Some(Num::LeadingZero),
            (Num::Sign, b'1'..=b'9') => Some(Num::Integer),
            (Num::Integer, b'0'..=b'9') => Some(Num::Integer),
            (Num::LeadingZero | Num::Integer, b'.') => Some(Num::Point),
            (Num::Point | Num::Fraction, b'0'..=b'9') => Some(Num::Fraction),
            (Num::LeadingZero | Num::Integer | Num::Fraction, b'e' | b'E') => Some(Num::Exponent),
            (Num::Exponent, b'+' | b'-') => Some(Num::ExponentSign),
            (Num::Exponent | Num::ExponentSign | Num::ExponentDigits, b'0'..=b'9') => {
                Some(Num::ExponentDigits)
            }
            _ => None,
        }
    }

    /// Whether the digits seen so far form a valid number.
    fn is_complete(self) -> bool {
        matches!(
            self,
            Num::LeadingZero | Num::Integer | Num::Fraction | Num::ExponentDigits
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Literal {
    True,
    False,
    Null,
}

impl Literal {
    const fn as_bytes(self) -> &'static [u8] {
        match self {
            Literal::True => b"true",
            Literal::False => b"false",
            Literal::Null => b"null",
        }
    }

    const fn as_event_token(self) -> EventToken {
        match self {
            Literal::True => EventToken::True,
            Literal::False => EventToken::False,
            Literal::Null => EventToken::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Object {
    KeyOrEnd,
    Key,
    Colon,
    Value,
    CommaOrEnd,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Array {
    ItemOrEnd,
    Item,
    CommaOrEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventToken {
    True,
    False,
    Null,
    String,
    Key,
    Number,
}

/// Tokenizer events.
///
/// Positions are absolute stream offsets. `Begin` is reported at the first
/// byte of the token (the opening quote for strings and keys). `End` is
/// reported at the closing quote or last literal byte, except for numbers:
/// a number only ends when the byte after it arrives, so `End(Number)` is
/// reported at that delimiter, which is not part of the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Begin(EventToken),
    End(EventToken),
    ObjectStart,
    ObjectEnd,
    ArrayStart,
    ArrayEnd,
}

/// Returned by the event callback to keep going or to stop right after the
/// event just reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

enum Step {
    /// The byte was fully processed.
    Consumed(Flow),
    /// The byte terminated a number and must be processed again.
    Replay(Flow),
}

#[derive(Debug, Clone)]
pub struct Tokenizer<T: BitBucket = u32> {
    state: State,
    total_consumed: usize,
    context: ParseContext<T>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrKind,
    character: u8,
    position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrKind {
    EmptyStream,
    UnfinishedStream,
    InvalidToken,
    UnescapedControlCharacter,
    TrailingComma,
    ContentEnded,
    UnopenedArray,
    UnopenedObject,
    MaxDepthReached,
    InvalidNumber,
    InvalidUnicodeEscape,
    InvalidStringEscape,
    ExpectedObjectKey,
    ExpectedObjectValue,
    ExpectedColon,
    ExpectedComma,
    ExpectedArrayItem,
}

impl Error {
    pub fn new<T>(kind: ErrKind, character: u8, position: usize) -> Result<T, Self> {
        Err(Self {
            kind,
            character,
            position,
        })
    }

    pub fn kind(&self) -> ErrKind {
        self.kind
    }

    /// The offending byte.
    pub fn character(&self) -> u8 {
        self.character
    }

    /// Absolute stream offset of the offending byte.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:?}({}) at {}",
            self.kind, self.character as char, self.position
        )
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:?} at position {} (byte {:?})",
            self.kind, self.position, self.character as char
        )
    }
}

impl<T: BitBucket> Default for Tokenizer<T> {
    fn default() -> Self {
        Self::new()
    }
}

const fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r')
}

impl<T: BitBucket> Tokenizer<T> {
    pub fn new() -> Self {
        Tokenizer {
            state: State::Idle,
            total_consumed: 0,
            context: ParseContext::new(),
        }
    }

    /// Absolute offset of the next byte the tokenizer expects.
    pub fn position(&self) -> usize {
        self.total_consumed
    }

    /// Current object/array nesting depth.
    pub fn depth(&self) -> usize {
        self.context.depth
    }

    /// Whether the root value has been completely tokenized.
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Feed a chunk of bytes.
    ///
    /// Returns how many bytes of `data` were processed. That is all of them
    /// unless the callback returned [`Flow::Stop`]; the byte that produced the
    /// stopping event counts as processed, except for a number's delimiter,
    /// which is left for the next call.
    pub fn parse_chunk<F>(&mut self, data: &[u8], callback: &mut F) -> Result<usize, Error>
    where
        F: FnMut(Event, usize) -> Flow + ?Sized,
    {
        let mut pos = 0;
        while let Some(&byte) = data.get(pos) {
            let absolute = self.total_consumed + pos;
            match self.step(byte, absolute, callback)? {
                Step::Consumed(Flow::Continue) => pos += 1,
                Step::Consumed(Flow::Stop) => {
                    pos += 1;
                    break;
                }
                Step::Replay(Flow::Continue) => {}
                Step::Replay(Flow::Stop) => break,
            }
        }
        self.total_consumed += pos;
        trace!("tokenizer processed {} of {} bytes", pos, data.len());
        Ok(pos)
    }

    /// Signal end of input.
    ///
    /// Closes a trailing root-level number, then checks that the document is
    /// complete.
    pub fn finish<F>(&mut self, callback: &mut F) -> Result<usize, Error>
    where
        F: FnMut(Event, usize) -> Flow + ?Sized,
    {
        if self.total_consumed == 0 {
            return Error::new(ErrKind::EmptyStream, b' ', 0);
        }
        if let State::Number(num) = self.state {
            if num.is_complete() && self.context.depth == 0 {
                callback(Event::End(EventToken::Number), self.total_consumed);
                self.state = State::Finished;
            }
        }
        match self.state {
            State::Finished => Ok(self.total_consumed),
            _ => Error::new(ErrKind::UnfinishedStream, b' ', self.total_consumed),
        }
    }

    fn step<F>(&mut self, byte: u8, pos: usize, callback: &mut F) -> Result<Step, Error>
    where
        F: FnMut(Event, usize) -> Flow + ?Sized,
    {
        let flow = match self.state {
            State::Idle if is_whitespace(byte) => Flow::Continue,
            State::Idle => self.start_value(byte, pos, ErrKind::InvalidToken, callback)?,
            State::Finished if is_whitespace(byte) => Flow::Continue,
            State::Finished => return Error::new(ErrKind::ContentEnded, byte, pos),
            State::Number(num) => match num.advance(byte) {
                Some(next) => {
                    self.state = State::Number(next);
                    Flow::Continue
                }
                None if num.is_complete() => {
                    self.state = self.after_value();
                    let flow = callback(Event::End(EventToken::Number), pos);
                    return Ok(Step::Replay(flow));
                }
                None => return Error::new(ErrKind::InvalidNumber, byte, pos),
            },
            State::String { key, escape } => self.string_byte(key, escape, byte, pos, callback)?,
            State::Literal { kind, matched } => {
                self.literal_byte(kind, matched, byte, pos, callback)?
            }
            State::Object(_) | State::Array(_) if is_whitespace(byte) => Flow::Continue,
            State::Object(expect) => self.object_byte(expect, byte, pos, callback)?,
            State::Array(expect) => self.array_byte(expect, byte, pos, callback)?,
        };
        Ok(Step::Consumed(flow))
    }

    fn after_value(&self) -> State {
        match self.context.innermost() {
            Some(true) => State::Object(Object::CommaOrEnd),
            Some(false) => State::Array(Array::CommaOrEnd),
            None => State::Finished,
        }
    }

    fn start_value<F>(
        &mut self,
        byte: u8,
        pos: usize,
        invalid: ErrKind,
        callback: &mut F,
    ) -> Result<Flow, Error>
    where
        F: FnMut(Event, usize) -> Flow + ?Sized,
    {
        let (state, event) = match byte {
            b'{' => {
                self.context.enter(true, byte, pos)?;
                (State::Object(Object::KeyOrEnd), Event::ObjectStart)
            }
            b'[' => {
                self.context.enter(false, byte, pos)?;
                (State::Array(Array::ItemOrEnd), Event::ArrayStart)
            }
            b'"' => (
                State::String {
                    key: false,
                    escape: Escape::None,
                },
                Event::Begin(EventToken::String),
            ),
            b'-' => (State::Number(Num::Sign), Event::Begin(EventToken::Number)),
            b'0' => (
                State::Number(Num::LeadingZero),
                Event::Begin(EventToken::Number),
            ),
            b'1'..=b'9' => (State::Number(Num::Integer), Event::Begin(EventToken::Number)),
            b't' | b'f' | b'n' => {
                let kind = match byte {
                    b't' => Literal::True,
                    b'f' => Literal::False,
                    _ => Literal::Null,
                };
                (
                    State::Literal { kind, matched: 1 },
                    Event::Begin(kind.as_event_token()),
                )
            }
            _ => return Error::new(invalid, byte, pos),
        };
        self.state = state;
        Ok(callback(event, pos))
    }

    fn close<F>(&mut self, object: bool, byte: u8, pos: usize, callback: &mut F) -> Result<Flow, Error>
    where
        F: FnMut(Event, usize) -> Flow + ?Sized,
    {
        self.context.exit(object, byte, pos)?;
        self.state = self.after_value();
        let event = if object {
            Event::ObjectEnd
        } else {
            Event::ArrayEnd
        };
        Ok(callback(event, pos))
    }

    fn object_byte<F>(
        &mut self,
        expect: Object,
        byte: u8,
        pos: usize,
        callback: &mut F,
    ) -> Result<Flow, Error>
    where
        F: FnMut(Event, usize) -> Flow + ?Sized,
    {
        match (expect, byte) {
            (Object::KeyOrEnd | Object::Key, b'"') => {
                self.state = State::String {
                    key: true,
                    escape: Escape::None,
                };
                Ok(callback(Event::Begin(EventToken::Key), pos))
            }
            (Object::KeyOrEnd | Object::CommaOrEnd, b'}') => self.close(true, byte, pos, callback),
            (Object::Key, b'}') => Error::new(ErrKind::TrailingComma, byte, pos),
            (Object::KeyOrEnd | Object::Key, _) => Error::new(ErrKind::ExpectedObjectKey, byte, pos),
            (Object::Colon, b':') => {
                self.state = State::Object(Object::Value);
                Ok(Flow::Continue)
            }
            (Object::Colon, _) => Error::new(ErrKind::ExpectedColon, byte, pos),
            (Object::Value, _) => {
                self.start_value(byte, pos, ErrKind::ExpectedObjectValue, callback)
            }
            (Object::CommaOrEnd, b',') => {
                self.state = State::Object(Object::Key);
                Ok(Flow::Continue)
            }
            (Object::CommaOrEnd, b']') => Error::new(ErrKind::UnopenedArray, byte, pos),
            (Object::CommaOrEnd, _) => Error::new(ErrKind::ExpectedComma, byte, pos),
        }
    }

    fn array_byte<F>(
        &mut self,
        expect: Array,
        byte: u8,
        pos: usize,
        callback: &mut F,
    ) -> Result<Flow, Error>
    where
        F: FnMut(Event, usize) -> Flow + ?Sized,
    {
        match (expect, byte) {
            (Array::ItemOrEnd | Array::CommaOrEnd, b']') => self.close(false, byte, pos, callback),
            (Array::Item, b']') => Error::new(ErrKind::TrailingComma, byte, pos),
            (Array::ItemOrEnd | Array::Item, _) => {
                self.start_value(byte, pos, ErrKind::ExpectedArrayItem, callback)
            }
            (Array::CommaOrEnd, b',') => {
                self.state = State::Array(Array::Item);
                Ok(Flow::Continue)
            }
            (Array::CommaOrEnd, b'}') => Error::new(ErrKind::UnopenedObject, byte, pos),
            (Array::CommaOrEnd, _) => Error::new(ErrKind::ExpectedComma, byte, pos),
        }
    }

    fn string_byte<F>(
        &mut self,
        key: bool,
        escape: Escape,
        byte: u8,
        pos: usize,
        callback: &mut F,
    ) -> Result<Flow, Error>
    where
        F: FnMut(Event, usize) -> Flow + ?Sized,
    {
        let escape = match (escape, byte) {
            (Escape::None, b'"') => {
                let token = if key {
                    self.state = State::Object(Object::Colon);
                    EventToken::Key
                } else {
                    self.state = self.after_value();
                    EventToken::String
                };
                return Ok(callback(Event::End(token), pos));
            }
            (Escape::None, b'\\') => Escape::Backslash,
            (Escape::None, b'\x00'..=b'\x1F') => {
                return Error::new(ErrKind::UnescapedControlCharacter, byte, pos);
            }
            (Escape::None, _) => Escape::None,
            (Escape::Backslash, b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't') => {
                Escape::None
            }
            (Escape::Backslash, b'u') => Escape::Unicode(4),
            (Escape::Backslash, _) => return Error::new(ErrKind::InvalidStringEscape, byte, pos),
            (Escape::Unicode(remaining), b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F') => {
                if remaining > 1 {
                    Escape::Unicode(remaining - 1)
                } else {
                    Escape::None
                }
            }
            (Escape::Unicode(_), _) => return Error::new(ErrKind::InvalidUnicodeEscape, byte, pos),
        };
        self.state = State::String { key, escape };
        Ok(Flow::Continue)
    }

    fn literal_byte<F>(
        &mut self,
        kind: Literal,
        matched: u8,
        byte: u8,
        pos: usize,
        callback: &mut F,
    ) -> Result<Flow, Error>
    where
        F: FnMut(Event, usize) -> Flow + ?Sized,
    {
        let text = kind.as_bytes();
        if text.get(matched as usize) != Some(&byte) {
            return Error::new(ErrKind::InvalidToken, byte, pos);
        }
        let matched = matched + 1;
        if matched as usize == text.len() {
            self.state = self.after_value();
            Ok(callback(Event::End(kind.as_event_token()), pos))
        } else {
            self.state = State::Literal { kind, matched };
            Ok(Flow::Continue)
        }
    }
}
