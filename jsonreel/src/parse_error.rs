// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Errors raised while turning bytes into tokens and tokens into values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// An error bubbled up from the underlying tokenizer.
    #[error("malformed JSON: {0}")]
    Tokenizer(ujson::Error),
    /// A string or key was not valid UTF-8.
    #[error("invalid UTF-8 in string starting at position {position}")]
    InvalidUtf8 { position: usize },
    /// Invalid escape sequence character.
    #[error("invalid escape sequence in string starting at position {position}")]
    InvalidEscapeSequence { position: usize },
    /// Valid hex but invalid Unicode codepoint, e.g. a lone surrogate.
    #[error("invalid unicode codepoint in string starting at position {position}")]
    InvalidUnicodeCodepoint { position: usize },
    /// The state machine received a token it cannot place.
    #[error("unexpected token at position {position}, expected {expected}")]
    UnexpectedToken {
        expected: &'static str,
        position: usize,
    },
    /// A number does not fit the type the state machine asked for.
    #[error("number at position {position} is out of range")]
    NumericOverflow { position: usize },
}

impl From<ujson::Error> for ParseError {
    fn from(err: ujson::Error) -> Self {
        ParseError::Tokenizer(err)
    }
}

/// The failure of a whole deserialization operation.
///
/// `E` is the byte source's error type.
#[derive(Debug, Error)]
pub enum DeserializeError<E> {
    /// The source returned zero bytes before the state machine completed.
    #[error("byte source ended at position {position} before the document was complete")]
    UnexpectedEndOfStream { position: usize },
    /// Malformed input or a state machine rejection.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The byte source failed; passed through unchanged.
    #[error("byte source failed: {0:?}")]
    Source(E),
}

impl<E> DeserializeError<E> {
    /// Stream position the error refers to, when it has one.
    pub fn position(&self) -> Option<usize> {
        match self {
            DeserializeError::UnexpectedEndOfStream { position } => Some(*position),
            DeserializeError::Parse(ParseError::Tokenizer(e)) => Some(e.position()),
            DeserializeError::Parse(
                ParseError::InvalidUtf8 { position }
                | ParseError::InvalidEscapeSequence { position }
                | ParseError::InvalidUnicodeCodepoint { position }
                | ParseError::UnexpectedToken { position, .. }
                | ParseError::NumericOverflow { position },
            ) => Some(*position),
            DeserializeError::Source(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ujson::{ErrKind, Flow, Tokenizer};
    use test_log::test;

    fn tokenizer_error(data: &[u8]) -> ujson::Error {
        Tokenizer::<u32>::new()
            .parse_chunk(data, &mut |_, _| Flow::Continue)
            .unwrap_err()
    }

    #[test]
    fn test_tokenizer_error_conversion() {
        let err: ParseError = tokenizer_error(b"[1,]").into();
        match &err {
            ParseError::Tokenizer(inner) => assert_eq!(inner.kind(), ErrKind::TrailingComma),
            _ => panic!("Expected tokenizer error"),
        }
        assert!(err.to_string().contains("TrailingComma"));
    }

    #[test]
    fn test_position_is_reported() {
        let err: DeserializeError<()> = ParseError::from(tokenizer_error(b"[1}")).into();
        assert_eq!(err.position(), Some(2));

        let err: DeserializeError<()> = DeserializeError::UnexpectedEndOfStream { position: 9 };
        assert_eq!(err.position(), Some(9));
        assert!(err.to_string().contains("position 9"));

        let err: DeserializeError<&str> = DeserializeError::Source("reset by peer");
        assert_eq!(err.position(), None);
        assert!(err.to_string().contains("reset by peer"));
    }
}
