// SPDX-License-Identifier: Apache-2.0

mod common;

use common::{Value, ValueBuilder};
use jsonreel::{
    deserialize_with_options, BufferPool, ChunkReader, DeserializeError, Deserializer, Options,
    ParseError, Reader, StateMachine, Token, Tokens,
};
use std::convert::Infallible;
use test_log::test;

#[derive(Debug, Default, PartialEq)]
struct Record {
    a: i64,
    b: Vec<i64>,
}

/// Reads `{"a": <int>, "b": [<int>, ...]}` in any key order.
///
/// Cursor states: 0 before the object, 1 expecting a key or the end,
/// 2 expecting the value of `a`, 3 expecting the `b` array, 4 inside it.
struct RecordMachine;

impl StateMachine<Record> for RecordMachine {
    fn resume(
        &mut self,
        target: &mut Record,
        tokens: &mut Tokens<'_>,
        cursor: &mut i32,
    ) -> Result<bool, ParseError> {
        while let Some(token) = tokens.next_token()? {
            *cursor = match (*cursor, token) {
                (0, Token::StartObject) => 1,
                (1, Token::PropertyName(key)) if key == "a" => 2,
                (1, Token::PropertyName(key)) if key == "b" => 3,
                (1, Token::EndObject) => return Ok(true),
                (2, Token::Number(n)) => {
                    target.a = n.as_i64().ok_or_else(|| tokens.overflow())?;
                    1
                }
                (3, Token::StartArray) => 4,
                (4, Token::Number(n)) => {
                    target.b.push(n.as_i64().ok_or_else(|| tokens.overflow())?);
                    4
                }
                (4, Token::EndArray) => 1,
                _ => return Err(tokens.unexpected("a record")),
            };
        }
        Ok(false)
    }
}

#[test]
fn test_small_document_in_four_byte_chunks() {
    let pool = BufferPool::new();
    let options = Options::new().with_initial_buffer_size(8);
    let record = deserialize_with_options(
        ChunkReader::new(br#"{"a":1,"b":[2,3]}"#, 4),
        Record::default(),
        RecordMachine,
        options,
        &pool,
    )
    .unwrap();
    assert_eq!(record, Record { a: 1, b: vec![2, 3] });

    // Every token fits the first buffer: one acquisition, one release.
    let stats = pool.stats();
    assert_eq!(stats.acquired, 1);
    assert_eq!(stats.released, 1);
    assert_eq!(stats.allocated, 1);
}

#[test]
fn test_no_leaks_across_operations() {
    let pool = BufferPool::new();
    let options = Options::new()
        .with_initial_buffer_size(8)
        .with_segment_size(8);
    let long = format!(r#"{{"a": 5, "b": [{}]}}"#, vec!["1"; 40].join(", "));
    let long_string = format!(r#"["{}"]"#, "x".repeat(100));

    for round in 0..10 {
        // Fits in one buffer.
        deserialize_with_options(
            ChunkReader::new(br#"{"b":[],"a":-4}"#, 3),
            Record::default(),
            RecordMachine,
            options,
            &pool,
        )
        .unwrap();

        // Long document with short tokens.
        let record = deserialize_with_options(
            ChunkReader::new(long.as_bytes(), 5),
            Record::default(),
            RecordMachine,
            options,
            &pool,
        )
        .unwrap();
        assert_eq!(record.b.len(), 40);

        // A token bigger than a buffer goes through chain mode.
        let value = deserialize_with_options(
            ChunkReader::new(long_string.as_bytes(), 3 + round),
            Value::Null,
            ValueBuilder::default(),
            options,
            &pool,
        )
        .unwrap();
        assert_eq!(value, Value::Array(vec![Value::Str("x".repeat(100))]));

        // The source ends in the middle of chain mode.
        let err = deserialize_with_options(
            ChunkReader::new(format!(r#"["{}"#, "y".repeat(50)).as_bytes(), 4),
            Value::Null,
            ValueBuilder::default(),
            options,
            &pool,
        )
        .unwrap_err();
        assert!(matches!(err, DeserializeError::UnexpectedEndOfStream { .. }));

        // Rejected by the state machine.
        let err = deserialize_with_options(
            ChunkReader::new(br#"{"a": "not a number"}"#, 2),
            Record::default(),
            RecordMachine,
            options,
            &pool,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DeserializeError::Parse(ParseError::UnexpectedToken { position: 6, .. })
        ));

        // Tokenizer error.
        let err = deserialize_with_options(
            ChunkReader::new(br#"{"a": 1,, "b": []}"#, 2),
            Record::default(),
            RecordMachine,
            options,
            &pool,
        )
        .unwrap_err();
        assert!(matches!(err, DeserializeError::Parse(ParseError::Tokenizer(_))));
    }

    let stats = pool.stats();
    assert_eq!(stats.outstanding, 0, "{:?}", stats);
    assert_eq!(stats.acquired, stats.released);
    assert!(stats.acquired > 60);
}

#[test]
fn test_chain_collapses_back_to_single_buffer() {
    let pool = BufferPool::new();
    let options = Options::new()
        .with_initial_buffer_size(8)
        .with_segment_size(8);
    let json = br#"["0123456789abcdefghijklmnopqrstuv","x","y","z"]"#;
    let mut reader = ChunkReader::new(json, 4);
    let mut de = Deserializer::with_options(Value::Null, ValueBuilder::default(), options, &pool);

    let mut observed = Vec::new();
    let value = loop {
        let n = reader.read(de.fill_slice()).unwrap();
        let done = de.commit::<Infallible>(n).unwrap();
        observed.push((de.in_chain_mode(), pool.stats().outstanding));
        if let Some(value) = done {
            break value;
        }
    };

    // While open, the 32-byte string spreads over four buffers.
    assert!(observed.contains(&(true, 4)), "{:?}", observed);
    let last_chain = observed.iter().rposition(|&(chain, _)| chain).unwrap();
    // Once the string is consumed only one buffer is left.
    assert_eq!(observed[last_chain + 1], (false, 1));

    assert_eq!(
        value,
        Value::Array(vec![
            Value::Str("0123456789abcdefghijklmnopqrstuv".to_string()),
            Value::Str("x".to_string()),
            Value::Str("y".to_string()),
            Value::Str("z".to_string()),
        ])
    );
    assert_eq!(pool.stats().outstanding, 0);
}

#[test]
fn test_whitespace_between_tokens_is_not_buffered() {
    let pool = BufferPool::new();
    let options = Options::new()
        .with_initial_buffer_size(16)
        .with_segment_size(16);
    let json = format!("[1,{}2]", " ".repeat(4000));
    let mut reader = ChunkReader::new(json.as_bytes(), 16);
    let mut de = Deserializer::with_options(Value::Null, ValueBuilder::default(), options, &pool);

    let mut peak = 0;
    let value = loop {
        let n = reader.read(de.fill_slice()).unwrap();
        let done = de.commit::<Infallible>(n).unwrap();
        peak = peak.max(pool.stats().outstanding);
        assert!(!de.in_chain_mode());
        if let Some(value) = done {
            break value;
        }
    };

    assert_eq!(value, Value::Array(vec![Value::Int(1), Value::Int(2)]));
    assert_eq!(peak, 1);
    assert_eq!(pool.stats().acquired, 1);
    assert_eq!(pool.stats().outstanding, 0);
}

#[test]
fn test_zero_byte_read_is_fatal() {
    let pool = BufferPool::new();
    let options = Options::new().with_initial_buffer_size(8);

    let err = deserialize_with_options(
        ChunkReader::full_slice(b""),
        Value::Null,
        ValueBuilder::default(),
        options,
        &pool,
    )
    .unwrap_err();
    assert!(matches!(err, DeserializeError::UnexpectedEndOfStream { position: 0 }));

    let err = deserialize_with_options(
        ChunkReader::new(br#"{"b": [1, 2"#, 3),
        Record::default(),
        RecordMachine,
        options,
        &pool,
    )
    .unwrap_err();
    assert!(matches!(err, DeserializeError::UnexpectedEndOfStream { position: 11 }));
    assert_eq!(err.position(), Some(11));

    // A bare root number only ends at a delimiter.
    let err = deserialize_with_options(
        ChunkReader::full_slice(b"42"),
        Value::Null,
        ValueBuilder::default(),
        options,
        &pool,
    )
    .unwrap_err();
    assert!(matches!(err, DeserializeError::UnexpectedEndOfStream { position: 2 }));

    assert_eq!(pool.stats().outstanding, 0);
}

/// Returns end of stream on the first read, then data.
struct Hiccup<'a> {
    first: bool,
    data: ChunkReader<'a>,
}

impl Reader for Hiccup<'_> {
    type Error = Infallible;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if std::mem::take(&mut self.first) {
            return Ok(0);
        }
        self.data.read(buf)
    }
}

#[test]
fn test_no_retry_after_zero_read() {
    let pool = BufferPool::new();
    let err = deserialize_with_options(
        Hiccup {
            first: true,
            data: ChunkReader::full_slice(b"[]"),
        },
        Value::Null,
        ValueBuilder::default(),
        Options::default(),
        &pool,
    )
    .unwrap_err();
    assert!(matches!(err, DeserializeError::UnexpectedEndOfStream { position: 0 }));
    assert_eq!(pool.stats().outstanding, 0);
}

#[test]
fn test_shared_pool_is_used_by_default() {
    let before = BufferPool::shared().stats().acquired;
    let value = jsonreel::deserialize::<Value, _, _>(
        ChunkReader::new(b"[true]", 2),
        ValueBuilder::default(),
    )
    .unwrap();
    assert_eq!(value, Value::Array(vec![Value::Bool(true)]));
    assert!(BufferPool::shared().stats().acquired > before);
}
