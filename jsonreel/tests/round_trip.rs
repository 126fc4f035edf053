// SPDX-License-Identifier: Apache-2.0

// Whatever way the bytes are split up, the same document comes out.

mod common;

use common::{sample_document, RandomChunks, Value, ValueBuilder};
use jsonreel::{deserialize_with_options, BufferPool, ChunkReader, Options, Reader};
use std::convert::Infallible;
use test_log::test;

fn run<R: Reader<Error = Infallible>>(reader: R, options: Options) -> Value {
    let pool = BufferPool::new();
    let value = deserialize_with_options(reader, Value::Null, ValueBuilder::default(), options, &pool)
        .unwrap();
    let stats = pool.stats();
    assert_eq!(stats.outstanding, 0, "leaked buffers: {:?}", stats);
    assert_eq!(stats.acquired, stats.released);
    value
}

fn small_buffers() -> Options {
    Options::new()
        .with_initial_buffer_size(16)
        .with_segment_size(16)
}

macro_rules! chunk_size_tests {
    ($($name:ident: $chunk:expr),*) => {
        $(
            paste::paste! {
                #[test]
                fn [<test_round_trip_ $name _default_buffers>]() {
                    let expected = sample_document();
                    let json = expected.to_json();
                    let reader = ChunkReader::new(json.as_bytes(), $chunk);
                    assert_eq!(run(reader, Options::default()), expected);
                }

                #[test]
                fn [<test_round_trip_ $name _small_buffers>]() {
                    let expected = sample_document();
                    let json = expected.to_json();
                    let reader = ChunkReader::new(json.as_bytes(), $chunk);
                    assert_eq!(run(reader, small_buffers()), expected);
                }
            }
        )*
    };
}

chunk_size_tests!(
    chunks_of_1: 1,
    chunks_of_3: 3,
    chunks_of_7: 7,
    chunks_of_64: 64,
    whole: usize::MAX
);

#[test]
fn test_round_trip_random_chunks() {
    let expected = sample_document();
    let json = expected.to_json();
    for seed in 1..=32 {
        let reader = RandomChunks::new(json.as_bytes(), seed);
        assert_eq!(run(reader, small_buffers()), expected, "seed {}", seed);
    }
}

#[test]
fn test_round_trip_tiny_buffers() {
    let expected = sample_document();
    let json = expected.to_json();
    let options = Options::new()
        .with_initial_buffer_size(1)
        .with_segment_size(2);
    let reader = RandomChunks::new(json.as_bytes(), 7);
    assert_eq!(run(reader, options), expected);
}

#[test]
fn test_whitespace_heavy_document() {
    let json = b" \n\t[ 1 ,\r\n  { \"k\" :\t\"v\" } ,\n null ] \n";
    let expected = Value::Array(vec![
        Value::Int(1),
        Value::Object(vec![("k".to_string(), Value::Str("v".to_string()))]),
        Value::Null,
    ]);
    for chunk in [1, 2, 5, usize::MAX] {
        let reader = ChunkReader::new(json, chunk);
        assert_eq!(run(reader, small_buffers()), expected, "chunk {}", chunk);
    }
}

#[test]
fn test_root_scalar_followed_by_whitespace() {
    let reader = ChunkReader::new(b"\"just a string\"", 4);
    assert_eq!(run(reader, small_buffers()), Value::Str("just a string".to_string()));

    let reader = ChunkReader::new(b"-12.5e-1\n", 2);
    assert_eq!(run(reader, small_buffers()), Value::Float(-1.25));
}
