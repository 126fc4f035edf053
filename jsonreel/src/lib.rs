// SPDX-License-Identifier: Apache-2.0

//! Incremental, resumable JSON deserialization from streaming byte sources.
//!
//! Bytes are read into pooled buffers and handed, as complete tokens, to a
//! caller-supplied [`StateMachine`] that builds the target value. Tokens may
//! straddle reads; a token larger than the current buffer spills into a
//! chain of segments and the reader returns to a single buffer once the
//! chain drains. Every buffer goes back to its [`BufferPool`] on success,
//! error and cancellation alike.

mod buffer_pool;
pub use buffer_pool::{BufferPool, PoolStats, PooledBuffer};

mod chunk_reader;
pub use chunk_reader::ChunkReader;

mod deserializer;
#[cfg(feature = "async")]
pub use deserializer::{deserialize_async, deserialize_async_with_options};
pub use deserializer::{
    deserialize, deserialize_with, deserialize_with_options, Deserializer, Options,
};

mod escape_processor;

mod json_number;
pub use json_number::{JsonNumber, NumberResult};

mod parse_error;
pub use parse_error::{DeserializeError, ParseError};

mod reader;
pub use reader::{Cancellable, CancellationToken, Interrupted, IoReader, Reader};

mod segment_chain;
pub use segment_chain::{ChainOutcome, SegmentChain};

mod state_machine;
pub use state_machine::{ParserProgress, StateMachine};

mod stream_buffer;
pub use stream_buffer::{BufferOutcome, StreamBuffer};

mod token_reader;
pub use token_reader::{ResumeState, Token, Tokens};
