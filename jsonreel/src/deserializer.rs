// SPDX-License-Identifier: Apache-2.0

use log::{debug, trace};

use crate::buffer_pool::{BufferPool, PooledBuffer};
use crate::segment_chain::{ChainOutcome, SegmentChain};
use crate::state_machine::{ParserProgress, StateMachine};
use crate::stream_buffer::{BufferOutcome, StreamBuffer};
use crate::{DeserializeError, ParseError, Reader};

/// Per-operation tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Size of the buffer the operation starts with.
    pub initial_buffer_size: usize,
    /// Size of each buffer appended once a token outgrows the first one.
    pub segment_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            initial_buffer_size: 8192,
            segment_size: 8192,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_buffer_size(mut self, size: usize) -> Self {
        self.initial_buffer_size = size.max(1);
        self
    }

    pub fn with_segment_size(mut self, size: usize) -> Self {
        self.segment_size = size.max(1);
        self
    }
}

enum Mode<'p> {
    Single(StreamBuffer<'p>),
    Chain {
        chain: SegmentChain<'p>,
        /// The operation's first buffer once the chain has let go of it,
        /// kept for the return to single-buffer mode.
        first: Option<PooledBuffer<'p>>,
    },
    /// Completed or failed; every buffer has been released.
    Finished,
}

/// Drives one deserialization, fed by whoever does the reading.
///
/// Each round, the caller reads into [`Deserializer::fill_slice`] and reports
/// the byte count to [`Deserializer::commit`]. The deserializer starts on one
/// buffer, moves to a segment chain when a token outgrows it, and moves back
/// once the chain has drained to a single segment with room to spare.
///
/// [`deserialize`] and [`deserialize_async`] run this loop for the usual
/// byte sources.
pub struct Deserializer<'p, T, M> {
    mode: Mode<'p>,
    progress: ParserProgress,
    /// `None` once handed back to the caller.
    target: Option<T>,
    machine: M,
    segment_size: usize,
    received: usize,
}

impl<T, M: StateMachine<T>> Deserializer<'static, T, M> {
    /// Deserializer on the shared pool with default [`Options`].
    pub fn new(target: T, machine: M) -> Self {
        Self::with_options(target, machine, Options::default(), BufferPool::shared())
    }
}

impl<'p, T, M: StateMachine<T>> Deserializer<'p, T, M> {
    /// Deserializer leasing its buffers from `pool`. Zero sizes count as one byte.
    pub fn with_options(target: T, machine: M, options: Options, pool: &'p BufferPool) -> Self {
        let buffer = pool.acquire(options.initial_buffer_size.max(1));
        Deserializer {
            mode: Mode::Single(StreamBuffer::new(buffer)),
            progress: ParserProgress::default(),
            target: Some(target),
            machine,
            segment_size: options.segment_size.max(1),
            received: 0,
        }
    }

    /// Where the next read goes. Empty once the operation has finished.
    pub fn fill_slice(&mut self) -> &mut [u8] {
        match &mut self.mode {
            Mode::Single(buffer) => buffer.fill_slice(),
            Mode::Chain { chain, .. } => chain.fill_slice(),
            Mode::Finished => &mut [],
        }
    }

    /// Account for `bytes_read` new bytes in [`Deserializer::fill_slice`] and parse.
    ///
    /// Returns the target once the state machine completes it. A zero-byte
    /// read means the source ended early and fails the operation. Any error
    /// is final and releases all buffers before it is returned.
    pub fn commit<E>(&mut self, bytes_read: usize) -> Result<Option<T>, DeserializeError<E>> {
        if matches!(self.mode, Mode::Finished) {
            return Ok(None);
        }
        if bytes_read == 0 {
            self.mode = Mode::Finished;
            debug!("byte source ended after {} bytes", self.received);
            return Err(DeserializeError::UnexpectedEndOfStream {
                position: self.received,
            });
        }
        self.received += bytes_read;
        trace!("read {} bytes, {} total", bytes_read, self.received);

        if self.parse(bytes_read)? {
            debug!("deserialized {} bytes", self.received);
            return Ok(self.target.take());
        }
        Ok(None)
    }

    /// One parse attempt; leaves the mode `Finished` on completion or error.
    fn parse(&mut self, bytes_read: usize) -> Result<bool, ParseError> {
        let Some(target) = self.target.as_mut() else {
            return Ok(false);
        };
        let progress = &mut self.progress;
        let machine = &mut self.machine;

        self.mode = match std::mem::replace(&mut self.mode, Mode::Finished) {
            Mode::Single(mut buffer) => {
                buffer.mark_filled(bytes_read);
                match buffer.try_parse(progress, machine, target)? {
                    BufferOutcome::Complete => return Ok(true),
                    BufferOutcome::NeedMoreBytes => Mode::Single(buffer),
                    BufferOutcome::BufferExhausted => {
                        let (buffer, count) = buffer.into_parts();
                        let position = progress.position();
                        Mode::Chain {
                            chain: SegmentChain::new(buffer, count, position, self.segment_size),
                            first: None,
                        }
                    }
                }
            }
            Mode::Chain {
                mut chain,
                mut first,
            } => {
                chain.mark_filled(bytes_read);
                match chain.try_parse(progress, machine, target)? {
                    ChainOutcome::Complete => return Ok(true),
                    ChainOutcome::ConsumedFully {
                        first: Some(buffer),
                        ..
                    } => first = Some(buffer),
                    ChainOutcome::ConsumedFully { .. } | ChainOutcome::NeedMoreBytes => {}
                }
                match chain.collapse(&mut first) {
                    Some(buffer) => Mode::Single(buffer),
                    None => Mode::Chain { chain, first },
                }
            }
            Mode::Finished => Mode::Finished,
        };
        Ok(false)
    }

    /// Absolute stream offset up to which tokens have been consumed.
    pub fn position(&self) -> usize {
        self.progress.position()
    }

    /// Total bytes received from the source so far.
    pub fn received(&self) -> usize {
        self.received
    }

    pub fn in_chain_mode(&self) -> bool {
        matches!(self.mode, Mode::Chain { .. })
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.mode, Mode::Finished)
    }
}

/// Deserialize a `T::default()` from `source`.
///
/// Uses the shared [`BufferPool`] and default [`Options`].
pub fn deserialize<T, R, M>(source: R, machine: M) -> Result<T, DeserializeError<R::Error>>
where
    T: Default,
    R: Reader,
    M: StateMachine<T>,
{
    deserialize_with(source, T::default(), machine)
}

/// Deserialize into a caller-supplied `target`.
pub fn deserialize_with<T, R, M>(
    source: R,
    target: T,
    machine: M,
) -> Result<T, DeserializeError<R::Error>>
where
    R: Reader,
    M: StateMachine<T>,
{
    deserialize_with_options(
        source,
        target,
        machine,
        Options::default(),
        BufferPool::shared(),
    )
}

/// Deserialize with explicit [`Options`] and buffer pool.
pub fn deserialize_with_options<T, R, M>(
    mut source: R,
    target: T,
    machine: M,
    options: Options,
    pool: &BufferPool,
) -> Result<T, DeserializeError<R::Error>>
where
    R: Reader,
    M: StateMachine<T>,
{
    let mut deserializer = Deserializer::with_options(target, machine, options, pool);
    loop {
        let bytes_read = source
            .read(deserializer.fill_slice())
            .map_err(DeserializeError::Source)?;
        if let Some(target) = deserializer.commit(bytes_read)? {
            return Ok(target);
        }
    }
}

#[cfg(feature = "async")]
mod nonblocking {
    use futures_io::AsyncRead;
    use futures_util::AsyncReadExt;

    use super::*;

    /// Deserialize a `T::default()` from an async byte source.
    ///
    /// Dropping the returned future cancels the operation and releases its buffers.
    pub async fn deserialize_async<T, R, M>(
        source: R,
        machine: M,
    ) -> Result<T, DeserializeError<std::io::Error>>
    where
        T: Default,
        R: AsyncRead + Unpin,
        M: StateMachine<T>,
    {
        deserialize_async_with_options(
            source,
            T::default(),
            machine,
            Options::default(),
            BufferPool::shared(),
        )
        .await
    }

    /// Async counterpart of [`deserialize_with_options`](super::deserialize_with_options).
    pub async fn deserialize_async_with_options<T, R, M>(
        mut source: R,
        target: T,
        machine: M,
        options: Options,
        pool: &BufferPool,
    ) -> Result<T, DeserializeError<std::io::Error>>
    where
        R: AsyncRead + Unpin,
        M: StateMachine<T>,
    {
        let mut deserializer = Deserializer::with_options(target, machine, options, pool);
        loop {
            let bytes_read = source
                .read(deserializer.fill_slice())
                .await
                .map_err(DeserializeError::Source)?;
            if let Some(target) = deserializer.commit(bytes_read)? {
                return Ok(target);
            }
        }
    }
}

#[cfg(feature = "async")]
pub use nonblocking::{deserialize_async, deserialize_async_with_options};
