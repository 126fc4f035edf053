// SPDX-License-Identifier: Apache-2.0

use log::trace;

use crate::buffer_pool::PooledBuffer;
use crate::state_machine::{ParserProgress, StateMachine};
use crate::token_reader::Window;
use crate::ParseError;

/// Result of a single-buffer parse attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferOutcome {
    /// The state machine finished the target.
    Complete,
    /// Space is left for the next read.
    NeedMoreBytes,
    /// Nothing was consumed and the buffer is full.
    BufferExhausted,
}

/// One pooled buffer that reads land in and parse attempts run over.
///
/// Valid data always starts at offset 0: after each attempt the unconsumed
/// tail is moved to the front so the next read appends right behind it.
#[derive(Debug)]
pub struct StreamBuffer<'p> {
    buffer: PooledBuffer<'p>,
    /// End of valid data (buffer[0..data_end] contains valid data)
    data_end: usize,
}

impl<'p> StreamBuffer<'p> {
    pub fn new(buffer: PooledBuffer<'p>) -> Self {
        Self {
            buffer,
            data_end: 0,
        }
    }

    /// Take over a segment's buffer, moving its `offset..offset + count` data to the front.
    pub fn from_segment(mut buffer: PooledBuffer<'p>, offset: usize, count: usize) -> Self {
        buffer.copy_within(offset..offset + count, 0);
        Self {
            buffer,
            data_end: count,
        }
    }

    /// Unused tail of the buffer for the source to read into.
    pub fn fill_slice(&mut self) -> &mut [u8] {
        &mut self.buffer[self.data_end..]
    }

    /// Record that the source put `bytes_read` bytes into [`StreamBuffer::fill_slice`].
    pub fn mark_filled(&mut self, bytes_read: usize) {
        self.data_end = (self.data_end + bytes_read).min(self.buffer.capacity());
    }

    pub fn data(&self) -> &[u8] {
        &self.buffer[..self.data_end]
    }

    pub fn is_full(&self) -> bool {
        self.data_end == self.buffer.capacity()
    }

    /// Drop the first `consumed` bytes, moving the rest to the front.
    pub fn compact(&mut self, consumed: usize) {
        if consumed == 0 {
            return;
        }
        let consumed = consumed.min(self.data_end);
        self.buffer.copy_within(consumed..self.data_end, 0);
        self.data_end -= consumed;
    }

    /// Run the state machine over the buffered bytes.
    pub fn try_parse<T, M>(
        &mut self,
        progress: &mut ParserProgress,
        machine: &mut M,
        target: &mut T,
    ) -> Result<BufferOutcome, ParseError>
    where
        M: StateMachine<T> + ?Sized,
    {
        let window = Window::Contiguous(&self.buffer[..self.data_end]);
        let (complete, consumed) = progress.attempt(window, machine, target)?;
        if complete {
            return Ok(BufferOutcome::Complete);
        }
        if consumed == 0 && self.is_full() {
            trace!("buffer of {} bytes exhausted", self.buffer.capacity());
            return Ok(BufferOutcome::BufferExhausted);
        }
        self.compact(consumed);
        Ok(BufferOutcome::NeedMoreBytes)
    }

    /// Give up the buffer along with how many valid bytes it holds.
    pub fn into_parts(self) -> (PooledBuffer<'p>, usize) {
        (self.buffer, self.data_end)
    }
}
