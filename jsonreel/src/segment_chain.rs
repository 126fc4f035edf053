// SPDX-License-Identifier: Apache-2.0

use std::collections::VecDeque;

use log::{debug, trace};

use crate::buffer_pool::{BufferPool, PooledBuffer};
use crate::state_machine::{ParserProgress, StateMachine};
use crate::stream_buffer::StreamBuffer;
use crate::token_reader::{Parts, Window};
use crate::ParseError;

/// Result of a parse attempt over the chain.
#[derive(Debug)]
pub enum ChainOutcome<'p> {
    /// The state machine finished the target.
    Complete,
    /// No segment was drained; read more.
    NeedMoreBytes,
    /// Fully consumed leading segments were unlinked.
    ConsumedFully {
        /// How many segments were unlinked.
        released: usize,
        /// The buffer the chain started with, if it was among them. It goes
        /// back to the caller rather than to the pool.
        first: Option<PooledBuffer<'p>>,
    },
}

/// One buffer in the chain.
#[derive(Debug)]
struct Segment<'p> {
    buffer: PooledBuffer<'p>,
    /// Start of unconsumed data
    offset: usize,
    /// Valid bytes from `offset`
    count: usize,
    /// Absolute stream position of `buffer[offset]`
    running_index: usize,
    /// The caller's working buffer the chain was started with.
    is_first: bool,
}

impl<'p> Segment<'p> {
    fn data(&self) -> &[u8] {
        &self.buffer[self.offset..self.offset + self.count]
    }

    fn spare(&self) -> usize {
        self.buffer.capacity() - (self.offset + self.count)
    }
}

/// Buffers in stream order, used once a single token outgrows one buffer.
///
/// Parse attempts see the whole chain as one logical window. Consumed
/// segments are unlinked from the head, reads append at the tail. Segments
/// are addressed by index, with lookups by stream position done by binary
/// search over their running indexes.
#[derive(Debug)]
pub struct SegmentChain<'p> {
    /// Never empty: the tail is emptied in place, not unlinked.
    segments: VecDeque<Segment<'p>>,
    pool: &'p BufferPool,
    segment_size: usize,
    /// Unconsumed bytes across all segments.
    buffered: usize,
}

impl<'p> SegmentChain<'p> {
    /// Start a chain with the caller's buffer holding `count` bytes from
    /// stream position `running_index`.
    pub fn new(
        buffer: PooledBuffer<'p>,
        count: usize,
        running_index: usize,
        segment_size: usize,
    ) -> Self {
        debug!(
            "entering chain mode at position {} with {} buffered bytes",
            running_index, count
        );
        let pool = buffer.pool();
        let mut segments = VecDeque::new();
        segments.push_back(Segment {
            buffer,
            offset: 0,
            count,
            running_index,
            is_first: true,
        });
        SegmentChain {
            segments,
            pool,
            segment_size,
            buffered: count,
        }
    }

    /// Link `buffer` behind the current tail.
    pub fn append(&mut self, buffer: PooledBuffer<'p>) {
        let running_index = self
            .segments
            .back()
            .map_or(0, |tail| tail.running_index + tail.count);
        trace!("appending segment at position {}", running_index);
        self.segments.push_back(Segment {
            buffer,
            offset: 0,
            count: 0,
            running_index,
            is_first: false,
        });
    }

    /// Spare room at the tail for the next read, appending a fresh segment if the tail is full.
    pub fn fill_slice(&mut self) -> &mut [u8] {
        if self.segments.back().is_some_and(|tail| tail.spare() == 0) {
            let buffer = self.pool.acquire(self.segment_size);
            self.append(buffer);
        }
        match self.segments.back_mut() {
            Some(tail) => {
                let start = tail.offset + tail.count;
                &mut tail.buffer[start..]
            }
            None => &mut [],
        }
    }

    /// Record that the source put `bytes_read` bytes into [`SegmentChain::fill_slice`].
    pub fn mark_filled(&mut self, bytes_read: usize) {
        if let Some(tail) = self.segments.back_mut() {
            let added = bytes_read.min(tail.spare());
            tail.count += added;
            self.buffered += added;
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total unconsumed bytes across all segments.
    pub fn buffered(&self) -> usize {
        self.buffered
    }

    /// Absolute stream position of the first unconsumed byte.
    pub fn running_index(&self) -> usize {
        self.segments.front().map_or(0, |head| head.running_index)
    }

    /// Run the state machine over every segment's data as one window.
    pub fn try_parse<T, M>(
        &mut self,
        progress: &mut ParserProgress,
        machine: &mut M,
        target: &mut T,
    ) -> Result<ChainOutcome<'p>, ParseError>
    where
        M: StateMachine<T> + ?Sized,
    {
        debug_assert_eq!(progress.position(), self.running_index());
        let (complete, consumed) = progress.attempt(Window::Chained(&*self), machine, target)?;
        if complete {
            return Ok(ChainOutcome::Complete);
        }
        Ok(match self.advance(consumed) {
            (0, _) => ChainOutcome::NeedMoreBytes,
            (released, first) => ChainOutcome::ConsumedFully { released, first },
        })
    }

    /// Mark `consumed` bytes as used, unlinking drained segments head first.
    ///
    /// Returns how many segments were unlinked, plus the chain's first buffer
    /// if it was one of them. Every other unlinked buffer goes back to the
    /// pool. The tail is never unlinked; once drained it is reset to an empty
    /// buffer.
    pub fn advance(&mut self, mut consumed: usize) -> (usize, Option<PooledBuffer<'p>>) {
        let mut released = 0;
        let mut first = None;
        self.buffered -= consumed.min(self.buffered);
        loop {
            let linked = self.segments.len() > 1;
            let Some(head) = self.segments.front_mut() else {
                break;
            };
            if linked && consumed >= head.count {
                consumed -= head.count;
                if let Some(seg) = self.segments.pop_front() {
                    released += 1;
                    if seg.is_first {
                        first = Some(seg.buffer);
                    }
                }
                continue;
            }
            let step = consumed.min(head.count);
            head.offset += step;
            head.count -= step;
            head.running_index += step;
            if head.count == 0 {
                head.offset = 0;
            }
            break;
        }
        if released > 0 {
            debug!(
                "unlinked {} consumed segments, {} left",
                released,
                self.len()
            );
        }
        (released, first)
    }

    /// Drop back to single-buffer mode once one segment is left and its bytes
    /// leave room to read into.
    ///
    /// The bytes end up in the chain's first buffer: either that segment is
    /// the first buffer, or they are copied into `first` and the segment's
    /// buffer is released. Returns `None` and leaves the chain as it was when
    /// the chain is not ready.
    pub fn collapse(&mut self, first: &mut Option<PooledBuffer<'p>>) -> Option<StreamBuffer<'p>> {
        if self.segments.len() != 1 {
            return None;
        }
        let seg = self.segments.front()?;
        let room = match first {
            Some(buffer) if !seg.is_first => buffer.capacity(),
            _ => seg.buffer.capacity(),
        };
        if seg.count >= room {
            return None;
        }
        let seg = self.segments.pop_front()?;
        self.buffered = 0;
        debug!("leaving chain mode with {} buffered bytes", seg.count);
        Some(match first.take() {
            Some(mut buffer) if !seg.is_first => {
                buffer[..seg.count].copy_from_slice(seg.data());
                StreamBuffer::from_segment(buffer, 0, seg.count)
            }
            _ => StreamBuffer::from_segment(seg.buffer, seg.offset, seg.count),
        })
    }
}

impl Parts for SegmentChain<'_> {
    fn rest_of_part(&self, at: usize) -> Option<&[u8]> {
        let position = self.running_index() + at;
        let index = self
            .segments
            .partition_point(|seg| seg.running_index <= position)
            .checked_sub(1)?;
        let seg = &self.segments[index];
        seg.data()
            .get(position - seg.running_index..)
            .filter(|rest| !rest.is_empty())
    }
}
