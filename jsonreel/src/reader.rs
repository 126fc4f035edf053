// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// A byte source for [`deserialize`](crate::deserialize).
pub trait Reader {
    /// The error type returned by read operations
    type Error;

    /// Read data into the provided buffer.
    /// Returns the number of bytes read, or an error.
    ///
    /// # Contract
    /// - A return value of 0 **MUST** indicate true end of stream
    /// - `buf` is never empty
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

impl<R: Reader + ?Sized> Reader for &mut R {
    type Error = R::Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).read(buf)
    }
}

/// Adapts a [`std::io::Read`] into a [`Reader`].
///
/// Reads interrupted by a signal are retried.
#[derive(Debug)]
pub struct IoReader<R> {
    inner: R,
}

impl<R: std::io::Read> IoReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: std::io::Read> Reader for IoReader<R> {
    type Error = std::io::Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        loop {
            match self.inner.read(buf) {
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }
}

/// Shared flag for cancelling a deserialization from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Failure of a [`Cancellable`] reader.
#[derive(Debug, Error, PartialEq)]
pub enum Interrupted<E> {
    #[error("operation cancelled")]
    Cancelled,
    #[error("{0:?}")]
    Source(E),
}

/// Checks a [`CancellationToken`] before every read of the wrapped reader.
///
/// A read that is already in progress is not interrupted; the next one fails
/// with [`Interrupted::Cancelled`].
#[derive(Debug)]
pub struct Cancellable<R> {
    inner: R,
    token: CancellationToken,
}

impl<R: Reader> Cancellable<R> {
    pub fn new(inner: R, token: CancellationToken) -> Self {
        Self { inner, token }
    }
}

impl<R: Reader> Reader for Cancellable<R> {
    type Error = Interrupted<R::Error>;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.token.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        self.inner.read(buf).map_err(Interrupted::Source)
    }
}
