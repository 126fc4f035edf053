// SPDX-License-Identifier: Apache-2.0

//! Byte-level JSON tokenizer.
//!
//! The tokenizer validates JSON grammar one byte at a time and reports
//! `Begin`/`End` events with absolute stream positions. It holds no input
//! buffer of its own, so it can be fed arbitrarily split chunks, cloned to
//! snapshot its state, and asked to stop right after any event.

#![cfg_attr(not(test), no_std)]

pub mod bitstack;
pub use bitstack::BitBucket;

mod tokenizer;

pub use tokenizer::{ErrKind, Error, Event, EventToken, Flow, Tokenizer};
