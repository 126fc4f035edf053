// SPDX-License-Identifier: Apache-2.0

use core::ops::{BitAnd, BitOr, Shl, Shr};

/// Bit storage for the object/array nesting stack.
///
/// `true` marks an object level, `false` an array level. Depth tracking is
/// the caller's job; the bucket only stores bits.
pub trait BitBucket: Default + Clone + core::fmt::Debug {
    /// Pushes a bit onto the stack.
    fn push(&mut self, bit: bool);
    /// Pops the top bit off the stack.
    fn pop(&mut self) -> bool;
    /// Returns the top bit without removing it.
    fn top(&self) -> bool;
    /// How many levels the bucket can hold.
    fn capacity() -> usize {
        core::mem::size_of::<Self>() * 8
    }
}

/// Blanket implementation for the builtin unsigned integers.
impl<T> BitBucket for T
where
    T: Shl<u8, Output = T>
        + Shr<u8, Output = T>
        + BitAnd<T, Output = T>
        + BitOr<Output = T>
        + PartialEq
        + Clone
        + Default
        + core::fmt::Debug
        + From<u8>,
{
    fn push(&mut self, bit: bool) {
        *self = (self.clone() << 1u8) | T::from(bit as u8);
    }

    fn pop(&mut self) -> bool {
        let bit = self.top();
        *self = self.clone() >> 1u8;
        bit
    }

    fn top(&self) -> bool {
        (self.clone() & T::from(1)) != T::from(0)
    }
}
