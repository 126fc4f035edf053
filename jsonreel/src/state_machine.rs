// SPDX-License-Identifier: Apache-2.0

use log::trace;

use crate::token_reader::{ResumeState, Tokens, Window};
use crate::ParseError;

/// Caller logic that turns tokens into a value.
///
/// `resume` is called once per parse attempt with whatever complete tokens
/// the newly available bytes hold. It pulls tokens with
/// [`Tokens::next_token`] until it is done or gets `None`, records where it is
/// in `cursor` (the value is preserved between calls and starts at 0), and
/// returns `true` once `target` is fully populated.
///
/// Tokens handed out are consumed: when the machine returns `false` it must
/// already have applied every token it pulled to `target` or `cursor`.
pub trait StateMachine<T> {
    fn resume(
        &mut self,
        target: &mut T,
        tokens: &mut Tokens<'_>,
        cursor: &mut i32,
    ) -> Result<bool, ParseError>;
}

impl<T, F> StateMachine<T> for F
where
    F: FnMut(&mut T, &mut Tokens<'_>, &mut i32) -> Result<bool, ParseError>,
{
    fn resume(
        &mut self,
        target: &mut T,
        tokens: &mut Tokens<'_>,
        cursor: &mut i32,
    ) -> Result<bool, ParseError> {
        self(target, tokens, cursor)
    }
}

/// Everything needed to pick a parse back up after more bytes arrive.
#[derive(Debug, Clone, Default)]
pub struct ParserProgress {
    pub resume: ResumeState,
    pub cursor: i32,
}

impl ParserProgress {
    /// Absolute stream offset the next window has to start at.
    pub fn position(&self) -> usize {
        self.resume.position()
    }

    /// Run `machine` over `window` and move the resume point past what it consumed.
    ///
    /// Returns whether the machine completed and how many window bytes were consumed.
    pub(crate) fn attempt<T, M>(
        &mut self,
        window: Window<'_>,
        machine: &mut M,
        target: &mut T,
    ) -> Result<(bool, usize), ParseError>
    where
        M: StateMachine<T> + ?Sized,
    {
        let mut tokens = Tokens::new(window, std::mem::take(&mut self.resume));
        let complete = machine.resume(target, &mut tokens, &mut self.cursor)?;
        let consumed = tokens.consumed();
        self.resume = tokens.into_resume();
        trace!(
            "parse attempt consumed {} bytes, cursor {}, complete {}",
            consumed,
            self.cursor,
            complete
        );
        Ok((complete, consumed))
    }
}
