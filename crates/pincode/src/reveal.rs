//! The secure-mode re-mask timer.

use std::time::Duration;

use pincode_core::Command;

/// How long the most recent character stays readable in secure mode.
pub const REVEAL_DELAY: Duration = Duration::from_millis(500);

/// Identifies one scheduled re-mask. Carried back in the tick message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RevealHandle(u64);

/// At most one pending re-mask per widget.
///
/// Scheduling hands out a fresh [`RevealHandle`] and forgets the previous
/// one, so a tick that arrives for a superseded or cancelled handle is
/// ignored by [`fire`](RevealTimer::fire). The value captured at scheduling
/// time is returned on fire so the widget can check it is still current.
#[derive(Debug, Default)]
pub struct RevealTimer {
    next: u64,
    pending: Option<(RevealHandle, String)>,
}

impl RevealTimer {
    /// Schedule a re-mask of `value`, replacing any pending one.
    pub fn schedule<Msg: Send + 'static>(
        &mut self,
        value: &str,
        on_elapsed: impl FnOnce(RevealHandle) -> Msg + Send + 'static,
    ) -> Command<Msg> {
        self.next += 1;
        let handle = RevealHandle(self.next);
        self.pending = Some((handle, value.to_owned()));
        tracing::debug!(handle = handle.0, "reveal timer scheduled");
        Command::tick(REVEAL_DELAY, move |_| on_elapsed(handle))
    }

    /// Drop the pending re-mask. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Whether a re-mask is pending.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Consume the pending re-mask if `handle` is the current one, returning
    /// the value captured when it was scheduled.
    pub fn fire(&mut self, handle: RevealHandle) -> Option<String> {
        if self.pending.as_ref().is_some_and(|(current, _)| *current == handle) {
            return self.pending.take().map(|(_, value)| value);
        }
        tracing::trace!(handle = handle.0, "stale reveal tick ignored");
        None
    }
}
