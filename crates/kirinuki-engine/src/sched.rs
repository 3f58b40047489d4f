//! Debounce scheduling for slider-driven reprocessing.
//!
//! A full reprocessing pass is too expensive to run on every slider
//! tick, so parameter changes are coalesced: each new value replaces
//! the pending one and restarts the delay, and only the latest value
//! fires once input goes quiet. The engine is sans-IO, so there is no
//! timer here -- the host polls, passing its [`Clock`].

use std::time::Duration;

use crate::diagnostics::Clock;

/// Trailing-edge debounce over values of type `T`.
///
/// `I` is the clock's instant type. At most one value is pending at a
/// time; scheduling a new one replaces it and restarts the delay.
#[derive(Debug)]
pub struct Debounce<T, I> {
    pending: Option<(T, I)>,
    delay: Duration,
}

impl<T, I> Debounce<T, I> {
    /// Create a debounce with the given trailing delay.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            pending: None,
            delay,
        }
    }

    /// Replace any pending value with `value`, restarting the delay.
    pub fn schedule<C>(&mut self, value: T, clock: &C)
    where
        C: Clock<Instant = I>,
    {
        self.pending = Some((value, clock.now()));
    }

    /// Drop the pending value without firing it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Whether a value is waiting to fire.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending value if its delay has elapsed.
    pub fn poll<C>(&mut self, clock: &C) -> Option<T>
    where
        C: Clock<Instant = I>,
    {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|(_, scheduled)| clock.elapsed(scheduled) >= self.delay);
        if due {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }
}
