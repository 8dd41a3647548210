//! [`Clock`] abstraction.

use std::time::Instant;

/// Source of the current monotonic time.
pub trait Clock {
    /// Returns the current [`Instant`].
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}
