//! Monotonic time source abstraction to enable deterministic timing tests

use std::time::Instant;

/// Microsecond-resolution monotonic clock.
///
/// Values count up from an arbitrary fixed origin and are never interpreted
/// as wall-clock time.
pub trait MonotonicClock: Send {
    /// Microseconds elapsed since the clock's origin
    fn now(&self) -> u64;
}

/// Clock backed by `std::time::Instant`, anchored at construction
#[derive(Debug, Clone)]
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for StdClock {
    fn now(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}
