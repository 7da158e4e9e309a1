use std::time::Instant;

/// Microseconds on a monotonic timeline.
pub type Micros = u64;

/// Microseconds in one second.
pub const MICROS_PER_SECOND: Micros = 1_000_000;

/// Abstraction over where frame timestamps originate from.
pub trait TimeSource {
    /// Current timestamp; never decreases between calls.
    fn now(&mut self) -> Micros;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    /// Creates a time source whose zero is `Instant::now()`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&mut self) -> Micros {
        Micros::try_from(self.origin.elapsed().as_micros()).unwrap_or(Micros::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_time_never_goes_backwards() {
        let mut source = SystemTimeSource::new();
        let first = source.now();
        let second = source.now();
        assert!(second >= first);
    }
}
