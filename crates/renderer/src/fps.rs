use std::fmt;

use crate::runtime::{Micros, MICROS_PER_SECOND};

/// Frames completed within one wall-clock second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FpsSample(u32);

impl FpsSample {
    pub fn frames(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FpsSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FPS: {}", self.0)
    }
}

/// Counts presented frames and emits a sample whenever a frame lands in a
/// different integer second than the one before it.
///
/// The frame that crosses the boundary opens the new window, so the emitted
/// count covers only frames of the window that just closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCounter {
    count: u32,
    last_frame: Micros,
}

impl FrameCounter {
    pub fn new(now: Micros) -> Self {
        Self {
            count: 0,
            last_frame: now,
        }
    }

    /// Frames recorded in the current window so far.
    pub fn pending(&self) -> u32 {
        self.count
    }

    /// The emitted count leaves out the frame that crosses the boundary; that
    /// frame opens the next window.
    pub fn record_frame(&mut self, now: Micros) -> Option<FpsSample> {
        let crossed = now / MICROS_PER_SECOND != self.last_frame / MICROS_PER_SECOND;
        self.last_frame = now;
        if crossed {
            let sample = FpsSample(self.count);
            self.count = 1;
            Some(sample)
        } else {
            self.count = self.count.saturating_add(1);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_once_when_second_boundary_is_crossed() {
        let mut counter = FrameCounter::new(0);
        let samples: Vec<_> = [0, 100_000, 900_000, 1_100_000]
            .into_iter()
            .map(|now| counter.record_frame(now))
            .collect();

        assert_eq!(samples, vec![None, None, None, Some(FpsSample(3))]);
        assert_eq!(counter.pending(), 1);
    }

    #[test]
    fn sample_formats_as_console_line() {
        assert_eq!(FpsSample(60).to_string(), "FPS: 60");
    }

    #[test]
    fn skipped_seconds_emit_a_single_sample() {
        let mut counter = FrameCounter::new(0);
        counter.record_frame(200_000);
        let sample = counter.record_frame(5_300_000);
        assert_eq!(sample.map(FpsSample::frames), Some(1));
        assert_eq!(counter.record_frame(5_400_000), None);
        assert_eq!(counter.pending(), 2);
    }

    #[test]
    fn steady_sixty_hz_reports_sixty() {
        let mut counter = FrameCounter::new(0);
        let frame = MICROS_PER_SECOND / 60;
        let mut emitted = Vec::new();
        for index in 1..=180 {
            if let Some(sample) = counter.record_frame(index * frame + 10) {
                emitted.push(sample.frames());
            }
        }
        assert!(emitted.len() >= 2);
        assert!(emitted.iter().skip(1).all(|&frames| frames == 60));
    }
}
