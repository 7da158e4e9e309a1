use std::f64::consts::PI;

use crate::runtime::Micros;

/// Angle advanced per elapsed microsecond.
pub const RADIANS_PER_MICROSECOND: f64 = 0.000_001;

/// Time-driven rotation angle.
///
/// The angle grows with wall-clock time rather than frame count and wraps by
/// subtracting π once it exceeds π, giving a half-turn period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationClock {
    angle: f64,
    last_frame: Micros,
}

impl AnimationClock {
    pub fn new(now: Micros) -> Self {
        Self::with_angle(0.0, now)
    }

    /// Starts from `angle`, wrapped into (0, π] if it exceeds π.
    ///
    /// Non-finite angles start from zero.
    pub fn with_angle(angle: f64, now: Micros) -> Self {
        let angle = if angle.is_finite() { angle } else { 0.0 };
        Self {
            angle: wrap_half_turn(angle),
            last_frame: now,
        }
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn last_frame(&self) -> Micros {
        self.last_frame
    }

    /// Advances the angle by the time elapsed since the previous tick.
    ///
    /// Timestamps older than the previous one count as zero elapsed time.
    pub fn tick(&mut self, now: Micros) -> f64 {
        let delta = now.saturating_sub(self.last_frame);
        self.angle = wrap_half_turn(self.angle + RADIANS_PER_MICROSECOND * delta as f64);
        self.last_frame = now;
        self.angle
    }
}

/// Removes whole half turns from angles above π, leaving the result in (0, π].
fn wrap_half_turn(angle: f64) -> f64 {
    if angle <= PI {
        return angle;
    }
    match angle % PI {
        rest if rest == 0.0 => PI,
        rest => rest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_proportionally_to_elapsed_time() {
        let mut clock = AnimationClock::with_angle(0.0, 1_000);
        let angle = clock.tick(1_000_000);
        assert!((angle - 0.999).abs() < 1e-9);
        assert_eq!(clock.last_frame(), 1_000_000);
    }

    #[test]
    fn wraps_by_half_turn_even_without_elapsed_time() {
        let mut clock = AnimationClock::with_angle(3.15, 500);
        let angle = clock.tick(500);
        assert!((angle - (3.15 - PI)).abs() < 1e-12);
        assert!((angle - 0.00841).abs() < 1e-5);
    }

    #[test]
    fn exactly_pi_is_not_wrapped() {
        let mut clock = AnimationClock::with_angle(PI, 0);
        assert_eq!(clock.tick(0), PI);
    }

    #[test]
    fn long_stall_stays_in_range() {
        let mut clock = AnimationClock::new(0);
        let angle = clock.tick(10_000_000);
        assert!(angle > 0.0 && angle <= PI);
        assert!((angle - (10.0 - 3.0 * PI)).abs() < 1e-9);
    }

    #[test]
    fn largest_delta_returns_in_range() {
        let mut clock = AnimationClock::new(0);
        let angle = clock.tick(Micros::MAX);
        assert!(angle > 0.0 && angle <= PI, "angle {angle}");
        assert_eq!(clock.last_frame(), Micros::MAX);
    }

    #[test]
    fn huge_starting_angle_is_wrapped() {
        let mut clock = AnimationClock::with_angle(1e17, 0);
        assert!(clock.angle() > 0.0 && clock.angle() <= PI);
        let angle = clock.tick(0);
        assert!(angle > 0.0 && angle <= PI, "angle {angle}");
    }

    #[test]
    fn non_finite_starting_angle_starts_from_zero() {
        assert_eq!(AnimationClock::with_angle(f64::INFINITY, 0).angle(), 0.0);
        assert_eq!(AnimationClock::with_angle(f64::NAN, 0).angle(), 0.0);
    }

    #[test]
    fn whole_half_turns_land_on_pi() {
        assert_eq!(wrap_half_turn(2.0 * PI), PI);
    }

    #[test]
    fn chunking_across_wraps_matches_single_tick() {
        let chunkings: [&[Micros]; 3] = [
            &[4_000_000],
            &[1, 3_141_592, 7, 858_400],
            &[333_333, 666_667, 1_250_000, 1_750_000],
        ];
        for chunks in chunkings {
            let mut now = 0;
            let mut clock = AnimationClock::new(now);
            for chunk in chunks {
                now += chunk;
                clock.tick(now);
            }
            assert_eq!(now, 4_000_000);
            assert!(
                (clock.angle() - (4.0 - PI)).abs() < 1e-9,
                "chunks {chunks:?} produced {}",
                clock.angle()
            );
        }
    }

    #[test]
    fn backwards_timestamp_counts_as_zero() {
        let mut clock = AnimationClock::with_angle(1.0, 2_000_000);
        assert_eq!(clock.tick(1_000_000), 1.0);
        assert_eq!(clock.last_frame(), 1_000_000);
    }

    #[test]
    fn chunking_does_not_change_total_advance() {
        let chunkings: [&[Micros]; 4] = [
            &[1_000_000],
            &[500_000, 500_000],
            &[1, 999, 250_000, 749_000],
            &[1_000; 1_000],
        ];
        for chunks in chunkings {
            let mut now = 0;
            let mut clock = AnimationClock::new(now);
            for chunk in chunks {
                now += chunk;
                clock.tick(now);
            }
            assert_eq!(now, 1_000_000);
            assert!(
                (clock.angle() - 1.0).abs() < 1e-9,
                "chunks {:?} produced {}",
                &chunks[..chunks.len().min(4)],
                clock.angle()
            );
        }
    }
}
