//! Fade-out ramp
//!
//! Linear volume ramp from the voice's volume at the moment the fade was
//! requested down to silence, sampled once per tick.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeRamp {
    from_volume: f32,
    duration: Duration,
    elapsed: Duration,
}

impl FadeRamp {
    /// `duration` must be non-zero; a zero fade is a plain stop
    pub fn new(from_volume: f32, duration: Duration) -> Self {
        Self {
            from_volume,
            duration,
            elapsed: Duration::ZERO,
        }
    }

    /// Advance by `delta` and return the volume to apply
    pub fn advance(&mut self, delta: Duration) -> f32 {
        self.elapsed = (self.elapsed + delta).min(self.duration);
        self.volume()
    }

    pub fn volume(&self) -> f32 {
        let progress = self.progress();
        (self.from_volume * (1.0 - progress)).max(0.0)
    }

    /// Fraction of the ramp completed (0.0-1.0)
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}
