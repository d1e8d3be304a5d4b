//! Fixed-timestep accumulator converting frame time into simulation steps.

use std::time::Duration;

/// Accumulates variable frame time and releases it in fixed steps.
#[derive(Clone, Copy, Debug)]
pub struct FixedTimestep {
    step: Duration,
    max_steps: u32,
    accumulator: Duration,
}

impl FixedTimestep {
    /// Creates an accumulator releasing `step`-sized steps, at most
    /// `max_steps` per frame.
    #[must_use]
    pub const fn new(step: Duration, max_steps: u32) -> Self {
        Self {
            step,
            max_steps,
            accumulator: Duration::ZERO,
        }
    }

    /// Adds `frame_dt` and returns how many steps should run now.
    ///
    /// Time beyond `max_steps` steps is dropped so a long stall cannot
    /// trigger a catch-up spiral.
    pub fn accumulate(&mut self, frame_dt: Duration) -> u32 {
        if self.step.is_zero() {
            return 0;
        }
        let cap = self.step.saturating_mul(self.max_steps);
        self.accumulator = self.accumulator.saturating_add(frame_dt).min(cap);

        let mut steps = 0;
        while self.accumulator >= self.step {
            self.accumulator -= self.step;
            steps += 1;
        }
        steps
    }

    /// Fraction of a step left in the accumulator, in `[0, 1)`.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        if self.step.is_zero() {
            return 0.0;
        }
        self.accumulator.as_secs_f32() / self.step.as_secs_f32()
    }

    /// Duration of one step.
    #[must_use]
    pub const fn step(&self) -> Duration {
        self.step
    }

    /// Drops any accumulated time.
    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }
}
