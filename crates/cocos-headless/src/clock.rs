use std::time::{Duration, Instant};

use crate::config::HeadlessConfig;

/// One engine frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameTime {
    /// Seconds since the previous frame; the value scheduler ticks receive.
    pub dt: f32,
    /// Monotonic frame counter, starting at 0.
    pub frame_index: u64,
}

#[derive(Debug, Clone)]
enum Source {
    Wall { last: Instant, dt_min: Duration, dt_max: Duration },
    Fixed(Duration),
}

/// Produces the delta the headless engine feeds its scheduler.
///
/// Wall-clock mode clamps each delta to `[dt_min, dt_max]`; fixed mode
/// returns the same step every frame, which keeps demos and tests
/// reproducible.
#[derive(Debug, Clone)]
pub struct FrameClock {
    source: Source,
    frame_index: u64,
}

impl FrameClock {
    pub fn from_config(config: &HeadlessConfig) -> Self {
        match config.fixed_step {
            Some(step) => Self::fixed(step),
            None => Self::wall(config.dt_min, config.dt_max),
        }
    }

    pub fn wall(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            source: Source::Wall { last: Instant::now(), dt_min, dt_max },
            frame_index: 0,
        }
    }

    pub fn fixed(step: Duration) -> Self {
        Self { source: Source::Fixed(step), frame_index: 0 }
    }

    /// Resets the wall-clock baseline, e.g. after the host was suspended.
    pub fn reset(&mut self) {
        if let Source::Wall { last, .. } = &mut self.source {
            *last = Instant::now();
        }
    }

    pub fn tick(&mut self) -> FrameTime {
        let dt = match &mut self.source {
            Source::Wall { last, dt_min, dt_max } => {
                let now = Instant::now();
                let dt = now.saturating_duration_since(*last).clamp(*dt_min, *dt_max);
                *last = now;
                dt
            }
            Source::Fixed(step) => *step,
        };

        let frame = FrameTime { dt: dt.as_secs_f32(), frame_index: self.frame_index };
        self.frame_index = self.frame_index.wrapping_add(1);
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_repeats_its_step() {
        let mut clock = FrameClock::fixed(Duration::from_millis(250));
        let a = clock.tick();
        let b = clock.tick();
        assert_eq!(a, FrameTime { dt: 0.25, frame_index: 0 });
        assert_eq!(b, FrameTime { dt: 0.25, frame_index: 1 });
    }

    #[test]
    fn wall_clock_is_clamped() {
        let min = Duration::from_millis(5);
        let max = Duration::from_millis(10);
        let mut clock = FrameClock::wall(min, max);
        let dt = clock.tick().dt;
        assert!(dt >= min.as_secs_f32() && dt <= max.as_secs_f32());
    }

    #[test]
    fn config_selects_source() {
        let mut clock = FrameClock::from_config(&HeadlessConfig::fixed(Duration::from_millis(100)));
        assert_eq!(clock.tick().dt, 0.1);
    }
}
