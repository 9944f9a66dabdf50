use std::time::Duration;

/// Headless engine configuration.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Lower clamp for measured frame deltas.
    pub dt_min: Duration,
    /// Upper clamp for measured frame deltas, so a stalled host does not
    /// fire a burst of catch-up ticks.
    pub dt_max: Duration,
    /// Advance by this step every frame instead of measuring wall time.
    pub fixed_step: Option<Duration>,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            dt_min: Duration::from_micros(100),
            dt_max: Duration::from_millis(250),
            fixed_step: None,
        }
    }
}

impl HeadlessConfig {
    /// Deterministic configuration stepping `step` per frame.
    pub fn fixed(step: Duration) -> Self {
        Self { fixed_step: Some(step), ..Self::default() }
    }
}
