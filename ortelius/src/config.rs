//! Process-wide configuration of the interactive core.

use std::time::Duration;

const DEFAULT_CLICK_TIMEOUT: Duration = Duration::from_millis(200);
const DEFAULT_DBL_CLICK_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_PICK_RADIUS_SCALE: f64 = 4.0;

/// Configuration shared by the dispatcher, picker and redraw coordinator.
///
/// There is no implicit global instance: create one (or take the default),
/// hand it to [`Map::new`](crate::Map::new), and use
/// [`CoreConfig::reset`] to return a map to the default behavior.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoreConfig {
    click_timeout: Duration,
    double_click_interval: Duration,
    pick_radius_scale: f64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            click_timeout: DEFAULT_CLICK_TIMEOUT,
            double_click_interval: DEFAULT_DBL_CLICK_INTERVAL,
            pick_radius_scale: DEFAULT_PICK_RADIUS_SCALE,
        }
    }
}

impl CoreConfig {
    /// Maximum delay between a button press and release for the pair to
    /// count as a click.
    pub fn click_timeout(&self) -> Duration {
        self.click_timeout
    }

    /// Sets the maximum delay between a button press and release for the
    /// pair to count as a click.
    pub fn with_click_timeout(mut self, timeout: Duration) -> Self {
        self.click_timeout = timeout;
        self
    }

    /// Sets the maximum delay between a button press and release for the
    /// pair to count as a click.
    pub fn set_click_timeout(&mut self, timeout: Duration) {
        self.click_timeout = timeout;
    }

    /// Maximum delay between two clicks that makes them a double click.
    ///
    /// Single-click callbacks are buffered for this long so that the second
    /// click of a double-click sequence can cancel them.
    pub fn double_click_interval(&self) -> Duration {
        self.double_click_interval
    }

    /// Sets the maximum delay between two clicks that makes them a double
    /// click.
    pub fn with_double_click_interval(mut self, interval: Duration) -> Self {
        self.double_click_interval = interval;
        self
    }

    /// Sets the maximum delay between two clicks that makes them a double
    /// click.
    pub fn set_double_click_interval(&mut self, interval: Duration) {
        self.double_click_interval = interval;
    }

    /// Multiplier applied to the median nearest-neighbor spacing of a
    /// dataset when a pick is done without an explicit search radius.
    pub fn pick_radius_scale(&self) -> f64 {
        self.pick_radius_scale
    }

    /// Sets the multiplier applied to the median nearest-neighbor spacing
    /// of a dataset when a pick is done without an explicit search radius.
    pub fn with_pick_radius_scale(mut self, scale: f64) -> Self {
        self.pick_radius_scale = scale;
        self
    }

    /// Sets the multiplier applied to the median nearest-neighbor spacing
    /// of a dataset when a pick is done without an explicit search radius.
    pub fn set_pick_radius_scale(&mut self, scale: f64) {
        self.pick_radius_scale = scale;
    }

    /// Returns the configuration to the default values.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_restores_defaults() {
        let mut config = CoreConfig::default()
            .with_click_timeout(Duration::from_millis(1))
            .with_pick_radius_scale(10.0);
        assert_ne!(config, CoreConfig::default());

        config.reset();
        assert_eq!(config, CoreConfig::default());
    }
}
