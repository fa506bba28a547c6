// ── Engine settings ──
//
// Read once at startup, immutable afterwards. battwatch-config builds
// these from file + environment; tests build them directly.

use std::time::Duration;

use strum::{Display, EnumString};
use tracing::warn;
use url::Url;

/// Fallback when the configured empty level is unusable.
pub const DEFAULT_EMPTY_LEVEL: f64 = 25.0;

/// Sort direction for the plan's ordered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Immutable engine configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the automation server.
    pub server_url: Url,
    /// HTTP request timeout.
    pub http_timeout: Duration,
    /// Battery percentage considered empty; drives categorization,
    /// filter restarts and the notification threshold.
    pub empty_level: f64,
    /// Mark mirrors as used/visible at creation.
    pub auto_use: bool,
    /// Enroll a low-battery notification for every new mirror.
    pub notify_all: bool,
    /// Name of the plan to maintain; empty disables plan management.
    pub plan_name: String,
    /// Plan ordering; `None` leaves the plan order alone.
    pub sort: Option<SortDirection>,
    /// Full device poll cadence.
    pub poll_interval: Duration,
    /// Engine tick while idle.
    pub tick_normal: Duration,
    /// Engine tick while a plan sort pass is running.
    pub tick_fast: Duration,
}

impl Settings {
    /// Settings with production cadences and plan management off.
    pub fn new(server_url: Url) -> Self {
        Self {
            server_url,
            http_timeout: Duration::from_secs(30),
            empty_level: DEFAULT_EMPTY_LEVEL,
            auto_use: true,
            notify_all: false,
            plan_name: String::new(),
            sort: None,
            poll_interval: Duration::from_secs(300),
            tick_normal: Duration::from_secs(10),
            tick_fast: Duration::from_secs(1),
        }
    }

    /// Width of one presentation bucket above the empty level.
    pub fn level_delta(&self) -> f64 {
        (100.0 - self.empty_level) / 3.0
    }

    /// Whether plan management is enabled at all.
    pub fn plan_enabled(&self) -> bool {
        !self.plan_name.is_empty()
    }

    /// Normalise a configured empty level.
    ///
    /// A fractional value in (0, 1) is read as a ratio and scaled to a
    /// percentage. A value outside 3..=97 after that is rejected with
    /// a warning and replaced by [`DEFAULT_EMPTY_LEVEL`].
    pub fn normalize_empty_level(raw: f64) -> f64 {
        let scaled = if raw > 0.0 && raw < 1.0 {
            raw * 100.0
        } else {
            raw
        };
        if (3.0..=97.0).contains(&scaled) {
            scaled
        } else {
            warn!(
                value = scaled,
                "unusable empty level, falling back to {DEFAULT_EMPTY_LEVEL}%"
            );
            DEFAULT_EMPTY_LEVEL
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn settings() -> Settings {
        Settings::new(Url::parse("http://127.0.0.1:8080").unwrap())
    }

    #[test]
    fn delta_splits_the_range_above_empty() {
        let mut s = settings();
        assert_eq!(s.level_delta(), 25.0);
        s.empty_level = 40.0;
        assert_eq!(s.level_delta(), 20.0);
    }

    #[test]
    fn empty_plan_name_disables_plan_management() {
        let mut s = settings();
        assert!(!s.plan_enabled());
        s.plan_name = "Batteries".into();
        assert!(s.plan_enabled());
    }

    #[test]
    fn fractional_empty_level_scales_to_percent() {
        assert_eq!(Settings::normalize_empty_level(0.5), 50.0);
        assert_eq!(Settings::normalize_empty_level(0.97), 97.0);
    }

    #[test]
    fn out_of_range_empty_level_falls_back() {
        assert_eq!(Settings::normalize_empty_level(98.0), DEFAULT_EMPTY_LEVEL);
        assert_eq!(Settings::normalize_empty_level(2.0), DEFAULT_EMPTY_LEVEL);
        assert_eq!(Settings::normalize_empty_level(0.02), DEFAULT_EMPTY_LEVEL);
        assert_eq!(Settings::normalize_empty_level(-10.0), DEFAULT_EMPTY_LEVEL);
    }

    #[test]
    fn in_range_empty_level_is_kept() {
        assert_eq!(Settings::normalize_empty_level(50.0), 50.0);
        assert_eq!(Settings::normalize_empty_level(3.0), 3.0);
        assert_eq!(Settings::normalize_empty_level(97.0), 97.0);
    }

    #[test]
    fn sort_direction_round_trips_through_strings() {
        assert_eq!(
            SortDirection::from_str("ascending").unwrap(),
            SortDirection::Ascending
        );
        assert_eq!(SortDirection::Descending.to_string(), "descending");
        assert!(SortDirection::from_str("sideways").is_err());
    }
}
