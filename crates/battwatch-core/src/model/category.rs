// ── Presentation categories ──

use strum::Display;

/// Five-bucket presentation of a smoothed battery level.
///
/// Thresholds derive from the configured empty level `E` and
/// `delta = (100 - E) / 3`, so the three healthy-ish buckets split the
/// range above `E` evenly no matter where `E` sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum PresentationCategory {
    Healthy,
    Ok,
    Low,
    EmptySoon,
    Dead,
}

impl PresentationCategory {
    /// Bucket a smoothed level.
    pub fn for_level(level: f64, empty_level: f64, delta: f64) -> Self {
        if level > empty_level + 2.0 * delta {
            Self::Healthy
        } else if level > empty_level + delta {
            Self::Ok
        } else if level > empty_level {
            Self::Low
        } else if level > 0.0 {
            Self::EmptySoon
        } else {
            Self::Dead
        }
    }

    /// Host image reference shown next to the mirrored value.
    pub fn icon(self) -> &'static str {
        match self {
            Self::Healthy => "battwatch",
            Self::Ok => "battwatch_ok",
            Self::Low => "battwatch_low",
            Self::EmptySoon => "battwatch_empty",
            Self::Dead => "battwatch_ko",
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────
