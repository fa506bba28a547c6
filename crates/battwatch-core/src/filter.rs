// ── Battery value smoothing ──
//
// Raw battery percentages flap: sensors report transmission-time
// voltage sag, then recover. Every mirrored device owns one
// ValueFilter that turns that noise into a stable presentation value.

use std::collections::VecDeque;

/// Smoothing strategy for raw battery samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Pass every sample through unchanged.
    Disabled,
    /// Ratchet: each update folds the sample into the running minimum,
    /// so the output never rises until a restart fires.
    Systematic,
    /// Trailing mean over the last 12 samples (about one hour at the
    /// 5-minute poll cadence).
    Windowed1h,
    /// Trailing mean over the last 288 samples (about one day).
    Windowed1d,
}

impl FilterMode {
    fn window(self) -> usize {
        match self {
            Self::Disabled | Self::Systematic => 1,
            Self::Windowed1h => 12,
            Self::Windowed1d => 288,
        }
    }
}

/// Debounce filter over one device's battery readings.
///
/// Output is always within [0, 100] for in-domain samples and starts
/// at 100 before the first reading arrives.
#[derive(Debug, Clone)]
pub struct ValueFilter {
    mode: FilterMode,
    empty_level: f64,
    history: VecDeque<f64>,
    last_in: f64,
    last_out: f64,
}

impl ValueFilter {
    pub fn new(mode: FilterMode, empty_level: f64) -> Self {
        Self {
            mode,
            empty_level,
            history: VecDeque::with_capacity(mode.window()),
            last_in: 100.0,
            last_out: 100.0,
        }
    }

    /// Fold one raw sample into the filter and return the new output.
    ///
    /// A non-finite sample is rejected and the previous output stands.
    pub fn update(&mut self, sample: f64) -> f64 {
        if !sample.is_finite() {
            return self.last_out;
        }
        self.last_in = sample;

        // A battery swap shows up as a fresh high sample while the
        // output sits at or below the empty threshold. Restart from
        // the new sample; the remembered minimum must not survive.
        let replaced = (sample >= self.empty_level && self.last_out <= self.empty_level)
            || (self.last_out <= 0.0 && sample > 0.0);
        if replaced {
            self.history.clear();
        }

        match self.mode {
            FilterMode::Disabled => {
                self.history.clear();
                self.history.push_back(sample);
            }
            FilterMode::Systematic => {
                let floor = if self.history.is_empty() {
                    sample
                } else {
                    sample.min(self.last_out)
                };
                self.history.clear();
                self.history.push_back(floor);
            }
            FilterMode::Windowed1h | FilterMode::Windowed1d => {
                if self.history.is_empty() {
                    // Seed the whole window so the mean starts at the
                    // first sample instead of ramping in from nothing.
                    for _ in 0..self.mode.window() {
                        self.history.push_back(sample);
                    }
                } else {
                    if self.history.len() == self.mode.window() {
                        self.history.pop_front();
                    }
                    self.history.push_back(sample);
                }
            }
        }

        self.last_out = mean(&self.history);
        self.last_out
    }

    /// Current smoothed output.
    pub fn output(&self) -> f64 {
        self.last_out
    }

    /// Most recent accepted raw sample.
    pub fn last_input(&self) -> f64 {
        self.last_in
    }
}

fn mean(values: &VecDeque<f64>) -> f64 {
    let (sum, count) = values
        .iter()
        .fold((0.0_f64, 0.0_f64), |(sum, count), value| {
            (sum + value, count + 1.0)
        });
    if count > 0.0 { sum / count } else { 0.0 }
}

// ── Tests ───────────────────────────────────────────────────────────
