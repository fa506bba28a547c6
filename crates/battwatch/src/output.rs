//! Output formatting for the battery report.
//!
//! Table rendering uses `tabled`; category labels are tinted with
//! `owo-colors` when stdout is an interactive terminal.

use std::io::{self, IsTerminal};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use battwatch_core::{MirrorStatus, PresentationCategory};

use crate::cli::ColorMode;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

fn paint_category(category: PresentationCategory, color: bool) -> String {
    let label = category.to_string();
    if color {
        match category {
            PresentationCategory::Healthy | PresentationCategory::Ok => label.green().to_string(),
            PresentationCategory::Low => label.yellow().to_string(),
            PresentationCategory::EmptySoon => label.red().to_string(),
            PresentationCategory::Dead => label.red().bold().to_string(),
        }
    } else {
        label
    }
}

// ── Table row ────────────────────────────────────────────────────────

#[derive(Tabled)]
struct BatteryRow {
    #[tabled(rename = "Slot")]
    slot: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Raw")]
    raw: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Last report")]
    last_report: String,
}

impl BatteryRow {
    fn new(status: &MirrorStatus, color: bool) -> Self {
        Self {
            slot: status.slot.to_string(),
            name: status.name.clone(),
            level: format!("{:.1}%", status.level),
            raw: format!("{:.0}%", status.raw_level),
            state: paint_category(status.category, color),
            last_report: status.last_update.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Render the battery report as a rounded table.
pub fn battery_table(statuses: &[MirrorStatus], color: bool) -> String {
    let rows: Vec<BatteryRow> = statuses
        .iter()
        .map(|status| BatteryRow::new(status, color))
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

// ── Tests ────────────────────────────────────────────────────────────
