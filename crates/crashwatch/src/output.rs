use std::sync::OnceLock;

use clap::ColorChoice;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};

use crashwatch_core::Severity;

static COLOR: OnceLock<ColorChoice> = OnceLock::new();

/// Output format for commands that print data
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Record the `--color` choice; first call wins.
pub fn set_color_choice(choice: ColorChoice) {
    let _ = COLOR.set(choice);
}

/// Create a styled table for output
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    match COLOR.get() {
        Some(ColorChoice::Always) => {
            table.enforce_styling();
        }
        Some(ColorChoice::Never) => {
            table.force_no_tty();
        }
        _ => {}
    }
    table
}

/// Table cell for a severity label, colored like the dashboard palette
pub fn severity_cell(severity: Severity, label: &str) -> Cell {
    let color = match severity {
        Severity::Minor => Color::Rgb { r: 0xf5, g: 0x9e, b: 0x0b },
        Severity::Major => Color::Rgb { r: 0x63, g: 0x66, b: 0xf1 },
        Severity::Critical => Color::Rgb { r: 0xef, g: 0x44, b: 0x44 },
        Severity::None | Severity::Unknown => Color::Grey,
    };
    Cell::new(format!("{} {}", severity.icon(), label.to_uppercase())).fg(color)
}

/// Text bar of `width` cells filled to `pct` percent
pub fn bar(pct: f64, width: usize) -> String {
    let pct = if pct.is_finite() { pct.clamp(0.0, 100.0) } else { 0.0 };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = ((pct / 100.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled.min(width)))
}

/// Optional value or a dash
pub fn or_dash<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
