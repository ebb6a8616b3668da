//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use predictor_lib::predictor::{ConfidenceBand, PredictionView};
use predictor_lib::AttendanceLabel;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items),
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => print_error(&format!("Failed to serialize output: {}", e)),
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Color the headline by predicted label
pub fn color_headline(view: &PredictionView) -> String {
    match view.label {
        AttendanceLabel::Attend => view.headline.green().bold().to_string(),
        AttendanceLabel::NotAttend => view.headline.red().bold().to_string(),
    }
}

/// Color the probability by confidence band
pub fn color_probability(view: &PredictionView) -> String {
    match view.confidence_band {
        ConfidenceBand::High => view.probability_percent.green().to_string(),
        ConfidenceBand::Low => view.probability_percent.yellow().to_string(),
    }
}

/// Format an importance weight as a share of the total
pub fn format_importance(importance: f32) -> String {
    format!("{:.1}%", importance * 100.0)
}
