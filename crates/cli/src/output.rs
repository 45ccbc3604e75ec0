//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
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

#[derive(Tabled, Serialize)]
struct InsightRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Insight")]
    insight: String,
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
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print insights as `{"insights": [...]}` or a numbered table
pub fn print_insights<S: AsRef<str>>(insights: &[S], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let texts: Vec<&str> = insights.iter().map(|s| s.as_ref()).collect();
            let body = serde_json::json!({ "insights": texts });
            if let Ok(json) = serde_json::to_string_pretty(&body) {
                println!("{}", json);
            }
        }
        OutputFormat::Table => {
            let rows: Vec<InsightRow> = insights
                .iter()
                .enumerate()
                .map(|(i, text)| InsightRow {
                    index: i + 1,
                    insight: text.as_ref().to_string(),
                })
                .collect();
            print_table(&rows, format);
        }
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

/// Color a health or report status
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "scored" => status.green().to_string(),
        "degraded" | "no_model" | "no_data" | "insufficient_features" => {
            status.yellow().to_string()
        }
        "unhealthy" | "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}
