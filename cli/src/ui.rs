//! Shared UI utilities for consistent terminal output.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::time::Duration;

/// Standard symbols used throughout the CLI for consistent visual language.
pub mod symbols {
    pub const ARROW: &str = "→";
    pub const SUCCESS: &str = "✓";
    pub const FAILURE: &str = "✗";
    pub const WARNING: &str = "!";
    pub const BULLET: &str = "•";
    /// Marks resources that accept create/update/delete
    pub const WRITABLE: &str = "●";
    pub const READ_ONLY: &str = "○";
}

pub fn print_step(message: &str) {
    println!("{} {}", symbols::ARROW.blue().bold(), message);
}

pub fn print_success(message: &str) {
    println!("{} {}", symbols::SUCCESS.green().bold(), message);
}

pub fn print_error(message: &str) {
    println!("{} {}", symbols::FAILURE.red().bold(), message);
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", symbols::WARNING.yellow().bold(), message);
}

/// Print a dimmed info line (indented).
pub fn print_info(message: &str) {
    println!("  {}", message.dimmed());
}

pub fn print_section(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(50).dimmed());
}

/// Spinner shown while a request is in flight. Hidden when stdout is not a
/// terminal.
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

pub fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One-line summary of a record: `#id name`, falling back to compact JSON.
pub fn record_line(record: &Value) -> String {
    let id = record.get("id").filter(|v| !v.is_null()).map(scalar_text);
    let label = ["name", "title", "fullName", "description"]
        .iter()
        .find_map(|field| record.get(*field).and_then(Value::as_str))
        .filter(|s| !s.is_empty());

    match (id, label) {
        (Some(id), Some(label)) => format!("#{} {}", id, label),
        (Some(id), None) => format!("#{} {}", id, record),
        (None, Some(label)) => label.to_string(),
        (None, None) => record.to_string(),
    }
}

pub fn print_records(records: &[Value]) {
    for record in records {
        println!("  {} {}", symbols::BULLET.dimmed(), record_line(record));
    }
}

/// Prints every field of a record, one per line.
pub fn print_record(record: &Value) {
    match record.as_object() {
        Some(fields) => {
            let width = fields.keys().map(String::len).max().unwrap_or(0);
            for (key, value) in fields {
                let key = format!("{:width$}", key, width = width);
                println!("  {}  {}", key.bold(), scalar_text(value));
            }
        }
        None => println!("  {}", record),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_line() {
        assert_eq!(record_line(&json!({"id": 3, "name": "Finance"})), "#3 Finance");
        assert_eq!(record_line(&json!({"id": "a1", "title": "Budget"})), "#a1 Budget");
        assert_eq!(record_line(&json!({"name": "Audit"})), "Audit");
        assert_eq!(record_line(&json!({"id": 7})), "#7 {\"id\":7}");
        assert_eq!(record_line(&json!(42)), "42");
    }
}
