use anyhow::{Context, Result};
use council_sdk::{Operation, QueryError, Value};
use std::fs;

use super::Session;
use crate::ui;

pub async fn run(session: &Session, resource: &str, operation: Operation, data: &str) -> Result<()> {
    let payload = read_payload(data)?;

    if !session.json {
        ui::print_step(&format!("Sending {} to {}...", operation, resource));
    }

    let response = match session.client.mutate(resource, operation, payload).await {
        Ok(response) => response,
        Err(QueryError::ReadOnly(name)) => {
            anyhow::bail!("'{}' is read-only; it has no {} endpoint", name, operation)
        }
        Err(e) => {
            if !session.json {
                ui::print_error(&format!("{} failed", operation));
            }
            return Err(e.into());
        }
    };

    if session.json {
        return ui::print_json(&response);
    }

    ui::print_success(&format!("{} {}d", resource, operation));
    if !response.is_null() {
        ui::print_record(&response);
    }

    Ok(())
}

/// `--data` takes inline JSON, or `@path` to read it from a file.
fn read_payload(data: &str) -> Result<Value> {
    let text = match data.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload file: {}", path))?,
        None => data.to_string(),
    };
    serde_json::from_str(&text).context("--data must be valid JSON")
}
