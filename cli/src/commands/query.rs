use anyhow::{Context, Result};
use colored::Colorize;
use council_sdk::{FilterValue, Filters, QueryOptions, Value};

use super::{settle, Session};
use crate::config::CouncilConfig;
use crate::ui::{self, symbols};

pub fn resources(config: &CouncilConfig, json: bool) -> Result<()> {
    let descriptors = config.registry().descriptors();

    if json {
        let listing: Vec<Value> = descriptors
            .iter()
            .map(|d| {
                serde_json::json!({
                    "name": d.resource_name,
                    "listPath": d.list_path,
                    "detailPath": d.detail_path,
                    "idParam": d.id_param_name,
                    "mutable": d.mutable,
                })
            })
            .collect();
        return ui::print_json(&Value::Array(listing));
    }

    ui::print_section(&format!("Resources ({})", descriptors.len()));
    let width = descriptors
        .iter()
        .map(|d| d.resource_name.len())
        .max()
        .unwrap_or(0);
    for descriptor in &descriptors {
        let marker = if descriptor.mutable {
            symbols::WRITABLE.green()
        } else {
            symbols::READ_ONLY.dimmed()
        };
        println!(
            "  {} {:width$}  {}",
            marker,
            descriptor.resource_name,
            descriptor.list_path.dimmed(),
            width = width
        );
    }
    println!();
    ui::print_info(&format!(
        "{} accepts create/update/delete   {} read-only",
        symbols::WRITABLE,
        symbols::READ_ONLY
    ));
    if let Some(base_url) = &config.base_url {
        ui::print_info(&format!("Base URL: {}", base_url));
    }

    Ok(())
}

pub async fn list(session: &Session, resource: &str, raw_filters: &[String]) -> Result<()> {
    let filters = parse_filters(raw_filters)?;

    let spinner = (!session.json).then(|| ui::create_spinner(&format!("Loading {}...", resource)));
    let result = session
        .client
        .list_raw(resource, &filters, QueryOptions::new())
        .await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let payload = settle(result)?.unwrap_or(Value::Null);
    let records = match payload {
        Value::Array(records) => records,
        Value::Null => Vec::new(),
        other => anyhow::bail!("Expected a list from {}, got: {}", resource, other),
    };

    if session.json {
        return ui::print_json(&Value::Array(records));
    }

    if records.is_empty() {
        ui::print_info(&format!("No {} found", resource));
        return Ok(());
    }
    ui::print_section(&format!("{} ({})", resource, records.len()));
    ui::print_records(&records);

    Ok(())
}

pub async fn get(session: &Session, resource: &str, id: &str) -> Result<()> {
    let id = FilterValue::parse(id);
    if id.is_falsy() {
        anyhow::bail!("A record id is required (got '{}')", id);
    }

    let result = session
        .client
        .get_by_id_raw(resource, id.clone(), QueryOptions::new())
        .await;

    match settle(result)? {
        Some(Value::Null) | None => anyhow::bail!("No {} record with id {}", resource, id),
        Some(record) if session.json => ui::print_json(&record),
        Some(record) => {
            ui::print_section(&format!("{} {}", resource, ui::record_line(&record)));
            ui::print_record(&record);
            Ok(())
        }
    }
}

/// Parses repeated `-f key=value` arguments. Values are typed the way the
/// backend expects: booleans and numbers unquoted, everything else text.
/// `key=` leaves the filter unset.
pub fn parse_filters(raw: &[String]) -> Result<Filters> {
    let mut filters = Filters::new();
    for entry in raw {
        let (key, value) = entry
            .split_once('=')
            .with_context(|| format!("Filter '{}' must look like key=value", entry))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("Filter '{}' has an empty key", entry);
        }
        filters.insert(key, FilterValue::parse(value.trim()));
    }
    Ok(filters)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_filters() {
        let filters = parse_filters(&args(&[
            "DepartmentId=3",
            "Active=true",
            "Search=budget review",
            "Status=",
        ]))
        .unwrap()
        .normalize();

        assert_eq!(filters.get("DepartmentId"), Some(&FilterValue::Integer(3)));
        assert_eq!(filters.get("Active"), Some(&FilterValue::Bool(true)));
        assert_eq!(
            filters.get("Search"),
            Some(&FilterValue::Text("budget review".to_string()))
        );
        assert!(!filters.contains_key("Status"));
    }

    #[test]
    fn test_later_filter_wins() {
        let filters = parse_filters(&args(&["Page=1", "Page=2"]))
            .unwrap()
            .normalize();
        assert_eq!(filters.get("Page"), Some(&FilterValue::Integer(2)));
    }

    #[test]
    fn test_malformed_filters_rejected() {
        assert!(parse_filters(&args(&["DepartmentId"])).is_err());
        assert!(parse_filters(&args(&["=3"])).is_err());
    }
}
