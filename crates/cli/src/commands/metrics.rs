//! Metric-related CLI commands

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, MetricDetail};
use crate::output::{format_age, format_percent, print_json, print_table, OutputFormat};

/// Row for the metric list table
#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Name")]
    name: String,
}

/// Row for the history table
#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Observed")]
    observed_at: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Age")]
    age: String,
}

/// List every tracked metric
pub async fn list_metrics(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.list_metrics().await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let rows: Vec<MetricRow> = result
                .metrics
                .into_iter()
                .map(|m| MetricRow {
                    key: m.key,
                    name: m.name,
                })
                .collect();
            print_table(&rows);
            println!("\nTotal: {} metrics", result.total);
        }
    }

    Ok(())
}

/// Describe the position of a metric relative to its thresholds
fn describe(detail: &MetricDetail) -> String {
    match (detail.kind.as_str(), detail.baseline) {
        ("ratio", _) => format!("{} of cap used", format_percent(detail.value, 4)),
        // Rate moves are absolute, in percentage points
        (_, Some(baseline)) => {
            format!("{:+.2}pp vs baseline", (detail.value - baseline) * 100.0)
        }
        (_, None) => "no baseline yet".to_string(),
    }
}

/// Show the current value of one metric
pub async fn check_metric(client: &ApiClient, key: &str, format: OutputFormat) -> Result<()> {
    let detail = client.metric(key).await?;

    match format {
        OutputFormat::Json => print_json(&detail)?,
        OutputFormat::Table => {
            println!("{}", detail.name.bold());
            println!("{}", "=".repeat(50));
            println!("Key:       {}", detail.key.cyan());
            println!("Kind:      {} ({})", detail.kind, detail.unit);
            println!("Value:     {}", format_percent(detail.value, 4));
            if let Some(baseline) = detail.baseline {
                println!("Baseline:  {}", format_percent(baseline, 4));
            }
            println!("Status:    {}", describe(&detail));
            println!(
                "Updated:   {} ({} ago)",
                detail.updated_at.to_rfc3339(),
                format_age(detail.updated_at, Utc::now())
            );
        }
    }

    Ok(())
}

/// Show recent recorded values of one metric
pub async fn show_history(
    client: &ApiClient,
    key: &str,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let history = client.history(key, limit).await?;

    match format {
        OutputFormat::Json => print_json(&history)?,
        OutputFormat::Table => {
            println!("History for {}", history.key.cyan());
            let now = Utc::now();
            let rows: Vec<HistoryRow> = history
                .entries
                .iter()
                .map(|e| HistoryRow {
                    observed_at: e.observed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    value: format_percent(e.value, 4),
                    age: format_age(e.observed_at, now),
                })
                .collect();
            print_table(&rows);
        }
    }

    Ok(())
}
