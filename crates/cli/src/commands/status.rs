//! Watcher status and connectivity commands

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_status, format_age, format_duration, format_percent, print_error, print_json,
    print_success, print_table, print_warning, OutputFormat,
};

/// Row for the component health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show scheduler progress and overall health
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status = client.status().await?;

    match format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Table => {
            let now = Utc::now();
            println!("{}", "Watcher Status".bold());
            println!("{}", "=".repeat(50));
            println!("Health:            {}", color_status(&status.health));
            println!("Uptime:            {}", format_duration(status.uptime_secs));
            println!("Passes completed:  {}", status.passes_completed);
            println!("Passes failed:     {}", status.passes_failed);
            match status.last_run_at {
                Some(at) => println!(
                    "Last pass:         {} ago ({} alerts)",
                    format_age(at, now),
                    status.last_alert_count
                ),
                None => println!("Last pass:         {}", "never".yellow()),
            }
            if let (Some(at), Some(err)) = (status.last_error_at, &status.last_error) {
                println!();
                print_warning(&format!("Last error {} ago: {}", format_age(at, now), err));
            }
        }
    }

    Ok(())
}

/// Show the thresholds and sources the watcher runs with
pub async fn show_info(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let info = client.info().await?;

    match format {
        OutputFormat::Json => print_json(&info)?,
        OutputFormat::Table => {
            println!("{}", "Watcher Configuration".bold());
            println!("{}", "=".repeat(50));
            println!("Version:           {}", info.version);
            println!("Pass interval:     {}", format_duration(info.interval_secs as i64));
            println!("Cap policy:        {}", info.cap_policy.cyan());
            println!("  full at:         {}", format_percent(info.cap_full_threshold, 3));
            println!("  clear below:     {}", format_percent(info.cap_clear_threshold, 3));
            println!("Rate changes:");
            println!("  minor:           {}", format_percent(info.rate_minor_change, 2));
            println!("  major:           {}", format_percent(info.rate_major_change, 2));
            println!("Sources:           {}", info.sources.join(", "));
        }
    }

    Ok(())
}

/// Check that the watcher is reachable and report component health
pub async fn ping(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            let mut rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, c)| ComponentRow {
                    name: name.clone(),
                    status: color_status(&c.status),
                    message: c.message.clone().unwrap_or_default(),
                })
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            print_table(&rows);

            if health.status == "unhealthy" {
                print_error(&format!("Watcher is {}", health.status));
            } else {
                print_success(&format!("Watcher is {}", color_status(&health.status)));
            }
        }
    }

    if health.status == "unhealthy" {
        anyhow::bail!("watcher reported unhealthy");
    }
    Ok(())
}
