//! List command - most recently active sessions.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use satchel_session::validate::is_expired;
use serde::Serialize;

use super::Context;

/// Arguments for the list command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Maximum number of sessions to show
    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
struct ListEntry {
    session_id: String,
    previous_id: String,
    user_agent: String,
    updated: String,
    expired: bool,
}

/// Run the list command.
pub async fn run(args: ListArgs, ctx: &Context) -> Result<()> {
    let limit = args.limit;
    let entries: Vec<ListEntry> = ctx
        .with_driver(move |driver| {
            let now = driver.now();
            let expiration = driver.config().expiration_time;
            let records = driver.store().list(limit)?;
            Ok(records
                .into_iter()
                .map(|r| ListEntry {
                    expired: is_expired(r.updated, expiration, now),
                    updated: r.updated.to_rfc3339(),
                    session_id: r.session_id,
                    previous_id: r.previous_id,
                    user_agent: r.user_agent,
                })
                .collect())
        })
        .await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    if entries.is_empty() {
        println!("{}", dim.apply_to("No sessions."));
        return Ok(());
    }

    println!();
    println!("{}", style(format!("{} session(s)", entries.len())).bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    for entry in &entries {
        let marker = if entry.expired {
            Style::new().red().apply_to("●")
        } else {
            Style::new().green().apply_to("●")
        };
        println!(
            "  {} {} {}",
            marker,
            entry.session_id,
            dim.apply_to(format!("{}  {}", entry.updated, entry.user_agent))
        );
    }
    println!();

    Ok(())
}
