//! Stats command - shows session counts.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use super::Context;

/// Arguments for the stats command.
#[derive(Args, Debug)]
pub struct StatsArgs {}

#[derive(Debug, Serialize)]
struct StatsOutput {
    collection: String,
    total: usize,
    expired: usize,
    active: usize,
}

/// Run the stats command.
pub async fn run(_args: StatsArgs, ctx: &Context) -> Result<()> {
    let output = ctx
        .with_driver(|driver| {
            let store = driver.store();
            let total = store.count()?;
            let expired = store.count_updated_before(driver.gc().threshold(driver.now()))?;
            Ok(StatsOutput {
                collection: driver.config().collection.clone(),
                total,
                expired,
                active: total.saturating_sub(expired),
            })
        })
        .await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let yellow = Style::new().yellow();

    println!();
    println!("{}", style(format!("Sessions in {}", output.collection)).bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!("  {} {}", dim.apply_to("Total:"), output.total);
    println!("  {} {}", dim.apply_to("Active:"), output.active);
    println!("  {} {}", dim.apply_to("Expired:"), yellow.apply_to(output.expired));
    if output.expired > 0 {
        println!();
        println!("  {}", dim.apply_to("Remove them with: satchel sweep"));
    }
    println!();

    Ok(())
}
