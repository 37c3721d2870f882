//! Init command - validates configuration and creates the collection.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use satchel_config::RotationPolicy;
use serde::Serialize;

use super::Context;

/// Arguments for the init command.
#[derive(Args, Debug)]
pub struct InitArgs {}

#[derive(Debug, Serialize)]
struct InitOutput {
    collection: String,
    database: String,
    path: String,
    cookie_name: String,
    gc_probability: u8,
    expiration_secs: u64,
    rotation: String,
    match_ip: bool,
    match_ua: bool,
}

/// Run the init command.
pub async fn run(_args: InitArgs, ctx: &Context) -> Result<()> {
    let output = ctx
        .with_driver(|driver| {
            driver.store().ensure_collection()?;
            let config = driver.config();
            Ok(InitOutput {
                collection: config.collection.clone(),
                database: config.database.clone(),
                path: config.database_path.clone(),
                cookie_name: config.cookie_name.clone(),
                gc_probability: config.gc_probability,
                expiration_secs: config.expiration_time.as_secs(),
                rotation: describe_rotation(config.rotation),
                match_ip: config.match_ip,
                match_ua: config.match_ua,
            })
        })
        .await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let green = Style::new().green();
    let dim = Style::new().dim();

    println!();
    println!("{}", style("Session store ready").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!("  {} {}", dim.apply_to("Collection:"), green.apply_to(&output.collection));
    println!("  {} {} ({})", dim.apply_to("Database:"), output.database, output.path);
    println!("  {} {}", dim.apply_to("Cookie:"), output.cookie_name);
    println!("  {} {}s", dim.apply_to("Expiration:"), output.expiration_secs);
    println!("  {} {}%", dim.apply_to("GC chance:"), output.gc_probability);
    println!("  {} {}", dim.apply_to("Rotation:"), output.rotation);
    println!(
        "  {} ip={} ua={}",
        dim.apply_to("Fingerprint:"),
        output.match_ip,
        output.match_ua
    );
    println!();

    Ok(())
}

fn describe_rotation(policy: RotationPolicy) -> String {
    match policy {
        RotationPolicy::Never => "never".to_string(),
        RotationPolicy::EveryWrite => "every write".to_string(),
        RotationPolicy::Interval(every) => format!("every {}s", every.as_secs()),
    }
}
