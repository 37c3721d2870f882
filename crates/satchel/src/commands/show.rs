//! Show command - resolves a token and prints the stored session.

use anyhow::{Result, bail};
use clap::Args;
use console::{Style, style};
use satchel_session::{Map, codec, validate::is_expired};
use satchel_store::{LookupField, SessionKeys};
use serde::Serialize;

use super::Context;

/// Arguments for the show command.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Current or previous session token
    pub token: String,
}

#[derive(Debug, Serialize)]
struct ShowOutput {
    #[serde(flatten)]
    keys: SessionKeys,
    resolved_via: &'static str,
    expired: bool,
    data: Map,
    flash: Map,
}

/// Run the show command.
pub async fn run(args: ShowArgs, ctx: &Context) -> Result<()> {
    let (output, field) = ctx
        .with_driver(move |driver| {
            let store = driver.store();
            let (record, field) = match store.find_one_by(LookupField::SessionId, &args.token)? {
                Some(record) => (record, LookupField::SessionId),
                None => match store.find_one_by(LookupField::PreviousId, &args.token)? {
                    Some(record) => (record, LookupField::PreviousId),
                    None => bail!("No session found for token {}", args.token),
                },
            };

            let (data, flash) = codec::decode(&record.payload)?;
            let output = ShowOutput {
                expired: is_expired(record.updated, driver.config().expiration_time, driver.now()),
                keys: record.keys(),
                resolved_via: field.column(),
                data,
                flash,
            };
            Ok((output, field))
        })
        .await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let status = if output.expired {
        Style::new().red().apply_to("expired")
    } else {
        Style::new().green().apply_to("active")
    };

    println!();
    println!("{}", style(&output.keys.session_id).bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!("  {} {}", dim.apply_to("Status:"), status);
    if field == LookupField::PreviousId {
        println!("  {} via previous token", dim.apply_to("Resolved:"));
    }
    println!("  {} {}", dim.apply_to("Previous:"), output.keys.previous_id);
    println!("  {} {}", dim.apply_to("Created:"), output.keys.created.to_rfc3339());
    println!("  {} {}", dim.apply_to("Updated:"), output.keys.updated.to_rfc3339());
    println!("  {} {}", dim.apply_to("User agent:"), output.keys.user_agent);
    if ctx.verbose {
        println!("  {} {}", dim.apply_to("IP hash:"), output.keys.ip_hash);
    }
    println!();
    println!("  {} {} key(s)", dim.apply_to("Data:"), output.data.len());
    for (key, value) in &output.data {
        println!("    {key} = {value}");
    }
    println!("  {} {} key(s)", dim.apply_to("Flash:"), output.flash.len());
    for (key, value) in &output.flash {
        println!("    {key} = {value}");
    }
    println!();

    Ok(())
}
