//! Destroy command - deletes one session record.

use anyhow::{Result, bail};
use clap::Args;
use satchel_store::LookupField;
use serde::Serialize;
use tracing::info;

use super::Context;

/// Arguments for the destroy command.
#[derive(Args, Debug)]
pub struct DestroyArgs {
    /// Session id to delete
    pub session_id: String,
}

#[derive(Debug, Serialize)]
struct DestroyOutput {
    session_id: String,
    deleted: usize,
}

/// Run the destroy command.
pub async fn run(args: DestroyArgs, ctx: &Context) -> Result<()> {
    let session_id = args.session_id.clone();
    let deleted = ctx
        .with_driver(move |driver| {
            Ok(driver.store().delete_by(LookupField::SessionId, &session_id)?)
        })
        .await?;
    if deleted == 0 {
        bail!("No session with id {}", args.session_id);
    }
    info!(session_id = %args.session_id, "Session destroyed");

    if ctx.json_output {
        let output = DestroyOutput {
            session_id: args.session_id,
            deleted,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Destroyed session {}", args.session_id);
    }
    Ok(())
}
