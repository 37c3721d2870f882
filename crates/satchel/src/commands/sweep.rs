//! Sweep command - deletes expired sessions outside the request path.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use console::Style;
use satchel_session::SessionDriver;
use serde::Serialize;
use tracing::{info, warn};

use super::{Context, blocking};

/// Arguments for the sweep command.
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Keep running, sweeping every SECS seconds until interrupted
    #[arg(short, long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,
}

#[derive(Debug, Serialize)]
struct SweepOutput {
    deleted: usize,
    threshold: String,
}

/// Run the sweep command.
pub async fn run(args: SweepArgs, ctx: &Context) -> Result<()> {
    let driver = ctx.open_driver().await?;

    let Some(secs) = args.interval else {
        let output = sweep_once(&driver).await?;
        report(&output, ctx)?;
        return Ok(());
    };

    info!(interval_secs = secs, "Starting scheduled sweep");
    let mut ticker = tokio::time::interval(Duration::from_secs(secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match sweep_once(&driver).await {
                    Ok(output) => report(&output, ctx)?,
                    Err(e) => warn!(error = %e, "Scheduled sweep failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping sweeps");
                break;
            }
        }
    }

    Ok(())
}

async fn sweep_once(driver: &SessionDriver) -> Result<SweepOutput> {
    let driver = driver.clone();
    blocking(move || {
        let now = driver.now();
        let threshold = driver.gc().threshold(now);
        let deleted = driver.gc().sweep(now)?;
        Ok(SweepOutput {
            deleted,
            threshold: threshold.to_rfc3339(),
        })
    })
    .await
}

fn report(output: &SweepOutput, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        println!("{}", serde_json::to_string(output)?);
    } else {
        let dim = Style::new().dim();
        println!(
            "Deleted {} expired session(s) {}",
            output.deleted,
            dim.apply_to(format!("(idle since before {})", output.threshold))
        );
    }
    Ok(())
}
