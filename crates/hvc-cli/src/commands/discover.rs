//! Discover command implementation.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use hvc_core::{discover_all, SessionRegistry};

use crate::cli::DiscoverArgs;
use crate::commands::Context;
use crate::error::CliError;
use crate::output::{get_formatter, DeviceSummary};
use crate::storage::KnownDevice;

/// Run the discover command
pub async fn run_discover(args: DiscoverArgs, ctx: &Context) -> Result<(), CliError> {
    let formatter = get_formatter(ctx.json);
    let options = ctx
        .discovery_options()
        .with_grace(Duration::from_millis(args.grace));

    let spinner = (!ctx.json).then(|| {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!(
            "Discovering on {} address(es)...",
            ctx.broadcast.len()
        ));
        pb
    });

    let mut registry = SessionRegistry::new();
    let result = discover_all(&ctx.broadcast_addresses(), &options, &mut registry).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    result?;

    let devices: Vec<DeviceSummary> = registry.iter().map(DeviceSummary::from_session).collect();
    println!("{}", formatter.format_devices(&devices));

    if args.save && !registry.is_empty() {
        let store = ctx.store()?;
        for session in registry.iter() {
            store.save(&KnownDevice::from_session(session)).await?;
        }
        if !ctx.json {
            println!("Saved {} device(s)", registry.len());
        }
    }

    let found = !registry.is_empty();
    registry.close_all();

    if !found {
        return Err(CliError::NoDevicesFound);
    }

    Ok(())
}
