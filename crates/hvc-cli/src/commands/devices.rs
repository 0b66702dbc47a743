//! Known-device store commands.

use hvc_core::discover;

use crate::cli::{DevicesArgs, DevicesCommands};
use crate::commands::Context;
use crate::error::CliError;
use crate::output::{get_formatter, DeviceSummary};
use crate::storage::KnownDevice;
use crate::target::resolve_address;

/// Run a devices subcommand
pub async fn run_devices(args: DevicesArgs, ctx: &Context) -> Result<(), CliError> {
    let formatter = get_formatter(ctx.json);
    let store = ctx.store()?;

    match args.command {
        DevicesCommands::List => {
            let devices = store.list().await?;
            println!("{}", formatter.format_known_devices(&devices));
        }
        DevicesCommands::Add(add) => {
            let address = resolve_address(&add.address, ctx.port).await?;
            let found = discover(address, &ctx.discovery_options()).await?;
            if found.is_empty() {
                return Err(CliError::NoDevicesFound);
            }

            let mut added = Vec::new();
            for (_, mut session) in found {
                store.save(&KnownDevice::from_session(&session)).await?;
                added.push(DeviceSummary::from_session(&session));
                session.close();
            }
            added.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));

            println!("{}", formatter.format_devices(&added));
        }
        DevicesCommands::Remove(remove) => {
            store.delete(&remove.unique_id).await?;
            println!(
                "{}",
                formatter.format_message(&format!("Removed {}", remove.unique_id))
            );
        }
    }

    Ok(())
}
