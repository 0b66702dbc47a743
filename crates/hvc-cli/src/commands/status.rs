//! Status command implementation.

use hvc_core::protocol::Reading;

use crate::cli::StatusArgs;
use crate::commands::Context;
use crate::error::CliError;
use crate::output::{get_formatter, DeviceSummary};
use crate::target::{connect, resolve};

/// Run the status command
pub async fn run_status(args: StatusArgs, ctx: &Context) -> Result<(), CliError> {
    let formatter = get_formatter(ctx.json);
    let target = resolve(&args.target, ctx).await?;
    let mut registry = connect(&target, ctx).await?;

    for session in registry.iter() {
        let summary = DeviceSummary::from_session(session);

        let output = if args.raw {
            formatter.format_document(&summary, session.document().as_value())
        } else {
            let readings: Vec<Reading> = Reading::from_document(session.document())
                .into_iter()
                .filter(|reading| args.all_fields || reading.enabled_by_default)
                .collect();
            formatter.format_readings(&summary, &readings)
        };

        println!("{}\n", output);
    }

    registry.close_all();
    Ok(())
}
