//! Get command implementation.

use crate::cli::GetArgs;
use crate::commands::Context;
use crate::error::CliError;
use crate::output::get_formatter;
use crate::target::{connect, resolve, Target};

/// Run the get command
pub async fn run_get(args: GetArgs, ctx: &Context) -> Result<(), CliError> {
    let formatter = get_formatter(ctx.json);
    let target = resolve(&args.target, ctx).await?;
    if target == Target::All {
        return Err(CliError::InvalidArgument(
            "get needs a single device, not 'all'".to_string(),
        ));
    }

    let mut registry = connect(&target, ctx).await?;

    let mut result = Ok(());
    for session in registry.iter() {
        match session.get(&args.path) {
            Some(value) => {
                println!(
                    "{}",
                    formatter.format_value(session.unique_id(), &args.path, value)
                );
            }
            None => {
                result = Err(CliError::PathNotFound(args.path.clone()));
            }
        }
    }

    registry.close_all();
    result
}
