//! Fan command implementation.

use serde_json::Value;
use tracing::warn;

use hvc_core::protocol::{Fan, FanAdjustment};

use crate::cli::FanArgs;
use crate::commands::Context;
use crate::error::CliError;
use crate::output::get_formatter;
use crate::target::{connect, resolve};

/// Run the fan command
pub async fn run_fan(args: FanArgs, ctx: &Context) -> Result<(), CliError> {
    let formatter = get_formatter(ctx.json);
    let adjustment = parse_adjustment(&args.fan, args.percent)?;
    let command = adjustment.to_command();
    let shown = Value::Object(command.clone());

    let target = resolve(&args.target, ctx).await?;
    let mut registry = connect(&target, ctx).await?;

    let mut first_error = None;
    for session in registry.iter_mut() {
        if let Err(e) = session.send(&command) {
            println!(
                "{}",
                formatter.format_command_result(session.unique_id(), &shown, false, &e.to_string())
            );
            first_error.get_or_insert(CliError::from(e));
            continue;
        }

        let message = match session.receive_blocking(ctx.timeout).await {
            Ok(()) => match FanAdjustment::current(session.document(), adjustment.fan()) {
                Some(current) => format!("{} now at {:+}%", adjustment.fan().label(), current),
                None => format!("{} uses a custom curve", adjustment.fan().label()),
            },
            Err(e) if e.is_timeout() => {
                warn!(unique_id = session.unique_id(), "No confirmation from device");
                "Sent, but the device did not confirm".to_string()
            }
            Err(e) => {
                println!(
                    "{}",
                    formatter.format_command_result(
                        session.unique_id(),
                        &shown,
                        false,
                        &e.to_string()
                    )
                );
                first_error.get_or_insert(CliError::from(e));
                continue;
            }
        };

        println!(
            "{}",
            formatter.format_command_result(session.unique_id(), &shown, true, &message)
        );
    }

    registry.close_all();
    first_error.map_or(Ok(()), Err)
}

fn parse_adjustment(fan: &str, percent: f64) -> Result<FanAdjustment, CliError> {
    let fan = Fan::parse(fan).ok_or_else(|| {
        CliError::InvalidArgument(format!("Unknown fan '{}', use 0/main or 1/hood", fan))
    })?;

    let range = FanAdjustment::MIN as f64..=FanAdjustment::MAX as f64;
    if !range.contains(&percent) {
        return Err(CliError::InvalidArgument(format!(
            "Percent must be between {} and {}",
            FanAdjustment::MIN,
            FanAdjustment::MAX
        )));
    }

    Ok(FanAdjustment::new(fan, percent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_adjustment() {
        let adjustment = parse_adjustment("hood", -35.0).unwrap();
        assert_eq!(adjustment.fan(), Fan::KitchenHood);
        assert_eq!(adjustment.percent(), -35);

        assert!(matches!(
            parse_adjustment("attic", 10.0),
            Err(CliError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_adjustment("0", 150.0),
            Err(CliError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_adjustment("0", f64::NAN),
            Err(CliError::InvalidArgument(_))
        ));
    }
}
