//! Send command implementation.

use serde_json::Value;

use hvc_core::{Command, DeviceSession};

use crate::cli::SendArgs;
use crate::commands::Context;
use crate::error::CliError;
use crate::output::{get_formatter, OutputFormatter};
use crate::target::{connect, resolve};

/// Run the send command
pub async fn run_send(args: SendArgs, ctx: &Context) -> Result<(), CliError> {
    let formatter = get_formatter(ctx.json);
    let command = parse_command(&args.command)?;

    let target = resolve(&args.target, ctx).await?;
    let mut registry = connect(&target, ctx).await?;

    let mut first_error = None;
    for session in registry.iter_mut() {
        if let Err(e) = send_one(session, &command, args.wait, ctx, formatter.as_ref()).await {
            first_error.get_or_insert(e);
        }
    }

    registry.close_all();
    first_error.map_or(Ok(()), Err)
}

async fn send_one(
    session: &mut DeviceSession,
    command: &Command,
    wait: bool,
    ctx: &Context,
    formatter: &dyn OutputFormatter,
) -> Result<(), CliError> {
    let shown = Value::Object(command.clone());
    let outcome = async {
        session.send(command)?;
        if wait {
            session.receive_blocking(ctx.timeout).await?;
        }
        Ok::<_, CliError>(())
    }
    .await;

    let message = match &outcome {
        Ok(()) if wait => "Device pushed an updated document".to_string(),
        Ok(()) => "Sent".to_string(),
        Err(e) => e.to_string(),
    };
    println!(
        "{}",
        formatter.format_command_result(session.unique_id(), &shown, outcome.is_ok(), &message)
    );

    outcome
}

/// Parse a command argument, which must be a JSON object.
pub fn parse_command(raw: &str) -> Result<Command, CliError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(command)) => Ok(command),
        Ok(_) => Err(CliError::InvalidArgument(
            "Command must be a JSON object".to_string(),
        )),
        Err(e) => Err(CliError::InvalidArgument(format!(
            "Command is not valid JSON: {}",
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        let command = parse_command(r#"{"0":{"wifi_0":-20,"wifi_time":3600}}"#).unwrap();
        assert_eq!(command["0"]["wifi_0"], -20);

        assert!(matches!(
            parse_command("[1,2]"),
            Err(CliError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_command("{not json"),
            Err(CliError::InvalidArgument(_))
        ));
    }
}
