//! Pump control handlers: authorize, stop, emergency stop, clear.
//!
//! Every handler here commands physical equipment, so destructive
//! operations confirm first and device failures are always hard errors.

use forecourt_core::{MemoryStore, StatusResolver};
use forecourt_pts::AuthorizeKind;

use crate::cli::{AuthorizeArgs, GlobalOpts};
use crate::error::CliError;

use super::util::{self, CommandContext};

pub async fn authorize(
    resolver: &StatusResolver<MemoryStore>,
    context: &CommandContext,
    args: AuthorizeArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (kind, value) = match (args.volume, args.amount) {
        (Some(v), None) => (AuthorizeKind::Volume, v),
        (None, Some(a)) => (AuthorizeKind::Amount, a),
        _ => {
            return Err(CliError::Validation {
                field: "preset".into(),
                reason: "exactly one of --volume or --amount is required".into(),
            });
        }
    };
    if value <= 0.0 {
        return Err(CliError::Validation {
            field: "preset".into(),
            reason: format!("preset value must be positive, got {value}"),
        });
    }

    let unit = match kind {
        AuthorizeKind::Volume => "L",
        AuthorizeKind::Amount => "",
    };
    let prompt = format!("Authorize hose {} for {value}{unit}?", args.hose);
    if !util::confirm(&prompt, global.yes)? {
        return Ok(());
    }

    let client = resolver
        .connect(&context.station_id)
        .await
        .map_err(|e| context.map_core(e))?;
    client
        .authorize_hose(args.hose, kind, value)
        .await
        .map_err(|e| CliError::from_device(&context.endpoint_label, &context.login, e))?;

    if !global.quiet {
        eprintln!("Hose {} authorized", args.hose);
    }
    Ok(())
}

pub async fn stop(
    resolver: &StatusResolver<MemoryStore>,
    context: &CommandContext,
    hose: u32,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if !util::confirm(&format!("Stop delivery on hose {hose}?"), global.yes)? {
        return Ok(());
    }

    let client = resolver
        .connect(&context.station_id)
        .await
        .map_err(|e| context.map_core(e))?;
    client
        .stop_delivery(hose)
        .await
        .map_err(|e| CliError::from_device(&context.endpoint_label, &context.login, e))?;

    if !global.quiet {
        eprintln!("Hose {hose} stopped");
    }
    Ok(())
}

pub async fn emergency_stop(
    resolver: &StatusResolver<MemoryStore>,
    context: &CommandContext,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if !util::confirm("EMERGENCY STOP all pumps?", global.yes)? {
        return Ok(());
    }

    let client = resolver
        .connect(&context.station_id)
        .await
        .map_err(|e| context.map_core(e))?;
    client
        .emergency_stop()
        .await
        .map_err(|e| CliError::from_device(&context.endpoint_label, &context.login, e))?;

    if !global.quiet {
        eprintln!("Emergency stop issued");
    }
    Ok(())
}

pub async fn clear(
    resolver: &StatusResolver<MemoryStore>,
    context: &CommandContext,
    hose: u32,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = resolver
        .connect(&context.station_id)
        .await
        .map_err(|e| context.map_core(e))?;
    client
        .clear_delivery(hose)
        .await
        .map_err(|e| CliError::from_device(&context.endpoint_label, &context.login, e))?;

    if !global.quiet {
        eprintln!("Hose {hose} cleared");
    }
    Ok(())
}
