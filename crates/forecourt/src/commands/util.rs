//! Shared helpers for command handlers.

use std::io::IsTerminal;

use forecourt_core::CoreError;

use crate::config::ResolvedSetup;
use crate::error::CliError;

/// Station identity and endpoint context carried into every handler,
/// kept separate from the store which the resolver consumes.
pub struct CommandContext {
    pub station_id: String,
    pub endpoint_label: String,
    pub login: String,
}

impl CommandContext {
    pub fn new(setup: &ResolvedSetup) -> Self {
        Self {
            station_id: setup.station_id.clone(),
            endpoint_label: format!("{}:{}", setup.endpoint.host, setup.endpoint.port),
            login: setup.endpoint.login.clone(),
        }
    }

    /// Map a core error into a CLI error, threading in endpoint context
    /// for device failures.
    pub fn map_core(&self, err: CoreError) -> CliError {
        match err {
            CoreError::Device(device) => {
                CliError::from_device(&self.endpoint_label, &self.login, device)
            }
            other => other.into(),
        }
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so the command fails with
/// a pointer to `--yes` rather than hanging.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::ConfirmationRequired {
            action: message.to_owned(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}
