//! Config subcommand handlers: show, profiles, path.
//!
//! These never touch a controller.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => show(global),
        ConfigCommand::Profiles => profiles(global),
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }
    }
}

fn show(global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::load_config_or_default();

    // Never print stored passwords.
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some("<redacted>".into());
        }
    }

    let rendered = toml::to_string_pretty(&cfg).map_err(|e| CliError::Validation {
        field: "config".into(),
        reason: e.to_string(),
    })?;

    if !global.quiet {
        print!("{rendered}");
    }
    Ok(())
}

fn profiles(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let default = cfg.default_profile.as_deref().unwrap_or("default");

    let mut names: Vec<&String> = cfg.profiles.keys().collect();
    names.sort_unstable();

    if global.quiet {
        return Ok(());
    }

    if names.is_empty() {
        println!("no profiles configured ({})", config::config_path().display());
        return Ok(());
    }

    for name in names {
        let profile = &cfg.profiles[name];
        let endpoint = match (&profile.host, profile.port) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.clone(),
            _ => "(no controller)".into(),
        };
        let marker = if name == default { "*" } else { " " };
        println!("{marker} {name:<20} {endpoint}");
    }
    Ok(())
}
