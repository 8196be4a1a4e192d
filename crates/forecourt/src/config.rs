//! CLI configuration: TOML profiles merged with environment variables.
//!
//! A profile names one controller plus the station metadata and fallback
//! rows that seed the in-memory store. CLI flags override profile values.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use forecourt_core::model::{PricingRow, StationConfigRow, StationRecord, StationStatus, TankRow};
use forecourt_core::MemoryStore;
use forecourt_pts::{ControllerEndpoint, Scheme, TransportConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Named controller profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            profiles: HashMap::new(),
        }
    }
}

/// A named controller profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Controller host (IP or hostname).
    pub host: Option<String>,

    /// Controller port.
    pub port: Option<u16>,

    /// URL scheme, "HTTP" or "HTTPS".
    pub scheme: Option<Scheme>,

    /// Controller login.
    pub login: Option<String>,

    /// Controller password (plaintext — prefer FORECOURT_PASSWORD).
    pub password: Option<String>,

    /// Station identifier shown in output.
    pub station_id: Option<String>,

    /// Station display name.
    pub station_name: Option<String>,

    /// Station address.
    pub station_address: Option<String>,

    /// Fallback tank rows used when the controller is unreachable.
    #[serde(default)]
    pub tanks: Vec<TankRow>,

    /// Fallback pricing rows.
    #[serde(default)]
    pub pricing: Vec<PricingRow>,

    /// Dispense limits and maintenance flag.
    pub station_config: Option<StationConfigRow>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "forecourt", "forecourt").map_or_else(
        || {
            let mut p =
                PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("forecourt");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, CliError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(config_path()))
        .merge(Env::prefixed("FORECOURT_CONFIG_").split("__"));

    Ok(figment.extract()?)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

// ── Resolution into runtime types ───────────────────────────────────

/// Everything a command needs: station identity, seeded store, endpoint,
/// and transport tuning.
pub struct ResolvedSetup {
    pub station_id: String,
    pub store: MemoryStore,
    pub endpoint: ControllerEndpoint,
    pub transport: TransportConfig,
}

/// Resolve profile + CLI flags into a seeded in-memory store and
/// controller endpoint. Flags take priority over profile values.
pub fn resolve(global: &GlobalOpts) -> Result<ResolvedSetup, CliError> {
    let config = load_config_or_default();
    let profile_name = active_profile_name(global, &config);

    // An explicitly requested profile must exist; the implicit default
    // may be absent when flags carry the whole endpoint.
    let profile = match config.profiles.get(&profile_name) {
        Some(p) => p,
        None if global.profile.is_some() => {
            let mut available: Vec<&str> =
                config.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available.join(", "),
            });
        }
        None => &Profile::default(),
    };

    let host = global
        .host
        .clone()
        .or_else(|| profile.host.clone())
        .ok_or_else(|| CliError::NoConfig {
            path: config_path().display().to_string(),
        })?;
    let port = global.port.or(profile.port).unwrap_or(443);
    let scheme = profile.scheme.unwrap_or(Scheme::Https);

    let login = global
        .login
        .clone()
        .or_else(|| profile.login.clone())
        .unwrap_or_else(|| "admin".into());

    let password = global
        .password
        .clone()
        .or_else(|| profile.password.clone())
        .map(SecretString::from)
        .ok_or_else(|| CliError::Validation {
            field: "password".into(),
            reason: "no password configured; set FORECOURT_PASSWORD or the profile field".into(),
        })?;

    let endpoint = ControllerEndpoint {
        host,
        port,
        scheme,
        login,
        password,
    };

    let transport = TransportConfig {
        timeout: Duration::from_secs(global.timeout),
        ..TransportConfig::default()
    };

    let station_id = profile
        .station_id
        .clone()
        .unwrap_or_else(|| profile_name.clone());

    let store = MemoryStore::new();
    store.insert_record(StationRecord {
        id: station_id.clone(),
        name: profile
            .station_name
            .clone()
            .unwrap_or_else(|| station_id.clone()),
        address: profile.station_address.clone().unwrap_or_default(),
        status: StationStatus::Offline,
        last_heartbeat: None,
    });
    store.insert_endpoint(&station_id, endpoint.clone());
    if !profile.tanks.is_empty() {
        store.insert_tanks(&station_id, profile.tanks.clone());
    }
    if !profile.pricing.is_empty() {
        store.insert_pricing(&station_id, profile.pricing.clone());
    }
    if let Some(ref station_config) = profile.station_config {
        store.insert_config(&station_id, station_config.clone());
    }

    Ok(ResolvedSetup {
        station_id,
        store,
        endpoint,
        transport,
    })
}
