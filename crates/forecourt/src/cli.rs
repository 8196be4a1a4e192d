//! Clap derive structures for the `forecourt` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// forecourt -- operator CLI for PTS-2 forecourt controllers
#[derive(Debug, Parser)]
#[command(
    name = "forecourt",
    version,
    about = "Inspect and control PTS-2 fuel station controllers",
    long_about = "Operator diagnostics for PTS-2 pump controllers over the\n\
        jsonPTS protocol: station status, tank probes, prices, deliveries,\n\
        alarms, and pump authorization.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Controller profile to use
    #[arg(long, short = 'p', env = "FORECOURT_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Controller host (overrides profile)
    #[arg(long, env = "FORECOURT_HOST", global = true)]
    pub host: Option<String>,

    /// Controller port (overrides profile)
    #[arg(long, env = "FORECOURT_PORT", global = true)]
    pub port: Option<u16>,

    /// Controller login (overrides profile)
    #[arg(long, env = "FORECOURT_LOGIN", global = true)]
    pub login: Option<String>,

    /// Controller password
    #[arg(long, env = "FORECOURT_PASSWORD", global = true, hide_env = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FORECOURT_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds
    #[arg(long, env = "FORECOURT_TIMEOUT", default_value = "5", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the station's resolved status
    #[command(alias = "st")]
    Status,

    /// Full station detail: status, tanks, pricing, config
    Detail,

    /// Tank levels with alarm thresholds
    #[command(alias = "t")]
    Tanks,

    /// Active product prices from the controller
    Prices,

    /// Current delivery counters per hose
    #[command(alias = "del")]
    Deliveries,

    /// Controller alarms
    Alarms,

    /// Cumulative totalizer counters per hose
    #[command(alias = "tot")]
    Totalizers,

    /// Controller date and time
    Datetime,

    /// Authorize a hose for a preset fuelling
    Authorize(AuthorizeArgs),

    /// Stop an active delivery on a hose
    Stop {
        /// Hose number
        hose: u32,
    },

    /// Stop all pumps immediately
    EmergencyStop,

    /// Clear a finished delivery from a hose
    Clear {
        /// Hose number
        hose: u32,
    },

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),
}

// ── Authorize ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AuthorizeArgs {
    /// Hose number
    pub hose: u32,

    /// Preset target volume in litres
    #[arg(long, conflicts_with = "amount")]
    pub volume: Option<f64>,

    /// Preset target amount in currency units
    #[arg(long, conflicts_with = "volume")]
    pub amount: Option<f64>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// List configured profiles
    Profiles,

    /// Print the config file path
    Path,
}
