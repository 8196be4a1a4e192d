//! Command dispatch: bridges CLI args -> core operations -> output.

pub mod config_cmd;
pub mod pump;
pub mod readings;
pub mod station;
pub mod util;

use forecourt_core::StatusResolver;

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// Dispatch a controller-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let setup = config::resolve(global)?;
    let context = util::CommandContext::new(&setup);
    let resolver = StatusResolver::new(setup.store, setup.transport);

    match cmd {
        Command::Status => station::status(&resolver, &context, global).await,
        Command::Detail => station::detail(&resolver, &context, global).await,
        Command::Tanks => station::tanks(&resolver, &context, global).await,

        Command::Prices => readings::prices(&resolver, &context, global).await,
        Command::Deliveries => readings::deliveries(&resolver, &context, global).await,
        Command::Alarms => readings::alarms(&resolver, &context, global).await,
        Command::Totalizers => readings::totalizers(&resolver, &context, global).await,
        Command::Datetime => readings::datetime(&resolver, &context, global).await,

        Command::Authorize(args) => pump::authorize(&resolver, &context, args, global).await,
        Command::Stop { hose } => pump::stop(&resolver, &context, hose, global).await,
        Command::EmergencyStop => pump::emergency_stop(&resolver, &context, global).await,
        Command::Clear { hose } => pump::clear(&resolver, &context, hose, global).await,

        // Handled before dispatch
        Command::Config(_) => unreachable!(),
    }
}
