mod cars;
mod charge;
mod config_cmd;
mod hub;
mod settings_cmd;
mod user;
mod watch;

pub use cars::CarsCommand;
pub use charge::ChargeCommand;
pub use config_cmd::ConfigCommand;
pub use hub::HubCommand;
pub use settings_cmd::SettingsCommand;
pub use user::UserCommand;
pub use watch::WatchCommand;

use std::io::{self, Write};

use laddahar_core::{PendingPush, PushOutcome};

/// Waits for the push a mutation started, if any, and reports how it went.
/// The local change is already saved either way.
pub(crate) async fn report_push(push: PendingPush) {
    match push.wait().await {
        Some(Ok(PushOutcome::Pushed { .. })) => println!("✓ Saved to hub"),
        Some(Err(e)) => eprintln!("✗ Saved locally, but the hub push failed: {}", e),
        Some(Ok(PushOutcome::Superseded)) | None => {}
    }
}

/// Asks a yes/no question on stdin. Anything but "y" is a no.
pub(crate) fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
