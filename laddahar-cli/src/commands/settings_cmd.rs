use clap::{Args, Subcommand};

use laddahar_core::{Tracker, TrackerError};

use super::report_push;

#[derive(Args)]
pub struct SettingsCommand {
    #[command(subcommand)]
    pub command: SettingsSubcommand,
}

#[derive(Subcommand)]
pub enum SettingsSubcommand {
    /// Show the shared price and hub connection
    Show,

    /// Set the electricity price per kWh
    Price {
        /// Price per kWh
        value: f64,
    },
}

impl SettingsCommand {
    pub async fn run(&self, tracker: &Tracker) -> Result<(), TrackerError> {
        match &self.command {
            SettingsSubcommand::Show => {
                let settings = tracker.state().settings;

                println!("Settings");
                println!("========");
                println!();
                println!("Price per kWh:  {:.2}", settings.kwh_price);
                match settings.hub_id() {
                    Some(id) => println!("Hub:            {}", id),
                    None => println!("Hub:            (not connected)"),
                }
                if let Some(ts) = settings.last_sync_timestamp {
                    println!("Last sync:      {}", super::hub::format_timestamp(ts));
                }
                if let Some(message) = &settings.last_sync_status {
                    println!("Last status:    {}", message);
                }
                Ok(())
            }
            SettingsSubcommand::Price { value } => {
                let change = tracker.set_kwh_price(*value)?;
                println!("✓ Price set to {:.2} per kWh", value);
                report_push(change.push).await;
                Ok(())
            }
        }
    }
}
