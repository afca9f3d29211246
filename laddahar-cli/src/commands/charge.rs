use chrono::{Datelike, Local, NaiveDate};
use clap::{Args, Subcommand};

use laddahar_core::{Tracker, TrackerError, User};

use super::report_push;

#[derive(Args)]
pub struct ChargeCommand {
    #[command(subcommand)]
    pub command: ChargeSubcommand,
}

#[derive(Subcommand)]
pub enum ChargeSubcommand {
    /// Mark or unmark a charging day
    Toggle {
        /// User name or id
        user: String,

        /// Day to toggle (YYYY-MM-DD, default: today)
        #[arg(long, short)]
        date: Option<NaiveDate>,
    },

    /// Show a month of charging with energy and cost
    Show {
        /// User name or id
        user: String,

        /// Month to show (YYYY-MM, default: this month)
        #[arg(long, short)]
        month: Option<String>,
    },
}

impl ChargeCommand {
    pub async fn run(&self, tracker: &Tracker) -> Result<(), ChargeError> {
        match &self.command {
            ChargeSubcommand::Toggle { user, date } => {
                let user = find(tracker, user)?;
                let date = date.unwrap_or_else(|| Local::now().date_naive());

                let change = tracker.toggle_session(&user.id, date)?;
                if change.value {
                    println!("✓ {} charged on {}", user.name, date);
                } else {
                    println!("✓ Removed charging on {} for {}", date, user.name);
                }
                report_push(change.push).await;
                Ok(())
            }
            ChargeSubcommand::Show { user, month } => {
                let user = find(tracker, user)?;
                let (year, month) = match month {
                    Some(m) => parse_month(m)?,
                    None => {
                        let today = Local::now().date_naive();
                        (today.year(), today.month())
                    }
                };

                let summary = tracker.monthly_summary(&user.id, year, month)?;
                let price = tracker.state().settings.kwh_price;

                let title = format!("{} {}-{:02}", user.name, year, month);
                println!("{}", title);
                println!("{}", "=".repeat(title.chars().count()));
                println!();
                if summary.dates.is_empty() {
                    println!("No charging this month.");
                } else {
                    for date in &summary.dates {
                        println!("  {} {}", date, date.format("%a"));
                    }
                }
                println!();
                println!("Sessions:  {}", summary.sessions());
                println!(
                    "Energy:    {:.1} kWh ({} kWh per session)",
                    summary.kwh, user.car.battery_capacity
                );
                println!("Cost:      {:.2} ({:.2} per kWh)", summary.cost, price);
                Ok(())
            }
        }
    }
}

fn find(tracker: &Tracker, key: &str) -> Result<User, ChargeError> {
    tracker
        .find_user(key)
        .ok_or_else(|| ChargeError::UserNotFound(key.to_string()))
}

/// Parses `YYYY-MM`.
fn parse_month(s: &str) -> Result<(i32, u32), ChargeError> {
    let invalid = || ChargeError::InvalidMonth(s.to_string());
    let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

/// Errors from charge command
#[derive(Debug)]
pub enum ChargeError {
    Tracker(TrackerError),
    UserNotFound(String),
    InvalidMonth(String),
}

impl std::fmt::Display for ChargeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChargeError::Tracker(e) => write!(f, "{}", e),
            ChargeError::UserNotFound(key) => write!(f, "User '{}' not found", key),
            ChargeError::InvalidMonth(s) => {
                write!(f, "Invalid month '{}'. Expected format: YYYY-MM", s)
            }
        }
    }
}

impl std::error::Error for ChargeError {}

impl From<TrackerError> for ChargeError {
    fn from(e: TrackerError) -> Self {
        ChargeError::Tracker(e)
    }
}
