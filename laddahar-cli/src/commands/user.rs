use clap::{Args, Subcommand};

use laddahar_core::{Car, CarPreset, Tracker, TrackerError, User, UserUpdate};

use super::{confirm, report_push};

#[derive(Args)]
pub struct UserCommand {
    #[command(subcommand)]
    pub command: UserSubcommand,
}

#[derive(Subcommand)]
pub enum UserSubcommand {
    /// List everyone sharing the charger
    List,

    /// Add a user
    Add {
        /// Display name
        name: String,

        /// Car preset (see `ladda cars`)
        #[arg(long)]
        car: Option<String>,

        /// Car model, when not using a preset or to rename one
        #[arg(long)]
        model: Option<String>,

        /// Usable battery capacity in kWh
        #[arg(long)]
        capacity: Option<f64>,

        /// Avatar image URL
        #[arg(long)]
        avatar_url: Option<String>,
    },

    /// Edit a user
    Edit {
        /// User name or id
        user: String,

        /// New display name
        #[arg(long)]
        name: Option<String>,

        /// Car preset (see `ladda cars`)
        #[arg(long)]
        car: Option<String>,

        /// Car model
        #[arg(long)]
        model: Option<String>,

        /// Usable battery capacity in kWh
        #[arg(long)]
        capacity: Option<f64>,

        /// Avatar image URL
        #[arg(long, conflicts_with = "clear_avatar")]
        avatar_url: Option<String>,

        /// Remove the avatar
        #[arg(long)]
        clear_avatar: bool,
    },

    /// Delete a user and all of their charging sessions
    Delete {
        /// User name or id
        user: String,

        /// Skip confirmation
        #[arg(long, short)]
        yes: bool,
    },
}

impl UserCommand {
    pub async fn run(&self, tracker: &Tracker) -> Result<(), UserError> {
        match &self.command {
            UserSubcommand::List => self.list(tracker),
            UserSubcommand::Add {
                name,
                car,
                model,
                capacity,
                avatar_url,
            } => {
                let car = resolve_car(None, car.as_deref(), model.as_deref(), *capacity)?
                    .ok_or(UserError::MissingCar)?;
                let mut user = User::new(name.trim(), car);
                if let Some(url) = avatar_url {
                    user = user.with_avatar_url(url);
                }

                let change = tracker.add_user(user)?;
                println!("✓ Added {}", change.value);
                report_push(change.push).await;
                Ok(())
            }
            UserSubcommand::Edit {
                user,
                name,
                car,
                model,
                capacity,
                avatar_url,
                clear_avatar,
            } => {
                let existing = find(tracker, user)?;
                let car = resolve_car(
                    Some(&existing.car),
                    car.as_deref(),
                    model.as_deref(),
                    *capacity,
                )?;
                let avatar_url = if *clear_avatar {
                    Some(None)
                } else {
                    avatar_url.clone().map(Some)
                };
                let update = UserUpdate {
                    name: name.clone(),
                    car,
                    avatar_url,
                };

                let change = tracker.update_user(&existing.id, update)?;
                println!("✓ Updated {}", change.value);
                report_push(change.push).await;
                Ok(())
            }
            UserSubcommand::Delete { user, yes } => {
                let existing = find(tracker, user)?;
                if !*yes {
                    let prompt = format!(
                        "Delete '{}' and all of their charging sessions?",
                        existing.name
                    );
                    if !confirm(&prompt)? {
                        println!("Cancelled.");
                        return Ok(());
                    }
                }

                let change = tracker.delete_user(&existing.id)?;
                println!("✓ Deleted {}", change.value.name);
                report_push(change.push).await;
                Ok(())
            }
        }
    }

    fn list(&self, tracker: &Tracker) -> Result<(), UserError> {
        let state = tracker.state();
        if state.users.is_empty() {
            println!("No users yet.");
            println!();
            println!("Add one with: ladda user add <name> --car <preset>");
            return Ok(());
        }

        println!("Users");
        println!("=====");
        println!();
        for user in &state.users {
            let sessions = state
                .sessions
                .iter()
                .filter(|s| s.user_id == user.id)
                .count();
            println!("  {}, {} sessions  [{}]", user, sessions, user.id);
        }
        Ok(())
    }
}

fn find(tracker: &Tracker, key: &str) -> Result<User, UserError> {
    tracker
        .find_user(key)
        .ok_or_else(|| UserError::NotFound(key.to_string()))
}

/// Builds a car from a preset and/or explicit fields. `base` is the car
/// being edited; without one, a model and capacity or a preset are needed.
/// Returns `None` when nothing car-related was given.
fn resolve_car(
    base: Option<&Car>,
    preset: Option<&str>,
    model: Option<&str>,
    capacity: Option<f64>,
) -> Result<Option<Car>, UserError> {
    let start = match preset {
        Some(name) => Some(
            CarPreset::find(name)
                .ok_or_else(|| UserError::UnknownPreset(name.to_string()))?
                .to_car(),
        ),
        None if model.is_none() && capacity.is_none() => return Ok(None),
        None => base.cloned(),
    };

    let car = match (start, model, capacity) {
        (Some(mut car), model, capacity) => {
            if let Some(model) = model {
                car.model = model.trim().to_string();
            }
            if let Some(capacity) = capacity {
                car.battery_capacity = capacity;
            }
            car
        }
        (None, Some(model), Some(capacity)) => Car::new(model.trim(), capacity),
        (None, _, _) => return Err(UserError::MissingCar),
    };
    Ok(Some(car))
}

/// Errors from user command
#[derive(Debug)]
pub enum UserError {
    Tracker(TrackerError),
    NotFound(String),
    UnknownPreset(String),
    MissingCar,
    IoError(std::io::Error),
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserError::Tracker(e) => write!(f, "{}", e),
            UserError::NotFound(key) => write!(f, "User '{}' not found", key),
            UserError::UnknownPreset(name) => {
                write!(f, "Unknown car preset '{}'. Run 'ladda cars' to list them.", name)
            }
            UserError::MissingCar => {
                write!(f, "Give a car with --car <preset>, or both --model and --capacity")
            }
            UserError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for UserError {}

impl From<TrackerError> for UserError {
    fn from(e: TrackerError) -> Self {
        UserError::Tracker(e)
    }
}

impl From<std::io::Error> for UserError {
    fn from(e: std::io::Error) -> Self {
        UserError::IoError(e)
    }
}
