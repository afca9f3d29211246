//! In-memory domain state: users, charging sessions and settings.
//!
//! Mutators here are pure. Persisting and pushing after a mutation is the
//! job of [`crate::Tracker`].

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use crate::models::{Car, ChargingSession, Settings, Snapshot, SyncedDocument, User};

/// Errors from rejected mutations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Name must not be empty")]
    EmptyName,

    #[error("Battery capacity must be greater than zero, got {0}")]
    InvalidCapacity(f64),

    #[error("Price per kWh must be zero or more, got {0}")]
    InvalidPrice(f64),

    #[error("Invalid month: {0}-{1:02}")]
    InvalidMonth(i32, u32),
}

/// Partial update for an existing user. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub car: Option<Car>,
    /// `Some(None)` clears the avatar
    pub avatar_url: Option<Option<String>>,
}

/// Charging totals for one user and calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    pub user_id: String,
    pub year: i32,
    pub month: u32,
    pub dates: Vec<NaiveDate>,
    pub kwh: f64,
    pub cost: f64,
}

impl MonthlySummary {
    pub fn sessions(&self) -> usize {
        self.dates.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainState {
    pub users: Vec<User>,
    pub sessions: Vec<ChargingSession>,
    pub settings: Settings,
}

impl DomainState {
    pub fn new(users: Vec<User>, sessions: Vec<ChargingSession>, settings: Settings) -> Self {
        Self {
            users,
            sessions,
            settings,
        }
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Finds a user by id, or by case-insensitive name.
    pub fn find_user(&self, key: &str) -> Option<&User> {
        self.user(key).or_else(|| {
            self.users
                .iter()
                .find(|u| u.name.eq_ignore_ascii_case(key.trim()))
        })
    }

    pub fn has_session(&self, user_id: &str, date: NaiveDate) -> bool {
        self.sessions.iter().any(|s| s.matches(user_id, date))
    }

    /// Flips the session for `(user_id, date)`.
    ///
    /// Returns `true` if a session was added, `false` if one was removed.
    pub fn toggle_session(&mut self, user_id: &str, date: NaiveDate) -> Result<bool, StateError> {
        if self.user(user_id).is_none() {
            return Err(StateError::UserNotFound(user_id.to_string()));
        }

        if self.has_session(user_id, date) {
            self.sessions.retain(|s| !s.matches(user_id, date));
            Ok(false)
        } else {
            self.sessions.push(ChargingSession::new(user_id, date));
            Ok(true)
        }
    }

    /// Adds a new user. The id is bumped if another user already holds it.
    pub fn add_user(&mut self, mut user: User) -> Result<User, StateError> {
        validate_name(&user.name)?;
        validate_car(&user.car)?;
        user.name = user.name.trim().to_string();

        while self.user(&user.id).is_some() {
            user.id = match user.id.parse::<i64>() {
                Ok(n) => (n + 1).to_string(),
                Err(_) => format!("{}-1", user.id),
            };
        }

        self.users.push(user.clone());
        Ok(user)
    }

    pub fn update_user(&mut self, id: &str, update: UserUpdate) -> Result<User, StateError> {
        if let Some(name) = &update.name {
            validate_name(name)?;
        }
        if let Some(car) = &update.car {
            validate_car(car)?;
        }

        let user = self
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StateError::UserNotFound(id.to_string()))?;

        if let Some(name) = update.name {
            user.name = name.trim().to_string();
        }
        if let Some(car) = update.car {
            user.car = car;
        }
        if let Some(avatar_url) = update.avatar_url {
            user.avatar_url = avatar_url;
        }

        Ok(user.clone())
    }

    /// Removes a user together with all of their sessions.
    pub fn delete_user(&mut self, id: &str) -> Result<User, StateError> {
        let index = self
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| StateError::UserNotFound(id.to_string()))?;

        let removed = self.users.remove(index);
        self.sessions.retain(|s| s.user_id != id);
        Ok(removed)
    }

    pub fn set_kwh_price(&mut self, price: f64) -> Result<(), StateError> {
        if !price.is_finite() || price < 0.0 {
            return Err(StateError::InvalidPrice(price));
        }
        self.settings.kwh_price = price;
        Ok(())
    }

    /// The shared part of the state, as pushed to the hub.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            users: self.users.clone(),
            sessions: self.sessions.clone(),
            kwh_price: self.settings.kwh_price,
        }
    }

    /// Replaces users, sessions and price wholesale with a remote document.
    pub fn apply_remote(&mut self, document: &SyncedDocument) {
        self.users = document.users.clone();
        self.sessions = document.sessions.clone();
        self.settings.kwh_price = document.settings.kwh_price;
    }

    pub fn monthly_summary(
        &self,
        user_id: &str,
        year: i32,
        month: u32,
    ) -> Result<MonthlySummary, StateError> {
        let user = self
            .user(user_id)
            .ok_or_else(|| StateError::UserNotFound(user_id.to_string()))?;
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(StateError::InvalidMonth(year, month));
        }

        let mut dates: Vec<NaiveDate> = self
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.date.year() == year && s.date.month() == month)
            .map(|s| s.date)
            .collect();
        dates.sort();

        let kwh = dates.len() as f64 * user.car.battery_capacity;
        Ok(MonthlySummary {
            user_id: user_id.to_string(),
            year,
            month,
            cost: kwh * self.settings.kwh_price,
            kwh,
            dates,
        })
    }
}

fn validate_name(name: &str) -> Result<(), StateError> {
    if name.trim().is_empty() {
        return Err(StateError::EmptyName);
    }
    Ok(())
}

fn validate_car(car: &Car) -> Result<(), StateError> {
    if !car.battery_capacity.is_finite() || car.battery_capacity <= 0.0 {
        return Err(StateError::InvalidCapacity(car.battery_capacity));
    }
    Ok(())
}
