use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::car::Car;

/// A person sharing the charger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque id, derived from the creation time in milliseconds
    pub id: String,
    pub name: String,
    pub car: Car,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl User {
    pub fn new(name: impl Into<String>, car: Car) -> Self {
        Self {
            id: Utc::now().timestamp_millis().to_string(),
            name: name.into(),
            car,
            avatar_url: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_avatar_url(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.name, self.car)
    }
}
