use serde::{Deserialize, Serialize};

use super::session::ChargingSession;
use super::user::User;

/// The subset of settings that is shared through the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSettings {
    pub kwh_price: f64,
}

/// The shared part of the domain state, before it is stamped for the hub.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub sessions: Vec<ChargingSession>,
    pub kwh_price: f64,
}

/// The document pushed to and pulled from the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedDocument {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub sessions: Vec<ChargingSession>,
    pub settings: SharedSettings,
    /// Wall-clock milliseconds at the time of the push
    #[serde(rename = "ts", alias = "timestamp")]
    pub timestamp: i64,
}

impl SyncedDocument {
    pub fn stamp(snapshot: Snapshot, timestamp: i64) -> Self {
        Self {
            users: snapshot.users,
            sessions: snapshot.sessions,
            settings: SharedSettings {
                kwh_price: snapshot.kwh_price,
            },
            timestamp,
        }
    }
}
