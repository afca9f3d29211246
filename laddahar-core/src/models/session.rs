use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One user's claim that they fully charged on a given day.
///
/// Sessions are identified by `(user_id, date)` and are never updated in
/// place, only added or removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingSession {
    pub user_id: String,
    /// Serialized as `YYYY-MM-DD`
    pub date: NaiveDate,
}

impl ChargingSession {
    pub fn new(user_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            date,
        }
    }

    pub fn matches(&self, user_id: &str, date: NaiveDate) -> bool {
        self.user_id == user_id && self.date == date
    }
}
