use serde::{Deserialize, Serialize};

/// Price used until someone changes it, in SEK per kWh.
pub const DEFAULT_KWH_PRICE: f64 = 2.5;

/// Local application settings.
///
/// Only `kwh_price` is shared with the hub. The remaining fields describe
/// this device's connection to the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub kwh_price: f64,
    /// Identifies the shared remote document. `None` means local-only mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_id: Option<String>,
    /// Timestamp (ms) of the last document pushed or applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_status: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            kwh_price: DEFAULT_KWH_PRICE,
            cloud_id: None,
            last_sync_timestamp: None,
            last_sync_status: None,
        }
    }
}

impl Settings {
    /// Returns the hub id if one is set and non-empty.
    pub fn hub_id(&self) -> Option<&str> {
        self.cloud_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}
