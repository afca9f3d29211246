mod car;
mod document;
mod session;
mod settings;
mod user;

pub use car::{Car, CarPreset, CAR_PRESETS};
pub use document::{SharedSettings, Snapshot, SyncedDocument};
pub use session::ChargingSession;
pub use settings::{Settings, DEFAULT_KWH_PRICE};
pub use user::User;
