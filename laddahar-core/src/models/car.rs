use serde::{Deserialize, Serialize};
use std::fmt;

/// A user's car. Only the battery capacity matters for cost calculations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub model: String,
    /// Usable battery capacity in kWh
    pub battery_capacity: f64,
}

impl Car {
    pub fn new(model: impl Into<String>, battery_capacity: f64) -> Self {
        Self {
            model: model.into(),
            battery_capacity,
        }
    }
}

impl fmt::Display for Car {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} kWh)", self.model, self.battery_capacity)
    }
}

/// A common car model with its typical usable capacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarPreset {
    pub name: &'static str,
    pub capacity: f64,
}

/// Presets offered when creating a profile. The last entry is the fallback
/// for cars not in the list.
pub const CAR_PRESETS: &[CarPreset] = &[
    CarPreset {
        name: "Tesla Model 3/Y",
        capacity: 75.0,
    },
    CarPreset {
        name: "VW ID.3/ID.4",
        capacity: 77.0,
    },
    CarPreset {
        name: "Polestar 2",
        capacity: 78.0,
    },
    CarPreset {
        name: "Kia EV6 / Ioniq 5",
        capacity: 77.0,
    },
    CarPreset {
        name: "Volvo XC40 Recharge",
        capacity: 78.0,
    },
    CarPreset {
        name: "Hybrid (Standard)",
        capacity: 12.0,
    },
    CarPreset {
        name: "Other",
        capacity: 60.0,
    },
];

impl CarPreset {
    /// Finds a preset by name, ignoring case.
    pub fn find(name: &str) -> Option<&'static CarPreset> {
        CAR_PRESETS
            .iter()
            .find(|preset| preset.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn to_car(&self) -> Car {
        Car::new(self.name, self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_preset_case_insensitive() {
        let preset = CarPreset::find("polestar 2").unwrap();
        assert_eq!(preset.capacity, 78.0);
    }

    #[test]
    fn test_find_unknown_preset() {
        assert!(CarPreset::find("Trabant").is_none());
    }

    #[test]
    fn test_preset_to_car() {
        let car = CAR_PRESETS[0].to_car();
        assert_eq!(car.model, "Tesla Model 3/Y");
        assert_eq!(car.battery_capacity, 75.0);
    }

    #[test]
    fn test_car_wire_names() {
        let car = Car::new("VW ID.4", 77.0);
        let json = serde_json::to_value(&car).unwrap();
        assert_eq!(json["model"], "VW ID.4");
        assert_eq!(json["batteryCapacity"], 77.0);
    }
}
