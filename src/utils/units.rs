use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Screen density assumed when the user hasn't configured one.
pub const DEFAULT_PIXELS_PER_INCH: f64 = 100.;

pub const FEET_PER_MILE: f64 = 5280.;
/// Length of an average car.
pub const FEET_PER_CAR: f64 = 15.;
/// Length of an ultimate frisbee field including end zones.
pub const FEET_PER_FRISBEE_FIELD: f64 = 330.;

pub fn pixels_to_inches(pixels: f64, pixels_per_inch: f64) -> f64 {
    if pixels_per_inch <= 0. {
        return pixels / DEFAULT_PIXELS_PER_INCH;
    }
    pixels / pixels_per_inch
}

pub fn pixels_to_feet(pixels: f64, pixels_per_inch: f64) -> f64 {
    pixels_to_inches(pixels, pixels_per_inch) / 12.
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Feet,
    Cars,
    Frisbee,
}

impl DistanceUnit {
    pub fn name(self) -> &'static str {
        match self {
            DistanceUnit::Feet => "feet",
            DistanceUnit::Cars => "cars",
            DistanceUnit::Frisbee => "frisbee",
        }
    }
}

impl Display for DistanceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
