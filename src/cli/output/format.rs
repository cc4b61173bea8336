use crate::utils::units::{
    pixels_to_feet, DistanceUnit, FEET_PER_CAR, FEET_PER_FRISBEE_FIELD, FEET_PER_MILE,
};

/// `1234567` → `1,234,567`.
pub fn format_absolute(n: u64) -> String {
    let digits = n.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Compact form used where space is tight: `999`, `1.2K`, `3.4M`.
pub fn format_number(n: u64) -> String {
    if n < 1_000 {
        n.to_string()
    } else if n < 1_000_000 {
        format!("{:.1}K", n as f64 / 1_000.)
    } else {
        format!("{:.1}M", n as f64 / 1_000_000.)
    }
}

/// Renders a distance given in pixels in the chosen unit.
pub fn format_distance(pixels: f64, unit: DistanceUnit, pixels_per_inch: f64) -> String {
    let feet = pixels_to_feet(pixels, pixels_per_inch);
    match unit {
        DistanceUnit::Feet if feet >= FEET_PER_MILE => format!("{:.1}mi", feet / FEET_PER_MILE),
        DistanceUnit::Feet if feet >= 1. => format!("{feet:.0}ft"),
        DistanceUnit::Feet => format!("{:.0}in", feet * 12.),
        DistanceUnit::Cars => {
            let cars = feet / FEET_PER_CAR;
            if cars >= 1000. {
                format!("{:.1}k cars", cars / 1000.)
            } else if cars >= 1. {
                format!("{cars:.0} cars")
            } else {
                format!("{cars:.1} cars")
            }
        }
        DistanceUnit::Frisbee => {
            let fields = feet / FEET_PER_FRISBEE_FIELD;
            if fields >= 100. {
                format!("{fields:.0} fields")
            } else if fields >= 1. {
                format!("{fields:.1} fields")
            } else {
                format!("{fields:.2} fields")
            }
        }
    }
}

/// Medal prefix of the top three leaderboard ranks.
pub fn medal(rank: usize) -> Option<&'static str> {
    match rank {
        1 => Some("🥇"),
        2 => Some("🥈"),
        3 => Some("🥉"),
        _ => None,
    }
}
