//! Imperial to metric conversions for weather station readings
//!
//! Every conversion rounds its result to 2 decimal places.

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Degrees Fahrenheit to degrees Celsius
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    round2((fahrenheit - 32.0) * 5.0 / 9.0)
}

/// Miles per hour to meters per second
pub fn mph_to_meters_per_second(mph: f64) -> f64 {
    round2(mph * 0.447_04)
}

/// Inches of mercury to kilopascals
pub fn inch_hg_to_kilopascal(inch_hg: f64) -> f64 {
    round2(inch_hg * 3.386_39)
}

/// Inches to millimeters
pub fn inch_to_millimeter(inch: f64) -> f64 {
    round2(inch * 25.4)
}
