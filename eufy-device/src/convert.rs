//! Unit conversions between the vendor scale and gateway units
//!
//! Eufy bulbs report color temperature on a relative 0-100 scale, where 0 is
//! the warmest white and 100 the coolest. The gateway expects Kelvin.

use crate::remote::Rgb;

/// Warmest color temperature a tunable bulb produces, in Kelvin
pub const MIN_TEMPERATURE: u32 = 2700;

/// Coolest color temperature a tunable bulb produces, in Kelvin
pub const MAX_TEMPERATURE: u32 = 6500;

/// Top of the vendor's relative temperature scale
pub const MAX_RELATIVE_TEMPERATURE: u8 = 100;

/// Color string published when a bulb reports no color
pub const NO_COLOR: &str = "#000000";

/// Convert a relative temperature (0-100) to Kelvin
///
/// Linear, truncating toward zero. Inputs above 100 are clamped to 100, so
/// the result always lies in `MIN_TEMPERATURE..=MAX_TEMPERATURE`.
pub fn relative_to_kelvin(relative: u8) -> u32 {
    let relative = u32::from(relative.min(MAX_RELATIVE_TEMPERATURE));
    MIN_TEMPERATURE
        + (MAX_TEMPERATURE - MIN_TEMPERATURE) * relative / u32::from(MAX_RELATIVE_TEMPERATURE)
}

/// Convert Kelvin to the relative scale (0-100), rounding to nearest
///
/// Inputs outside `MIN_TEMPERATURE..=MAX_TEMPERATURE` are clamped first.
pub fn kelvin_to_relative(kelvin: u32) -> u8 {
    let kelvin = kelvin.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE);
    let span = MAX_TEMPERATURE - MIN_TEMPERATURE;
    let scaled = (kelvin - MIN_TEMPERATURE) * u32::from(MAX_RELATIVE_TEMPERATURE);
    // The clamp above bounds this to 0..=100
    ((scaled + span / 2) / span) as u8
}

/// Format a color as `#RRGGBB` (uppercase hex)
///
/// `None` maps to [`NO_COLOR`].
pub fn color_to_hex(color: Option<Rgb>) -> String {
    match color {
        Some(Rgb { red, green, blue }) => format!("#{:02X}{:02X}{:02X}", red, green, blue),
        None => NO_COLOR.to_string(),
    }
}

/// Parse a `#RRGGBB` string (case-insensitive)
pub fn parse_hex_color(value: &str) -> Option<Rgb> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some(Rgb::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}
