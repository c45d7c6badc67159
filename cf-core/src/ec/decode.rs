//! Register decoding
//!
//! Pure conversions between raw EC register bytes and physical units.

use crate::constants::decode::{RAW_DUTY_MAX, RPM_FACTOR};

/// Raw duty byte (0-255) to percent (0-100), rounded to nearest
pub fn duty_percent(raw: u8) -> u8 {
    (f64::from(raw) / f64::from(RAW_DUTY_MAX) * 100.0).round() as u8
}

/// Percent (0-100) to the raw byte the EC expects, truncating
///
/// Callers validate the range; values above 100 saturate at 255.
pub fn duty_to_raw(percent: u8) -> u8 {
    let raw = u16::from(percent.min(100)) * RAW_DUTY_MAX / 100;
    raw as u8
}

/// Fan speed from the two tachometer registers
///
/// A zero reading means the fan is stopped.
pub fn rpm(hi: u8, lo: u8) -> u32 {
    let raw = u32::from(u16::from_be_bytes([hi, lo]));
    if raw > 0 {
        RPM_FACTOR / raw
    } else {
        0
    }
}

/// Temperature registers already hold whole degrees Celsius
pub fn temperature(raw: u8) -> u8 {
    raw
}
