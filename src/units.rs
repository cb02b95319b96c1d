//! Length helpers. Everything in this crate measures distance in metres.

use core::f64::consts::PI;

/// Milliseconds per minute: speeds are motor rpm and time is milliseconds,
/// so rpm x ms / 60 000 is revolutions.
pub const MS_PER_MINUTE: f64 = 60_000.0;

pub const fn inch(from_inches: f64) -> f64 {
    from_inches * 0.0254
}
pub const fn ft(from_feet: f64) -> f64 {
    inch(from_feet * 12.0)
}
pub const fn tile(from_tiles: f64) -> f64 {
    inch(from_tiles * 24.0)
}
pub const fn cm(from_centimeters: f64) -> f64 {
    from_centimeters * 0.01
}
pub const fn mm(from_millimeters: f64) -> f64 {
    from_millimeters * 0.001
}

/// Linear travel of a wheel of `radius` metres after `revolutions` turns.
pub fn revolutions_to_meters(revolutions: f64, radius: f64) -> f64 {
    revolutions * 2.0 * PI * radius
}

/// Metres covered per unit of angular travel, where angular travel is speed
/// in rpm integrated over milliseconds.
pub fn meters_per_rpm_ms(radius: f64) -> f64 {
    2.0 * PI * radius / MS_PER_MINUTE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_units_are_metres() {
        assert!((tile(1.0) - 0.6096).abs() < 1e-12);
        assert!((ft(1.0) - 0.3048).abs() < 1e-12);
        assert!((cm(130.0) - 1.3).abs() < 1e-12);
    }

    #[test]
    fn one_minute_at_one_rpm_is_one_revolution() {
        let r = 0.0524;
        let per_rev = revolutions_to_meters(1.0, r);
        assert!((meters_per_rpm_ms(r) * MS_PER_MINUTE - per_rev).abs() < 1e-12);
    }
}
