use core::time::Duration;

use log::LevelFilter;
use snafu::ensure;

use crate::{
    error::{InvalidGeometrySnafu, InvalidShapeSnafu, InvalidTickSnafu, MotionError},
    units,
};

/// Shape of a smooth move's speed curve.
///
/// Time is in milliseconds and speed in motor rpm.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShapeParameters {
    /// Spread of the Gaussian ramp (its standard deviation), in ms.
    pub ramp_width: f64,
    /// Time given to each of the acceleration and deceleration ramps, in ms.
    pub ramp_duration: f64,
    /// Nominal plateau speed, in rpm.
    pub cruise_speed: f64,
    /// Baseline speed added across the whole move, normally zero.
    pub vertical_offset: f64,
}

impl ShapeParameters {
    pub const fn new(ramp_width: f64, ramp_duration: f64, cruise_speed: f64) -> Self {
        Self {
            ramp_width,
            ramp_duration,
            cruise_speed,
            vertical_offset: 0.0,
        }
    }

    pub const fn with_vertical_offset(mut self, vertical_offset: f64) -> Self {
        self.vertical_offset = vertical_offset;
        self
    }

    pub fn validate(&self) -> Result<(), MotionError> {
        let positive = [
            ("ramp_width", self.ramp_width),
            ("ramp_duration", self.ramp_duration),
            ("cruise_speed", self.cruise_speed),
        ];
        for (field, value) in positive {
            ensure!(value.is_finite() && value > 0.0, InvalidShapeSnafu { field, value });
        }
        ensure!(
            self.vertical_offset.is_finite() && self.vertical_offset >= 0.0,
            InvalidShapeSnafu {
                field: "vertical_offset",
                value: self.vertical_offset,
            }
        );
        Ok(())
    }
}

impl Default for ShapeParameters {
    fn default() -> Self {
        MotionConfig::DEFAULT.schedule.fallback
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WheelGeometry {
    /// Drive wheel radius, in metres.
    pub wheel_radius: f64,
}

impl WheelGeometry {
    pub const fn new(wheel_radius: f64) -> Self {
        Self { wheel_radius }
    }

    pub fn validate(&self) -> Result<(), MotionError> {
        ensure!(
            self.wheel_radius.is_finite() && self.wheel_radius > 0.0,
            InvalidGeometrySnafu {
                radius: self.wheel_radius,
            }
        );
        Ok(())
    }

    /// Metres per rpm-millisecond of wheel rotation.
    pub fn meters_per_rpm_ms(&self) -> f64 {
        units::meters_per_rpm_ms(self.wheel_radius)
    }

    pub fn revolutions_to_meters(&self, revolutions: f64) -> f64 {
        units::revolutions_to_meters(revolutions, self.wheel_radius)
    }
}

/// Per-distance tuning table.
///
/// Rows are `(max_distance, shape)` sorted by increasing `max_distance`; the
/// first row whose bound covers `|distance|` wins, otherwise `fallback`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShapeSchedule {
    pub rows: &'static [(f64, ShapeParameters)],
    pub fallback: ShapeParameters,
}

impl ShapeSchedule {
    pub const fn uniform(shape: ShapeParameters) -> Self {
        Self {
            rows: &[],
            fallback: shape,
        }
    }

    pub fn for_distance(&self, distance: f64) -> ShapeParameters {
        let distance = libm::fabs(distance);
        self.rows
            .iter()
            .find_map(|(max, shape)| (distance <= *max).then_some(*shape))
            .unwrap_or(self.fallback)
    }

    pub fn validate(&self) -> Result<(), MotionError> {
        for (_, shape) in self.rows {
            shape.validate()?;
        }
        self.fallback.validate()
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MotionConfig {
    /// Sampling and playback interval.
    pub tick: Duration,
    pub wheel: WheelGeometry,
    pub schedule: ShapeSchedule,
    pub log_level: LevelFilter,
}

// sqrt(2000) and sqrt(4000)
const NARROW_RAMP: f64 = 44.721_359_549_995_796;
const WIDE_RAMP: f64 = 63.245_553_203_367_59;

impl MotionConfig {
    pub const DEFAULT: MotionConfig = MotionConfig {
        tick: Duration::from_millis(10),
        // 4.125 in omni wheels
        wheel: WheelGeometry::new(0.0524),
        schedule: ShapeSchedule {
            rows: &[
                (0.6, ShapeParameters::new(NARROW_RAMP, 90.0, 120.0)),
                (1.2, ShapeParameters::new(WIDE_RAMP, 130.0, 150.0)),
            ],
            fallback: ShapeParameters::new(WIDE_RAMP, 130.0, 200.0),
        },
        log_level: LevelFilter::Info,
    };

    pub fn validate(&self) -> Result<(), MotionError> {
        validate_tick(self.tick)?;
        self.wheel.validate()?;
        self.schedule.validate()
    }

    pub fn tick_ms(&self) -> f64 {
        tick_ms(self.tick)
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

pub(crate) fn validate_tick(tick: Duration) -> Result<(), MotionError> {
    ensure!(
        !tick.is_zero() && tick.subsec_nanos() % 1_000_000 == 0,
        InvalidTickSnafu
    );
    Ok(())
}

pub(crate) fn tick_ms(tick: Duration) -> f64 {
    tick.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        MotionConfig::DEFAULT.validate().unwrap();
        assert_eq!(MotionConfig::DEFAULT.tick_ms(), 10.0);
    }

    #[test]
    fn schedule_picks_first_covering_row() {
        let schedule = MotionConfig::DEFAULT.schedule;
        assert_eq!(schedule.for_distance(0.3).ramp_duration, 90.0);
        assert_eq!(schedule.for_distance(-1.0).cruise_speed, 150.0);
        assert_eq!(schedule.for_distance(2.0).cruise_speed, 200.0);
    }

    #[test]
    fn rejects_non_positive_shape() {
        let err = ShapeParameters::new(0.0, 130.0, 200.0).validate().unwrap_err();
        assert_eq!(
            err,
            MotionError::InvalidShape {
                field: "ramp_width",
                value: 0.0
            }
        );
        assert!(ShapeParameters::new(10.0, 130.0, -5.0).validate().is_err());
        assert!(
            ShapeParameters::new(10.0, 130.0, 200.0)
                .with_vertical_offset(-1.0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn rejects_bad_geometry_and_tick() {
        assert!(WheelGeometry::new(0.0).validate().is_err());
        assert!(validate_tick(Duration::ZERO).is_err());
        assert!(validate_tick(Duration::from_micros(2500)).is_err());
        assert!(validate_tick(Duration::from_millis(20)).is_ok());
    }
}
