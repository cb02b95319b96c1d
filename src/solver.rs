//! Profile solver: picks the duration and plateau speed of a move so that
//! the Gaussian model travels exactly the requested distance.

use core::time::Duration;

use log::debug;
use snafu::ensure;

use crate::{
    config::{self, ShapeParameters, WheelGeometry},
    curve::TravelDirection,
    error::{InvalidDistanceSnafu, MotionError, RampsOnlySnafu},
    gaussian::{self, GaussianProfile},
};

/// Distance in metres covered by the two ramps alone, run back to back at
/// the nominal cruise speed. Shorter moves cannot be solved.
pub fn ramp_distance(shape: &ShapeParameters, wheel: &WheelGeometry) -> f64 {
    2.0 * wheel.meters_per_rpm_ms() * gaussian::ramp_travel(shape)
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProfileSolver {
    wheel: WheelGeometry,
    tick: Duration,
}

impl ProfileSolver {
    pub fn new(wheel: WheelGeometry, tick: Duration) -> Result<Self, MotionError> {
        wheel.validate()?;
        config::validate_tick(tick)?;
        Ok(Self { wheel, tick })
    }

    pub fn wheel(&self) -> &WheelGeometry {
        &self.wheel
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Solves a move of `distance` metres; the sign of `distance` sets the
    /// travel direction.
    ///
    /// The plateau is rounded up to whole ticks plus one spare tick, and its
    /// speed lowered to match, so that tick-by-tick playback covers the
    /// residual distance without drift.
    pub fn solve(
        &self,
        distance: f64,
        shape: &ShapeParameters,
    ) -> Result<GaussianProfile, MotionError> {
        shape.validate()?;
        ensure!(distance.is_finite(), InvalidDistanceSnafu { distance });

        let requested = libm::fabs(distance);
        let ramp_distance = ramp_distance(shape, &self.wheel);
        ensure!(
            requested >= ramp_distance,
            RampsOnlySnafu {
                requested,
                ramp_distance,
            }
        );

        let tick_ms = config::tick_ms(self.tick);
        let residual_travel = (requested - ramp_distance) / self.wheel.meters_per_rpm_ms();
        let nominal_plateau_speed = shape.cruise_speed + shape.vertical_offset;
        let raw_plateau = residual_travel / nominal_plateau_speed;
        let plateau = (libm::ceil(raw_plateau / tick_ms) + 1.0) * tick_ms;
        let plateau_speed = residual_travel / plateau;
        let total_duration = plateau + 2.0 * shape.ramp_duration;

        debug!(
            "solved {distance} m: {total_duration} ms total, plateau {plateau} ms at {plateau_speed} rpm"
        );

        let direction = if distance < 0.0 {
            TravelDirection::Reverse
        } else {
            TravelDirection::Forward
        };
        GaussianProfile::new(
            *shape,
            self.wheel,
            self.tick,
            total_duration,
            plateau_speed,
            direction,
        )
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::config::MotionConfig;

    fn solver() -> ProfileSolver {
        ProfileSolver::new(WheelGeometry::new(0.0524), Duration::from_millis(10)).unwrap()
    }

    fn shape() -> ShapeParameters {
        ShapeParameters::new(libm::sqrt(4000.0), 130.0, 200.0)
    }

    fn tick_distance() -> f64 {
        WheelGeometry::new(0.0524).meters_per_rpm_ms() * 200.0 * 10.0
    }

    #[test]
    fn two_metres_adds_a_tick_aligned_plateau() {
        let profile = solver().solve(2.0, &shape()).unwrap();
        let plateau = profile.total_duration() - 2.0 * 130.0;
        let ticks = plateau / 10.0;
        assert!(plateau >= 10.0);
        assert!((ticks - libm::round(ticks)).abs() < 1e-9);
        assert!(profile.adjusted_cruise_speed() <= 200.0);

        let travelled = profile.distance_at(profile.total_duration());
        assert!((travelled - 2.0).abs() < tick_distance());
        assert!((travelled - 2.0).abs() < 1e-9);
    }

    #[test]
    fn every_scheduled_shape_solves_to_a_monotonic_move() {
        let config = MotionConfig::DEFAULT;
        let solver = ProfileSolver::new(config.wheel, config.tick).unwrap();
        let mut cases: Vec<(f64, ShapeParameters)> = config.schedule.rows.to_vec();
        cases.push((2.5, config.schedule.fallback));

        for (bound, shape) in cases {
            for distance in [bound, -bound, bound / 2.0, -bound / 2.0] {
                let profile = solver.solve(distance, &shape).unwrap();
                let sign = libm::copysign(1.0, distance);
                let total = profile.total_duration();

                let mut prev = profile.distance_at(0.0);
                let mut t = 0.0;
                while t <= total {
                    let d = profile.distance_at(t);
                    assert!(sign * (d - prev) >= -1e-12, "{distance} m at t = {t}");
                    prev = d;
                    t += 0.5;
                }
                for boundary in [shape.ramp_duration, total - shape.ramp_duration] {
                    let jump =
                        profile.distance_at(boundary + 1e-9) - profile.distance_at(boundary - 1e-9);
                    assert!(jump.abs() < 1e-9, "{distance} m at t = {boundary}");
                }
                assert!((profile.distance_at(total) - distance).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn short_move_is_ramps_only() {
        let threshold = ramp_distance(&shape(), &WheelGeometry::new(0.0524));
        assert!(threshold > 0.13);

        let err = solver().solve(0.13, &shape()).unwrap_err();
        assert_eq!(
            err,
            MotionError::RampsOnly {
                requested: 0.13,
                ramp_distance: threshold,
            }
        );
        assert!(matches!(
            solver().solve(0.0, &shape()),
            Err(MotionError::RampsOnly { .. })
        ));
    }

    #[test]
    fn exact_ramp_distance_still_gets_a_plateau_tick() {
        let threshold = ramp_distance(&shape(), &WheelGeometry::new(0.0524));
        let profile = solver().solve(threshold, &shape()).unwrap();
        assert!(profile.plateau_duration() >= 10.0 - 1e-9);
        assert!((profile.distance_at(profile.total_duration()) - threshold).abs() < 1e-9);
    }

    #[test]
    fn negative_distance_reverses() {
        let profile = solver().solve(-2.0, &shape()).unwrap();
        assert_eq!(profile.direction(), TravelDirection::Reverse);
        assert!((profile.distance_at(profile.total_duration()) + 2.0).abs() < 1e-9);
        assert!(profile.speed_at(900.0) < 0.0);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(matches!(
            solver().solve(f64::NAN, &shape()),
            Err(MotionError::InvalidDistance { .. })
        ));
        assert!(matches!(
            solver().solve(2.0, &ShapeParameters::new(-1.0, 130.0, 200.0)),
            Err(MotionError::InvalidShape { .. })
        ));
        assert!(ProfileSolver::new(WheelGeometry::new(0.0524), Duration::ZERO).is_err());
    }

    #[test]
    fn baseline_speed_counts_towards_distance() {
        let shape = shape().with_vertical_offset(20.0);
        let profile = solver().solve(1.5, &shape).unwrap();
        assert!((profile.distance_at(profile.total_duration()) - 1.5).abs() < 1e-9);
        assert!((profile.velocity(0.0) - 20.0).abs() < 1e-9);
    }
}
