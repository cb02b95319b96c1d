//! Gaussian speed model.
//!
//! A move is three regions: a ramp up over `[0, R)`, a plateau over
//! `[R, T - R)` and the mirrored ramp down over `[T - R, T]`. The ramp is the
//! rising half of a Gaussian bell centred on `R`, shifted and rescaled so it
//! starts at exactly zero and peaks at exactly the nominal cruise speed.
//!
//! Internally everything is unsigned "angular travel": speed in rpm
//! integrated over milliseconds. Public accessors apply the travel direction
//! and convert travel to metres.

use core::{
    f64::consts::{FRAC_2_SQRT_PI, PI, SQRT_2},
    time::Duration,
};

use snafu::ensure;

use crate::{
    config::{self, ShapeParameters, WheelGeometry},
    curve::TravelDirection,
    error::{InvalidShapeSnafu, MotionError, RampOverlapSnafu},
};

/// Inverse of the error function.
///
/// Uses Giles' polynomial approximation followed by two Newton steps on
/// [`libm::erf`]. Returns `±inf` at `±1` and NaN outside `[-1, 1]`.
pub fn erf_inv(y: f64) -> f64 {
    if y.is_nan() || !(-1.0..=1.0).contains(&y) {
        return f64::NAN;
    }
    if y == 1.0 {
        return f64::INFINITY;
    }
    if y == -1.0 {
        return f64::NEG_INFINITY;
    }

    let mut w = -libm::log((1.0 - y) * (1.0 + y));
    let p = if w < 5.0 {
        w -= 2.5;
        let mut p = 2.810_226_36e-08;
        p = 3.432_739_39e-07 + p * w;
        p = -3.523_387_7e-06 + p * w;
        p = -4.391_506_54e-06 + p * w;
        p = 0.000_218_580_87 + p * w;
        p = -0.001_253_725_03 + p * w;
        p = -0.004_177_681_64 + p * w;
        p = 0.246_640_727 + p * w;
        1.501_409_41 + p * w
    } else {
        w = libm::sqrt(w) - 3.0;
        let mut p = -0.000_200_214_257;
        p = 0.000_100_950_558 + p * w;
        p = 0.001_349_343_22 + p * w;
        p = -0.003_673_428_44 + p * w;
        p = 0.005_739_507_73 + p * w;
        p = -0.007_622_461_3 + p * w;
        p = 0.009_438_870_47 + p * w;
        p = 1.001_674_06 + p * w;
        2.832_976_82 + p * w
    };

    let mut x = p * y;
    for _ in 0..2 {
        let slope = FRAC_2_SQRT_PI * libm::exp(-x * x);
        if slope <= 0.0 {
            break;
        }
        x -= (libm::erf(x) - y) / slope;
    }
    x
}

/// Normalised ramp shape: 0 at `t = 0`, 1 at `t = R`.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Ramp {
    width: f64,
    duration: f64,
    floor: f64,
    gain: f64,
    erf_start: f64,
}

impl Ramp {
    fn new(shape: &ShapeParameters) -> Self {
        let width = shape.ramp_width;
        let duration = shape.ramp_duration;
        let floor = libm::exp(-(duration * duration) / (2.0 * width * width));
        Self {
            width,
            duration,
            floor,
            gain: 1.0 / (1.0 - floor),
            erf_start: libm::erf(duration / (width * SQRT_2)),
        }
    }

    fn shape(&self, t: f64) -> f64 {
        let z = (t - self.duration) / self.width;
        (libm::exp(-0.5 * z * z) - self.floor) * self.gain
    }

    /// Closed-form integral of [`Ramp::shape`] over `[0, t]`.
    fn integral(&self, t: f64) -> f64 {
        let bell = self.width
            * libm::sqrt(PI / 2.0)
            * (libm::erf((t - self.duration) / (self.width * SQRT_2)) + self.erf_start);
        (bell - self.floor * t) * self.gain
    }

    fn area(&self) -> f64 {
        self.integral(self.duration)
    }
}

/// Angular travel (rpm x ms) of a single ramp run at the nominal cruise speed.
pub(crate) fn ramp_travel(shape: &ShapeParameters) -> f64 {
    shape.cruise_speed * Ramp::new(shape).area() + shape.vertical_offset * shape.ramp_duration
}

/// A solved speed curve for one move.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GaussianProfile {
    shape: ShapeParameters,
    wheel: WheelGeometry,
    ramp: Ramp,
    tick_ms: f64,
    total_duration: f64,
    plateau_speed: f64,
    direction: TravelDirection,
}

impl GaussianProfile {
    /// Builds a profile lasting `total_duration` ms whose plateau runs at
    /// `plateau_speed` rpm (baseline included).
    ///
    /// Most callers want [`crate::ProfileSolver::solve`], which picks both
    /// values for a target distance.
    pub fn new(
        shape: ShapeParameters,
        wheel: WheelGeometry,
        tick: Duration,
        total_duration: f64,
        plateau_speed: f64,
        direction: TravelDirection,
    ) -> Result<Self, MotionError> {
        shape.validate()?;
        wheel.validate()?;
        config::validate_tick(tick)?;
        ensure!(
            total_duration.is_finite() && total_duration >= 2.0 * shape.ramp_duration,
            RampOverlapSnafu {
                total_duration,
                ramp_duration: shape.ramp_duration,
            }
        );
        ensure!(
            plateau_speed.is_finite() && plateau_speed >= 0.0,
            InvalidShapeSnafu {
                field: "plateau_speed",
                value: plateau_speed,
            }
        );

        Ok(Self {
            shape,
            wheel,
            ramp: Ramp::new(&shape),
            tick_ms: config::tick_ms(tick),
            total_duration,
            plateau_speed,
            direction,
        })
    }

    pub fn shape(&self) -> &ShapeParameters {
        &self.shape
    }

    pub fn wheel(&self) -> &WheelGeometry {
        &self.wheel
    }

    pub fn direction(&self) -> TravelDirection {
        self.direction
    }

    pub fn tick_ms(&self) -> f64 {
        self.tick_ms
    }

    /// Total move time, in ms.
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn plateau_duration(&self) -> f64 {
        self.total_duration - 2.0 * self.shape.ramp_duration
    }

    /// Plateau speed excluding the baseline, in rpm. Differs from the nominal
    /// cruise speed because the plateau is stretched to whole ticks.
    pub fn adjusted_cruise_speed(&self) -> f64 {
        self.plateau_speed - self.shape.vertical_offset
    }

    fn angular_travel(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, self.total_duration);
        let ramp_duration = self.shape.ramp_duration;
        let nominal = self.shape.cruise_speed;
        let adjusted = self.adjusted_cruise_speed();
        let plateau_end = self.total_duration - ramp_duration;

        let mut travel = self.shape.vertical_offset * t;
        if t <= ramp_duration {
            travel += nominal * self.ramp.integral(t);
        } else if t <= plateau_end {
            travel += nominal * self.ramp.area() + adjusted * (t - ramp_duration);
        } else {
            let area = self.ramp.area();
            travel += nominal * area
                + adjusted * (plateau_end - ramp_duration)
                + nominal * (area - self.ramp.integral(self.total_duration - t));
        }
        travel
    }

    /// Instantaneous signed speed at `t` ms, in rpm. Zero outside the move.
    pub fn velocity(&self, t: f64) -> f64 {
        if !(0.0..=self.total_duration).contains(&t) {
            return 0.0;
        }
        let ramp_duration = self.shape.ramp_duration;
        let nominal = self.shape.cruise_speed;
        let offset = self.shape.vertical_offset;

        let speed = if t < ramp_duration {
            offset + nominal * self.ramp.shape(t)
        } else if t < self.total_duration - ramp_duration {
            self.plateau_speed
        } else {
            offset + nominal * self.ramp.shape(self.total_duration - t)
        };
        self.direction.factor() * speed
    }

    /// Signed speed averaged over the tick starting at `t`, in rpm.
    ///
    /// The last tick may be cut short by the end of the move; at exactly
    /// `total_duration` the instantaneous speed is returned.
    pub fn speed_at(&self, t: f64) -> f64 {
        if !(0.0..=self.total_duration).contains(&t) {
            return 0.0;
        }
        let end = (t + self.tick_ms).min(self.total_duration);
        let span = end - t;
        if span <= f64::EPSILON * self.total_duration.max(1.0) {
            return self.velocity(t);
        }
        self.direction.factor() * (self.angular_travel(end) - self.angular_travel(t)) / span
    }

    /// Signed distance travelled from the start of the move to `t` ms, in
    /// metres.
    pub fn distance_at(&self, t: f64) -> f64 {
        self.direction.factor() * self.wheel.meters_per_rpm_ms() * self.angular_travel(t)
    }

    /// Time in ms at which the move has covered `|distance|` metres.
    ///
    /// Distances past the end of the move clamp to `total_duration`.
    pub fn time_at_distance(&self, distance: f64) -> f64 {
        let total = self.angular_travel(self.total_duration);
        let target = libm::fabs(distance) / self.wheel.meters_per_rpm_ms();
        if target >= total {
            return self.total_duration;
        }
        if target <= 0.0 {
            return 0.0;
        }
        let ramp_duration = self.shape.ramp_duration;
        let ramp_end = self.angular_travel(ramp_duration);
        let plateau_end = self.angular_travel(self.total_duration - ramp_duration);

        if target <= ramp_end {
            self.invert_ramp(target)
        } else if target <= plateau_end && self.plateau_speed > 0.0 {
            ramp_duration + (target - ramp_end) / self.plateau_speed
        } else {
            self.total_duration - self.invert_ramp(total - target)
        }
    }

    /// Travel of one ramp over its first `t` ms.
    fn ramp_travel_until(&self, t: f64) -> f64 {
        self.shape.cruise_speed * self.ramp.integral(t) + self.shape.vertical_offset * t
    }

    fn invert_ramp(&self, travel: f64) -> f64 {
        let ramp = &self.ramp;
        let nominal = self.shape.cruise_speed;
        let offset = self.shape.vertical_offset;

        // ignoring the floor and baseline terms leaves a pure erf to invert
        let bell = nominal * ramp.gain * ramp.width * libm::sqrt(PI / 2.0);
        let y = (travel / bell - ramp.erf_start).clamp(-1.0 + 1e-12, 1.0 - 1e-12);
        let mut t = (ramp.duration + ramp.width * SQRT_2 * erf_inv(y)).clamp(0.0, ramp.duration);

        let (mut lo, mut hi) = (0.0, ramp.duration);
        let tolerance = 1e-9 * travel.max(1.0);
        for _ in 0..48 {
            let error = self.ramp_travel_until(t) - travel;
            if libm::fabs(error) <= tolerance {
                break;
            }
            if error > 0.0 {
                hi = t;
            } else {
                lo = t;
            }
            let slope = offset + nominal * ramp.shape(t);
            let next = t - error / slope;
            t = if slope > 0.0 && next > lo && next < hi {
                next
            } else {
                0.5 * (lo + hi)
            };
        }
        t
    }
}
