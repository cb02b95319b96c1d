use alloc::string::String;

use snafu::Snafu;

/// Errors raised while solving, materializing or playing a smooth move.
///
/// Everything except [`MotionError::Busy`] is a
/// caller contract violation: the request or the tuning data is wrong, and
/// retrying with the same inputs fails the same way.
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MotionError {
    #[snafu(display("shape parameter `{field}` is out of range: {value}"))]
    InvalidShape { field: &'static str, value: f64 },

    #[snafu(display("wheel radius must be positive, got {radius}"))]
    InvalidGeometry { radius: f64 },

    #[snafu(display("control tick must be a non-zero whole number of milliseconds"))]
    InvalidTick,

    #[snafu(display("requested distance is not a finite number: {distance}"))]
    InvalidDistance { distance: f64 },

    /// The move is shorter than the two ramps alone would travel.
    #[snafu(display(
        "{requested} m is shorter than the ramps-only distance of {ramp_distance} m"
    ))]
    RampsOnly { requested: f64, ramp_distance: f64 },

    #[snafu(display(
        "total duration {total_duration} ms cannot hold two ramps of {ramp_duration} ms"
    ))]
    RampOverlap { total_duration: f64, ramp_duration: f64 },

    #[snafu(display("actuators are already claimed by another routine"))]
    Busy,

    #[snafu(display("claim does not belong to these actuators"))]
    NotOwner,

    #[snafu(display("no trigger named `{name}`"))]
    UnknownTrigger { name: String },
}

/// Failures of a [`crate::store::CurveStore`]. None of these are fatal to a
/// move: the materializer logs them and carries on in memory.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    #[snafu(display("curve store is unavailable for `{key}`"))]
    Unavailable { key: String },

    #[snafu(display("no stored curve named `{key}`"))]
    Missing { key: String },

    #[snafu(display("stored curve is corrupt at line {line}: {reason}"))]
    Corrupt { line: usize, reason: &'static str },
}
