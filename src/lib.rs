//! Smooth point-to-point drivetrain moves for a VEX V5 robot.
//!
//! A move of a fixed distance is turned into a Gaussian-ramped speed curve
//! ([`gaussian`], [`solver`]), sampled once per control tick into a
//! [`curve::MotionCurve`] that is memoized and persisted ([`curve`],
//! [`store`]), and replayed open-loop against the drive motors
//! ([`player`]).
//!
//! Everything in this crate is hardware independent. The firmware binary
//! (`--features firmware`) plugs vexide devices into the traits in
//! [`hardware`].

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod curve;
pub mod error;
pub mod gaussian;
pub mod hardware;
pub mod ownership;
pub mod player;
pub mod solver;
pub mod store;
pub mod tasks;
pub mod triggers;
pub mod units;

pub use config::{MotionConfig, ShapeParameters, ShapeSchedule, WheelGeometry};
pub use curve::{CurveKey, CurveMaterializer, CurveSample, MotionCurve, MotionRequest, TravelDirection};
pub use error::{MotionError, StoreError};
pub use gaussian::GaussianProfile;
pub use player::{CancelToken, PlaybackOutcome, PlaybackReport, ProfilePlayer};
pub use solver::ProfileSolver;
