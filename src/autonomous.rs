use alloc::{vec, vec::Vec};
use core::{f64::consts::PI, time::Duration};

use log::{info, warn};
use smooth_drive::{
    MotionError, MotionRequest, PlaybackReport,
    hardware::{ActuatorGroup, Clock, EncoderSource},
    tasks::HoldPlan,
};

use crate::{
    CONFIG, Robot, TRACK_WIDTH,
    plan::{Action, Mechanism},
};

const PIVOT_RPM: f64 = 50.0;
const PIVOT_TIMEOUT: Duration = Duration::from_secs(3);

const fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Skills-style routine: deploy, collect two rows of cubes and stack them.
pub fn routine() -> Vec<Action> {
    vec![
        Action::Hold(Mechanism::Intake, "deploy", HoldPlan::single(ms(0), -200.0, ms(1000))),
        Action::Wait(1200),
        // back off the wall; too short for a profiled move
        Action::Hold(Mechanism::Drivetrain, "nudge", HoldPlan::single(ms(0), -100.0, ms(150))),
        Action::JoinHolds,
        Action::Hold(Mechanism::Intake, "consume", HoldPlan::single(ms(0), 200.0, ms(2150))),
        Action::Wait(100),
        Action::SmoothMove(1.15),
        Action::Pivot(-95.0),
        Action::Hold(
            Mechanism::Intake,
            "consume more",
            HoldPlan::nested(ms(200), 200.0, ms(1800), ms(100), ms(400)),
        ),
        Action::Wait(100),
        Action::SmoothMove(1.3),
        Action::SmoothMove(-1.0),
        Action::Pivot(-135.0),
        Action::Hold(Mechanism::Intake, "outsome", HoldPlan::single(ms(700), -200.0, ms(500))),
        Action::TriggerOnDistance(0.4, "tray tilt"),
        Action::SmoothMove(0.5),
        Action::Wait(750),
        Action::TriggerNow("tray stop"),
        Action::Wait(1250),
        Action::Hold(Mechanism::Intake, "tray up", HoldPlan::single(ms(700), -200.0, ms(500))),
        Action::JoinHolds,
    ]
}

impl Robot {
    /// Drives `distance` metres along a Gaussian speed profile, open loop.
    pub async fn smooth_move(&mut self, distance: f64) -> Result<PlaybackReport, MotionError> {
        let shape = CONFIG.schedule.for_distance(distance);
        let curve = self
            .materializer
            .materialize(&MotionRequest::new(distance), &shape, false)?;
        let claim = self.drivetrain.borrow().claim()?;

        let report = self
            .player
            .play_with_triggers(
                &*self.drivetrain,
                &claim,
                &curve,
                &self.motion_cancel,
                &mut self.triggers,
                |command| self.mechanisms.apply(command),
            )
            .await?;
        info!(
            "smooth move {distance} m: {:?} after {} ticks, commanded {:.3} m, measured {:.3} m",
            report.outcome, report.ticks_played, report.commanded_distance, report.measured_distance
        );
        Ok(report)
    }

    /// Open-loop turn in place: run the sides in opposite directions until
    /// the wheels have covered the arc for `degrees`.
    pub async fn pivot(&mut self, degrees: f64) -> Result<(), MotionError> {
        let arc = TRACK_WIDTH / 2.0 * degrees.to_radians().abs();
        let target = arc / (2.0 * PI * CONFIG.wheel.wheel_radius);
        let (left, right) = if degrees >= 0.0 {
            (PIVOT_RPM, -PIVOT_RPM)
        } else {
            (-PIVOT_RPM, PIVOT_RPM)
        };

        let claim = self.drivetrain.borrow().claim()?;
        self.drivetrain.borrow_mut().reset_position();
        let start = self.clock.now();
        loop {
            let turned = {
                let drive = self.drivetrain.borrow();
                (drive.left_position().abs() + drive.right_position().abs()) / 2.0
            };
            if turned >= target || self.motion_cancel.is_cancelled() {
                break;
            }
            if self.clock.now() - start > PIVOT_TIMEOUT {
                warn!("pivot {degrees} deg timed out at {turned:.2} of {target:.2} rev");
                break;
            }
            self.drivetrain.borrow_mut().set_sides(&claim, left, right)?;
            self.clock.delay(CONFIG.tick).await;
        }
        self.drivetrain.borrow_mut().set_sides(&claim, 0.0, 0.0)
    }
}
