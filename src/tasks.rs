//! Timed actuator holds, e.g. running the intake for a while in the
//! background of a drive move.

use alloc::{vec, vec::Vec};
use core::{cell::RefCell, time::Duration};

use log::debug;

use crate::{
    error::MotionError,
    hardware::{ActuatorGroup, Clock, StopGuard},
    ownership::Claim,
    player::{CancelToken, PlaybackOutcome},
};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HoldStep {
    /// Idle time before the hold starts.
    pub wait: Duration,
    /// Speed commanded for the hold, in rpm.
    pub speed: f64,
    pub hold_for: Duration,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HoldPlan {
    pub steps: Vec<HoldStep>,
}

impl HoldPlan {
    pub fn single(delay: Duration, speed: f64, hold_for: Duration) -> Self {
        Self {
            steps: vec![HoldStep {
                wait: delay,
                speed,
                hold_for,
            }],
        }
    }

    /// Hold, stop for `pause`, then hold again at the same speed.
    pub fn nested(
        delay: Duration,
        speed: f64,
        hold_for: Duration,
        pause: Duration,
        second_hold: Duration,
    ) -> Self {
        let mut plan = Self::single(delay, speed, hold_for);
        plan.steps.push(HoldStep {
            wait: pause,
            speed,
            hold_for: second_hold,
        });
        plan
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.wait + s.hold_for).sum()
    }
}

/// Runs `plan` on `group`, commanding once per `tick` and stopping the group
/// after every step. Cancellation is checked after each suspension and
/// always leaves the group at zero.
pub async fn run_hold<G: ActuatorGroup, C: Clock>(
    group: &RefCell<G>,
    claim: &Claim,
    plan: &HoldPlan,
    clock: &C,
    tick: Duration,
    cancel: &CancelToken,
) -> Result<PlaybackOutcome, MotionError> {
    group.borrow().lock().check(claim)?;
    let stop = StopGuard::new(group);

    let outcome = 'steps: {
        for step in &plan.steps {
            if !step.wait.is_zero() {
                clock.delay(step.wait).await;
                if cancel.is_cancelled() {
                    break 'steps PlaybackOutcome::Cancelled;
                }
            }

            let ticks = step.hold_for.as_nanos().div_ceil(tick.as_nanos().max(1));
            for _ in 0..ticks {
                group.borrow_mut().write_velocity(step.speed);
                clock.delay(tick).await;
                if cancel.is_cancelled() {
                    break 'steps PlaybackOutcome::Cancelled;
                }
            }
            group.borrow_mut().write_velocity(0.0);
        }
        PlaybackOutcome::Complete
    };

    match outcome {
        PlaybackOutcome::Complete => stop.disarm(),
        PlaybackOutcome::Cancelled => {
            stop.stop();
            debug!("hold cancelled");
        }
    }
    Ok(outcome)
}
