use alloc::{rc::Rc, vec::Vec};
use core::cell::RefCell;

use log::{debug, info, warn};
use smooth_drive::{
    CancelToken, MotionError, PlaybackOutcome,
    hardware::ActuatorGroup,
    tasks::{HoldPlan, run_hold},
};
use vexide::task::{Task, spawn};

use crate::{CONFIG, Robot, devices::VexClock, plan::Mechanism};

/// A hold running in its own task. The handle can be awaited or cancelled.
pub struct Background {
    pub name: &'static str,
    pub mechanism: Mechanism,
    pub cancel: CancelToken,
    pub task: Task<Result<PlaybackOutcome, MotionError>>,
}

fn spawn_on<G: ActuatorGroup + 'static>(
    group: &Rc<RefCell<G>>,
    plan: HoldPlan,
    clock: VexClock,
    cancel: CancelToken,
) -> Result<Task<Result<PlaybackOutcome, MotionError>>, MotionError> {
    let claim = group.borrow().claim()?;
    let group = Rc::clone(group);
    Ok(spawn(async move {
        run_hold(&*group, &claim, &plan, &clock, CONFIG.tick, &cancel).await
    }))
}

async fn finish(job: Background) {
    match job.task.await {
        Ok(outcome) => info!("{}: {outcome:?}", job.name),
        Err(err) => warn!("{}: {err}", job.name),
    }
}

impl Robot {
    /// Starts `plan` on `mechanism`. A hold already running on the same
    /// mechanism is cancelled first, so the newest request wins.
    pub async fn spawn_hold(
        &mut self,
        mechanism: Mechanism,
        name: &'static str,
        plan: HoldPlan,
    ) -> Result<(), MotionError> {
        let (stale, running): (Vec<_>, Vec<_>) = self
            .background
            .drain(..)
            .partition(|job| job.mechanism == mechanism);
        self.background = running;
        for job in stale {
            debug!("{} superseded by {name}", job.name);
            job.cancel.cancel();
            finish(job).await;
        }

        let cancel = CancelToken::new();
        let task = match mechanism {
            Mechanism::Drivetrain => spawn_on(&self.drivetrain, plan, self.clock, cancel.clone()),
            Mechanism::Intake => {
                spawn_on(&self.mechanisms.intake, plan, self.clock, cancel.clone())
            }
            Mechanism::Arm => spawn_on(&self.mechanisms.arm, plan, self.clock, cancel.clone()),
            Mechanism::Tray => spawn_on(&self.mechanisms.tray, plan, self.clock, cancel.clone()),
        }?;
        self.background.push(Background {
            name,
            mechanism,
            cancel,
            task,
        });
        Ok(())
    }

    /// Waits for every hold to run to its end.
    pub async fn join_background(&mut self) {
        for job in self.background.drain(..).collect::<Vec<_>>() {
            finish(job).await;
        }
    }

    /// Cancels every hold and waits for each to stop its mechanism.
    pub async fn stop_background(&mut self) {
        for job in &self.background {
            job.cancel.cancel();
        }
        self.join_background().await;
    }

    /// Forgets handles of holds that already ran to completion.
    pub fn reap_background(&mut self) {
        self.background.retain(|job| !job.task.is_finished());
    }
}
