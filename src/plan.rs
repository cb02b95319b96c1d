use alloc::vec::Vec;
use core::time::Duration;

use log::{error, info};
use smooth_drive::{TravelDirection, tasks::HoldPlan, triggers::TriggerCondition};
use vexide::prelude::*;

use crate::Robot;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mechanism {
    Drivetrain,
    Intake,
    Arm,
    Tray,
}

#[derive(Clone, Debug)]
pub enum Action {
    /// Gaussian-profiled straight move of this many metres, negative is backwards.
    SmoothMove(f64),
    /// Turn in place by this many degrees, positive is clockwise.
    Pivot(f64),
    /// Runs a hold on a mechanism in the background.
    Hold(Mechanism, &'static str, HoldPlan),
    /// Waits for every background hold to finish.
    JoinHolds,
    Wait(u64),
    /// Flips the direction of every following smooth move.
    Reverse,
    TriggerOnDistance(f64, &'static str),
    TriggerOnTick(usize, &'static str),
    TriggerNow(&'static str),
}

impl Robot {
    pub async fn run_plan(&mut self, plan: Vec<Action>) {
        for action in plan {
            if self.motion_cancel.is_cancelled() {
                info!("plan cancelled");
                break;
            }
            let result = match action.clone() {
                Action::SmoothMove(distance) => self.smooth_move(distance).await.map(|_| ()),
                Action::Pivot(degrees) => self.pivot(degrees).await,
                Action::Hold(mechanism, name, plan) => self.spawn_hold(mechanism, name, plan).await,
                Action::JoinHolds => {
                    self.join_background().await;
                    Ok(())
                }
                Action::Wait(ms) => {
                    sleep(Duration::from_millis(ms)).await;
                    Ok(())
                }
                Action::Reverse => {
                    let direction = self.player.direction().reversed();
                    self.player.set_direction(direction);
                    Ok(())
                }
                Action::TriggerOnDistance(distance, name) => self
                    .triggers
                    .arm(TriggerCondition::Distance(distance), name),
                Action::TriggerOnTick(tick, name) => {
                    self.triggers.arm(TriggerCondition::Tick(tick), name)
                }
                Action::TriggerNow(name) => self.triggers.trigger_now(name).map(|commands| {
                    for command in commands {
                        self.mechanisms.apply(command);
                    }
                }),
            };
            if let Err(err) = result {
                error!("{action:?} failed: {err}");
            }
        }
        self.player.set_direction(TravelDirection::Forward);
    }
}
