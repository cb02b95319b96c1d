use core::{cell::RefCell, time::Duration};

use smooth_drive::{hardware::ActuatorGroup, tasks::HoldPlan};
use vexide::devices::controller::ControllerState;

use crate::{Robot, devices::GREEN_MAX_RPM, plan::Mechanism};

const DRIVE_DEADBAND: f64 = 0.05;

/// Writes `rpm` unless a background hold owns the group.
fn command_if_free<G: ActuatorGroup>(group: &RefCell<G>, rpm: f64) {
    let mut group = group.borrow_mut();
    if !group.lock().is_claimed() {
        group.write_velocity(rpm);
    }
}

fn deadband(value: f64) -> f64 {
    if value.abs() < DRIVE_DEADBAND { 0.0 } else { value }
}

impl Robot {
    pub fn tank_drive(&mut self, c_state: &ControllerState) {
        let mut drive = self.drivetrain.borrow_mut();
        if drive.lock().is_claimed() {
            return;
        }
        let left = deadband(c_state.left_stick.y()) * GREEN_MAX_RPM;
        let right = deadband(c_state.right_stick.y()) * GREEN_MAX_RPM;
        drive.write_sides(left, right);
    }

    pub async fn mechanism_controls(&mut self, c_state: &ControllerState) {
        let arm = if c_state.button_r1.is_pressed() {
            200.0
        } else if c_state.button_r2.is_pressed() {
            -200.0
        } else {
            0.0
        };
        command_if_free(&self.mechanisms.arm, arm);

        let intake = if c_state.button_l1.is_pressed() {
            200.0
        } else if c_state.button_l2.is_pressed() {
            -150.0
        } else {
            0.0
        };
        command_if_free(&self.mechanisms.intake, intake);

        let tray = if c_state.button_b.is_pressed() {
            -200.0
        } else if c_state.button_x.is_pressed() {
            200.0
        } else if c_state.button_a.is_pressed() {
            50.0
        } else {
            0.0
        };
        command_if_free(&self.mechanisms.tray, tray);

        // drop the stack: spit cubes out, then back away from them
        if c_state.button_down.is_now_pressed() {
            let outtake = HoldPlan::single(Duration::ZERO, -125.0, Duration::from_millis(1500));
            let back_off =
                HoldPlan::single(Duration::from_millis(250), -100.0, Duration::from_millis(1500));
            for (mechanism, name, plan) in [
                (Mechanism::Intake, "outtake", outtake),
                (Mechanism::Drivetrain, "back off", back_off),
            ] {
                if let Err(err) = self.spawn_hold(mechanism, name, plan).await {
                    log::warn!("{name}: {err}");
                }
            }
        }
    }
}
