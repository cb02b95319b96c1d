#![no_main]
#![no_std]
extern crate alloc;
use alloc::{rc::Rc, vec::Vec};
use core::cell::RefCell;

use log::{info, warn};
use smooth_drive::{
    CancelToken, CurveMaterializer, MotionConfig, MotionError, ProfilePlayer,
    hardware::{ActuatorGroup, Drivetrain, MotorGroup},
    triggers::{TriggerDefinition, TriggerManager},
    units,
};
use vexide::prelude::*;

use crate::{
    background::Background,
    devices::{VexClock, VexMotor},
    sd_store::SdCardStore,
};

mod autonomous;
mod background;
mod devices;
mod driver_control;
mod logger;
mod plan;
mod sd_store;

pub type Drive = Drivetrain<VexMotor, 2, 2>;
pub type SingleMotor = MotorGroup<VexMotor, 1>;
pub type Intake = MotorGroup<VexMotor, 2>;

const CONFIG: MotionConfig = MotionConfig::DEFAULT;
/// Distance between the left and right wheel contact patches.
const TRACK_WIDTH: f64 = units::inch(9.55);

/// Things triggers can do while the drivetrain is moving.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MechanismCommand {
    Intake(f64),
    Arm(f64),
    Tray(f64),
}

static TRIGGERS: &[TriggerDefinition<MechanismCommand>] = &[
    TriggerDefinition {
        name: "tray tilt",
        actions: &[MechanismCommand::Tray(60.0)],
    },
    TriggerDefinition {
        name: "tray stop",
        actions: &[MechanismCommand::Tray(0.0)],
    },
    TriggerDefinition {
        name: "arm up",
        actions: &[MechanismCommand::Arm(200.0)],
    },
];

/// Non-drive actuators, each shared with background holds.
pub struct Mechanisms {
    pub arm: Rc<RefCell<SingleMotor>>,
    pub intake: Rc<RefCell<Intake>>,
    pub tray: Rc<RefCell<SingleMotor>>,
}

fn command_unless_claimed<G: ActuatorGroup>(group: &RefCell<G>, rpm: f64) {
    if let Err(err) = group.borrow_mut().command_unclaimed(rpm) {
        warn!("skipping {rpm} rpm command: {err}");
    }
}

impl Mechanisms {
    pub fn apply(&self, command: MechanismCommand) {
        match command {
            MechanismCommand::Intake(rpm) => command_unless_claimed(&self.intake, rpm),
            MechanismCommand::Arm(rpm) => command_unless_claimed(&self.arm, rpm),
            MechanismCommand::Tray(rpm) => command_unless_claimed(&self.tray, rpm),
        }
    }
}

pub struct Robot {
    controller: Controller,
    drivetrain: Rc<RefCell<Drive>>,
    mechanisms: Mechanisms,
    materializer: CurveMaterializer<SdCardStore>,
    player: ProfilePlayer<VexClock>,
    clock: VexClock,
    triggers: TriggerManager<MechanismCommand>,
    background: Vec<Background>,
    motion_cancel: CancelToken,
}

#[vexide::main]
async fn main(peripherals: Peripherals) {
    logger::init(CONFIG.log_level);
    match Robot::new(peripherals) {
        Ok(robot) => robot.compete().await,
        Err(err) => log::error!("motion config rejected: {err}"),
    }
}

impl Robot {
    fn new(peripherals: Peripherals) -> Result<Self, MotionError> {
        let drivetrain = Drivetrain::new(
            [
                VexMotor::green(peripherals.port_3, Direction::Forward),
                VexMotor::green(peripherals.port_4, Direction::Forward),
            ],
            [
                VexMotor::green(peripherals.port_13, Direction::Reverse),
                VexMotor::green(peripherals.port_2, Direction::Reverse),
            ],
        );

        let mut arm = [VexMotor::green(peripherals.port_7, Direction::Forward)];
        let mut intake = [
            VexMotor::green(peripherals.port_5, Direction::Reverse),
            VexMotor::green(peripherals.port_6, Direction::Forward),
        ];
        let mut tray = [VexMotor::green(peripherals.port_11, Direction::Forward)];
        for motor in arm.iter_mut().chain(intake.iter_mut()).chain(tray.iter_mut()) {
            motor.brake_hold();
        }

        let clock = VexClock::new();
        let robot = Robot {
            controller: peripherals.primary_controller,
            drivetrain: Rc::new(RefCell::new(drivetrain)),
            mechanisms: Mechanisms {
                arm: Rc::new(RefCell::new(MotorGroup::new(arm))),
                intake: Rc::new(RefCell::new(MotorGroup::new(intake))),
                tray: Rc::new(RefCell::new(MotorGroup::new(tray))),
            },
            materializer: CurveMaterializer::from_config(&CONFIG, SdCardStore)?,
            player: ProfilePlayer::from_config(clock, &CONFIG)?,
            clock,
            triggers: TriggerManager::new(TRIGGERS),
            background: Vec::new(),
            motion_cancel: CancelToken::new(),
        };
        info!("robot ready, tick {:?}", CONFIG.tick);
        Ok(robot)
    }
}

impl Compete for Robot {
    async fn autonomous(&mut self) {
        self.motion_cancel = CancelToken::new();
        let plan = autonomous::routine();
        self.run_plan(plan).await;
        self.triggers.disarm_all();
    }

    async fn driver(&mut self) {
        self.motion_cancel.cancel();
        self.stop_background().await;
        self.triggers.disarm_all();
        loop {
            let state = self.controller.state().unwrap_or_default();
            self.tank_drive(&state);
            self.mechanism_controls(&state).await;
            self.reap_background();
            sleep(CONFIG.tick).await;
        }
    }
}
