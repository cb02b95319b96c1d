use core::{future::Future, time::Duration};

use smooth_drive::hardware::{ActuatorSink, Clock, EncoderSource};
use vexide::{
    prelude::*,
    time::{Instant, sleep},
};

/// Green cartridge output speed.
pub const GREEN_MAX_RPM: f64 = 200.0;

/// A V5 smart motor driven by velocity commands.
pub struct VexMotor {
    motor: Motor,
    max_rpm: f64,
}

impl VexMotor {
    pub fn green(port: SmartPort, direction: Direction) -> Self {
        Self {
            motor: Motor::new(port, Gearset::Green, direction),
            max_rpm: GREEN_MAX_RPM,
        }
    }

    pub fn brake_hold(&mut self) {
        let _ = self.motor.brake(BrakeMode::Hold);
    }
}

impl ActuatorSink for VexMotor {
    fn set_velocity(&mut self, rpm: f64) {
        let rpm = rpm.clamp(-self.max_rpm, self.max_rpm);
        let _ = self.motor.set_velocity(libm::round(rpm) as i32);
    }
}

impl EncoderSource for VexMotor {
    fn reset_position(&mut self) {
        let _ = self.motor.reset_position();
    }

    fn position(&self) -> f64 {
        self.motor
            .position()
            .map(|p| p.as_revolutions())
            .unwrap_or_default()
    }
}

/// Brain clock; `now` counts from program start.
#[derive(Copy, Clone)]
pub struct VexClock {
    start: Instant,
}

impl VexClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for VexClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn delay(&self, duration: Duration) -> impl Future<Output = ()> {
        sleep(duration)
    }
}
