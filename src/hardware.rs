//! Device seams and actuator groups.
//!
//! The firmware implements [`ActuatorSink`], [`EncoderSource`] and [`Clock`]
//! over vexide devices; tests use the fakes in `mock`.

use core::{cell::RefCell, future::Future, time::Duration};

use crate::{
    error::MotionError,
    ownership::{Claim, ClaimLock},
};

/// A single velocity-controlled motor. Commands are fire and forget.
pub trait ActuatorSink {
    /// Commands `rpm`; negative is backwards.
    fn set_velocity(&mut self, rpm: f64);
}

/// Position feedback, in motor revolutions since the last reset.
pub trait EncoderSource {
    fn reset_position(&mut self);
    fn position(&self) -> f64;
}

pub trait Clock {
    /// Monotonic time since some fixed point.
    fn now(&self) -> Duration;

    /// Suspends the calling task for `duration`, letting other tasks run.
    fn delay(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// A set of actuators commanded together behind one [`ClaimLock`].
pub trait ActuatorGroup {
    fn lock(&self) -> &ClaimLock;

    /// Writes `rpm` to every actuator without an ownership check.
    fn write_velocity(&mut self, rpm: f64);

    fn claim(&self) -> Result<Claim, MotionError> {
        self.lock().try_claim()
    }

    fn set_velocity(&mut self, claim: &Claim, rpm: f64) -> Result<(), MotionError> {
        self.lock().check(claim)?;
        self.write_velocity(rpm);
        Ok(())
    }

    /// Writes `rpm` under a claim held for this one command. Fails with
    /// [`MotionError::Busy`] while a routine owns the group.
    fn command_unclaimed(&mut self, rpm: f64) -> Result<(), MotionError> {
        let claim = self.claim()?;
        self.set_velocity(&claim, rpm)
    }
}

/// Stops a group when dropped, so a routine abandoned mid-move (e.g. by a
/// competition mode switch) does not leave its last speed on the motors.
pub struct StopGuard<'a, G: ActuatorGroup> {
    group: &'a RefCell<G>,
    armed: bool,
}

impl<'a, G: ActuatorGroup> StopGuard<'a, G> {
    pub fn new(group: &'a RefCell<G>) -> Self {
        Self { group, armed: true }
    }

    /// Writes the final zero now.
    pub fn stop(mut self) {
        self.armed = false;
        self.group.borrow_mut().write_velocity(0.0);
    }

    /// Drops the guard without writing, for when the group is already at zero.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl<G: ActuatorGroup> Drop for StopGuard<'_, G> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // may run while unwinding from a panic that still holds a borrow
        if let Ok(mut group) = self.group.try_borrow_mut() {
            group.write_velocity(0.0);
        }
    }
}

fn average_position<A: EncoderSource>(motors: &[A]) -> f64 {
    if motors.is_empty() {
        return 0.0;
    }
    motors.iter().map(EncoderSource::position).sum::<f64>() / motors.len() as f64
}

/// `N` motors that always run at the same speed, e.g. an intake.
pub struct MotorGroup<A, const N: usize> {
    motors: [A; N],
    lock: ClaimLock,
}

impl<A: ActuatorSink, const N: usize> MotorGroup<A, N> {
    pub fn new(motors: [A; N]) -> Self {
        Self {
            motors,
            lock: ClaimLock::new(),
        }
    }

    pub fn motors(&self) -> &[A; N] {
        &self.motors
    }
}

impl<A: ActuatorSink, const N: usize> ActuatorGroup for MotorGroup<A, N> {
    fn lock(&self) -> &ClaimLock {
        &self.lock
    }

    fn write_velocity(&mut self, rpm: f64) {
        for motor in self.motors.iter_mut() {
            motor.set_velocity(rpm);
        }
    }
}

impl<A: EncoderSource, const N: usize> EncoderSource for MotorGroup<A, N> {
    fn reset_position(&mut self) {
        for motor in self.motors.iter_mut() {
            motor.reset_position();
        }
    }

    fn position(&self) -> f64 {
        average_position(&self.motors)
    }
}

/// Left and right drive sides. Straight moves command both sides alike.
pub struct Drivetrain<A, const L: usize, const R: usize> {
    left: [A; L],
    right: [A; R],
    lock: ClaimLock,
}

impl<A: ActuatorSink, const L: usize, const R: usize> Drivetrain<A, L, R> {
    pub fn new(left: [A; L], right: [A; R]) -> Self {
        Self {
            left,
            right,
            lock: ClaimLock::new(),
        }
    }

    pub fn left(&self) -> &[A; L] {
        &self.left
    }

    pub fn right(&self) -> &[A; R] {
        &self.right
    }

    /// Commands each side separately, for turns and tank drive.
    pub fn set_sides(&mut self, claim: &Claim, left: f64, right: f64) -> Result<(), MotionError> {
        self.lock.check(claim)?;
        self.write_sides(left, right);
        Ok(())
    }

    /// Unchecked side command, used by driver control when no routine owns
    /// the drivetrain.
    pub fn write_sides(&mut self, left: f64, right: f64) {
        for motor in self.left.iter_mut() {
            motor.set_velocity(left);
        }
        for motor in self.right.iter_mut() {
            motor.set_velocity(right);
        }
    }
}

impl<A: EncoderSource, const L: usize, const R: usize> Drivetrain<A, L, R> {
    pub fn left_position(&self) -> f64 {
        average_position(&self.left)
    }

    pub fn right_position(&self) -> f64 {
        average_position(&self.right)
    }
}

impl<A: ActuatorSink, const L: usize, const R: usize> ActuatorGroup for Drivetrain<A, L, R> {
    fn lock(&self) -> &ClaimLock {
        &self.lock
    }

    fn write_velocity(&mut self, rpm: f64) {
        self.write_sides(rpm, rpm);
    }
}

impl<A: EncoderSource, const L: usize, const R: usize> EncoderSource for Drivetrain<A, L, R> {
    fn reset_position(&mut self) {
        for motor in self.left.iter_mut().chain(self.right.iter_mut()) {
            motor.reset_position();
        }
    }

    fn position(&self) -> f64 {
        if L + R == 0 {
            return 0.0;
        }
        let total: f64 = self
            .left
            .iter()
            .chain(self.right.iter())
            .map(EncoderSource::position)
            .sum();
        total / (L + R) as f64
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use alloc::vec::Vec;
    use core::{
        cell::Cell,
        future::{self, Future},
        task::Poll,
        time::Duration,
    };

    use super::{ActuatorSink, Clock, EncoderSource};

    /// Motor that records every command and integrates it as if each command
    /// ran for exactly one `tick`.
    #[derive(Debug, Default)]
    pub struct FakeMotor {
        pub commands: Vec<f64>,
        pub revolutions: f64,
        pub resets: usize,
        tick: Duration,
    }

    impl FakeMotor {
        pub fn ideal(tick: Duration) -> Self {
            Self {
                tick,
                ..Self::default()
            }
        }

        pub fn last(&self) -> Option<f64> {
            self.commands.last().copied()
        }
    }

    impl ActuatorSink for FakeMotor {
        fn set_velocity(&mut self, rpm: f64) {
            self.commands.push(rpm);
            self.revolutions += rpm * self.tick.as_secs_f64() / 60.0;
        }
    }

    impl EncoderSource for FakeMotor {
        fn reset_position(&mut self) {
            self.revolutions = 0.0;
            self.resets += 1;
        }

        fn position(&self) -> f64 {
            self.revolutions
        }
    }

    /// Virtual clock: every delay completes immediately and moves time on by
    /// the requested duration plus `lateness`.
    #[derive(Debug, Default)]
    pub struct ManualClock {
        now: Cell<Duration>,
        lateness: Duration,
        pub delays: Cell<usize>,
    }

    impl ManualClock {
        pub fn late_by(lateness: Duration) -> Self {
            Self {
                lateness,
                ..Self::default()
            }
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Duration {
            self.now.get()
        }

        fn delay(&self, duration: Duration) -> impl Future<Output = ()> {
            self.now.set(self.now.get() + duration + self.lateness);
            self.delays.set(self.delays.get() + 1);
            future::ready(())
        }
    }

    /// Like [`ManualClock`] without lateness, but every delay is pending on
    /// its first poll, so a caller can drop a future mid-move.
    #[derive(Debug, Default)]
    pub struct YieldingClock {
        now: Cell<Duration>,
    }

    impl Clock for YieldingClock {
        fn now(&self) -> Duration {
            self.now.get()
        }

        fn delay(&self, duration: Duration) -> impl Future<Output = ()> {
            self.now.set(self.now.get() + duration);
            let mut yielded = false;
            future::poll_fn(move |cx| {
                if yielded {
                    Poll::Ready(())
                } else {
                    yielded = true;
                    cx.waker().wake_by_ref();
                    Poll::Pending
                }
            })
        }
    }
}
