//! Open-loop curve playback.
//!
//! The player commands one sample per tick and never skips: if the task
//! wakes up late the move simply takes longer.

use alloc::sync::Arc;
use core::{
    cell::RefCell,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use log::{debug, info};

use crate::{
    config::{self, MotionConfig, WheelGeometry},
    curve::{CurveSample, MotionCurve, TravelDirection},
    error::MotionError,
    hardware::{ActuatorGroup, Clock, EncoderSource, StopGuard},
    ownership::Claim,
    triggers::TriggerManager,
};

/// Shared stop flag, checked by the player and holds at every tick.
#[derive(Debug, Default, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Complete,
    Cancelled,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlaybackReport {
    pub outcome: PlaybackOutcome,
    pub ticks_played: usize,
    /// Signed distance implied by the commanded speeds, in metres.
    pub commanded_distance: f64,
    /// Signed distance reported by the encoders, in metres.
    pub measured_distance: f64,
    pub elapsed: Duration,
}

/// Cursor over a curve during one playback.
#[derive(Debug)]
pub struct PlaybackSession<'a> {
    curve: &'a MotionCurve,
    next: usize,
    started: Duration,
}

impl<'a> PlaybackSession<'a> {
    pub fn new(curve: &'a MotionCurve, started: Duration) -> Self {
        Self {
            curve,
            next: 0,
            started,
        }
    }

    /// Next sample in tick order, or `None` once the curve is exhausted.
    pub fn advance(&mut self) -> Option<&'a CurveSample> {
        let sample = self.curve.samples().get(self.next)?;
        self.next += 1;
        Some(sample)
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.curve.len()
    }

    pub fn current_tick(&self) -> usize {
        self.next
    }

    pub fn started(&self) -> Duration {
        self.started
    }
}

pub struct ProfilePlayer<C> {
    clock: C,
    wheel: WheelGeometry,
    tick: Duration,
    direction: TravelDirection,
}

impl<C: Clock> ProfilePlayer<C> {
    pub fn new(clock: C, wheel: WheelGeometry, tick: Duration) -> Result<Self, MotionError> {
        wheel.validate()?;
        config::validate_tick(tick)?;
        Ok(Self {
            clock,
            wheel,
            tick,
            direction: TravelDirection::Forward,
        })
    }

    pub fn from_config(clock: C, config: &MotionConfig) -> Result<Self, MotionError> {
        Self::new(clock, config.wheel, config.tick)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn direction(&self) -> TravelDirection {
        self.direction
    }

    /// Flips every following playback without touching the curves.
    pub fn set_direction(&mut self, direction: TravelDirection) {
        self.direction = direction;
    }

    /// Plays `curve` on `group`, blocking the calling task until the curve
    /// is exhausted or `cancel` is set. The group is always left at zero.
    pub async fn play<G: ActuatorGroup + EncoderSource>(
        &self,
        group: &RefCell<G>,
        claim: &Claim,
        curve: &MotionCurve,
        cancel: &CancelToken,
    ) -> Result<PlaybackReport, MotionError> {
        self.run(group, claim, curve, cancel, |_| {}).await
    }

    /// Like [`ProfilePlayer::play`], also firing `triggers` as the move
    /// progresses and passing their actions to `on_fire`.
    pub async fn play_with_triggers<G, A>(
        &self,
        group: &RefCell<G>,
        claim: &Claim,
        curve: &MotionCurve,
        cancel: &CancelToken,
        triggers: &mut TriggerManager<A>,
        mut on_fire: impl FnMut(A),
    ) -> Result<PlaybackReport, MotionError>
    where
        G: ActuatorGroup + EncoderSource,
        A: Copy + 'static,
    {
        self.run(group, claim, curve, cancel, |sample| {
            let mut fired = triggers.check_tick(sample.tick);
            fired.extend(triggers.check_distance(sample.distance));
            for action in fired {
                on_fire(action);
            }
        })
        .await
    }

    async fn run<G: ActuatorGroup + EncoderSource>(
        &self,
        group: &RefCell<G>,
        claim: &Claim,
        curve: &MotionCurve,
        cancel: &CancelToken,
        mut on_sample: impl FnMut(&CurveSample),
    ) -> Result<PlaybackReport, MotionError> {
        {
            let mut group = group.borrow_mut();
            group.lock().check(claim)?;
            group.reset_position();
        }
        let stop = StopGuard::new(group);

        let factor = self.direction.factor();
        let meters_per_tick = self.wheel.meters_per_rpm_ms() * config::tick_ms(self.tick);
        let mut session = PlaybackSession::new(curve, self.clock.now());
        let mut commanded_distance = 0.0;
        info!(
            "playing {} samples ({} ms) {}",
            curve.len(),
            curve.total_duration(),
            self.direction.tag()
        );

        let outcome = loop {
            if session.is_finished() {
                break PlaybackOutcome::Complete;
            }
            self.clock.delay(self.tick).await;
            if cancel.is_cancelled() {
                break PlaybackOutcome::Cancelled;
            }
            let Some(sample) = session.advance() else {
                break PlaybackOutcome::Complete;
            };
            let speed = sample.speed * factor;
            group.borrow_mut().write_velocity(speed);
            commanded_distance += speed * meters_per_tick;
            on_sample(sample);
        };

        stop.stop();
        let measured_distance = self.wheel.revolutions_to_meters(group.borrow().position());

        let report = PlaybackReport {
            outcome,
            ticks_played: session.current_tick(),
            commanded_distance,
            measured_distance,
            elapsed: self.clock.now().saturating_sub(session.started()),
        };
        match outcome {
            PlaybackOutcome::Complete => debug!("playback complete: {report:?}"),
            PlaybackOutcome::Cancelled => info!(
                "playback cancelled after {} of {} ticks",
                report.ticks_played,
                curve.len()
            ),
        }
        Ok(report)
    }
}
