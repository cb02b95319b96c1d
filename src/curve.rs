//! Discrete motion curves and their memoized materialization.

use alloc::{collections::btree_map::BTreeMap, format, string::String, sync::Arc, vec::Vec};
use core::time::Duration;

use log::{debug, info, warn};

use crate::{
    config::{MotionConfig, ShapeParameters, WheelGeometry},
    error::MotionError,
    gaussian::GaussianProfile,
    solver::ProfileSolver,
    store::CurveStore,
};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TravelDirection {
    #[default]
    Forward,
    Reverse,
}

impl TravelDirection {
    pub const fn factor(self) -> f64 {
        match self {
            Self::Forward => 1.0,
            Self::Reverse => -1.0,
        }
    }

    pub const fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }

    pub const fn tag(self) -> &'static str {
        match self {
            Self::Forward => "fwd",
            Self::Reverse => "rev",
        }
    }
}

/// A request to move a net distance.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MotionRequest {
    /// Signed distance in metres; the sign is the travel direction.
    pub target_distance: f64,
    /// Extra multiplier that flips the move without changing its magnitude.
    pub direction: TravelDirection,
}

impl MotionRequest {
    pub const fn new(target_distance: f64) -> Self {
        Self {
            target_distance,
            direction: TravelDirection::Forward,
        }
    }

    pub const fn reversed(mut self) -> Self {
        self.direction = self.direction.reversed();
        self
    }

    pub fn net_distance(&self) -> f64 {
        self.target_distance * self.direction.factor()
    }

    pub fn net_direction(&self) -> TravelDirection {
        if self.net_distance() < 0.0 {
            TravelDirection::Reverse
        } else {
            TravelDirection::Forward
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CurveSample {
    pub tick: usize,
    /// Signed speed to command during this tick, in rpm.
    pub speed: f64,
    /// Signed running distance at the end of this tick, in metres.
    pub distance: f64,
}

/// A move sampled once per tick, in tick order.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionCurve {
    total_duration: f64,
    tick: Duration,
    samples: Vec<CurveSample>,
}

impl MotionCurve {
    pub fn new(total_duration: f64, tick: Duration, samples: Vec<CurveSample>) -> Self {
        Self {
            total_duration,
            tick,
            samples,
        }
    }

    pub fn empty(tick: Duration) -> Self {
        Self::new(0.0, tick, Vec::new())
    }

    /// Samples `profile` at the start of every tick covering the move.
    ///
    /// The running distance is the sum of `speed x tick`, not the closed-form
    /// distance; it is only used for diagnostics and triggers.
    pub fn from_profile(profile: &GaussianProfile) -> Self {
        let tick_ms = profile.tick_ms();
        let meters_per_tick = profile.wheel().meters_per_rpm_ms() * tick_ms;
        let count = libm::ceil(profile.total_duration() / tick_ms) as usize;

        let mut distance = 0.0;
        let samples = (0..count)
            .map(|tick| {
                let speed = profile.speed_at(tick as f64 * tick_ms);
                distance += speed * meters_per_tick;
                CurveSample {
                    tick,
                    speed,
                    distance,
                }
            })
            .collect();

        Self::new(
            profile.total_duration(),
            Duration::from_millis(tick_ms as u64),
            samples,
        )
    }

    /// Total move time, in ms.
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn samples(&self) -> &[CurveSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Running distance after the last sample.
    pub fn final_distance(&self) -> f64 {
        self.samples.last().map_or(0.0, |s| s.distance)
    }
}

/// Identifies a materialized curve: quantized distance, net direction and a
/// digest of everything else that shapes the curve.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CurveKey {
    pub distance_mm: u64,
    pub direction: TravelDirection,
    pub digest: u64,
}

impl CurveKey {
    pub fn new(
        request: &MotionRequest,
        shape: &ShapeParameters,
        wheel: &WheelGeometry,
        tick: Duration,
    ) -> Self {
        let distance_mm = libm::round(libm::fabs(request.net_distance()) * 1000.0) as u64;
        let mut digest = Fnv1a::default();
        for value in [
            shape.ramp_width,
            shape.ramp_duration,
            shape.cruise_speed,
            shape.vertical_offset,
            wheel.wheel_radius,
        ] {
            digest.write_u64(value.to_bits());
        }
        digest.write_u64(tick.as_millis() as u64);

        Self {
            distance_mm,
            direction: request.net_direction(),
            digest: digest.finish(),
        }
    }

    /// Human readable store identifier, e.g. `smooth_2000mm_fwd_00c0ffee00c0ffee`.
    pub fn name(&self) -> String {
        format!(
            "smooth_{}mm_{}_{:016x}",
            self.distance_mm,
            self.direction.tag(),
            self.digest
        )
    }
}

struct Fnv1a(u64);

impl Default for Fnv1a {
    fn default() -> Self {
        Self(0xcbf2_9ce4_8422_2325)
    }
}

impl Fnv1a {
    fn write_u64(&mut self, value: u64) {
        for byte in value.to_le_bytes() {
            self.0 ^= u64::from(byte);
            self.0 = self.0.wrapping_mul(0x0000_0100_0000_01b3);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

/// Produces curves for move requests, solving each distinct key once.
///
/// Lookups go session memo, then the persistent store, then the solver.
/// Store failures never fail a move; the curve just stays in memory.
pub struct CurveMaterializer<S> {
    solver: ProfileSolver,
    store: S,
    memo: BTreeMap<CurveKey, Arc<MotionCurve>>,
}

impl<S: CurveStore> CurveMaterializer<S> {
    pub fn new(solver: ProfileSolver, store: S) -> Self {
        Self {
            solver,
            store,
            memo: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &MotionConfig, store: S) -> Result<Self, MotionError> {
        config.validate()?;
        Ok(Self::new(ProfileSolver::new(config.wheel, config.tick)?, store))
    }

    pub fn solver(&self) -> &ProfileSolver {
        &self.solver
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn key(&self, request: &MotionRequest, shape: &ShapeParameters) -> CurveKey {
        CurveKey::new(request, shape, self.solver.wheel(), self.solver.tick())
    }

    /// Returns the curve for `request`, regenerating it when
    /// `force_regenerate` is set or nothing usable is cached.
    pub fn materialize(
        &mut self,
        request: &MotionRequest,
        shape: &ShapeParameters,
        force_regenerate: bool,
    ) -> Result<Arc<MotionCurve>, MotionError> {
        let key = self.key(request, shape);

        if !force_regenerate {
            if let Some(curve) = self.memo.get(&key) {
                debug!("{}: reusing session curve", key.name());
                return Ok(Arc::clone(curve));
            }
            if self.store.exists(&key) {
                match self.store.read(&key) {
                    Ok(curve) => {
                        debug!("{}: loaded from store", key.name());
                        let curve = Arc::new(curve);
                        self.memo.insert(key, Arc::clone(&curve));
                        return Ok(curve);
                    }
                    Err(err) => warn!("{}: {err}, regenerating", key.name()),
                }
            }
        }

        let profile = self.solver.solve(request.net_distance(), shape)?;
        let curve = Arc::new(MotionCurve::from_profile(&profile));
        info!(
            "{}: generated {} samples over {} ms",
            key.name(),
            curve.len(),
            curve.total_duration()
        );

        if let Err(err) = self.store.write(&key, &curve) {
            warn!("{}: {err}, keeping curve in memory only", key.name());
        }
        self.memo.insert(key, Arc::clone(&curve));
        Ok(curve)
    }
}

impl<S> core::fmt::Debug for CurveMaterializer<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CurveMaterializer")
            .field("solver", &self.solver)
            .field("memoized", &self.memo.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::StoreError,
        store::{MemoryStore, NoStore},
    };

    fn shape() -> ShapeParameters {
        ShapeParameters::new(libm::sqrt(4000.0), 130.0, 200.0)
    }

    fn materializer<S: CurveStore>(store: S) -> CurveMaterializer<S> {
        CurveMaterializer::from_config(&MotionConfig::DEFAULT, store).unwrap()
    }

    #[test]
    fn second_request_reuses_the_first_curve() {
        let mut m = materializer(MemoryStore::default());
        let request = MotionRequest::new(2.0);
        let first = m.materialize(&request, &shape(), false).unwrap();
        let second = m.materialize(&request, &shape(), false).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let forced = m.materialize(&request, &shape(), true).unwrap();
        assert!(!Arc::ptr_eq(&first, &forced));
        assert_eq!(*first, *forced);
    }

    #[test]
    fn curve_reaches_target_within_a_tick() {
        let mut m = materializer(MemoryStore::default());
        let curve = m.materialize(&MotionRequest::new(2.0), &shape(), false).unwrap();
        let tick_distance = WheelGeometry::new(0.0524).meters_per_rpm_ms() * 200.0 * 10.0;
        assert!((curve.final_distance() - 2.0).abs() < tick_distance);
        assert_eq!(curve.tick(), Duration::from_millis(10));
        assert_eq!(
            curve.len() as f64,
            libm::ceil(curve.total_duration() / 10.0)
        );
    }

    #[test]
    fn samples_are_in_tick_order() {
        let mut m = materializer(MemoryStore::default());
        let curve = m.materialize(&MotionRequest::new(1.5), &shape(), false).unwrap();
        for (i, sample) in curve.samples().iter().enumerate() {
            assert_eq!(sample.tick, i);
        }
        assert!(curve.samples().windows(2).all(|w| w[1].distance >= w[0].distance));
    }

    #[test]
    fn reverse_request_negates_every_sample() {
        let mut m = materializer(MemoryStore::default());
        let fwd = m.materialize(&MotionRequest::new(2.0), &shape(), false).unwrap();
        let rev = m
            .materialize(&MotionRequest::new(2.0).reversed(), &shape(), false)
            .unwrap();
        assert_eq!(fwd.len(), rev.len());
        for (f, r) in fwd.samples().iter().zip(rev.samples()) {
            assert_eq!(f.speed, -r.speed);
            assert_eq!(f.distance, -r.distance);
        }
    }

    #[test]
    fn net_direction_shares_a_key() {
        let m = materializer(MemoryStore::default());
        let a = m.key(&MotionRequest::new(-2.0), &shape());
        let b = m.key(&MotionRequest::new(2.0).reversed(), &shape());
        assert_eq!(a, b);
        assert_eq!(a.direction, TravelDirection::Reverse);
        assert!(a.name().starts_with("smooth_2000mm_rev_"));

        let retuned = m.key(&MotionRequest::new(-2.0), &shape().with_vertical_offset(1.0));
        assert_ne!(a.digest, retuned.digest);
    }

    #[test]
    fn too_short_request_is_an_error_and_nothing_is_stored() {
        let mut m = materializer(MemoryStore::default());
        let err = m
            .materialize(&MotionRequest::new(0.13), &shape(), false)
            .unwrap_err();
        assert!(matches!(err, MotionError::RampsOnly { .. }));
        assert!(m.store().is_empty());
    }

    #[test]
    fn unavailable_store_falls_back_to_memory() {
        let mut m = materializer(NoStore);
        let request = MotionRequest::new(2.0);
        let first = m.materialize(&request, &shape(), false).unwrap();
        assert!(!first.is_empty());
        let second = m.materialize(&request, &shape(), false).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn persisted_curve_is_used_without_solving() {
        let request = MotionRequest::new(2.0);
        let mut store = MemoryStore::default();
        let key = materializer(MemoryStore::default()).key(&request, &shape());
        let planted = MotionCurve::new(
            20.0,
            Duration::from_millis(10),
            alloc::vec![
                CurveSample { tick: 0, speed: 1.5, distance: 0.25 },
                CurveSample { tick: 1, speed: 0.5, distance: 0.5 },
            ],
        );
        store.write(&key, &planted).unwrap();

        let mut m = materializer(store);
        let curve = m.materialize(&request, &shape(), false).unwrap();
        assert_eq!(*curve, planted);
    }

    #[test]
    fn fresh_session_reads_back_what_was_written() {
        let request = MotionRequest::new(-1.3);
        let mut first = materializer(MemoryStore::default());
        let generated = first.materialize(&request, &shape(), false).unwrap();

        let mut second = materializer(first.into_store());
        let loaded = second.materialize(&request, &shape(), false).unwrap();
        assert_eq!(*generated, *loaded);
    }

    #[test]
    fn corrupt_store_entry_is_regenerated() {
        let request = MotionRequest::new(2.0);
        let mut store = MemoryStore::default();
        let key = materializer(MemoryStore::default()).key(&request, &shape());
        store.insert_raw(key, String::from("not a curve"));
        assert_eq!(
            store.read(&key).unwrap_err(),
            StoreError::Corrupt {
                line: 1,
                reason: "bad total duration"
            }
        );

        let mut m = materializer(store);
        let curve = m.materialize(&request, &shape(), false).unwrap();
        assert!((curve.final_distance() - 2.0).abs() < 0.011);
        assert_eq!(m.store().read(&key).unwrap(), *curve);
    }
}
