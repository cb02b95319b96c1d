//! Persistent curve storage.
//!
//! Curves are stored as plain text: a header line `"<total_ms> <tick_ms>"`
//! followed by one `"<speed> <distance>"` line per sample in tick order.

use alloc::{collections::btree_map::BTreeMap, string::String, vec::Vec};
use core::{fmt::Write, str::FromStr, time::Duration};

use snafu::OptionExt;

use crate::{
    curve::{CurveKey, CurveSample, MotionCurve},
    error::{CorruptSnafu, MissingSnafu, StoreError, UnavailableSnafu},
};

/// Somewhere to keep materialized curves between sessions.
pub trait CurveStore {
    fn exists(&self, key: &CurveKey) -> bool;
    fn read(&self, key: &CurveKey) -> Result<MotionCurve, StoreError>;
    fn write(&mut self, key: &CurveKey, curve: &MotionCurve) -> Result<(), StoreError>;
}

/// File name a file-backed store keeps `key` under, relative to its root.
pub fn file_name(key: &CurveKey) -> String {
    let mut name = key.name();
    name.push_str(".txt");
    name
}

pub fn encode(curve: &MotionCurve) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", curve.total_duration(), curve.tick().as_millis());
    for sample in curve.samples() {
        let _ = writeln!(out, "{} {}", sample.speed, sample.distance);
    }
    out
}

fn field<T: FromStr>(
    token: Option<&str>,
    line: usize,
    reason: &'static str,
) -> Result<T, StoreError> {
    token
        .and_then(|t| t.parse().ok())
        .context(CorruptSnafu { line, reason })
}

pub fn decode(text: &str) -> Result<MotionCurve, StoreError> {
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));

    let (_, header) = lines.next().context(CorruptSnafu {
        line: 1_usize,
        reason: "missing header",
    })?;
    let mut header = header.split_whitespace();
    let total_duration: f64 = field(header.next(), 1, "bad total duration")?;
    let tick_ms: u64 = field(header.next(), 1, "bad tick")?;

    let mut samples = Vec::new();
    for (line, text) in lines {
        if text.trim().is_empty() {
            continue;
        }
        let mut fields = text.split_whitespace();
        let speed = field(fields.next(), line, "bad speed")?;
        let distance = field(fields.next(), line, "bad distance")?;
        samples.push(CurveSample {
            tick: samples.len(),
            speed,
            distance,
        });
    }

    Ok(MotionCurve::new(
        total_duration,
        Duration::from_millis(tick_ms),
        samples,
    ))
}

/// In-memory store holding the encoded text of each curve.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    curves: BTreeMap<CurveKey, String>,
}

impl MemoryStore {
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Stores raw text under `key` without encoding it.
    pub fn insert_raw(&mut self, key: CurveKey, text: String) {
        self.curves.insert(key, text);
    }
}

impl CurveStore for MemoryStore {
    fn exists(&self, key: &CurveKey) -> bool {
        self.curves.contains_key(key)
    }

    fn read(&self, key: &CurveKey) -> Result<MotionCurve, StoreError> {
        let text = self
            .curves
            .get(key)
            .context(MissingSnafu { key: key.name() })?;
        decode(text)
    }

    fn write(&mut self, key: &CurveKey, curve: &MotionCurve) -> Result<(), StoreError> {
        self.curves.insert(*key, encode(curve));
        Ok(())
    }
}

/// A store that is never available; every curve lives for the session only.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStore;

impl CurveStore for NoStore {
    fn exists(&self, _key: &CurveKey) -> bool {
        false
    }

    fn read(&self, key: &CurveKey) -> Result<MotionCurve, StoreError> {
        MissingSnafu { key: key.name() }.fail()
    }

    fn write(&mut self, key: &CurveKey, _curve: &MotionCurve) -> Result<(), StoreError> {
        UnavailableSnafu { key: key.name() }.fail()
    }
}
