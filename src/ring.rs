//! ═══════════════════════════════════════════════════════════════════════════════
//! RING — Bounded Symbolic Entry Store
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Admission-controlled ring of transient symbolic entries. Three forces keep
//! it bounded:
//! - Admission: inserts are refused while aggregate entropy sits above the
//!   configured threshold (or the ring is full). Refusal is a value, not an
//!   error — callers retry next tick.
//! - Decay: every tick bleeds saturation and cools temperature.
//! - Eviction: when entropy overshoots, the least defensible entries
//!   (low charge, high complexity) are dropped first.
//!
//! Aggregate entropy is the single admission-control signal; transient
//! excursions above the threshold are corrected within one tick.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::stats::float_cmp;

/// Empirical normalization factor for aggregate entropy (entropy divides by
/// `capacity * ENTROPY_NORM_FACTOR`). A tunable, not a derived invariant.
pub const ENTROPY_NORM_FACTOR: f64 = 0.5;

/// Age contribution to an entry's entropy: +10% per 10k ticks of age
const AGE_WEIGHT: f64 = 0.1;
const AGE_SCALE: f64 = 10_000.0;

/// Per-tick saturation decay base rate
const DECAY_BASE: f64 = 0.01;

/// Per-tick temperature cooling multiplier
const TEMP_COOLING: f64 = 0.99;

/// Entries at or below this saturation are spent and removed
const SATURATION_FLOOR: f64 = 0.01;

/// System temperature chases `entropy * TEMP_TARGET_FACTOR` with this inertia
const TEMP_TARGET_FACTOR: f64 = 0.8;
const TEMP_INERTIA: f64 = 0.1;

/// Eviction runs until entropy falls below this fraction of the threshold
const EVICTION_HEADROOM: f64 = 0.9;

/// Amplification heats an entry at half the rate it charges it
const AMPLIFY_TEMP_RATIO: f64 = 0.5;

/// Unique handle for a ring entry
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry:{}", self.0)
    }
}

/// A transient symbolic entry
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: EntryId,
    /// Structural complexity (0.0 simple .. 1.0 deeply convoluted)
    pub convolution: f64,
    /// Charge/strength; the entry dies when this bleeds out
    pub saturation: f64,
    /// Volatility inherited from the system at birth
    pub temperature: f64,
    pub created_tick: u64,
    pub expiry_tick: u64,
    pub seed: Option<String>,
}

impl Entry {
    /// Un-normalized instability score: the entry's contribution to
    /// aggregate entropy before age weighting and capacity normalization
    pub fn instability(&self) -> f64 {
        self.saturation * self.convolution * (1.0 + self.temperature)
    }
}

/// Read-only view of an entry for external selection logic
#[derive(Debug, Clone, Serialize)]
pub struct EntryView {
    pub id: EntryId,
    pub convolution: f64,
    pub saturation: f64,
    pub temperature: f64,
    pub age_ticks: u64,
    pub instability: f64,
}

/// Ring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingConfig {
    /// Maximum live entries; never exceeded
    pub capacity: usize,
    /// Admission gate: inserts refused while entropy exceeds this
    pub entropy_threshold: f64,
    /// System temperature at construction
    pub initial_temperature: f64,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            entropy_threshold: 0.7,
            initial_temperature: 0.25,
        }
    }
}

/// Result of one ring tick
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub active_count: usize,
    pub entropy: f64,
    pub temperature: f64,
    /// Entries removed by TTL or saturation floor
    pub expired: Vec<EntryId>,
    /// Entries evicted by the saturation manager
    pub dropped: Vec<EntryId>,
}

/// Bounded admission/eviction ring for symbolic entries
#[derive(Debug)]
pub struct SigilRing {
    capacity: usize,
    entropy_threshold: f64,
    current_tick: u64,
    system_temperature: f64,
    entries: VecDeque<Entry>,
    next_id: u64,
    clamped_inputs: u64,
}

impl SigilRing {
    pub fn new(config: RingConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            capacity,
            entropy_threshold: config.entropy_threshold.clamp(f64::EPSILON, 1.0),
            current_tick: 0,
            system_temperature: config.initial_temperature.clamp(0.0, 1.0),
            entries: VecDeque::with_capacity(capacity),
            next_id: 1,
            clamped_inputs: 0,
        }
    }

    /// Admit a new entry, or refuse with `None` when the entropy gate is
    /// closed, the ring is full, or the TTL is zero. Out-of-range numeric
    /// inputs are clamped and counted, never rejected.
    pub fn insert(
        &mut self,
        convolution: f64,
        saturation: f64,
        ttl_ticks: u64,
        seed: Option<&str>,
    ) -> Option<EntryId> {
        if ttl_ticks == 0 {
            return None;
        }
        let convolution = self.clamp_unit(convolution);
        let saturation = self.clamp_unit(saturation);

        if self.system_entropy() > self.entropy_threshold {
            return None;
        }
        // Overflow is prevented here by admission, never by silent drop.
        if self.entries.len() >= self.capacity {
            return None;
        }

        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.entries.push_back(Entry {
            id,
            convolution,
            saturation,
            temperature: self.system_temperature,
            created_tick: self.current_tick,
            expiry_tick: self.current_tick + ttl_ticks,
            seed: seed.map(String::from),
        });
        self.settle_temperature();

        debug_assert!(self.entries.len() <= self.capacity);
        Some(id)
    }

    /// Aggregate instability over all live entries, normalized by
    /// `capacity * ENTROPY_NORM_FACTOR` and clamped to [0, 1].
    pub fn system_entropy(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let norm = self.capacity as f64 * ENTROPY_NORM_FACTOR;
        let total: f64 = self
            .entries
            .iter()
            .map(|e| {
                let age = (self.current_tick - e.created_tick) as f64;
                e.instability() * (1.0 + AGE_WEIGHT * age / AGE_SCALE)
            })
            .sum();
        (total / norm).clamp(0.0, 1.0)
    }

    /// Advance the ring one tick: decay, expire, evict, settle temperature.
    pub fn tick(&mut self) -> TickReport {
        self.current_tick += 1;

        // Step 1: decay. Hot, convoluted entries bleed charge fastest.
        for entry in self.entries.iter_mut() {
            let temperature_factor = 1.0 + entry.temperature;
            entry.saturation =
                (entry.saturation - DECAY_BASE * (1.0 + entry.convolution) * temperature_factor)
                    .max(0.0);
            entry.temperature *= TEMP_COOLING;
        }

        // Step 2: expire on TTL or spent charge.
        let mut expired = Vec::new();
        let tick = self.current_tick;
        self.entries.retain(|e| {
            let keep = e.expiry_tick > tick && e.saturation > SATURATION_FLOOR;
            if !keep {
                expired.push(e.id);
            }
            keep
        });

        // Step 3: saturation manager. Evict instability-first until the
        // entropy excursion is corrected.
        let mut dropped = Vec::new();
        while self.system_entropy() > EVICTION_HEADROOM * self.entropy_threshold {
            let victim = self
                .entries
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    float_cmp(
                        &(a.saturation - a.convolution),
                        &(b.saturation - b.convolution),
                    )
                })
                .map(|(i, _)| i);
            match victim {
                Some(i) => {
                    if let Some(e) = self.entries.remove(i) {
                        dropped.push(e.id);
                    }
                }
                None => break,
            }
        }

        // Step 4: settle system temperature toward the entropy target.
        self.settle_temperature();

        debug_assert!(self.entries.len() <= self.capacity);
        TickReport {
            active_count: self.entries.len(),
            entropy: self.system_entropy(),
            temperature: self.system_temperature,
            expired,
            dropped,
        }
    }

    /// Entries whose convolution lies within `tol` of the target.
    /// Linear scan, like every per-tick pass here; fine at the few hundred
    /// entries this ring is sized for, an index would be warranted past ~10k.
    pub fn find_resonant(&self, target_convolution: f64, tol: f64) -> Vec<EntryId> {
        self.entries
            .iter()
            .filter(|e| (e.convolution - target_convolution).abs() <= tol)
            .map(|e| e.id)
            .collect()
    }

    /// Reinforce one entry. No-op (`false`) when the id is absent.
    pub fn amplify(&mut self, id: EntryId, boost: f64) -> bool {
        let boost = boost.clamp(0.0, 1.0);
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.saturation = (entry.saturation + boost).min(1.0);
                entry.temperature = (entry.temperature + boost * AMPLIFY_TEMP_RATIO).min(1.0);
                true
            }
            None => false,
        }
    }

    /// Read-only view of a live entry
    pub fn inspect(&self, id: EntryId) -> Option<EntryView> {
        self.entries.iter().find(|e| e.id == id).map(|e| EntryView {
            id: e.id,
            convolution: e.convolution,
            saturation: e.saturation,
            temperature: e.temperature,
            age_ticks: self.current_tick - e.created_tick,
            instability: e.instability(),
        })
    }

    /// Ids of all live entries, oldest first
    pub fn entry_ids(&self) -> Vec<EntryId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn system_temperature(&self) -> f64 {
        self.system_temperature
    }

    /// Count of numeric inputs silently clamped into [0, 1]
    pub fn clamped_inputs(&self) -> u64 {
        self.clamped_inputs
    }

    fn settle_temperature(&mut self) {
        let target = self.system_entropy() * TEMP_TARGET_FACTOR;
        self.system_temperature += TEMP_INERTIA * (target - self.system_temperature);
        self.system_temperature = self.system_temperature.clamp(0.0, 1.0);
    }

    fn clamp_unit(&mut self, v: f64) -> f64 {
        if !(0.0..=1.0).contains(&v) || v.is_nan() {
            self.clamped_inputs += 1;
            if v.is_nan() {
                return 0.0;
            }
        }
        v.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_ring() -> SigilRing {
        SigilRing::new(RingConfig {
            capacity: 5,
            entropy_threshold: 0.5,
            initial_temperature: 0.25,
        })
    }

    #[test]
    fn test_insert_respects_entropy_gate() {
        let mut ring = small_ring();
        let mut accepted = 0;
        let mut rejected = 0;
        for _ in 0..6 {
            match ring.insert(0.9, 0.9, 100, None) {
                Some(_) => accepted += 1,
                None => rejected += 1,
            }
        }
        // Heavy entries saturate the gate after two admissions; the 5th and
        // 6th calls (and earlier) must be refused.
        assert!(accepted >= 1 && accepted < 5);
        assert!(rejected >= 2);
        assert!(ring.system_entropy() > 0.5);
    }

    #[test]
    fn test_tick_corrects_entropy_excursion() {
        let mut ring = small_ring();
        for _ in 0..6 {
            ring.insert(0.9, 0.9, 100, None);
        }
        let before = ring.len();
        let report = ring.tick();
        assert!(!report.dropped.is_empty(), "eviction must show progress");
        assert!(ring.len() < before);
        assert!(ring.system_entropy() <= 0.45 + 1e-9);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let mut ring = SigilRing::new(RingConfig {
            capacity: 3,
            entropy_threshold: 1.0,
            initial_temperature: 0.0,
        });
        for _ in 0..10 {
            ring.insert(0.1, 0.2, 50, None);
        }
        assert!(ring.len() <= 3);
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut ring = small_ring();
        assert!(ring.insert(0.5, 0.5, 0, None).is_none());
        assert_eq!(ring.len(), 0);
    }

    #[test]
    fn test_out_of_range_inputs_clamped_not_rejected() {
        let mut ring = small_ring();
        let id = ring.insert(1.7, -0.3, 10, None).unwrap();
        let view = ring.inspect(id).unwrap();
        assert_eq!(view.convolution, 1.0);
        assert_eq!(view.saturation, 0.0);
        assert_eq!(ring.clamped_inputs(), 2);
    }

    #[test]
    fn test_entries_inherit_system_temperature() {
        let mut ring = small_ring();
        let id = ring.insert(0.3, 0.6, 10, Some("seed-a")).unwrap();
        let view = ring.inspect(id).unwrap();
        assert!((view.temperature - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_consecutive_ticks_never_raise_saturation() {
        let mut ring = small_ring();
        let id = ring.insert(0.4, 0.8, 100, None).unwrap();
        ring.tick();
        let after_first = ring.inspect(id).unwrap().saturation;
        ring.tick();
        let after_second = ring.inspect(id).unwrap().saturation;
        assert!(after_second <= after_first);
        assert!(after_first < 0.8);
    }

    #[test]
    fn test_ttl_expiry() {
        let mut ring = small_ring();
        let id = ring.insert(0.2, 0.9, 2, None).unwrap();
        assert!(ring.tick().expired.is_empty());
        let report = ring.tick();
        assert_eq!(report.expired, vec![id]);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_spent_entries_expire() {
        let mut ring = small_ring();
        let id = ring.insert(0.5, 0.02, 100, None).unwrap();
        let report = ring.tick();
        assert!(report.expired.contains(&id));
    }

    #[test]
    fn test_find_resonant() {
        let mut ring = SigilRing::new(RingConfig {
            capacity: 8,
            entropy_threshold: 1.0,
            initial_temperature: 0.0,
        });
        let a = ring.insert(0.30, 0.4, 50, None).unwrap();
        let b = ring.insert(0.35, 0.4, 50, None).unwrap();
        let _far = ring.insert(0.90, 0.4, 50, None).unwrap();
        let hits = ring.find_resonant(0.32, 0.05);
        assert_eq!(hits, vec![a, b]);
    }

    #[test]
    fn test_amplify_missing_id_is_noop() {
        let mut ring = small_ring();
        assert!(!ring.amplify(EntryId(999), 0.2));
    }

    #[test]
    fn test_amplify_raises_charge() {
        let mut ring = small_ring();
        let id = ring.insert(0.4, 0.5, 50, None).unwrap();
        assert!(ring.amplify(id, 0.2));
        let view = ring.inspect(id).unwrap();
        assert!((view.saturation - 0.7).abs() < 1e-9);
        assert!(view.temperature > 0.25);
    }
}
