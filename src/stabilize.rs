//! ═══════════════════════════════════════════════════════════════════════════════
//! STABILIZE — Reactivation Rate Limiting
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Entries that keep getting reactivated — recently, repeatedly, and without
//! drifting semantically — are runaway feedback candidates. The coordinator
//! gates them behind cooldowns, and behind longer lineage locks when the
//! severity multiplier runs high.
//!
//! The trigger is a hard conjunction, not a weighted score: all three
//! conditions must hold before any action is taken. Severity only scales the
//! duration of the response, never whether it happens.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ring::EntryId;

/// Trigger conjunction thresholds
const REUSE_TRIGGER: u32 = 3;
const RECENCY_TRIGGER: u64 = 50;
const DRIFT_TRIGGER: f64 = 0.2;

/// Severity multiplier pieces
const INTENSITY_FLOOR: f64 = 0.5;
const INTENSITY_CEIL: f64 = 2.0;
const REUSE_HEAVY: u32 = 5;
const REUSE_RUNAWAY: u32 = 10;
const RECENCY_TIGHT: u64 = 25;
const DRIFT_FROZEN: f64 = 0.1;
const AMBIENT_CHAOS: f64 = 0.8;

/// One observed reactivation of a ring entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactivationEvent {
    pub id: EntryId,
    pub reuse_count: u32,
    pub ticks_since_last_use: u64,
    pub semantic_drift: f64,
    pub ambient_entropy: f64,
}

/// Typed corrective action. Replaces the string-tag intents of earlier
/// renditions of this system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Suppress an entry from further stabilization for the cooldown window
    Deprioritize(EntryId),
    /// Reinforce an entry through the ring's public API
    Reinforce(EntryId),
    /// Lineage lock: long-duration suppression, in ticks
    Lock(EntryId, u64),
    /// Scheduling hint: stretch the effective tick by this factor
    SlowClock { factor: f64 },
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilizeConfig {
    /// Cooldown duration at intensity 1.0, in ticks
    pub cooldown_base: u64,
    /// Lineage lock duration at intensity 1.0, in ticks
    pub lock_base: u64,
    /// Locks apply only above this intensity
    pub lock_intensity_gate: f64,
}

impl Default for StabilizeConfig {
    fn default() -> Self {
        Self {
            cooldown_base: 250,
            lock_base: 500,
            lock_intensity_gate: 1.3,
        }
    }
}

/// Result of evaluating a batch of reactivation events
#[derive(Debug, Clone, Serialize)]
pub struct StabilizationReport {
    /// Ids placed under a fresh cooldown this evaluation
    pub stabilized: Vec<EntryId>,
    /// Subset additionally placed under a lineage lock
    pub locked: Vec<EntryId>,
    pub actions: Vec<Action>,
}

/// Cooldown / lineage-lock bookkeeping over entry ids
#[derive(Debug, Default)]
pub struct Coordinator {
    config: StabilizeConfig,
    /// id → expiry tick; the id is suppressed while tick < expiry
    cooldowns: HashMap<EntryId, u64>,
    locks: HashMap<EntryId, u64>,
}

impl Coordinator {
    pub fn new(config: StabilizeConfig) -> Self {
        Self {
            config,
            cooldowns: HashMap::new(),
            locks: HashMap::new(),
        }
    }

    /// Evaluate a batch of reactivation events at the given tick.
    /// Ids already cooling are skipped outright (no duplicate stabilization).
    pub fn evaluate(
        &mut self,
        events: &[ReactivationEvent],
        current_tick: u64,
    ) -> StabilizationReport {
        self.purge_expired(current_tick);

        let mut report = StabilizationReport {
            stabilized: Vec::new(),
            locked: Vec::new(),
            actions: Vec::new(),
        };

        for event in events {
            if self.is_cooling(event.id, current_tick) {
                continue;
            }
            if !triggered(event) {
                continue;
            }

            let intensity = severity(event);
            let cooldown_ticks = (self.config.cooldown_base as f64 * intensity).round() as u64;
            self.cooldowns
                .insert(event.id, current_tick + cooldown_ticks);
            report.stabilized.push(event.id);
            report.actions.push(Action::Deprioritize(event.id));

            if intensity > self.config.lock_intensity_gate {
                let lock_ticks = (self.config.lock_base as f64 * intensity).round() as u64;
                self.locks.insert(event.id, current_tick + lock_ticks);
                report.locked.push(event.id);
                report.actions.push(Action::Lock(event.id, lock_ticks));
            }
        }

        report
    }

    /// True while the id sits under a cooldown (`tick < expiry`)
    pub fn is_cooling(&self, id: EntryId, current_tick: u64) -> bool {
        self.cooldowns
            .get(&id)
            .is_some_and(|&expiry| current_tick < expiry)
    }

    /// True while the id sits under a lineage lock
    pub fn is_locked(&self, id: EntryId, current_tick: u64) -> bool {
        self.locks
            .get(&id)
            .is_some_and(|&expiry| current_tick < expiry)
    }

    /// Lazy cleanup, O(active locks) — not O(entries)
    pub fn purge_expired(&mut self, current_tick: u64) {
        self.cooldowns.retain(|_, &mut expiry| expiry > current_tick);
        self.locks.retain(|_, &mut expiry| expiry > current_tick);
    }

    pub fn active_cooldowns(&self) -> usize {
        self.cooldowns.len()
    }

    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }
}

/// All three conditions must hold — a logical AND, never a weighted score
fn triggered(event: &ReactivationEvent) -> bool {
    event.reuse_count > REUSE_TRIGGER
        && event.ticks_since_last_use < RECENCY_TRIGGER
        && event.semantic_drift < DRIFT_TRIGGER
}

/// Severity multiplier in [0.5, 2.0]. High ambient chaos lowers the need
/// for suppression.
fn severity(event: &ReactivationEvent) -> f64 {
    let mut intensity: f64 = 1.0;
    if event.reuse_count > REUSE_HEAVY {
        intensity *= 1.2;
    }
    if event.reuse_count > REUSE_RUNAWAY {
        intensity *= 1.5;
    }
    if event.ticks_since_last_use < RECENCY_TIGHT {
        intensity *= 1.3;
    }
    if event.semantic_drift < DRIFT_FROZEN {
        intensity *= 1.2;
    }
    if event.ambient_entropy > AMBIENT_CHAOS {
        intensity *= 0.8;
    }
    intensity.clamp(INTENSITY_FLOOR, INTENSITY_CEIL)
}
