//! ═══════════════════════════════════════════════════════════════════════════════
//! ENGINE — Lockstep Tick Context
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! One explicit context struct owns all four subsystems — no module-level
//! singletons, no hidden global state. A single logical clock advances
//! everything in lockstep inside `step`:
//!
//!   coherence → recovery (when the metric warrants) → stabilization → ring
//!
//! The ring decays independently of recovery state. After every step an
//! immutable snapshot is rebuilt; external status readers consume snapshots
//! taken at tick boundaries, never live structures.
//! ═══════════════════════════════════════════════════════════════════════════════

use serde::Serialize;

use crate::coherence::{CoherenceInputs, CoherenceReport, Monitor, Zone};
use crate::config::KeelConfig;
use crate::journal::{Journal, JournalEvent, Severity};
use crate::recovery::{Orchestrator, PressureZone, RecoveryReport};
use crate::ring::{EntryId, SigilRing, TickReport};
use crate::stabilize::{Coordinator, ReactivationEvent, StabilizationReport};

/// Everything the engine consumes in one tick
#[derive(Debug, Clone)]
pub struct EngineInputs {
    pub coherence: CoherenceInputs,
    pub reactivations: Vec<ReactivationEvent>,
    pub pressure_zone: PressureZone,
}

impl Default for EngineInputs {
    fn default() -> Self {
        Self {
            coherence: CoherenceInputs::default(),
            reactivations: Vec::new(),
            pressure_zone: PressureZone::Green,
        }
    }
}

/// Everything the engine produced in one tick
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub tick: u64,
    pub coherence: CoherenceReport,
    pub recovery: Option<RecoveryReport>,
    pub stabilization: StabilizationReport,
    pub ring: TickReport,
}

/// Immutable status snapshot taken at a tick boundary
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub tick: u64,
    pub metric: f64,
    pub zone: Zone,
    pub emergency_active: bool,
    pub recovering: bool,
    pub ring_len: usize,
    pub ring_capacity: usize,
    pub ring_entropy: f64,
    pub system_temperature: f64,
    pub active_cooldowns: usize,
    pub active_locks: usize,
    pub episode_count: usize,
    pub clamped_inputs: u64,
}

/// The tick-processing context. Constructed once and handed to the host
/// loop; owns every piece of mutable state.
pub struct TickEngine {
    tick: u64,
    ring: SigilRing,
    monitor: Monitor,
    stabilizer: Coordinator,
    recovery: Orchestrator,
    journal: Journal,
    critical_threshold: f64,
    last_clamped: u64,
    was_emergency: bool,
    snapshot: EngineSnapshot,
}

impl TickEngine {
    pub fn new(config: &KeelConfig, journal: Journal) -> Self {
        let ring = SigilRing::new(config.ring.clone());
        let monitor = Monitor::new(config.coherence.clone());
        let stabilizer = Coordinator::new(config.stabilize.clone());
        let recovery = Orchestrator::new(config.recovery.clone());
        let snapshot = EngineSnapshot {
            tick: 0,
            metric: monitor.metric(),
            zone: Zone::from_metric(monitor.metric()),
            emergency_active: false,
            recovering: false,
            ring_len: 0,
            ring_capacity: ring.capacity(),
            ring_entropy: 0.0,
            system_temperature: ring.system_temperature(),
            active_cooldowns: 0,
            active_locks: 0,
            episode_count: 0,
            clamped_inputs: 0,
        };
        Self {
            tick: 0,
            ring,
            monitor,
            stabilizer,
            recovery,
            journal,
            critical_threshold: config.recovery.critical_threshold,
            last_clamped: 0,
            was_emergency: false,
            snapshot,
        }
    }

    /// Advance all subsystems one logical tick, in lockstep.
    pub fn step(&mut self, inputs: EngineInputs) -> StepReport {
        self.tick += 1;
        let tick = self.tick;

        let coherence = self.monitor.tick(&inputs.coherence);

        // Recovery runs whenever the metric is unhealthy, and keeps running
        // through an open episode so its exit window fills.
        let recovery = if coherence.metric < self.critical_threshold
            || self.recovery.is_recovering()
        {
            // Locked ids are suppressed from reinforcement.
            let candidates: Vec<EntryId> = self
                .ring
                .entry_ids()
                .into_iter()
                .filter(|&id| !self.stabilizer.is_locked(id, tick))
                .collect();
            Some(self.recovery.on_drop(
                coherence.metric,
                tick,
                &candidates,
                inputs.pressure_zone,
                &mut self.ring,
            ))
        } else {
            None
        };

        let stabilization = self.stabilizer.evaluate(&inputs.reactivations, tick);
        let ring = self.ring.tick();

        self.journal_step(tick, &coherence, &recovery, &stabilization, &ring, inputs.pressure_zone);
        self.snapshot = self.build_snapshot(tick, &coherence);

        StepReport {
            tick,
            coherence,
            recovery,
            stabilization,
            ring,
        }
    }

    /// Latest boundary snapshot. Cheap to clone, safe to hand out.
    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshot.clone()
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn ring(&self) -> &SigilRing {
        &self.ring
    }

    /// Mutable ring access for admission between ticks
    pub fn ring_mut(&mut self) -> &mut SigilRing {
        &mut self.ring
    }

    pub fn is_recovering(&self) -> bool {
        self.recovery.is_recovering()
    }

    fn build_snapshot(&self, tick: u64, coherence: &CoherenceReport) -> EngineSnapshot {
        EngineSnapshot {
            tick,
            metric: coherence.metric,
            zone: coherence.zone,
            emergency_active: coherence.emergency_active,
            recovering: self.recovery.is_recovering(),
            ring_len: self.ring.len(),
            ring_capacity: self.ring.capacity(),
            ring_entropy: self.ring.system_entropy(),
            system_temperature: self.ring.system_temperature(),
            active_cooldowns: self.stabilizer.active_cooldowns(),
            active_locks: self.stabilizer.active_locks(),
            episode_count: self.recovery.episode_count(),
            clamped_inputs: self.monitor.clamped_inputs() + self.ring.clamped_inputs(),
        }
    }

    fn journal_step(
        &mut self,
        tick: u64,
        coherence: &CoherenceReport,
        recovery: &Option<RecoveryReport>,
        stabilization: &StabilizationReport,
        ring: &TickReport,
        pressure_zone: PressureZone,
    ) {
        if !self.journal.is_enabled() {
            return;
        }

        self.journal.log(
            JournalEvent::new(Severity::Info, "engine", "step")
                .with_tick(tick)
                .with_detail(serde_json::json!({
                    "metric": coherence.metric,
                    "zone": coherence.zone.name(),
                    "tension": coherence.tension,
                    "ring_entropy": ring.entropy,
                    "active": ring.active_count,
                })),
        );

        let clamped = self.monitor.clamped_inputs() + self.ring.clamped_inputs();
        if clamped > self.last_clamped {
            self.journal.log(
                JournalEvent::new(Severity::Debug, "engine", "inputs_clamped")
                    .with_tick(tick)
                    .with_detail(serde_json::json!({ "total": clamped })),
            );
            self.last_clamped = clamped;
        }

        if coherence.emergency_active && !self.was_emergency {
            self.journal.log(
                JournalEvent::new(Severity::Warn, "coherence", "emergency_engaged")
                    .with_tick(tick)
                    .with_detail(serde_json::json!({ "metric": coherence.metric })),
            );
        }
        self.was_emergency = coherence.emergency_active;

        if let Some(recovery) = recovery {
            if recovery.initiated {
                self.journal.log(
                    JournalEvent::new(Severity::Warn, "recovery", "episode_opened")
                        .with_tick(tick)
                        .with_detail(serde_json::json!({
                            "metric": coherence.metric,
                            "pressure_zone": pressure_zone.name(),
                            "expected_efficacy": recovery.expected_efficacy,
                        })),
                );
            } else if !recovery.recovering {
                self.journal.log(
                    JournalEvent::new(Severity::Info, "recovery", "episode_closed")
                        .with_tick(tick),
                );
            }
        }

        if !stabilization.stabilized.is_empty() {
            self.journal.log(
                JournalEvent::new(Severity::Info, "stabilize", "cooldowns_applied")
                    .with_tick(tick)
                    .with_detail(serde_json::json!({
                        "stabilized": stabilization.stabilized.len(),
                        "locked": stabilization.locked.len(),
                    })),
            );
        }

        if !ring.dropped.is_empty() {
            self.journal.log(
                JournalEvent::new(Severity::Debug, "ring", "entries_evicted")
                    .with_tick(tick)
                    .with_detail(serde_json::json!({ "dropped": ring.dropped.len() })),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> TickEngine {
        TickEngine::new(&KeelConfig::default(), Journal::disabled())
    }

    fn healthy_inputs() -> EngineInputs {
        EngineInputs {
            coherence: CoherenceInputs {
                alignment: 0.7,
                entropy_index: 0.6,
                pressure: 0.2,
                mood_entropy: 0.2,
                sigil_entropy: 0.2,
                bloom_entropy: 0.2,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_step_advances_all_clocks_in_lockstep() {
        let mut engine = engine();
        engine.ring_mut().insert(0.4, 0.6, 100, None);
        for _ in 0..5 {
            engine.step(healthy_inputs());
        }
        assert_eq!(engine.current_tick(), 5);
        assert_eq!(engine.ring().current_tick(), 5);
        assert_eq!(engine.snapshot().tick, 5);
    }

    #[test]
    fn test_healthy_metric_skips_recovery() {
        let mut engine = engine();
        let report = engine.step(healthy_inputs());
        assert!(report.recovery.is_none());
        assert!(!engine.is_recovering());
    }

    #[test]
    fn test_unhealthy_metric_engages_recovery() {
        let mut engine = engine();
        let harsh = EngineInputs {
            coherence: CoherenceInputs {
                alignment: 0.9,
                entropy_index: 0.1,
                pressure: 0.95,
                mood_entropy: 0.9,
                sigil_entropy: 0.9,
                bloom_entropy: 0.9,
                external_confidence: Some(0.0),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut engaged = false;
        for _ in 0..10 {
            let report = engine.step(harsh.clone());
            if report.recovery.is_some() {
                engaged = true;
            }
        }
        assert!(engaged);
        assert!(engine.is_recovering());
    }

    #[test]
    fn test_snapshot_reflects_boundary_state() {
        let mut engine = engine();
        engine.ring_mut().insert(0.5, 0.8, 100, None);
        let report = engine.step(healthy_inputs());
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.tick, report.tick);
        assert_eq!(snapshot.metric, report.coherence.metric);
        assert_eq!(snapshot.ring_len, report.ring.active_count);
        assert_eq!(snapshot.ring_capacity, 256);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut engine = engine();
        engine.step(healthy_inputs());
        let json = serde_json::to_string(&engine.snapshot()).unwrap();
        assert!(json.contains("\"metric\""));
        assert!(json.contains("\"zone\""));
    }
}
