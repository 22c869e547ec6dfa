//! ═══════════════════════════════════════════════════════════════════════════════
//! RECOVERY — Coherence Drop Orchestration
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Two states: Normal and Recovering. A metric below the critical threshold
//! flips the machine into recovery; it stays there until the metric has held
//! healthy for a full observation window.
//!
//! While recovering the orchestrator composes the other subsystems rather
//! than mutating them directly: it hints the host loop to stretch its tick,
//! fires the reflection hook, and asks the ring (through its public API) to
//! reinforce the candidates that are structurally trustworthy — deep and
//! low-instability.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::ring::{EntryId, SigilRing};
use crate::stabilize::Action;
use crate::stats::RollingWindow;

/// Recovery engages below this metric
pub const CRITICAL_METRIC: f64 = 0.5;

/// Effective tick stretch while recovering (scheduling hint, not logical time)
const TICK_SLOWDOWN: f64 = 1.5;

/// Stabilizer selection: convolution is the [0,1] analogue of lineage depth,
/// measured in depth-units of ten
const DEPTH_SCALE: f64 = 10.0;
const DEPTH_GATE: f64 = 3.0;
/// Per-entry instability ceiling for a trustworthy stabilizer
const INSTABILITY_GATE: f64 = 0.4;

/// Pressure band reported by the caller; scales expected efficacy only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressureZone {
    Green,
    Amber,
    Red,
    Critical,
}

impl PressureZone {
    pub fn efficacy(&self) -> f64 {
        match self {
            PressureZone::Green => 1.0,
            PressureZone::Amber => 0.7,
            PressureZone::Red => 0.4,
            PressureZone::Critical => 0.2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PressureZone::Green => "green",
            PressureZone::Amber => "amber",
            PressureZone::Red => "red",
            PressureZone::Critical => "critical",
        }
    }
}

/// Collaborator notified when a recovery episode opens
pub trait ReflectionHook {
    fn on_recovery_started(&mut self, tick: u64, metric: f64);
}

/// One closed recovery episode
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryEpisode {
    pub start_tick: u64,
    pub end_tick: u64,
    pub duration: u64,
}

/// Result of one orchestrator pass
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryReport {
    /// True only on the tick that opened an episode
    pub initiated: bool,
    pub recovering: bool,
    pub actions: Vec<Action>,
    /// Wall-clock hint: stretched while recovering
    pub effective_tick: u64,
    /// Pressure-zone-scaled efficacy expectation, logged not enforced
    pub expected_efficacy: f64,
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    pub critical_threshold: f64,
    /// Healthy ticks required (full window) before an episode closes
    pub window: usize,
    /// Closed episodes retained
    pub episode_cap: usize,
    /// Saturation boost applied to each selected stabilizer
    pub stabilizer_boost: f64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            critical_threshold: CRITICAL_METRIC,
            window: 10,
            episode_cap: 32,
            stabilizer_boost: 0.2,
        }
    }
}

/// Normal/Recovering state machine over the coherence metric
pub struct Orchestrator {
    config: RecoveryConfig,
    recovering: bool,
    recovery_start_tick: u64,
    consecutive_drops: u32,
    window: RollingWindow,
    episodes: VecDeque<RecoveryEpisode>,
    hook: Option<Box<dyn ReflectionHook + Send>>,
}

impl Orchestrator {
    pub fn new(config: RecoveryConfig) -> Self {
        let window = config.window.max(1);
        Self {
            config,
            recovering: false,
            recovery_start_tick: 0,
            consecutive_drops: 0,
            window: RollingWindow::new(window),
            episodes: VecDeque::new(),
            hook: None,
        }
    }

    /// Attach the reflection collaborator, fired once per episode open
    pub fn with_hook(mut self, hook: Box<dyn ReflectionHook + Send>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Feed one metric observation and, when recovering, reinforce the
    /// trustworthy candidates through the ring's public API.
    pub fn on_drop(
        &mut self,
        metric: f64,
        tick: u64,
        candidate_ids: &[EntryId],
        pressure_zone: PressureZone,
        ring: &mut SigilRing,
    ) -> RecoveryReport {
        let metric = metric.clamp(0.0, 1.0);
        self.window.push(metric);
        if metric < self.config.critical_threshold {
            self.consecutive_drops += 1;
        } else {
            self.consecutive_drops = 0;
        }

        let mut initiated = false;
        if !self.recovering && metric < self.config.critical_threshold {
            self.recovering = true;
            self.recovery_start_tick = tick;
            initiated = true;
            if let Some(hook) = self.hook.as_mut() {
                hook.on_recovery_started(tick, metric);
            }
        }

        let mut actions = Vec::new();
        let effective_tick = if self.recovering {
            actions.push(Action::SlowClock {
                factor: TICK_SLOWDOWN,
            });
            for &id in candidate_ids {
                if let Some(view) = ring.inspect(id) {
                    let deep = view.convolution * DEPTH_SCALE > DEPTH_GATE;
                    let trustworthy = view.instability < INSTABILITY_GATE;
                    if deep && trustworthy && ring.amplify(id, self.config.stabilizer_boost) {
                        actions.push(Action::Reinforce(id));
                    }
                }
            }

            // Close the episode once the metric has held healthy for the
            // whole window.
            let threshold = self.config.critical_threshold;
            if self.window.all_full(|v| v >= threshold) {
                self.recovering = false;
                self.push_episode(tick);
            }
            tick.saturating_mul(3) / 2
        } else {
            tick
        };

        RecoveryReport {
            initiated,
            recovering: self.recovering,
            actions,
            effective_tick,
            expected_efficacy: pressure_zone.efficacy(),
        }
    }

    pub fn is_recovering(&self) -> bool {
        self.recovering
    }

    pub fn consecutive_drops(&self) -> u32 {
        self.consecutive_drops
    }

    pub fn episodes(&self) -> impl Iterator<Item = &RecoveryEpisode> {
        self.episodes.iter()
    }

    pub fn episode_count(&self) -> usize {
        self.episodes.len()
    }

    fn push_episode(&mut self, end_tick: u64) {
        if self.episodes.len() >= self.config.episode_cap {
            self.episodes.pop_front();
        }
        self.episodes.push_back(RecoveryEpisode {
            start_tick: self.recovery_start_tick,
            end_tick,
            duration: end_tick.saturating_sub(self.recovery_start_tick),
        });
    }
}
