//! ═══════════════════════════════════════════════════════════════════════════════
//! COHERENCE — Scalar Health Metric Under Pressure
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Not a gauge. A CONTROL SYSTEM with memory, floors, and recovery.
//!
//! Per tick the monitor folds noisy inputs (alignment error, three entropy
//! components, pressure) into one [0,1] coherence value:
//! - a dampened pressure response curve keeps a single spike from collapsing
//!   the metric to zero
//! - entropy weighting is adaptive: the most volatile component is
//!   down-weighted to avoid metric whiplash
//! - a seeded floor guarantees the metric never free-falls to exactly 0 from
//!   noise alone
//! - a deterministic breathing oscillation (not randomness) adds a small
//!   periodic stabilizing term
//! - emergency injection ramps a capped boost while coherence stays pinned
//!   in the critical zone
//! - rate limiting bounds tick-to-tick movement to ±0.1
//!
//! Zones discretize the metric for policy branching; recommendations are a
//! fixed advisory table, never free text.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::stats::RollingWindow;

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

pub const ZONE_CALM_THRESHOLD: f64 = 0.8;
pub const ZONE_CREATIVE_THRESHOLD: f64 = 0.5;
pub const ZONE_ACTIVE_THRESHOLD: f64 = 0.3;
/// Fast-path emergency trigger on the raw composite
pub const EMERGENCY_THRESHOLD: f64 = 0.1;

/// Recovery seeds for the coherence floor
const SEED_BASELINE: f64 = 0.15;
const SEED_BREATH: f64 = 0.05;
const SEED_MEMORY: f64 = 0.10;
const SEED_SELF: f64 = 0.08;
const FLOOR_CAP: f64 = 0.4;

/// Maximum tick-to-tick metric movement
const MAX_DELTA: f64 = 0.1;

/// Breathing oscillation period in ticks
const BREATH_PERIOD: u64 = 20;
const BREATH_SCALE_NORMAL: f64 = 0.1;
const BREATH_SCALE_EMERGENCY: f64 = 0.3;

/// Recovery momentum dynamics
const MOMENTUM_GAIN: f64 = 0.05;
const MOMENTUM_LOSS: f64 = 0.02;
const MOMENTUM_CAP: f64 = 0.3;

/// Emergency injection: capped gradual boost, exit above EMERGENCY_EXIT
const EMERGENCY_BOOST_STEP: f64 = 0.02;
const EMERGENCY_BOOST_CAP: f64 = 0.3;
const EMERGENCY_EXIT: f64 = 0.3;

/// Base entropy component weights (mood, sigil, bloom)
const ENTROPY_BASE_WEIGHTS: [f64; 3] = [0.4, 0.4, 0.2];
/// The most volatile component keeps this fraction of its base weight
const VOLATILE_DAMPING: f64 = 0.5;
/// Samples required before adaptive weighting engages
const ADAPT_MIN_SAMPLES: usize = 5;

/// A metric sample is "stable" when above this with entropy below the cap
const STABLE_METRIC_MIN: f64 = 0.4;
const STABLE_ENTROPY_MAX: f64 = 0.6;
/// Stable samples required before the memory seed contributes to the floor
const STABLE_BUFFER_MIN: usize = 10;

// ═══════════════════════════════════════════════════════════════════════════════
// ZONES
// ═══════════════════════════════════════════════════════════════════════════════

/// Discretized coherence band used for policy branching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    /// ≥ 0.8: high coherence, no intervention warranted
    Calm,
    /// ≥ 0.5: healthy variability
    Creative,
    /// ≥ 0.3: loaded but functional
    Active,
    /// < 0.3: coherence at risk
    Critical,
}

impl Zone {
    pub fn from_metric(metric: f64) -> Self {
        match metric {
            m if m >= ZONE_CALM_THRESHOLD => Zone::Calm,
            m if m >= ZONE_CREATIVE_THRESHOLD => Zone::Creative,
            m if m >= ZONE_ACTIVE_THRESHOLD => Zone::Active,
            _ => Zone::Critical,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Zone::Calm => "calm",
            Zone::Creative => "creative",
            Zone::Active => "active",
            Zone::Critical => "critical",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Zone::Calm => "\x1b[32m",     // green
            Zone::Creative => "\x1b[33m", // yellow
            Zone::Active => "\x1b[91m",   // light red
            Zone::Critical => "\x1b[31m", // red
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADVISORIES — fixed lookup table keyed by zone and tension
// ═══════════════════════════════════════════════════════════════════════════════

/// Deterministic advisory emitted alongside the metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    /// Nothing to do
    HoldSteady,
    /// Watch, don't intervene
    Monitor,
    /// Back off input pressure before it compounds
    ReducePressure,
    /// Invoke the recovery orchestrator
    EngageRecovery,
    /// Metric and entropy have diverged; rebalance entry load
    RebalanceEntropy,
}

impl Recommendation {
    /// High tension means the metric and the entropy field disagree
    const TENSION_ALERT: f64 = 0.5;

    pub fn for_zone_and_tension(zone: Zone, tension: f64) -> Vec<Recommendation> {
        let mut out = vec![match zone {
            Zone::Calm => Recommendation::HoldSteady,
            Zone::Creative => Recommendation::Monitor,
            Zone::Active => Recommendation::ReducePressure,
            Zone::Critical => Recommendation::EngageRecovery,
        }];
        if tension > Self::TENSION_ALERT {
            out.push(Recommendation::RebalanceEntropy);
        }
        out
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INPUTS / OUTPUTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Raw signals for one monitor tick. Out-of-range values are clamped and
/// counted, never rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoherenceInputs {
    pub alignment: f64,
    pub entropy_index: f64,
    pub pressure: f64,
    pub mood_entropy: f64,
    pub sigil_entropy: f64,
    pub bloom_entropy: f64,
    /// Tick-cadence jitter from the host loop; telemetry only
    pub pulse_delta: f64,
    /// Confidence supplied by an external assessor; defaults to 0.5
    pub external_confidence: Option<f64>,
}

impl Default for CoherenceInputs {
    fn default() -> Self {
        Self {
            alignment: 0.5,
            entropy_index: 0.5,
            pressure: 0.5,
            mood_entropy: 0.5,
            sigil_entropy: 0.5,
            bloom_entropy: 0.5,
            pulse_delta: 0.0,
            external_confidence: None,
        }
    }
}

/// One monitor tick's output
#[derive(Debug, Clone, Serialize)]
pub struct CoherenceReport {
    pub metric: f64,
    pub zone: Zone,
    /// |metric − weighted entropy|
    pub tension: f64,
    pub stability: f64,
    /// Headroom-capped potential of the floor seeds
    pub recovery_potential: f64,
    pub breathing_phase: f64,
    pub emergency_active: bool,
    pub pulse_delta: f64,
    pub recommendations: Vec<Recommendation>,
}

/// Monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoherenceConfig {
    /// Window for the stability stdev (and the 5-tick trend)
    pub stability_window: usize,
    /// Consecutive critical-zone ticks before emergency injection engages
    pub critical_streak_trigger: u32,
}

impl Default for CoherenceConfig {
    fn default() -> Self {
        Self {
            stability_window: 20,
            critical_streak_trigger: 5,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MONITOR
// ═══════════════════════════════════════════════════════════════════════════════

/// The coherence control loop
#[derive(Debug)]
pub struct Monitor {
    config: CoherenceConfig,
    tick: u64,
    last_metric: f64,
    history: RollingWindow,
    stable_buffer: RollingWindow,
    mood_window: RollingWindow,
    sigil_window: RollingWindow,
    bloom_window: RollingWindow,
    recovery_momentum: f64,
    emergency_active: bool,
    emergency_duration: u32,
    critical_streak: u32,
    clamped_inputs: u64,
}

impl Monitor {
    pub fn new(config: CoherenceConfig) -> Self {
        let window = config.stability_window.max(3);
        Self {
            config,
            tick: 0,
            last_metric: 0.5,
            history: RollingWindow::new(window),
            stable_buffer: RollingWindow::new(window),
            mood_window: RollingWindow::new(window),
            sigil_window: RollingWindow::new(window),
            bloom_window: RollingWindow::new(window),
            recovery_momentum: 0.0,
            emergency_active: false,
            emergency_duration: 0,
            critical_streak: 0,
            clamped_inputs: 0,
        }
    }

    /// Advance the monitor one tick
    pub fn tick(&mut self, inputs: &CoherenceInputs) -> CoherenceReport {
        let alignment = self.clamp_unit(inputs.alignment);
        let entropy_index = self.clamp_unit(inputs.entropy_index);
        let pressure = self.clamp_unit(inputs.pressure);
        let mood = self.clamp_unit(inputs.mood_entropy);
        let sigil = self.clamp_unit(inputs.sigil_entropy);
        let bloom = self.clamp_unit(inputs.bloom_entropy);
        let external = self.clamp_unit(inputs.external_confidence.unwrap_or(0.5));

        // 1-2. Core alignment error, modulated by the pressure curve.
        let raw = 1.0 - (alignment - entropy_index).abs();
        let pressure_factor = pressure_factor(pressure);

        // 3. Adaptively weighted entropy field.
        self.mood_window.push(mood);
        self.sigil_window.push(sigil);
        self.bloom_window.push(bloom);
        let weights = self.entropy_weights();
        let entropy_total = mood * weights[0] + sigil * weights[1] + bloom * weights[2];

        // 4. Seeded floor.
        let floor = self.coherence_floor(entropy_total);

        // 5. Breathing oscillation (phase advances with the logical clock).
        let breathing_phase = (self.tick % BREATH_PERIOD) as f64 / BREATH_PERIOD as f64;
        let breath_value = ((breathing_phase * 2.0 * PI).sin() + 1.0) * 0.5;
        let breath_scale = if self.emergency_active {
            BREATH_SCALE_EMERGENCY
        } else {
            BREATH_SCALE_NORMAL
        };
        let breathing_bonus = breath_value * breath_scale;

        // 6. Stability from recent variance plus recovery momentum.
        let stability_base = if self.history.len() < 3 {
            0.5
        } else {
            1.0 - (2.0 * self.history.std_dev()).min(1.0)
        };
        let stability = stability_base + self.recovery_momentum;

        // 7. Composite.
        let mut composite = 0.4 * raw * pressure_factor
            + 0.2 * floor
            + 0.1 * breathing_bonus
            + 0.2 * stability
            + 0.1 * external;

        // 8. Emergency injection. The raw-composite fast path is kept, but in
        // practice the floor makes it unreachable, so sustained residence in
        // the critical zone is the engaging condition.
        if self.emergency_active && self.last_metric > EMERGENCY_EXIT {
            // Recovered past the exit level on the previous tick.
            self.emergency_active = false;
            self.emergency_duration = 0;
        } else if self.emergency_active
            || composite < EMERGENCY_THRESHOLD
            || self.critical_streak >= self.config.critical_streak_trigger
        {
            self.emergency_active = true;
            self.emergency_duration += 1;
            let boost =
                (self.emergency_duration as f64 * EMERGENCY_BOOST_STEP).min(EMERGENCY_BOOST_CAP);
            composite += boost;
        }
        let composite = composite.clamp(0.0, 1.0);

        // 9. Rate limiting against the previous tick's value.
        let metric = composite
            .clamp(self.last_metric - MAX_DELTA, self.last_metric + MAX_DELTA)
            .clamp(0.0, 1.0);
        debug_assert!((metric - self.last_metric).abs() <= MAX_DELTA + 1e-12);

        // 10. Zones and tension.
        let zone = Zone::from_metric(metric);
        if zone == Zone::Critical {
            self.critical_streak += 1;
        } else {
            self.critical_streak = 0;
        }
        let tension = (metric - entropy_total).abs();

        // State updates.
        self.history.push(metric);
        if metric > STABLE_METRIC_MIN && entropy_total < STABLE_ENTROPY_MAX {
            self.stable_buffer.push(metric);
        }
        if let Some(trend) = self.history.trend(5) {
            if trend > 0.0 {
                self.recovery_momentum = (self.recovery_momentum + MOMENTUM_GAIN).min(MOMENTUM_CAP);
            } else {
                self.recovery_momentum = (self.recovery_momentum - MOMENTUM_LOSS).max(0.0);
            }
        }
        self.last_metric = metric;
        self.tick += 1;

        CoherenceReport {
            metric,
            zone,
            tension,
            stability,
            recovery_potential: recovery_potential(metric),
            breathing_phase,
            emergency_active: self.emergency_active,
            pulse_delta: inputs.pulse_delta,
            recommendations: Recommendation::for_zone_and_tension(zone, tension),
        }
    }

    pub fn metric(&self) -> f64 {
        self.last_metric
    }

    pub fn emergency_active(&self) -> bool {
        self.emergency_active
    }

    pub fn recovery_momentum(&self) -> f64 {
        self.recovery_momentum
    }

    /// Count of numeric inputs silently clamped into [0, 1]
    pub fn clamped_inputs(&self) -> u64 {
        self.clamped_inputs
    }

    pub(crate) fn stable_samples(&self) -> usize {
        self.stable_buffer.len()
    }

    /// Adaptive entropy weights: once every component window has enough
    /// samples, the strictly most volatile one is down-weighted and the
    /// weights renormalized. Constant inputs keep the base weights.
    pub(crate) fn entropy_weights(&self) -> [f64; 3] {
        let mut weights = ENTROPY_BASE_WEIGHTS;
        if self.mood_window.len() < ADAPT_MIN_SAMPLES
            || self.sigil_window.len() < ADAPT_MIN_SAMPLES
            || self.bloom_window.len() < ADAPT_MIN_SAMPLES
        {
            return weights;
        }
        let devs = [
            self.mood_window.std_dev(),
            self.sigil_window.std_dev(),
            self.bloom_window.std_dev(),
        ];
        let (max_i, max_dev) = devs
            .iter()
            .enumerate()
            .fold((0, 0.0), |acc, (i, &d)| if d > acc.1 { (i, d) } else { acc });
        let min_dev = devs.iter().cloned().fold(f64::INFINITY, f64::min);
        if max_dev - min_dev < 1e-9 {
            return weights;
        }
        weights[max_i] *= VOLATILE_DAMPING;
        let sum: f64 = weights.iter().sum();
        for w in weights.iter_mut() {
            *w /= sum;
        }
        weights
    }

    fn coherence_floor(&self, entropy_total: f64) -> f64 {
        let mut floor = SEED_BASELINE;
        if entropy_total < 0.5 {
            floor += SEED_BREATH;
        }
        if self.stable_buffer.len() >= STABLE_BUFFER_MIN {
            floor += SEED_MEMORY * self.stable_buffer.mean();
        }
        floor += SEED_SELF;
        floor.min(FLOOR_CAP)
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

impl Default for Monitor {
    fn default() -> Self {
        Self::new(CoherenceConfig::default())
    }
}

/// Dampened pressure response: resistance above 0.9, bonus below 0.2,
/// linear drag between. Prevents a single spike from collapsing coherence.
pub fn pressure_factor(pressure: f64) -> f64 {
    if pressure > 0.9 {
        0.7 - (pressure - 0.9) * 0.5
    } else if pressure < 0.2 {
        1.1 + (0.2 - pressure) * 0.5
    } else {
        1.0 - pressure * 0.3
    }
}

/// Headroom-capped recovery potential of the floor seeds
fn recovery_potential(metric: f64) -> f64 {
    let base = SEED_BASELINE + SEED_BREATH + SEED_MEMORY + SEED_SELF + 0.2;
    base.min(1.0 - metric).max(0.0)
}
