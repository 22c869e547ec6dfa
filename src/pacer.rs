//! ═══════════════════════════════════════════════════════════════════════════════
//! PACER — Real-Time Host Loop
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Owns wall-clock pacing so the engine never has to: computes the next tick
//! boundary, sleeps up to it, and corrects drift by skipping the sleep and
//! realigning when behind — counting the miss, never stalling. Publishes the
//! latest boundary snapshot through a shared slot for external readers.
//!
//! Cancellation is one atomic flag checked once per iteration; shutdown joins
//! with a bounded timeout.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::engine::{EngineInputs, EngineSnapshot, TickEngine};
use crate::ring::SigilRing;
use crate::stats::Ewma;

/// Pacing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacerConfig {
    /// Target inter-tick interval
    pub interval_ms: u64,
    /// Bound on the shutdown join
    pub shutdown_timeout_secs: u64,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            shutdown_timeout_secs: 5,
        }
    }
}

/// Collaborator feeding raw signals into the loop each tick
pub trait SignalSource: Send {
    fn sample(&mut self, tick: u64) -> EngineInputs;

    /// Optional chance to admit new ring entries before the step
    fn admit(&mut self, _tick: u64, _ring: &mut SigilRing) {}
}

/// Handle to the running host loop
pub struct Pacer {
    kill: Arc<AtomicBool>,
    snapshot: Arc<RwLock<EngineSnapshot>>,
    missed: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl Pacer {
    /// Take ownership of the engine and drive it at the configured cadence.
    pub fn spawn(
        mut engine: TickEngine,
        mut source: Box<dyn SignalSource>,
        config: PacerConfig,
    ) -> Self {
        let interval = Duration::from_millis(config.interval_ms.max(1));
        let kill = Arc::new(AtomicBool::new(false));
        let missed = Arc::new(AtomicU64::new(0));
        let snapshot = Arc::new(RwLock::new(engine.snapshot()));

        let loop_kill = kill.clone();
        let loop_missed = missed.clone();
        let loop_snapshot = snapshot.clone();
        let handle = thread::spawn(move || {
            let mut next_wake = Instant::now() + interval;
            // Smoothed cadence jitter, normalized by the interval, feeds the
            // monitor's pulse_delta channel.
            let mut jitter = Ewma::new(0.2);
            loop {
                if loop_kill.load(Ordering::Relaxed) {
                    break;
                }

                let now = Instant::now();
                if next_wake > now {
                    thread::sleep(next_wake - now);
                } else {
                    // Behind schedule: skip the sleep and realign to now.
                    loop_missed.fetch_add(1, Ordering::Relaxed);
                    next_wake = now;
                }
                let woke = Instant::now();
                let jitter_ms =
                    woke.saturating_duration_since(next_wake).as_secs_f64() * 1000.0;
                let pulse_delta =
                    jitter.update((jitter_ms / interval.as_millis().max(1) as f64).min(1.0));
                next_wake += interval;

                let tick = engine.current_tick() + 1;
                source.admit(tick, engine.ring_mut());
                let mut inputs = source.sample(tick);
                inputs.coherence.pulse_delta = pulse_delta;
                engine.step(inputs);
                *loop_snapshot.write() = engine.snapshot();
            }
        });

        Self {
            kill,
            snapshot,
            missed,
            handle: Some(handle),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs.max(1)),
        }
    }

    /// Latest boundary snapshot
    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshot.read().clone()
    }

    /// Ticks whose boundary was missed (loop ran behind and skipped sleep)
    pub fn missed_ticks(&self) -> u64 {
        self.missed.load(Ordering::Relaxed)
    }

    /// Signal the loop to stop after its current iteration
    pub fn request_stop(&self) {
        self.kill.store(true, Ordering::Relaxed);
    }

    /// Stop and join with the configured bound. Returns false when the loop
    /// failed to exit in time and was abandoned.
    pub fn shutdown(mut self) -> bool {
        self.request_stop();
        let Some(handle) = self.handle.take() else {
            return true;
        };
        let deadline = Instant::now() + self.shutdown_timeout;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if handle.is_finished() {
            handle.join().is_ok()
        } else {
            false
        }
    }
}

impl Drop for Pacer {
    fn drop(&mut self) {
        self.request_stop();
        if let Some(handle) = self.handle.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
            // Else: the thread notices the flag on its next iteration;
            // dropping the handle detaches rather than blocks.
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SYNTHETIC SOURCE — deterministic oscillating signal feed
// ═══════════════════════════════════════════════════════════════════════════════

/// Deterministic signal source for demos and soak runs: slow sine sweeps
/// across every channel, periodic admissions into the ring. No randomness —
/// identical runs produce identical trajectories.
pub struct SyntheticSource {
    /// Base oscillation period, in ticks
    pub period: u64,
    /// Admit a new entry every N ticks
    pub admit_every: u64,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self {
            period: 40,
            admit_every: 5,
        }
    }
}

impl SignalSource for SyntheticSource {
    fn sample(&mut self, tick: u64) -> EngineInputs {
        let phase = tick as f64 / self.period as f64 * std::f64::consts::TAU;
        let wave = |mult: f64, base: f64, amp: f64| -> f64 {
            (base + amp * (phase * mult).sin()).clamp(0.0, 1.0)
        };
        EngineInputs {
            coherence: crate::coherence::CoherenceInputs {
                alignment: wave(1.0, 0.6, 0.3),
                entropy_index: wave(0.7, 0.4, 0.3),
                pressure: wave(0.3, 0.5, 0.45),
                mood_entropy: wave(1.3, 0.5, 0.3),
                sigil_entropy: wave(1.7, 0.5, 0.3),
                bloom_entropy: wave(0.5, 0.5, 0.3),
                pulse_delta: 0.0,
                external_confidence: None,
            },
            ..Default::default()
        }
    }

    fn admit(&mut self, tick: u64, ring: &mut SigilRing) {
        if tick % self.admit_every != 0 {
            return;
        }
        let phase = tick as f64 / self.period as f64 * std::f64::consts::TAU;
        let convolution = (0.3 + 0.4 * phase.sin().abs()).clamp(0.0, 1.0);
        let saturation = (0.5 + 0.4 * phase.cos().abs()).clamp(0.0, 1.0);
        ring.insert(convolution, saturation, 200, None);
    }
}
