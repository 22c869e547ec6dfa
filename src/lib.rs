//! ═══════════════════════════════════════════════════════════════════════════════
//! KEEL — Bounded-Resource Cognitive Control Core
//! ═══════════════════════════════════════════════════════════════════════════════
//! Single crate, flat modules. One logical clock, four cooperating
//! subsystems, no hidden global state.
//! ═══════════════════════════════════════════════════════════════════════════════

// ═══════════════════════════════════════════════════════════════════════════════
// FOUNDATION MODULES — statistics, errors, events
// ═══════════════════════════════════════════════════════════════════════════════

pub mod error;
pub mod journal;
pub mod stats;

// Re-export common error types
pub use error::{KeelError, KeelResult};

// ═══════════════════════════════════════════════════════════════════════════════
// CORE SUBSYSTEMS — ring, coherence, stabilization, recovery
// ═══════════════════════════════════════════════════════════════════════════════

pub mod coherence;
pub mod recovery;
pub mod ring;
pub mod stabilize;

// ═══════════════════════════════════════════════════════════════════════════════
// COMPOSITION — lockstep engine, host loop, configuration
// ═══════════════════════════════════════════════════════════════════════════════

pub mod config;
pub mod engine;
pub mod pacer;

// ═══════════════════════════════════════════════════════════════════════════════
// SITREP — Status Rendering
// ═══════════════════════════════════════════════════════════════════════════════

pub mod sitrep;

// Re-export core types
pub use coherence::{CoherenceConfig, CoherenceInputs, CoherenceReport, Monitor, Recommendation, Zone};
pub use config::KeelConfig;
pub use engine::{EngineInputs, EngineSnapshot, StepReport, TickEngine};
pub use journal::{Journal, JournalEvent, Severity};
pub use pacer::{Pacer, PacerConfig, SignalSource, SyntheticSource};
pub use recovery::{
    Orchestrator, PressureZone, RecoveryConfig, RecoveryEpisode, RecoveryReport, ReflectionHook,
};
pub use ring::{EntryId, EntryView, RingConfig, SigilRing, TickReport};
pub use stabilize::{
    Action, Coordinator, ReactivationEvent, StabilizationReport, StabilizeConfig,
};
pub use stats::{Ewma, RollingWindow};
