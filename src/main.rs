//! ═══════════════════════════════════════════════════════════════════════════════
//! KEEL — Unified Entry Point
//! ═══════════════════════════════════════════════════════════════════════════════
//! Single binary, subcommand dispatch.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use keel::pacer::{Pacer, SignalSource, SyntheticSource};
use keel::{
    sitrep, CoherenceInputs, EngineInputs, Journal, KeelConfig, PressureZone, ReactivationEvent,
    TickEngine,
};

#[derive(Parser)]
#[command(name = "keel")]
#[command(about = "Keel - bounded-resource cognitive control core", long_about = None)]
struct Cli {
    /// Explicit config file (defaults to the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the paced control loop with the synthetic signal source
    Run {
        /// Override the tick interval
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Stop after this many ticks (runs until killed when absent)
        #[arg(long)]
        ticks: Option<u64>,

        /// Journal target (JSON lines)
        #[arg(long)]
        journal: Option<PathBuf>,
    },

    /// Drive a scripted demo through calm, storm, and recovery phases
    Step {
        /// Ticks per phase
        #[arg(short, long, default_value = "15")]
        ticks: u64,
    },

    /// Warm the engine briefly and print a status report
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => KeelConfig::load_from(path)?,
        None => KeelConfig::load()?,
    };

    match cli.command {
        Commands::Run {
            interval_ms,
            ticks,
            journal,
        } => run_loop(config, interval_ms, ticks, journal),
        Commands::Step { ticks } => run_demo(config, ticks),
        Commands::Status => run_status(config),
    }
}

fn run_loop(
    mut config: KeelConfig,
    interval_ms: Option<u64>,
    ticks: Option<u64>,
    journal_path: Option<PathBuf>,
) -> Result<()> {
    if let Some(ms) = interval_ms {
        config.pacer.interval_ms = ms.max(1);
    }
    let journal = match journal_path.or_else(|| config.journal_path.clone()) {
        Some(path) => {
            println!("\x1b[35m[KEEL]    journaling to {}\x1b[0m", path.display());
            Journal::spawn(path)
        }
        None => Journal::disabled(),
    };

    println!(
        "\x1b[32m[KEEL]    control loop up, {}ms cadence\x1b[0m",
        config.pacer.interval_ms
    );
    let engine = TickEngine::new(&config, journal);
    let pacer = Pacer::spawn(
        engine,
        Box::new(SyntheticSource::default()),
        config.pacer.clone(),
    );

    loop {
        thread::sleep(Duration::from_secs(1));
        let snapshot = pacer.snapshot();
        println!("{}", sitrep::summary_line(&snapshot));
        if let Some(limit) = ticks {
            if snapshot.tick >= limit {
                break;
            }
        }
    }

    let missed = pacer.missed_ticks();
    let clean = pacer.shutdown();
    println!(
        "\x1b[32m[KEEL]    loop down ({}), {} missed tick(s)\x1b[0m",
        if clean { "clean" } else { "timed out" },
        missed
    );
    Ok(())
}

fn run_demo(config: KeelConfig, ticks_per_phase: u64) -> Result<()> {
    let mut engine = TickEngine::new(&config, Journal::disabled());

    println!("Phase 1: calm baseline");
    println!("─────────────────────────────────────────");
    for tick in 0..ticks_per_phase {
        if tick % 3 == 0 {
            engine.ring_mut().insert(0.5, 0.5, 300, None);
        }
        let report = engine.step(EngineInputs {
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
        });
        print_step(report.tick, &engine);
    }

    println!("\nPhase 2: reactivation churn");
    println!("─────────────────────────────────────────");
    let churn_ids = engine.ring().entry_ids();
    for _ in 0..ticks_per_phase {
        let reactivations = churn_ids
            .iter()
            .map(|&id| ReactivationEvent {
                id,
                reuse_count: 7,
                ticks_since_last_use: 12,
                semantic_drift: 0.05,
                ambient_entropy: 0.4,
            })
            .collect();
        let report = engine.step(EngineInputs {
            coherence: CoherenceInputs {
                alignment: 0.6,
                entropy_index: 0.5,
                pressure: 0.5,
                ..Default::default()
            },
            reactivations,
            ..Default::default()
        });
        if !report.stabilization.stabilized.is_empty() {
            println!(
                "  tick {:>4}: {} cooldown(s), {} lineage lock(s)",
                report.tick,
                report.stabilization.stabilized.len(),
                report.stabilization.locked.len()
            );
        }
        print_step(report.tick, &engine);
    }

    println!("\nPhase 3: pressure storm");
    println!("─────────────────────────────────────────");
    for _ in 0..(ticks_per_phase * 2) {
        let report = engine.step(EngineInputs {
            coherence: CoherenceInputs {
                alignment: 0.9,
                entropy_index: 0.1,
                pressure: 0.95,
                mood_entropy: 0.85,
                sigil_entropy: 0.85,
                bloom_entropy: 0.85,
                external_confidence: Some(0.0),
                ..Default::default()
            },
            pressure_zone: PressureZone::Red,
            ..Default::default()
        });
        print_step(report.tick, &engine);
    }

    println!("\nPhase 4: release");
    println!("─────────────────────────────────────────");
    for _ in 0..(ticks_per_phase * 2) {
        let report = engine.step(EngineInputs {
            coherence: CoherenceInputs {
                alignment: 0.7,
                entropy_index: 0.65,
                pressure: 0.15,
                mood_entropy: 0.2,
                sigil_entropy: 0.2,
                bloom_entropy: 0.2,
                ..Default::default()
            },
            ..Default::default()
        });
        print_step(report.tick, &engine);
    }

    println!();
    sitrep::print_sitrep(&engine.snapshot());
    Ok(())
}

fn print_step(tick: u64, engine: &TickEngine) {
    if tick % 5 == 0 {
        println!("  {}", sitrep::summary_line(&engine.snapshot()));
    }
}

fn run_status(config: KeelConfig) -> Result<()> {
    let mut engine = TickEngine::new(&config, Journal::disabled());
    let mut source = SyntheticSource::default();

    // Brief warm-up so the windows hold real samples
    for _ in 0..25 {
        let tick = engine.current_tick() + 1;
        source.admit(tick, engine.ring_mut());
        let inputs = source.sample(tick);
        engine.step(EngineInputs {
            coherence: inputs.coherence,
            ..Default::default()
        });
    }

    sitrep::print_sitrep(&engine.snapshot());
    Ok(())
}
