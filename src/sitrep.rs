//! ═══════════════════════════════════════════════════════════════════════════════
//! SITREP — Status Rendering
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Answers the question: "Where is the system, right now?"
//!
//! Renders boundary snapshots into terminal output. Strictly read-only over
//! `EngineSnapshot` — never touches live structures.
//! ═══════════════════════════════════════════════════════════════════════════════

use crate::engine::EngineSnapshot;

const RESET: &str = "\x1b[0m";

/// One-line status summary, suitable for periodic loop output
pub fn summary_line(snapshot: &EngineSnapshot) -> String {
    format!(
        "tick {:>6} | {}{:<8}{} metric {:.3} | ring {}/{} entropy {:.3} | temp {:.2}{}{}",
        snapshot.tick,
        snapshot.zone.color(),
        snapshot.zone.name(),
        RESET,
        snapshot.metric,
        snapshot.ring_len,
        snapshot.ring_capacity,
        snapshot.ring_entropy,
        snapshot.system_temperature,
        if snapshot.emergency_active {
            " | \x1b[31mEMERGENCY\x1b[0m"
        } else {
            ""
        },
        if snapshot.recovering {
            " | \x1b[33mRECOVERING\x1b[0m"
        } else {
            ""
        },
    )
}

/// Full boxed report
pub fn render(snapshot: &EngineSnapshot) -> String {
    let mut out = String::new();
    out.push_str(
        "═══════════════════════════════════════════════════════════════════════════════\n",
    );
    out.push_str("                                 SITREP\n");
    out.push_str(
        "═══════════════════════════════════════════════════════════════════════════════\n\n",
    );
    out.push_str("┌─────────────────────────────────────────────────────────────────────────────┐\n");
    out.push_str("│ COHERENCE                                                                   │\n");
    out.push_str("├─────────────────────────────────────────────────────────────────────────────┤\n");
    out.push_str(&format!(
        "│ Metric:    {} {:.3}   Zone: {}{:<8}{}                                     │\n",
        meter(snapshot.metric, 20),
        snapshot.metric,
        snapshot.zone.color(),
        snapshot.zone.name(),
        RESET,
    ));
    out.push_str(&format!(
        "│ Emergency: {:<5}   Recovering: {:<5}   Episodes: {:<4}                       │\n",
        if snapshot.emergency_active { "YES" } else { "no" },
        if snapshot.recovering { "YES" } else { "no" },
        snapshot.episode_count,
    ));
    out.push_str("└─────────────────────────────────────────────────────────────────────────────┘\n");
    out.push_str("┌─────────────────────────────────────────────────────────────────────────────┐\n");
    out.push_str("│ RING                                                                        │\n");
    out.push_str("├─────────────────────────────────────────────────────────────────────────────┤\n");
    out.push_str(&format!(
        "│ Entries:   {:>4} / {:<4}                                                      │\n",
        snapshot.ring_len, snapshot.ring_capacity,
    ));
    out.push_str(&format!(
        "│ Entropy:   {} {:.3}                                            │\n",
        meter(snapshot.ring_entropy, 20),
        snapshot.ring_entropy,
    ));
    out.push_str(&format!(
        "│ Temp:      {} {:.3}                                            │\n",
        meter(snapshot.system_temperature, 20),
        snapshot.system_temperature,
    ));
    out.push_str("└─────────────────────────────────────────────────────────────────────────────┘\n");
    out.push_str("┌─────────────────────────────────────────────────────────────────────────────┐\n");
    out.push_str("│ STABILIZATION                                                               │\n");
    out.push_str("├─────────────────────────────────────────────────────────────────────────────┤\n");
    out.push_str(&format!(
        "│ Cooldowns: {:>4}   Lineage locks: {:>4}   Clamped inputs: {:>6}             │\n",
        snapshot.active_cooldowns, snapshot.active_locks, snapshot.clamped_inputs,
    ));
    out.push_str("└─────────────────────────────────────────────────────────────────────────────┘\n");
    out.push_str(&format!("\n  tick {}\n", snapshot.tick));
    out
}

/// Print the full report to stdout
pub fn print_sitrep(snapshot: &EngineSnapshot) {
    print!("{}", render(snapshot));
}

/// Colored ASCII meter for a [0,1] value
fn meter(value: f64, width: usize) -> String {
    let value = value.clamp(0.0, 1.0);
    let filled = (value * width as f64) as usize;
    let color = if value > 0.9 {
        "\x1b[31m" // red
    } else if value > 0.7 {
        "\x1b[33m" // yellow
    } else {
        "\x1b[32m" // green
    };
    format!(
        "{}[{}{}]{}",
        color,
        "█".repeat(filled.min(width)),
        "░".repeat(width.saturating_sub(filled)),
        RESET,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coherence::Zone;

    fn snapshot() -> EngineSnapshot {
        EngineSnapshot {
            tick: 42,
            metric: 0.62,
            zone: Zone::Creative,
            emergency_active: false,
            recovering: true,
            ring_len: 3,
            ring_capacity: 256,
            ring_entropy: 0.21,
            system_temperature: 0.18,
            active_cooldowns: 1,
            active_locks: 0,
            episode_count: 2,
            clamped_inputs: 0,
        }
    }

    #[test]
    fn test_render_mentions_key_fields() {
        let text = render(&snapshot());
        assert!(text.contains("creative"));
        assert!(text.contains("0.620"));
        assert!(text.contains("3 / 256"));
        assert!(text.contains("tick 42"));
    }

    #[test]
    fn test_summary_line_flags_recovery() {
        let line = summary_line(&snapshot());
        assert!(line.contains("RECOVERING"));
        assert!(!line.contains("EMERGENCY"));
    }

    #[test]
    fn test_meter_bounds() {
        assert!(meter(-0.5, 10).contains("░░░░░░░░░░"));
        assert!(meter(1.5, 10).contains("██████████"));
    }
}
