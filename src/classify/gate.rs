//! Gate detection by bias permutation.
//!
//! A MOSFET gate draws no DC current, so its readback matches the applied
//! level under every assignment of the three canonical biases. Each round
//! applies all six permutations and tags the round MOSFET-like when some
//! terminal stayed quiet throughout. Voting over many rounds absorbs the
//! odd noisy readback.

use crate::config::TracerConfig;
use crate::device::{Terminal, TerminalBias};
use crate::error::{Result, Stage};
use crate::transducer::Transducer;

use TerminalBias::{Ground as G, HighReference as H, LowReference as L};

/// All assignments of the canonical levels to terminals 1..3, in
/// lexicographic order.
pub const BIAS_PERMUTATIONS: [[TerminalBias; 3]; 6] = [
    [G, L, H],
    [G, H, L],
    [L, G, H],
    [L, H, G],
    [H, G, L],
    [H, L, G],
];

/// Evidence and verdict of a gate detection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDetection {
    /// The gate terminal, or `None` when the device should be treated as a BJT.
    pub gate: Option<Terminal>,
    /// Permutations in which each terminal was quiet, summed over all rounds.
    pub quiet_counts: [usize; 3],
    pub mosfet_rounds: usize,
    pub bjt_rounds: usize,
}

impl GateDetection {
    /// Decide from accumulated tallies.
    ///
    /// A gate exists only when MOSFET-like rounds hold a strict majority and
    /// one terminal has a strictly highest quiet count.
    pub fn from_tallies(quiet_counts: [usize; 3], mosfet_rounds: usize, bjt_rounds: usize) -> Self {
        let gate = if mosfet_rounds > bjt_rounds {
            strict_max(&quiet_counts)
        } else {
            None
        };
        Self {
            gate,
            quiet_counts,
            mosfet_rounds,
            bjt_rounds,
        }
    }
}

fn strict_max(counts: &[usize; 3]) -> Option<Terminal> {
    let best = *counts.iter().max()?;
    let mut leaders = Terminal::ALL.into_iter().filter(|t| counts[t.index()] == best);
    let leader = leaders.next()?;
    match leaders.next() {
        Some(_) => None,
        None => Some(leader),
    }
}

/// Run the permutation rounds and decide whether a gate exists.
pub fn detect_gate<T: Transducer>(
    transducer: &mut T,
    config: &TracerConfig,
    threshold: f64,
) -> Result<GateDetection> {
    let permutations = BIAS_PERMUTATIONS.len();
    let mut quiet_counts = [0usize; 3];
    let mut mosfet_rounds = 0;
    let mut bjt_rounds = 0;

    transducer.select_channels(&Terminal::ALL)?;

    for _ in 0..config.samples.gate_rounds {
        let mut round = [0usize; 3];

        for permutation in &BIAS_PERMUTATIONS {
            let codes = permutation.map(|bias| config.levels.code(bias));
            transducer.apply_biases(codes)?;
            let readback = transducer.readback(config.samples.gate)?;

            for terminal in Terminal::ALL {
                let drop = readback
                    .measure(terminal)
                    .drop(codes[terminal.index()], Stage::GateDetection)?;
                if drop < threshold {
                    round[terminal.index()] += 1;
                }
            }
        }

        if round.iter().any(|&n| n == permutations) {
            mosfet_rounds += 1;
        } else {
            bjt_rounds += 1;
        }
        for (total, n) in quiet_counts.iter_mut().zip(round) {
            *total += n;
        }
    }

    log::debug!(
        "Gate detection quiet counts {:?}, {} MOSFET-like / {} BJT-like rounds",
        quiet_counts,
        mosfet_rounds,
        bjt_rounds
    );
    Ok(GateDetection::from_tallies(quiet_counts, mosfet_rounds, bjt_rounds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transducer::{DeviceKind, FramedTransducer, SimParams, SimulatedDevice};

    fn bench(kind: DeviceKind, pinout: &str) -> FramedTransducer<SimulatedDevice> {
        let sim = SimulatedDevice::new(kind, pinout.parse().unwrap(), SimParams::default(), 3)
            .unwrap();
        FramedTransducer::new(sim)
    }

    #[test]
    fn test_permutations_assign_each_level_once() {
        for p in &BIAS_PERMUTATIONS {
            let mut sorted = *p;
            sorted.sort();
            assert_eq!(sorted, [G, L, H]);
        }
        let distinct: std::collections::HashSet<_> = BIAS_PERMUTATIONS.iter().collect();
        assert_eq!(distinct.len(), 6);
    }

    #[test]
    fn test_tally_decisions() {
        let d = GateDetection::from_tallies([174, 40, 40], 29, 0);
        assert_eq!(d.gate, Some(Terminal::T1));

        // Tied leaders mean no gate
        assert_eq!(GateDetection::from_tallies([174, 174, 174], 29, 0).gate, None);
        // BJT-like majority wins even with a clear leader
        assert_eq!(GateDetection::from_tallies([90, 10, 10], 14, 15).gate, None);
    }

    #[test]
    fn test_ideal_gate_found_every_round() {
        let config = TracerConfig::default().with_gate_rounds(4);
        for (pinout, gate) in [("GSD", Terminal::T1), ("SGD", Terminal::T2), ("DSG", Terminal::T3)] {
            let mut bench = bench(DeviceKind::Nmos, pinout);
            let d = detect_gate(&mut bench, &config, 4.0).unwrap();
            assert_eq!(d.gate, Some(gate), "pinout {}", pinout);
            assert_eq!(d.mosfet_rounds, 4);
            assert_eq!(d.quiet_counts[gate.index()], 24);
        }
    }

    #[test]
    fn test_bjt_has_no_gate() {
        let config = TracerConfig::default().with_gate_rounds(3);
        let mut bench = bench(DeviceKind::Npn, "EBC");
        let d = detect_gate(&mut bench, &config, 4.0).unwrap();
        assert_eq!(d.gate, None);
        assert_eq!(d.bjt_rounds, 3);
    }
}
