//! NMOS/PMOS discrimination by gate discharge.
//!
//! With the gate high and a small bias on one channel terminal, an N-channel
//! device conducts and a P-channel device does not. Grounding the gate and
//! waiting for it to discharge reverses that, so the direction in which the
//! channel terminal's drop moves gives the polarity.

use crate::config::TracerConfig;
use crate::device::{Polarity, Terminal, TerminalBias};
use crate::error::{Result, Stage};
use crate::transducer::Transducer;

/// Drops of the probed terminal before and after the gate discharge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarityReading {
    pub probed: Terminal,
    pub before: f64,
    pub after: f64,
}

impl PolarityReading {
    /// `None` when the two drops are identical.
    pub fn polarity(&self) -> Option<Polarity> {
        if self.before > self.after {
            Some(Polarity::N)
        } else if self.before < self.after {
            Some(Polarity::P)
        } else {
            None
        }
    }
}

/// Probe the lower-numbered non-gate terminal across a gate discharge.
pub fn classify_polarity<T: Transducer>(
    transducer: &mut T,
    config: &TracerConfig,
    gate: Terminal,
) -> Result<PolarityReading> {
    let levels = &config.levels;
    let [probed, other] = gate.others();
    let low = levels.code(TerminalBias::LowReference);

    transducer.set_terminal_bias(gate, levels.code(TerminalBias::HighReference))?;
    transducer.set_terminal_bias(probed, low)?;
    transducer.set_terminal_bias(other, levels.code(TerminalBias::Ground))?;
    transducer.select_channels(&[probed])?;
    let before = transducer
        .readback(config.samples.polarity)?
        .measure(probed)
        .drop(low, Stage::Polarity)?;

    transducer.set_terminal_bias(gate, levels.code(TerminalBias::Ground))?;
    transducer.settle(config.settle_delay())?;
    let after = transducer
        .readback(config.samples.polarity)?
        .measure(probed)
        .drop(low, Stage::Polarity)?;

    log::debug!(
        "Polarity probe on {}: drop {:.2} before, {:.2} after gate discharge",
        probed,
        before,
        after
    );
    Ok(PolarityReading {
        probed,
        before,
        after,
    })
}
