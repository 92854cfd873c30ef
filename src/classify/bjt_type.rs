//! Base and NPN/PNP identification by single-terminal injection.
//!
//! Each terminal in turn is lifted to the low reference with the other two
//! grounded. On an NPN only the base conducts (both junctions forward
//! biased from the base side); on a PNP the collector and emitter conduct
//! and the base does not.

use crate::config::TracerConfig;
use crate::device::{Polarity, Terminal, TerminalBias};
use crate::error::{Result, Stage};
use crate::transducer::Transducer;

/// Injection drops and the terminals flagged as conducting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BjtTyping {
    pub drops: [f64; 3],
    pub flagged: [bool; 3],
}

impl BjtTyping {
    pub fn from_drops(drops: [f64; 3], threshold: f64) -> Self {
        Self {
            drops,
            flagged: drops.map(|d| d > threshold),
        }
    }

    /// Base terminal and polarity; `None` when zero or three terminals
    /// conducted.
    pub fn decide(&self) -> Option<(Terminal, Polarity)> {
        let flagged: Vec<Terminal> = Terminal::ALL
            .into_iter()
            .filter(|t| self.flagged[t.index()])
            .collect();
        match flagged.as_slice() {
            [base] => Some((*base, Polarity::N)),
            [x, y] => x.remaining(*y).map(|base| (base, Polarity::P)),
            _ => None,
        }
    }
}

/// Inject into each terminal and flag the ones that conduct.
pub fn type_bjt<T: Transducer>(
    transducer: &mut T,
    config: &TracerConfig,
    threshold: f64,
) -> Result<BjtTyping> {
    let ground = config.levels.code(TerminalBias::Ground);
    let low = config.levels.code(TerminalBias::LowReference);
    let mut drops = [0.0; 3];

    for terminal in Terminal::ALL {
        let mut codes = [ground; 3];
        codes[terminal.index()] = low;
        transducer.apply_biases(codes)?;
        transducer.select_channels(&[terminal])?;
        drops[terminal.index()] = transducer
            .readback(config.samples.bjt_type)?
            .measure(terminal)
            .drop(low, Stage::BjtTyping)?;
    }

    let typing = BjtTyping::from_drops(drops, threshold);
    log::debug!(
        "BJT injection drops {:?}, flagged {:?}",
        typing.drops,
        typing.flagged
    );
    Ok(typing)
}
