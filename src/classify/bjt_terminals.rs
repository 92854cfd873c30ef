//! Collector/emitter assignment from current gain.
//!
//! A transistor biased forward-active has a far higher gain than the same
//! device biased reverse-active. Each non-base terminal is tried in the
//! "tested" position of the polarity's [`GainScheme`]; the one giving the
//! larger gain occupies the scheme's `larger_gain` role.

use crate::config::TracerConfig;
use crate::device::{Polarity, Terminal, TerminalBias, TerminalRole};
use crate::error::{Result, Stage};
use crate::transducer::Transducer;

/// Bias pattern for one polarity of the gain test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GainScheme {
    pub polarity: Polarity,
    pub base: TerminalBias,
    pub tested: TerminalBias,
    pub other: TerminalBias,
    /// Role of the tested terminal that shows the larger gain.
    pub larger_gain: TerminalRole,
}

/// NPN lifts the base and drives the tested terminal high; PNP grounds the
/// base and lifts the tested terminal so a tested emitter is forward-active.
pub static GAIN_SCHEMES: [GainScheme; 2] = [
    GainScheme {
        polarity: Polarity::N,
        base: TerminalBias::LowReference,
        tested: TerminalBias::HighReference,
        other: TerminalBias::Ground,
        larger_gain: TerminalRole::Collector,
    },
    GainScheme {
        polarity: Polarity::P,
        base: TerminalBias::Ground,
        tested: TerminalBias::LowReference,
        other: TerminalBias::Ground,
        larger_gain: TerminalRole::Emitter,
    },
];

impl GainScheme {
    pub fn for_polarity(polarity: Polarity) -> &'static GainScheme {
        match polarity {
            Polarity::N => &GAIN_SCHEMES[0],
            Polarity::P => &GAIN_SCHEMES[1],
        }
    }

    /// Role of the tested terminal showing the smaller gain.
    pub fn smaller_gain(&self) -> TerminalRole {
        match self.larger_gain {
            TerminalRole::Collector => TerminalRole::Emitter,
            _ => TerminalRole::Collector,
        }
    }
}

/// Gain measured with one terminal in the tested position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainReading {
    pub tested: Terminal,
    pub base_drop: f64,
    pub tested_drop: f64,
}

impl GainReading {
    /// Tested-terminal drop over base drop, offset so a silent base does
    /// not divide by zero.
    pub fn beta(&self) -> f64 {
        self.tested_drop / (self.base_drop + 1.0)
    }
}

/// Both gain readings and the resulting `(collector, emitter)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminalGains {
    pub readings: [GainReading; 2],
    pub scheme: GainScheme,
}

impl TerminalGains {
    /// `(collector, emitter)`, or `None` if both gains are equal.
    pub fn assignment(&self) -> Option<(Terminal, Terminal)> {
        let [x, y] = self.readings;
        let (larger, smaller) = if x.beta() > y.beta() {
            (x.tested, y.tested)
        } else if y.beta() > x.beta() {
            (y.tested, x.tested)
        } else {
            return None;
        };
        match self.scheme.larger_gain {
            TerminalRole::Collector => Some((larger, smaller)),
            _ => Some((smaller, larger)),
        }
    }
}

fn measure_gain<T: Transducer>(
    transducer: &mut T,
    config: &TracerConfig,
    scheme: &GainScheme,
    base: Terminal,
    tested: Terminal,
) -> Result<GainReading> {
    let levels = &config.levels;
    let mut codes = [levels.code(scheme.other); 3];
    codes[base.index()] = levels.code(scheme.base);
    codes[tested.index()] = levels.code(scheme.tested);

    transducer.apply_biases(codes)?;
    let mut channels = [base, tested];
    channels.sort();
    transducer.select_channels(&channels)?;

    let readback = transducer.readback(config.samples.gain)?;
    Ok(GainReading {
        tested,
        base_drop: readback
            .measure(base)
            .drop(codes[base.index()], Stage::BjtTerminals)?,
        tested_drop: readback
            .measure(tested)
            .drop(codes[tested.index()], Stage::BjtTerminals)?,
    })
}

/// Measure the gain with each non-base terminal tested in turn.
pub fn resolve_bjt_terminals<T: Transducer>(
    transducer: &mut T,
    config: &TracerConfig,
    base: Terminal,
    polarity: Polarity,
) -> Result<TerminalGains> {
    let scheme = GainScheme::for_polarity(polarity);
    let [x, y] = base.others();
    let readings = [
        measure_gain(transducer, config, scheme, base, x)?,
        measure_gain(transducer, config, scheme, base, y)?,
    ];

    log::debug!(
        "Gain with base {}: {:.2} testing {}, {:.2} testing {}",
        base,
        readings[0].beta(),
        x,
        readings[1].beta(),
        y
    );
    Ok(TerminalGains {
        readings,
        scheme: *scheme,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transducer::{DeviceKind, FramedTransducer, Pinout, SimParams, SimulatedDevice};
    use approx::assert_relative_eq;

    #[test]
    fn test_beta_offset() {
        let reading = GainReading {
            tested: Terminal::T1,
            base_drop: 0.0,
            tested_drop: 50.0,
        };
        assert_relative_eq!(reading.beta(), 50.0);
    }

    #[test]
    fn test_schemes_cover_both_polarities() {
        for polarity in [Polarity::N, Polarity::P] {
            let scheme = GainScheme::for_polarity(polarity);
            assert_eq!(scheme.polarity, polarity);
            assert_ne!(scheme.larger_gain, scheme.smaller_gain());
        }
    }

    #[test]
    fn test_equal_gains_unresolved() {
        let reading = |tested| GainReading {
            tested,
            base_drop: 10.0,
            tested_drop: 100.0,
        };
        let gains = TerminalGains {
            readings: [reading(Terminal::T1), reading(Terminal::T3)],
            scheme: GAIN_SCHEMES[0],
        };
        assert_eq!(gains.assignment(), None);
    }

    #[test]
    fn test_simulated_terminals_every_base_position() {
        let config = TracerConfig::default();
        for (kind, polarity) in [(DeviceKind::Npn, Polarity::N), (DeviceKind::Pnp, Polarity::P)] {
            for pinout in ["BCE", "BEC", "CBE", "EBC", "CEB", "ECB"] {
                let pinout: Pinout = pinout.parse().unwrap();
                let roles = pinout.roles();
                let base = Terminal::ALL
                    .into_iter()
                    .find(|t| roles[t.index()] == TerminalRole::Base)
                    .unwrap();
                let sim = SimulatedDevice::new(kind, pinout, SimParams::default(), 4).unwrap();
                let mut bench = FramedTransducer::new(sim);

                let gains = resolve_bjt_terminals(&mut bench, &config, base, polarity).unwrap();
                let (collector, emitter) = gains.assignment().unwrap();
                assert_eq!(roles[collector.index()], TerminalRole::Collector, "{} {}", kind, pinout);
                assert_eq!(roles[emitter.index()], TerminalRole::Emitter, "{} {}", kind, pinout);
            }
        }
    }
}
