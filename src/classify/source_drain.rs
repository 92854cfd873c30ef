//! Source/drain assignment from the body diode.
//!
//! With the gate grounded, each of the two channel terminals in turn is
//! driven high while the other is grounded. The channel-terminal pair only
//! forward-biases the body diode in one of the two configurations, and that
//! configuration shows the larger drop on the observed terminal. N-channel
//! devices put the diode's anode on the source, P-channel devices on the
//! drain.

use crate::config::TracerConfig;
use crate::device::{Polarity, Terminal, TerminalBias};
use crate::error::{Result, Stage};
use crate::transducer::Transducer;

/// Drops observed on terminal `a` in both body-diode configurations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDiodeReading {
    pub a: Terminal,
    pub b: Terminal,
    /// `a` driven high, `b` grounded.
    pub a_driven: f64,
    /// `b` driven high, `a` grounded.
    pub b_driven: f64,
}

impl BodyDiodeReading {
    /// The terminal whose high drive forward-biased the body diode.
    pub fn forward_terminal(&self) -> Terminal {
        if self.a_driven.abs() > self.b_driven.abs() {
            self.a
        } else {
            self.b
        }
    }

    /// `(source, drain)` for the given channel polarity.
    pub fn assignment(&self, polarity: Polarity) -> (Terminal, Terminal) {
        assign_source_drain(self.forward_terminal(), self.a, self.b, polarity)
    }
}

/// Map the forward-conducting terminal to `(source, drain)`.
pub fn assign_source_drain(
    forward: Terminal,
    a: Terminal,
    b: Terminal,
    polarity: Polarity,
) -> (Terminal, Terminal) {
    let reverse = if forward == a { b } else { a };
    match polarity {
        Polarity::N => (forward, reverse),
        Polarity::P => (reverse, forward),
    }
}

/// Run both body-diode configurations around `gate`.
pub fn probe_body_diode<T: Transducer>(
    transducer: &mut T,
    config: &TracerConfig,
    gate: Terminal,
) -> Result<BodyDiodeReading> {
    let ground = config.levels.code(TerminalBias::Ground);
    let high = config.levels.code(TerminalBias::HighReference);
    let [a, b] = gate.others();
    let samples = config.samples.body_diode;

    transducer.set_terminal_bias(gate, ground)?;
    transducer.set_terminal_bias(b, ground)?;
    transducer.set_terminal_bias(a, high)?;
    transducer.select_channels(&[a])?;
    let a_driven = transducer
        .readback(samples)?
        .measure(a)
        .signed_drop(high, Stage::SourceDrain)?;

    transducer.set_terminal_bias(a, ground)?;
    transducer.set_terminal_bias(b, high)?;
    let b_driven = transducer
        .readback(samples)?
        .measure(a)
        .signed_drop(ground, Stage::SourceDrain)?;

    log::debug!(
        "Body diode drops on {}: {:.2} with it driven, {:.2} with {} driven",
        a,
        a_driven,
        b_driven,
        b
    );
    Ok(BodyDiodeReading {
        a,
        b,
        a_driven,
        b_driven,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::TerminalRole;
    use crate::transducer::{DeviceKind, FramedTransducer, Pinout, SimParams, SimulatedDevice};

    #[test]
    fn test_assignment_is_antisymmetric() {
        let (a, b) = (Terminal::T1, Terminal::T3);
        for polarity in [Polarity::N, Polarity::P] {
            let first = assign_source_drain(a, a, b, polarity);
            let swapped = assign_source_drain(b, a, b, polarity.inverted());
            assert_eq!(first, swapped);

            let flipped = assign_source_drain(b, a, b, polarity);
            assert_eq!(first, (flipped.1, flipped.0));
        }
    }

    #[test]
    fn test_reading_compares_magnitudes() {
        let reading = BodyDiodeReading {
            a: Terminal::T2,
            b: Terminal::T3,
            a_driven: 12.0,
            b_driven: -1750.0,
        };
        assert_eq!(reading.forward_terminal(), Terminal::T3);
        assert_eq!(reading.assignment(Polarity::N), (Terminal::T3, Terminal::T2));
        assert_eq!(reading.assignment(Polarity::P), (Terminal::T2, Terminal::T3));
    }

    #[test]
    fn test_simulated_body_diode() {
        let config = TracerConfig::default();
        for (kind, pinout, polarity) in [
            (DeviceKind::Nmos, "GSD", Polarity::N),
            (DeviceKind::Nmos, "DSG", Polarity::N),
            (DeviceKind::Pmos, "SGD", Polarity::P),
            (DeviceKind::Pmos, "GDS", Polarity::P),
        ] {
            let pinout: Pinout = pinout.parse().unwrap();
            let roles = pinout.roles();
            let sim = SimulatedDevice::new(kind, pinout, SimParams::default(), 9).unwrap();
            let mut bench = FramedTransducer::new(sim);
            let gate = Terminal::ALL
                .into_iter()
                .find(|t| roles[t.index()] == TerminalRole::Gate)
                .unwrap();

            let (source, drain) = probe_body_diode(&mut bench, &config, gate)
                .unwrap()
                .assignment(polarity);
            assert_eq!(roles[source.index()], TerminalRole::Source, "{} {}", kind, pinout);
            assert_eq!(roles[drain.index()], TerminalRole::Drain, "{} {}", kind, pinout);
        }
    }
}
