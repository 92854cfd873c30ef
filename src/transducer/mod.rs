//! Transducer interface consumed by the classification core.
//!
//! The core never touches wire framing. It applies DAC codes to terminals,
//! chooses which channels the ADC sequencer converts, and receives
//! [`TaggedSample`]s whose channel has already been decoded into a
//! [`ChannelTag`]. Averaging over the samples tagged to one terminal gives a
//! [`Measurement`].
//!
//! Two implementations ship with the crate:
//! - [`FramedTransducer`] speaks the 16-bit word protocol of the
//!   mixed-signal I/O chip over any [`WordLink`]
//! - [`SimulatedDevice`] is a word-level emulation of that chip with a
//!   device under test attached, used by the CLI demo and the tests

mod link;
pub mod sim;

pub use link::{
    decode_readback, encode_dac_write, encode_sequence, FramedTransducer, WordLink,
    CONFIG_SEQUENCE, NOP, SOFT_RESET,
};
pub use sim::{DeviceKind, Pinout, SimParams, SimulatedDevice};

use std::time::Duration;

use crate::device::Terminal;
use crate::error::{Result, Stage, TracerError};

/// Channel a raw readback was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelTag {
    /// Conversion of a terminal's sense channel.
    Terminal(Terminal),
    /// Any other channel address, including pipeline filler.
    Unassigned(u8),
}

/// One raw ADC readback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggedSample {
    pub tag: ChannelTag,
    /// 12-bit conversion result.
    pub raw: u16,
}

impl TaggedSample {
    /// Create a sample tagged to a terminal.
    pub fn terminal(terminal: Terminal, raw: u16) -> Self {
        Self {
            tag: ChannelTag::Terminal(terminal),
            raw,
        }
    }

    /// The terminal this sample belongs to, if any.
    pub fn terminal_tag(&self) -> Option<Terminal> {
        match self.tag {
            ChannelTag::Terminal(t) => Some(t),
            ChannelTag::Unassigned(_) => None,
        }
    }
}

/// Blocking access to the bias DACs and sense ADCs.
///
/// All operations are idempotent at the hardware level, so repeating a
/// bias write or taking more samples is always safe.
pub trait Transducer {
    /// Drive a terminal with a DAC code.
    fn set_terminal_bias(&mut self, terminal: Terminal, code: u16) -> Result<()>;

    /// Restrict conversions to the given channels, in pin order.
    fn select_channels(&mut self, terminals: &[Terminal]) -> Result<()>;

    /// Read `count` raw conversions.
    fn read_channel_samples(&mut self, count: usize) -> Result<Vec<TaggedSample>>;

    /// Block for a settle interval.
    fn settle(&mut self, delay: Duration) -> Result<()>;

    /// Drive all three terminals, in pin order.
    fn apply_biases(&mut self, codes: [u16; 3]) -> Result<()> {
        for terminal in Terminal::ALL {
            self.set_terminal_bias(terminal, codes[terminal.index()])?;
        }
        Ok(())
    }

    /// Read `count` conversions as a [`Readback`].
    fn readback(&mut self, count: usize) -> Result<Readback> {
        Ok(Readback::new(self.read_channel_samples(count)?))
    }
}

impl<T: Transducer + ?Sized> Transducer for &mut T {
    fn set_terminal_bias(&mut self, terminal: Terminal, code: u16) -> Result<()> {
        (**self).set_terminal_bias(terminal, code)
    }

    fn select_channels(&mut self, terminals: &[Terminal]) -> Result<()> {
        (**self).select_channels(terminals)
    }

    fn read_channel_samples(&mut self, count: usize) -> Result<Vec<TaggedSample>> {
        (**self).read_channel_samples(count)
    }

    fn settle(&mut self, delay: Duration) -> Result<()> {
        (**self).settle(delay)
    }
}

/// A batch of raw readbacks.
#[derive(Debug, Clone, Default)]
pub struct Readback {
    samples: Vec<TaggedSample>,
}

impl Readback {
    pub fn new(samples: Vec<TaggedSample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[TaggedSample] {
        &self.samples
    }

    /// Number of samples tagged to any terminal.
    pub fn tagged_count(&self) -> usize {
        self.samples.iter().filter(|s| s.terminal_tag().is_some()).count()
    }

    /// Accumulate the samples tagged to one terminal.
    pub fn measure(&self, terminal: Terminal) -> Measurement {
        let (sum, count) = self
            .samples
            .iter()
            .filter(|s| s.tag == ChannelTag::Terminal(terminal))
            .fold((0u64, 0usize), |(sum, n), s| (sum + s.raw as u64, n + 1));
        Measurement {
            terminal,
            sum,
            count,
        }
    }
}

/// Averaged readback of one terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub terminal: Terminal,
    pub sum: u64,
    /// Samples positively tagged to `terminal`.
    pub count: usize,
}

impl Measurement {
    /// Mean raw value; starvation when no sample was tagged to the terminal.
    pub fn mean(&self, stage: Stage) -> Result<f64> {
        if self.count == 0 {
            return Err(TracerError::starvation(stage, self.terminal));
        }
        Ok(self.sum as f64 / self.count as f64)
    }

    /// Assigned code minus the measured mean.
    ///
    /// Positive when current flows from the driver into the device.
    pub fn signed_drop(&self, assigned: u16, stage: Stage) -> Result<f64> {
        Ok(assigned as f64 - self.mean(stage)?)
    }

    /// Magnitude of the difference between assigned and measured level.
    pub fn drop(&self, assigned: u16, stage: Stage) -> Result<f64> {
        Ok(self.signed_drop(assigned, stage)?.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn readback() -> Readback {
        Readback::new(vec![
            TaggedSample::terminal(Terminal::T1, 100),
            TaggedSample::terminal(Terminal::T2, 808),
            TaggedSample::terminal(Terminal::T1, 110),
            TaggedSample {
                tag: ChannelTag::Unassigned(0),
                raw: 4000,
            },
        ])
    }

    #[test]
    fn test_measure_averages_only_tagged_samples() {
        let rb = readback();
        let m = rb.measure(Terminal::T1);
        assert_eq!(m.count, 2);
        assert_relative_eq!(m.mean(Stage::GateDetection).unwrap(), 105.0);
        assert_relative_eq!(m.signed_drop(808, Stage::GateDetection).unwrap(), 703.0);
        assert_eq!(rb.tagged_count(), 3);
    }

    #[test]
    fn test_empty_channel_is_starvation() {
        let m = readback().measure(Terminal::T3);
        let err = m.drop(0, Stage::BjtTyping).unwrap_err();
        assert!(matches!(
            err,
            TracerError::SampleStarvation {
                stage: Stage::BjtTyping,
                terminal: Terminal::T3
            }
        ));
    }
}
