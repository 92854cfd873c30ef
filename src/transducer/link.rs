//! Word framing for the mixed-signal I/O chip.
//!
//! Every exchange is one full-duplex 16-bit transfer, MSB first:
//!
//! ```text
//! DAC write   1 aaa dddddddddddd   a = DAC address, d = 12-bit code
//! ADC seq.    0001 0010 0mmm 0000  m = channel mask (repeat bit set)
//! No-op       0000 0000 0000 0000  clocks out the next conversion
//! Readback    0 ccc dddddddddddd   c = ADC address, d = 12-bit result
//! ```
//!
//! Terminals 1, 2 and 3 are driven by DAC addresses 0, 1 and 3 and sensed on
//! ADC addresses 4, 5 and 6.

use std::time::Duration;

use super::{ChannelTag, TaggedSample, Transducer};
use crate::device::Terminal;
use crate::error::Result;

/// No-op command.
pub const NOP: u16 = 0x0000;

/// Software reset command.
pub const SOFT_RESET: u16 = 0x7DAC;

/// Register writes sent after reset: ADC config, DAC config, general
/// purpose control, GPIO config, full ADC sequence.
pub const CONFIG_SEQUENCE: [u16; 5] = [0x2070, 0x280B, 0x1800, 0x4180, 0x1270];

const DAC_WRITE: u16 = 0x8000;
const SEQUENCE_BASE: u16 = 0x1200;
const DATA_MASK: u16 = 0x0FFF;
const DAC_ADDRESS: [u16; 3] = [0, 1, 3];
const ADC_BASE_ADDRESS: u8 = 4;

/// One full-duplex 16-bit exchange with the chip.
pub trait WordLink {
    /// Send a word and return the word clocked back.
    fn transfer(&mut self, word: u16) -> Result<u16>;

    /// Block for `delay`.
    fn pause(&mut self, delay: Duration) -> Result<()> {
        std::thread::sleep(delay);
        Ok(())
    }
}

/// DAC write word driving `terminal` with `code` (truncated to 12 bits).
pub fn encode_dac_write(terminal: Terminal, code: u16) -> u16 {
    DAC_WRITE | (DAC_ADDRESS[terminal.index()] << 12) | (code & DATA_MASK)
}

/// ADC sequence word converting the given terminals' channels.
pub fn encode_sequence(terminals: &[Terminal]) -> u16 {
    terminals.iter().fold(SEQUENCE_BASE, |word, t| {
        word | (1 << (ADC_BASE_ADDRESS as usize + t.index()))
    })
}

/// Decode a readback word into a tagged sample.
pub fn decode_readback(word: u16) -> TaggedSample {
    let address = ((word >> 12) & 0x07) as u8;
    let raw = word & DATA_MASK;
    let tag = address
        .checked_sub(ADC_BASE_ADDRESS)
        .and_then(|i| Terminal::from_index(i as usize))
        .map(ChannelTag::Terminal)
        .unwrap_or(ChannelTag::Unassigned(address));
    TaggedSample { tag, raw }
}

/// [`Transducer`] speaking the chip's word protocol over a [`WordLink`].
pub struct FramedTransducer<L: WordLink> {
    link: L,
}

impl<L: WordLink> FramedTransducer<L> {
    pub fn new(link: L) -> Self {
        Self { link }
    }

    /// Reset the chip and load the power-up register configuration.
    pub fn configure(&mut self) -> Result<()> {
        self.link.transfer(SOFT_RESET)?;
        self.link.pause(Duration::from_millis(1))?;
        for word in CONFIG_SEQUENCE {
            self.link.transfer(word)?;
        }
        log::debug!("Chip configured with {} register writes", CONFIG_SEQUENCE.len());
        Ok(())
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn into_inner(self) -> L {
        self.link
    }
}

impl<L: WordLink> Transducer for FramedTransducer<L> {
    fn set_terminal_bias(&mut self, terminal: Terminal, code: u16) -> Result<()> {
        self.link.transfer(encode_dac_write(terminal, code))?;
        Ok(())
    }

    fn select_channels(&mut self, terminals: &[Terminal]) -> Result<()> {
        self.link.transfer(encode_sequence(terminals))?;
        // The first conversion after a sequence change still belongs to the old sequence.
        self.link.transfer(NOP)?;
        Ok(())
    }

    fn read_channel_samples(&mut self, count: usize) -> Result<Vec<TaggedSample>> {
        (0..count)
            .map(|_| self.link.transfer(NOP).map(decode_readback))
            .collect()
    }

    fn settle(&mut self, delay: Duration) -> Result<()> {
        self.link.pause(delay)
    }
}
