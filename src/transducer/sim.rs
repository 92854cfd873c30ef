//! Simulated bench: the I/O chip with a device under test attached.
//!
//! [`SimulatedDevice`] answers the same 16-bit words as the real chip, so
//! the core talks to it through [`FramedTransducer`](super::FramedTransducer)
//! exactly as it would talk to hardware. Each terminal is driven through a
//! sense resistor; a readback is the applied code minus the drop caused by
//! the current flowing into the device, plus seeded noise:
//!
//! ```text
//! raw = clamp(code - I_into * R_sense + noise, 0, 4095)
//! ```
//!
//! Currents are expressed directly in ADC codes of sense-resistor drop.
//! MOSFETs use a square-law channel with a current limit and a body diode
//! (source to drain for N-channel, drain to source for P-channel). BJTs use
//! a piecewise-linear transport model with separate forward and reverse
//! gains, which is what makes the forward-active configuration stand out.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::link::{WordLink, NOP, SOFT_RESET};
use crate::device::{DeviceType, Polarity, Terminal, TerminalRole};
use crate::error::{Result, TracerError};

const FULL_SCALE_CODE: f64 = 4095.0;

/// Kind of device plugged into the simulated socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Nmos,
    Pmos,
    Npn,
    Pnp,
    /// Empty socket.
    Open,
}

impl DeviceKind {
    pub fn device_type(self) -> DeviceType {
        match self {
            DeviceKind::Nmos | DeviceKind::Pmos => DeviceType::Mosfet,
            DeviceKind::Npn | DeviceKind::Pnp => DeviceType::Bjt,
            DeviceKind::Open => DeviceType::Unknown,
        }
    }

    fn polarity(self) -> Option<Polarity> {
        match self {
            DeviceKind::Nmos | DeviceKind::Npn => Some(Polarity::N),
            DeviceKind::Pmos | DeviceKind::Pnp => Some(Polarity::P),
            DeviceKind::Open => None,
        }
    }
}

impl FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nmos" => Ok(DeviceKind::Nmos),
            "pmos" => Ok(DeviceKind::Pmos),
            "npn" => Ok(DeviceKind::Npn),
            "pnp" => Ok(DeviceKind::Pnp),
            "open" | "none" => Ok(DeviceKind::Open),
            other => Err(format!(
                "unknown device kind '{}' (expected nmos, pmos, npn, pnp or open)",
                other
            )),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceKind::Nmos => "nmos",
            DeviceKind::Pmos => "pmos",
            DeviceKind::Npn => "npn",
            DeviceKind::Pnp => "pnp",
            DeviceKind::Open => "open",
        };
        f.write_str(name)
    }
}

/// Physical role of each socket terminal, e.g. `GSD` or `EBC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pinout(pub [TerminalRole; 3]);

impl Pinout {
    pub fn roles(&self) -> [TerminalRole; 3] {
        self.0
    }

    /// Family implied by the role letters.
    pub fn family(&self) -> DeviceType {
        if self.0.contains(&TerminalRole::Gate) {
            DeviceType::Mosfet
        } else {
            DeviceType::Bjt
        }
    }

    fn index_of(&self, role: TerminalRole) -> usize {
        self.0.iter().position(|r| *r == role).unwrap_or(0)
    }
}

impl FromStr for Pinout {
    type Err = TracerError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |message: &str| TracerError::InvalidPinout {
            input: s.to_string(),
            message: message.to_string(),
        };

        let letters: Vec<char> = s.trim().to_ascii_uppercase().chars().collect();
        if letters.len() != 3 {
            return Err(invalid("expected exactly three role letters"));
        }

        let mut roles = [TerminalRole::Unknown; 3];
        for (slot, letter) in roles.iter_mut().zip(&letters) {
            *slot = match letter {
                'G' => TerminalRole::Gate,
                'S' => TerminalRole::Source,
                'D' => TerminalRole::Drain,
                'B' => TerminalRole::Base,
                'C' => TerminalRole::Collector,
                'E' => TerminalRole::Emitter,
                _ => return Err(invalid("role letters are G, S, D, B, C and E")),
            };
        }

        let mos = [TerminalRole::Gate, TerminalRole::Source, TerminalRole::Drain];
        let bjt = [TerminalRole::Base, TerminalRole::Collector, TerminalRole::Emitter];
        let covers = |family: &[TerminalRole; 3]| family.iter().all(|r| roles.contains(r));
        if !covers(&mos) && !covers(&bjt) {
            return Err(invalid("need one each of G/S/D or of B/C/E"));
        }

        Ok(Pinout(roles))
    }
}

impl fmt::Display for Pinout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for role in self.0 {
            write!(f, "{}", role.letter())?;
        }
        Ok(())
    }
}

/// Electrical parameters of the simulated device, in volts and ADC codes.
#[derive(Debug, Clone)]
pub struct SimParams {
    /// Voltage at DAC code 4095.
    pub full_scale_volts: f64,
    /// Junction turn-on voltage.
    pub junction_vf: f64,
    /// Junction drop in codes per volt beyond `junction_vf`.
    pub diode_slope: f64,
    /// MOSFET threshold magnitude.
    pub mos_vth: f64,
    /// MOSFET transconductance factor in codes per V².
    pub mos_k: f64,
    /// Largest channel current in codes.
    pub channel_limit: f64,
    /// BJT transport current in codes per volt of junction overdrive.
    pub transport_slope: f64,
    /// Forward current gain.
    pub beta_f: f64,
    /// Reverse current gain.
    pub beta_r: f64,
    /// Peak uniform noise in codes.
    ///
    /// Keep this above zero: the calibrated floor is the largest noise seen
    /// at rest, and a terminal only reads as quiet when its drop is strictly
    /// below that floor. A noiseless bench classifies every MOSFET as a BJT.
    pub noise: u16,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            full_scale_volts: 5.0,
            junction_vf: 0.6,
            diode_slope: 400.0,
            mos_vth: 0.5,
            mos_k: 200.0,
            channel_limit: 1000.0,
            transport_slope: 4000.0,
            beta_f: 100.0,
            beta_r: 1.0,
            noise: 4,
        }
    }
}

impl SimParams {
    /// Set the peak noise amplitude.
    pub fn with_noise(mut self, noise: u16) -> Self {
        self.noise = noise;
        self
    }

    fn junction(&self, v: f64) -> f64 {
        (v - self.junction_vf).max(0.0)
    }
}

/// Word-level emulation of the I/O chip with a device in the socket.
pub struct SimulatedDevice {
    kind: DeviceKind,
    pinout: Pinout,
    params: SimParams,
    rng: StdRng,
    dac: [u16; 3],
    sequence: Vec<Terminal>,
    cursor: usize,
    /// Next no-op returns pipeline filler.
    stale: bool,
    elapsed: Duration,
}

impl SimulatedDevice {
    /// Attach a device with the given pinout.
    pub fn new(kind: DeviceKind, pinout: Pinout, params: SimParams, seed: u64) -> Result<Self> {
        if kind != DeviceKind::Open && kind.device_type() != pinout.family() {
            return Err(TracerError::InvalidPinout {
                input: pinout.to_string(),
                message: format!("pinout does not describe a {} device", kind),
            });
        }
        Ok(Self {
            kind,
            pinout,
            params,
            rng: StdRng::seed_from_u64(seed),
            dac: [0; 3],
            sequence: Terminal::ALL.to_vec(),
            cursor: 0,
            stale: false,
            elapsed: Duration::ZERO,
        })
    }

    /// An empty socket.
    pub fn open(params: SimParams, seed: u64) -> Self {
        Self {
            kind: DeviceKind::Open,
            pinout: Pinout([TerminalRole::Unknown; 3]),
            params,
            rng: StdRng::seed_from_u64(seed),
            dac: [0; 3],
            sequence: Terminal::ALL.to_vec(),
            cursor: 0,
            stale: false,
            elapsed: Duration::ZERO,
        }
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn pinout(&self) -> Pinout {
        self.pinout
    }

    /// Total time spent in pauses.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Current flowing into the device at each terminal, in codes of sense drop.
    pub fn terminal_currents(&self) -> [f64; 3] {
        let scale = self.params.full_scale_volts / FULL_SCALE_CODE;
        let v = self.dac.map(|c| c as f64 * scale);
        let mut i = [0.0; 3];

        let Some(polarity) = self.kind.polarity() else {
            return i;
        };
        match self.kind.device_type() {
            DeviceType::Mosfet => self.mos_currents(polarity, &v, &mut i),
            _ => self.bjt_currents(polarity, &v, &mut i),
        }
        i
    }

    fn mos_currents(&self, polarity: Polarity, v: &[f64; 3], i: &mut [f64; 3]) {
        let p = &self.params;
        let g = self.pinout.index_of(TerminalRole::Gate);
        let s = self.pinout.index_of(TerminalRole::Source);
        let d = self.pinout.index_of(TerminalRole::Drain);

        // Body diode
        let (anode, cathode) = match polarity {
            Polarity::N => (s, d),
            Polarity::P => (d, s),
        };
        let diode = p.diode_slope * p.junction(v[anode] - v[cathode]);
        i[anode] += diode;
        i[cathode] -= diode;

        // Channel conducts between whichever of source/drain sits higher and lower
        let (hi, lo) = if v[s] >= v[d] { (s, d) } else { (d, s) };
        let vds = v[hi] - v[lo];
        let vov = match polarity {
            Polarity::N => v[g] - v[lo] - p.mos_vth,
            Polarity::P => v[hi] - v[g] - p.mos_vth,
        };
        if vov > 0.0 && vds > 0.0 {
            let channel = if vds < vov {
                p.mos_k * (2.0 * vov * vds - vds * vds)
            } else {
                p.mos_k * vov * vov
            };
            let channel = channel.min(p.channel_limit);
            i[hi] += channel;
            i[lo] -= channel;
        }
    }

    fn bjt_currents(&self, polarity: Polarity, v: &[f64; 3], i: &mut [f64; 3]) {
        let p = &self.params;
        let b = self.pinout.index_of(TerminalRole::Base);
        let c = self.pinout.index_of(TerminalRole::Collector);
        let e = self.pinout.index_of(TerminalRole::Emitter);

        let (forward, reverse) = match polarity {
            Polarity::N => (p.junction(v[b] - v[e]), p.junction(v[b] - v[c])),
            Polarity::P => (p.junction(v[e] - v[b]), p.junction(v[c] - v[b])),
        };
        let transport = p.transport_slope * (forward - reverse);
        let base_forward = p.transport_slope * forward / p.beta_f;
        let base_reverse = p.transport_slope * reverse / p.beta_r;

        let sign = match polarity {
            Polarity::N => 1.0,
            Polarity::P => -1.0,
        };
        i[b] += sign * (base_forward + base_reverse);
        i[c] += sign * (transport - base_reverse);
        i[e] -= sign * (transport + base_forward);
    }

    fn convert(&mut self, terminal: Terminal) -> u16 {
        let current = self.terminal_currents()[terminal.index()];
        let noise = match self.params.noise {
            0 => 0.0,
            n => self.rng.gen_range(-(n as i32)..=n as i32) as f64,
        };
        let value = self.dac[terminal.index()] as f64 - current + noise;
        value.round().clamp(0.0, FULL_SCALE_CODE) as u16
    }

    fn next_readback(&mut self) -> u16 {
        if self.stale || self.sequence.is_empty() {
            self.stale = false;
            return 0x0000;
        }
        let terminal = self.sequence[self.cursor % self.sequence.len()];
        self.cursor += 1;
        let raw = self.convert(terminal);
        ((4 + terminal.index() as u16) << 12) | raw
    }

    fn reset(&mut self) {
        self.dac = [0; 3];
        self.sequence = Terminal::ALL.to_vec();
        self.cursor = 0;
        self.stale = false;
    }
}

impl WordLink for SimulatedDevice {
    fn transfer(&mut self, word: u16) -> Result<u16> {
        if word & 0x8000 != 0 {
            let terminal = match (word >> 12) & 0x07 {
                0 => Some(Terminal::T1),
                1 => Some(Terminal::T2),
                3 => Some(Terminal::T3),
                _ => None,
            };
            if let Some(t) = terminal {
                self.dac[t.index()] = word & 0x0FFF;
            }
            return Ok(0);
        }

        match word {
            NOP => Ok(self.next_readback()),
            SOFT_RESET => {
                self.reset();
                Ok(0)
            }
            w if w & 0xF800 == 0x1000 => {
                self.sequence = Terminal::ALL
                    .into_iter()
                    .filter(|t| w & (1 << (4 + t.index())) != 0)
                    .collect();
                self.cursor = 0;
                self.stale = true;
                Ok(0)
            }
            // Remaining configuration registers do not affect the emulation
            _ => Ok(0),
        }
    }

    fn pause(&mut self, delay: Duration) -> Result<()> {
        self.elapsed += delay;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transducer::{encode_dac_write, encode_sequence, decode_readback};

    fn device(kind: DeviceKind, pinout: &str) -> SimulatedDevice {
        let params = SimParams::default().with_noise(0);
        SimulatedDevice::new(kind, pinout.parse().unwrap(), params, 1).unwrap()
    }

    fn drive(dev: &mut SimulatedDevice, codes: [u16; 3]) {
        for t in Terminal::ALL {
            dev.transfer(encode_dac_write(t, codes[t.index()])).unwrap();
        }
    }

    #[test]
    fn test_pinout_parsing() {
        let pinout: Pinout = "gds".parse().unwrap();
        assert_eq!(
            pinout.roles(),
            [TerminalRole::Gate, TerminalRole::Drain, TerminalRole::Source]
        );
        assert_eq!(pinout.family(), DeviceType::Mosfet);
        assert_eq!(pinout.to_string(), "GDS");

        assert!("GSB".parse::<Pinout>().is_err());
        assert!("GG".parse::<Pinout>().is_err());
        assert!("XYZ".parse::<Pinout>().is_err());
    }

    #[test]
    fn test_kind_must_match_pinout() {
        let pinout: Pinout = "BCE".parse().unwrap();
        assert!(SimulatedDevice::new(DeviceKind::Nmos, pinout, SimParams::default(), 0).is_err());
        assert_eq!("PNP".parse::<DeviceKind>(), Ok(DeviceKind::Pnp));
    }

    #[test]
    fn test_gate_draws_no_current() {
        let mut dev = device(DeviceKind::Nmos, "GSD");
        drive(&mut dev, [4095, 0, 808]);
        let i = dev.terminal_currents();
        assert_eq!(i[0], 0.0);
        assert!(i[2] > 0.0, "drain sinks current with the channel open");
        assert!((i[1] + i[2]).abs() < 1e-9);
    }

    #[test]
    fn test_body_diode_orientation() {
        // NMOS: source above drain forward-biases the body diode
        let mut dev = device(DeviceKind::Nmos, "GSD");
        drive(&mut dev, [0, 4095, 0]);
        assert!(dev.terminal_currents()[1] > 0.0);
        drive(&mut dev, [0, 0, 4095]);
        assert_eq!(dev.terminal_currents()[2], 0.0);

        // PMOS: drain above source does
        let mut dev = device(DeviceKind::Pmos, "GSD");
        drive(&mut dev, [4095, 0, 4095]);
        assert!(dev.terminal_currents()[2] > 0.0);
    }

    #[test]
    fn test_bjt_currents_balance() {
        for (kind, codes) in [
            (DeviceKind::Npn, [808, 4095, 0]),
            (DeviceKind::Pnp, [0, 0, 808]),
        ] {
            let mut dev = device(kind, "BCE");
            drive(&mut dev, codes);
            let i = dev.terminal_currents();
            assert!(i.iter().sum::<f64>().abs() < 1e-6);
            assert!(i.iter().any(|x| x.abs() > 100.0));
        }
    }

    #[test]
    fn test_sequence_and_readback_words() {
        let mut dev = device(DeviceKind::Open, "BCE");
        drive(&mut dev, [100, 200, 300]);
        dev.transfer(encode_sequence(&[Terminal::T2, Terminal::T3])).unwrap();

        // First conversion after a sequence change is filler
        assert_eq!(dev.transfer(NOP).unwrap(), 0x0000);
        let a = decode_readback(dev.transfer(NOP).unwrap());
        let b = decode_readback(dev.transfer(NOP).unwrap());
        let c = decode_readback(dev.transfer(NOP).unwrap());
        assert_eq!(a.terminal_tag(), Some(Terminal::T2));
        assert_eq!(a.raw, 200);
        assert_eq!(b.terminal_tag(), Some(Terminal::T3));
        assert_eq!(b.raw, 300);
        assert_eq!(c.terminal_tag(), Some(Terminal::T2));
    }

    #[test]
    fn test_noise_is_seeded() {
        let read = |seed| {
            let params = SimParams::default().with_noise(4);
            let mut dev = SimulatedDevice::open(params, seed);
            drive(&mut dev, [808, 808, 808]);
            (0..20).map(|_| dev.transfer(NOP).unwrap()).collect::<Vec<_>>()
        };
        assert_eq!(read(7), read(7));
        assert!(read(7)
            .iter()
            .all(|w| (804..=812).contains(&(w & 0x0FFF))));
    }
}
