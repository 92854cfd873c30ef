//! Core types for device classification.

use std::fmt;

/// One of the three physical pins of the device under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Terminal {
    T1,
    T2,
    T3,
}

impl Terminal {
    /// All terminals in pin order.
    pub const ALL: [Terminal; 3] = [Terminal::T1, Terminal::T2, Terminal::T3];

    /// Zero-based pin index.
    pub fn index(self) -> usize {
        match self {
            Terminal::T1 => 0,
            Terminal::T2 => 1,
            Terminal::T3 => 2,
        }
    }

    /// Terminal for a zero-based pin index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The two other terminals, in pin order.
    pub fn others(self) -> [Terminal; 2] {
        match self {
            Terminal::T1 => [Terminal::T2, Terminal::T3],
            Terminal::T2 => [Terminal::T1, Terminal::T3],
            Terminal::T3 => [Terminal::T1, Terminal::T2],
        }
    }

    /// The terminal that is neither `self` nor `other`.
    pub fn remaining(self, other: Terminal) -> Option<Terminal> {
        if self == other {
            return None;
        }
        Self::ALL.into_iter().find(|t| *t != self && *t != other)
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "terminal {}", self.index() + 1)
    }
}

/// Role of a terminal once classification has resolved it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TerminalRole {
    #[default]
    Unknown,
    Gate,
    Source,
    Drain,
    Base,
    Collector,
    Emitter,
}

impl TerminalRole {
    /// Single-letter pinout code.
    pub fn letter(self) -> char {
        match self {
            TerminalRole::Unknown => '?',
            TerminalRole::Gate => 'G',
            TerminalRole::Source => 'S',
            TerminalRole::Drain => 'D',
            TerminalRole::Base => 'B',
            TerminalRole::Collector => 'C',
            TerminalRole::Emitter => 'E',
        }
    }
}

impl fmt::Display for TerminalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerminalRole::Unknown => "UNKNOWN",
            TerminalRole::Gate => "GATE",
            TerminalRole::Source => "SOURCE",
            TerminalRole::Drain => "DRAIN",
            TerminalRole::Base => "BASE",
            TerminalRole::Collector => "COLLECTOR",
            TerminalRole::Emitter => "EMITTER",
        };
        f.write_str(name)
    }
}

/// Device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceType {
    #[default]
    Unknown,
    Mosfet,
    Bjt,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceType::Unknown => "UNKNOWN",
            DeviceType::Mosfet => "MOSFET",
            DeviceType::Bjt => "BJT",
        };
        f.write_str(name)
    }
}

/// Device subtype within its family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceSubtype {
    #[default]
    Unknown,
    Nmos,
    Pmos,
    Npn,
    Pnp,
}

impl DeviceSubtype {
    /// Carrier polarity, if the subtype is resolved.
    pub fn polarity(self) -> Option<Polarity> {
        match self {
            DeviceSubtype::Nmos | DeviceSubtype::Npn => Some(Polarity::N),
            DeviceSubtype::Pmos | DeviceSubtype::Pnp => Some(Polarity::P),
            DeviceSubtype::Unknown => None,
        }
    }

    /// Family this subtype belongs to.
    pub fn device_type(self) -> DeviceType {
        match self {
            DeviceSubtype::Nmos | DeviceSubtype::Pmos => DeviceType::Mosfet,
            DeviceSubtype::Npn | DeviceSubtype::Pnp => DeviceType::Bjt,
            DeviceSubtype::Unknown => DeviceType::Unknown,
        }
    }
}

impl fmt::Display for DeviceSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceSubtype::Unknown => "UNKNOWN",
            DeviceSubtype::Nmos => "NMOS",
            DeviceSubtype::Pmos => "PMOS",
            DeviceSubtype::Npn => "NPN",
            DeviceSubtype::Pnp => "PNP",
        };
        f.write_str(name)
    }
}

/// Carrier polarity shared by NMOS/NPN and PMOS/PNP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    N,
    P,
}

impl Polarity {
    /// The MOSFET subtype with this polarity.
    pub fn mos(self) -> DeviceSubtype {
        match self {
            Polarity::N => DeviceSubtype::Nmos,
            Polarity::P => DeviceSubtype::Pmos,
        }
    }

    /// The BJT subtype with this polarity.
    pub fn bipolar(self) -> DeviceSubtype {
        match self {
            Polarity::N => DeviceSubtype::Npn,
            Polarity::P => DeviceSubtype::Pnp,
        }
    }

    /// The other polarity.
    pub fn inverted(self) -> Self {
        match self {
            Polarity::N => Polarity::P,
            Polarity::P => Polarity::N,
        }
    }
}

/// Canonical bias level applied to a terminal during classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TerminalBias {
    /// 0 V
    Ground,
    /// About 1 V
    LowReference,
    /// About 5 V
    HighReference,
}

impl fmt::Display for TerminalBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalBias::Ground => write!(f, "GND"),
            TerminalBias::LowReference => write!(f, "VLOW"),
            TerminalBias::HighReference => write!(f, "VHIGH"),
        }
    }
}
