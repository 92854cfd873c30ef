//! Status display of a finished classification.
//!
//! Two displays are provided: a console summary and a scrolling
//! seven-segment display fed one glyph code at a time. The glyph sequence
//! spells the family, the subtype, then a digit and role letter for each
//! terminal, each group closed by a decimal point:
//!
//! ```text
//! F E T .  n .  1 G .  2 d .  3 S .
//! ```

use std::io::Write;
use std::thread;
use std::time::Duration;

use crate::device::{ClassificationResult, DeviceSubtype, DeviceType, Terminal, TerminalRole};
use crate::error::{Result, TracerError};

/// Pause between glyphs on the reference display.
pub const DEFAULT_DWELL: Duration = Duration::from_millis(750);

/// Characters the seven-segment display can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    B,
    J,
    T,
    Dot,
    N,
    P,
    One,
    Two,
    Three,
    C,
    E,
    F,
    G,
    D,
    S,
    Blank,
}

impl Glyph {
    /// Active-low segment code sent to the display driver.
    pub fn code(self) -> u8 {
        match self {
            Glyph::B => 131,
            Glyph::J => 225,
            Glyph::T => 135,
            Glyph::Dot => 127,
            Glyph::N => 171,
            Glyph::P => 140,
            Glyph::One => 249,
            Glyph::Two => 164,
            Glyph::Three => 176,
            Glyph::C => 198,
            Glyph::E => 134,
            Glyph::F => 142,
            Glyph::G => 130,
            Glyph::D => 161,
            Glyph::S => 146,
            Glyph::Blank => 255,
        }
    }

    fn digit(terminal: Terminal) -> Self {
        match terminal {
            Terminal::T1 => Glyph::One,
            Terminal::T2 => Glyph::Two,
            Terminal::T3 => Glyph::Three,
        }
    }

    fn role(role: TerminalRole) -> Option<Self> {
        match role {
            TerminalRole::Gate => Some(Glyph::G),
            TerminalRole::Source => Some(Glyph::S),
            TerminalRole::Drain => Some(Glyph::D),
            TerminalRole::Base => Some(Glyph::B),
            TerminalRole::Collector => Some(Glyph::C),
            TerminalRole::Emitter => Some(Glyph::E),
            TerminalRole::Unknown => None,
        }
    }
}

/// Glyphs spelling out a classification. Unresolved fields show as blank;
/// an unknown family shows a single blank.
pub fn glyph_sequence(result: &ClassificationResult) -> Vec<Glyph> {
    use Glyph::*;

    let mut glyphs = match result.device_type {
        DeviceType::Bjt => vec![B, J, T, Dot],
        DeviceType::Mosfet => vec![F, E, T, Dot],
        DeviceType::Unknown => return vec![Blank],
    };
    let subtype: &[Glyph] = match result.subtype {
        DeviceSubtype::Npn => &[N, P, N, Dot],
        DeviceSubtype::Pnp => &[P, N, P, Dot],
        DeviceSubtype::Nmos => &[N, Dot],
        DeviceSubtype::Pmos => &[P, Dot],
        DeviceSubtype::Unknown => &[Blank],
    };
    glyphs.extend_from_slice(subtype);
    for terminal in Terminal::ALL {
        match Glyph::role(result.role(terminal)) {
            Some(letter) => glyphs.extend([Glyph::digit(terminal), letter, Dot]),
            None => glyphs.push(Blank),
        }
    }
    glyphs
}

/// Something that can present a classification to the operator.
pub trait StatusDisplay {
    fn show(&mut self, result: &ClassificationResult) -> Result<()>;
}

/// Prints the classification as labelled lines.
pub struct ConsoleStatus<W: Write> {
    out: W,
}

impl<W: Write> ConsoleStatus<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl ConsoleStatus<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> StatusDisplay for ConsoleStatus<W> {
    fn show(&mut self, result: &ClassificationResult) -> Result<()> {
        let mut text = format!("Type: {}\nSubtype: {}\n", result.device_type, result.subtype);
        for terminal in Terminal::ALL {
            text.push_str(&format!(
                "Terminal {}: {}\n",
                terminal.index() + 1,
                result.role(terminal)
            ));
        }
        self.out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush())
            .map_err(|e| TracerError::DisplayError {
                message: e.to_string(),
            })
    }
}

/// Receives raw glyph codes, e.g. an I2C port expander.
pub trait GlyphSink {
    fn write_glyph(&mut self, code: u8) -> Result<()>;
}

impl GlyphSink for Vec<u8> {
    fn write_glyph(&mut self, code: u8) -> Result<()> {
        self.push(code);
        Ok(())
    }
}

/// Seven-segment display showing one glyph at a time.
pub struct SegmentDisplay<S: GlyphSink> {
    sink: S,
    dwell: Duration,
}

impl<S: GlyphSink> SegmentDisplay<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            dwell: DEFAULT_DWELL,
        }
    }

    /// Set how long each glyph stays on the display.
    pub fn with_dwell(mut self, dwell: Duration) -> Self {
        self.dwell = dwell;
        self
    }

    pub fn into_inner(self) -> S {
        self.sink
    }
}

impl<S: GlyphSink> StatusDisplay for SegmentDisplay<S> {
    fn show(&mut self, result: &ClassificationResult) -> Result<()> {
        for glyph in glyph_sequence(result) {
            self.sink.write_glyph(glyph.code())?;
            // Blanks are not held
            if glyph != Glyph::Blank && !self.dwell.is_zero() {
                thread::sleep(self.dwell);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Glyph::*;

    fn nmos_gds() -> ClassificationResult {
        ClassificationResult {
            device_type: DeviceType::Mosfet,
            subtype: DeviceSubtype::Nmos,
            roles: [TerminalRole::Gate, TerminalRole::Drain, TerminalRole::Source],
        }
    }

    #[test]
    fn test_mosfet_sequence() {
        assert_eq!(
            glyph_sequence(&nmos_gds()),
            vec![F, E, T, Dot, N, Dot, One, G, Dot, Two, D, Dot, Three, S, Dot]
        );
    }

    #[test]
    fn test_unresolved_fields_blank() {
        let mut result = ClassificationResult::new();
        assert_eq!(glyph_sequence(&result), vec![Blank]);

        result.device_type = DeviceType::Bjt;
        result.assign(Terminal::T2, TerminalRole::Base);
        assert_eq!(
            glyph_sequence(&result),
            vec![B, J, T, Dot, Blank, Blank, Two, B, Dot, Blank]
        );
    }

    #[test]
    fn test_segment_display_writes_codes() {
        let mut display = SegmentDisplay::new(Vec::new()).with_dwell(Duration::ZERO);
        display.show(&nmos_gds()).unwrap();
        let codes = display.into_inner();
        assert_eq!(&codes[..4], &[142, 134, 135, 127]);
        assert_eq!(codes.len(), 15);
    }

    #[test]
    fn test_console_lines() {
        let mut console = ConsoleStatus::new(Vec::new());
        console.show(&nmos_gds()).unwrap();
        let text = String::from_utf8(console.into_inner()).unwrap();
        assert_eq!(
            text,
            "Type: MOSFET\nSubtype: NMOS\nTerminal 1: GATE\nTerminal 2: DRAIN\nTerminal 3: SOURCE\n"
        );
    }
}
