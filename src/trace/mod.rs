//! Curve trace engine.
//!
//! For each control step the control terminal (gate or base) is held at the
//! step voltage, the held terminal (source or emitter) at ground for N-type
//! devices or at the high reference for P-type devices, and the swept
//! terminal (drain or collector) is stepped through the sweep codes. The
//! current through the swept terminal's sense resistor is
//!
//! ```text
//! I = (code - measured) / adc_max * v_max / R
//! ```
//!
//! negated for P-type devices so every family plots in the same quadrant.

mod dataset;

pub use dataset::{CurveDataset, CurveRow};

use crate::config::TracerConfig;
use crate::device::{
    ClassificationResult, DeviceType, Polarity, Terminal, TerminalBias, TerminalRole,
};
use crate::error::{Result, Stage, TracerError};
use crate::transducer::Transducer;

/// Terminals taking part in a trace, by function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TraceTerminals {
    control: Terminal,
    held: Terminal,
    swept: Terminal,
}

impl TraceTerminals {
    fn resolve(classification: &ClassificationResult) -> Result<Self> {
        let (control, held, swept) = match classification.device_type {
            DeviceType::Mosfet => (TerminalRole::Gate, TerminalRole::Source, TerminalRole::Drain),
            _ => (TerminalRole::Base, TerminalRole::Emitter, TerminalRole::Collector),
        };
        let find = |role: TerminalRole| {
            classification.find(role).ok_or_else(|| {
                TracerError::ambiguous(
                    Stage::CurveTrace,
                    format!("{} is not assigned to exactly one terminal", role),
                )
            })
        };
        Ok(Self {
            control: find(control)?,
            held: find(held)?,
            swept: find(swept)?,
        })
    }
}

/// Drives sweeps for a fully classified device.
pub struct CurveTracer<'a, T: Transducer> {
    transducer: &'a mut T,
    config: &'a TracerConfig,
}

impl<'a, T: Transducer> CurveTracer<'a, T> {
    pub fn new(transducer: &'a mut T, config: &'a TracerConfig) -> Self {
        Self { transducer, config }
    }

    /// Sweep every control step and return the full curve family.
    pub fn trace(&mut self, classification: &ClassificationResult) -> Result<CurveDataset> {
        if let Some(missing) = classification.unresolved() {
            return Err(TracerError::IncompleteClassification { missing });
        }
        let polarity = classification.subtype.polarity().ok_or_else(|| {
            TracerError::IncompleteClassification {
                missing: "device subtype".to_string(),
            }
        })?;
        let terminals = TraceTerminals::resolve(classification)?;
        let config = self.config;
        let curve = &config.curve;
        let control_volts = curve.control_volts(classification.subtype).unwrap_or(&[]);

        let held_code = match polarity {
            Polarity::N => config.levels.code(TerminalBias::Ground),
            Polarity::P => config.levels.code(TerminalBias::HighReference),
        };
        let mut channels = [terminals.held, terminals.swept];
        channels.sort();
        self.transducer.select_channels(&channels)?;

        log::info!(
            "Tracing {} control steps x {} points for {}",
            control_volts.len(),
            curve.sweep_points,
            classification
        );
        let mut dataset = CurveDataset::new(*classification, curve.sweep_points);
        for &volts in control_volts {
            let control_code = self.volts_to_code(volts);
            self.transducer.set_terminal_bias(terminals.control, control_code)?;
            self.transducer.set_terminal_bias(terminals.held, held_code)?;

            let mut step = self.sweep(volts, terminals, polarity)?;
            if polarity == Polarity::P {
                suppress_leading(&mut step, curve.leading_suppression);
            }
            log::debug!("Control step {:.2} V traced", volts);
            dataset.push_step(step);
        }
        Ok(dataset)
    }

    fn sweep(
        &mut self,
        volts: f64,
        terminals: TraceTerminals,
        polarity: Polarity,
    ) -> Result<Vec<CurveRow>> {
        let config = self.config;
        let curve = &config.curve;
        let scale = curve.v_max / curve.adc_max;
        let mut rows = Vec::with_capacity(curve.sweep_points);

        for code in sweep_codes(curve.sweep_points, curve.sweep_max_code) {
            self.transducer.set_terminal_bias(terminals.swept, code)?;
            let readback = self.transducer.readback(curve.samples_per_point)?;
            let held = readback.measure(terminals.held).mean(Stage::CurveTrace)?;
            let swept = readback.measure(terminals.swept).mean(Stage::CurveTrace)?;

            let current = (code as f64 - swept) * scale / curve.sense_resistor;
            let (current, difference) = match polarity {
                Polarity::N => (current, swept - held),
                Polarity::P => (-current, held - swept),
            };
            rows.push(CurveRow {
                control_bias: volts,
                sweep_voltage: difference * scale,
                current,
            });
        }
        Ok(rows)
    }

    fn volts_to_code(&self, volts: f64) -> u16 {
        let curve = &self.config.curve;
        (volts * curve.adc_max / curve.v_max).clamp(0.0, 4095.0) as u16
    }
}

/// Convenience wrapper around [`CurveTracer::trace`].
pub fn trace_curves<T: Transducer>(
    transducer: &mut T,
    config: &TracerConfig,
    classification: &ClassificationResult,
) -> Result<CurveDataset> {
    CurveTracer::new(transducer, config).trace(classification)
}

/// Linearly spaced sweep codes from 0 up to, but excluding, `max_code`.
pub fn sweep_codes(points: usize, max_code: u16) -> impl Iterator<Item = u16> {
    (0..points).map(move |i| (i * max_code as usize / points) as u16)
}

/// Overwrite the first `count` currents with the next point's current.
fn suppress_leading(step: &mut [CurveRow], count: usize) {
    let Some(reference) = step.get(count).map(|r| r.current) else {
        return;
    };
    for row in &mut step[..count] {
        row.current = reference;
    }
}
