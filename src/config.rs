//! Tracer configuration.
//!
//! Every constant the classification and sweep procedures depend on lives
//! here with its bench default. A configuration can be built in code with
//! the `with_*` methods or loaded from YAML, where any omitted field keeps
//! its default:
//!
//! ```yaml
//! settle_delay_ms: 10
//! samples:
//!   gate_rounds: 29
//! curve:
//!   sense_resistor: 470.0
//!   leading_suppression: 10
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::device::{DeviceSubtype, TerminalBias};
use crate::error::{Result, TracerError};

/// Raw readback counts and repetition counts for each stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleCounts {
    /// Readbacks taken with all terminals grounded.
    pub calibration: usize,
    /// Full permutation cycles run by the gate detector.
    pub gate_rounds: usize,
    /// Readbacks per permutation (split across three channels).
    pub gate: usize,
    /// Readbacks before and after the gate discharge.
    pub polarity: usize,
    /// Readbacks per body-diode phase.
    pub body_diode: usize,
    /// Readbacks per single-terminal injection.
    pub bjt_type: usize,
    /// Readbacks per gain configuration (split across two channels).
    pub gain: usize,
}

impl Default for SampleCounts {
    fn default() -> Self {
        Self {
            calibration: 90,
            gate_rounds: 29,
            gate: 90,
            polarity: 30,
            body_diode: 30,
            bjt_type: 30,
            gain: 60,
        }
    }
}

/// DAC codes for the canonical bias levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasLevels {
    pub ground: u16,
    pub low: u16,
    pub high: u16,
}

impl Default for BiasLevels {
    fn default() -> Self {
        Self {
            ground: 0,
            low: 808,
            high: 4095,
        }
    }
}

impl BiasLevels {
    /// DAC code for a canonical bias level.
    pub fn code(&self, bias: TerminalBias) -> u16 {
        match bias {
            TerminalBias::Ground => self.ground,
            TerminalBias::LowReference => self.low,
            TerminalBias::HighReference => self.high,
        }
    }
}

/// Sweep geometry and current-conversion constants for the curve trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    /// ADC code corresponding to `v_max`.
    pub adc_max: f64,
    /// Full-scale bias voltage.
    pub v_max: f64,
    /// Sense resistor in series with each terminal, in ohms.
    pub sense_resistor: f64,
    /// Points per sweep.
    pub sweep_points: usize,
    /// DAC code the sweep approaches (exclusive).
    pub sweep_max_code: u16,
    /// Readbacks per sweep point (split across the two current-carrying channels).
    pub samples_per_point: usize,
    /// Leading points of each P-type sweep overwritten with the next point's value.
    pub leading_suppression: usize,
    /// Gate voltages for NMOS sweeps.
    pub nmos_gate_volts: Vec<f64>,
    /// Gate voltages for PMOS sweeps, mirrored so the curve family plots the same way.
    pub pmos_gate_volts: Vec<f64>,
    /// Base bias voltages for NPN sweeps.
    pub npn_base_volts: Vec<f64>,
    /// Base bias voltages for PNP sweeps.
    pub pnp_base_volts: Vec<f64>,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            adc_max: 3972.0,
            v_max: 5.0,
            sense_resistor: 470.0,
            sweep_points: 500,
            sweep_max_code: 3972,
            samples_per_point: 199,
            leading_suppression: 10,
            nmos_gate_volts: vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
            pmos_gate_volts: vec![5.0, 4.0, 3.0, 2.0, 1.0, 0.0],
            npn_base_volts: vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5],
            pnp_base_volts: vec![5.0, 4.5, 4.0, 3.5, 3.0, 2.5],
        }
    }
}

impl CurveConfig {
    /// Control-bias table for a subtype.
    pub fn control_volts(&self, subtype: DeviceSubtype) -> Option<&[f64]> {
        match subtype {
            DeviceSubtype::Nmos => Some(&self.nmos_gate_volts),
            DeviceSubtype::Pmos => Some(&self.pmos_gate_volts),
            DeviceSubtype::Npn => Some(&self.npn_base_volts),
            DeviceSubtype::Pnp => Some(&self.pnp_base_volts),
            DeviceSubtype::Unknown => None,
        }
    }
}

/// Complete tracer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    pub samples: SampleCounts,
    pub levels: BiasLevels,
    pub curve: CurveConfig,
    /// Wait after grounding the gate in the polarity test, in milliseconds.
    pub settle_delay_ms: u64,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            samples: SampleCounts::default(),
            levels: BiasLevels::default(),
            curve: CurveConfig::default(),
            settle_delay_ms: 10,
        }
    }
}

impl TracerConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a YAML file and validate it.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TracerError::ConfigReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| TracerError::ConfigParseError {
                path: path.display().to_string(),
                source: e,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the number of gate-detection rounds.
    pub fn with_gate_rounds(mut self, rounds: usize) -> Self {
        self.samples.gate_rounds = rounds;
        self
    }

    /// Set the number of points per sweep.
    pub fn with_sweep_points(mut self, points: usize) -> Self {
        self.curve.sweep_points = points;
        self
    }

    /// Set how many leading points of P-type sweeps are overwritten.
    ///
    /// The default of 10 suits the reference bench's settling artifact; set
    /// 0 to keep raw data.
    pub fn with_leading_suppression(mut self, points: usize) -> Self {
        self.curve.leading_suppression = points;
        self
    }

    /// Set the gate discharge wait.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Gate discharge wait as a duration.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Check the configuration for values the procedures cannot run with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.samples;
        let counts = [
            ("calibration", s.calibration),
            ("gate_rounds", s.gate_rounds),
            ("gate", s.gate),
            ("polarity", s.polarity),
            ("body_diode", s.body_diode),
            ("bjt_type", s.bjt_type),
            ("gain", s.gain),
            ("samples_per_point", self.curve.samples_per_point),
            ("sweep_points", self.curve.sweep_points),
        ];
        if let Some((name, _)) = counts.iter().find(|(_, n)| *n == 0) {
            return Err(TracerError::invalid_config(format!("{} must be non-zero", name)));
        }

        let l = &self.levels;
        if !(l.ground < l.low && l.low < l.high) || l.high > 0x0FFF {
            return Err(TracerError::invalid_config(
                "bias levels must satisfy ground < low < high <= 4095",
            ));
        }

        let c = &self.curve;
        if c.adc_max <= 0.0 || c.v_max <= 0.0 || c.sense_resistor <= 0.0 {
            return Err(TracerError::invalid_config(
                "adc_max, v_max and sense_resistor must be positive",
            ));
        }
        if c.sweep_max_code > 0x0FFF {
            return Err(TracerError::invalid_config("sweep_max_code exceeds 12 bits"));
        }
        if c.leading_suppression >= c.sweep_points {
            return Err(TracerError::invalid_config(format!(
                "leading_suppression ({}) must be smaller than sweep_points ({})",
                c.leading_suppression, c.sweep_points
            )));
        }
        let tables = [
            &c.nmos_gate_volts,
            &c.pmos_gate_volts,
            &c.npn_base_volts,
            &c.pnp_base_volts,
        ];
        if tables.iter().any(|t| t.is_empty()) {
            return Err(TracerError::invalid_config("control tables must not be empty"));
        }
        if tables.iter().flat_map(|t| t.iter()).any(|v| *v < 0.0 || *v > c.v_max) {
            return Err(TracerError::invalid_config("control voltages must lie within 0..=v_max"));
        }

        Ok(())
    }
}
