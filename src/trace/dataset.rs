//! Curve dataset produced by one trace run.

use crate::device::{ClassificationResult, DeviceType};

/// One sample point of a curve family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveRow {
    /// Gate or base bias in volts.
    pub control_bias: f64,
    /// Measured drain-source or collector-emitter voltage.
    pub sweep_voltage: f64,
    /// Derived drain or collector current in amperes.
    pub current: f64,
}

/// Ordered rows of a full curve family, grouped by control step.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveDataset {
    classification: ClassificationResult,
    points_per_step: usize,
    rows: Vec<CurveRow>,
}

impl CurveDataset {
    pub fn new(classification: ClassificationResult, points_per_step: usize) -> Self {
        Self {
            classification,
            points_per_step,
            rows: Vec::new(),
        }
    }

    pub fn classification(&self) -> &ClassificationResult {
        &self.classification
    }

    pub fn points_per_step(&self) -> usize {
        self.points_per_step
    }

    pub fn rows(&self) -> &[CurveRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows of each control step.
    pub fn steps(&self) -> impl Iterator<Item = &[CurveRow]> {
        self.rows.chunks(self.points_per_step.max(1))
    }

    /// Append one completed sweep.
    pub(crate) fn push_step(&mut self, step: Vec<CurveRow>) {
        self.rows.extend(step);
    }

    /// Column labels for the control, sweep, and current quantities.
    pub fn quantity_labels(&self) -> [&'static str; 3] {
        match self.classification.device_type {
            DeviceType::Bjt => ["$V_{BE}$", "$V_{CE}$", "$I_C$"],
            _ => ["$V_{GS}$", "$V_{DS}$", "$I_D$"],
        }
    }
}
