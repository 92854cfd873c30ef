//! Error types for the curve tracer.
//!
//! This module provides a unified error type [`TracerError`] that covers
//! all error conditions that can occur during calibration, classification,
//! curve tracing, link transfers, configuration loading, export, and
//! status display.

use std::fmt;

use thiserror::Error;

use crate::device::Terminal;

/// Result type alias using [`TracerError`].
pub type Result<T> = std::result::Result<T, TracerError>;

/// The pipeline stage that produced an error or a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Calibration,
    GateDetection,
    Polarity,
    SourceDrain,
    BjtTyping,
    BjtTerminals,
    CurveTrace,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Calibration => "calibration",
            Stage::GateDetection => "gate detection",
            Stage::Polarity => "polarity classification",
            Stage::SourceDrain => "source/drain resolution",
            Stage::BjtTyping => "BJT typing",
            Stage::BjtTerminals => "BJT terminal resolution",
            Stage::CurveTrace => "curve trace",
        };
        f.write_str(name)
    }
}

/// Unified error type for all curve tracer operations.
#[derive(Error, Debug)]
pub enum TracerError {
    // ============ Calibration Errors ============
    /// No readback was tagged to any terminal while the terminals were grounded
    #[error("Calibration fault: none of {samples} ground-floor readbacks carried a terminal tag")]
    CalibrationFault { samples: usize },

    // ============ Classification Errors ============
    /// A stage could not resolve its part of the classification
    #[error("Classification ambiguous during {stage}: {detail}")]
    ClassificationAmbiguous { stage: Stage, detail: String },

    /// A readback stage received no samples for a channel it needs
    #[error("Sample starvation during {stage}: no readbacks tagged to {terminal}")]
    SampleStarvation { stage: Stage, terminal: Terminal },

    /// A curve trace was requested for an unresolved classification
    #[error("Cannot trace curves for an incomplete classification ({missing} unresolved)")]
    IncompleteClassification { missing: String },

    // ============ Link Errors ============
    /// The word-level transducer link failed
    #[error("Transducer link fault: {message}")]
    LinkFault { message: String },

    /// Pinout string could not be parsed
    #[error("Invalid pinout '{input}': {message}")]
    InvalidPinout { input: String, message: String },

    // ============ Configuration Errors ============
    /// Configuration values are inconsistent
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Error reading a configuration file
    #[error("Failed to read config file '{path}': {source}")]
    ConfigReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing a configuration file
    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParseError {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    // ============ Export Errors ============
    /// Error writing the curve dataset
    #[error("Failed to export curve data to '{path}': {source}")]
    ExportError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ============ Display Errors ============
    /// The status display could not be written
    #[error("Status display error: {message}")]
    DisplayError { message: String },
}

impl TracerError {
    /// Create an ambiguous-classification error
    pub fn ambiguous(stage: Stage, detail: impl Into<String>) -> Self {
        Self::ClassificationAmbiguous {
            stage,
            detail: detail.into(),
        }
    }

    /// Create a sample starvation error
    pub fn starvation(stage: Stage, terminal: Terminal) -> Self {
        Self::SampleStarvation { stage, terminal }
    }

    /// Create a link fault
    pub fn link(message: impl Into<String>) -> Self {
        Self::LinkFault {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether this error abandons the cycle without being a fault.
    ///
    /// Sample starvation is treated as an ambiguous reading for the stage
    /// that hit it.
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            TracerError::ClassificationAmbiguous { .. }
                | TracerError::SampleStarvation { .. }
                | TracerError::IncompleteClassification { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguity_classes() {
        assert!(TracerError::ambiguous(Stage::Polarity, "tie").is_ambiguous());
        assert!(TracerError::starvation(Stage::GateDetection, Terminal::T2).is_ambiguous());
        assert!(!TracerError::CalibrationFault { samples: 90 }.is_ambiguous());
        assert!(!TracerError::link("bus closed").is_ambiguous());
    }

    #[test]
    fn test_messages_name_stage_and_terminal() {
        let err = TracerError::starvation(Stage::SourceDrain, Terminal::T3);
        let msg = err.to_string();
        assert!(msg.contains("source/drain resolution"));
        assert!(msg.contains("terminal 3"));
    }
}
