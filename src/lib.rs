//! # Curve Tracer
//!
//! Identification and I-V curve tracing of unknown three-terminal
//! transistors.
//!
//! This library provides:
//! - A classification pipeline that tells MOSFETs from BJTs, resolves the
//!   subtype (NMOS/PMOS, NPN/PNP) and assigns a role to every terminal
//! - A curve trace engine producing the output characteristic family
//! - A transducer abstraction over the bias DACs and sense ADCs, with the
//!   word framing of the mixed-signal I/O chip and a simulated bench
//! - CSV export and status display of the results
//!
//! ## Architecture
//!
//! - [`device`] - Terminals, roles, device families and the classification result
//! - [`transducer`] - Transducer trait, tagged samples, link framing, simulated bench
//! - [`classify`] - Calibrator and the classification stages
//! - [`trace`] - Curve trace engine and dataset
//! - [`cycle`] - Trigger cycle controller
//! - [`export`] - CSV output
//! - [`status`] - Console and seven-segment status display
//! - [`config`] - Tracer configuration
//!
//! ## Usage
//!
//! ```no_run
//! use curve_tracer::{run_cycle, CycleReport, FramedTransducer, SimulatedDevice, TracerConfig};
//! use curve_tracer::transducer::{DeviceKind, SimParams};
//!
//! # fn main() -> curve_tracer::Result<()> {
//! let sim = SimulatedDevice::new(DeviceKind::Npn, "EBC".parse()?, SimParams::default(), 1)?;
//! let mut bench = FramedTransducer::new(sim);
//! bench.configure()?;
//!
//! if let CycleReport::Traced { classification, dataset } = run_cycle(&mut bench, &TracerConfig::default())? {
//!     println!("{}: {} points", classification, dataset.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Measurement Method
//!
//! Every terminal is driven from a DAC through a sense resistor and read
//! back by an ADC on the device side of the resistor. The difference
//! between the applied and measured code is proportional to the current
//! into the terminal, so all decisions are comparisons of averaged drops
//! against a noise floor measured with every terminal grounded.

pub mod classify;
pub mod config;
pub mod cycle;
pub mod device;
pub mod error;
pub mod export;
pub mod status;
pub mod trace;
pub mod transducer;

// Re-export main types for convenience
pub use classify::{classify, ClassificationSession};
pub use config::TracerConfig;
pub use cycle::{run_cycle, CycleReport};
pub use device::{ClassificationResult, DeviceSubtype, DeviceType, Terminal, TerminalRole};
pub use error::{Result, TracerError};
pub use export::CsvExporter;
pub use trace::{CurveDataset, CurveTracer};
pub use transducer::{FramedTransducer, SimulatedDevice, Transducer};
