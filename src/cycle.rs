//! One trigger cycle: classify, then trace.
//!
//! This is the only place that decides what an error means for the run.
//! Calibration faults and link faults end the cycle with `Err`. Ambiguous
//! stage outcomes and sample starvation end it with
//! [`CycleReport::Abandoned`], which carries whatever was resolved so the
//! operator can see how far classification got. No curve is traced unless
//! classification is complete.

use crate::classify::ClassificationSession;
use crate::config::TracerConfig;
use crate::device::ClassificationResult;
use crate::error::{Result, Stage, TracerError};
use crate::trace::{CurveDataset, CurveTracer};
use crate::transducer::Transducer;

/// Outcome of a trigger cycle that did not fault.
#[derive(Debug)]
pub enum CycleReport {
    /// Classification completed and the curve family was traced.
    Traced {
        classification: ClassificationResult,
        dataset: CurveDataset,
    },
    /// Classification was inconclusive; nothing was traced.
    Abandoned {
        classification: ClassificationResult,
        reason: TracerError,
    },
}

impl CycleReport {
    pub fn classification(&self) -> &ClassificationResult {
        match self {
            CycleReport::Traced { classification, .. } => classification,
            CycleReport::Abandoned { classification, .. } => classification,
        }
    }

    pub fn is_traced(&self) -> bool {
        matches!(self, CycleReport::Traced { .. })
    }
}

/// Run one full cycle against a transducer.
pub fn run_cycle<T: Transducer>(transducer: &mut T, config: &TracerConfig) -> Result<CycleReport> {
    let mut session = ClassificationSession::calibrate(transducer, config)?;
    let classification = match session.resolve() {
        Ok(()) => session.into_result(),
        Err(e) if e.is_ambiguous() => return Ok(abandon(session.into_result(), e)),
        Err(e) => return Err(e),
    };

    if let Some(missing) = classification.unresolved() {
        let reason = TracerError::ambiguous(
            stage_resolving(&classification),
            format!("{} unresolved", missing),
        );
        return Ok(abandon(classification, reason));
    }

    match CurveTracer::new(transducer, config).trace(&classification) {
        Ok(dataset) => {
            log::info!("Cycle complete: {} rows traced", dataset.len());
            Ok(CycleReport::Traced {
                classification,
                dataset,
            })
        }
        Err(e) if e.is_ambiguous() => Ok(abandon(classification, e)),
        Err(e) => Err(e),
    }
}

fn abandon(classification: ClassificationResult, reason: TracerError) -> CycleReport {
    log::warn!("Cycle abandoned: {}", reason);
    CycleReport::Abandoned {
        classification,
        reason,
    }
}

/// Stage responsible for the first unresolved field of a result.
fn stage_resolving(result: &ClassificationResult) -> Stage {
    use crate::device::{DeviceSubtype, DeviceType};

    match (result.device_type, result.subtype) {
        (DeviceType::Unknown, _) => Stage::GateDetection,
        (DeviceType::Mosfet, DeviceSubtype::Unknown) => Stage::Polarity,
        (DeviceType::Mosfet, _) => Stage::SourceDrain,
        (DeviceType::Bjt, DeviceSubtype::Unknown) => Stage::BjtTyping,
        (DeviceType::Bjt, _) => Stage::BjtTerminals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceSubtype, DeviceType, Terminal, TerminalRole};
    use crate::transducer::{
        ChannelTag, DeviceKind, FramedTransducer, SimParams, SimulatedDevice, TaggedSample,
    };
    use std::time::Duration;

    fn config() -> TracerConfig {
        TracerConfig::default()
            .with_gate_rounds(5)
            .with_sweep_points(50)
    }

    #[test]
    fn test_cycle_traces_classified_device() {
        let pinout = "DGS".parse().unwrap();
        let sim = SimulatedDevice::new(DeviceKind::Pmos, pinout, SimParams::default(), 31).unwrap();
        let mut bench = FramedTransducer::new(sim);
        bench.configure().unwrap();

        let report = run_cycle(&mut bench, &config()).unwrap();
        assert!(report.is_traced());
        assert_eq!(report.classification().pinout(), "DGS");
        if let CycleReport::Traced { dataset, .. } = report {
            assert_eq!(dataset.len(), 300);
            assert_eq!(dataset.classification().subtype, DeviceSubtype::Pmos);
        }
    }

    #[test]
    fn test_open_socket_abandons_cycle() {
        let mut bench = FramedTransducer::new(SimulatedDevice::open(SimParams::default(), 6));
        let report = run_cycle(&mut bench, &config()).unwrap();

        match report {
            CycleReport::Abandoned {
                classification,
                reason,
            } => {
                assert_eq!(classification.device_type, DeviceType::Bjt);
                assert!(matches!(
                    reason,
                    TracerError::ClassificationAmbiguous {
                        stage: Stage::BjtTyping,
                        ..
                    }
                ));
            }
            CycleReport::Traced { .. } => panic!("open socket must not be traced"),
        }
    }

    /// Drops the channel tag of every sample read while a single channel
    /// is selected, so every single-terminal stage starves.
    struct SingleChannelUntagged<T> {
        inner: T,
        single: bool,
    }

    impl<T: Transducer> Transducer for SingleChannelUntagged<T> {
        fn set_terminal_bias(&mut self, terminal: Terminal, code: u16) -> Result<()> {
            self.inner.set_terminal_bias(terminal, code)
        }

        fn select_channels(&mut self, terminals: &[Terminal]) -> Result<()> {
            self.single = terminals.len() == 1;
            self.inner.select_channels(terminals)
        }

        fn read_channel_samples(&mut self, count: usize) -> Result<Vec<TaggedSample>> {
            let mut samples = self.inner.read_channel_samples(count)?;
            if self.single {
                for sample in &mut samples {
                    sample.tag = ChannelTag::Unassigned(0);
                }
            }
            Ok(samples)
        }

        fn settle(&mut self, delay: Duration) -> Result<()> {
            self.inner.settle(delay)
        }
    }

    #[test]
    fn test_starved_stage_keeps_resolved_fields() {
        let pinout = "GSD".parse().unwrap();
        let sim = SimulatedDevice::new(DeviceKind::Nmos, pinout, SimParams::default(), 9).unwrap();
        let mut bench = SingleChannelUntagged {
            inner: FramedTransducer::new(sim),
            single: false,
        };

        let report = run_cycle(&mut bench, &config()).unwrap();
        match report {
            CycleReport::Abandoned {
                classification,
                reason,
            } => {
                assert_eq!(classification.device_type, DeviceType::Mosfet);
                assert_eq!(classification.subtype, DeviceSubtype::Unknown);
                assert_eq!(classification.role(Terminal::T1), TerminalRole::Gate);
                assert!(matches!(
                    reason,
                    TracerError::SampleStarvation {
                        stage: Stage::Polarity,
                        ..
                    }
                ));
            }
            CycleReport::Traced { .. } => panic!("starved cycle must not be traced"),
        }
    }

    #[test]
    fn test_stage_for_unresolved_field() {
        let mut result = ClassificationResult::new();
        assert_eq!(stage_resolving(&result), Stage::GateDetection);
        result.device_type = DeviceType::Mosfet;
        assert_eq!(stage_resolving(&result), Stage::Polarity);
        result.subtype = DeviceSubtype::Npn;
        result.device_type = DeviceType::Bjt;
        assert_eq!(stage_resolving(&result), Stage::BjtTerminals);
    }
}
