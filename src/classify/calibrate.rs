//! Ground-floor calibration.

use crate::config::TracerConfig;
use crate::device::{Terminal, TerminalBias};
use crate::error::{Result, TracerError};
use crate::transducer::Transducer;

/// Ground every terminal and return the largest deviation from the ground
/// code seen on any tagged readback.
///
/// The maximum rather than the mean is used, so later "quiet" tests only
/// pass when a terminal is at least as still as the bench at rest.
pub fn calibrate_ground_floor<T: Transducer>(
    transducer: &mut T,
    config: &TracerConfig,
) -> Result<f64> {
    let ground = config.levels.code(TerminalBias::Ground);
    transducer.apply_biases([ground; 3])?;
    transducer.select_channels(&Terminal::ALL)?;

    let samples = config.samples.calibration;
    let readback = transducer.readback(samples)?;
    let floor = readback
        .samples()
        .iter()
        .filter(|s| s.terminal_tag().is_some())
        .map(|s| (s.raw as f64 - ground as f64).abs())
        .fold(None, |max: Option<f64>, d| Some(max.map_or(d, |m| m.max(d))));

    match floor {
        Some(threshold) => {
            log::debug!(
                "Ground floor {} from {} tagged readbacks",
                threshold,
                readback.tagged_count()
            );
            Ok(threshold)
        }
        None => Err(TracerError::CalibrationFault { samples }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transducer::{SimParams, SimulatedDevice, FramedTransducer, TaggedSample, ChannelTag};
    use std::time::Duration;

    /// Transducer whose readbacks never carry a terminal tag.
    struct UntaggedBench;

    impl Transducer for UntaggedBench {
        fn set_terminal_bias(&mut self, _: Terminal, _: u16) -> Result<()> {
            Ok(())
        }

        fn select_channels(&mut self, _: &[Terminal]) -> Result<()> {
            Ok(())
        }

        fn read_channel_samples(&mut self, count: usize) -> Result<Vec<TaggedSample>> {
            Ok(vec![
                TaggedSample {
                    tag: ChannelTag::Unassigned(7),
                    raw: 12,
                };
                count
            ])
        }

        fn settle(&mut self, _: Duration) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_floor_bounded_by_noise() {
        let sim = SimulatedDevice::open(SimParams::default().with_noise(3), 11);
        let mut bench = FramedTransducer::new(sim);
        let floor = calibrate_ground_floor(&mut bench, &TracerConfig::default()).unwrap();
        assert!(floor <= 3.0);
        assert!(floor > 0.0);
    }

    #[test]
    fn test_untagged_link_is_calibration_fault() {
        let err = calibrate_ground_floor(&mut UntaggedBench, &TracerConfig::default()).unwrap_err();
        assert!(matches!(err, TracerError::CalibrationFault { samples: 90 }));
        assert!(!err.is_ambiguous());
    }
}
