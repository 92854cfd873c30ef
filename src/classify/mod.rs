//! Device classification pipeline.
//!
//! The stages run in a fixed order over one [`ClassificationSession`]:
//!
//! ```text
//! calibrate -> detect gate -+-> polarity -> source/drain      (MOSFET)
//!                           +-> BJT typing -> collector/emitter (BJT)
//! ```
//!
//! Each stage owns its measurement procedure and returns its evidence as a
//! plain value with a pure decision method, so the decisions can be tested
//! without a bench. A stage that cannot decide leaves the corresponding
//! fields of the [`ClassificationResult`] `Unknown` and the pipeline stops
//! there; only transducer errors and sample starvation are returned as
//! `Err`. After a starved stage the session still holds the fields resolved
//! before it.

mod bjt_terminals;
mod bjt_type;
mod calibrate;
mod gate;
mod polarity;
mod source_drain;

pub use bjt_terminals::{resolve_bjt_terminals, GainReading, GainScheme, TerminalGains, GAIN_SCHEMES};
pub use bjt_type::{type_bjt, BjtTyping};
pub use calibrate::calibrate_ground_floor;
pub use gate::{detect_gate, GateDetection, BIAS_PERMUTATIONS};
pub use polarity::{classify_polarity, PolarityReading};
pub use source_drain::{assign_source_drain, probe_body_diode, BodyDiodeReading};

use crate::config::TracerConfig;
use crate::device::{ClassificationResult, DeviceType, Terminal, TerminalRole};
use crate::error::Result;
use crate::transducer::Transducer;

/// One classification run against a transducer.
///
/// The session owns the result being built and the calibration threshold
/// every stage compares against.
pub struct ClassificationSession<'a, T: Transducer> {
    transducer: &'a mut T,
    config: &'a TracerConfig,
    threshold: f64,
    result: ClassificationResult,
}

impl<'a, T: Transducer> ClassificationSession<'a, T> {
    /// Calibrate the ground floor and open a session with an empty result.
    pub fn calibrate(transducer: &'a mut T, config: &'a TracerConfig) -> Result<Self> {
        let threshold = calibrate_ground_floor(transducer, config)?;
        log::info!("Calibrated noise floor: {}", threshold);
        Ok(Self {
            transducer,
            config,
            threshold,
            result: ClassificationResult::new(),
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn result(&self) -> &ClassificationResult {
        &self.result
    }

    /// Run every remaining stage and return the result.
    pub fn run(mut self) -> Result<ClassificationResult> {
        self.resolve()?;
        Ok(self.result)
    }

    /// Run every remaining stage, filling in the session's result.
    ///
    /// On `Err` the result keeps every field resolved before the failing
    /// stage; [`into_result`](Self::into_result) recovers it.
    pub fn resolve(&mut self) -> Result<()> {
        let detection = detect_gate(self.transducer, self.config, self.threshold)?;
        match detection.gate {
            Some(gate) => {
                log::info!("Gate found on {}", gate);
                self.classify_mosfet(gate)?;
            }
            None => {
                log::info!("No gate found, treating device as BJT");
                self.classify_bjt()?;
            }
        }
        log::info!("Classification: {}", self.result);
        Ok(())
    }

    /// Close the session and keep whatever was resolved.
    pub fn into_result(self) -> ClassificationResult {
        self.result
    }

    fn classify_mosfet(&mut self, gate: Terminal) -> Result<()> {
        self.result.device_type = DeviceType::Mosfet;
        self.result.assign(gate, TerminalRole::Gate);

        let reading = classify_polarity(self.transducer, self.config, gate)?;
        let Some(polarity) = reading.polarity() else {
            log::info!("Polarity inconclusive: drop unchanged by gate discharge");
            return Ok(());
        };
        self.result.subtype = polarity.mos();

        let (source, drain) = probe_body_diode(self.transducer, self.config, gate)?
            .assignment(polarity);
        self.result.assign(source, TerminalRole::Source);
        self.result.assign(drain, TerminalRole::Drain);
        Ok(())
    }

    fn classify_bjt(&mut self) -> Result<()> {
        self.result.device_type = DeviceType::Bjt;

        let typing = type_bjt(self.transducer, self.config, self.threshold)?;
        let Some((base, polarity)) = typing.decide() else {
            log::info!("BJT typing inconclusive: flagged {:?}", typing.flagged);
            return Ok(());
        };
        self.result.subtype = polarity.bipolar();
        self.result.assign(base, TerminalRole::Base);

        let gains = resolve_bjt_terminals(self.transducer, self.config, base, polarity)?;
        match gains.assignment() {
            Some((collector, emitter)) => {
                self.result.assign(collector, TerminalRole::Collector);
                self.result.assign(emitter, TerminalRole::Emitter);
            }
            None => log::info!("Gain test inconclusive: equal gains"),
        }
        Ok(())
    }
}

/// Calibrate and classify in one call.
pub fn classify<T: Transducer>(
    transducer: &mut T,
    config: &TracerConfig,
) -> Result<ClassificationResult> {
    ClassificationSession::calibrate(transducer, config)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceSubtype;
    use crate::transducer::{DeviceKind, FramedTransducer, Pinout, SimParams, SimulatedDevice};

    fn quick_config() -> TracerConfig {
        TracerConfig::default().with_gate_rounds(5)
    }

    fn classify_sim(kind: DeviceKind, pinout: &str, seed: u64) -> ClassificationResult {
        let sim = SimulatedDevice::new(kind, pinout.parse().unwrap(), SimParams::default(), seed)
            .unwrap();
        let mut bench = FramedTransducer::new(sim);
        classify(&mut bench, &quick_config()).unwrap()
    }

    const MOS_PINOUTS: [&str; 6] = ["GSD", "GDS", "SGD", "DGS", "SDG", "DSG"];
    const BJT_PINOUTS: [&str; 6] = ["BCE", "BEC", "CBE", "EBC", "CEB", "ECB"];

    #[test]
    fn test_every_pinout_of_every_kind() {
        let cases = [
            (DeviceKind::Nmos, DeviceSubtype::Nmos, MOS_PINOUTS),
            (DeviceKind::Pmos, DeviceSubtype::Pmos, MOS_PINOUTS),
            (DeviceKind::Npn, DeviceSubtype::Npn, BJT_PINOUTS),
            (DeviceKind::Pnp, DeviceSubtype::Pnp, BJT_PINOUTS),
        ];
        for (kind, subtype, pinouts) in cases {
            for pinout in pinouts {
                let result = classify_sim(kind, pinout, 21);
                let expected: Pinout = pinout.parse().unwrap();
                assert_eq!(result.subtype, subtype, "{} {}", kind, pinout);
                assert_eq!(result.device_type, subtype.device_type());
                assert_eq!(result.roles, expected.roles(), "{} {}", kind, pinout);
            }
        }
    }

    #[test]
    fn test_classification_is_repeatable() {
        let first = classify_sim(DeviceKind::Pnp, "ECB", 77);
        let second = classify_sim(DeviceKind::Pnp, "ECB", 77);
        assert_eq!(first, second);
        assert!(first.is_complete());
    }

    #[test]
    fn test_noiseless_bench_finds_no_gate() {
        let params = SimParams::default().with_noise(0);
        let sim = SimulatedDevice::new(DeviceKind::Nmos, "GSD".parse().unwrap(), params, 1).unwrap();
        let mut bench = FramedTransducer::new(sim);
        let result = classify(&mut bench, &quick_config()).unwrap();
        assert_eq!(result.device_type, DeviceType::Bjt);
    }

    #[test]
    fn test_open_socket_is_unknown_bjt() {
        let mut bench = FramedTransducer::new(SimulatedDevice::open(SimParams::default(), 8));
        let config = quick_config();
        let session = ClassificationSession::calibrate(&mut bench, &config).unwrap();
        assert!(session.threshold() > 0.0);
        assert_eq!(session.result(), &ClassificationResult::new());

        let result = session.run().unwrap();
        assert_eq!(result.device_type, DeviceType::Bjt);
        assert_eq!(result.subtype, DeviceSubtype::Unknown);
        assert_eq!(result.unresolved().as_deref(), Some("device subtype"));
    }
}
