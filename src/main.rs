//! Tracer - Transistor Identifier and Curve Tracer
//!
//! Runs trigger cycles against the simulated bench: classify the device in
//! the socket, show the result, trace its curve family and write a CSV.
//!
//! # Usage
//!
//! ```bash
//! tracer --device pnp --pinout EBC --output-dir curves/
//! tracer --device nmos --pinout GDS --interactive -v
//! ```

use std::io::{self, BufRead};
use std::path::PathBuf;

use clap::Parser;
use curve_tracer::{
    error::Result,
    status::{ConsoleStatus, StatusDisplay},
    transducer::{DeviceKind, Pinout, SimParams},
    run_cycle, CsvExporter, CycleReport, FramedTransducer, SimulatedDevice, TracerConfig,
};

/// Transistor identifier and I-V curve tracer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Device in the simulated socket (nmos, pmos, npn, pnp, open)
    #[arg(short, long, default_value = "nmos")]
    device: DeviceKind,

    /// Role letters of terminals 1..3, e.g. GSD or EBC
    #[arg(short, long)]
    pinout: Option<String>,

    /// Seed for the simulated noise
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Peak readback noise in ADC codes. The quiet-terminal tests compare
    /// against the noise floor measured at rest, so with 0 no terminal
    /// reads as quiet and a MOSFET is taken for a BJT
    #[arg(long, default_value_t = 4)]
    noise: u16,

    /// YAML configuration file
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Directory for exported CSV files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Number of trigger cycles to run
    #[arg(long, default_value_t = 1)]
    cycles: usize,

    /// Wait for Enter before each cycle
    #[arg(short, long)]
    interactive: bool,

    /// Log per-stage evidence
    #[arg(short, long)]
    verbose: bool,
}

fn default_pinout(kind: DeviceKind) -> &'static str {
    match kind {
        DeviceKind::Nmos | DeviceKind::Pmos => "GDS",
        _ => "EBC",
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = match &args.config {
        Some(path) => TracerConfig::from_yaml_file(path)?,
        None => TracerConfig::default(),
    };

    let pinout: Pinout = args
        .pinout
        .as_deref()
        .unwrap_or(default_pinout(args.device))
        .parse()?;
    let params = SimParams::default().with_noise(args.noise);
    let sim = match args.device {
        DeviceKind::Open => SimulatedDevice::open(params, args.seed),
        kind => SimulatedDevice::new(kind, pinout, params, args.seed)?,
    };
    let mut bench = FramedTransducer::new(sim);
    log::info!("Simulated {} in the socket", bench.link().kind());

    let exporter = CsvExporter::new(&args.output_dir);
    let mut status = ConsoleStatus::stdout();
    let stdin = io::stdin();

    for cycle in 1..=args.cycles {
        if args.interactive {
            println!("Press Enter to start a test...");
            let mut line = String::new();
            if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
                break;
            }
        }
        log::info!("Starting cycle {}", cycle);

        // A failed cycle returns to idle; the next trigger starts afresh
        if let Err(e) = run_trigger(&mut bench, &config, &mut status, &exporter) {
            log::error!("Cycle {} faulted: {}", cycle, e);
            eprintln!("Error: {}", e);
        }
    }

    Ok(())
}

fn run_trigger(
    bench: &mut FramedTransducer<SimulatedDevice>,
    config: &TracerConfig,
    status: &mut impl StatusDisplay,
    exporter: &CsvExporter,
) -> Result<()> {
    bench.configure()?;
    match run_cycle(bench, config)? {
        CycleReport::Traced {
            classification,
            dataset,
        } => {
            status.show(&classification)?;
            println!("\nGenerating curves...\n");
            let path = exporter.export(&dataset)?;
            println!("Curve data written to {}", path.display());
        }
        CycleReport::Abandoned { reason, .. } => {
            println!("Identification error: {}. Check device and try again.", reason);
        }
    }
    Ok(())
}
