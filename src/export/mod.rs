//! CSV export of curve datasets.
//!
//! The file layout is three header lines followed by one row per point:
//!
//! ```text
//! Type: MOSFET,Subtype: NMOS,
//! Terminal 1: GATE,Terminal 2: DRAIN,Terminal 3: SOURCE
//! $V_{GS}$,$V_{DS}$,$I_D$
//! 0.000000,0.001259,0.000000
//! ```
//!
//! Files are named `<TYPE>_<SUBTYPE>_<n>.csv`, with `n` starting at 1 and
//! incremented past any file that already exists.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::device::{ClassificationResult, Terminal};
use crate::error::{Result, TracerError};
use crate::trace::CurveDataset;

/// Write a dataset in CSV form.
pub fn write_csv<W: Write>(dataset: &CurveDataset, mut writer: W) -> io::Result<()> {
    let result = dataset.classification();
    writeln!(writer, "Type: {},Subtype: {},", result.device_type, result.subtype)?;

    let terminals: Vec<String> = Terminal::ALL
        .iter()
        .map(|t| format!("Terminal {}: {}", t.index() + 1, result.role(*t)))
        .collect();
    writeln!(writer, "{}", terminals.join(","))?;
    writeln!(writer, "{}", dataset.quantity_labels().join(","))?;

    for row in dataset.rows() {
        writeln!(
            writer,
            "{:.6},{:.6},{:.6}",
            row.control_bias, row.sweep_voltage, row.current
        )?;
    }
    writer.flush()
}

/// Writes datasets into a directory without overwriting earlier runs.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    output_dir: PathBuf,
}

impl CsvExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// First `<TYPE>_<SUBTYPE>_<n>.csv` path that does not exist yet.
    pub fn next_available_path(&self, result: &ClassificationResult) -> PathBuf {
        (1..)
            .map(|n| {
                self.output_dir
                    .join(format!("{}_{}_{}.csv", result.device_type, result.subtype, n))
            })
            .find(|path| !path.exists())
            .unwrap_or_else(|| self.output_dir.join("curve.csv"))
    }

    /// Write `dataset` to the next free file and return its path.
    pub fn export(&self, dataset: &CurveDataset) -> Result<PathBuf> {
        let path = self.next_available_path(dataset.classification());
        let export_error = |source| TracerError::ExportError {
            path: path.display().to_string(),
            source,
        };

        let file = File::create(&path).map_err(export_error)?;
        write_csv(dataset, BufWriter::new(file)).map_err(export_error)?;
        log::info!("Wrote {} rows to {}", dataset.len(), path.display());
        Ok(path)
    }
}
