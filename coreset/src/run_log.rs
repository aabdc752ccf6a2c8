use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{Result, configs::PrintArg, eval::EvalReport, metrics::MetricsRecorder};

const START_SEPARATOR: &str = "=======================================";
const SUMMARY_SEPARATOR: &str =
    "---------------------------------------------------------------------";

/// `<results_dir>/<strategy>/<dataset>/<fraction>/<select_every>/<dataset>.txt`
pub fn log_path(
    results_dir: &Path,
    strategy: &str,
    dataset: &str,
    fraction: f64,
    select_every: usize,
) -> PathBuf {
    results_dir
        .join(strategy)
        .join(dataset)
        .join(format!("{fraction:?}"))
        .join(select_every.to_string())
        .join(format!("{dataset}.txt"))
}

fn label(arg: PrintArg) -> &'static str {
    match arg {
        PrintArg::TrnLoss => "Training Loss",
        PrintArg::TrnAcc => "Training Accuracy",
        PrintArg::ValLoss => "Validation Loss",
        PrintArg::ValAcc => "Validation Accuracy",
        PrintArg::TstLoss => "Test Loss",
        PrintArg::TstAcc => "Test Accuracy",
        PrintArg::SubtrnLoss => "Subset Loss",
        PrintArg::SubtrnAcc => "Subset Accuracy",
        PrintArg::Time => "Timing",
    }
}

/// Formats one evaluation as `Epoch: k , Label: value , ...`, `k` counted from one.
pub fn epoch_line(epoch: usize, report: &EvalReport) -> String {
    report
        .iter()
        .fold(format!("Epoch: {}", epoch + 1), |mut line, (arg, value)| {
            line.push_str(&format!(" , {}: {value}", label(arg)));
            line
        })
}

fn series<I: IntoIterator<Item = f64>>(name: &str, values: I) -> String {
    values
        .into_iter()
        .fold(format!("{name}, "), |mut line, value| {
            line.push_str(&format!(" , {value}"));
            line
        })
}

/// The plain text results file of a run.
pub struct RunLog<W: Write> {
    out: W,
}

impl RunLog<BufWriter<File>> {
    /// Creates the results file at `path`, along with its missing parent directories.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> RunLog<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn start(&mut self) -> Result<()> {
        writeln!(self.out, "{START_SEPARATOR}")?;
        Ok(())
    }

    pub fn epoch(&mut self, epoch: usize, report: &EvalReport) -> Result<()> {
        writeln!(self.out, "{}", epoch_line(epoch, report))?;
        Ok(())
    }

    /// Writes the closing summary: timings, accuracy series and total time.
    pub fn finish(&mut self, strategy: &str, metrics: &MetricsRecorder) -> Result<()> {
        let reports = || metrics.records().iter().filter_map(|r| r.eval.as_ref());

        writeln!(self.out, "{strategy}")?;
        writeln!(self.out, "{SUMMARY_SEPARATOR}")?;
        writeln!(self.out, "{}", series("Time", metrics.timing()))?;
        writeln!(
            self.out,
            "{}",
            series(
                "Validation Accuracy",
                reports().filter_map(|r| r.get(PrintArg::ValAcc))
            )
        )?;
        writeln!(
            self.out,
            "{}",
            series(
                "Test Accuracy",
                reports().filter_map(|r| r.get(PrintArg::TstAcc))
            )
        )?;
        writeln!(
            self.out,
            "Total time taken by {strategy} = {}",
            metrics.total_hours()
        )?;

        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
