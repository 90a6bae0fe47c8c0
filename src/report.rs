use std::io::{self, Write};

use chrono::{Local, NaiveTime};
use machine_learning::{
    MlErr,
    training::{EpochReport, Reporter},
};

/// Formats the progress line of an epoch, accuracies shown as percentages.
pub fn format_report(time: NaiveTime, report: &EpochReport) -> String {
    format!(
        "{} --- Epoch: {}\tTrain loss: {:.4}\tValid loss: {:.4}\tTrain accuracy: {:.2}\tValid accuracy: {:.2}",
        time.format("%H:%M:%S"),
        report.epoch,
        report.train_loss,
        report.valid_loss,
        100. * report.train_acc,
        100. * report.valid_acc,
    )
}

/// Writes one line per reported epoch.
pub struct ConsoleReporter<W: Write + Send> {
    out: W,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    fn on_epoch_end(&mut self, report: &EpochReport) -> machine_learning::Result<()> {
        let line = format_report(Local::now().time(), report);

        writeln!(self.out, "{line}")
            .and_then(|_| self.out.flush())
            .map_err(|e| MlErr::Report(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> EpochReport {
        EpochReport {
            epoch: 3,
            train_loss: 0.123456,
            valid_loss: 1.5,
            train_acc: 0.98761,
            valid_acc: 0.5,
        }
    }

    #[test]
    fn line_matches_the_expected_layout() {
        let time = NaiveTime::from_hms_opt(9, 5, 7).unwrap();

        assert_eq!(
            format_report(time, &report()),
            "09:05:07 --- Epoch: 3\tTrain loss: 0.1235\tValid loss: 1.5000\t\
             Train accuracy: 98.76\tValid accuracy: 50.00"
        );
    }

    #[test]
    fn writes_one_line_per_epoch() {
        let mut reporter = ConsoleReporter::new(Vec::new());

        reporter.on_epoch_end(&report()).unwrap();
        reporter.on_epoch_end(&report()).unwrap();

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(out.lines().count(), 2);
        assert!(out.lines().all(|line| line.contains(" --- Epoch: 3\t")));
    }
}
