use std::{
    error::Error,
    path::{Path, PathBuf},
};

use log::{info, warn};
use machine_learning::{
    MlErr,
    training::{EpochReport, LossHistory, Reporter},
};
use plotters::prelude::*;

type PlotResult<T> = std::result::Result<T, Box<dyn Error + Send + Sync>>;

/// Draws the training and validation loss of every epoch into an SVG file.
pub fn render_losses(history: &LossHistory, path: &Path) -> PlotResult<()> {
    if history.is_empty() {
        return Err("there are no losses to plot".into());
    }

    if history.train.iter().chain(&history.valid).any(|l| !l.is_finite()) {
        return Err("cannot plot non-finite losses".into());
    }

    let (lo, hi) = history
        .train
        .iter()
        .chain(&history.valid)
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &l| {
            (lo.min(l), hi.max(l))
        });
    let pad = ((hi - lo) * 0.05).max(1e-3);
    let last_epoch = (history.len() - 1).max(1) as f32;

    let root = SVGBackend::new(path, (800, 450)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| format!("backend error: {e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption("Loss over epochs", ("sans-serif", 24.0))
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(0f32..last_epoch, (lo - pad)..(hi + pad))
        .map_err(|e| format!("chart build error: {e}"))?;

    chart
        .configure_mesh()
        .x_desc("Epoch")
        .y_desc("Loss")
        .draw()
        .map_err(|e| format!("mesh error: {e}"))?;

    let curves = [
        (&history.train, BLUE, "Training loss"),
        (&history.valid, RED, "Validation loss"),
    ];

    for (losses, color, label) in curves {
        let points = losses.iter().enumerate().map(|(e, &l)| (e as f32, l));

        chart
            .draw_series(LineSeries::new(points, &color))
            .map_err(|e| format!("draw error: {e}"))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(|e| format!("legend error: {e}"))?;

    root.present().map_err(|e| format!("render error: {e}"))?;
    Ok(())
}

/// Plots the loss curves once training ends and optionally opens them in the system viewer.
pub struct PlotReporter {
    path: PathBuf,
    show: bool,
}

impl PlotReporter {
    pub fn new(path: PathBuf, show: bool) -> Self {
        Self { path, show }
    }

    /// A reporter writing `lenet5_losses.svg` into the temporary directory.
    pub fn in_temp_dir(show: bool) -> Self {
        Self::new(std::env::temp_dir().join("lenet5_losses.svg"), show)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Reporter for PlotReporter {
    fn on_epoch_end(&mut self, _report: &EpochReport) -> machine_learning::Result<()> {
        Ok(())
    }

    fn on_training_end(&mut self, history: &LossHistory) -> machine_learning::Result<()> {
        if history.is_empty() {
            warn!("no epochs were run, skipping the loss plot");
            return Ok(());
        }

        render_losses(history, &self.path).map_err(MlErr::Report)?;
        info!("loss plot written to {}", self.path.display());

        if self.show {
            open::that(&self.path).map_err(|e| MlErr::Report(Box::new(e)))?;
        }

        Ok(())
    }
}
