use anyhow::{Context, Result};
use lenet5::{
    mnist::{self, Split},
    plot::PlotReporter,
    report::ConsoleReporter,
};
use log::{debug, info};
use machine_learning::{config::TrainingConfig, device::Backend, training::TrainerBuilder};

fn main() -> Result<()> {
    env_logger::init();

    let config = TrainingConfig::default();
    debug!("configuration: {}", serde_json::to_string(&config)?);

    let backend = Backend::new(config.device).context("failed to set up the compute backend")?;

    let root = &config.data_root;
    let train = mnist::load(root, Split::Train, config.image_size)?;
    let valid = mnist::load(root, Split::Test, config.image_size)?;
    info!(
        "loaded {} training and {} validation images",
        train.len(),
        valid.len()
    );

    let mut reporter = (
        ConsoleReporter::stdout(),
        PlotReporter::in_temp_dir(config.show_plot),
    );

    let history = backend
        .install(|| {
            let mut trainer = TrainerBuilder::new().build(&config, train, valid)?;
            trainer.train(&mut reporter)
        })
        .context("training failed")?;

    if let (Some(train_loss), Some(valid_loss)) = (history.train.last(), history.valid.last()) {
        info!("finished with train loss {train_loss:.4} and valid loss {valid_loss:.4}");
    }

    Ok(())
}
