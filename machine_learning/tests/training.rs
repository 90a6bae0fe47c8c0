use std::num::NonZeroUsize;

use approx::assert_abs_diff_eq;
use machine_learning::{
    MlErr,
    arch::{LeNet5, Model, loss::CrossEntropy},
    config::TrainingConfig,
    dataset::{DataLoader, Dataset},
    initialization::ConstParamGen,
    optimization::{Adam, GradientDescent},
    training::{
        EpochReport, LossHistory, ModelTrainer, Reporter, TrainerBuilder, accuracy, train_epoch,
        validate_epoch,
    },
};
use rand::{Rng, SeedableRng, rngs::StdRng};

const SIDE: usize = 32;
const PIXELS: usize = SIDE * SIDE;

/// Every prediction of a zeroed model ties, so it always picks class 0.
fn zeroed_model() -> LeNet5 {
    LeNet5::with_param_gen(10, &mut ConstParamGen::unbounded(0.)).unwrap()
}

fn blank_dataset(labels: Vec<usize>) -> Dataset {
    Dataset::new(vec![0.; labels.len() * PIXELS], labels, (1, SIDE, SIDE)).unwrap()
}

fn random_dataset(rng: &mut StdRng, n: usize) -> Dataset {
    let images = (0..n * PIXELS).map(|_| rng.random_range(0.0..1.0)).collect();
    let labels = (0..n).map(|_| rng.random_range(0..10)).collect();
    Dataset::new(images, labels, (1, SIDE, SIDE)).unwrap()
}

fn loader(dataset: Dataset, batch_size: usize) -> DataLoader {
    DataLoader::new(dataset, NonZeroUsize::new(batch_size).unwrap(), None)
}

#[derive(Default)]
struct Recorder {
    reports: Vec<EpochReport>,
    history: Option<LossHistory>,
}

impl Reporter for Recorder {
    fn on_epoch_end(&mut self, report: &EpochReport) -> machine_learning::Result<()> {
        self.reports.push(*report);
        Ok(())
    }

    fn on_training_end(&mut self, history: &LossHistory) -> machine_learning::Result<()> {
        self.history = Some(history.clone());
        Ok(())
    }
}

#[test]
fn accuracy_is_one_when_every_prediction_is_right() {
    let mut model = zeroed_model();
    let mut loader = loader(blank_dataset(vec![0; 5]), 2);

    assert_eq!(accuracy(&mut model, &mut loader).unwrap(), 1.);
}

#[test]
fn accuracy_is_zero_when_every_prediction_is_wrong() {
    let mut model = zeroed_model();
    let mut loader = loader(blank_dataset(vec![3; 5]), 2);

    assert_eq!(accuracy(&mut model, &mut loader).unwrap(), 0.);
}

#[test]
fn accuracy_of_an_empty_loader_is_an_error() {
    let mut model = zeroed_model();
    let mut loader = loader(blank_dataset(vec![]), 2);

    assert!(matches!(
        accuracy(&mut model, &mut loader),
        Err(MlErr::EmptyDataset)
    ));
}

#[test]
fn training_epoch_moves_parameters_and_validation_does_not() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut model = LeNet5::new(10, &mut rng).unwrap();
    let mut loader = loader(random_dataset(&mut rng, 6), 4);
    let mut optimizer = Adam::new(model.size(), 0.001, 0.9, 0.999, 1e-8);

    let before = model.params().to_vec();
    let valid_loss = validate_epoch(&mut loader, &mut model, &CrossEntropy).unwrap();
    assert_eq!(model.params(), before.as_slice());
    assert!(valid_loss.is_finite() && valid_loss > 0.);

    let train_loss = train_epoch(&mut loader, &mut model, &CrossEntropy, &mut optimizer).unwrap();
    assert!(train_loss.is_finite());
    assert_ne!(model.params(), before.as_slice());
}

#[test]
fn non_finite_loss_aborts_the_epoch() {
    let mut model = LeNet5::with_param_gen(10, &mut ConstParamGen::unbounded(f32::NAN)).unwrap();
    let mut loader = loader(blank_dataset(vec![1, 2]), 1);
    let mut optimizer = GradientDescent::new(0.1);

    assert!(matches!(
        train_epoch(&mut loader, &mut model, &CrossEntropy, &mut optimizer),
        Err(MlErr::NonFiniteLoss { batch: 0 })
    ));
}

#[test]
fn non_finite_validation_loss_aborts_the_epoch() {
    let mut model = LeNet5::with_param_gen(10, &mut ConstParamGen::unbounded(f32::NAN)).unwrap();
    let mut loader = loader(blank_dataset(vec![3, 4, 5]), 2);

    assert!(matches!(
        validate_epoch(&mut loader, &mut model, &CrossEntropy),
        Err(MlErr::NonFiniteLoss { batch: 0 })
    ));
}

#[test]
fn one_epoch_from_zero_parameters_matches_closed_form() {
    // With every parameter at zero only the biases of the last layer get a gradient, equal to
    // 0.1 minus the frequency of each class in the batch. Adam's first step moves each of them
    // by the learning rate against the sign of its gradient.
    let lr: f32 = 0.1;
    let model = zeroed_model();
    let optimizer = Adam::new(model.size(), lr, 0.9, 0.999, 1e-8);
    let loaders = (
        loader(blank_dataset(vec![0, 1, 2, 3, 0, 1, 2, 3]), 4),
        loader(blank_dataset(vec![0, 5, 0, 9]), 4),
    );

    let mut trainer =
        ModelTrainer::new(model, optimizer, CrossEntropy, loaders, 1, NonZeroUsize::MIN);
    let mut recorder = Recorder::default();
    let history = trainer.train(&mut recorder).unwrap();

    let first = 10f32.ln();
    let second = (4. * lr.exp() + 6. * (-lr).exp()).ln() - lr;
    assert_abs_diff_eq!(history.train[0], (first + second) / 2., epsilon = 1e-4);

    let report = recorder.reports[0];
    assert_eq!(report.epoch, 0);
    assert_abs_diff_eq!(report.train_acc, 0.25);
    assert_abs_diff_eq!(report.valid_acc, 0.5);
    assert_eq!(report.valid_loss, history.valid[0]);
}

#[test]
fn reports_every_print_interval_and_keeps_a_full_history() {
    let mut rng = StdRng::seed_from_u64(11);
    let model = LeNet5::new(10, &mut rng).unwrap();
    let optimizer = GradientDescent::new(0.01);
    let loaders = (
        loader(random_dataset(&mut rng, 3), 2),
        loader(random_dataset(&mut rng, 2), 2),
    );

    let print_every = NonZeroUsize::new(2).unwrap();
    let mut trainer = ModelTrainer::new(model, optimizer, CrossEntropy, loaders, 5, print_every);
    let mut recorder = Recorder::default();
    let history = trainer.train(&mut recorder).unwrap();

    assert_eq!(history.len(), 5);
    assert_eq!(history.valid.len(), 5);

    let epochs: Vec<usize> = recorder.reports.iter().map(|r| r.epoch).collect();
    assert_eq!(epochs, vec![1, 3]);
    for report in &recorder.reports {
        assert!((0. ..=1.).contains(&report.train_acc));
        assert!((0. ..=1.).contains(&report.valid_acc));
        assert_eq!(report.train_loss, history.train[report.epoch]);
    }

    assert_eq!(recorder.history, Some(history));
}

#[test]
fn builder_follows_the_configuration() {
    let mut rng = StdRng::seed_from_u64(5);
    let config = TrainingConfig {
        epochs: 2,
        ..TrainingConfig::default()
    };

    let mut trainer = TrainerBuilder::new()
        .build(&config, random_dataset(&mut rng, 4), random_dataset(&mut rng, 2))
        .unwrap();
    let history = trainer.train(&mut ()).unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(trainer.model().size(), 61_706);
}

#[test]
fn builder_is_deterministic_given_a_seed() {
    let config = TrainingConfig::default();
    let build = || {
        let mut rng = StdRng::seed_from_u64(5);
        TrainerBuilder::new()
            .build(&config, random_dataset(&mut rng, 2), random_dataset(&mut rng, 2))
            .unwrap()
    };

    assert_eq!(build().model().params(), build().model().params());
}

#[test]
fn builder_rejects_other_image_sizes() {
    let config = TrainingConfig {
        image_size: 28,
        ..TrainingConfig::default()
    };

    let (train, valid) = (blank_dataset(vec![0]), blank_dataset(vec![0]));
    let result = TrainerBuilder::new().build(&config, train, valid);
    assert!(matches!(result, Err(MlErr::InvalidInput(_))));
}

#[test]
fn seeded_builder_runs_reproduce_their_history() {
    let config = TrainingConfig {
        epochs: 2,
        batch_size: NonZeroUsize::new(4).unwrap(),
        ..TrainingConfig::default()
    };
    let run = |seed| {
        let config = TrainingConfig {
            seed: Some(seed),
            ..config.clone()
        };
        let mut rng = StdRng::seed_from_u64(9);
        let (train, valid) = (random_dataset(&mut rng, 8), random_dataset(&mut rng, 4));
        let mut trainer = TrainerBuilder::new().build(&config, train, valid).unwrap();
        trainer.train(&mut ()).unwrap()
    };

    let history = run(42);
    assert_eq!(history, run(42));
    assert_ne!(history.train, run(7).train);

    // an untrained 10-way classifier starts out close to ln(10)
    assert!((1.5..3.5).contains(&history.train[0]));
    assert!(history.valid.iter().all(|l| l.is_finite()));
}

#[test]
fn trained_parts_resume_where_training_stopped() {
    let mut rng = StdRng::seed_from_u64(7);
    let model = LeNet5::new(10, &mut rng).unwrap();
    let (train, valid) = (random_dataset(&mut rng, 4), random_dataset(&mut rng, 2));
    let loaders = || (loader(train.clone(), 2), loader(valid.clone(), 2));
    let adam = || Adam::new(model.size(), 0.001, 0.9, 0.999, 1e-8);

    let mut straight =
        ModelTrainer::new(model.clone(), adam(), CrossEntropy, loaders(), 2, NonZeroUsize::MIN);
    let full = straight.train(&mut ()).unwrap();

    let mut first =
        ModelTrainer::new(model.clone(), adam(), CrossEntropy, loaders(), 1, NonZeroUsize::MIN);
    first.train(&mut ()).unwrap();
    let snapshot = first.optimizer().clone();
    let (trained, optimizer) = first.into_parts();
    assert_ne!(trained.params(), model.params());

    let mut second =
        ModelTrainer::new(trained.clone(), optimizer, CrossEntropy, loaders(), 1, NonZeroUsize::MIN);
    let resumed = second.train(&mut ()).unwrap();
    assert_eq!(resumed.train[0], full.train[1]);
    assert_eq!(resumed.valid[0], full.valid[1]);
    assert_eq!(second.model().params(), straight.model().params());

    let mut from_snapshot =
        ModelTrainer::new(trained, snapshot, CrossEntropy, loaders(), 1, NonZeroUsize::MIN);
    from_snapshot.train(&mut ()).unwrap();
    assert_eq!(from_snapshot.model().params(), second.model().params());
}
