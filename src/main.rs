//! Training driver: loads a CSV dataset, builds (or loads) a network, trains
//! it on one stratified fold, and reports the run.

use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use log::info;

use tabmlp::{Dataset, FitConfig, Network, report};

#[derive(Parser, Debug)]
#[command(
    name = "tabmlp",
    about = "Train a feed-forward classifier on a tabular CSV dataset"
)]
struct Args {
    /// Path to the CSV dataset (header row, one label column, numeric features).
    data: PathBuf,

    /// Name of the label column.
    #[arg(long, default_value = "label")]
    label_column: String,

    /// Hidden layer widths, comma-separated.
    #[arg(long, value_delimiter = ',', default_value = "32,32,32,32")]
    hidden: Vec<usize>,

    /// Number of stratified cross-validation folds.
    #[arg(long, default_value_t = 5)]
    folds: usize,

    /// Which fold supplies the train/validation partition (defaults to the last).
    #[arg(long)]
    fold: Option<usize>,

    /// Fixed learning rate.
    #[arg(long, default_value_t = 0.01)]
    learning_rate: f32,

    /// Mini-batch size (sampled with replacement).
    #[arg(long, default_value_t = 64)]
    batch_size: usize,

    /// Total number of update steps.
    #[arg(long, default_value_t = 2500)]
    iterations: usize,

    /// Evaluate and log every this many steps.
    #[arg(long, default_value_t = 100)]
    eval_every: usize,

    /// Seed for initialization and batch sampling.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Directory for the persisted model and history export.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Load parameters from --model-dir instead of initializing randomly.
    #[arg(long)]
    load: bool,

    /// Skip the terminal charts after training.
    #[arg(long)]
    no_chart: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let dataset = Dataset::from_csv(&args.data, &args.label_column)
        .with_context(|| format!("failed to load dataset {}", args.data.display()))?;
    info!(
        "loaded {} samples, {} features, {} classes ({})",
        dataset.len(),
        dataset.input_dim(),
        dataset.n_classes(),
        dataset.classes().join(", ")
    );

    let folds = dataset.stratified_kfold(args.folds)?;
    let fold_idx = args.fold.unwrap_or(args.folds - 1);
    ensure!(
        fold_idx < folds.len(),
        "fold {fold_idx} out of range for {} folds",
        folds.len()
    );
    let fold = &folds[fold_idx];
    let train = dataset.subset(&fold.train)?;
    let val = dataset.subset(&fold.val)?;
    info!(
        "fold {fold_idx}: {} train / {} validation samples",
        train.len(),
        val.len()
    );

    let mut network = if args.load {
        let net = Network::load(args.model_dir.as_deref()).context("failed to load model")?;
        ensure!(
            net.input_dim() == train.input_dim() && net.output_dim() == train.n_classes(),
            "loaded model is ({}, {}), dataset needs ({}, {})",
            net.input_dim(),
            net.output_dim(),
            train.input_dim(),
            train.n_classes()
        );
        info!("model loaded, layer sizes {:?}", net.layer_sizes());
        net
    } else {
        // The observed feature count becomes the first entry of the
        // layer-size sequence.
        let mut sizes = Vec::with_capacity(args.hidden.len() + 2);
        sizes.push(train.input_dim());
        sizes.extend_from_slice(&args.hidden);
        sizes.push(train.n_classes());
        info!("initializing network with layer sizes {sizes:?}");
        Network::new_with_seed(&sizes, args.seed)?
    };

    let cfg = FitConfig {
        learning_rate: args.learning_rate,
        batch_size: args.batch_size,
        n_iterations: args.iterations,
        eval_every: args.eval_every,
        seed: args.seed,
        model_dir: args.model_dir.clone(),
    };
    let fit = network.fit(&train, &val, &cfg)?;

    let train_acc = network.evaluate(train.inputs(), train.targets());
    let val_acc = network.evaluate(val.inputs(), val.targets());
    info!("final train accuracy {train_acc:.2}%, validation accuracy {val_acc:.2}%");

    if let Some(dir) = &args.model_dir {
        let csv_path = dir.join("history.csv");
        report::write_history_csv(&fit.history, &csv_path)
            .with_context(|| format!("failed to export {}", csv_path.display()))?;
        info!("history exported to {}", csv_path.display());
    }

    if !args.no_chart {
        print!("{}", report::render_history(&fit.history));
    }

    Ok(())
}
