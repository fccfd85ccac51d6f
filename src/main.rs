use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use mitree_core::{
    MitConfig, MitCrossValidation, NumericStrategy, WeightStrategy, render_decision_table, render_rules,
};
use mitree_io::{DatasetFormat, ExperimentName, ResultWriter, read_dataset};
use mitree_learn::{DecisionTree, MaxFeatures, PruneConfig};

#[derive(Parser)]
#[command(name = "mitree")]
#[command(about = "Distil a random forest into one explainable meta induction tree")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 1, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Where the data comes from and where artifacts go.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Path to the input dataset (.arff or .csv)
    #[arg(long)]
    data: PathBuf,

    /// Class attribute name (defaults to the last column)
    #[arg(long)]
    class: Option<String>,

    /// Experiment name for output files (defaults to the relation name)
    #[arg(long)]
    experiment: Option<String>,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

/// Forest and meta dataset parameters.
#[derive(Args, Debug, Clone)]
struct InductionArgs {
    /// Number of trees in the random forest
    #[arg(long, default_value_t = 15)]
    forest_size: usize,

    /// Numeric condition handling: I (interval) or A (average)
    #[arg(long, default_value = "I")]
    numeric: String,

    /// Meta row weighting: P (precision), L (laplace), N (novelty) or S (satisfaction)
    #[arg(long, default_value = "P")]
    weight: String,

    /// Multiplier applied to novelty before it is used as a weight
    #[arg(long, default_value_t = 1.0)]
    novelty_scale: f64,

    /// Attributes tried per forest node: "log2", "sqrt", "all" or a count
    #[arg(long, default_value = "log2")]
    max_features: String,

    /// Maximum depth of forest trees (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Extract rules one tree at a time instead of in parallel
    #[arg(long, default_value_t = false)]
    sequential: bool,

    #[command(flatten)]
    prune: PruneArgs,
}

/// Options of the final C4.5-style tree.
#[derive(Args, Debug, Clone)]
struct PruneArgs {
    /// Grow the final tree without pruning
    #[arg(long, default_value_t = false)]
    unpruned: bool,

    /// Confidence factor for pessimistic pruning
    #[arg(long, default_value_t = 0.25)]
    confidence_factor: f64,

    /// Minimum weight per branch of a split
    #[arg(long, default_value_t = 2)]
    min_leaf_instances: usize,

    /// Use reduced-error pruning on a held-out fold
    #[arg(long, default_value_t = false)]
    reduced_error_pruning: bool,

    /// Number of folds for reduced-error pruning (one is held out)
    #[arg(long, default_value_t = 3)]
    pruning_folds: usize,

    /// Split nominal attributes into one value versus the rest
    #[arg(long, default_value_t = false)]
    binary_splits: bool,

    /// Disable subtree raising during pessimistic pruning
    #[arg(long, default_value_t = false)]
    no_subtree_raising: bool,

    /// Keep splits that do not reduce training error
    #[arg(long, default_value_t = false)]
    no_collapse: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Train a forest, build its meta dataset and induce the explainable tree
    Induce {
        #[command(flatten)]
        input: DataArgs,

        #[command(flatten)]
        induction: InductionArgs,

        /// Also write per-tree rule listings and decision tables
        #[arg(long, default_value_t = false)]
        report: bool,

        /// Also write the meta dataset: "arff" or "csv"
        #[arg(long)]
        keep_meta: Option<String>,
    },

    /// Cross-validate the meta induction tree against its forest
    Evaluate {
        #[command(flatten)]
        input: DataArgs,

        #[command(flatten)]
        induction: InductionArgs,

        /// Number of cross-validation folds
        #[arg(long, default_value_t = 10)]
        cv_folds: usize,
    },

    /// Classify a dataset with a saved meta induction tree
    Predict {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        #[command(flatten)]
        input: DataArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct InduceOutput {
    experiment: String,
    n_instances: usize,
    forest_size: usize,
    n_rules: usize,
    n_excluded: usize,
    n_meta_rows: usize,
    meta_weight: f64,
    leaf_count: usize,
    node_count: usize,
}

#[derive(Serialize)]
struct EvaluateOutput {
    experiment: String,
    n_instances: usize,
    n_folds: usize,
    tree_mean_accuracy: f64,
    tree_std_accuracy: f64,
    forest_mean_accuracy: f64,
    forest_std_accuracy: f64,
    mean_leaf_count: f64,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    n_instances: usize,
    accuracy: f64,
    model_n_leaves: usize,
}

fn parse_max_features(s: &str) -> Result<MaxFeatures> {
    match s {
        "log2" => Ok(MaxFeatures::Log2Plus1),
        "sqrt" => Ok(MaxFeatures::Sqrt),
        "all" => Ok(MaxFeatures::All),
        other => match other.parse::<usize>() {
            Ok(n) if n > 0 => Ok(MaxFeatures::Fixed(n)),
            _ => anyhow::bail!("unknown max features: {other} (expected log2, sqrt, all, or a positive count)"),
        },
    }
}

fn parse_meta_format(s: &str) -> Result<DatasetFormat> {
    match s {
        "arff" => Ok(DatasetFormat::Arff),
        "csv" => Ok(DatasetFormat::Csv),
        other => anyhow::bail!("unknown meta dataset format: {other} (expected arff or csv)"),
    }
}

fn build_prune(args: &PruneArgs, seed: u64) -> PruneConfig {
    PruneConfig::new()
        .with_unpruned(args.unpruned)
        .with_confidence_factor(args.confidence_factor)
        .with_min_leaf_instances(args.min_leaf_instances)
        .with_reduced_error_pruning(args.reduced_error_pruning)
        .with_folds(args.pruning_folds)
        .with_seed(seed)
        .with_binary_splits(args.binary_splits)
        .with_subtree_raising(!args.no_subtree_raising)
        .with_collapse_tree(!args.no_collapse)
}

fn build_config(args: &InductionArgs, seed: u64) -> Result<MitConfig> {
    let numeric: NumericStrategy = args.numeric.parse()?;
    let weight: WeightStrategy = args.weight.parse()?;
    let config = MitConfig::new()
        .with_forest_size(args.forest_size)
        .with_numeric_strategy(numeric)
        .with_weight_strategy(weight)
        .with_novelty_scale(args.novelty_scale)
        .with_max_features(parse_max_features(&args.max_features)?)
        .with_max_depth(args.max_depth)
        .with_prune(build_prune(&args.prune, seed))
        .with_parallel(!args.sequential)
        .with_seed(seed);
    config.validate()?;
    Ok(config)
}

fn experiment_name(input: &DataArgs, relation: &str) -> Result<ExperimentName> {
    match &input.experiment {
        Some(name) => Ok(ExperimentName::new(name.clone())?),
        None => Ok(ExperimentName::from_relation(relation)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Induce {
            input,
            induction,
            report,
            keep_meta,
        } => {
            let meta_format = keep_meta.as_deref().map(parse_meta_format).transpose()?;
            let config = build_config(&induction, cli.seed)?
                .with_keep_meta_dataset(meta_format.is_some())
                .with_keep_rules(report);

            // 1. Read dataset
            let data = read_dataset(&input.data, input.class.as_deref())
                .context("failed to read input dataset")?;
            let experiment = experiment_name(&input, data.header().relation())?;

            // 2. Forest -> rules -> meta dataset -> tree
            let model = config.fit(&data).context("meta induction failed")?;

            // 3. Artifacts
            let writer = ResultWriter::new(&input.output_dir, experiment.clone())?;
            model
                .model()
                .save(writer.model_path())
                .context("failed to save model")?;
            info!(path = %writer.model_path().display(), "model saved");
            writer.write_induction(model.report())?;
            writer.write_tree(&model.to_text(), &model.to_dot())?;

            if let Some(analyses) = model.analyses() {
                let mut text = String::new();
                for analysis in analyses {
                    let _ = writeln!(text, "=== Tree {} ===", analysis.tree);
                    text.push_str(&render_rules(analysis, config.weight_strategy(), config.novelty_scale()));
                    text.push('\n');
                    text.push_str(&render_decision_table(analysis, data.header()));
                    text.push('\n');
                }
                writer.write_rules(&text)?;
            }
            if let (Some(meta), Some(format)) = (model.meta_dataset(), meta_format) {
                writer.write_meta_dataset(meta, format)?;
            }

            // 4. Print summary
            let summary = model.report();
            let output = InduceOutput {
                experiment: experiment.to_string(),
                n_instances: data.len(),
                forest_size: summary.forest_size,
                n_rules: summary.n_rules,
                n_excluded: summary.n_excluded(),
                n_meta_rows: summary.n_meta_rows,
                meta_weight: summary.meta_weight,
                leaf_count: summary.leaf_count,
                node_count: summary.node_count,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Evaluate {
            input,
            induction,
            cv_folds,
        } => {
            let config = build_config(&induction, cli.seed)?;
            let data = read_dataset(&input.data, input.class.as_deref())
                .context("failed to read input dataset")?;
            let experiment = experiment_name(&input, data.header().relation())?;

            let cv = MitCrossValidation::new(cv_folds)?.with_seed(cli.seed);
            let evaluation = cv
                .evaluate(&config, &data)
                .context("cross-validation failed")?;
            info!(
                tree_accuracy = evaluation.tree.mean_accuracy,
                forest_accuracy = evaluation.forest.mean_accuracy,
                "cross-validation complete"
            );

            let writer = ResultWriter::new(&input.output_dir, experiment.clone())?;
            writer.write_evaluation(&evaluation)?;

            let output = EvaluateOutput {
                experiment: experiment.to_string(),
                n_instances: evaluation.n_instances,
                n_folds: evaluation.n_folds,
                tree_mean_accuracy: evaluation.tree.mean_accuracy,
                tree_std_accuracy: evaluation.tree.std_accuracy,
                forest_mean_accuracy: evaluation.forest.mean_accuracy,
                forest_std_accuracy: evaluation.forest.std_accuracy,
                mean_leaf_count: evaluation.mean_leaf_count,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict { model, input } => {
            let tree = DecisionTree::load(&model).context("failed to load model")?;
            info!(n_nodes = tree.n_nodes(), n_leaves = tree.n_leaves(), "model loaded");

            let data = read_dataset(&input.data, input.class.as_deref())
                .context("failed to read input dataset")?;
            let (trained, given) = (tree.header(), data.header());
            if trained.attributes() != given.attributes() || trained.class_attribute() != given.class_attribute() {
                anyhow::bail!(
                    "dataset {} does not match the attributes the model was trained on",
                    input.data.display()
                );
            }
            let experiment = experiment_name(&input, given.relation())?;

            let predicted = tree.classify_dataset(&data).context("prediction failed")?;
            let n_correct = data
                .instances()
                .iter()
                .zip(&predicted)
                .filter(|(instance, class)| instance.class() == **class)
                .count();

            let writer = ResultWriter::new(&input.output_dir, experiment.clone())?;
            writer.write_predictions(&data, &predicted)?;

            let output = PredictOutput {
                experiment: experiment.to_string(),
                n_instances: data.len(),
                accuracy: if data.is_empty() {
                    0.0
                } else {
                    n_correct as f64 / data.len() as f64
                },
                model_n_leaves: tree.n_leaves(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
