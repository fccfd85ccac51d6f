//! End-to-end scenarios for the meta induction pipeline, with scripted
//! learners where the exact forest matters and the real ones elsewhere.

use std::sync::atomic::{AtomicUsize, Ordering};

use mitree_core::{
    AttributeCatalog, ConfigurationError, Condition, ExplainableModel, ForestLearner, InspectTree,
    LeafDistribution, MetaInductionPipeline, MitConfig, MitError, NumericStrategy, SplitKind,
    TreeLearner, TreeNode, WeightStrategy, adapters::C45Learner,
};
use mitree_learn::{Attribute, Dataset, DecisionTree, Header, Instance, PruneConfig, Value};

// --- Scripted learners ---

#[derive(Debug, Clone)]
enum Fake {
    Leaf(Vec<f64>),
    Nominal(&'static str, Vec<Fake>),
}

impl TreeNode for &Fake {
    fn is_leaf(&self) -> bool {
        matches!(self, Fake::Leaf(_))
    }

    fn split_attribute(&self) -> Option<&str> {
        match self {
            Fake::Nominal(name, _) => Some(*name),
            Fake::Leaf(_) => None,
        }
    }

    fn split_kind(&self) -> Option<SplitKind> {
        match self {
            Fake::Nominal(..) => Some(SplitKind::Nominal),
            Fake::Leaf(_) => None,
        }
    }

    fn split_threshold(&self) -> Option<f64> {
        None
    }

    fn children(&self) -> Vec<Self> {
        match *self {
            Fake::Nominal(_, children) => children.iter().collect(),
            Fake::Leaf(_) => Vec::new(),
        }
    }

    fn class_distribution(&self) -> Option<LeafDistribution> {
        match self {
            Fake::Leaf(d) => Some(LeafDistribution::Classification(d.clone())),
            Fake::Nominal(..) => None,
        }
    }
}

impl InspectTree for Fake {
    type Node<'a> = &'a Fake;

    fn root(&self) -> &Fake {
        self
    }
}

/// Hands out clones of one tree and counts its calls.
struct ScriptedForest {
    tree: Fake,
    calls: AtomicUsize,
}

impl ScriptedForest {
    fn new(tree: Fake) -> Self {
        Self {
            tree,
            calls: AtomicUsize::new(0),
        }
    }
}

impl ForestLearner for &ScriptedForest {
    type Tree = Fake;

    fn build(&self, _: &Dataset, n_trees: usize) -> Result<Vec<Fake>, MitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![self.tree.clone(); n_trees])
    }
}

/// C4.5 learner that counts its calls.
#[derive(Default)]
struct CountingTree {
    calls: AtomicUsize,
}

impl TreeLearner for &CountingTree {
    type Model = DecisionTree;

    fn build(&self, data: &Dataset, prune: &PruneConfig) -> Result<DecisionTree, MitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        C45Learner.build(data, prune)
    }
}

/// `A` in {x, y}, `B` in {p, q}, class in {c1, c2}; four rows of weight 2.
fn nominal_data() -> Dataset {
    let header = Header::new(
        "ab",
        vec![
            Attribute::nominal("A", vec!["x".into(), "y".into()]),
            Attribute::nominal("B", vec!["p".into(), "q".into()]),
        ],
        Attribute::nominal("class", vec!["c1".into(), "c2".into()]),
    )
    .unwrap();
    let mut ds = Dataset::new(header);
    for (a, b, class) in [(0, 0, 0), (0, 1, 0), (1, 0, 1), (1, 1, 0)] {
        ds.push(Instance::new(vec![Value::Nominal(a), Value::Nominal(b)], class, 2.0))
            .unwrap();
    }
    ds
}

/// Splits on A, then on B under `A = y`: leaf weights 4, 3, 1 with errors 0, 1, 0.
fn a_then_b() -> Fake {
    Fake::Nominal(
        "A",
        vec![
            Fake::Leaf(vec![4.0, 0.0]),
            Fake::Nominal("B", vec![Fake::Leaf(vec![1.0, 2.0]), Fake::Leaf(vec![1.0, 0.0])]),
        ],
    )
}

/// Two informative numeric attributes, one noise attribute, one nominal.
fn numeric_data() -> Dataset {
    let header = Header::new(
        "numeric",
        vec![
            Attribute::numeric("x"),
            Attribute::numeric("y"),
            Attribute::numeric("noise"),
            Attribute::nominal("shade", vec!["light".into(), "dark".into()]),
        ],
        Attribute::nominal("class", vec!["lo".into(), "mid".into(), "hi".into()]),
    )
    .unwrap();
    let mut ds = Dataset::new(header);
    for i in 0..90 {
        let x = (i % 30) as f64;
        let class = (i % 30) / 10;
        let y = (i * 7 % 13) as f64 + class as f64 * 0.5;
        let noise = (i * 11 % 17) as f64;
        ds.push(Instance::new(
            vec![
                Value::Numeric(x),
                Value::Numeric(y),
                Value::Numeric(noise),
                Value::Nominal(i % 2),
            ],
            class,
            1.0,
        ))
        .unwrap();
    }
    ds
}

// --- Scenarios with scripted trees ---

#[test]
fn average_precision_rows_from_three_rules() {
    let forest = ScriptedForest::new(a_then_b());
    let tree = CountingTree::default();
    let config = MitConfig::new()
        .with_forest_size(1)
        .with_numeric_strategy(NumericStrategy::Average)
        .with_weight_strategy(WeightStrategy::Precision)
        .with_keep_meta_dataset(true)
        .with_keep_rules(true);
    let model = MetaInductionPipeline::new(config, &forest, &tree)
        .run(&nominal_data())
        .unwrap();

    let analyses = model.analyses().unwrap();
    let rules: Vec<String> = analyses[0].rules.iter().map(|r| r.rule.to_string()).collect();
    assert_eq!(rules, ["A = x -> c1", "A = y -> B = p -> c2", "A = y -> B = q -> c1"]);

    let meta = model.meta_dataset().unwrap();
    assert_eq!(meta.len(), 3);
    let weights: Vec<f64> = meta.instances().iter().map(Instance::weight).collect();
    // weight x precision: 4 x 1, 3 x 2/3, 1 x 1
    for (got, want) in weights.iter().zip([4.0, 2.0, 1.0]) {
        assert!((got - want).abs() < 1e-12, "{got} != {want}");
    }
    assert_eq!(
        meta.instances()[0].values(),
        [Value::Nominal(0), Value::Missing]
    );
    assert_eq!(meta.instances()[1].class(), 1);
    assert_eq!(tree.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn zero_forest_size_fails_before_forest_is_built() {
    let forest = ScriptedForest::new(a_then_b());
    let tree = CountingTree::default();
    let err = MetaInductionPipeline::new(MitConfig::new().with_forest_size(0), &forest, &tree)
        .run(&nominal_data())
        .unwrap_err();
    assert!(matches!(
        err,
        MitError::Configuration(ConfigurationError::InvalidForestSize { forest_size: 0 })
    ));
    assert_eq!(forest.calls.load(Ordering::SeqCst), 0);
    assert_eq!(tree.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn all_rules_filtered_is_empty_training_set() {
    // One root leaf: a = 6, b = 2, c = d = 0, satisfaction = 1 - 8 * 2 / (8 * 2) = 0.
    let forest = ScriptedForest::new(Fake::Leaf(vec![6.0, 2.0]));
    let tree = CountingTree::default();
    let config = MitConfig::new()
        .with_forest_size(3)
        .with_weight_strategy(WeightStrategy::Satisfaction);
    let err = MetaInductionPipeline::new(config, &forest, &tree)
        .run(&nominal_data())
        .unwrap_err();
    assert!(matches!(
        err,
        MitError::EmptyTrainingSet {
            n_trees: 3,
            n_rules: 3
        }
    ));
    assert_eq!(tree.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn unknown_split_attribute_is_contract_violation() {
    let forest = ScriptedForest::new(Fake::Nominal("Z", vec![Fake::Leaf(vec![1.0, 0.0])]));
    let tree = CountingTree::default();
    let err = MetaInductionPipeline::new(MitConfig::new().with_forest_size(1), &forest, &tree)
        .run(&nominal_data())
        .unwrap_err();
    assert!(matches!(err, MitError::ContractViolation(_)));
    assert_eq!(tree.calls.load(Ordering::SeqCst), 0);
}

// --- Scenarios with the random forest ---

#[test]
fn interval_rows_carry_the_average_weight() {
    let data = numeric_data();
    let base = MitConfig::new().with_forest_size(8).with_seed(3);
    let interval = MetaInductionPipeline::new(
        base.clone().with_numeric_strategy(NumericStrategy::Interval),
        base.forest_learner(),
        C45Learner,
    )
    .analyze(&data)
    .unwrap();
    let average = MetaInductionPipeline::new(
        base.clone().with_numeric_strategy(NumericStrategy::Average),
        base.forest_learner(),
        C45Learner,
    )
    .analyze(&data)
    .unwrap();

    for (i, a) in interval.iter().zip(&average) {
        assert_eq!(i.rules, a.rules);
        assert!((i.batch.weight() - a.batch.weight()).abs() < 1e-9);
        let numeric_rules = i.rules.iter().filter(|r| r.rule.has_numeric_condition()).count();
        assert_eq!(i.batch.rows.len(), a.batch.rows.len() + numeric_rules);
    }
}

#[test]
fn numeric_intervals_stay_inside_catalog_bounds() {
    let data = numeric_data();
    let catalog = AttributeCatalog::build(&data);
    let config = MitConfig::new().with_forest_size(10).with_keep_rules(true);
    let model = config.fit(&data).unwrap();
    let mut checked = 0;
    for analysis in model.analyses().unwrap() {
        for scored in &analysis.rules {
            for condition in scored.rule.conditions() {
                if let Condition::NumericRange {
                    attribute,
                    effective_min,
                    effective_max,
                    ..
                } = condition
                {
                    let summary = catalog.lookup(attribute).unwrap();
                    assert!(effective_min <= effective_max);
                    assert!(*effective_min >= summary.min);
                    assert!(*effective_max <= summary.max);
                    checked += 1;
                }
            }
        }
    }
    assert!(checked > 0);
}

#[test]
fn contingency_margins_match_total_weight() {
    let data = numeric_data();
    let total = data.sum_of_weights();
    let model = MitConfig::new()
        .with_forest_size(5)
        .with_keep_rules(true)
        .fit(&data)
        .unwrap();
    for analysis in model.analyses().unwrap() {
        for scored in &analysis.rules {
            let m = scored.metrics.matrix;
            assert!((m.l() + m.not_l() - total).abs() < 1e-9);
            assert!((m.r() + m.not_r() - total).abs() < 1e-9);
        }
    }
}

#[test]
fn runs_are_reproducible() {
    let data = numeric_data();
    let config = MitConfig::new().with_forest_size(6).with_seed(11);
    let first = config.fit(&data).unwrap();
    let second = config.fit(&data).unwrap();
    assert_eq!(first.report(), second.report());
    assert_eq!(first.to_text(), second.to_text());
}

#[test]
fn parallel_and_sequential_extraction_agree() {
    let data = numeric_data();
    let config = MitConfig::new()
        .with_forest_size(6)
        .with_keep_meta_dataset(true);
    let parallel = config.clone().with_parallel(true).fit(&data).unwrap();
    let sequential = config.with_parallel(false).fit(&data).unwrap();
    assert_eq!(parallel.report(), sequential.report());
    assert_eq!(parallel.meta_dataset(), sequential.meta_dataset());
}

#[test]
fn novelty_strategy_drops_uninformative_rules() {
    let data = numeric_data();
    let model = MitConfig::new()
        .with_forest_size(5)
        .with_weight_strategy(WeightStrategy::Novelty)
        .with_keep_rules(true)
        .fit(&data)
        .unwrap();
    for analysis in model.analyses().unwrap() {
        let excluded: Vec<usize> = analysis.batch.exclusions.iter().map(|e| e.rule).collect();
        for (index, scored) in analysis.rules.iter().enumerate() {
            assert_eq!(excluded.contains(&index), scored.metrics.novelty <= 0.0);
        }
    }
}

#[test]
fn induced_tree_separates_easy_classes() {
    let data = numeric_data();
    let model = MitConfig::new()
        .with_forest_size(15)
        .with_numeric_strategy(NumericStrategy::Average)
        .fit(&data)
        .unwrap();
    let correct = data
        .instances()
        .iter()
        .filter(|i| model.classify(i.values()).unwrap() == i.class())
        .count();
    let accuracy = correct as f64 / data.len() as f64;
    assert!(accuracy > 0.8, "accuracy {accuracy}");
    assert!(model.model().leaf_count() >= 3);
    assert!(model.to_dot().starts_with("digraph"));
}

// --- Prebuilt forests ---

#[test]
fn prebuilt_trees_skip_the_forest_learner() {
    let forest = ScriptedForest::new(a_then_b());
    let tree = CountingTree::default();
    let config = MitConfig::new().with_forest_size(2);
    let pipeline = MetaInductionPipeline::new(config, &forest, &tree);

    let prebuilt = pipeline
        .run_on_trees(&nominal_data(), &[a_then_b(), a_then_b()])
        .unwrap();
    assert_eq!(forest.calls.load(Ordering::SeqCst), 0);
    assert_eq!(tree.calls.load(Ordering::SeqCst), 1);
    assert_eq!(prebuilt.report().forest_size, 2);

    let trained = pipeline.run(&nominal_data()).unwrap();
    assert_eq!(forest.calls.load(Ordering::SeqCst), 1);
    assert_eq!(prebuilt.report(), trained.report());
}

#[test]
fn fitting_a_trained_forest_matches_fit() {
    let data = numeric_data();
    let config = MitConfig::new().with_forest_size(6).with_seed(11);
    let forest = config
        .forest_learner()
        .forest_config(config.forest_size())
        .unwrap()
        .fit(&data)
        .unwrap();
    let reused = config.fit_with_forest(&data, &forest).unwrap();
    let fitted = config.fit(&data).unwrap();
    assert_eq!(reused.report(), fitted.report());
    assert_eq!(reused.to_text(), fitted.to_text());
}
