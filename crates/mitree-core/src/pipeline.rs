//! Forest, rules, meta dataset, final tree.

use mitree_learn::{Dataset, Header, Value};
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::{
    catalog::AttributeCatalog,
    config::MitConfig,
    contingency::{ClassTotals, RuleMetrics},
    error::{ContractViolation, MitError},
    extract::RuleExtractor,
    meta::{Exclusion, MetaBatch, MetaDatasetBuilder, ScoredRule},
    strategy::{NumericStrategy, WeightStrategy},
    traits::{ExplainableModel, ForestLearner, InspectTree, TreeLearner},
};

/// Scored rules and meta rows of one forest tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeAnalysis {
    /// Position of the tree in the forest.
    pub tree: usize,
    /// Rules in extraction order.
    pub rules: Vec<ScoredRule>,
    /// Meta rows and exclusions produced from `rules`.
    pub batch: MetaBatch,
}

impl TreeAnalysis {
    /// Sum of the rules' leaf errors.
    #[must_use]
    pub fn error(&self) -> f64 {
        self.rules.iter().map(|r| r.rule.error()).sum()
    }

    fn summary(&self) -> TreeSummary {
        TreeSummary {
            tree: self.tree,
            n_rules: self.rules.len(),
            n_rows: self.batch.rows.len(),
            error: self.error(),
            meta_weight: self.batch.weight(),
            exclusions: self.batch.exclusions.clone(),
        }
    }
}

/// Per-tree figures of an [`InductionReport`].
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TreeSummary {
    /// Position of the tree in the forest.
    pub tree: usize,
    /// Rules extracted from the tree.
    pub n_rules: usize,
    /// Meta rows the rules produced.
    pub n_rows: usize,
    /// Sum of rule errors.
    pub error: f64,
    /// Sum of the tree's meta row weights.
    pub meta_weight: f64,
    /// Rules that produced no row, and why.
    pub exclusions: Vec<Exclusion>,
}

/// What happened during a run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct InductionReport {
    /// Number of trees decomposed.
    pub forest_size: usize,
    /// Numeric strategy the meta rows were built with.
    pub numeric_strategy: NumericStrategy,
    /// Weight strategy the meta rows were built with.
    pub weight_strategy: WeightStrategy,
    /// One summary per tree, in forest order.
    pub trees: Vec<TreeSummary>,
    /// Rules extracted across all trees.
    pub n_rules: usize,
    /// Rows of the meta dataset.
    pub n_meta_rows: usize,
    /// Sum of meta row weights.
    pub meta_weight: f64,
    /// Leaves of the final tree.
    pub leaf_count: usize,
    /// Nodes of the final tree.
    pub node_count: usize,
}

impl InductionReport {
    /// Rules excluded across all trees.
    #[must_use]
    pub fn n_excluded(&self) -> usize {
        self.trees.iter().map(|t| t.exclusions.len()).sum()
    }
}

/// The final model of a run, with its report.
#[derive(Debug, Clone)]
pub struct MitModel<M> {
    model: M,
    report: InductionReport,
    meta_dataset: Option<Dataset>,
    analyses: Option<Vec<TreeAnalysis>>,
}

impl<M: ExplainableModel> MitModel<M> {
    /// The final tree.
    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Drop the report and keep the final tree.
    #[must_use]
    pub fn into_model(self) -> M {
        self.model
    }

    /// Counts and per-tree figures of the run.
    #[must_use]
    pub fn report(&self) -> &InductionReport {
        &self.report
    }

    /// The meta training set, when the run kept it.
    #[must_use]
    pub fn meta_dataset(&self) -> Option<&Dataset> {
        self.meta_dataset.as_ref()
    }

    /// Per-tree rules and rows, when the run kept them.
    #[must_use]
    pub fn analyses(&self) -> Option<&[TreeAnalysis]> {
        self.analyses.as_deref()
    }

    /// Predict the class index of one row.
    ///
    /// # Errors
    ///
    /// Whatever the final model reports for a malformed row.
    pub fn classify(&self, values: &[Value]) -> Result<usize, MitError> {
        self.model.classify(values)
    }

    /// Text rendering with leaf weights divided by the forest size.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.model.render_text(self.report.forest_size as f64)
    }

    /// Graphviz rendering with leaf weights divided by the forest size.
    #[must_use]
    pub fn to_dot(&self) -> String {
        self.model.render_dot(self.report.forest_size as f64)
    }
}

/// Decomposes a forest into weighted rules and learns one tree from them.
#[derive(Debug, Clone)]
pub struct MetaInductionPipeline<F, T> {
    config: MitConfig,
    forest: F,
    tree: T,
}

impl<F: ForestLearner, T: TreeLearner> MetaInductionPipeline<F, T> {
    /// Pipeline using `forest` for the rules and `tree` for the final model.
    #[must_use]
    pub fn new(config: MitConfig, forest: F, tree: T) -> Self {
        Self {
            config,
            forest,
            tree,
        }
    }

    /// Options of the run.
    #[must_use]
    pub fn config(&self) -> &MitConfig {
        &self.config
    }

    /// Train the forest and turn every tree into scored rules and meta rows.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`MitError::Configuration`] | invalid config; checked before the forest is trained |
    /// | [`MitError::ContractViolation`] | a tree or rule does not fit the dataset |
    /// | [`MitError::Learner`] | the forest learner failed |
    #[instrument(skip_all, fields(relation = data.header().relation(), forest_size = self.config.forest_size()))]
    pub fn analyze(&self, data: &Dataset) -> Result<Vec<TreeAnalysis>, MitError> {
        self.config.validate()?;
        let trees = self.forest.build(data, self.config.forest_size())?;
        info!(n_trees = trees.len(), "forest trained");
        self.analyze_trees(data, &trees)
    }

    /// Turn already trained `trees` into scored rules and meta rows.
    ///
    /// The forest learner is not called.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`MitError::Configuration`] | invalid config |
    /// | [`MitError::ContractViolation`] | a tree or rule does not fit the dataset |
    pub fn analyze_trees<Tr: InspectTree + Sync>(
        &self,
        data: &Dataset,
        trees: &[Tr],
    ) -> Result<Vec<TreeAnalysis>, MitError> {
        self.config.validate()?;

        let catalog = AttributeCatalog::build(data);
        let totals = ClassTotals::from_dataset(data);
        let extractor = RuleExtractor::new(data.header(), &catalog);
        let builder = MetaDatasetBuilder::new(
            data.header(),
            self.config.numeric_strategy(),
            self.config.weight_strategy(),
        )
        .with_novelty_scale(self.config.novelty_scale());

        let analyses = if self.config.parallel() {
            trees
                .par_iter()
                .enumerate()
                .map(|(index, tree)| analyze_tree(index, tree, &extractor, &totals, &builder))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            trees
                .iter()
                .enumerate()
                .map(|(index, tree)| analyze_tree(index, tree, &extractor, &totals, &builder))
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(analyses)
    }

    /// Run the whole pipeline on `data`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`MitError::Configuration`] | invalid config; nothing is trained |
    /// | [`MitError::ContractViolation`] | a tree or rule does not fit the dataset |
    /// | [`MitError::EmptyTrainingSet`] | every rule was filtered out; the tree learner is not called |
    /// | [`MitError::Learner`] | a learner failed |
    #[instrument(skip_all, fields(relation = data.header().relation()))]
    pub fn run(&self, data: &Dataset) -> Result<MitModel<T::Model>, MitError> {
        let analyses = self.analyze(data)?;
        self.induce(data, analyses)
    }

    /// Run the pipeline on a forest trained elsewhere on `data`.
    ///
    /// The forest learner is not called; the report counts `trees.len()`
    /// trees.
    ///
    /// # Errors
    ///
    /// As [`Self::run`], except that no forest learner error can occur.
    #[instrument(skip_all, fields(relation = data.header().relation(), n_trees = trees.len()))]
    pub fn run_on_trees<Tr: InspectTree + Sync>(
        &self,
        data: &Dataset,
        trees: &[Tr],
    ) -> Result<MitModel<T::Model>, MitError> {
        let analyses = self.analyze_trees(data, trees)?;
        self.induce(data, analyses)
    }

    /// Meta dataset and final tree from per-tree analyses.
    fn induce(&self, data: &Dataset, analyses: Vec<TreeAnalysis>) -> Result<MitModel<T::Model>, MitError> {
        let meta = meta_dataset(data.header(), &analyses)?;
        let n_rules: usize = analyses.iter().map(|a| a.rules.len()).sum();

        if meta.is_empty() {
            return Err(MitError::EmptyTrainingSet {
                n_trees: analyses.len(),
                n_rules,
            });
        }
        info!(
            n_rules,
            n_meta_rows = meta.len(),
            meta_weight = meta.sum_of_weights(),
            "meta dataset built"
        );

        let model = self.tree.build(&meta, self.config.prune())?;
        info!(
            leaf_count = model.leaf_count(),
            node_count = model.node_count(),
            "final tree trained"
        );

        let report = InductionReport {
            forest_size: analyses.len(),
            numeric_strategy: self.config.numeric_strategy(),
            weight_strategy: self.config.weight_strategy(),
            trees: analyses.iter().map(TreeAnalysis::summary).collect(),
            n_rules,
            n_meta_rows: meta.len(),
            meta_weight: meta.sum_of_weights(),
            leaf_count: model.leaf_count(),
            node_count: model.node_count(),
        };

        Ok(MitModel {
            model,
            report,
            meta_dataset: self.config.keep_meta_dataset().then_some(meta),
            analyses: self.config.keep_rules().then_some(analyses),
        })
    }
}

fn analyze_tree<Tr: InspectTree>(
    index: usize,
    tree: &Tr,
    extractor: &RuleExtractor<'_>,
    totals: &ClassTotals,
    builder: &MetaDatasetBuilder<'_>,
) -> Result<TreeAnalysis, ContractViolation> {
    let rules = extractor
        .extract(tree)?
        .into_iter()
        .map(|rule| {
            let metrics = RuleMetrics::compute(&rule, totals)?;
            Ok(ScoredRule { rule, metrics })
        })
        .collect::<Result<Vec<_>, ContractViolation>>()?;
    let batch = builder.build(&rules)?;
    debug!(
        tree = index,
        n_rules = rules.len(),
        n_rows = batch.rows.len(),
        n_excluded = batch.exclusions.len(),
        "tree decomposed"
    );
    Ok(TreeAnalysis {
        tree: index,
        rules,
        batch,
    })
}

/// Meta dataset over the schema of `header`, rows in tree order.
fn meta_dataset(header: &Header, analyses: &[TreeAnalysis]) -> Result<Dataset, MitError> {
    let meta_header = Header::new(
        format!("{}_meta", header.relation()),
        header.attributes().to_vec(),
        header.class_attribute().clone(),
    )?;
    let mut meta = Dataset::new(meta_header);
    for row in analyses.iter().flat_map(|a| a.batch.rows.iter()) {
        meta.push(row.clone().into_instance())?;
    }
    Ok(meta)
}
