//! Criterion benchmarks for mitree-core: rule extraction and full induction runs.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use mitree_core::{
    AttributeCatalog, ClassTotals, ForestLearner, MitConfig, NumericStrategy, RuleExtractor,
    RuleMetrics, WeightStrategy,
};
use mitree_learn::{Attribute, Dataset, Header, Instance, Value};

fn make_classification(n_instances: usize, n_numeric: usize, n_classes: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut attributes: Vec<Attribute> = (0..n_numeric)
        .map(|f| Attribute::numeric(format!("f{f}")))
        .collect();
    attributes.push(Attribute::nominal(
        "colour",
        vec!["red".into(), "green".into(), "blue".into()],
    ));
    let classes = (0..n_classes).map(|c| format!("c{c}")).collect();
    let header = Header::new("bench", attributes, Attribute::nominal("class", classes)).unwrap();
    let mut data = Dataset::new(header);
    for i in 0..n_instances {
        let class = i % n_classes;
        let mut values: Vec<Value> = (0..n_numeric)
            .map(|f| {
                let base = if f < 2 { class as f64 * 2.0 } else { 0.0 };
                Value::Numeric(base + rng.r#gen::<f64>())
            })
            .collect();
        values.push(Value::Nominal(rng.gen_range(0..3)));
        data.push(Instance::new(values, class, 1.0)).unwrap();
    }
    data
}

fn bench_extract_and_score(c: &mut Criterion) {
    let data = make_classification(400, 10, 3, 42);
    let config = MitConfig::new().with_forest_size(20).with_seed(42);
    let trees = config.forest_learner().build(&data, 20).unwrap();
    let catalog = AttributeCatalog::build(&data);
    let totals = ClassTotals::from_dataset(&data);
    let extractor = RuleExtractor::new(data.header(), &catalog);

    c.bench_function("extract_score_400x11_20trees", |b| {
        b.iter(|| {
            trees
                .iter()
                .flat_map(|tree| extractor.extract(tree).unwrap())
                .map(|rule| RuleMetrics::compute(&rule, &totals).unwrap())
                .count()
        });
    });
}

fn bench_induction(c: &mut Criterion) {
    let data = make_classification(400, 10, 3, 42);
    for (name, numeric) in [("interval", NumericStrategy::Interval), ("average", NumericStrategy::Average)] {
        let config = MitConfig::new()
            .with_forest_size(20)
            .with_seed(42)
            .with_numeric_strategy(numeric)
            .with_weight_strategy(WeightStrategy::Laplace);
        c.bench_function(&format!("induce_{name}_400x11_20trees"), |b| {
            b.iter(|| config.fit(&data).unwrap());
        });
    }
}

criterion_group!(benches, bench_extract_and_score, bench_induction);
criterion_main!(benches);
