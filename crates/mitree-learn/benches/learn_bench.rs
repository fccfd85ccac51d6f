//! Criterion benchmarks for mitree-learn: forest training, pruned trees, prediction.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use mitree_learn::{Attribute, Dataset, Header, Instance, PruneConfig, RandomForestConfig, Value};

fn make_classification(n_instances: usize, n_numeric: usize, n_classes: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut attributes: Vec<Attribute> = (0..n_numeric)
        .map(|f| Attribute::numeric(format!("f{f}")))
        .collect();
    attributes.push(Attribute::nominal(
        "band",
        vec!["low".into(), "mid".into(), "high".into()],
    ));
    let classes = (0..n_classes).map(|c| format!("c{c}")).collect();
    let header = Header::new("bench", attributes, Attribute::nominal("class", classes)).unwrap();
    let mut data = Dataset::new(header);
    for i in 0..n_instances {
        let class = i % n_classes;
        let mut values: Vec<Value> = (0..n_numeric)
            .map(|f| {
                let base = if f < 3 { class as f64 * 3.0 } else { 0.0 };
                Value::Numeric(base + rng.r#gen::<f64>() * 0.5)
            })
            .collect();
        values.push(Value::Nominal(rng.gen_range(0..3)));
        data.push(Instance::new(values, class, 1.0)).unwrap();
    }
    data
}

fn bench_forest_train(c: &mut Criterion) {
    let data = make_classification(500, 20, 5, 42);
    let cfg = RandomForestConfig::new(50).unwrap().with_seed(42);

    c.bench_function("forest_train_500x21_5class_50trees", |b| {
        b.iter(|| cfg.fit(&data).unwrap());
    });
}

fn bench_forest_classify(c: &mut Criterion) {
    let data = make_classification(500, 20, 5, 42);
    let forest = RandomForestConfig::new(50)
        .unwrap()
        .with_seed(42)
        .fit(&data)
        .unwrap();

    c.bench_function("forest_classify_500x21_50trees", |b| {
        b.iter(|| forest.classify_dataset(&data).unwrap());
    });
}

fn bench_pruned_tree(c: &mut Criterion) {
    let data = make_classification(500, 20, 5, 42);
    let cfg = PruneConfig::new();

    c.bench_function("pruned_tree_500x21_5class", |b| {
        b.iter(|| cfg.fit(&data).unwrap());
    });
}

criterion_group!(benches, bench_forest_train, bench_forest_classify, bench_pruned_tree);
criterion_main!(benches);
