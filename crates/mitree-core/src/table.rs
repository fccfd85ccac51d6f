//! Plain-text views of a tree's rules for inspection.

use std::fmt::Write as _;

use mitree_learn::Header;

use crate::{
    error::DegenerateRule,
    pipeline::TreeAnalysis,
    rule::Condition,
    strategy::WeightStrategy,
};

const COLUMN: usize = 15;

fn metric(value: Result<f64, DegenerateRule>, precision: usize) -> String {
    match value {
        Ok(v) => format!("{v:.precision$}"),
        Err(_) => "?".to_string(),
    }
}

/// One line per rule:
///
/// `A = x -> B >= 1.5 -> c1 : w = 4.00; err = 0.00; p = 1.000; wp = 4.00`
///
/// `wp` is the weighted metric of `weight`; `?` marks an undefined metric.
#[must_use]
pub fn render_rules(analysis: &TreeAnalysis, weight: WeightStrategy, novelty_scale: f64) -> String {
    let mut out = String::new();
    for scored in &analysis.rules {
        let rule = &scored.rule;
        let _ = writeln!(
            out,
            "{rule} : w = {:.2}; err = {:.2}; p = {}; wp = {}",
            rule.weight(),
            rule.error(),
            metric(scored.metrics.precision, 3),
            metric(scored.metrics.weighted(weight, rule.weight(), novelty_scale), 2),
        );
    }
    let _ = writeln!(out, "Tree error: {:.2}", analysis.error());
    out
}

/// Fixed-width table: one column per attribute, then the class, the
/// contingency cells and every metric.
///
/// Nominal cells show the label, numeric cells `[min,max]`, untested
/// attributes `-`.
#[must_use]
pub fn render_decision_table(analysis: &TreeAnalysis, header: &Header) -> String {
    let mut out = String::new();
    let columns = header
        .attributes()
        .iter()
        .map(|a| a.name().to_string())
        .chain(
            [header.class_attribute().name(), "a", "b", "c", "d", "precision", "laplace", "novelty", "satisfaction"]
                .map(String::from),
        );
    for name in columns {
        let _ = write!(out, "{name:<width$}", width = COLUMN);
    }
    out.push('\n');

    for scored in &analysis.rules {
        for attribute in header.attributes() {
            let cell = match scored.rule.condition_for(attribute.name()) {
                Some(Condition::NominalEquals { value, .. }) => value.clone(),
                Some(Condition::NominalNotEquals { value, .. }) => format!("!={value}"),
                Some(Condition::NumericRange {
                    effective_min,
                    effective_max,
                    ..
                }) => format!("[{effective_min:.2},{effective_max:.2}]"),
                None => "-".to_string(),
            };
            let _ = write!(out, "{cell:<width$}", width = COLUMN);
        }
        let m = &scored.metrics;
        let cells = [
            scored.rule.class().to_string(),
            format!("{:.2}", m.matrix.a),
            format!("{:.2}", m.matrix.b),
            format!("{:.2}", m.matrix.c),
            format!("{:.2}", m.matrix.d),
            metric(m.precision, 4),
            format!("{:.4}", m.laplace),
            format!("{:.4}", m.novelty),
            metric(m.satisfaction, 4),
        ];
        for cell in cells {
            let _ = write!(out, "{cell:<width$}", width = COLUMN);
        }
        out.push('\n');
    }
    out
}
