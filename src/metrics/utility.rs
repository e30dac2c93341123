use std::collections::BTreeMap;

use crate::dataset::{Dataset, Record};
use crate::platform::Measure;

/// `numerator / denominator`, or 0.0 when the denominator is zero.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sums `measure` per group key. Keys come back in sorted order.
pub fn group_sums<K: Ord>(
    data: &Dataset,
    key: impl Fn(&Record) -> K,
    measure: Measure,
) -> BTreeMap<K, f64> {
    let mut sums = BTreeMap::new();
    for record in &data.records {
        *sums.entry(key(record)).or_insert(0.0) += record.value(measure);
    }
    sums
}

/// Per-group `sum(numerator) / sum(denominator)`.
///
/// Groups whose denominator sums to zero have no defined ratio and are left
/// out.
pub fn group_ratios<K: Ord>(
    data: &Dataset,
    key: impl Fn(&Record) -> K,
    numerator: Measure,
    denominator: Measure,
) -> BTreeMap<K, f64> {
    let mut sums: BTreeMap<K, (f64, f64)> = BTreeMap::new();
    for record in &data.records {
        let entry = sums.entry(key(record)).or_insert((0.0, 0.0));
        entry.0 += record.value(numerator);
        entry.1 += record.value(denominator);
    }

    sums.into_iter()
        .filter(|(_, (_, den))| *den != 0.0)
        .map(|(k, (num, den))| (k, num / den))
        .collect()
}
