use crate::record::{AggregateResult, StudentRecord};

pub const PERCENTILES: [usize; 3] = [25, 50, 75];

/// Count, mean and rank-based percentiles over the obtained marks of `records`.
///
/// Percentile `p` is the value at 1-based rank `ceil(p * n / 100)` of the
/// ascending scores, with no interpolation. An empty input yields all zeros.
pub fn aggregate(records: &[StudentRecord]) -> AggregateResult {
    if records.is_empty() {
        return AggregateResult::default();
    }

    let mut scores: Vec<f64> = records.iter().map(|r| r.obtained_marks).collect();
    scores.sort_by(f64::total_cmp);

    let n = scores.len();
    let sum: f64 = scores.iter().sum();
    let [p25, p50, p75] = PERCENTILES.map(|p| scores[percentile_rank(p, n) - 1]);

    AggregateResult {
        mean: round2(sum / n as f64),
        count: n,
        p25,
        p50,
        p75,
    }
}

/// Smallest 1-based rank whose position covers `percent`% of `n` items.
pub fn percentile_rank(percent: usize, n: usize) -> usize {
    (percent * n).div_ceil(100).clamp(1, n.max(1))
}

/// Round to two decimals, halves away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
