use hdrhistogram::Histogram;
use serde::Serialize;

/// A complete percentile breakdown over every request since start/reset.
/// Serialized straight into the stats snapshot (microseconds).
#[derive(Debug, Clone, Serialize)]
pub struct PercentileSet {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub p999: u64,
    pub count: u64,
}

impl PercentileSet {
    /// Extract a full percentile set from an HdrHistogram.
    /// Returns zeroed values if the histogram is empty.
    pub fn from_histogram(hist: &Histogram<u64>) -> Self {
        if hist.len() == 0 {
            return Self::empty();
        }

        Self {
            min: hist.min(),
            max: hist.max(),
            mean: hist.mean(),
            p50: hist.value_at_percentile(50.0),
            p95: hist.value_at_percentile(95.0),
            p99: hist.value_at_percentile(99.0),
            p999: hist.value_at_percentile(99.9),
            count: hist.len(),
        }
    }

    /// All-zero placeholder used before any samples are recorded.
    pub fn empty() -> Self {
        Self {
            min: 0,
            max: 0,
            mean: 0.0,
            p50: 0,
            p95: 0,
            p99: 0,
            p999: 0,
            count: 0,
        }
    }
}

/// Nearest-rank percentile over an ascending slice. `0.0` when empty.
pub fn nearest_rank(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    let idx = rank.clamp(1, sorted.len()) - 1;
    sorted[idx]
}

/// Copy and sort a window of durations for percentile extraction.
pub fn sorted_window<'a>(values: impl IntoIterator<Item = &'a f64>) -> Vec<f64> {
    let mut out: Vec<f64> = values.into_iter().copied().collect();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_rank_on_small_window() {
        let mut window = vec![10.0; 9];
        window.push(2000.0);
        let sorted = sorted_window(&window);

        assert_eq!(nearest_rank(&sorted, 50.0), 10.0);
        assert_eq!(nearest_rank(&sorted, 90.0), 10.0);
        assert_eq!(nearest_rank(&sorted, 95.0), 2000.0);
        assert_eq!(nearest_rank(&sorted, 99.0), 2000.0);
    }

    #[test]
    fn nearest_rank_empty_is_zero() {
        assert_eq!(nearest_rank(&[], 95.0), 0.0);
    }

    #[test]
    fn empty_histogram_gives_zeroed_set() {
        let hist = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3).unwrap();
        let set = PercentileSet::from_histogram(&hist);
        assert_eq!(set.count, 0);
        assert_eq!(set.p99, 0);
    }
}
