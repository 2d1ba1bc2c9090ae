//! Segment-length histogram, ranking and best-processing-time estimate.

use serde::{Deserialize, Serialize};

use crate::settings::{AnalysisSettings, BinInterval};

/// Milliseconds per minute; feeds are per minute.
const MS_PER_MIN: f64 = 60_000.0;

/// Upper bound multiplier used when the top bin is open-ended.
const OPEN_BIN_SPAN: f64 = 1.5;

/// Accumulated counts for one interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    /// Length interval.
    pub interval: BinInterval,
    /// Segments whose distance falls inside.
    pub count: usize,
    /// Sum of their feeds.
    pub feed_sum: f64,
}

impl Bin {
    fn empty(interval: BinInterval) -> Self {
        Self {
            interval,
            count: 0,
            feed_sum: 0.0,
        }
    }

    /// Average feed, `None` for an empty bin.
    pub fn avg_feed(&self) -> Option<f64> {
        (self.count > 0).then(|| self.feed_sum / self.count as f64)
    }
}

/// A populated bin in ranked order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedBin {
    /// Position of the interval in the partition.
    pub index: usize,
    /// Length interval.
    pub interval: BinInterval,
    /// Human-readable interval label.
    pub label: String,
    /// Segments in the bin.
    pub count: usize,
    /// Share of all binned segments (0..=100).
    pub percent: f64,
    /// Average feed of the bin's segments.
    pub avg_feed: f64,
}

/// Best-processing-time range for the most populous bin, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BptEstimate {
    /// Time to traverse the bin's lower bound at its average feed.
    pub min_ms: f64,
    /// Time to traverse the bin's upper bound (or `1.5 x lower` if open).
    pub max_ms: f64,
    /// Average feed of the bin.
    pub avg_feed: f64,
    /// Was the upper bound synthesized from an open interval?
    pub open_ended: bool,
}

impl BptEstimate {
    /// Estimate for a ranked bin; `None` if its average feed is not positive.
    pub fn for_bin(bin: &RankedBin) -> Option<BptEstimate> {
        if bin.avg_feed.is_nan() || bin.avg_feed <= 0.0 {
            return None;
        }
        let lower = bin.interval.start;
        let open_ended = bin.interval.is_open();
        let upper = if open_ended {
            lower * OPEN_BIN_SPAN
        } else {
            bin.interval.end
        };
        Some(BptEstimate {
            min_ms: lower / bin.avg_feed * MS_PER_MIN,
            max_ms: upper / bin.avg_feed * MS_PER_MIN,
            avg_feed: bin.avg_feed,
            open_ended,
        })
    }

    /// `"{min}ms ~ {max}ms"`.
    pub fn range_label(&self) -> String {
        format!("{:.2}ms ~ {:.2}ms", self.min_ms, self.max_ms)
    }
}

/// Histogram and rankings over cutting segments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Statistics {
    /// Every interval in partition order, empty ones included.
    pub bins: Vec<Bin>,
    /// Populated bins by count descending (ties keep partition order),
    /// truncated to `top_n`.
    pub top: Vec<RankedBin>,
    /// First `headline_n` of `top`.
    pub headline: Vec<RankedBin>,
    /// Estimate from the top bin.
    pub bpt: Option<BptEstimate>,
    /// Segments placed in a bin.
    pub binned: usize,
    /// Segments shorter than the first interval's start.
    pub unbinned: usize,
}

impl Statistics {
    /// Bin `(distance, feed)` samples.
    pub fn aggregate<I>(samples: I, settings: &AnalysisSettings) -> Statistics
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut bins: Vec<Bin> = settings.intervals.iter().copied().map(Bin::empty).collect();
        let mut unbinned = 0;
        for (distance, feed) in samples {
            match settings.bin_index(distance) {
                Some(idx) => {
                    bins[idx].count += 1;
                    bins[idx].feed_sum += feed;
                }
                None => unbinned += 1,
            }
        }
        let binned: usize = bins.iter().map(|b| b.count).sum();

        let mut ranked: Vec<RankedBin> = bins
            .iter()
            .enumerate()
            .filter_map(|(index, bin)| {
                let avg_feed = bin.avg_feed()?;
                Some(RankedBin {
                    index,
                    interval: bin.interval,
                    label: interval_label(&bin.interval),
                    count: bin.count,
                    percent: bin.count as f64 / binned as f64 * 100.0,
                    avg_feed,
                })
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked.truncate(settings.top_n);

        let headline = ranked.iter().take(settings.headline_n).cloned().collect();
        let bpt = ranked.first().and_then(BptEstimate::for_bin);

        Statistics {
            bins,
            top: ranked,
            headline,
            bpt,
            binned,
            unbinned,
        }
    }

    /// Per-interval counts in partition order.
    pub fn histogram(&self) -> Vec<usize> {
        self.bins.iter().map(|b| b.count).collect()
    }
}

/// Format a length: micrometres below 1mm, millimetres otherwise.
pub fn format_length(value: f64) -> String {
    if value.is_infinite() {
        "inf".to_owned()
    } else if value < 1.0 {
        format!("{:.0}um", value * 1000.0)
    } else {
        format!("{value:.3}mm")
    }
}

/// `"<start> ~ <end>"`, or `"> <start>"` for an open interval.
pub fn interval_label(interval: &BinInterval) -> String {
    if interval.is_open() {
        format!("> {}", format_length(interval.start))
    } else {
        format!(
            "{} ~ {}",
            format_length(interval.start),
            format_length(interval.end)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_labels() {
        assert_eq!(format_length(0.0), "0um");
        assert_eq!(format_length(0.001), "1um");
        assert_eq!(format_length(0.25), "250um");
        assert_eq!(format_length(1.0), "1.000mm");
        assert_eq!(interval_label(&BinInterval::new(0.01, 0.02)), "10um ~ 20um");
        assert_eq!(interval_label(&BinInterval::new(1.0, f64::INFINITY)), "> 1.000mm");
    }

    #[test]
    fn test_aggregate_counts_and_feeds() {
        let settings = AnalysisSettings::default();
        let samples = vec![(10.0, 500.0), (2.0, 1000.0), (0.015, 200.0)];
        let stats = Statistics::aggregate(samples, &settings);
        assert_eq!(stats.binned, 3);
        assert_eq!(stats.unbinned, 0);
        assert_eq!(stats.histogram().iter().sum::<usize>(), 3);
        let top = &stats.top[0];
        assert_eq!(top.index, 20);
        assert_eq!(top.count, 2);
        assert_relative_eq!(top.avg_feed, 750.0);
        assert_relative_eq!(top.percent, 200.0 / 3.0);
        assert_eq!(stats.top.len(), 2);
    }

    #[test]
    fn test_ranking_is_stable_on_ties() {
        let settings = AnalysisSettings::default();
        let samples = vec![(0.5, 100.0), (0.05, 100.0), (0.005, 100.0)];
        let stats = Statistics::aggregate(samples, &settings);
        let order: Vec<usize> = stats.top.iter().map(|b| b.index).collect();
        assert_eq!(order, vec![1, 6, 15]);
    }

    #[test]
    fn test_top_and_headline_truncation() {
        let settings = AnalysisSettings::default();
        let samples: Vec<(f64, f64)> = settings
            .intervals
            .iter()
            .map(|i| (i.start, 100.0))
            .collect();
        let stats = Statistics::aggregate(samples, &settings);
        assert_eq!(stats.top.len(), 10);
        assert_eq!(stats.headline.len(), 3);
        assert_eq!(stats.headline[..], stats.top[..3]);
    }

    #[test]
    fn test_bpt_bounded_bin() {
        let settings = AnalysisSettings::default();
        let stats = Statistics::aggregate(vec![(0.15, 600.0), (0.12, 600.0)], &settings);
        let bpt = stats.bpt.unwrap();
        assert_relative_eq!(bpt.min_ms, 0.1 / 600.0 * 60_000.0, epsilon = 1e-9);
        assert_relative_eq!(bpt.max_ms, 0.2 / 600.0 * 60_000.0, epsilon = 1e-9);
        assert!(!bpt.open_ended);
        assert_eq!(bpt.range_label(), "10.00ms ~ 20.00ms");
    }

    #[test]
    fn test_bpt_open_bin_uses_span() {
        let settings = AnalysisSettings::default();
        let stats = Statistics::aggregate(vec![(10.0, 500.0)], &settings);
        let bpt = stats.bpt.unwrap();
        assert_relative_eq!(bpt.min_ms, 120.0);
        assert_relative_eq!(bpt.max_ms, 180.0);
        assert!(bpt.open_ended);
    }

    #[test]
    fn test_empty_input() {
        let stats = Statistics::aggregate(Vec::new(), &AnalysisSettings::default());
        assert!(stats.top.is_empty());
        assert!(stats.bpt.is_none());
        assert_eq!(stats.bins.len(), 21);
    }
}
