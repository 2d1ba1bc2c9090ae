//! Headline summary of an analysis.

use std::fmt;

use camscope_engine::AnalysisResult;
use serde::Serialize;

/// Anomaly log lines kept before truncation.
pub const DEFAULT_LOG_LIMIT: usize = 2000;

/// One headline bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadlineBin {
    /// Interval label, e.g. `10um ~ 20um`.
    pub label: String,
    /// Segments in the bin.
    pub count: usize,
    /// Share of binned segments.
    pub percent: f64,
}

/// KPI view of a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Distance model label.
    pub calc_mode: String,
    /// Program lines.
    pub total_lines: usize,
    /// Axes with a non-zero column somewhere (K always, from home).
    pub axes: Vec<String>,
    /// Rapid plus cutting distance (mm).
    pub total_distance: f64,
    /// Cutting distance (mm).
    pub cutting_distance: f64,
    /// Cutting share of the total distance.
    pub cutting_percent: f64,
    /// Rapid distance (mm).
    pub rapid_distance: f64,
    /// Rapid share of the total distance.
    pub rapid_percent: f64,
    /// Cutting time (minutes).
    pub cutting_time_min: f64,
    /// Cutting time as `HH:MM:SS`.
    pub cutting_time: String,
    /// BPT range or `N/A`.
    pub bpt: String,
    /// Average feed of the BPT bin.
    pub bpt_avg_feed: Option<f64>,
    /// Most populous bins.
    pub top: Vec<HeadlineBin>,
    /// Anomaly log, truncated.
    pub log: Vec<String>,
    /// Log lines cut by truncation.
    pub log_hidden: usize,
}

impl Summary {
    /// Build the summary, keeping at most `log_limit` log lines.
    pub fn new(result: &AnalysisResult, log_limit: usize) -> Summary {
        let total = result.total_distance();
        let share = |part: f64| if total > 0.0 { part / total * 100.0 } else { 0.0 };
        let kept = result.skipped.len().min(log_limit);

        Summary {
            calc_mode: result.calc_mode.label().to_owned(),
            total_lines: result.line_count(),
            axes: result.axes.iter().map(|ax| ax.to_string()).collect(),
            total_distance: total,
            cutting_distance: result.cutting_distance,
            cutting_percent: share(result.cutting_distance),
            rapid_distance: result.rapid_distance,
            rapid_percent: share(result.rapid_distance),
            cutting_time_min: result.cutting_time_min,
            cutting_time: format_duration(result.cutting_time_min),
            bpt: result
                .stats
                .bpt
                .map_or_else(|| "N/A".to_owned(), |bpt| bpt.range_label()),
            bpt_avg_feed: result.stats.bpt.map(|bpt| bpt.avg_feed),
            top: result
                .stats
                .headline
                .iter()
                .map(|bin| HeadlineBin {
                    label: bin.label.clone(),
                    count: bin.count,
                    percent: bin.percent,
                })
                .collect(),
            log: result.skipped[..kept].to_vec(),
            log_hidden: result.skipped.len() - kept,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Analysis Mode: {} ===", self.calc_mode)?;
        writeln!(f, "=== Total Lines: {} ===", self.total_lines)?;
        writeln!(f, "Axes:            {}", self.axes.join(" "))?;
        writeln!(f, "Total distance:  {} mm", group_thousands(self.total_distance))?;
        writeln!(
            f,
            "Cutting (G01+):  {} mm ({:.1}%)",
            group_thousands(self.cutting_distance),
            self.cutting_percent
        )?;
        writeln!(
            f,
            "Rapid (G00):     {} mm ({:.1}%)",
            group_thousands(self.rapid_distance),
            self.rapid_percent
        )?;
        writeln!(f, "Cutting time:    {}", self.cutting_time)?;
        match self.bpt_avg_feed {
            Some(feed) => writeln!(f, "BPT:             {} @ F{feed:.0}", self.bpt)?,
            None => writeln!(f, "BPT:             {}", self.bpt)?,
        }
        for (i, bin) in self.top.iter().enumerate() {
            writeln!(f, "Top {}:           {} ({:.1}%)", i + 1, bin.label, bin.percent)?;
        }
        if !self.log.is_empty() {
            writeln!(f)?;
            for line in &self.log {
                writeln!(f, "{line}")?;
            }
        }
        if self.log_hidden > 0 {
            writeln!(f, "... ({} more lines hidden) ...", self.log_hidden)?;
        }
        Ok(())
    }
}

/// Format minutes as `HH:MM:SS`, truncating to whole seconds.
pub fn format_duration(minutes: f64) -> String {
    let total = if minutes.is_finite() && minutes > 0.0 {
        (minutes * 60.0) as u64
    } else {
        0
    };
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Two decimals with comma-grouped thousands, e.g. `12,345.68`.
fn group_thousands(value: f64) -> String {
    let text = format!("{:.2}", value.abs());
    let (int, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let mut grouped = String::with_capacity(text.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}
