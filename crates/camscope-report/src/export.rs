//! Tabular per-segment export.
//!
//! One row per program line. Axis columns are limited to the axes the
//! program actually moves, and the `XYZ_Dist`/`Rot_Deg` columns only appear
//! for TCP programs.

use std::io::Write;

use camscope_engine::{AnalysisResult, Axis, Segment};

use crate::error::Result;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// CSV export options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    /// Prefix the output with a UTF-8 byte order mark.
    pub bom: bool,
    /// Rows written between flushes.
    pub batch_rows: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            bom: false,
            batch_rows: 5000,
        }
    }
}

/// Column header for a result.
pub fn header(result: &AnalysisResult) -> Vec<String> {
    let mut cols = vec!["Line".to_owned(), "Mode".to_owned()];
    cols.extend(result.axes.iter().map(|ax| format!("Start_{ax}")));
    cols.extend(result.axes.iter().map(|ax| format!("End_{ax}")));
    if result.is_tcp() {
        cols.push("XYZ_Dist".to_owned());
        cols.push("Rot_Deg".to_owned());
    }
    cols.extend(["Total_Dist", "Feed", "Info"].map(str::to_owned));
    cols
}

/// Classification tag for the `Info` column.
pub fn info(segment: &Segment) -> String {
    let label = segment.class.label();
    if segment.is_tcp() {
        format!("{label} (TCP)")
    } else {
        label.to_owned()
    }
}

fn row(result: &AnalysisResult, segment: &Segment, axes: &[Axis]) -> Vec<String> {
    let mut cols = Vec::with_capacity(5 + 2 * axes.len());
    cols.push(segment.line.to_string());
    cols.push(segment.mode.word().to_owned());
    cols.extend(axes.iter().map(|&ax| segment.start[ax].to_string()));
    cols.extend(axes.iter().map(|&ax| segment.end[ax].to_string()));
    if result.is_tcp() {
        cols.push(segment.kinematics.xyz.to_string());
        cols.push(segment.kinematics.angle_deg.to_string());
    }
    cols.push(segment.distance().to_string());
    // Declared feed, 0 where the program had not set one yet.
    let feed = result
        .lines
        .get(segment.line - 1)
        .map_or(0.0, |record| record.feed);
    cols.push(feed.to_string());
    cols.push(info(segment));
    cols
}

/// Write the per-segment table, returning the number of data rows.
pub fn write_csv<W: Write>(
    result: &AnalysisResult,
    mut out: W,
    options: &CsvOptions,
) -> Result<usize> {
    if options.bom {
        out.write_all(UTF8_BOM)?;
    }
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(header(result))?;

    let batch = options.batch_rows.max(1);
    let mut written = 0;
    for segment in &result.segments {
        writer.write_record(row(result, segment, &result.axes))?;
        written += 1;
        if written % batch == 0 {
            writer.flush()?;
        }
    }
    writer.flush()?;
    Ok(written)
}
