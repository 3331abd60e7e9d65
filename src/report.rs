/// Annual event count reports.
///
/// One file per data kind, covering every processed region:
///
/// CSV
/// ```text
/// region,2000,2001,2002
/// region 0,3,0,1
/// ```
///
/// JSON
/// ```text
/// { "region 0": { "2000": 3, "2001": 0, "2002": 1 } }
/// ```
///
/// Existing reports are never overwritten; a numbered suffix is added
/// instead (`storm_2000-2002(1).csv`).

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::config::OutputType;
use crate::model::{AnnualCount, DataKind, ReportError};

/// Row label used for a region in both formats.
pub fn region_label(region: usize) -> String {
    format!("region {}", region)
}

/// First free path of the form `<dir>/<stem>.<ext>`, `<stem>(1).<ext>`, ...
pub fn unique_output_path(output_dir: &Path, stem: &str, output_type: OutputType) -> PathBuf {
    let ext = output_type.extension();
    let mut candidate = output_dir.join(format!("{}.{}", stem, ext));
    let mut counter = 0;
    while candidate.exists() {
        counter += 1;
        candidate = output_dir.join(format!("{}({}).{}", stem, counter, ext));
    }
    candidate
}

/// Report file stem, e.g. `wave_1959-2022`.
pub fn report_stem(kind: DataKind, start_year: i32, end_year: i32) -> String {
    format!("{}_{}-{}", kind, start_year, end_year)
}

/// Renders the CSV report. `years` fixes the column order.
pub fn render_csv(years: &[i32], rows: &[(usize, AnnualCount)]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);

    let mut header = vec!["region".to_string()];
    header.extend(years.iter().map(|y| y.to_string()));
    lines.push(header.join(","));

    for (region, counts) in rows {
        let mut row = vec![region_label(*region)];
        row.extend(years.iter().map(|y| counts.get(*y).unwrap_or(0).to_string()));
        lines.push(row.join(","));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Renders the JSON report.
pub fn render_json(rows: &[(usize, AnnualCount)]) -> Result<String, ReportError> {
    let mut root = Map::new();
    for (region, counts) in rows {
        let years: Map<String, Value> = counts
            .iter()
            .map(|(year, count)| (year.to_string(), Value::from(count)))
            .collect();
        root.insert(region_label(*region), Value::Object(years));
    }
    Ok(serde_json::to_string_pretty(&Value::Object(root))?)
}

/// Writes a report for one data kind and returns the path written.
///
/// Creates `output_dir` if needed.
pub fn write_report(
    output_dir: &Path,
    kind: DataKind,
    start_year: i32,
    end_year: i32,
    output_type: OutputType,
    rows: &[(usize, AnnualCount)],
) -> Result<PathBuf, ReportError> {
    let io_error = |path: &Path, source: std::io::Error| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(output_dir).map_err(|e| io_error(output_dir, e))?;

    let path = unique_output_path(output_dir, &report_stem(kind, start_year, end_year), output_type);
    let years: Vec<i32> = (start_year..=end_year).collect();
    let contents = match output_type {
        OutputType::Csv => render_csv(&years, rows),
        OutputType::Json => render_json(rows)?,
    };

    fs::write(&path, contents).map_err(|e| io_error(&path, e))?;
    Ok(path)
}
