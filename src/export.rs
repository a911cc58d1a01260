//! Measurement export
//!
//! Writes the history as an Excel workbook or as an HTML report built from a
//! template. Both outputs are assembled in memory and land on disk in a
//! single atomic write.

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::history::MeasurementRecord;
use crate::util::{escape_html, write_atomic};

/// Column headers, in record field order
pub const COLUMNS: [&str; 7] = [
    "Timestamp",
    "Source",
    "Region",
    "Avg Brightness",
    "RGB Avg",
    "LightStrengthGain",
    "Recommendation",
];

/// Template shipped with the crate
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/report_template.html");

const COLUMN_WIDTHS: [f64; 7] = [20.0, 16.0, 24.0, 14.0, 22.0, 18.0, 60.0];

/// Export error types
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No measurements to export")]
    NoRecords,

    #[error("Report template not found: {0}")]
    TemplateNotFound(PathBuf),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// Build the workbook bytes without touching the filesystem
pub fn build_workbook(records: &[MeasurementRecord]) -> Result<Vec<u8>> {
    if records.is_empty() {
        return Err(ExportError::NoRecords);
    }

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Measurements")?;

    for (col, (title, width)) in COLUMNS.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *title, &header)?;
        sheet.set_column_width(col, width)?;
    }

    for (idx, record) in records.iter().enumerate() {
        let row = idx as u32 + 1;
        for (col, value) in record.fields().iter().enumerate() {
            sheet.write_string(row, col as u16, *value)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Export records to an `.xlsx` file
pub fn export_xlsx(records: &[MeasurementRecord], path: &Path) -> Result<()> {
    let bytes = build_workbook(records)?;
    write_atomic(path, &bytes)?;
    tracing::info!(path = %path.display(), records = records.len(), "workbook exported");
    Ok(())
}

/// Fill a report template
///
/// Every cell is HTML-escaped; line breaks inside a cell become `<br>`.
pub fn render_report(template: &str, records: &[MeasurementRecord], generated_at: &str) -> String {
    let header: String = COLUMNS
        .iter()
        .map(|c| format!("<th>{}</th>", escape_html(c)))
        .collect();

    let mut rows = String::new();
    for record in records {
        rows.push_str("<tr>");
        for value in record.fields() {
            rows.push_str("<td>");
            rows.push_str(&escape_html(value).replace('\n', "<br>"));
            rows.push_str("</td>");
        }
        rows.push_str("</tr>\n");
    }

    template
        .replace("{{total_measurements}}", &records.len().to_string())
        .replace("{{report_time}}", &escape_html(generated_at))
        .replace("{{table_header}}", &header)
        .replace("{{table_rows}}", &rows)
}

/// Load a report template, falling back to the built-in one
pub fn load_template(path: Option<&Path>) -> Result<String> {
    match path {
        None => Ok(DEFAULT_TEMPLATE.to_string()),
        Some(p) if !p.is_file() => Err(ExportError::TemplateNotFound(p.to_path_buf())),
        Some(p) => Ok(std::fs::read_to_string(p)?),
    }
}

/// Render and write an HTML report
pub fn write_report(
    path: &Path,
    template: Option<&Path>,
    records: &[MeasurementRecord],
    generated_at: &str,
) -> Result<()> {
    if records.is_empty() {
        return Err(ExportError::NoRecords);
    }
    let template = load_template(template)?;
    let html = render_report(&template, records, generated_at);
    write_atomic(path, html.as_bytes())?;
    tracing::info!(path = %path.display(), records = records.len(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(recommendation: &str) -> MeasurementRecord {
        MeasurementRecord {
            timestamp: "2024-01-01 12:00:00".to_string(),
            source: "selected region".to_string(),
            region: "(70, 100) - (400, 300)".to_string(),
            avg_brightness: "200.00".to_string(),
            rgb_average: "R:200, G:200, B:200".to_string(),
            gain: "0.57".to_string(),
            recommendation: recommendation.to_string(),
        }
    }

    #[test]
    fn test_columns_match_record_fields() {
        assert_eq!(COLUMNS.len(), record("x").fields().len());
        assert_eq!(COLUMNS[5], "LightStrengthGain");
    }

    #[test]
    fn test_render_report_substitutes_placeholders() {
        let template = "n={{total_measurements}} t={{report_time}} <tr>{{table_header}}</tr>{{table_rows}}";
        let html = render_report(template, &[record("ok"), record("ok")], "2024-01-02 03:04:05");

        assert!(html.starts_with("n=2 t=2024-01-02 03:04:05"));
        assert!(html.contains("<th>Timestamp</th>"));
        assert!(html.contains("<th>Recommendation</th>"));
        assert_eq!(html.matches("<tr><td>").count(), 2);
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_render_report_escapes_cells() {
        let html = render_report(
            DEFAULT_TEMPLATE,
            &[record("<script>alert(1)</script>\nsecond & last")],
            "now",
        );
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;<br>second &amp; last"));
    }

    #[test]
    fn test_write_report_default_template() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.html");
        write_report(&path, None, &[record("hold")], "2024-01-01 00:00:00").unwrap();

        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("Measurements: 1"));
        assert!(html.contains("<td>hold</td>"));
    }

    #[test]
    fn test_write_report_custom_template() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("custom.html");
        std::fs::write(&template, "<p>{{total_measurements}}</p>").unwrap();
        let path = dir.path().join("report.html");

        write_report(&path, Some(&template), &[record("a")], "now").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<p>1</p>");
    }

    #[test]
    fn test_write_report_missing_template() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.html");
        let missing = dir.path().join("missing.html");

        let err = write_report(&path, Some(&missing), &[record("a")], "now").unwrap_err();
        assert!(matches!(err, ExportError::TemplateNotFound(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_empty_history_is_rejected() {
        let dir = TempDir::new().unwrap();
        let xlsx = dir.path().join("out.xlsx");
        let html = dir.path().join("out.html");

        assert!(matches!(export_xlsx(&[], &xlsx), Err(ExportError::NoRecords)));
        assert!(matches!(
            write_report(&html, None, &[], "now"),
            Err(ExportError::NoRecords)
        ));
        assert!(!xlsx.exists());
        assert!(!html.exists());
    }

    #[test]
    fn test_export_xlsx_creates_workbook() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");
        export_xlsx(&[record("a"), record("b")], &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        // xlsx is a zip container
        assert_eq!(&bytes[..2], b"PK");
    }
}
