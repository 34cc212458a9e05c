// Comparison view export (CSV, JSON)

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use belcheck_recon::config::ColumnConfig;
use belcheck_recon::{ClassifiedView, ViewSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

/// Export header: ROW, INDEX, export keys, subject label, reference label, DIFF.
pub fn export_header(columns: &ColumnConfig) -> Vec<String> {
    let mut header = vec!["ROW".to_string(), "INDEX".to_string()];
    header.extend(columns.export_keys.iter().map(|k| k.to_ascii_uppercase()));
    header.push(columns.subject_label.clone());
    header.push(columns.reference_label.clone());
    header.push("DIFF".to_string());
    header
}

/// Rendered export records, one per view row, in view order.
pub fn export_records(view: &ClassifiedView, columns: &ColumnConfig) -> Vec<Vec<String>> {
    let positions = columns.export_key_positions();
    view.rows
        .iter()
        .map(|r| {
            let mut record = vec![r.row.to_string(), r.index_text()];
            record.extend(positions.iter().map(|&p| r.key_text(p)));
            record.push(r.subject_text());
            record.push(r.reference_text());
            record.push(r.diff_text());
            record
        })
        .collect()
}

pub fn write_csv(view: &ClassifiedView, columns: &ColumnConfig, writer: impl Write) -> Result<(), String> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv.write_record(export_header(columns))
        .map_err(|e| format!("CSV write error: {e}"))?;
    for record in export_records(view, columns) {
        csv.write_record(&record)
            .map_err(|e| format!("CSV write error: {e}"))?;
    }

    csv.flush().map_err(|e| format!("CSV flush error: {e}"))?;
    Ok(())
}

#[derive(Serialize)]
struct JsonExport<'a> {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    summary: &'a ViewSummary,
}

/// Same header and cells as the CSV export plus the view summary.
pub fn write_json(view: &ClassifiedView, columns: &ColumnConfig, writer: impl Write) -> Result<(), String> {
    let doc = JsonExport {
        columns: export_header(columns),
        rows: export_records(view, columns),
        summary: &view.summary,
    };
    let mut writer = writer;
    serde_json::to_writer_pretty(&mut writer, &doc).map_err(|e| format!("JSON write error: {e}"))?;
    writeln!(writer).map_err(|e| format!("JSON write error: {e}"))?;
    writer.flush().map_err(|e| format!("JSON flush error: {e}"))?;
    Ok(())
}

pub fn write_view(
    view: &ClassifiedView,
    columns: &ColumnConfig,
    format: ExportFormat,
    writer: impl Write,
) -> Result<(), String> {
    match format {
        ExportFormat::Csv => write_csv(view, columns, writer),
        ExportFormat::Json => write_json(view, columns, writer),
    }
}

pub fn export_to_path(
    view: &ClassifiedView,
    columns: &ColumnConfig,
    format: ExportFormat,
    path: &Path,
) -> Result<(), String> {
    let file = std::fs::File::create(path).map_err(|e| format!("{}: {e}", path.display()))?;
    write_view(view, columns, format, std::io::BufWriter::new(file))?;
    log::info!("exported {} rows to {}", view.rows.len(), path.display());
    Ok(())
}
