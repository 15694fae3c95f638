//! CSV export of the scan history.

use std::io::Write;
use std::path::Path;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use tracing::info;

use crate::error::{Error, Result};
use crate::history::ScanEvent;

/// File name used when no output path is given.
pub const DEFAULT_EXPORT_FILE: &str = "scan-history.csv";

/// Fixed column header.
pub const CSV_HEADER: [&str; 5] = ["time", "content", "name", "region", "variety"];

/// Write `events` as CSV to `writer`.
///
/// Every field is quoted and embedded quotes are doubled. Rows end in `\n`.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_csv<W: Write>(events: &[ScanEvent], writer: W) -> Result<()> {
    let mut csv = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);

    csv.write_record(CSV_HEADER)?;
    for event in events {
        csv.write_record([
            event.local_time().as_str(),
            event.raw_content.as_str(),
            event.matched_name.as_str(),
            event.matched_region.as_str(),
            event.matched_variety.as_str(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Render `events` as a CSV string.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_csv_string(events: &[ScanEvent]) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(events, &mut buf)?;
    String::from_utf8(buf).map_err(|e| Error::internal(format!("CSV output is not UTF-8: {e}")))
}

/// Write `events` as CSV to the file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn export_to_file(events: &[ScanEvent], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)?;
    write_csv(events, std::io::BufWriter::new(file))?;
    info!("Exported {} events to {}", events.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::history::HistoryLog;
    use crate::session::AppState;

    fn event(content: &str, name: &str) -> ScanEvent {
        ScanEvent {
            timestamp: "not-a-time".to_string(),
            raw_content: content.to_string(),
            matched_name: name.to_string(),
            matched_region: String::new(),
            matched_variety: String::new(),
        }
    }

    #[test]
    fn test_empty_export_is_header_only() {
        let csv = to_csv_string(&[]).unwrap();
        assert_eq!(csv, "\"time\",\"content\",\"name\",\"region\",\"variety\"\n");
    }

    #[test]
    fn test_clear_then_export_is_header_only() {
        let history = HistoryLog::open_in_memory().unwrap();
        history.push(event("a", "A")).unwrap();
        history.push(event("b", "")).unwrap();
        history.clear().unwrap();

        let csv = to_csv_string(&history.list().unwrap()).unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("\"time\""));
    }

    #[test]
    fn test_every_field_quoted() {
        let csv = to_csv_string(&[event("wine:ABC", "Alpine Blanc")]).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(row, "\"not-a-time\",\"wine:ABC\",\"Alpine Blanc\",\"\",\"\"");
    }

    #[test]
    fn test_embedded_quotes_doubled() {
        let csv = to_csv_string(&[event("say \"hi\", ok", "")]).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.contains("\"say \"\"hi\"\", ok\""));
    }

    #[test]
    fn test_rows_follow_history_order() {
        let events = vec![event("newest", ""), event("oldest", "")];
        let csv = to_csv_string(&events).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("newest"));
        assert!(lines[2].contains("oldest"));
    }

    #[test]
    fn test_logged_scans_export_most_recent_first() {
        let catalog = Catalog::from_json_str(
            r#"{
                "ABC": {"name": "Alpine Blanc", "region": "Savoie", "variety": "Jacquère"},
                "XYZ": {"name": "Xinomavro Reserve", "region": "Naoussa", "variety": "Xinomavro"}
            }"#,
        )
        .unwrap();
        let app = AppState::new(catalog, HistoryLog::open_in_memory().unwrap());

        let payloads = ["wine:ABC", "https://shop.example.com/wines/XYZ?src=qr", "alpine", "nothing here"];
        for payload in payloads {
            app.handle_payload(payload).unwrap();
        }

        let csv = to_csv_string(&app.history().list().unwrap()).unwrap();
        let rows: Vec<&str> = csv.lines().collect();
        assert_eq!(rows.len(), payloads.len() + 1);
        assert_eq!(rows[0], "\"time\",\"content\",\"name\",\"region\",\"variety\"");
        assert!(rows[1].ends_with("\"nothing here\",\"\",\"\",\"\""));
        assert!(rows[2].ends_with("\"keyword:alpine\",\"Alpine Blanc\",\"Savoie\",\"Jacquère\""));
        assert!(rows[3].contains("\"Xinomavro Reserve\",\"Naoussa\",\"Xinomavro\""));
        assert!(rows[4].ends_with("\"wine:ABC\",\"Alpine Blanc\",\"Savoie\",\"Jacquère\""));
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let result = export_to_file(&[], "/nonexistent/dir/out.csv");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
