//! Display models.
//!
//! Pure transformations from resolutions and history events to what the
//! terminal shows. Nothing here touches storage or I/O.

use std::fmt;

use serde::Serialize;

use crate::history::ScanEvent;
use crate::resolver::Resolution;

/// Shown for a missing region, variety or notes.
pub const PLACEHOLDER: &str = "—";

/// Shown for a record without a name.
pub const UNNAMED: &str = "(unnamed)";

/// How a single resolution is presented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordView {
    /// Headline.
    pub title: String,
    /// Secondary line.
    pub meta: String,
    /// Body text.
    pub body: String,
    /// Product page link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Whether a record was found.
    pub matched: bool,
}

impl RecordView {
    /// Build the view for `resolution`.
    #[must_use]
    pub fn from_resolution(resolution: &Resolution) -> Self {
        let Some(record) = &resolution.record else {
            return Self {
                title: "No matching wine".to_string(),
                meta: format!("QR content: {}", resolution.label),
                body: "This content is not in the catalog. Add it to the catalog file, \
                       or point the QR code straight at a product page."
                    .to_string(),
                link: None,
                matched: false,
            };
        };

        Self {
            title: or_placeholder(&record.name, UNNAMED),
            meta: format!(
                "{} | {} | {}",
                or_placeholder(&record.region, PLACEHOLDER),
                or_placeholder(&record.variety, PLACEHOLDER),
                record.vintage
            ),
            body: or_placeholder(&record.notes, PLACEHOLDER),
            link: record.url.clone(),
            matched: true,
        }
    }
}

impl fmt::Display for RecordView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", self.meta)?;
        write!(f, "{}", self.body)?;
        if let Some(link) = &self.link {
            write!(f, "\nProduct page: {link}")?;
        }
        Ok(())
    }
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}

/// One row of the history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRow {
    /// Local time of the scan.
    pub time: String,
    /// Canonical label.
    pub content: String,
    /// Matched name.
    pub name: String,
    /// Matched region.
    pub region: String,
    /// Matched variety.
    pub variety: String,
}

impl HistoryRow {
    /// Build the row for `event`.
    #[must_use]
    pub fn from_event(event: &ScanEvent) -> Self {
        Self {
            time: event.local_time(),
            content: event.raw_content.clone(),
            name: event.matched_name.clone(),
            region: event.matched_region.clone(),
            variety: event.matched_variety.clone(),
        }
    }

    fn cells(&self) -> [&str; 5] {
        [
            &self.time,
            &self.content,
            &self.name,
            &self.region,
            &self.variety,
        ]
    }
}

/// Render rows as an aligned plain-text table with a header.
#[must_use]
pub fn history_table(rows: &[HistoryRow]) -> String {
    const HEADER: [&str; 5] = ["Time", "Content", "Name", "Region", "Variety"];

    let mut widths = HEADER.map(|h| h.chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row.cells()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &HEADER, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let rule: Vec<&str> = rule.iter().map(String::as_str).collect();
    push_line(&mut out, &rule, &widths);
    for row in rows {
        push_line(&mut out, &row.cells(), &widths);
    }
    out
}

fn push_line(out: &mut String, cells: &[&str], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}
