//! Scan history.
//!
//! Every resolution attempt, matched or not, becomes one [`ScanEvent`]. The
//! whole history is stored as a single JSON array under one storage key,
//! newest event first.

use std::path::Path;

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::catalog::lenient_text;
use crate::config::DEFAULT_STORAGE_KEY;
use crate::error::Result;
use crate::resolver::Resolution;
use crate::storage::Storage;

/// Local time format used when displaying or exporting events.
pub const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One logged resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    /// ISO-8601 UTC timestamp with millisecond precision.
    #[serde(rename = "ts")]
    pub timestamp: String,
    /// Canonical label of the payload.
    #[serde(rename = "content")]
    pub raw_content: String,
    /// Name of the matched record, empty if unmatched.
    #[serde(rename = "name", default, deserialize_with = "lenient_text")]
    pub matched_name: String,
    /// Region of the matched record.
    #[serde(rename = "region", default, deserialize_with = "lenient_text")]
    pub matched_region: String,
    /// Variety of the matched record.
    #[serde(rename = "variety", default, deserialize_with = "lenient_text")]
    pub matched_variety: String,
}

impl ScanEvent {
    /// Build an event for `resolution` at time `at`.
    #[must_use]
    pub fn from_resolution(resolution: &Resolution, at: DateTime<Utc>) -> Self {
        let record = resolution.record.as_ref();
        Self {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            raw_content: resolution.label.clone(),
            matched_name: record.map(|r| r.name.clone()).unwrap_or_default(),
            matched_region: record.map(|r| r.region.clone()).unwrap_or_default(),
            matched_variety: record.map(|r| r.variety.clone()).unwrap_or_default(),
        }
    }

    /// Parsed timestamp, `None` if the stored text is not RFC 3339.
    #[must_use]
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Timestamp rendered in local time, or the stored text verbatim.
    #[must_use]
    pub fn local_time(&self) -> String {
        self.parsed_timestamp().map_or_else(
            || self.timestamp.clone(),
            |dt| dt.with_timezone(&Local).format(LOCAL_TIME_FORMAT).to_string(),
        )
    }

    /// Check if this attempt found a record, judged by the stored name.
    #[must_use]
    pub fn is_match(&self) -> bool {
        !self.matched_name.is_empty()
    }
}

/// Persisted, most-recent-first scan history.
#[derive(Debug)]
pub struct HistoryLog {
    storage: Storage,
    key: String,
    max_entries: Option<usize>,
}

impl HistoryLog {
    /// Wrap `storage`, keeping the history under `key`.
    #[must_use]
    pub fn new(storage: Storage, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            max_entries: None,
        }
    }

    /// Open a history database at `path` under the default key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Storage::open(path)?, DEFAULT_STORAGE_KEY))
    }

    /// Open an in-memory history under the default key.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Storage::open_in_memory()?, DEFAULT_STORAGE_KEY))
    }

    /// Cap the number of retained events; older ones are dropped on insert.
    #[must_use]
    pub fn with_max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// The storage key the history lives under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The backing storage.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Log `resolution` as a new event timestamped now.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be written.
    pub fn record(&self, resolution: &Resolution) -> Result<ScanEvent> {
        let event = ScanEvent::from_resolution(resolution, Utc::now());
        self.push(event.clone())?;
        Ok(event)
    }

    /// Prepend `event` to the history.
    ///
    /// Stored entries that do not read back as events are carried over
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be read or written.
    pub fn push(&self, event: ScanEvent) -> Result<()> {
        let mut entries = self.stored_entries()?;
        entries.insert(0, serde_json::to_value(event)?);
        if let Some(max) = self.max_entries {
            if entries.len() > max {
                debug!("Dropping {} old events over cap {}", entries.len() - max, max);
                entries.truncate(max);
            }
        }
        self.write(&entries)
    }

    /// All events, most recent first.
    ///
    /// Entries that are not valid events are skipped with a warning. A stored
    /// value that is not a JSON array is treated as an empty history.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list(&self) -> Result<Vec<ScanEvent>> {
        let events = self
            .stored_entries()?
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value(entry) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(key = %self.key, index, error = %e, "Skipping unreadable history entry");
                    None
                }
            })
            .collect();
        Ok(events)
    }

    /// Remove every event.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn clear(&self) -> Result<()> {
        if self.storage.remove_item(&self.key)? {
            info!("Cleared scan history");
        }
        Ok(())
    }

    /// Number of stored events.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn len(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }

    /// Check if the history is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Summary statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<HistoryStats> {
        let events = self.list()?;
        Ok(HistoryStats {
            total_events: events.len(),
            matched_events: events.iter().filter(|e| e.is_match()).count(),
            newest_event: events.first().and_then(ScanEvent::parsed_timestamp),
            oldest_event: events.last().and_then(ScanEvent::parsed_timestamp),
            db_size_bytes: self.storage.size_bytes(),
        })
    }

    fn stored_entries(&self) -> Result<Vec<Value>> {
        let Some(json) = self.storage.get_item(&self.key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&json) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Stored history is unreadable, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    fn write(&self, entries: &[Value]) -> Result<()> {
        let json = serde_json::to_string(entries)?;
        self.storage.set_item(&self.key, &json)
    }
}

/// Statistics about the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    /// Total number of events.
    pub total_events: usize,
    /// Events that found a record.
    pub matched_events: usize,
    /// Timestamp of the newest event.
    pub newest_event: Option<DateTime<Utc>>,
    /// Timestamp of the oldest event.
    pub oldest_event: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::resolver::resolve;
    use chrono::TimeZone;

    fn create_test_history() -> HistoryLog {
        HistoryLog::open_in_memory().expect("failed to create test history")
    }

    fn catalog() -> Catalog {
        Catalog::from_json_str(
            r#"{"ABC": {"name": "Alpine Blanc", "region": "Savoie", "variety": "Jacquère"}}"#,
        )
        .unwrap()
    }

    fn event(label: &str) -> ScanEvent {
        ScanEvent {
            timestamp: "2024-05-01T12:00:00.000Z".to_string(),
            raw_content: label.to_string(),
            matched_name: String::new(),
            matched_region: String::new(),
            matched_variety: String::new(),
        }
    }

    #[test]
    fn test_event_from_matched_resolution() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let res = resolve("wine:ABC", &catalog());
        let event = ScanEvent::from_resolution(&res, at);

        assert_eq!(event.timestamp, "2024-05-01T12:30:00.000Z");
        assert_eq!(event.raw_content, "wine:ABC");
        assert_eq!(event.matched_name, "Alpine Blanc");
        assert_eq!(event.matched_region, "Savoie");
        assert_eq!(event.matched_variety, "Jacquère");
        assert!(event.is_match());
    }

    #[test]
    fn test_event_from_unmatched_resolution() {
        let res = resolve("wine:NOPE", &catalog());
        let event = ScanEvent::from_resolution(&res, Utc::now());

        assert_eq!(event.raw_content, "wine:NOPE");
        assert!(event.matched_name.is_empty());
        assert!(event.matched_region.is_empty());
        assert!(event.matched_variety.is_empty());
        assert!(!event.is_match());
    }

    #[test]
    fn test_event_json_field_names() {
        let json = serde_json::to_string(&event("x")).unwrap();
        assert_eq!(
            json,
            r#"{"ts":"2024-05-01T12:00:00.000Z","content":"x","name":"","region":"","variety":""}"#
        );
    }

    #[test]
    fn test_event_missing_match_fields_default() {
        let event: ScanEvent =
            serde_json::from_str(r#"{"ts":"2024-05-01T12:00:00.000Z","content":"x"}"#).unwrap();
        assert!(event.matched_name.is_empty());
    }

    #[test]
    fn test_local_time_falls_back_to_raw() {
        let mut e = event("x");
        e.timestamp = "yesterday".to_string();
        assert_eq!(e.local_time(), "yesterday");
        assert!(e.parsed_timestamp().is_none());
    }

    #[test]
    fn test_local_time_formats_valid_timestamp() {
        let local = event("x").local_time();
        // Exact value depends on the local zone; the shape does not
        assert_eq!(local.len(), "2024-05-01 12:00:00".len());
        assert!(local.starts_with("2024-"));
    }

    #[test]
    fn test_empty_history() {
        let history = create_test_history();
        assert!(history.list().unwrap().is_empty());
        assert!(history.is_empty().unwrap());
    }

    #[test]
    fn test_events_read_back_most_recent_first() {
        let history = create_test_history();
        for i in 0..5 {
            history.push(event(&format!("payload {i}"))).unwrap();
        }

        let events = history.list().unwrap();
        let labels: Vec<&str> = events.iter().map(|e| e.raw_content.as_str()).collect();
        assert_eq!(
            labels,
            vec!["payload 4", "payload 3", "payload 2", "payload 1", "payload 0"]
        );
    }

    #[test]
    fn test_record_logs_matched_and_unmatched() {
        let history = create_test_history();
        let catalog = catalog();

        history.record(&resolve("alpine", &catalog)).unwrap();
        history.record(&resolve("syrah", &catalog)).unwrap();

        let events = history.list().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].raw_content, "syrah");
        assert!(!events[0].is_match());
        assert_eq!(events[1].raw_content, "keyword:alpine");
        assert_eq!(events[1].matched_name, "Alpine Blanc");
    }

    #[test]
    fn test_clear_removes_everything() {
        let history = create_test_history();
        history.push(event("a")).unwrap();
        history.push(event("b")).unwrap();

        history.clear().unwrap();
        assert!(history.is_empty().unwrap());
        // Clearing an empty history is fine
        history.clear().unwrap();
    }

    #[test]
    fn test_max_entries_drops_oldest() {
        let history = create_test_history().with_max_entries(Some(2));
        history.push(event("a")).unwrap();
        history.push(event("b")).unwrap();
        history.push(event("c")).unwrap();

        let labels: Vec<String> = history
            .list()
            .unwrap()
            .into_iter()
            .map(|e| e.raw_content)
            .collect();
        assert_eq!(labels, vec!["c".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_unreadable_value_treated_as_empty() {
        let history = create_test_history();
        history.storage().set_item(history.key(), "{oops").unwrap();

        assert!(history.list().unwrap().is_empty());
        history.push(event("fresh")).unwrap();
        assert_eq!(history.len().unwrap(), 1);
    }

    #[test]
    fn test_null_match_fields_read_as_empty() {
        let event: ScanEvent = serde_json::from_str(
            r#"{"ts":"2024-05-01T12:00:00.000Z","content":"b","name":null,"region":null,"variety":null}"#,
        )
        .unwrap();
        assert_eq!(event.raw_content, "b");
        assert!(!event.is_match());
    }

    #[test]
    fn test_record_keeps_earlier_entries() {
        let history = create_test_history();
        history
            .storage()
            .set_item(
                history.key(),
                r#"[
                    {"ts":"2024-05-01T12:00:00.000Z","content":"a","name":"A","region":"","variety":""},
                    {"ts":"2024-05-01T11:00:00.000Z","content":"b","name":null,"region":null,"variety":null}
                ]"#,
            )
            .unwrap();

        history.record(&resolve("new", &catalog())).unwrap();

        let labels: Vec<String> = history
            .list()
            .unwrap()
            .into_iter()
            .map(|e| e.raw_content)
            .collect();
        assert_eq!(labels, vec!["new", "a", "b"]);
    }

    #[test]
    fn test_unreadable_entry_skipped_but_kept() {
        let history = create_test_history();
        history
            .storage()
            .set_item(
                history.key(),
                r#"[{"ts":"2024-05-01T12:00:00.000Z","content":"a"}, {"content": 42}]"#,
            )
            .unwrap();

        assert_eq!(history.len().unwrap(), 1);
        history.push(event("fresh")).unwrap();

        let events = history.list().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].raw_content, "fresh");
        assert_eq!(events[1].raw_content, "a");

        let stored: Vec<Value> =
            serde_json::from_str(&history.storage().get_item(history.key()).unwrap().unwrap())
                .unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[2]["content"], 42);
    }

    #[test]
    fn test_custom_key_is_isolated() {
        let storage = Storage::open_in_memory().unwrap();
        storage.set_item("scanHistory", "[]").unwrap();
        let history = HistoryLog::new(storage, "otherHistory");

        history.push(event("x")).unwrap();
        assert_eq!(history.key(), "otherHistory");
        assert_eq!(
            history.storage().get_item("scanHistory").unwrap().as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn test_stats() {
        let history = create_test_history();
        let catalog = catalog();
        assert_eq!(history.stats().unwrap().total_events, 0);

        history.record(&resolve("wine:ABC", &catalog)).unwrap();
        history.record(&resolve("wine:NOPE", &catalog)).unwrap();

        let stats = history.stats().unwrap();
        assert_eq!(stats.total_events, 2);
        assert_eq!(stats.matched_events, 1);
        assert!(stats.newest_event.is_some());
        assert!(stats.oldest_event.is_some());
        assert!(stats.newest_event >= stats.oldest_event);
    }
}
