//! `winescan` - Look up wines from scanned QR codes
//!
//! This library resolves decoded QR payloads against a static wine catalog,
//! keeps a persisted history of every scan attempt, and exports it as CSV.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod logging;
pub mod resolver;
pub mod scanner;
pub mod session;
pub mod storage;
pub mod view;

pub use catalog::{Catalog, ItemRecord};
pub use config::Config;
pub use error::{Error, Result};
pub use history::{HistoryLog, HistoryStats, ScanEvent};
pub use logging::init_logging;
pub use resolver::{resolve, MatchTier, Resolution};
pub use scanner::{DecodeEvent, Device, LineInput, LineSource, ScanSource, ScannerState};
pub use session::{AppState, ScanSession, SessionUpdate};
pub use storage::Storage;
pub use view::{HistoryRow, RecordView};
