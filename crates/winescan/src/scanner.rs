//! Scan sources.
//!
//! A scan source stands in for a camera plus code reader: once started it
//! pushes one [`DecodeEvent`] per frame through a channel. The only source
//! shipped here, [`LineSource`], reads payloads that were already decoded
//! by an external tool, one per line.

use std::path::PathBuf;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

/// Default channel depth between a source and its session.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Outcome of decoding one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// A code was found; carries its text.
    Decoded(String),
    /// The frame contained no code.
    NotFound,
    /// Decoding failed for a reason other than "no code".
    Failed(String),
}

impl DecodeEvent {
    /// Interpret one input line. Blank lines are empty frames.
    #[must_use]
    pub fn from_line(line: &str) -> Self {
        let text = line.trim();
        if text.is_empty() {
            Self::NotFound
        } else {
            Self::Decoded(text.to_string())
        }
    }
}

/// A selectable input device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Identifier passed to [`ScanSource::start`].
    pub id: String,
    /// Human-readable label.
    pub label: String,
}

/// Scanning state of a session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScannerState {
    /// Not scanning.
    #[default]
    Idle,
    /// Scanning with the given device, `None` for the source default.
    Scanning {
        /// Selected device.
        device: Option<String>,
    },
}

impl ScannerState {
    /// Check if a scan is in progress.
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        matches!(self, Self::Scanning { .. })
    }
}

/// A producer of decode events.
#[async_trait::async_trait]
pub trait ScanSource: Send {
    /// The name of this source (for logging/debugging).
    fn name(&self) -> &'static str;

    /// List the devices this source can read from.
    ///
    /// # Errors
    ///
    /// Returns an error if devices cannot be enumerated.
    fn list_devices(&self) -> Result<Vec<Device>>;

    /// Devices this source can read from. Enumeration failures are logged
    /// and yield an empty list.
    fn available_devices(&self) -> Vec<Device> {
        self.list_devices().unwrap_or_else(|e| {
            warn!(source = self.name(), error = %e, "Could not list devices");
            Vec::new()
        })
    }

    /// Acquire `device` (or the default one) and begin sending events.
    ///
    /// The channel closes when the source runs out of input or is stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be acquired.
    async fn start(&mut self, device: Option<&str>, tx: mpsc::Sender<DecodeEvent>) -> Result<()>;

    /// Stop sending events and release the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails to stop cleanly.
    fn stop(&mut self) -> Result<()>;

    /// Check if the source is currently producing events.
    fn is_running(&self) -> bool;
}

/// Where a [`LineSource`] reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineInput {
    /// Standard input.
    Stdin,
    /// A file on disk.
    File(PathBuf),
    /// Fixed text, mostly for tests.
    Text(String),
}

impl LineInput {
    fn device(&self) -> Device {
        match self {
            Self::Stdin => Device {
                id: "stdin".to_string(),
                label: "Standard input".to_string(),
            },
            Self::File(path) => Device {
                id: path.display().to_string(),
                label: path.file_name().map_or_else(
                    || path.display().to_string(),
                    |name| name.to_string_lossy().into_owned(),
                ),
            },
            Self::Text(_) => Device {
                id: "text".to_string(),
                label: "Inline text".to_string(),
            },
        }
    }
}

/// Reads decoded payloads line by line.
#[derive(Debug)]
pub struct LineSource {
    input: LineInput,
    task: Option<JoinHandle<()>>,
}

impl LineSource {
    /// Create a source for `input`.
    #[must_use]
    pub fn new(input: LineInput) -> Self {
        Self { input, task: None }
    }

    /// Create a source reading standard input.
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(LineInput::Stdin)
    }

    async fn open(&self) -> Result<Box<dyn AsyncBufRead + Send + Unpin>> {
        match &self.input {
            LineInput::Stdin => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
            LineInput::File(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|e| {
                    Error::source_start(self.name(), format!("{}: {e}", path.display()))
                })?;
                Ok(Box::new(BufReader::new(file)))
            }
            LineInput::Text(text) => Ok(Box::new(std::io::Cursor::new(text.clone().into_bytes()))),
        }
    }
}

#[async_trait::async_trait]
impl ScanSource for LineSource {
    fn name(&self) -> &'static str {
        "lines"
    }

    fn list_devices(&self) -> Result<Vec<Device>> {
        if let LineInput::File(path) = &self.input {
            if !path.is_file() {
                return Err(Error::device_list(
                    self.name(),
                    format!("{} is not a readable file", path.display()),
                ));
            }
        }
        Ok(vec![self.input.device()])
    }

    async fn start(&mut self, device: Option<&str>, tx: mpsc::Sender<DecodeEvent>) -> Result<()> {
        if self.is_running() {
            return Err(Error::source_start(self.name(), "already running"));
        }

        let expected = self.input.device();
        if let Some(requested) = device {
            if requested != expected.id {
                return Err(Error::source_start(
                    self.name(),
                    format!("unknown device '{requested}'"),
                ));
            }
        }

        let reader = self.open().await?;
        debug!(device = %expected.id, "Line source started");
        self.task = Some(tokio::spawn(pump_lines(reader, tx)));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Line source stopped");
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

async fn pump_lines(reader: Box<dyn AsyncBufRead + Send + Unpin>, tx: mpsc::Sender<DecodeEvent>) {
    let mut lines = reader.lines();
    loop {
        let event = match lines.next_line().await {
            Ok(Some(line)) => DecodeEvent::from_line(&line),
            Ok(None) => break,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                DecodeEvent::Failed(e.to_string())
            }
            Err(e) => {
                // Unrecoverable; report once and end the stream
                let _ = tx.send(DecodeEvent::Failed(e.to_string())).await;
                break;
            }
        };
        trace!(?event, "Decode event");
        if tx.send(event).await.is_err() {
            break;
        }
    }
}
