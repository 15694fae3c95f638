//! Application state and the scan controller.
//!
//! [`AppState`] owns the catalog and the history and turns payloads into
//! logged resolutions. [`ScanSession`] adds a scan source, the start/stop
//! state and a redraw throttle on top of it.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::history::HistoryLog;
use crate::resolver::{resolve, Resolution};
use crate::scanner::{DecodeEvent, Device, ScanSource, ScannerState, EVENT_CHANNEL_CAPACITY};

/// Catalog plus history.
#[derive(Debug)]
pub struct AppState {
    catalog: Catalog,
    history: HistoryLog,
}

impl AppState {
    /// Create the state from a loaded catalog and an open history.
    #[must_use]
    pub fn new(catalog: Catalog, history: HistoryLog) -> Self {
        Self { catalog, history }
    }

    /// The catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The history log.
    #[must_use]
    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Resolve `payload` and record the attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be written.
    pub fn handle_payload(&self, payload: &str) -> Result<Resolution> {
        let resolution = resolve(payload, &self.catalog);
        self.history.record(&resolution)?;
        Ok(resolution)
    }

    /// Handle text typed by hand. Surrounding whitespace is ignored and
    /// empty input does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be written.
    pub fn submit_manual(&self, text: &str) -> Result<Option<Resolution>> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring empty manual input");
            return Ok(None);
        }
        self.handle_payload(text).map(Some)
    }
}

/// Timestamp gate limiting how often a redraw may happen.
#[derive(Debug, Clone)]
pub struct RedrawThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl RedrawThrottle {
    /// Allow at most one redraw per `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns `true` and marks the redraw if enough time passed since the last one.
    pub fn should_redraw(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.interval {
                return false;
            }
        }
        self.last = Some(now);
        true
    }

    /// Forget the last redraw.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// What a decode event produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionUpdate {
    /// The resolution, when a code was decoded.
    pub resolution: Option<Resolution>,
    /// Whether the overlay should be refreshed.
    pub redraw: bool,
}

/// A scanning session driven by decode events.
#[derive(Debug)]
pub struct ScanSession<S> {
    app: AppState,
    source: S,
    state: ScannerState,
    selected_device: Option<String>,
    events: Option<mpsc::Receiver<DecodeEvent>>,
    throttle: RedrawThrottle,
    decoded_count: u64,
}

impl<S: ScanSource> ScanSession<S> {
    /// Create an idle session.
    #[must_use]
    pub fn new(app: AppState, source: S, redraw_interval: Duration) -> Self {
        Self {
            app,
            source,
            state: ScannerState::Idle,
            selected_device: None,
            events: None,
            throttle: RedrawThrottle::new(redraw_interval),
            decoded_count: 0,
        }
    }

    /// The application state.
    #[must_use]
    pub fn app(&self) -> &AppState {
        &self.app
    }

    /// Current scanning state.
    #[must_use]
    pub fn state(&self) -> &ScannerState {
        &self.state
    }

    /// The device used when `start` is called without one.
    #[must_use]
    pub fn selected_device(&self) -> Option<&str> {
        self.selected_device.as_deref()
    }

    /// Number of payloads decoded since the session was created.
    #[must_use]
    pub fn decoded_count(&self) -> u64 {
        self.decoded_count
    }

    /// Devices offered by the source. Enumeration failures yield an empty list.
    #[must_use]
    pub fn devices(&self) -> Vec<Device> {
        self.source.available_devices()
    }

    /// Start scanning with `device`, or the selected device if `None`.
    ///
    /// Does nothing if a scan is already running.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be acquired; the session is
    /// back to idle in that case.
    pub async fn start(&mut self, device: Option<&str>) -> Result<()> {
        if self.state.is_scanning() {
            debug!("Start requested while scanning, ignoring");
            return Ok(());
        }

        let device = device
            .map(str::to_owned)
            .or_else(|| self.selected_device.clone());
        self.state = ScannerState::Scanning {
            device: device.clone(),
        };

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        if let Err(e) = self.source.start(device.as_deref(), tx).await {
            self.state = ScannerState::Idle;
            return Err(e);
        }

        info!(
            source = self.source.name(),
            device = device.as_deref().unwrap_or("default"),
            "Scanning started"
        );
        self.selected_device = device;
        self.events = Some(rx);
        Ok(())
    }

    /// Stop scanning and release the source. Stopping an idle session is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails to stop cleanly.
    pub fn stop(&mut self) -> Result<()> {
        if !self.state.is_scanning() {
            return Ok(());
        }
        self.state = ScannerState::Idle;
        self.events = None;
        self.throttle.reset();
        self.source.stop()?;
        info!("Scanning stopped");
        Ok(())
    }

    /// Change the selected device, restarting the scan if one is running.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be stopped or re-acquired.
    pub async fn switch_device(&mut self, device: &str) -> Result<()> {
        if self.state.is_scanning() {
            self.stop()?;
            self.start(Some(device)).await
        } else {
            self.selected_device = Some(device.to_string());
            Ok(())
        }
    }

    /// Wait for the next decode event.
    ///
    /// Returns `None` once the source has closed its channel, at which point
    /// the session is idle again.
    pub async fn next_event(&mut self) -> Option<DecodeEvent> {
        let event = match self.events.as_mut() {
            Some(rx) => rx.recv().await,
            None => return None,
        };
        if event.is_none() {
            debug!("Scan source closed");
            if let Err(e) = self.stop() {
                warn!(error = %e, "Failed to release scan source");
            }
        }
        event
    }

    /// Apply one decode event at time `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if a decoded payload cannot be recorded.
    pub fn on_decode(&mut self, event: DecodeEvent, now: Instant) -> Result<SessionUpdate> {
        match event {
            DecodeEvent::Decoded(text) => {
                let redraw = self.throttle.should_redraw(now);
                let resolution = self.app.handle_payload(&text)?;
                self.decoded_count += 1;
                Ok(SessionUpdate {
                    resolution: Some(resolution),
                    redraw,
                })
            }
            DecodeEvent::NotFound => {
                let redraw = self.throttle.should_redraw(now);
                trace!(redraw, "Empty frame");
                Ok(SessionUpdate {
                    resolution: None,
                    redraw,
                })
            }
            DecodeEvent::Failed(message) => {
                warn!(error = %message, "Decode error");
                Ok(SessionUpdate::default())
            }
        }
    }
}
