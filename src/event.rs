use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, MouseEvent};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::fs::tree::TreeNode;

/// Outcome of a background root scan.
#[derive(Debug)]
pub struct ScanResult {
    /// Top-level rows of the new tree.
    pub roots: Vec<TreeNode>,
    /// Number of Markdown files under the root, for the header.
    pub file_count: usize,
}

/// Everything the session reacts to: terminal input plus completions of
/// background work.
#[derive(Debug)]
pub enum Event {
    /// A key press event.
    Key(KeyEvent),
    /// A mouse event.
    Mouse(MouseEvent),
    /// Terminal resize event.
    Resize(u16, u16),
    /// A periodic tick for rendering.
    Tick,
    /// A root scan finished.
    ScanComplete(std::result::Result<ScanResult, String>),
    /// A file read finished.
    FileLoaded {
        path: PathBuf,
        content: std::result::Result<String, String>,
    },
    /// The watcher is now watching `path`.
    WatchStarted(PathBuf),
    /// The watched file settled after a change.
    FileChanged(PathBuf),
    /// The watcher could not start watching `path`; nothing is watched now.
    WatchFailed { path: PathBuf, message: String },
    /// The watcher backend reported a failure while waiting for changes.
    WatchError(String),
}

/// Async event handler that polls crossterm events and forwards them via a channel.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    tx: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    /// Create a new EventHandler with the given tick rate.
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::task::spawn_blocking(move || loop {
            let event = if event::poll(tick_rate).unwrap_or(false) {
                match event::read() {
                    Ok(CrosstermEvent::Key(key)) => Event::Key(key),
                    Ok(CrosstermEvent::Mouse(mouse)) => Event::Mouse(mouse),
                    Ok(CrosstermEvent::Resize(w, h)) => Event::Resize(w, h),
                    _ => continue,
                }
            } else {
                Event::Tick
            };
            if event_tx.send(event).is_err() {
                break;
            }
        });

        Self { rx, tx }
    }

    /// Sender for background tasks to report completions.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Receive the next event (blocks until available).
    pub async fn next(&mut self) -> Result<Event> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| crate::error::AppError::Terminal("Event channel closed".into()))
    }
}
