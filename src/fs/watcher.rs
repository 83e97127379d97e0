//! Debounced single-file watcher.
//!
//! A background task owns the platform notification handle and the debounce
//! deadline. The rest of the application talks to it only through
//! [`FileWatcher`]: `watch`, `unwatch`, `close`, and `next_event`, which
//! drains the two bounded outbound queues.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{AppError, Result};

/// Default debounce interval in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Capacity of the outbound event and error queues.
pub const QUEUE_CAPACITY: usize = 10;

type RawEvent = notify::Result<notify::Event>;

/// A settled notification delivered to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Changed(PathBuf),
    Error(String),
}

/// Low-level watch registration, split out so the actor can run without a
/// real notification backend.
pub(crate) trait WatchBackend: Send {
    fn watch(&mut self, path: &Path) -> notify::Result<()>;
    fn unwatch(&mut self, path: &Path) -> notify::Result<()>;
}

/// Watches the file's parent directory so saves that replace the file
/// (write to temp, rename over) are still seen.
struct NotifyBackend {
    watcher: notify::RecommendedWatcher,
}

impl NotifyBackend {
    fn target(path: &Path) -> &Path {
        path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(path)
    }
}

impl WatchBackend for NotifyBackend {
    fn watch(&mut self, path: &Path) -> notify::Result<()> {
        if !path.exists() {
            return Err(notify::Error::path_not_found().add_path(path.to_path_buf()));
        }
        self.watcher
            .watch(Self::target(path), RecursiveMode::NonRecursive)
    }

    fn unwatch(&mut self, path: &Path) -> notify::Result<()> {
        self.watcher.unwatch(Self::target(path))
    }
}

enum WatchCommand {
    Watch {
        path: PathBuf,
        reply: oneshot::Sender<notify::Result<()>>,
    },
    Unwatch,
    Close,
}

struct Outbound {
    events: mpsc::Receiver<PathBuf>,
    errors: mpsc::Receiver<String>,
}

/// Handle to the watcher task. Cheap to clone; all clones talk to one task.
#[derive(Clone)]
pub struct FileWatcher {
    commands: mpsc::UnboundedSender<WatchCommand>,
    outbound: Arc<tokio::sync::Mutex<Outbound>>,
    watched: Arc<Mutex<Option<PathBuf>>>,
}

impl FileWatcher {
    /// Start the watcher task with the platform notification backend.
    pub fn new(debounce: Duration) -> Result<Self> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<RawEvent>();
        let watcher = notify::recommended_watcher(move |res: RawEvent| {
            let _ = raw_tx.send(res);
        })?;
        Ok(Self::spawn(
            Box::new(NotifyBackend { watcher }),
            raw_rx,
            debounce,
        ))
    }

    pub(crate) fn spawn(
        backend: Box<dyn WatchBackend>,
        raw_rx: mpsc::UnboundedReceiver<RawEvent>,
        debounce: Duration,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::channel(QUEUE_CAPACITY);
        let (errors_tx, errors) = mpsc::channel(QUEUE_CAPACITY);
        let watched = Arc::new(Mutex::new(None));

        let actor = WatchActor {
            backend,
            current: None,
            deadline: None,
            debounce,
            events_tx,
            errors_tx,
            watched: watched.clone(),
        };
        tokio::spawn(actor.run(command_rx, raw_rx));

        Self {
            commands,
            outbound: Arc::new(tokio::sync::Mutex::new(Outbound { events, errors })),
            watched,
        }
    }

    /// Watch `path`, replacing any previous watch.
    pub async fn watch(&self, path: &Path) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(WatchCommand::Watch {
                path: path.to_path_buf(),
                reply,
            })
            .map_err(|_| closed())?;
        response.await.map_err(|_| closed())??;
        Ok(())
    }

    /// Stop watching the current path, if any.
    pub fn unwatch(&self) {
        let _ = self.commands.send(WatchCommand::Unwatch);
    }

    /// Stop the background task and release the notification handle.
    pub fn close(&self) {
        let _ = self.commands.send(WatchCommand::Close);
    }

    /// The path currently being watched.
    pub fn watched_path(&self) -> Option<PathBuf> {
        self.watched.lock().ok().and_then(|guard| guard.clone())
    }

    /// Wait for the next settled change or backend error.
    ///
    /// Returns `None` once the watcher has shut down. Callers re-issue this
    /// after every delivery to keep receiving changes.
    pub async fn next_event(&self) -> Option<WatchEvent> {
        let mut guard = self.outbound.lock().await;
        let Outbound { events, errors } = &mut *guard;
        tokio::select! {
            Some(path) = events.recv() => Some(WatchEvent::Changed(path)),
            Some(err) = errors.recv() => Some(WatchEvent::Error(err)),
            else => None,
        }
    }
}

fn closed() -> AppError {
    AppError::Watch(notify::Error::generic("watcher is closed"))
}

/// Only content writes and (re)creation of the file count as a change.
fn is_write_or_create(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(
                RenameMode::To | RenameMode::Both | RenameMode::Any
            ))
    )
}

struct WatchActor {
    backend: Box<dyn WatchBackend>,
    current: Option<PathBuf>,
    deadline: Option<Instant>,
    debounce: Duration,
    events_tx: mpsc::Sender<PathBuf>,
    errors_tx: mpsc::Sender<String>,
    watched: Arc<Mutex<Option<PathBuf>>>,
}

impl WatchActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<WatchCommand>,
        mut raw: mpsc::UnboundedReceiver<RawEvent>,
    ) {
        loop {
            let deadline = self.deadline;
            let timer = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                command = commands.recv() => match command {
                    Some(WatchCommand::Watch { path, reply }) => {
                        let result = self.switch_to(path);
                        let _ = reply.send(result);
                    }
                    Some(WatchCommand::Unwatch) => self.release(),
                    Some(WatchCommand::Close) | None => break,
                },
                event = raw.recv() => match event {
                    Some(Ok(event)) => self.observe(&event),
                    Some(Err(err)) => {
                        warn!(error = %err, "watch backend error");
                        if self.errors_tx.try_send(err.to_string()).is_err() {
                            debug!("error queue full, dropping watch error");
                        }
                    }
                    None => break,
                },
                _ = timer => self.fire(),
            }
        }

        self.release();
        debug!("watcher stopped");
    }

    fn switch_to(&mut self, path: PathBuf) -> notify::Result<()> {
        self.release();
        self.backend.watch(&path)?;
        debug!(path = %path.display(), "watching");
        self.set_current(Some(path));
        Ok(())
    }

    fn release(&mut self) {
        self.deadline = None;
        if let Some(old) = self.current.take() {
            if let Err(e) = self.backend.unwatch(&old) {
                debug!(path = %old.display(), error = %e, "unwatch failed");
            }
            self.set_current(None);
        }
    }

    fn set_current(&mut self, path: Option<PathBuf>) {
        self.current = path.clone();
        if let Ok(mut guard) = self.watched.lock() {
            *guard = path;
        }
    }

    fn observe(&mut self, event: &notify::Event) {
        let Some(current) = &self.current else {
            return;
        };
        if is_write_or_create(&event.kind) && event.paths.iter().any(|p| p == current) {
            self.deadline = Some(Instant::now() + self.debounce);
        }
    }

    fn fire(&mut self) {
        self.deadline = None;
        if let Some(path) = &self.current {
            if self.events_tx.try_send(path.clone()).is_err() {
                debug!(path = %path.display(), "event queue full, dropping change");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind};

    #[derive(Clone, Default)]
    struct RecordingBackend {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl WatchBackend for RecordingBackend {
        fn watch(&mut self, path: &Path) -> notify::Result<()> {
            if path.ends_with("missing.md") {
                return Err(notify::Error::path_not_found());
            }
            self.log
                .lock()
                .unwrap()
                .push(format!("watch {}", path.display()));
            Ok(())
        }

        fn unwatch(&mut self, path: &Path) -> notify::Result<()> {
            self.log
                .lock()
                .unwrap()
                .push(format!("unwatch {}", path.display()));
            Ok(())
        }
    }

    fn setup() -> (
        FileWatcher,
        mpsc::UnboundedSender<RawEvent>,
        Arc<Mutex<Vec<String>>>,
    ) {
        let backend = RecordingBackend::default();
        let log = backend.log.clone();
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let watcher = FileWatcher::spawn(
            Box::new(backend),
            raw_rx,
            Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        );
        (watcher, raw_tx, log)
    }

    fn write_event(path: &str) -> RawEvent {
        Ok(
            notify::Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
                .add_path(PathBuf::from(path)),
        )
    }

    async fn next_within_a_second(watcher: &FileWatcher) -> Option<WatchEvent> {
        tokio::time::timeout(Duration::from_secs(1), watcher.next_event())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_writes_yields_one_event() {
        let (watcher, raw_tx, _) = setup();
        watcher.watch(Path::new("/docs/a.md")).await.unwrap();

        for _ in 0..5 {
            raw_tx.send(write_event("/docs/a.md")).unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(
            next_within_a_second(&watcher).await,
            Some(WatchEvent::Changed(PathBuf::from("/docs/a.md")))
        );
        assert_eq!(next_within_a_second(&watcher).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn separate_quiet_periods_yield_separate_events() {
        let (watcher, raw_tx, _) = setup();
        watcher.watch(Path::new("/docs/a.md")).await.unwrap();

        raw_tx.send(write_event("/docs/a.md")).unwrap();
        assert!(next_within_a_second(&watcher).await.is_some());
        raw_tx.send(write_event("/docs/a.md")).unwrap();
        assert!(next_within_a_second(&watcher).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn other_paths_yield_nothing() {
        let (watcher, raw_tx, _) = setup();
        watcher.watch(Path::new("/docs/a.md")).await.unwrap();
        raw_tx.send(write_event("/docs/other.md")).unwrap();
        assert_eq!(next_within_a_second(&watcher).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn metadata_only_changes_are_ignored() {
        let (watcher, raw_tx, _) = setup();
        watcher.watch(Path::new("/docs/a.md")).await.unwrap();
        let touch = notify::Event::new(EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::AccessTime,
        )))
        .add_path(PathBuf::from("/docs/a.md"));
        raw_tx.send(Ok(touch)).unwrap();
        assert_eq!(next_within_a_second(&watcher).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn create_counts_as_change() {
        let (watcher, raw_tx, _) = setup();
        watcher.watch(Path::new("/docs/a.md")).await.unwrap();
        let create = notify::Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/docs/a.md"));
        raw_tx.send(Ok(create)).unwrap();
        assert!(next_within_a_second(&watcher).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn switching_files_watches_only_the_latest() {
        let (watcher, raw_tx, log) = setup();
        watcher.watch(Path::new("/docs/a.md")).await.unwrap();
        watcher.watch(Path::new("/docs/b.md")).await.unwrap();

        assert_eq!(watcher.watched_path(), Some(PathBuf::from("/docs/b.md")));
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "watch /docs/a.md".to_string(),
                "unwatch /docs/a.md".to_string(),
                "watch /docs/b.md".to_string(),
            ]
        );

        raw_tx.send(write_event("/docs/a.md")).unwrap();
        assert_eq!(next_within_a_second(&watcher).await, None);
        raw_tx.send(write_event("/docs/b.md")).unwrap();
        assert_eq!(
            next_within_a_second(&watcher).await,
            Some(WatchEvent::Changed(PathBuf::from("/docs/b.md")))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn switching_cancels_pending_change() {
        let (watcher, raw_tx, _) = setup();
        watcher.watch(Path::new("/docs/a.md")).await.unwrap();
        raw_tx.send(write_event("/docs/a.md")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        watcher.watch(Path::new("/docs/b.md")).await.unwrap();
        assert_eq!(next_within_a_second(&watcher).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_watch_reports_error_and_clears_path() {
        let (watcher, _raw_tx, _) = setup();
        watcher.watch(Path::new("/docs/a.md")).await.unwrap();
        let result = watcher.watch(Path::new("/docs/missing.md")).await;
        assert!(matches!(result, Err(AppError::Watch(_))));
        assert_eq!(watcher.watched_path(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn backend_errors_are_forwarded() {
        let (watcher, raw_tx, _) = setup();
        raw_tx
            .send(Err(notify::Error::generic("queue overflow")))
            .unwrap();
        match next_within_a_second(&watcher).await {
            Some(WatchEvent::Error(msg)) => assert!(msg.contains("queue overflow")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_drops_instead_of_blocking() {
        let (watcher, raw_tx, _) = setup();
        watcher.watch(Path::new("/docs/a.md")).await.unwrap();
        for _ in 0..QUEUE_CAPACITY + 5 {
            raw_tx.send(write_event("/docs/a.md")).unwrap();
            tokio::time::sleep(Duration::from_millis(DEFAULT_DEBOUNCE_MS * 2)).await;
        }
        let mut delivered = 0;
        while next_within_a_second(&watcher).await.is_some() {
            delivered += 1;
        }
        assert_eq!(delivered, QUEUE_CAPACITY);
    }

    #[tokio::test(start_paused = true)]
    async fn close_stops_delivery() {
        let (watcher, raw_tx, log) = setup();
        watcher.watch(Path::new("/docs/a.md")).await.unwrap();
        watcher.close();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let _ = raw_tx.send(write_event("/docs/a.md"));
        assert_eq!(watcher.next_event().await, None);
        assert!(log
            .lock()
            .unwrap()
            .contains(&"unwatch /docs/a.md".to_string()));
        assert!(watcher.watch(Path::new("/docs/b.md")).await.is_err());
    }
}
