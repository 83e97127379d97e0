//! The event loop: draws, feeds events to the session and runs the
//! commands it returns as background tasks.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::app::{App, Command};
use crate::error::{AppError, Result};
use crate::event::{Event, EventHandler, ScanResult};
use crate::fs::scanner;
use crate::fs::watcher::{FileWatcher, WatchEvent};
use crate::tui::Tui;
use crate::ui;

const TICK_RATE: Duration = Duration::from_millis(250);

/// Run the session until it asks to quit.
pub async fn run(mut app: App, tui: &mut Tui, watcher: Option<FileWatcher>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);
    let tx = events.sender();

    let size = tui.terminal_mut().size()?;
    app.resize(size.width, size.height);
    for command in app.start() {
        execute(command, &tx, watcher.as_ref());
    }

    loop {
        tui.terminal_mut().draw(|frame| ui::render(&mut app, frame))?;

        let event = events.next().await?;
        for command in app.handle_event(event) {
            execute(command, &tx, watcher.as_ref());
        }

        if app.should_quit {
            break;
        }
    }

    info!("session ended");
    Ok(())
}

/// Start one command. Everything except `Quit` runs on its own task and
/// reports back through `tx`.
pub fn execute(command: Command, tx: &UnboundedSender<Event>, watcher: Option<&FileWatcher>) {
    match command {
        Command::ScanRoot { root, policy } => {
            let tx = tx.clone();
            tokio::spawn(async move {
                let scan = tokio::task::spawn_blocking(move || {
                    let roots = scanner::scan_directory(&root, &policy)?;
                    let file_count = scanner::count_relevant_files(&root, &policy);
                    Ok::<_, AppError>(ScanResult { roots, file_count })
                })
                .await;
                let result = match scan {
                    Ok(Ok(scan)) => Ok(scan),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(e) => Err(format!("scan task failed: {e}")),
                };
                let _ = tx.send(Event::ScanComplete(result));
            });
        }
        Command::LoadFile(path) => {
            let tx = tx.clone();
            tokio::spawn(async move {
                let content = tokio::fs::read_to_string(&path).await.map_err(|source| {
                    AppError::Load {
                        path: path.clone(),
                        source,
                    }
                    .to_string()
                });
                let _ = tx.send(Event::FileLoaded { path, content });
            });
        }
        Command::StartWatching(path) => {
            let Some(watcher) = watcher.cloned() else {
                return;
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                let event = match watcher.watch(&path).await {
                    Ok(()) => Event::WatchStarted(path),
                    Err(e) => Event::WatchFailed {
                        path,
                        message: e.to_string(),
                    },
                };
                let _ = tx.send(event);
            });
        }
        Command::WaitForChange => {
            let Some(watcher) = watcher.cloned() else {
                return;
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                while let Some(event) = watcher.next_event().await {
                    match event {
                        WatchEvent::Changed(path) => {
                            let _ = tx.send(Event::FileChanged(path));
                            return;
                        }
                        WatchEvent::Error(message) => {
                            if tx.send(Event::WatchError(message)).is_err() {
                                return;
                            }
                        }
                    }
                }
                debug!("watcher closed while waiting for a change");
            });
        }
        Command::Quit => {
            if let Some(watcher) = watcher {
                watcher.close();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::scanner::ScanPolicy;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn scan_root_reports_tree_and_count() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "# A").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b.markdown"), "# B").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        execute(
            Command::ScanRoot {
                root: dir.path().to_path_buf(),
                policy: ScanPolicy::default(),
            },
            &tx,
            None,
        );
        match rx.recv().await {
            Some(Event::ScanComplete(Ok(scan))) => {
                assert_eq!(scan.roots.len(), 2);
                assert_eq!(scan.file_count, 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn scan_of_missing_root_reports_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        execute(
            Command::ScanRoot {
                root: PathBuf::from("/definitely/not/here"),
                policy: ScanPolicy::default(),
            },
            &tx,
            None,
        );
        assert!(matches!(
            rx.recv().await,
            Some(Event::ScanComplete(Err(_)))
        ));
    }

    #[tokio::test]
    async fn load_file_reads_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.md");
        fs::write(&path, "hello").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        execute(Command::LoadFile(path.clone()), &tx, None);
        match rx.recv().await {
            Some(Event::FileLoaded { path: p, content }) => {
                assert_eq!(p, path);
                assert_eq!(content.unwrap(), "hello");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn load_missing_file_reports_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        execute(Command::LoadFile(PathBuf::from("/nope.md")), &tx, None);
        match rx.recv().await {
            Some(Event::FileLoaded {
                content: Err(message),
                ..
            }) => {
                assert!(message.starts_with("Cannot read /nope.md"), "{message}");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn watch_commands_without_watcher_do_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        execute(Command::StartWatching(PathBuf::from("/a.md")), &tx, None);
        execute(Command::WaitForChange, &tx, None);
        execute(Command::Quit, &tx, None);
        drop(tx);
        assert!(rx.recv().await.is_none());
    }
}
