use std::path::{Path, PathBuf};

use crossterm::event::KeyEventKind;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::event::Event;
use crate::fs::scanner::ScanPolicy;
use crate::fs::tree::{TreeAction, TreeState};
use crate::handler;
use crate::preview::markdown::Renderer;
use crate::preview::viewport::Viewport;
use crate::theme::{self, ThemeColors};

/// Narrowest the tree panel is allowed to get.
pub const MIN_TREE_WIDTH: usize = 20;
/// Narrowest the preview panel is allowed to get.
pub const MIN_PREVIEW_WIDTH: usize = 30;
/// Lines scrolled per mouse wheel notch.
pub const MOUSE_SCROLL_LINES: usize = 3;

/// Which panel receives navigation keys.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Tree,
    Preview,
}

/// Whether keystrokes are navigation or text being typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Navigating,
    TreeFiltering,
    PreviewSearchInput,
}

/// Background work requested by the session. The runtime executes each one
/// as a task that reports back through an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ScanRoot { root: PathBuf, policy: ScanPolicy },
    LoadFile(PathBuf),
    StartWatching(PathBuf),
    WaitForChange,
    Quit,
}

/// Inner panel sizes for the split view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelLayout {
    pub tree_width: usize,
    pub preview_width: usize,
    pub content_height: usize,
}

/// Main application state.
pub struct App {
    pub tree: TreeState,
    pub viewport: Viewport,
    pub theme: ThemeColors,
    pub focus: Focus,
    pub fullscreen: bool,
    pub help_visible: bool,
    /// A file read is in flight.
    pub loading: bool,
    /// A root scan is in flight.
    pub scanning: bool,
    pub last_error: Option<String>,
    /// File the watcher reported as watched.
    pub watched_file: Option<PathBuf>,
    /// Markdown files under the root, from the last scan.
    pub file_count: usize,
    pub width: u16,
    pub height: u16,
    pub should_quit: bool,
    watcher_enabled: bool,
    /// A `WaitForChange` request is outstanding.
    waiting_for_change: bool,
    tree_ratio: f64,
}

impl App {
    /// Create the session for `root`. Nothing is scanned until the commands
    /// from [`App::start`] run.
    pub fn new(root: &Path, config: &AppConfig, renderer: Box<dyn Renderer>) -> Self {
        Self {
            tree: TreeState::new(root, config.scan_policy()),
            viewport: Viewport::new(renderer),
            theme: theme::resolve_theme(config.theme_scheme()),
            focus: Focus::Tree,
            fullscreen: false,
            help_visible: false,
            loading: false,
            scanning: false,
            last_error: None,
            watched_file: None,
            file_count: 0,
            width: 80,
            height: 24,
            should_quit: false,
            watcher_enabled: config.watcher_enabled(),
            waiting_for_change: false,
            tree_ratio: config.tree_ratio(),
        }
    }

    /// Commands to run once at startup.
    pub fn start(&mut self) -> Vec<Command> {
        vec![self.rescan()]
    }

    pub fn input_mode(&self) -> InputMode {
        if self.tree.is_filtering {
            InputMode::TreeFiltering
        } else if self.viewport.is_search_input() {
            InputMode::PreviewSearchInput
        } else {
            InputMode::Navigating
        }
    }

    /// The single dispatch point for every event.
    pub fn handle_event(&mut self, event: Event) -> Vec<Command> {
        match event {
            Event::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    return Vec::new();
                }
                handler::handle_key_event(self, key)
            }
            Event::Mouse(mouse) => {
                handler::handle_mouse_event(self, mouse);
                Vec::new()
            }
            Event::Resize(width, height) => {
                self.resize(width, height);
                Vec::new()
            }
            Event::Tick => Vec::new(),
            Event::ScanComplete(result) => {
                self.scanning = false;
                match result {
                    Ok(scan) => {
                        info!(
                            root = %self.tree.root_path.display(),
                            files = scan.file_count,
                            "scan complete"
                        );
                        self.file_count = scan.file_count;
                        self.tree.replace_roots(scan.roots);
                    }
                    Err(message) => {
                        warn!(error = %message, "scan failed");
                        self.last_error = Some(message);
                    }
                }
                Vec::new()
            }
            Event::FileLoaded { path, content } => self.file_loaded(path, content),
            Event::WatchStarted(path) => {
                debug!(path = %path.display(), "watch started");
                self.watched_file = Some(path);
                self.arm_wait()
            }
            Event::FileChanged(path) => {
                self.waiting_for_change = false;
                let mut commands = Vec::new();
                if self.watched_file.as_deref() == Some(path.as_path()) {
                    debug!(path = %path.display(), "reloading changed file");
                    commands.push(Command::LoadFile(path));
                }
                commands.extend(self.arm_wait());
                commands
            }
            Event::WatchFailed { path, message } => {
                // The watcher drops its old path before trying the new one.
                warn!(path = %path.display(), error = %message, "watch failed");
                self.watched_file = None;
                self.arm_wait()
            }
            Event::WatchError(message) => {
                warn!(error = %message, "watcher error");
                self.arm_wait()
            }
        }
    }

    fn arm_wait(&mut self) -> Vec<Command> {
        if self.waiting_for_change || !self.watcher_enabled {
            return Vec::new();
        }
        self.waiting_for_change = true;
        vec![Command::WaitForChange]
    }

    fn file_loaded(
        &mut self,
        path: PathBuf,
        content: std::result::Result<String, String>,
    ) -> Vec<Command> {
        self.loading = false;
        let text = match content {
            Ok(text) => text,
            Err(message) => {
                self.viewport.set_error(&path, &message);
                self.last_error = Some(message);
                return Vec::new();
            }
        };
        if let Err(e) = self.viewport.set_content(&path, text) {
            self.last_error = Some(e.to_string());
            return Vec::new();
        }
        self.last_error = None;

        if self.watcher_enabled && self.watched_file.as_deref() != Some(path.as_path()) {
            vec![Command::StartWatching(path)]
        } else {
            Vec::new()
        }
    }

    /// Act on the outcome of a tree operation.
    pub fn apply_tree_action(&mut self, action: TreeAction) -> Vec<Command> {
        match action {
            TreeAction::FileSelected(path) => self.open_file(path),
            TreeAction::DirectoryToggled { .. }
            | TreeAction::FilterChanged { .. }
            | TreeAction::None => Vec::new(),
        }
    }

    /// Begin loading `path` into the preview.
    pub fn open_file(&mut self, path: PathBuf) -> Vec<Command> {
        self.loading = true;
        self.last_error = None;
        vec![Command::LoadFile(path)]
    }

    /// Request a fresh root scan with the current policy.
    pub fn rescan(&mut self) -> Command {
        self.scanning = true;
        Command::ScanRoot {
            root: self.tree.root_path.clone(),
            policy: self.tree.policy.clone(),
        }
    }

    /// Show or hide ignored directories and rescan.
    pub fn toggle_ignored(&mut self) -> Vec<Command> {
        let shown = self.tree.toggle_show_ignored();
        info!(show_ignored = shown, "toggled ignored directories");
        vec![self.rescan()]
    }

    /// Stop the session; the runtime closes the watcher.
    pub fn quit(&mut self) -> Vec<Command> {
        self.should_quit = true;
        vec![Command::Quit]
    }

    // --- Layout ---

    /// Split-view panel sizes for the current terminal size.
    pub fn panel_layout(&self) -> PanelLayout {
        let usable = self.width.saturating_sub(4) as usize;
        let mut tree_width = (usable as f64 * self.tree_ratio) as usize;
        let mut preview_width = usable.saturating_sub(tree_width);
        if tree_width < MIN_TREE_WIDTH {
            tree_width = MIN_TREE_WIDTH;
            preview_width = usable.saturating_sub(tree_width);
        }
        if preview_width < MIN_PREVIEW_WIDTH {
            preview_width = MIN_PREVIEW_WIDTH;
            tree_width = usable.saturating_sub(preview_width);
        }
        PanelLayout {
            tree_width,
            preview_width,
            content_height: self.height.saturating_sub(6) as usize,
        }
    }

    /// Preview size in fullscreen mode.
    pub fn fullscreen_size(&self) -> (usize, usize) {
        (
            self.width.saturating_sub(2) as usize,
            self.height.saturating_sub(4) as usize,
        )
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.apply_layout();
    }

    /// Push the current geometry down to the viewport.
    pub fn apply_layout(&mut self) {
        if self.fullscreen {
            let (width, height) = self.fullscreen_size();
            self.viewport.resize(width, height);
        } else {
            let layout = self.panel_layout();
            self.viewport
                .resize(layout.preview_width, layout.content_height);
        }
    }

    pub fn toggle_focus(&mut self) {
        if self.fullscreen {
            return;
        }
        self.focus = match self.focus {
            Focus::Tree => Focus::Preview,
            Focus::Preview => Focus::Tree,
        };
    }

    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen = !self.fullscreen;
        if self.fullscreen {
            self.focus = Focus::Preview;
        }
        self.apply_layout();
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("root", &self.tree.root_path)
            .field("focus", &self.focus)
            .field("fullscreen", &self.fullscreen)
            .field("help_visible", &self.help_visible)
            .field("loading", &self.loading)
            .field("last_error", &self.last_error)
            .field("watched_file", &self.watched_file)
            .finish()
    }
}
