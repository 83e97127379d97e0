mod app;
mod components;
mod config;
mod error;
mod event;
mod fs;
mod handler;
mod logging;
mod preview;
mod runtime;
mod theme;
mod tui;
mod ui;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use crate::app::App;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::fs::watcher::FileWatcher;
use crate::preview::markdown::MarkdownRenderer;
use crate::tui::{install_panic_hook, Tui};

/// Browse and preview Markdown files in the terminal.
#[derive(Parser, Debug)]
#[command(
    name = "mdview",
    version,
    about,
    disable_help_subcommand = true,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<CliCommand>,

    /// Directory to browse (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Path to a config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Do not reload the previewed file when it changes
    #[arg(long)]
    no_watcher: bool,

    /// Show dot-files and dot-directories
    #[arg(long)]
    show_hidden: bool,

    /// Color scheme: dark or light
    #[arg(long, value_name = "SCHEME")]
    theme: Option<String>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Print the version
    Version,
    /// Print usage and key bindings
    Help,
    /// Upgrade to the latest release
    Upgrade {
        /// Only check whether a newer release exists
        #[arg(long, conflicts_with = "force")]
        check: bool,
        /// Reinstall even when already up to date
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Config layer built from command-line flags.
    fn overrides(&self) -> AppConfig {
        let mut cfg = AppConfig::default();
        if self.no_watcher {
            cfg.watcher.enabled = Some(false);
        }
        if self.show_hidden {
            cfg.tree.show_hidden = Some(true);
        }
        cfg.theme.scheme = self.theme.clone();
        cfg
    }
}

fn print_help() {
    println!(
        "mdview {}\n\n\
         Usage:\n  \
         mdview [path]              Browse Markdown files under path (default: .)\n  \
         mdview version             Print the version\n  \
         mdview help                Show this help\n  \
         mdview upgrade [--check|--force]\n\n\
         Options:\n  \
         --config <FILE>            Use this config file\n  \
         --no-watcher               Do not reload files on change\n  \
         --show-hidden              Show dot-files\n  \
         --theme <dark|light>       Color scheme\n\n\
         Key bindings:\n\n{}",
        env!("CARGO_PKG_VERSION"),
        components::help::reference_text()
    );
}

/// Resolve the root argument to an absolute directory.
fn resolve_root(path: &Path) -> error::Result<PathBuf> {
    let root = path.canonicalize().map_err(|e| {
        AppError::InvalidPath(format!("{}: {e}", path.display()))
    })?;
    if !root.is_dir() {
        return Err(AppError::NotADirectory(root));
    }
    Ok(root)
}

async fn run_session(cli: &Cli) -> error::Result<()> {
    let root = resolve_root(&cli.path)?;
    let mut config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));

    let watcher = if config.watcher_enabled() {
        match FileWatcher::new(config.debounce()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!(error = %e, "file watcher unavailable");
                config.watcher.enabled = Some(false);
                None
            }
        }
    } else {
        None
    };

    info!(root = %root.display(), "starting session");
    let renderer = MarkdownRenderer::new(config.code_theme());
    let app = App::new(&root, &config, Box::new(renderer));

    install_panic_hook();
    let mut tui = Tui::new(config.mouse_enabled())?;
    let result = runtime::run(app, &mut tui, watcher).await;
    tui.restore()?;
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("mdview {}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        Some(CliCommand::Help) => {
            print_help();
            return ExitCode::SUCCESS;
        }
        Some(CliCommand::Upgrade { .. }) => {
            eprintln!("Error: self-upgrade is not bundled with this build; reinstall with `cargo install mdview`");
            return ExitCode::FAILURE;
        }
        None => {}
    }

    let _log_guard = logging::init();

    match run_session(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
