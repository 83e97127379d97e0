//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--no-watcher`, `--show-hidden`, `--theme`)
//! 2. `--config <file>`
//! 3. `$MDVIEW_CONFIG` environment variable (path to config file)
//! 4. Project-local `.mdview.toml` in the current working directory
//! 5. Global `~/.config/mdview/config.toml`
//! 6. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::fs::scanner::ScanPolicy;
use crate::fs::watcher;
use crate::preview::markdown::DEFAULT_CODE_THEME;

// ── Section configs ──────────────────────────────────────────────────────────

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable mouse support.
    pub mouse: Option<bool>,
}

/// Tree panel settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TreeConfig {
    /// Show dot-files and dot-directories.
    pub show_hidden: Option<bool>,
    /// Directory names skipped in addition to the built-in ignore set.
    pub ignore_dirs: Option<Vec<String>>,
    /// Share of the usable width given to the tree panel.
    pub tree_ratio: Option<f64>,
    /// Deepest level that may be expanded; negative means unlimited.
    pub max_depth: Option<i64>,
}

/// File watcher settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WatcherConfig {
    /// Reload the previewed file when it changes on disk.
    pub enabled: Option<bool>,
    /// Debounce interval in milliseconds.
    pub debounce_ms: Option<u64>,
}

/// Preview panel settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PreviewConfig {
    /// Syntect theme for fenced code blocks.
    pub code_theme: Option<String>,
}

/// Theme configuration section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    /// Color scheme: "dark" or "light".
    pub scheme: Option<String>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub tree: TreeConfig,
    pub watcher: WatcherConfig,
    pub preview: PreviewConfig,
    pub theme: ThemeConfig,
}

// ── Default constants ────────────────────────────────────────────────────────

/// Default share of the usable width for the tree panel.
pub const DEFAULT_TREE_RATIO: f64 = 0.25;

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path; that is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("MDVIEW_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".mdview.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("mdview").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning printed to stderr).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid config file");
            eprintln!(
                "Warning: failed to parse config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                mouse: other.general.mouse.or(self.general.mouse),
            },
            tree: TreeConfig {
                show_hidden: other.tree.show_hidden.or(self.tree.show_hidden),
                ignore_dirs: other.tree.ignore_dirs.clone().or(self.tree.ignore_dirs),
                tree_ratio: other.tree.tree_ratio.or(self.tree.tree_ratio),
                max_depth: other.tree.max_depth.or(self.tree.max_depth),
            },
            watcher: WatcherConfig {
                enabled: other.watcher.enabled.or(self.watcher.enabled),
                debounce_ms: other.watcher.debounce_ms.or(self.watcher.debounce_ms),
            },
            preview: PreviewConfig {
                code_theme: other
                    .preview
                    .code_theme
                    .clone()
                    .or(self.preview.code_theme),
            },
            theme: ThemeConfig {
                scheme: other.theme.scheme.clone().or(self.theme.scheme),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Lowest priority first so higher sources overwrite.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    /// Whether mouse support is enabled.
    pub fn mouse_enabled(&self) -> bool {
        self.general.mouse.unwrap_or(true)
    }

    /// Whether to show hidden entries.
    pub fn show_hidden(&self) -> bool {
        self.tree.show_hidden.unwrap_or(false)
    }

    /// Tree panel share of the usable width, kept within 0.1..=0.9.
    pub fn tree_ratio(&self) -> f64 {
        self.tree
            .tree_ratio
            .filter(|r| r.is_finite())
            .unwrap_or(DEFAULT_TREE_RATIO)
            .clamp(0.1, 0.9)
    }

    /// Deepest expandable level; `None` when unlimited.
    pub fn max_depth(&self) -> Option<usize> {
        self.tree
            .max_depth
            .and_then(|depth| usize::try_from(depth).ok())
    }

    /// Whether the watcher is enabled.
    pub fn watcher_enabled(&self) -> bool {
        self.watcher.enabled.unwrap_or(true)
    }

    /// Watcher debounce interval.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(
            self.watcher
                .debounce_ms
                .unwrap_or(watcher::DEFAULT_DEBOUNCE_MS),
        )
    }

    /// Syntect theme name for code blocks.
    pub fn code_theme(&self) -> &str {
        self.preview
            .code_theme
            .as_deref()
            .unwrap_or(DEFAULT_CODE_THEME)
    }

    /// Theme scheme: "dark" or "light".
    pub fn theme_scheme(&self) -> &str {
        self.theme.scheme.as_deref().unwrap_or("dark")
    }

    /// Scan rules derived from the tree section.
    pub fn scan_policy(&self) -> ScanPolicy {
        let mut policy = ScanPolicy {
            show_hidden: self.show_hidden(),
            max_depth: self.max_depth(),
            ..ScanPolicy::default()
        };
        if let Some(extra) = &self.tree.ignore_dirs {
            policy.ignore_names.extend(extra.iter().cloned());
        }
        policy
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();
        assert!(cfg.mouse_enabled());
        assert!(!cfg.show_hidden());
        assert_eq!(cfg.tree_ratio(), 0.25);
        assert_eq!(cfg.max_depth(), None);
        assert!(cfg.watcher_enabled());
        assert_eq!(cfg.debounce(), Duration::from_millis(100));
        assert_eq!(cfg.code_theme(), "base16-ocean.dark");
        assert_eq!(cfg.theme_scheme(), "dark");
    }

    #[test]
    fn toml_parsing_full() {
        let toml = r#"
[general]
mouse = false

[tree]
show_hidden = true
ignore_dirs = ["drafts", "archive"]
tree_ratio = 0.4
max_depth = 3

[watcher]
enabled = false
debounce_ms = 250

[preview]
code_theme = "InspiredGitHub"

[theme]
scheme = "light"
"#;
        let cfg: AppConfig = toml::from_str(toml).unwrap();
        assert!(!cfg.mouse_enabled());
        assert!(cfg.show_hidden());
        assert_eq!(cfg.tree_ratio(), 0.4);
        assert_eq!(cfg.max_depth(), Some(3));
        assert!(!cfg.watcher_enabled());
        assert_eq!(cfg.debounce(), Duration::from_millis(250));
        assert_eq!(cfg.code_theme(), "InspiredGitHub");
        assert_eq!(cfg.theme_scheme(), "light");
    }

    #[test]
    fn toml_parsing_partial() {
        let cfg: AppConfig = toml::from_str("[watcher]\ndebounce_ms = 50\n").unwrap();
        assert_eq!(cfg.debounce(), Duration::from_millis(50));
        assert!(cfg.watcher_enabled());
        assert!(cfg.mouse_enabled());
    }

    #[test]
    fn negative_max_depth_is_unlimited() {
        let cfg: AppConfig = toml::from_str("[tree]\nmax_depth = -1\n").unwrap();
        assert_eq!(cfg.max_depth(), None);
    }

    #[test]
    fn tree_ratio_is_clamped() {
        let cfg: AppConfig = toml::from_str("[tree]\ntree_ratio = 5.0\n").unwrap();
        assert_eq!(cfg.tree_ratio(), 0.9);
    }

    #[test]
    fn merge_prefers_override() {
        let base: AppConfig =
            toml::from_str("[tree]\nshow_hidden = false\ntree_ratio = 0.3\n").unwrap();
        let over: AppConfig = toml::from_str("[tree]\nshow_hidden = true\n").unwrap();
        let merged = base.merge(&over);
        assert!(merged.show_hidden());
        assert_eq!(merged.tree_ratio(), 0.3);
    }

    #[test]
    fn scan_policy_adds_extra_ignores() {
        let cfg: AppConfig =
            toml::from_str("[tree]\nignore_dirs = [\"drafts\"]\nshow_hidden = true\n").unwrap();
        let policy = cfg.scan_policy();
        assert!(policy.show_hidden);
        assert!(policy.markdown_only);
        assert!(policy.ignore_names.contains("drafts"));
        assert!(policy.ignore_names.contains("node_modules"));
    }

    #[test]
    fn load_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[theme]\nscheme = \"light\"").unwrap();
        let cfg = load_file(file.path()).unwrap();
        assert_eq!(cfg.theme_scheme(), "light");
    }

    #[test]
    fn load_file_rejects_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[theme\nscheme = ").unwrap();
        assert!(load_file(file.path()).is_none());
    }

    #[test]
    fn load_file_missing_is_none() {
        assert!(load_file(Path::new("/definitely/not/here.toml")).is_none());
    }

    #[test]
    fn explicit_file_and_cli_overrides_win() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[watcher]\ndebounce_ms = 777\nenabled = true").unwrap();
        let overrides = AppConfig {
            watcher: WatcherConfig {
                enabled: Some(false),
                debounce_ms: None,
            },
            ..AppConfig::default()
        };
        let cfg = AppConfig::load(Some(file.path()), Some(&overrides));
        assert_eq!(cfg.debounce(), Duration::from_millis(777));
        assert!(!cfg.watcher_enabled());
    }
}
