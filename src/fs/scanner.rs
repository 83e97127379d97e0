//! Directory scanning restricted to Markdown-relevant content.
//!
//! Every function here is stateless: it reads the filesystem and returns
//! fresh [`TreeNode`]s. Only the root scan reports read errors; the recursive
//! "does this directory contain anything worth showing" probe and the file
//! counter treat unreadable entries as empty.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::fs::tree::TreeNode;

/// Directory names skipped by default: dependency caches and build output
/// that rarely hold documentation worth browsing.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    "node_modules",
    "vendor",
    "__pycache__",
    ".venv",
    "venv",
    "dist",
    "build",
    "target",
    ".cache",
    ".next",
    ".nuxt",
    "coverage",
    ".terraform",
    ".serverless",
    "bower_components",
];

/// File extensions (lowercase, without the dot) treated as Markdown.
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Rules deciding which entries appear in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPolicy {
    pub show_hidden: bool,
    pub markdown_only: bool,
    /// Deepest level whose children may be loaded. `None` means unlimited.
    pub max_depth: Option<usize>,
    pub ignore_names: HashSet<String>,
    pub show_ignored: bool,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            show_hidden: false,
            markdown_only: true,
            max_depth: None,
            ignore_names: DEFAULT_IGNORE_DIRS.iter().map(|s| s.to_string()).collect(),
            show_ignored: false,
        }
    }
}

impl ScanPolicy {
    fn skips_hidden(&self, name: &str) -> bool {
        !self.show_hidden && name.starts_with('.')
    }

    fn skips_dir(&self, name: &str) -> bool {
        !self.show_ignored && self.ignore_names.contains(name)
    }
}

/// Whether a file name has a Markdown extension (case-insensitive).
pub fn is_relevant_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            MARKDOWN_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Scan the top level of `root` after verifying it is a readable directory.
pub fn scan_directory(root: &Path, policy: &ScanPolicy) -> Result<Vec<TreeNode>> {
    let root = root.canonicalize().map_err(|source| AppError::Scan {
        path: root.to_path_buf(),
        source,
    })?;
    if !root.is_dir() {
        return Err(AppError::NotADirectory(root));
    }
    scan_level(&root, 0, policy)
}

/// List one directory level (no recursion into children) as unexpanded nodes
/// at `depth`, filtered by `policy` and sorted directories-first, then by
/// case-insensitive name.
pub fn scan_level(dir: &Path, depth: usize, policy: &ScanPolicy) -> Result<Vec<TreeNode>> {
    let entries = fs::read_dir(dir).map_err(|source| AppError::Scan {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut nodes = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().to_string();
        if policy.skips_hidden(&name) {
            continue;
        }
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let path = entry.path();

        if is_dir {
            if policy.skips_dir(&name) {
                continue;
            }
            if policy.markdown_only && !contains_relevant_file(&path, policy) {
                continue;
            }
        } else if policy.markdown_only && !is_relevant_file(&name) {
            continue;
        }

        nodes.push(TreeNode::new(path, name, is_dir, depth));
    }

    sort_nodes(&mut nodes);
    debug!(dir = %dir.display(), count = nodes.len(), "scanned level");
    Ok(nodes)
}

/// Load the children of an unexpanded directory node.
///
/// Returns an empty list for files and for directories at or beyond
/// `policy.max_depth`.
pub fn scan_children(node: &TreeNode, policy: &ScanPolicy) -> Result<Vec<TreeNode>> {
    if !node.is_dir {
        return Ok(Vec::new());
    }
    if policy.max_depth.is_some_and(|max| node.depth >= max) {
        return Ok(Vec::new());
    }
    scan_level(&node.path, node.depth + 1, policy)
}

/// Whether the subtree under `dir` holds at least one relevant file.
///
/// Honors the hidden and ignore rules of `policy`, stops at the first hit and
/// treats unreadable directories as empty.
pub fn contains_relevant_file(dir: &Path, policy: &ScanPolicy) -> bool {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "containment check skipped");
            return false;
        }
    };

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if policy.skips_hidden(&name) {
            continue;
        }
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            if policy.skips_dir(&name) {
                continue;
            }
            if contains_relevant_file(&entry.path(), policy) {
                return true;
            }
        } else if is_relevant_file(&name) {
            return true;
        }
    }
    false
}

/// Count every relevant file under `root`, independent of the display tree.
pub fn count_relevant_files(root: &Path, policy: &ScanPolicy) -> usize {
    let mut count = 0;
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if policy.skips_hidden(&name) {
                continue;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                if !policy.skips_dir(&name) {
                    pending.push(entry.path());
                }
            } else if is_relevant_file(&name) {
                count += 1;
            }
        }
    }
    count
}

fn sort_nodes(nodes: &mut [TreeNode]) {
    nodes.sort_by(|a, b| {
        b.is_dir
            .cmp(&a.is_dir)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}
