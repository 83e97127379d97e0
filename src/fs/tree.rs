use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;
use crate::fs::scanner::{self, ScanPolicy};

/// Index of a node inside the [`TreeState`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A node in the Markdown tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub depth: usize,
    pub expanded: bool,
    /// `None` until the directory is expanded for the first time.
    pub children: Option<Vec<NodeId>>,
    /// Back link into the arena; bookkeeping only.
    pub parent: Option<NodeId>,
}

impl TreeNode {
    pub fn new(path: PathBuf, name: String, is_dir: bool, depth: usize) -> Self {
        Self {
            name,
            path,
            is_dir,
            depth,
            expanded: false,
            children: None,
            parent: None,
        }
    }
}

/// A flattened representation of a tree node for rendering.
#[derive(Debug, Clone)]
pub struct FlatItem {
    pub id: NodeId,
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub depth: usize,
    pub is_expanded: bool,
    pub is_last_sibling: bool,
}

/// What happened as a result of a tree operation, for the session to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeAction {
    None,
    FileSelected(PathBuf),
    DirectoryToggled { path: PathBuf, expanded: bool },
    FilterChanged { active: bool, value: String },
}

/// State for the tree view.
pub struct TreeState {
    pub root_path: PathBuf,
    pub policy: ScanPolicy,
    nodes: Vec<TreeNode>,
    roots: Vec<NodeId>,
    /// Rows currently displayed (flattened, then filtered).
    pub flat_items: Vec<FlatItem>,
    pub selected_index: usize,
    pub scroll_offset: usize,
    /// Current inline filter query string.
    pub filter_query: String,
    /// Whether the user is typing into the filter.
    pub is_filtering: bool,
}

impl TreeState {
    /// Create an empty tree for `root_path`; populate it with [`replace_roots`].
    ///
    /// [`replace_roots`]: TreeState::replace_roots
    pub fn new(root_path: &Path, policy: ScanPolicy) -> Self {
        Self {
            root_path: root_path.to_path_buf(),
            policy,
            nodes: Vec::new(),
            roots: Vec::new(),
            flat_items: Vec::new(),
            selected_index: 0,
            scroll_offset: 0,
            filter_query: String::new(),
            is_filtering: false,
        }
    }

    /// Scan `root_path` synchronously and build the tree from the result.
    pub fn scan(root_path: &Path, policy: ScanPolicy) -> Result<Self> {
        let roots = scanner::scan_directory(root_path, &policy)?;
        let mut state = Self::new(root_path, policy);
        state.replace_roots(roots);
        Ok(state)
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Install a fresh root scan, replacing the whole forest.
    ///
    /// Directories that were expanded before and still exist are expanded
    /// again, so a rescan keeps the user's place.
    pub fn replace_roots(&mut self, roots: Vec<TreeNode>) {
        let expanded = self.collect_expanded_paths();
        let selected_path = self.selected_item().map(|item| item.path.clone());

        self.nodes.clear();
        self.roots = self.insert_nodes(roots, None);
        self.restore_expanded(&expanded);
        self.rebuild();

        if let Some(idx) = selected_path.and_then(|p| self.find_index_by_path(&p)) {
            self.selected_index = idx;
        }
    }

    fn insert_nodes(&mut self, nodes: Vec<TreeNode>, parent: Option<NodeId>) -> Vec<NodeId> {
        nodes
            .into_iter()
            .map(|mut node| {
                let id = NodeId(self.nodes.len());
                node.parent = parent;
                self.nodes.push(node);
                id
            })
            .collect()
    }

    /// Load a directory's children on first expansion.
    fn load_children(&mut self, id: NodeId) -> Result<()> {
        if self.nodes[id.0].children.is_some() {
            return Ok(());
        }
        let children = scanner::scan_children(&self.nodes[id.0], &self.policy)?;
        let ids = self.insert_nodes(children, Some(id));
        self.nodes[id.0].children = Some(ids);
        Ok(())
    }

    /// Flip a directory between expanded and collapsed, loading its children
    /// lazily. Collapsing keeps the loaded children for the next expansion.
    pub fn toggle(&mut self, id: NodeId) -> bool {
        if !self.nodes[id.0].is_dir {
            return false;
        }
        let mut expanded = !self.nodes[id.0].expanded;
        if expanded {
            if let Err(e) = self.load_children(id) {
                warn!(path = %self.nodes[id.0].path.display(), error = %e, "failed to load children");
                expanded = false;
            }
        }
        self.nodes[id.0].expanded = expanded;
        self.rebuild();
        expanded
    }

    /// Activate the selected row: toggle a directory or select a file.
    pub fn toggle_selected(&mut self) -> TreeAction {
        let Some(item) = self.selected_item() else {
            return TreeAction::None;
        };
        let (id, path, is_dir) = (item.id, item.path.clone(), item.is_dir);
        if !is_dir {
            return TreeAction::FileSelected(path);
        }
        let expanded = self.toggle(id);
        debug!(path = %path.display(), expanded, "directory toggled");
        TreeAction::DirectoryToggled { path, expanded }
    }

    /// Expand the selected directory if it is collapsed.
    pub fn expand_selected(&mut self) -> TreeAction {
        let collapsed_dir = self
            .selected_item()
            .is_some_and(|item| item.is_dir && !item.is_expanded);
        if collapsed_dir {
            self.toggle_selected()
        } else {
            TreeAction::None
        }
    }

    /// Collapse the selected directory, or jump to the parent row.
    pub fn collapse_selected(&mut self) -> TreeAction {
        let Some(item) = self.selected_item() else {
            return TreeAction::None;
        };
        if item.is_dir && item.is_expanded {
            return self.toggle_selected();
        }
        if let Some(parent) = self.nodes[item.id.0].parent {
            if let Some(idx) = self.flat_items.iter().position(|row| row.id == parent) {
                self.selected_index = idx;
            }
        }
        TreeAction::None
    }

    /// Move the cursor by `delta` rows, clamped to the visible rows.
    pub fn move_selection(&mut self, delta: isize) {
        if self.flat_items.is_empty() {
            self.selected_index = 0;
            return;
        }
        let last = self.flat_items.len() - 1;
        let target = self.selected_index as isize + delta;
        self.selected_index = target.clamp(0, last as isize) as usize;
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    pub fn select_last(&mut self) {
        self.selected_index = self.flat_items.len().saturating_sub(1);
    }

    pub fn selected_item(&self) -> Option<&FlatItem> {
        self.flat_items.get(self.selected_index)
    }

    /// Set the name filter. An empty string shows every row again.
    pub fn set_filter(&mut self, text: &str) -> TreeAction {
        self.filter_query = text.to_string();
        self.rebuild();
        TreeAction::FilterChanged {
            active: self.is_filtering,
            value: self.filter_query.clone(),
        }
    }

    /// Enter filter input mode, keeping the current query.
    pub fn start_filter(&mut self) -> TreeAction {
        self.is_filtering = true;
        TreeAction::FilterChanged {
            active: true,
            value: self.filter_query.clone(),
        }
    }

    /// Leave filter input mode; the query stays applied.
    pub fn accept_filter(&mut self) -> TreeAction {
        self.is_filtering = false;
        TreeAction::FilterChanged {
            active: false,
            value: self.filter_query.clone(),
        }
    }

    /// Leave filter input mode and drop the query.
    pub fn clear_filter(&mut self) -> TreeAction {
        self.is_filtering = false;
        self.set_filter("")
    }

    /// Rebuild the displayed rows from the forest and the current filter.
    pub fn rebuild(&mut self) {
        let mut rows = Vec::new();
        for &root in &self.roots {
            self.flatten_node(root, &mut rows);
        }

        if !self.filter_query.is_empty() {
            rows = self.filter_rows(rows);
        }
        mark_last_siblings(&mut rows);
        self.flat_items = rows;

        if !self.flat_items.is_empty() && self.selected_index >= self.flat_items.len() {
            self.selected_index = self.flat_items.len() - 1;
        }
    }

    fn flatten_node(&self, id: NodeId, items: &mut Vec<FlatItem>) {
        let node = &self.nodes[id.0];
        items.push(FlatItem {
            id,
            name: node.name.clone(),
            path: node.path.clone(),
            is_dir: node.is_dir,
            depth: node.depth,
            is_expanded: node.expanded,
            is_last_sibling: false,
        });

        if node.expanded {
            if let Some(children) = &node.children {
                for &child in children {
                    self.flatten_node(child, items);
                }
            }
        }
    }

    /// Keep rows whose name matches the filter, plus their ancestors.
    fn filter_rows(&self, rows: Vec<FlatItem>) -> Vec<FlatItem> {
        let query = self.filter_query.to_lowercase();
        let mut keep: HashSet<NodeId> = HashSet::new();
        for row in rows.iter().filter(|r| r.name.to_lowercase().contains(&query)) {
            let mut cursor = Some(row.id);
            while let Some(id) = cursor {
                if !keep.insert(id) {
                    break;
                }
                cursor = self.nodes[id.0].parent;
            }
        }
        rows.into_iter().filter(|r| keep.contains(&r.id)).collect()
    }

    /// Update the scroll offset to ensure the selected item is visible.
    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        } else if self.selected_index >= self.scroll_offset + visible_height {
            self.scroll_offset = self.selected_index - visible_height + 1;
        }
    }

    /// Find the flat_items index of a node by its path.
    pub fn find_index_by_path(&self, path: &Path) -> Option<usize> {
        self.flat_items.iter().position(|item| item.path == path)
    }

    /// Collect all currently expanded directory paths.
    pub fn collect_expanded_paths(&self) -> HashSet<PathBuf> {
        self.nodes
            .iter()
            .filter(|node| node.is_dir && node.expanded)
            .map(|node| node.path.clone())
            .collect()
    }

    /// Re-expand directories from a saved set of expanded paths.
    fn restore_expanded(&mut self, expanded: &HashSet<PathBuf>) {
        for path in expanded_paths_in_restore_order(expanded) {
            let Some(idx) = self.nodes.iter().position(|n| &n.path == path) else {
                continue;
            };
            let id = NodeId(idx);
            if self.nodes[idx].is_dir && !self.nodes[idx].expanded {
                self.nodes[idx].expanded = true;
                if let Err(e) = self.load_children(id) {
                    warn!(path = %path.display(), error = %e, "failed to restore expansion");
                }
            }
        }
    }

    /// Toggle visibility of ignored directories. The caller rescans the root.
    pub fn toggle_show_ignored(&mut self) -> bool {
        self.policy.show_ignored = !self.policy.show_ignored;
        self.policy.show_ignored
    }
}

/// Return expanded paths sorted so ancestors are restored before descendants.
fn expanded_paths_in_restore_order(expanded: &HashSet<PathBuf>) -> Vec<&PathBuf> {
    let mut ordered: Vec<&PathBuf> = expanded.iter().collect();
    ordered.sort_by(|a, b| {
        a.components()
            .count()
            .cmp(&b.components().count())
            .then_with(|| a.cmp(b))
    });
    ordered
}

/// A row is the last sibling when no later row at the same depth appears
/// before the list climbs back above it.
fn mark_last_siblings(rows: &mut [FlatItem]) {
    for i in 0..rows.len() {
        let depth = rows[i].depth;
        let next = rows[i + 1..].iter().find(|r| r.depth <= depth);
        rows[i].is_last_sibling = !matches!(next, Some(r) if r.depth == depth);
    }
}
