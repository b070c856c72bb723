// src/explorer/tree.rs
// =============================================================================
// The lazily loaded file tree.
//
// How it works:
// 1. The tree starts with just the listing of its root directory
// 2. Expanding a directory needs that directory's listing; the caller fetches
//    it once and hands it over with insert_children()
// 3. Listings are memoized per path: collapsing keeps them, so expanding
//    the same directory again costs no request
// 4. visible_rows() flattens whatever is expanded into the rows a UI draws
//
// The tree itself never touches the network. load_tree() at the bottom is
// the one helper that fills a tree several levels deep in one go.
// =============================================================================

use futures::stream::{self, StreamExt};
use log::debug;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::github::{ApiError, Contents, ContentsApi, TreeNode};

// How many directory listings load_tree() fetches at once
const LEVEL_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct FileTree {
    /// Path of the directory the tree is rooted at ("" = repository root)
    root_path: String,
    root: Vec<TreeNode>,
    /// Memoized listings, keyed by directory path
    children: HashMap<String, Vec<TreeNode>>,
    expanded: HashSet<String>,
}

// One line of the rendered tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeRow<'a> {
    pub depth: usize,
    pub node: &'a TreeNode,
    pub expanded: bool,
}

// Nested form of the loaded part of the tree, for `tree --json`
#[derive(Debug, Serialize)]
pub struct NestedNode<'a> {
    #[serde(flatten)]
    pub node: &'a TreeNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NestedNode<'a>>>,
}

impl FileTree {
    pub fn new(root_path: &str, root: Vec<TreeNode>) -> Self {
        FileTree {
            root_path: root_path.trim_matches('/').to_string(),
            root,
            ..FileTree::default()
        }
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn root(&self) -> &[TreeNode] {
        &self.root
    }

    // Listing of a directory, if it has been fetched
    pub fn children(&self, path: &str) -> Option<&[TreeNode]> {
        if path == self.root_path {
            return Some(&self.root);
        }
        self.children.get(path).map(Vec::as_slice)
    }

    pub fn is_loaded(&self, path: &str) -> bool {
        self.children(path).is_some()
    }

    pub fn insert_children(&mut self, path: &str, children: Vec<TreeNode>) {
        if path == self.root_path {
            self.root = children;
        } else {
            self.children.insert(path.to_string(), children);
        }
    }

    // Forgets a listing so the next expand fetches it again. The directory
    // is collapsed too: an expanded row without a listing would draw as open
    // and empty.
    pub fn invalidate(&mut self, path: &str) {
        self.children.remove(path);
        self.expanded.remove(path);
    }

    // Marks a loaded directory as expanded; false if it still needs a fetch
    pub fn expand(&mut self, path: &str) -> bool {
        if !self.is_loaded(path) {
            return false;
        }
        self.expanded.insert(path.to_string());
        true
    }

    pub fn collapse(&mut self, path: &str) {
        self.expanded.remove(path);
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.expanded.contains(path)
    }

    pub fn expanded_paths(&self) -> impl Iterator<Item = &str> {
        self.expanded.iter().map(String::as_str)
    }

    // Looks a node up among everything loaded so far
    pub fn find(&self, path: &str) -> Option<&TreeNode> {
        let parent = parent_path(path);
        self.children(parent)?.iter().find(|node| node.path == path)
    }

    // Keeps a file's row in sync after a save
    pub fn update_file(&mut self, path: &str, sha: &str, size: u64) {
        let parent = parent_path(path).to_string();
        let listing = if parent == self.root_path {
            Some(&mut self.root)
        } else {
            self.children.get_mut(&parent)
        };
        if let Some(node) = listing.and_then(|nodes| nodes.iter_mut().find(|n| n.path == path)) {
            node.sha = sha.to_string();
            node.size = size;
        }
    }

    // Depth-first list of what an explorer shows right now
    pub fn visible_rows(&self) -> Vec<TreeRow<'_>> {
        let mut rows = Vec::new();
        self.walk(&self.root, 0, &mut rows);
        rows
    }

    fn walk<'a>(&'a self, nodes: &'a [TreeNode], depth: usize, rows: &mut Vec<TreeRow<'a>>) {
        for node in nodes {
            // Open only if there is a listing to show
            let children = if node.is_dir() && self.is_expanded(&node.path) {
                self.children.get(&node.path)
            } else {
                None
            };
            rows.push(TreeRow {
                depth,
                node,
                expanded: children.is_some(),
            });
            if let Some(children) = children {
                self.walk(children, depth + 1, rows);
            }
        }
    }

    // Indented text rendering, one row per line
    pub fn render(&self) -> String {
        let rows = self.visible_rows();
        if rows.is_empty() {
            return "  (empty directory)\n".to_string();
        }

        let mut out = String::new();
        for row in rows {
            let indent = "  ".repeat(row.depth);
            let line = if row.node.is_dir() {
                let marker = if row.expanded { "▾" } else { "▸" };
                format!("{}{} {}/", indent, marker, row.node.name)
            } else {
                format!("{}  {} ({})", indent, row.node.name, human_size(row.node.size))
            };
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    pub fn to_nested(&self) -> Vec<NestedNode<'_>> {
        self.nest(&self.root)
    }

    fn nest<'a>(&'a self, nodes: &'a [TreeNode]) -> Vec<NestedNode<'a>> {
        nodes
            .iter()
            .map(|node| NestedNode {
                node,
                children: self
                    .children
                    .get(&node.path)
                    .filter(|_| self.is_expanded(&node.path))
                    .map(|children| self.nest(children)),
            })
            .collect()
    }
}

// "src/explorer/tree.rs" -> "src/explorer", "README.md" -> ""
pub fn parent_path(path: &str) -> &str {
    path.trim_matches('/').rsplit_once('/').map_or("", |(parent, _)| parent)
}

// Every directory on the way down to `path`, including `path` itself
//
// "a/b/c" -> ["a", "a/b", "a/b/c"]
pub fn ancestors(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);
        out.push(current.clone());
    }
    out
}

pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

// Loads `path` and then `depth - 1` more levels below it
//
// Each level is fetched with up to LEVEL_CONCURRENCY listings in flight.
// The first failure aborts the walk; the interactive session never uses
// this, it expands one directory per command.
pub async fn load_tree<A: ContentsApi>(
    api: &A,
    path: &str,
    reference: Option<&str>,
    depth: usize,
) -> Result<FileTree, ApiError> {
    let root = match api.get_contents(path, reference).await? {
        Contents::Dir(nodes) => nodes,
        Contents::File(_) => return Err(ApiError::NotADirectory(path.to_string())),
    };
    let mut tree = FileTree::new(path, root);

    let mut level: Vec<String> = tree
        .root()
        .iter()
        .filter(|n| n.is_dir())
        .map(|n| n.path.clone())
        .collect();

    for current_depth in 1..depth.max(1) {
        if level.is_empty() {
            break;
        }
        debug!("loading {} director(ies) at depth {}", level.len(), current_depth);

        let results: Vec<(String, Result<Contents, ApiError>)> = stream::iter(level)
            .map(|dir| async move {
                let result = api.get_contents(&dir, reference).await;
                (dir, result)
            })
            .buffer_unordered(LEVEL_CONCURRENCY)
            .collect()
            .await;

        let mut next = Vec::new();
        for (dir, result) in results {
            let nodes = match result? {
                Contents::Dir(nodes) => nodes,
                Contents::File(_) => return Err(ApiError::NotADirectory(dir)),
            };
            next.extend(nodes.iter().filter(|n| n.is_dir()).map(|n| n.path.clone()));
            tree.insert_children(&dir, nodes);
            tree.expand(&dir);
        }
        level = next;
    }

    Ok(tree)
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. HashMap vs HashSet
//    - `children` maps a directory path to its listing (a cache)
//    - `expanded` is just a set of paths; membership is the flag
//
// 2. Lifetimes in TreeRow<'a> and NestedNode<'a>
//    - Rows borrow nodes from the tree instead of cloning them
//    - The borrow checker guarantees the tree outlives the rows
//
// 3. buffer_unordered(LEVEL_CONCURRENCY)
//    - Turns a stream of futures into at most N running at once
//    - Results arrive in completion order, which is fine because every
//      listing is stored under its own path
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::fake::FakeApi;
    use crate::github::NodeKind;
    use pretty_assertions::assert_eq;

    fn node(path: &str, kind: NodeKind, size: u64) -> TreeNode {
        TreeNode {
            name: path.rsplit('/').next().unwrap().to_string(),
            path: path.to_string(),
            kind,
            size,
            sha: format!("sha-{}", path),
        }
    }

    fn sample() -> FileTree {
        let mut tree = FileTree::new(
            "",
            vec![node("src", NodeKind::Dir, 0), node("README.md", NodeKind::File, 2048)],
        );
        tree.insert_children(
            "src",
            vec![node("src/bin", NodeKind::Dir, 0), node("src/lib.rs", NodeKind::File, 10)],
        );
        tree
    }

    #[test]
    fn test_collapsed_tree_shows_only_root() {
        let tree = sample();
        assert_eq!(tree.visible_rows().len(), 2);
        assert_eq!(tree.render(), "▸ src/\n  README.md (2.0 KB)\n");
    }

    #[test]
    fn test_expand_shows_immediate_children() {
        let mut tree = sample();
        assert!(tree.expand("src"));

        let rows: Vec<_> = tree
            .visible_rows()
            .iter()
            .map(|r| (r.depth, r.node.path.clone()))
            .collect();
        assert_eq!(
            rows,
            vec![
                (0, "src".to_string()),
                (1, "src/bin".to_string()),
                (1, "src/lib.rs".to_string()),
                (0, "README.md".to_string()),
            ]
        );
        assert_eq!(
            tree.render(),
            "▾ src/\n  ▸ bin/\n    lib.rs (10 B)\n  README.md (2.0 KB)\n"
        );
    }

    #[test]
    fn test_expand_unloaded_directory_reports_fetch_needed() {
        let mut tree = sample();
        assert!(!tree.expand("src/bin"));
        assert!(!tree.is_expanded("src/bin"));
    }

    #[test]
    fn test_collapse_keeps_cache() {
        let mut tree = sample();
        tree.expand("src");
        tree.collapse("src");
        assert!(tree.is_loaded("src"));
        assert_eq!(tree.visible_rows().len(), 2);
        assert!(tree.expand("src"));
    }

    #[test]
    fn test_invalidate_collapses_directory() {
        let mut tree = sample();
        assert!(tree.expand("src"));
        tree.invalidate("src");

        assert!(!tree.is_loaded("src"));
        assert!(!tree.is_expanded("src"));
        assert_eq!(tree.render(), "▸ src/\n  README.md (2.0 KB)\n");
        assert!(!tree.expand("src"));
    }

    #[test]
    fn test_find_and_update_file() {
        let mut tree = sample();
        tree.update_file("src/lib.rs", "newsha", 99);
        let found = tree.find("src/lib.rs").unwrap();
        assert_eq!(found.sha, "newsha");
        assert_eq!(found.size, 99);
        assert!(tree.find("src/missing.rs").is_none());
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(parent_path("src/explorer/tree.rs"), "src/explorer");
        assert_eq!(parent_path("README.md"), "");
        assert_eq!(ancestors("a/b/c"), vec!["a", "a/b", "a/b/c"]);
        assert!(ancestors("").is_empty());
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[tokio::test]
    async fn test_load_tree_depth() {
        let api = FakeApi::new(&["main"])
            .with_file("main", "README.md", "hi")
            .with_file("main", "src/lib.rs", "")
            .with_file("main", "src/bin/cli.rs", "")
            .with_file("main", "src/bin/deep/x.rs", "");

        let tree = load_tree(&api, "", Some("main"), 2).await.unwrap();
        assert!(tree.is_expanded("src"));
        assert!(tree.is_loaded("src"));
        assert!(!tree.is_loaded("src/bin"));
        // root + one level below it
        assert_eq!(api.call_count(), 2);

        let tree = load_tree(&api, "src", Some("main"), 3).await.unwrap();
        assert_eq!(tree.root_path(), "src");
        assert!(tree.is_loaded("src/bin/deep"));
    }

    #[tokio::test]
    async fn test_load_tree_on_a_file_fails() {
        let api = FakeApi::new(&["main"]).with_file("main", "README.md", "hi");
        let err = load_tree(&api, "README.md", None, 1).await.unwrap_err();
        assert!(matches!(err, ApiError::NotADirectory(_)));
    }

    #[tokio::test]
    async fn test_nested_json_only_includes_expanded() {
        let api = FakeApi::new(&["main"])
            .with_file("main", "a/b.txt", "x")
            .with_file("main", "c.txt", "y");
        let tree = load_tree(&api, "", None, 2).await.unwrap();
        let json = serde_json::to_value(tree.to_nested()).unwrap();
        assert_eq!(json[0]["path"], "a");
        assert_eq!(json[0]["children"][0]["path"], "a/b.txt");
        assert!(json[1].get("children").is_none());
    }
}
