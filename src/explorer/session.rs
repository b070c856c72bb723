// src/explorer/session.rs
// =============================================================================
// All of the explorer's UI state in one struct.
//
// What it holds:
// - the branch list and the branch being browsed
// - the lazily loaded FileTree
// - a per-path cache of file snapshots for the current branch
// - the selected file and, while editing, an EditBuffer
// - a banner: the last error or status message
//
// Rules:
// - Network failures never escape a method. They are logged and turned into
//   the banner, and the state stays as it was before the call.
// - Switching branch throws tree, caches and buffer away wholesale.
// - A save sends the content hash the edit started from. If GitHub says the
//   file moved on, the buffer is kept so nothing typed is lost.
// =============================================================================

use log::{info, warn};
use std::collections::HashMap;
use std::fmt;

use super::tree::{ancestors, human_size, parent_path, FileTree};
use crate::github::{
    short_sha, ApiError, Branch, CommitResult, Contents, ContentsApi, FileBody, FileContent,
    FileUpdate, TreeNode,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    Info(String),
    Error(String),
}

impl fmt::Display for Banner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Banner::Info(text) | Banner::Error(text) => f.write_str(text),
        }
    }
}

// Working copy of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBuffer {
    pub path: String,
    /// Content hash the edit is based on; None for a file that doesn't exist yet
    pub base_sha: Option<String>,
    pub text: String,
    original: String,
}

impl EditBuffer {
    fn from_snapshot(file: &FileContent, text: &str) -> Self {
        EditBuffer {
            path: file.path.clone(),
            base_sha: Some(file.sha.clone()),
            text: text.to_string(),
            original: text.to_string(),
        }
    }

    fn new_file(path: &str) -> Self {
        EditBuffer {
            path: path.to_string(),
            base_sha: None,
            text: String::new(),
            original: String::new(),
        }
    }

    pub fn is_new(&self) -> bool {
        self.base_sha.is_none()
    }

    pub fn is_dirty(&self) -> bool {
        self.text != self.original
    }

    // Count of lines that differ position by position
    pub fn changed_lines(&self) -> usize {
        let old: Vec<_> = self.original.lines().collect();
        let new: Vec<_> = self.text.lines().collect();
        let common = old.iter().zip(&new).filter(|(a, b)| a != b).count();
        common + old.len().abs_diff(new.len())
    }
}

#[derive(Debug)]
pub struct Session<A> {
    api: A,
    title: String,
    branches: Vec<Branch>,
    branch: String,
    tree: FileTree,
    files: HashMap<String, FileContent>,
    selected: Option<String>,
    buffer: Option<EditBuffer>,
    banner: Option<Banner>,
}

impl<A: ContentsApi> Session<A> {
    // Loads the branch list and the root of the starting branch
    //
    // Unlike everything else this returns an error: with no branch and no
    // root listing there is nothing to show.
    pub async fn open(api: A, title: &str, preferred: Option<&str>) -> Result<Self, ApiError> {
        let branches = api.list_branches().await?;
        let branch = choose_branch(&branches, preferred)
            .ok_or_else(|| ApiError::NotFound(format!("{} has no branches", title)))?;
        let root = load_dir(&api, "", &branch).await?;
        info!("opened {} on {}", title, branch);

        Ok(Session {
            api,
            title: title.to_string(),
            branches,
            branch,
            tree: FileTree::new("", root),
            files: HashMap::new(),
            selected: None,
            buffer: None,
            banner: None,
        })
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn buffer(&self) -> Option<&EditBuffer> {
        self.buffer.as_ref()
    }

    pub fn selected_path(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_file(&self) -> Option<&FileContent> {
        self.selected.as_ref().and_then(|path| self.files.get(path))
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.buffer.as_ref().is_some_and(|b| b.is_new() || b.is_dirty())
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.banner = Some(Banner::Error(message));
    }

    pub fn set_info(&mut self, message: impl Into<String>) {
        self.banner = Some(Banner::Info(message.into()));
    }

    fn fail(&mut self, error: ApiError) {
        self.set_error(error.banner());
    }

    // Re-fetches the branch list
    pub async fn reload_branches(&mut self) -> bool {
        match self.api.list_branches().await {
            Ok(branches) => {
                self.branches = branches;
                self.banner = None;
                true
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    pub async fn switch_branch(&mut self, name: &str) -> bool {
        if name == self.branch {
            self.set_info(format!("Already on {}", name));
            return true;
        }
        if !self.branches.iter().any(|b| b.name == name) {
            self.set_error(format!("❌ unknown branch '{}' (try `branches`)", name));
            return false;
        }

        let root = match load_dir(&self.api, "", name).await {
            Ok(root) => root,
            Err(e) => {
                self.fail(e);
                return false;
            }
        };

        if self.has_unsaved_changes() {
            warn!("discarding unsaved edit while switching to {}", name);
        }
        self.branch = name.to_string();
        self.tree = FileTree::new("", root);
        self.files.clear();
        self.selected = None;
        self.buffer = None;
        self.set_info(format!("Switched to {}", name));
        info!("switched to {}", name);
        true
    }

    // Expands a directory, fetching it and any unloaded parents first
    pub async fn expand(&mut self, path: &str) -> bool {
        let path = path.trim_matches('/');
        if let Some(node) = self.tree.find(path) {
            if !node.is_dir() {
                self.fail(ApiError::NotADirectory(path.to_string()));
                return false;
            }
        }

        for dir in ancestors(path) {
            if !self.tree.is_loaded(&dir) {
                match load_dir(&self.api, &dir, &self.branch).await {
                    Ok(nodes) => self.tree.insert_children(&dir, nodes),
                    Err(e) => {
                        self.fail(e);
                        return false;
                    }
                }
            }
            self.tree.expand(&dir);
        }

        self.banner = None;
        true
    }

    pub fn collapse(&mut self, path: &str) {
        self.tree.collapse(path.trim_matches('/'));
        self.banner = None;
    }

    pub async fn toggle(&mut self, path: &str) -> bool {
        let path = path.trim_matches('/');
        if self.tree.is_expanded(path) {
            self.collapse(path);
            true
        } else {
            self.expand(path).await
        }
    }

    // Selects a path: directories expand, files are shown
    pub async fn select(&mut self, path: &str) -> bool {
        let path = path.trim_matches('/').to_string();
        if path.is_empty() {
            self.banner = None;
            return true;
        }
        if self.tree.find(&path).is_some_and(TreeNode::is_dir) {
            return self.expand(&path).await;
        }

        if let Some(buffer) = &self.buffer {
            if buffer.path != path && (buffer.is_new() || buffer.is_dirty()) {
                let message = format!(
                    "⚠️  unsaved changes to {}; `save` or `discard` first",
                    buffer.path
                );
                self.set_error(message);
                return false;
            }
        }

        if self.files.contains_key(&path) {
            self.selected = Some(path);
            self.banner = None;
            return true;
        }

        match self.api.get_contents(&path, Some(&self.branch)).await {
            Ok(Contents::File(file)) => {
                self.files.insert(path.clone(), file);
                self.selected = Some(path);
                self.banner = None;
                true
            }
            Ok(Contents::Dir(nodes)) => {
                self.tree.insert_children(&path, nodes);
                self.expand(&path).await
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    // Drops every cache and loads the root, the open directories and the
    // selected file again. An edit in progress keeps its text but moves onto
    // the fresh snapshot, so after a conflict `refresh` then `save` goes through.
    pub async fn refresh(&mut self) -> bool {
        let root = match load_dir(&self.api, "", &self.branch).await {
            Ok(root) => root,
            Err(e) => {
                self.fail(e);
                return false;
            }
        };

        let mut reopen: Vec<String> = self.tree.expanded_paths().map(str::to_string).collect();
        reopen.sort();
        self.tree = FileTree::new("", root);
        self.files.clear();

        // Parents sort before their children, so each listing is reachable
        for dir in reopen {
            if self.tree.find(&dir).is_none() {
                continue;
            }
            match load_dir(&self.api, &dir, &self.branch).await {
                Ok(nodes) => {
                    self.tree.insert_children(&dir, nodes);
                    self.tree.expand(&dir);
                }
                Err(e) => warn!("dropping {} from the tree: {}", dir, e),
            }
        }

        if let Some(path) = self.selected.clone() {
            match self.api.get_contents(&path, Some(&self.branch)).await {
                Ok(Contents::File(file)) => {
                    self.rebase_buffer(&file);
                    self.files.insert(path, file);
                }
                Ok(Contents::Dir(_)) => self.selected = None,
                // Deleted upstream while we were editing: saving recreates it
                Err(e) if e.is_not_found() && self.buffer.is_some() => {
                    if let Some(buffer) = self.buffer.as_mut().filter(|b| b.path == path) {
                        buffer.base_sha = None;
                        buffer.original.clear();
                    }
                }
                Err(e) => {
                    self.selected = None;
                    self.fail(e);
                    return false;
                }
            }
        }

        self.set_info(format!("Reloaded {}", self.branch));
        true
    }

    // Moves an edit on top of a freshly fetched snapshot
    //
    // The typed text stays, but the next save carries the new sha, so a
    // conflict can be resolved with `refresh` + `save`. A buffer with no
    // changes is simply dropped; it would only hold the old text.
    fn rebase_buffer(&mut self, file: &FileContent) {
        let clean = match &self.buffer {
            Some(buffer) if buffer.path == file.path => !buffer.is_new() && !buffer.is_dirty(),
            _ => return,
        };
        if clean {
            self.buffer = None;
            return;
        }
        if let Some(buffer) = self.buffer.as_mut() {
            info!(
                "rebasing edit of {} onto {}",
                buffer.path,
                short_sha(&file.sha)
            );
            buffer.base_sha = Some(file.sha.clone());
            buffer.original = file.text().unwrap_or_default().to_string();
        }
    }

    // Starts editing the selected file (no-op if already editing it)
    pub fn begin_edit(&mut self) -> bool {
        let Some(path) = self.selected.clone() else {
            self.set_error("❌ no file selected; `open <path>` first");
            return false;
        };
        if self.buffer.as_ref().is_some_and(|b| b.path == path) {
            return true;
        }

        let buffer = match self.files.get(&path) {
            Some(file) => match &file.body {
                FileBody::Text(text) => EditBuffer::from_snapshot(file, text),
                FileBody::Binary(_) => {
                    self.set_error(format!("❌ {} is binary and can't be edited", path));
                    return false;
                }
                FileBody::TooLarge => {
                    self.set_error(format!("❌ {} is too large to edit here", path));
                    return false;
                }
            },
            None => {
                self.set_error(format!("❌ {} is not loaded", path));
                return false;
            }
        };

        self.buffer = Some(buffer);
        self.banner = None;
        true
    }

    pub fn set_buffer(&mut self, text: impl Into<String>) -> bool {
        if !self.begin_edit() {
            return false;
        }
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.text = text.into();
        }
        true
    }

    pub fn append_line(&mut self, line: &str) -> bool {
        if !self.begin_edit() {
            return false;
        }
        if let Some(buffer) = self.buffer.as_mut() {
            if !buffer.text.is_empty() && !buffer.text.ends_with('\n') {
                buffer.text.push('\n');
            }
            buffer.text.push_str(line);
            buffer.text.push('\n');
        }
        true
    }

    // Starts a buffer for a file that doesn't exist yet
    pub fn new_file(&mut self, path: &str) -> bool {
        let path = path.trim_matches('/');
        if path.is_empty() {
            self.set_error("❌ `new` needs a file path");
            return false;
        }
        if self.tree.find(path).is_some() || self.files.contains_key(path) {
            self.set_error(format!("❌ {} already exists; `open` it instead", path));
            return false;
        }
        if self.has_unsaved_changes() {
            let pending = self.buffer.as_ref().map(|b| b.path.clone()).unwrap_or_default();
            self.set_error(format!("⚠️  unsaved changes to {}; `save` or `discard` first", pending));
            return false;
        }

        self.buffer = Some(EditBuffer::new_file(path));
        self.selected = Some(path.to_string());
        self.set_info(format!("New file {} (use set/append/load/edit, then save)", path));
        true
    }

    pub fn discard_edit(&mut self) {
        let Some(buffer) = self.buffer.take() else {
            self.set_info("Nothing to discard");
            return;
        };
        if buffer.is_new() {
            self.selected = None;
        }
        self.set_info(format!("Discarded changes to {}", buffer.path));
    }

    // Commits the edit buffer with the content hash it started from
    pub async fn save(&mut self, message: Option<&str>) -> Option<CommitResult> {
        let buffer = match &self.buffer {
            Some(buffer) => buffer.clone(),
            None => {
                self.set_error("❌ nothing to save; `edit` or `new <path>` first");
                return None;
            }
        };
        if !buffer.is_new() && !buffer.is_dirty() {
            self.set_info(format!("No changes to {}", buffer.path));
            return None;
        }

        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map_or_else(|| default_message(&buffer), str::to_string);
        let update = FileUpdate {
            path: buffer.path.clone(),
            branch: Some(self.branch.clone()),
            message,
            text: buffer.text,
            sha: buffer.base_sha,
        };

        match self.api.put_contents(&update).await {
            Ok(commit) => {
                self.apply_commit(update, &commit).await;
                Some(commit)
            }
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    async fn apply_commit(&mut self, update: FileUpdate, commit: &CommitResult) {
        let size = update.text.len() as u64;
        let name = update.path.rsplit('/').next().unwrap_or(&update.path).to_string();

        self.buffer = None;
        self.selected = Some(update.path.clone());
        self.files.insert(
            update.path.clone(),
            FileContent {
                name,
                path: update.path.clone(),
                sha: commit.content_sha.clone(),
                size,
                encoding: "base64".to_string(),
                body: FileBody::Text(update.text),
            },
        );

        if update.sha.is_some() {
            self.tree.update_file(&update.path, &commit.content_sha, size);
        } else {
            self.reveal_new_file(&update.path).await;
        }

        self.set_info(format!(
            "✅ Committed {} to {}: {}",
            short_sha(&commit.commit_sha),
            self.branch,
            update.path
        ));
    }

    // Makes a freshly created file show up in the tree
    //
    // The file may have created directories on its way (`new a/b/c.txt`
    // when `a` didn't exist), so the listing to reload is the one of the
    // nearest directory we already had loaded; the root always is. Every
    // directory from there down to the file's parent is then fetched and
    // expanded. A failure here only costs the display, the commit is done.
    async fn reveal_new_file(&mut self, path: &str) {
        let mut chain = ancestors(parent_path(path));
        let below = match chain.iter().rposition(|dir| self.tree.is_loaded(dir)) {
            Some(i) => chain.split_off(i),
            None => {
                chain.insert(0, String::new());
                chain
            }
        };

        for dir in below {
            self.tree.invalidate(&dir);
            match load_dir(&self.api, &dir, &self.branch).await {
                Ok(nodes) => {
                    self.tree.insert_children(&dir, nodes);
                    if !dir.is_empty() {
                        self.tree.expand(&dir);
                    }
                }
                Err(e) => {
                    warn!("could not reload {:?} after commit: {}", dir, e);
                    break;
                }
            }
        }
    }

    // Full screen: header, banner, tree, selected file
    pub fn render(&self) -> String {
        let mut out = format!("📦 {} @ {}\n", self.title, self.branch);
        if let Some(banner) = &self.banner {
            out.push_str(&format!("{}\n", banner));
        }
        out.push('\n');
        out.push_str(&self.tree.render());
        if self.selected.is_some() {
            out.push('\n');
            out.push_str(&self.render_selected());
        }
        out
    }

    pub fn render_selected(&self) -> String {
        let Some(path) = self.selected.as_deref() else {
            return "(no file selected)\n".to_string();
        };

        if let Some(buffer) = self.buffer.as_ref().filter(|b| b.path == path) {
            let state = match (buffer.is_new(), buffer.is_dirty()) {
                (true, _) => "new file".to_string(),
                (false, true) => format!("editing, {} line(s) changed", buffer.changed_lines()),
                (false, false) => "editing".to_string(),
            };
            return format!("── {} ({}) ──\n{}", path, state, numbered(&buffer.text));
        }

        match self.files.get(path) {
            Some(file) => {
                let header = format!(
                    "── {} · {} · {} ──\n",
                    path,
                    short_sha(&file.sha),
                    human_size(file.size)
                );
                let body = match &file.body {
                    FileBody::Text(text) => numbered(text),
                    FileBody::Binary(len) => format!("(binary file, {} bytes)\n", len),
                    FileBody::TooLarge => {
                        "(file too large to display through the Contents API)\n".to_string()
                    }
                };
                header + &body
            }
            None => format!("── {} ──\n(not loaded)\n", path),
        }
    }

    pub fn render_branches(&self) -> String {
        let mut out = String::new();
        for branch in &self.branches {
            let marker = if branch.name == self.branch { "*" } else { " " };
            let lock = if branch.protected { " 🔒" } else { "" };
            out.push_str(&format!(
                "{} {} {}{}\n",
                marker,
                short_sha(&branch.sha),
                branch.name,
                lock
            ));
        }
        out
    }

    pub fn status_line(&self) -> String {
        match &self.buffer {
            Some(b) if b.is_new() => format!("{}: new file, {} bytes", b.path, b.text.len()),
            Some(b) if b.is_dirty() => format!(
                "{}: {} line(s) changed since {}",
                b.path,
                b.changed_lines(),
                b.base_sha.as_deref().map(short_sha).unwrap_or("?")
            ),
            Some(b) => format!("{}: editing, no changes", b.path),
            None => "no edit in progress".to_string(),
        }
    }
}

// Branch to start on: the requested one, else main, else master, else the first
pub fn choose_branch(branches: &[Branch], preferred: Option<&str>) -> Option<String> {
    if let Some(name) = preferred {
        return Some(name.to_string());
    }
    ["main", "master"]
        .iter()
        .find(|name| branches.iter().any(|b| b.name == **name))
        .map(|name| name.to_string())
        .or_else(|| branches.first().map(|b| b.name.clone()))
}

async fn load_dir<A: ContentsApi>(api: &A, path: &str, branch: &str) -> Result<Vec<TreeNode>, ApiError> {
    match api.get_contents(path, Some(branch)).await? {
        Contents::Dir(nodes) => Ok(nodes),
        Contents::File(_) => Err(ApiError::NotADirectory(path.to_string())),
    }
}

fn default_message(buffer: &EditBuffer) -> String {
    if buffer.is_new() {
        format!("Create {}", buffer.path)
    } else {
        format!("Update {}", buffer.path)
    }
}

fn numbered(text: &str) -> String {
    if text.is_empty() {
        return "(empty)\n".to_string();
    }
    text.lines()
        .enumerate()
        .map(|(i, line)| format!("{:>4} │ {}\n", i + 1, line))
        .collect()
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why do the methods return bool instead of Result?
//    - A failed request is not a failure of the program: the session shows
//      it in the banner and waits for the next command
//    - The bool only tells the caller (the REPL, the tests) whether the
//      state changed
//
// 2. `Session<A: ContentsApi>`
//    - Generic over the API so tests run against FakeApi with no network
//    - The compiler makes one copy of Session per A (monomorphization),
//      so there is no dynamic dispatch cost
//
// 3. Borrowing around `self.buffer`
//    - Code like `let clean = match &self.buffer {..}` reads first and
//      mutates afterwards; holding `self.buffer.as_mut()` while also
//      assigning `self.buffer = None` would not compile
//
// 4. Content hashes as locks
//    - GitHub refuses a PUT whose `sha` isn't the file's current hash
//    - refresh() swaps the buffer's base hash for the new one, which is
//      the user saying "I've seen their change, write mine on top"
// -----------------------------------------------------------------------------
