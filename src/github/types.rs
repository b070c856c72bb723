// src/github/types.rs
// =============================================================================
// Data types mirroring the GitHub REST resources we touch.
//
// Two flavours live here:
// - Wire types (`*Response`, `*Body`): exactly what GitHub sends/expects,
//   only used inside the client
// - Domain types (TreeNode, Branch, FileContent, CommitResult): what the rest
//   of the app works with
//
// None of these have a lifecycle of their own. They reflect the last
// successful fetch and get thrown away on navigation or branch switch.
// =============================================================================

use serde::{Deserialize, Serialize};

// What kind of entry a tree node is
//
// Maps to the `type` field of the Contents API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Regular file
    File,
    /// Directory (can be expanded)
    Dir,
    /// Symbolic link
    Symlink,
    /// Git submodule reference
    Submodule,
}

// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Entry name (e.g. "main.rs")
    pub name: String,
    /// Full path within the repository (e.g. "src/main.rs")
    pub path: String,
    /// File, directory, symlink or submodule
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Size in bytes (0 for directories)
    #[serde(default)]
    pub size: u64,
    /// Content hash of the blob or tree
    pub sha: String,
}

impl TreeNode {
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Dir
    }
}

// Directories first, then alphabetical
//
// GitHub returns listings sorted by name only, which puts `src/` between
// `README.md` and `tests.rs`. Every file browser groups directories on top.
pub fn sort_listing(nodes: &mut [TreeNode]) {
    nodes.sort_by(|a, b| {
        b.is_dir()
            .cmp(&a.is_dir())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

// A branch as we display it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    /// Head commit hash
    pub sha: String,
    pub protected: bool,
}

// GET /repos/{owner}/{repo}/branches item
#[derive(Debug, Deserialize)]
pub(crate) struct BranchResponse {
    pub name: String,
    pub commit: CommitRef,
    #[serde(default)]
    pub protected: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitRef {
    pub sha: String,
}

impl From<BranchResponse> for Branch {
    fn from(raw: BranchResponse) -> Self {
        Branch {
            name: raw.name,
            sha: raw.commit.sha,
            protected: raw.protected,
        }
    }
}

// What a file body turned out to be after decoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FileBody {
    /// Valid UTF-8, can be displayed and edited
    Text(String),
    /// Decoded fine but is not UTF-8 (holds the byte count)
    Binary(usize),
    /// Over the Contents API's inline limit, GitHub sent no content
    TooLarge,
}

// Snapshot of a single file at the time it was fetched
//
// `sha` is the optimistic-concurrency token: a save sends it back and
// GitHub refuses the write if the file moved on in the meantime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContent {
    pub name: String,
    pub path: String,
    pub sha: String,
    pub size: u64,
    /// Encoding tag as reported by GitHub ("base64", or "none" for big files)
    pub encoding: String,
    pub body: FileBody,
}

impl FileContent {
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            FileBody::Text(text) => Some(text),
            _ => None,
        }
    }
}

// Result of GET /contents/{path}: a directory listing or a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contents {
    Dir(Vec<TreeNode>),
    File(FileContent),
}

// Raw Contents API response before we know which shape it is
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ContentsResponse {
    Listing(Vec<TreeNode>),
    Item(ContentItem),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentItem {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub content: Option<String>,
    pub encoding: Option<String>,
}

// Everything needed to create or update one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
    pub path: String,
    /// None commits to the repository's default branch
    pub branch: Option<String>,
    pub message: String,
    pub text: String,
    /// Content hash being replaced; None creates a new file
    pub sha: Option<String>,
}

// PUT /contents/{path} request body
#[derive(Debug, Serialize)]
pub(crate) struct PutBody<'a> {
    pub message: &'a str,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PutResponse {
    pub content: Option<CommitRef>,
    pub commit: CommitRef,
}

// What a successful save hands back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitResult {
    pub path: String,
    /// New content hash of the file, the token for the next save
    pub content_sha: String,
    pub commit_sha: String,
}

// GitHub error bodies look like {"message": "...", "documentation_url": "..."}
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}

// First 7 characters, the way git abbreviates hashes
pub fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}
