// src/github/mod.rs
// =============================================================================
// This module talks to the GitHub REST API.
//
// Submodules:
// - client: reqwest-based client for branches / contents / create-or-update
// - types: wire and domain types (TreeNode, Branch, FileContent...)
// - codec: base64 in and out of the Contents API
// - error: ApiError and its banner text
//
// The ContentsApi trait is the seam between the explorer and the network.
// The real implementation is GitHubClient; tests use an in-memory fake.
// =============================================================================

mod client;
mod codec;
mod error;
mod types;

#[cfg(test)]
pub mod fake;

pub use client::GitHubClient;
pub use error::ApiError;
pub use types::{
    short_sha, Branch, CommitResult, Contents, FileBody, FileContent, FileUpdate, NodeKind,
    TreeNode,
};

// The three calls the explorer needs from GitHub
//
// Everything is scoped to the repository the client was built
// for. `reference` is a branch name; None lets GitHub pick the default branch.
#[allow(async_fn_in_trait)]
pub trait ContentsApi {
    async fn list_branches(&self) -> Result<Vec<Branch>, ApiError>;

    async fn get_contents(&self, path: &str, reference: Option<&str>) -> Result<Contents, ApiError>;

    async fn put_contents(&self, update: &FileUpdate) -> Result<CommitResult, ApiError>;
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a trait here?
//    - The explorer only cares that *something* can list branches and
//      read/write files
//    - Tests plug in a fake that keeps files in a HashMap, no network needed
//
// 2. async fn in traits
//    - Supported directly since Rust 1.75
//    - We call these through generics (Session<A: ContentsApi>), never as
//      `dyn ContentsApi`, so we don't need the async-trait crate
//
// 3. Why `#[cfg(test)] pub mod fake`?
//    - The fake is compiled only for `cargo test`
//    - `pub` so the explorer's tests can reach it as crate::github::fake
// -----------------------------------------------------------------------------
