// src/explorer/mod.rs
// =============================================================================
// The explorer: everything between the GitHub client and the terminal.
//
// Submodules:
// - tree: lazily loaded, memoized directory tree with expand/collapse
// - session: UI state (branch, tree, file cache, edit buffer, banner)
// - command: parsing of interactive commands
// - repl: the read / apply / render loop behind `browse`
// =============================================================================

mod command;
mod repl;
mod session;
mod tree;

pub use repl::run;
pub use session::Session;
pub use tree::{human_size, load_tree, FileTree};
