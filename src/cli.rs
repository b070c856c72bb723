// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// The repository and token are global options: each one can be given as a
// flag or picked up from the environment (GITHUB_TOKEN, GITHUB_OWNER,
// GITHUB_REPO). main.rs loads a `.env` file before parsing, so a local .env
// works too.
//
// Subcommands:
// - branches: list branches
// - tree: print the file tree (optionally several levels deep)
// - show: print one file
// - put: create or update one file
// - browse: interactive explorer/editor session
// =============================================================================

use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "repo-explorer",
    version,
    about = "Browse and edit a GitHub repository through the Contents API",
    long_about = "repo-explorer lists branches, walks a repository's file tree, shows file content \
                  and commits edits back to GitHub. Every save carries the file's content hash, \
                  so an edit never silently overwrites a change made by someone else."
)]
pub struct Cli {
    /// Personal access token used for every request
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Repository owner (user or organization)
    ///
    /// Can be omitted when --repo is given as owner/name or as a GitHub URL
    #[arg(long, env = "GITHUB_OWNER", global = true)]
    pub owner: Option<String>,

    /// Repository name, owner/name, or https://github.com/owner/name
    #[arg(long, env = "GITHUB_REPO", global = true)]
    pub repo: Option<String>,

    /// Base URL of the REST API (change it for GitHub Enterprise)
    #[arg(
        long,
        env = "GITHUB_API_URL",
        default_value = "https://api.github.com",
        global = true
    )]
    pub api_url: String,

    /// Log level written to stderr (off, error, warn, info, debug, trace)
    #[arg(long, env = "REPO_EXPLORER_LOG", default_value = "warn", global = true)]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the repository's branches
    ///
    /// Example: repo-explorer --repo rust-lang/rust branches
    Branches {
        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the file tree
    ///
    /// Example: repo-explorer tree --path src --depth 2
    Tree {
        /// Branch to read (defaults to the repository's default branch)
        #[arg(long, short)]
        branch: Option<String>,

        /// Directory to start from (defaults to the repository root)
        #[arg(long, default_value = "")]
        path: String,

        /// How many directory levels to expand (1 = just the starting directory)
        #[arg(long, default_value_t = 1)]
        depth: usize,

        /// Output JSON instead of an indented tree
        #[arg(long)]
        json: bool,
    },

    /// Print the content of one file
    ///
    /// Example: repo-explorer show README.md --branch dev
    Show {
        /// Path of the file inside the repository
        path: String,

        #[arg(long, short)]
        branch: Option<String>,

        /// Output the full snapshot (sha, size, encoding) as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create or update a file and commit it
    ///
    /// Content comes from --file, or from stdin when --file is absent.
    /// Without --sha or --create the current content hash is fetched first.
    ///
    /// Example: echo "hi" | repo-explorer put notes.txt -m "Add notes" --create
    Put {
        /// Path of the file inside the repository
        path: String,

        /// Commit message
        #[arg(long, short)]
        message: String,

        #[arg(long, short)]
        branch: Option<String>,

        /// Read the new content from this local file
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Content hash the update is based on
        #[arg(long, conflicts_with = "create")]
        sha: Option<String>,

        /// The file must not exist yet
        #[arg(long)]
        create: bool,
    },

    /// Interactive explorer: expand directories, open, edit and save files
    ///
    /// Type `help` inside the session for the list of commands
    Browse {
        /// Branch to start on (defaults to main, then master, then the first branch)
        #[arg(long, short)]
        branch: Option<String>,
    },
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What does `env = "GITHUB_TOKEN"` do?
//    - If --token isn't given on the command line, clap reads the variable
//    - `hide_env_values` stops `--help` from printing the token
//
// 2. What does `global = true` mean?
//    - The option may appear before or after the subcommand:
//      `repo-explorer --repo a/b tree` and `repo-explorer tree --repo a/b`
//
// 3. Why is log_level a LevelFilter and not a String?
//    - LevelFilter implements FromStr, so clap parses and validates it for us
//    - A typo like `--log-level dbug` is rejected before the program runs
// -----------------------------------------------------------------------------
