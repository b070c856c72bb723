// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Load a .env file (if any) and parse command-line arguments with clap
// 2. Set up logging and build the GitHub client
// 3. Dispatch to the subcommand handler
// 4. Exit with a proper code:
//      0 = success
//      1 = GitHub answered but the operation failed (not found, conflict...)
//      2 = internal or configuration error
// =============================================================================

mod cli;
mod config;
mod explorer;
mod github;

use anyhow::{bail, Context, Result};
use clap::Parser;
use dotenv::dotenv;
use log::{debug, info};
use simple_logger::SimpleLogger;
use std::path::Path;
use tokio::io::AsyncReadExt;

use cli::{Cli, Commands};
use config::RepoConfig;
use explorer::{human_size, load_tree, FileTree, Session};
use github::{short_sha, ApiError, ContentsApi, Contents, FileBody, FileUpdate, GitHubClient};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    // A missing .env file is fine, the variables may come from the shell
    let dotenv_path = dotenv().ok();
    let cli = Cli::parse();

    SimpleLogger::new()
        .with_level(cli.log_level)
        .init()
        .context("could not initialise logging")?;
    if let Some(path) = dotenv_path {
        debug!("loaded environment from {}", path.display());
    }

    let config = RepoConfig::from_cli(&cli)?;
    let client = GitHubClient::new(&config).context("could not build the HTTP client")?;
    info!("using {} at {}", client.slug(), config.api_base);

    let outcome = match cli.command {
        Commands::Branches { json } => handle_branches(&client, json).await?,
        Commands::Tree {
            branch,
            path,
            depth,
            json,
        } => handle_tree(&client, branch.as_deref(), &path, depth, json).await?,
        Commands::Show { path, branch, json } => {
            handle_show(&client, &path, branch.as_deref(), json).await?
        }
        Commands::Put {
            path,
            message,
            branch,
            file,
            sha,
            create,
        } => {
            let text = read_input(file.as_deref()).await?;
            let sha = if create { Some(None) } else { sha.map(Some) };
            handle_put(&client, &path, branch, message, text, sha).await?
        }
        Commands::Browse { branch } => handle_browse(client, branch.as_deref()).await?,
    };

    // GitHub-side failures are reported as a banner, not as an internal error
    Ok(match outcome {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}", e.banner());
            1
        }
    })
}

// Each handler returns Ok(Err(ApiError)) when GitHub refused the request,
// and Err(..) only for local failures such as bad JSON serialization.
type Outcome = std::result::Result<(), ApiError>;

async fn handle_branches(client: &GitHubClient, json: bool) -> Result<Outcome> {
    let branches = match client.list_branches().await {
        Ok(branches) => branches,
        Err(e) => return Ok(Err(e)),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&branches)?);
        return Ok(Ok(()));
    }

    println!("🌿 {} branch(es) in {}\n", branches.len(), client.slug());
    println!("{:<40} {:<10} {}", "BRANCH", "HEAD", "PROTECTED");
    println!("{}", "=".repeat(62));
    for branch in &branches {
        println!(
            "{:<40} {:<10} {}",
            branch.name,
            short_sha(&branch.sha),
            if branch.protected { "🔒 yes" } else { "no" }
        );
    }
    Ok(Ok(()))
}

async fn handle_tree(
    client: &GitHubClient,
    branch: Option<&str>,
    path: &str,
    depth: usize,
    json: bool,
) -> Result<Outcome> {
    let tree = match load_tree(client, path, branch, depth).await {
        Ok(tree) => tree,
        Err(e) => return Ok(Err(e)),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&tree.to_nested())?);
    } else {
        print_tree_header(client, &tree, branch);
        print!("{}", tree.render());
    }
    Ok(Ok(()))
}

fn print_tree_header(client: &GitHubClient, tree: &FileTree, branch: Option<&str>) {
    let location = if tree.root_path().is_empty() {
        "/".to_string()
    } else {
        format!("/{}", tree.root_path())
    };
    println!(
        "📂 {}{} @ {}\n",
        client.slug(),
        location,
        branch.unwrap_or("(default branch)")
    );
}

async fn handle_show(
    client: &GitHubClient,
    path: &str,
    branch: Option<&str>,
    json: bool,
) -> Result<Outcome> {
    let file = match client.get_contents(path, branch).await {
        Ok(Contents::File(file)) => file,
        Ok(Contents::Dir(_)) => return Ok(Err(ApiError::NotAFile(path.to_string()))),
        Err(e) => return Ok(Err(e)),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&file)?);
        return Ok(Ok(()));
    }

    match &file.body {
        // Plain text goes to stdout untouched so it can be piped
        FileBody::Text(text) => print!("{}", text),
        FileBody::Binary(len) => eprintln!("⚠️  {} is binary ({} bytes)", file.path, len),
        FileBody::TooLarge => eprintln!(
            "⚠️  {} is {} which is too large for the Contents API",
            file.path,
            human_size(file.size)
        ),
    }
    Ok(Ok(()))
}

// `sha` is:
//   None            -> look the current hash up first (update, or create if missing)
//   Some(None)      -> create, the file must not exist
//   Some(Some(sha)) -> update on top of exactly this hash
async fn handle_put<A: ContentsApi>(
    api: &A,
    path: &str,
    branch: Option<String>,
    message: String,
    text: String,
    sha: Option<Option<String>>,
) -> Result<Outcome> {
    let sha = match sha {
        Some(sha) => sha,
        None => match api.get_contents(path, branch.as_deref()).await {
            Ok(Contents::File(current)) => {
                if current.text() == Some(text.as_str()) {
                    println!("✅ {} is already up to date ({})", path, short_sha(&current.sha));
                    return Ok(Ok(()));
                }
                Some(current.sha)
            }
            Ok(Contents::Dir(_)) => return Ok(Err(ApiError::NotAFile(path.to_string()))),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Ok(Err(e)),
        },
    };

    let update = FileUpdate {
        path: path.to_string(),
        branch,
        message,
        text,
        sha,
    };
    let creating = update.sha.is_none();

    match api.put_contents(&update).await {
        Ok(commit) => {
            println!(
                "✅ {} {} in commit {} (content {})",
                if creating { "Created" } else { "Updated" },
                commit.path,
                short_sha(&commit.commit_sha),
                short_sha(&commit.content_sha)
            );
            Ok(Ok(()))
        }
        Err(e) => Ok(Err(e)),
    }
}

async fn handle_browse(client: GitHubClient, branch: Option<&str>) -> Result<Outcome> {
    let title = client.slug();
    let mut session = match Session::open(client, &title, branch).await {
        Ok(session) => session,
        Err(e) => return Ok(Err(e)),
    };
    explorer::run(&mut session).await?;
    Ok(Ok(()))
}

// New file content for `put`: a local file, or everything on stdin
async fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("could not read {}", path.display())),
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("could not read content from stdin")?;
            if text.is_empty() {
                bail!("no content given; pass --file or pipe the new content on stdin");
            }
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::fake::FakeApi;
    use pretty_assertions::assert_eq;

    fn repo() -> FakeApi {
        FakeApi::new(&["main", "dev"]).with_file("main", "README.md", "# Hello\n")
    }

    async fn put(api: &FakeApi, path: &str, text: &str, sha: Option<Option<String>>) -> Outcome {
        handle_put(api, path, None, "test".to_string(), text.to_string(), sha)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_put_looks_up_sha_then_updates() {
        let api = repo();
        assert!(put(&api, "README.md", "# Changed\n", None).await.is_ok());
        assert_eq!(api.text_of("main", "README.md").as_deref(), Some("# Changed\n"));
        assert_eq!(api.calls(), vec!["get README.md@main", "put README.md@main"]);
    }

    #[tokio::test]
    async fn test_put_missing_file_creates_it() {
        let api = repo();
        assert!(put(&api, "docs/new.md", "new\n", None).await.is_ok());
        assert_eq!(api.text_of("main", "docs/new.md").as_deref(), Some("new\n"));
    }

    #[tokio::test]
    async fn test_put_identical_content_is_a_no_op() {
        let api = repo();
        assert!(put(&api, "README.md", "# Hello\n", None).await.is_ok());
        assert_eq!(api.calls(), vec!["get README.md@main"]);
    }

    #[tokio::test]
    async fn test_put_create_on_existing_file_conflicts() {
        let api = repo();
        let outcome = put(&api, "README.md", "# Other\n", Some(None)).await;
        assert!(outcome.unwrap_err().is_conflict());
        assert_eq!(api.text_of("main", "README.md").as_deref(), Some("# Hello\n"));
    }

    #[tokio::test]
    async fn test_put_onto_directory_is_refused() {
        let api = repo().with_file("main", "docs/a.md", "a\n");
        let outcome = put(&api, "docs", "x", None).await;
        assert!(matches!(outcome, Err(ApiError::NotAFile(_))));
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn test_put_lookup_failure_is_reported() {
        let api = repo();
        api.fail_next(ApiError::Unauthorized("Bad credentials".to_string()));
        let outcome = put(&api, "README.md", "# Changed\n", None).await;
        assert!(matches!(outcome, Err(ApiError::Unauthorized(_))));
        assert_eq!(api.text_of("main", "README.md").as_deref(), Some("# Hello\n"));
    }
}
