// src/config.rs
// =============================================================================
// Turns the parsed CLI options into a validated RepoConfig.
//
// Supported repository forms:
//   --owner rust-lang --repo rust
//   --repo rust-lang/rust
//   --repo https://github.com/rust-lang/rust(.git)
// =============================================================================

use anyhow::{anyhow, bail, Context, Result};
use url::Url;

use crate::cli::Cli;

#[derive(Debug, Clone)]
pub struct RepoConfig {
    /// None means anonymous requests (public repositories only, low rate limit)
    pub token: Option<String>,
    pub owner: String,
    pub repo: String,
    pub api_base: Url,
}

impl RepoConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let repo = cli
            .repo
            .as_deref()
            .ok_or_else(|| anyhow!("no repository given; pass --repo or set GITHUB_REPO"))?;
        let (owner, repo) = parse_repo_spec(cli.owner.as_deref(), repo)?;

        let api_base = Url::parse(&cli.api_url)
            .with_context(|| format!("Invalid API URL '{}'", cli.api_url))?;
        if api_base.scheme() != "https" && api_base.scheme() != "http" {
            bail!("API URL must be http or https: {}", api_base);
        }

        // An empty GITHUB_TOKEN= line in .env should behave like no token
        let token = cli.token.clone().filter(|t| !t.trim().is_empty());

        Ok(RepoConfig {
            token,
            owner,
            repo,
            api_base,
        })
    }
}

// Works out (owner, repo) from --owner and --repo
fn parse_repo_spec(owner: Option<&str>, repo: &str) -> Result<(String, String)> {
    let repo = repo.trim();

    if repo.contains("github.com") {
        return parse_github_url(repo);
    }

    if let Some((o, r)) = repo.split_once('/') {
        return validate(o, r.trim_end_matches(".git"));
    }

    match owner {
        Some(owner) => validate(owner.trim(), repo),
        None => bail!("no owner given for '{}'; pass --owner or use owner/name", repo),
    }
}

// Parses a GitHub URL to extract owner and repository name
//
// Example:
//   "https://github.com/rust-lang/rust" -> ("rust-lang", "rust")
fn parse_github_url(url: &str) -> Result<(String, String)> {
    // Remove common prefixes
    let url = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");

    let path = url
        .strip_prefix("github.com/")
        .ok_or_else(|| anyhow!("Not a GitHub URL: {}", url))?;

    let mut parts = path.split('/');
    match (parts.next(), parts.next()) {
        (Some(owner), Some(repo)) => validate(owner, repo.trim_end_matches(".git")),
        _ => bail!("Invalid GitHub URL format: {}", url),
    }
}

fn validate(owner: &str, repo: &str) -> Result<(String, String)> {
    let ok = |s: &str| !s.is_empty() && !s.contains(char::is_whitespace);
    if !ok(owner) || !ok(repo) || repo.contains('/') {
        bail!("Invalid repository '{}/{}'", owner, repo);
    }
    Ok((owner.to_string(), repo.to_string()))
}
