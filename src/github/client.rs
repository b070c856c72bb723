// src/github/client.rs
// =============================================================================
// Thin wrapper around reqwest for the three endpoints we use:
//
//   GET /repos/{owner}/{repo}/branches
//   GET /repos/{owner}/{repo}/contents/{path}?ref={branch}
//   PUT /repos/{owner}/{repo}/contents/{path}
//
// Strategy:
// - One reqwest::Client with the GitHub headers baked in (connection pooling)
// - Every non-2xx response is turned into an ApiError using GitHub's own
//   `message` field so the banner says something useful
// - No retries, no rate-limit handling beyond what GitHub itself reports
// =============================================================================

use log::{debug, info};
use reqwest::{header, Client, Response, StatusCode};
use std::time::Duration;
use url::Url;

use super::codec::{classify, decode_content, encode_content};
use super::error::ApiError;
use super::types::{
    sort_listing, Branch, BranchResponse, CommitResult, ContentItem, Contents, ContentsResponse,
    ErrorBody, FileBody, FileContent, FileUpdate, NodeKind, PutBody, PutResponse,
};
use super::ContentsApi;
use crate::config::RepoConfig;

// GitHub caps per_page at 100
const PER_PAGE: usize = 100;

const USER_AGENT: &str = concat!("repo-explorer/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    api_base: Url,
    owner: String,
    repo: String,
}

impl GitHubClient {
    pub fn new(config: &RepoConfig) -> Result<Self, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            header::HeaderValue::from_static("2022-11-28"),
        );

        if let Some(token) = &config.token {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::Unauthorized("token contains invalid characters".into()))?;
            // Keeps the token out of Debug output
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(GitHubClient {
            http,
            api_base: config.api_base.clone(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
        })
    }

    // "owner/repo", used in titles and log lines
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    // Builds {api_base}/repos/{owner}/{repo}/{tail...}
    //
    // Each segment is pushed separately so the url crate percent-encodes
    // spaces, '#', '?' and friends inside file names while the '/' between
    // directories stays a real separator.
    fn repo_url<'a>(&self, tail: impl IntoIterator<Item = &'a str>) -> Result<Url, ApiError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.api_base.to_string()))?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repo.as_str()])
            .extend(tail);
        Ok(url)
    }

    fn contents_url(&self, path: &str) -> Result<Url, ApiError> {
        let segments = path.split('/').filter(|s| !s.is_empty());
        self.repo_url(std::iter::once("contents").chain(segments))
    }
}

impl ContentsApi for GitHubClient {
    async fn list_branches(&self) -> Result<Vec<Branch>, ApiError> {
        let url = self.repo_url(["branches"])?;
        let mut branches = Vec::new();
        let mut page = 1;

        // Keep asking until GitHub hands back a short page
        loop {
            debug!("GET {} page {}", url, page);
            let response = self
                .http
                .get(url.clone())
                .query(&[("per_page", PER_PAGE), ("page", page)])
                .send()
                .await?;
            let response = check(response, "branches").await?;

            let batch: Vec<BranchResponse> = response.json().await.map_err(|e| ApiError::Decode {
                path: "branches".to_string(),
                reason: e.to_string(),
            })?;
            let count = batch.len();
            branches.extend(batch.into_iter().map(Branch::from));

            if is_last_page(count) {
                break;
            }
            page += 1;
        }

        info!("{}: {} branch(es)", self.slug(), branches.len());
        Ok(branches)
    }

    async fn get_contents(&self, path: &str, reference: Option<&str>) -> Result<Contents, ApiError> {
        let url = self.contents_url(path)?;
        debug!("GET {} ref={:?}", url, reference);

        let mut request = self.http.get(url);
        if let Some(reference) = reference {
            request = request.query(&[("ref", reference)]);
        }
        let response = check(request.send().await?, path).await?;

        let parsed: ContentsResponse = response.json().await.map_err(|e| ApiError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        match parsed {
            ContentsResponse::Listing(mut nodes) => {
                sort_listing(&mut nodes);
                Ok(Contents::Dir(nodes))
            }
            ContentsResponse::Item(item) => Ok(Contents::File(decode_item(item)?)),
        }
    }

    async fn put_contents(&self, update: &FileUpdate) -> Result<CommitResult, ApiError> {
        let url = self.contents_url(&update.path)?;
        let body = PutBody {
            message: &update.message,
            content: encode_content(&update.text),
            branch: update.branch.as_deref(),
            sha: update.sha.as_deref(),
        };
        debug!("PUT {} sha={:?}", url, update.sha);

        let response = check(self.http.put(url).json(&body).send().await?, &update.path).await?;
        let parsed: PutResponse = response.json().await.map_err(|e| ApiError::Decode {
            path: update.path.clone(),
            reason: e.to_string(),
        })?;

        let content_sha = parsed.content.map(|c| c.sha).ok_or_else(|| ApiError::Decode {
            path: update.path.clone(),
            reason: "response has no content sha".to_string(),
        })?;

        info!("committed {} as {}", update.path, parsed.commit.sha);
        Ok(CommitResult {
            path: update.path.clone(),
            content_sha,
            commit_sha: parsed.commit.sha,
        })
    }
}

// Passes successful responses through, converts everything else
async fn check(response: Response, path: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(ApiError::from_status(status, path, error_message(status, &text)))
}

// A full page means there may be more; an empty one ends the loop too
fn is_last_page(count: usize) -> bool {
    count < PER_PAGE
}

// GitHub explains failures in a JSON `message` field. Proxies and outages
// answer with HTML or nothing at all, so fall back to the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|body| body.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string())
}

// Turns a single-item Contents API response into a FileContent
fn decode_item(item: ContentItem) -> Result<FileContent, ApiError> {
    if item.kind != NodeKind::File {
        return Err(ApiError::NotAFile(item.path));
    }

    let encoding = item.encoding.unwrap_or_else(|| "none".to_string());
    let raw = item.content.unwrap_or_default();

    let body = match encoding.as_str() {
        // Files over 1 MB come back with encoding "none" and no content
        "none" => FileBody::TooLarge,
        "base64" => {
            let bytes = decode_content(&raw).map_err(|e| ApiError::Decode {
                path: item.path.clone(),
                reason: e.to_string(),
            })?;
            classify(bytes)
        }
        other => {
            return Err(ApiError::Decode {
                path: item.path,
                reason: format!("unsupported encoding '{}'", other),
            })
        }
    };

    Ok(FileContent {
        name: item.name,
        path: item.path,
        sha: item.sha,
        size: item.size,
        encoding,
        body,
    })
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. default_headers on the Client builder
//    - Every request built from `self.http` carries Accept, the API version
//      and the token, so the endpoint methods stay short
//    - `set_sensitive(true)` hides the token if the header map is printed
//
// 2. `url.path_segments_mut()`
//    - Returns Err(()) for URLs that can't have a path (e.g. "mailto:...")
//    - `.extend(...)` percent-encodes each segment for us; never format a
//      user-supplied path straight into a URL string
//
// 3. Pagination
//    - GitHub doesn't tell us the page count up front (only in the Link
//      header), so we ask for page 1, 2, 3... until a page comes back short
//
// 4. Error bodies
//    - `response.text()` consumes the response, which is fine: on an error
//      we never need the body again
//    - With `unwrap_or_default()` a body we can't read still
//      leaves us the status code to report
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_base: &str) -> GitHubClient {
        let config = RepoConfig {
            token: Some("secret".to_string()),
            owner: "octo".to_string(),
            repo: "hello world".to_string(),
            api_base: Url::parse(api_base).unwrap(),
        };
        GitHubClient::new(&config).unwrap()
    }

    fn item(kind: NodeKind, encoding: Option<&str>, content: Option<&str>) -> ContentItem {
        ContentItem {
            name: "a.txt".to_string(),
            path: "docs/a.txt".to_string(),
            sha: "abc".to_string(),
            size: 6,
            kind,
            content: content.map(str::to_string),
            encoding: encoding.map(str::to_string),
        }
    }

    #[test]
    fn test_contents_url_encodes_segments() {
        let url = client("https://api.github.com").contents_url("docs/my file#1.md").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/octo/hello%20world/contents/docs/my%20file%231.md"
        );
    }

    #[test]
    fn test_contents_url_root() {
        let url = client("https://api.github.com/").contents_url("").unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/repos/octo/hello%20world/contents");
    }

    #[test]
    fn test_enterprise_base_keeps_prefix() {
        let url = client("https://ghe.example.com/api/v3").repo_url(["branches"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/octo/hello%20world/branches"
        );
    }

    #[test]
    fn test_pagination_stops_on_short_page() {
        assert!(!is_last_page(100));
        assert!(is_last_page(37));
        assert!(is_last_page(0));
    }

    #[test]
    fn test_error_message_from_json_body() {
        let body = r#"{"message":"Bad credentials","documentation_url":"https://docs.github.com/rest"}"#;
        let message = error_message(StatusCode::UNAUTHORIZED, body);
        assert_eq!(message, "Bad credentials");

        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, "branches", message);
        assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Bad credentials"));
    }

    #[test]
    fn test_error_message_falls_back_to_status_reason() {
        let html = "<html><body>502 Bad Gateway</body></html>";
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, html), "Bad Gateway");
        assert_eq!(error_message(StatusCode::INTERNAL_SERVER_ERROR, ""), "Internal Server Error");
        assert_eq!(error_message(StatusCode::CONFLICT, r#"{"message":""}"#), "Conflict");
    }

    #[test]
    fn test_sha_mismatch_message_is_a_conflict() {
        let body = r#"{"message":"README.md does not match 3d21ec53a331a6f037a91c368710b99387d012c1"}"#;
        let message = error_message(StatusCode::CONFLICT, body);
        let err = ApiError::from_status(StatusCode::CONFLICT, "README.md", message);
        assert!(err.is_conflict());
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_decode_item_text() {
        let file = decode_item(item(NodeKind::File, Some("base64"), Some("aGVsbG8K\n"))).unwrap();
        assert_eq!(file.text(), Some("hello\n"));
        assert_eq!(file.sha, "abc");
    }

    #[test]
    fn test_decode_item_too_large() {
        let file = decode_item(item(NodeKind::File, Some("none"), Some(""))).unwrap();
        assert_eq!(file.body, FileBody::TooLarge);
    }

    #[test]
    fn test_decode_item_symlink_is_not_a_file() {
        let err = decode_item(item(NodeKind::Symlink, None, None)).unwrap_err();
        assert!(matches!(err, ApiError::NotAFile(_)));
    }
}
