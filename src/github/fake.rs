// src/github/fake.rs
// =============================================================================
// In-memory ContentsApi used by the explorer tests.
//
// Files are stored per branch as path -> (text, sha). Directory listings are
// derived from the file paths, the same way GitHub derives them from trees.
// Every call is recorded so tests can assert how many requests were made.
// =============================================================================

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use super::types::{sort_listing, FileBody};
use super::{
    ApiError, Branch, CommitResult, Contents, ContentsApi, FileContent, FileUpdate, NodeKind,
    TreeNode,
};

#[derive(Debug, Clone)]
struct FakeFile {
    text: String,
    sha: String,
}

#[derive(Debug, Default)]
pub struct FakeApi {
    branches: Vec<Branch>,
    files: RefCell<BTreeMap<(String, String), FakeFile>>,
    calls: RefCell<Vec<String>>,
    next_sha: RefCell<u32>,
    fail_next: RefCell<Option<ApiError>>,
}

impl FakeApi {
    pub fn new(branches: &[&str]) -> Self {
        FakeApi {
            branches: branches
                .iter()
                .map(|name| Branch {
                    name: name.to_string(),
                    sha: format!("head-{}", name),
                    protected: *name == "main",
                })
                .collect(),
            ..FakeApi::default()
        }
    }

    pub fn with_file(self, branch: &str, path: &str, text: &str) -> Self {
        let sha = self.mint_sha();
        self.files.borrow_mut().insert(
            (branch.to_string(), path.to_string()),
            FakeFile {
                text: text.to_string(),
                sha,
            },
        );
        self
    }

    // Simulates someone else pushing a change behind our back
    pub fn touch(&self, branch: &str, path: &str, text: &str) {
        let sha = self.mint_sha();
        if let Some(file) = self.files.borrow_mut().get_mut(&(branch.to_string(), path.to_string())) {
            file.text = text.to_string();
            file.sha = sha;
        }
    }

    pub fn fail_next(&self, error: ApiError) {
        *self.fail_next.borrow_mut() = Some(error);
    }

    pub fn text_of(&self, branch: &str, path: &str) -> Option<String> {
        self.files
            .borrow()
            .get(&(branch.to_string(), path.to_string()))
            .map(|f| f.text.clone())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    fn mint_sha(&self) -> String {
        let mut next = self.next_sha.borrow_mut();
        *next += 1;
        format!("{:040x}", *next)
    }

    fn record(&self, call: String) -> Result<(), ApiError> {
        self.calls.borrow_mut().push(call);
        match self.fail_next.borrow_mut().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn default_branch(&self) -> String {
        self.branches
            .first()
            .map(|b| b.name.clone())
            .unwrap_or_else(|| "main".to_string())
    }

    fn listing(&self, branch: &str, dir: &str) -> Vec<TreeNode> {
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };

        let files = self.files.borrow();
        let mut seen = BTreeSet::new();
        let mut nodes = Vec::new();

        for ((file_branch, path), file) in files.iter() {
            if file_branch != branch {
                continue;
            }
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            let (name, is_dir) = match rest.split_once('/') {
                Some((first, _)) => (first, true),
                None => (rest, false),
            };
            if !seen.insert(name.to_string()) {
                continue;
            }
            nodes.push(TreeNode {
                name: name.to_string(),
                path: format!("{}{}", prefix, name),
                kind: if is_dir { NodeKind::Dir } else { NodeKind::File },
                size: if is_dir { 0 } else { file.text.len() as u64 },
                sha: if is_dir {
                    format!("tree-{}{}", prefix, name)
                } else {
                    file.sha.clone()
                },
            });
        }

        sort_listing(&mut nodes);
        nodes
    }
}

impl ContentsApi for FakeApi {
    async fn list_branches(&self) -> Result<Vec<Branch>, ApiError> {
        self.record("branches".to_string())?;
        Ok(self.branches.clone())
    }

    async fn get_contents(&self, path: &str, reference: Option<&str>) -> Result<Contents, ApiError> {
        let branch = reference.map(str::to_string).unwrap_or_else(|| self.default_branch());
        self.record(format!("get {}@{}", path, branch))?;

        if let Some(file) = self.files.borrow().get(&(branch.clone(), path.to_string())) {
            let name = path.rsplit('/').next().unwrap_or(path).to_string();
            return Ok(Contents::File(FileContent {
                name,
                path: path.to_string(),
                sha: file.sha.clone(),
                size: file.text.len() as u64,
                encoding: "base64".to_string(),
                body: FileBody::Text(file.text.clone()),
            }));
        }

        let nodes = self.listing(&branch, path);
        if nodes.is_empty() && !path.is_empty() {
            return Err(ApiError::NotFound(path.to_string()));
        }
        Ok(Contents::Dir(nodes))
    }

    async fn put_contents(&self, update: &FileUpdate) -> Result<CommitResult, ApiError> {
        let branch = update.branch.clone().unwrap_or_else(|| self.default_branch());
        self.record(format!("put {}@{}", update.path, branch))?;

        let key = (branch, update.path.clone());
        let current = self.files.borrow().get(&key).map(|f| f.sha.clone());
        if current != update.sha {
            return Err(ApiError::Conflict {
                path: update.path.clone(),
                message: format!("expected {:?}, found {:?}", update.sha, current),
            });
        }

        let sha = self.mint_sha();
        self.files.borrow_mut().insert(
            key,
            FakeFile {
                text: update.text.clone(),
                sha: sha.clone(),
            },
        );
        let commit_sha = self.mint_sha();
        Ok(CommitResult {
            path: update.path.clone(),
            content_sha: sha,
            commit_sha,
        })
    }
}
