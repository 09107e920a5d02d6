//! Port over a hosted repository through the GitHub REST API.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{GitFlowError, PortError, Result};
use crate::git::{CommitId, MergeRef, VersionControlPort};

const DEFAULT_API_URL: &str = "https://api.github.com";
const PAGE_SIZE: usize = 100;
// annotated tags may point at other tag objects
const MAX_TAG_PEEL: usize = 5;

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Sha {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct BranchInfo {
    commit: Sha,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ObjectHolder {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct Comparison {
    status: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    number: u64,
    html_url: String,
}

impl From<PullRequest> for MergeRef {
    fn from(pr: PullRequest) -> Self {
        MergeRef {
            id: format!("#{}", pr.number),
            url: Some(pr.html_url),
        }
    }
}

#[derive(Debug, Serialize)]
struct NewPullRequest<'a> {
    title: String,
    head: &'a str,
    base: &'a str,
    body: String,
}

/// GitHub repository addressed as `owner/repo`.
///
/// Every request is bounded by the timeout given at construction.
pub struct GitHubRepository {
    client: Client,
    api_url: Url,
    owner: String,
    repo: String,
}

impl GitHubRepository {
    pub fn new(api_url: &str, repository: &str, token: &str, timeout: Duration) -> Result<Self> {
        let (owner, repo) = repository
            .split_once('/')
            .filter(|(o, r)| !o.is_empty() && !r.is_empty() && !r.contains('/'))
            .ok_or_else(|| {
                GitFlowError::event(format!(
                    "repository must be 'owner/repo', got '{}'",
                    repository
                ))
            })?;

        let api_url = Url::parse(api_url.trim_end_matches('/'))
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| GitFlowError::event(format!("invalid GitHub API URL '{}'", api_url)))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| GitFlowError::event("GitHub token contains invalid characters"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gitflow-guard/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| PortError::other(format!("cannot build HTTP client: {}", e)))?;

        Ok(GitHubRepository {
            client,
            api_url,
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Configure from `GITHUB_REPOSITORY`, `GITHUB_TOKEN` and `GITHUB_API_URL`.
    pub fn from_env(timeout: Duration) -> Result<Self> {
        let repository = std::env::var("GITHUB_REPOSITORY")
            .map_err(|_| GitFlowError::event("GITHUB_REPOSITORY is not set"))?;
        let token = std::env::var("GITHUB_TOKEN")
            .map_err(|_| GitFlowError::event("GITHUB_TOKEN is not set"))?;
        let api_url =
            std::env::var("GITHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        Self::new(&api_url, &repository, &token, timeout)
    }

    /// Endpoint URL under `repos/{owner}/{repo}`. Each `/`-separated part of
    /// `path` is percent-encoded, so `#`, `%` and `?` in ref names stay in the path.
    fn url(&self, path: &str) -> std::result::Result<Url, PortError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| PortError::other(format!("cannot build URL for {}", path)))?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repo.as_str()])
            .extend(path.split('/'));
        Ok(url)
    }

    fn send(&self, what: &str, request: RequestBuilder) -> std::result::Result<Response, PortError> {
        debug!(request = what, "GitHub API call");
        let response = request.send().map_err(|e| transport_error(what, e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(status_error(what, status, &body))
    }

    fn decode<T: DeserializeOwned>(what: &str, response: Response) -> std::result::Result<T, PortError> {
        response
            .json()
            .map_err(|e| PortError::other(format!("{}: unexpected response: {}", what, e)))
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> std::result::Result<T, PortError> {
        let what = format!("GET {}", path);
        let response = self.send(&what, self.client.get(self.url(path)?))?;
        Self::decode(&what, response)
    }

    /// Like [Self::get], with 404 meaning absent
    fn get_optional<T: DeserializeOwned>(&self, path: &str) -> std::result::Result<Option<T>, PortError> {
        match self.get(path) {
            Ok(value) => Ok(Some(value)),
            Err(PortError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<T, PortError> {
        let what = format!("POST {}", path);
        let response = self.send(&what, self.client.post(self.url(path)?).json(body))?;
        Self::decode(&what, response)
    }

    fn list_names(&self, path: &str) -> std::result::Result<Vec<String>, PortError> {
        let mut names = Vec::new();
        for page in 1.. {
            let what = format!("GET {} (page {})", path, page);
            let request = self
                .client
                .get(self.url(path)?)
                .query(&[("per_page", PAGE_SIZE), ("page", page)]);
            let batch: Vec<Named> = Self::decode(&what, self.send(&what, request)?)?;
            let done = batch.len() < PAGE_SIZE;
            names.extend(batch.into_iter().map(|n| n.name));
            if done {
                break;
            }
        }
        Ok(names)
    }
}

fn transport_error(what: &str, e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::Timeout(what.to_string())
    } else {
        PortError::other(format!("{}: {}", what, e))
    }
}

/// Map a non-success HTTP status onto the port's error kinds
fn status_error(what: &str, status: StatusCode, body: &str) -> PortError {
    let msg = format!(
        "{} returned {}: {}",
        what,
        status,
        body.chars().take(200).collect::<String>()
    );
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PortError::Unauthorized(msg),
        StatusCode::NOT_FOUND => PortError::NotFound(msg),
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => PortError::Conflict(msg),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => PortError::Timeout(msg),
        _ => PortError::Other(msg),
    }
}

/// Whether a compare status means the base is an ancestor of the head
fn base_is_ancestor(comparison_status: &str) -> bool {
    matches!(comparison_status, "ahead" | "identical")
}

impl VersionControlPort for GitHubRepository {
    fn list_tags(&self) -> std::result::Result<Vec<String>, PortError> {
        self.list_names("tags")
    }

    fn list_branches(&self) -> std::result::Result<Vec<String>, PortError> {
        self.list_names("branches")
    }

    fn branch_head(&self, branch: &str) -> std::result::Result<CommitId, PortError> {
        let info: BranchInfo = self.get(&format!("branches/{}", branch))?;
        Ok(CommitId::from(info.commit.sha))
    }

    fn find_tag_target(&self, tag: &str) -> std::result::Result<Option<CommitId>, PortError> {
        let Some(reference) = self.get_optional::<ObjectHolder>(&format!("git/ref/tags/{}", tag))?
        else {
            return Ok(None);
        };

        let mut object = reference.object;
        for _ in 0..MAX_TAG_PEEL {
            if object.kind != "tag" {
                return Ok(Some(CommitId::from(object.sha)));
            }
            let annotated: ObjectHolder = self.get(&format!("git/tags/{}", object.sha))?;
            object = annotated.object;
        }
        Err(PortError::other(format!("tag '{}' could not be peeled to a commit", tag)))
    }

    fn is_ancestor(
        &self,
        ancestor: &CommitId,
        descendant: &CommitId,
    ) -> std::result::Result<bool, PortError> {
        if ancestor == descendant {
            return Ok(true);
        }
        let comparison: Comparison = self.get(&format!("compare/{}...{}", ancestor, descendant))?;
        Ok(base_is_ancestor(&comparison.status))
    }

    fn create_tag(&self, name: &str, commit: &CommitId) -> std::result::Result<(), PortError> {
        match self.find_tag_target(name)? {
            Some(existing) if &existing == commit => {
                debug!(tag = name, "tag already present");
                return Ok(());
            }
            Some(existing) => {
                return Err(PortError::conflict(format!(
                    "tag '{}' already points at {}",
                    name,
                    existing.short()
                )))
            }
            None => {}
        }

        let tag_object: Sha = self.post(
            "git/tags",
            &json!({
                "tag": name,
                "message": name,
                "object": commit.as_str(),
                "type": "commit",
            }),
        )?;
        let created: std::result::Result<serde_json::Value, PortError> = self.post(
            "git/refs",
            &json!({ "ref": format!("refs/tags/{}", name), "sha": tag_object.sha }),
        );

        match created {
            Ok(_) => {
                info!(tag = name, commit = %commit, "created tag");
                Ok(())
            }
            // lost a race with a concurrent run; same target is still success
            Err(PortError::Conflict(msg)) => match self.find_tag_target(name)? {
                Some(existing) if &existing == commit => Ok(()),
                _ => Err(PortError::Conflict(msg)),
            },
            Err(e) => Err(e),
        }
    }

    fn open_merge(&self, from: &str, to: &str) -> std::result::Result<MergeRef, PortError> {
        let what = "GET pulls";
        let head = format!("{}:{}", self.owner, from);
        let request = self.client.get(self.url("pulls")?).query(&[
            ("state", "open"),
            ("base", to),
            ("head", head.as_str()),
        ]);
        let open: Vec<PullRequest> = Self::decode(what, self.send(what, request)?)?;
        if let Some(existing) = open.into_iter().next() {
            info!(from, to, number = existing.number, "merge request already open");
            return Ok(existing.into());
        }

        let created: PullRequest = self.post(
            "pulls",
            &NewPullRequest {
                title: format!("Forward-merge {} into {}", from, to),
                head: from,
                base: to,
                body: format!(
                    "Changes completed on {} that are to be merged back to {}.",
                    from, to
                ),
            },
        )?;
        info!(from, to, number = created.number, "opened merge request");
        Ok(created.into())
    }
}
