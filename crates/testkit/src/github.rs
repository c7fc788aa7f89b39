//! A mock GitHub API and download host.
//!
//! One wiremock server answers tag listings, release listings and file
//! downloads out of a registry shared behind a reader/writer lock: request
//! handling takes read locks, registrations take the write lock, so tests can
//! keep registering while requests are in flight.

use parking_lot::RwLock;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate, matchers::any};

/// GitHub's default page size.
const DEFAULT_PER_PAGE: usize = 30;

#[derive(Debug, Clone)]
struct MockRelease {
    tag: String,
    draft: bool,
    prerelease: bool,
}

#[derive(Debug, Default)]
struct Registry {
    tags: HashMap<String, Vec<String>>,
    releases: HashMap<String, Vec<MockRelease>>,
    downloads: HashMap<String, Vec<u8>>,
    token: Option<String>,
}

fn repo_key(owner: &str, repo: &str) -> String {
    format!("{owner}/{repo}")
}

fn query_usize(request: &Request, key: &str) -> Option<usize> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .and_then(|(_, v)| v.parse().ok())
}

fn page<T: Clone>(items: &[T], request: &Request) -> Vec<T> {
    let per_page = query_usize(request, "per_page")
        .unwrap_or(DEFAULT_PER_PAGE)
        .max(1);
    let page = query_usize(request, "page").unwrap_or(1).max(1);
    items
        .iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .cloned()
        .collect()
}

struct RegistryResponder {
    registry: Arc<RwLock<Registry>>,
}

impl Respond for RegistryResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let registry = self.registry.read();
        let path = request.url.path();

        if let Some(rest) = path.strip_prefix("/repos/") {
            if let Some(expected) = &registry.token {
                let presented = request
                    .headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok());
                if presented != Some(format!("Bearer {expected}").as_str()) {
                    return ResponseTemplate::new(401)
                        .set_body_json(json!({"message": "Bad credentials"}));
                }
            }

            let parts: Vec<&str> = rest.split('/').collect();
            if let [owner, repo, kind] = parts.as_slice() {
                let key = repo_key(owner, repo);
                match *kind {
                    "tags" => {
                        let Some(tags) = registry.tags.get(&key) else {
                            return ResponseTemplate::new(404);
                        };
                        let body: Vec<_> = page(tags, request)
                            .into_iter()
                            .map(|name| json!({ "name": name }))
                            .collect();
                        return ResponseTemplate::new(200).set_body_json(body);
                    }
                    "releases" => {
                        let Some(releases) = registry.releases.get(&key) else {
                            return ResponseTemplate::new(404);
                        };
                        let body: Vec<_> = page(releases, request)
                            .into_iter()
                            .map(|r| {
                                json!({
                                    "tag_name": r.tag,
                                    "draft": r.draft,
                                    "prerelease": r.prerelease,
                                })
                            })
                            .collect();
                        return ResponseTemplate::new(200).set_body_json(body);
                    }
                    _ => {}
                }
            }
            return ResponseTemplate::new(404);
        }

        match registry.downloads.get(path) {
            Some(body) => ResponseTemplate::new(200).set_body_bytes(body.clone()),
            None => ResponseTemplate::new(404),
        }
    }
}

/// Mock GitHub server.
pub struct MockGitHub {
    server: MockServer,
    registry: Arc<RwLock<Registry>>,
}

impl std::fmt::Debug for MockGitHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockGitHub")
            .field("uri", &self.server.uri())
            .finish_non_exhaustive()
    }
}

impl MockGitHub {
    /// Start a server with an empty registry.
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let registry = Arc::new(RwLock::new(Registry::default()));
        Mock::given(any())
            .respond_with(RegistryResponder {
                registry: Arc::clone(&registry),
            })
            .mount(&server)
            .await;
        Self { server, registry }
    }

    /// Base URL, usable as both API and download host.
    #[must_use]
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Require `Authorization: Bearer <token>` on API requests.
    pub fn require_token(&self, token: impl Into<String>) {
        self.registry.write().token = Some(token.into());
    }

    /// Add a tag to `owner/repo`. Tags are listed in registration order.
    pub fn register_tag(&self, owner: &str, repo: &str, tag: impl Into<String>) {
        self.registry
            .write()
            .tags
            .entry(repo_key(owner, repo))
            .or_default()
            .push(tag.into());
    }

    /// Add a published release to `owner/repo`.
    pub fn register_release(&self, owner: &str, repo: &str, tag: impl Into<String>) {
        self.push_release(owner, repo, tag.into(), false, false);
    }

    /// Add a prerelease to `owner/repo`.
    pub fn register_prerelease(&self, owner: &str, repo: &str, tag: impl Into<String>) {
        self.push_release(owner, repo, tag.into(), false, true);
    }

    /// Add a draft release to `owner/repo`.
    pub fn register_draft(&self, owner: &str, repo: &str, tag: impl Into<String>) {
        self.push_release(owner, repo, tag.into(), true, false);
    }

    fn push_release(&self, owner: &str, repo: &str, tag: String, draft: bool, prerelease: bool) {
        self.registry
            .write()
            .releases
            .entry(repo_key(owner, repo))
            .or_default()
            .push(MockRelease {
                tag,
                draft,
                prerelease,
            });
    }

    /// Serve `body` at `path` and return its full URL.
    pub fn register_download(&self, path: &str, body: impl Into<Vec<u8>>) -> String {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        let url = format!("{}{path}", self.uri());
        self.registry.write().downloads.insert(path, body.into());
        url
    }

    /// Paths of every request received so far.
    pub async fn received_paths(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect()
    }
}
