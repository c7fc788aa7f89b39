//! Listing and download tests against the mock GitHub server.

use tokio_util::sync::CancellationToken;
use tooldeck_core::{Downloader, Error, Settings};
use tooldeck_testkit::MockGitHub;
use tooldeck_tools_github::{GitHubClient, HttpDownloader};

fn settings(gh: &MockGitHub, token: Option<&str>) -> Settings {
    Settings {
        github_api_url: gh.uri(),
        github_download_url: gh.uri(),
        github_token: token.map(str::to_string),
        http_timeout_secs: 10,
        ..Settings::default()
    }
}

// =============================================================================
// Listings
// =============================================================================

#[tokio::test]
async fn test_list_tags_follows_pages() {
    let gh = MockGitHub::start().await;
    for i in 0..250 {
        gh.register_tag("bufbuild", "buf", format!("v1.{i}.0"));
    }

    let client = GitHubClient::new(&settings(&gh, None)).unwrap();
    let tags = client
        .list_tags("bufbuild", "buf", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(tags.len(), 250);
    assert_eq!(tags[0], "v1.0.0");
    assert_eq!(tags[249], "v1.249.0");
    let pages = gh
        .received_paths()
        .await
        .iter()
        .filter(|p| p.ends_with("/tags"))
        .count();
    assert_eq!(pages, 3);
}

#[tokio::test]
async fn test_exact_page_multiple_fetches_empty_tail() {
    let gh = MockGitHub::start().await;
    for i in 0..100 {
        gh.register_tag("acme", "tool", format!("v{i}"));
    }
    let client = GitHubClient::new(&settings(&gh, None)).unwrap();
    let tags = client
        .list_tags("acme", "tool", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(tags.len(), 100);
    assert_eq!(gh.received_paths().await.len(), 2);
}

#[tokio::test]
async fn test_release_tags_skip_drafts() {
    let gh = MockGitHub::start().await;
    gh.register_release("bufbuild", "buf", "v1.27.0");
    gh.register_prerelease("bufbuild", "buf", "v1.28.0-rc1");
    gh.register_draft("bufbuild", "buf", "v1.29.0");

    let client = GitHubClient::new(&settings(&gh, None)).unwrap();
    let tags = client
        .list_release_tags("bufbuild", "buf", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(tags, vec!["v1.27.0", "v1.28.0-rc1"]);
}

#[tokio::test]
async fn test_token_is_sent() {
    let gh = MockGitHub::start().await;
    gh.register_tag("acme", "private", "v1.0.0");
    gh.require_token("t0ken");
    let cancel = CancellationToken::new();

    let anonymous = GitHubClient::new(&settings(&gh, None)).unwrap();
    let err = anonymous
        .list_tags("acme", "private", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Http { status: 401, .. }));

    let authed = GitHubClient::new(&settings(&gh, Some("t0ken"))).unwrap();
    assert_eq!(
        authed.list_tags("acme", "private", &cancel).await.unwrap(),
        vec!["v1.0.0"]
    );
}

#[tokio::test]
async fn test_unknown_repo_is_http_error_with_url() {
    let gh = MockGitHub::start().await;
    let client = GitHubClient::new(&settings(&gh, None)).unwrap();
    let err = client
        .list_tags("nobody", "nothing", &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        Error::Http { url, status } => {
            assert_eq!(status, 404);
            assert!(url.contains("/repos/nobody/nothing/tags"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_cancelled_listing() {
    let gh = MockGitHub::start().await;
    gh.register_tag("acme", "tool", "v1");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let client = GitHubClient::new(&settings(&gh, None)).unwrap();
    let err = client.list_tags("acme", "tool", &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
}

// =============================================================================
// Downloads
// =============================================================================

#[tokio::test]
async fn test_download_writes_file() {
    let gh = MockGitHub::start().await;
    let body = vec![7u8; 200_000];
    let url = gh.register_download("/bufbuild/buf/releases/download/v1.28.0/buf.tar.gz", body.clone());
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("buf.tar.gz");

    let downloader = HttpDownloader::new(&settings(&gh, None)).unwrap();
    downloader
        .download(&url, &dest, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), body);
    assert!(!dir.path().join("buf.tar.gz.part").exists());
}

#[tokio::test]
async fn test_download_overwrites_existing() {
    let gh = MockGitHub::start().await;
    let url = gh.register_download("/a.zip", b"fresh".to_vec());
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("a.zip");
    std::fs::write(&dest, "stale").unwrap();

    HttpDownloader::new(&settings(&gh, None))
        .unwrap()
        .download(&url, &dest, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "fresh");
}

#[tokio::test]
async fn test_download_404_leaves_nothing() {
    let gh = MockGitHub::start().await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("missing.zip");
    let url = format!("{}/missing.zip", gh.uri());

    let err = HttpDownloader::new(&settings(&gh, None))
        .unwrap()
        .download(&url, &dest, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Http { status: 404, .. }));
    assert!(!dest.exists());
    assert!(!dir.path().join("missing.zip.part").exists());
}
