//! End-to-end tests of the caller-facing operations against a mock upstream.

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use inboxkeeper_core::config::{UpstreamConfig, DEFAULT_USER_AGENT};
use inboxkeeper_core::portal::{InboxPortal, PortalError, LOGIN_REDIRECT};

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(204).append_header("set-cookie", "token=abc; Path=/"))
        .mount(server)
        .await;
}

fn portal(server: &MockServer) -> InboxPortal {
    InboxPortal::new(&UpstreamConfig::with_base_url(server.uri())).unwrap()
}

#[tokio::test]
async fn login_then_fetch_inbox() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/v3/users/ann/inbox"))
        .and(header("cookie", "token=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 2,
            "threads": [{"recipient": {"name": "Alice"}}, {"recipient": {"name": "Bob"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let portal = portal(&server);
    let grant = portal.login("ANN", "pw").await.unwrap();
    assert_eq!(grant.redirect, LOGIN_REDIRECT);
    assert_eq!(grant.username, "ann");

    let inbox = portal.inbox(Some(grant.token.as_str())).await.unwrap();
    assert_eq!(inbox.total, 2);
    let peers: Vec<String> = inbox.items.iter().filter_map(|t| t.peer_username()).collect();
    assert_eq!(peers, vec!["alice", "bob"]);

    // Wire shape: [threads, total, raw_pages]
    let wire = serde_json::to_value(&inbox).unwrap();
    assert_eq!(wire[1], 2);
    assert_eq!(wire[2][0]["threads"][0]["recipient"]["name"], "Alice");
}

#[tokio::test]
async fn bad_credentials_are_forbidden() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let portal = portal(&server);
    let err = portal.login("ann", "wrong").await.unwrap_err();
    assert!(matches!(err, PortalError::AuthenticationFailed));
    assert_eq!(err.status_code(), 403);
    assert!(portal.sessions().is_empty());
}

#[tokio::test]
async fn multi_page_inbox_is_flattened() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let second = format!("{}/api/v3/users/ann/inbox?offset=2", server.uri());
    Mock::given(method("GET"))
        .and(path("/api/v3/users/ann/inbox"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 3,
            "threads": [{"recipient": {"name": "Carol"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/users/ann/inbox"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 4,
            "threads": [{"recipient": {"name": "Alice"}}, {"recipient": {"name": "Bob"}}],
            "nextUrl": second
        })))
        .expect(1)
        .mount(&server)
        .await;

    let portal = portal(&server);
    let grant = portal.login("ann", "pw").await.unwrap();
    let inbox = portal.inbox(Some(grant.token.as_str())).await.unwrap();

    let peers: Vec<String> = inbox.items.iter().filter_map(|t| t.peer_username()).collect();
    assert_eq!(peers, vec!["alice", "bob", "carol"]);
    assert_eq!(inbox.total, 3);
    assert_eq!(inbox.raw_pages.len(), 2);

    let requests = server.received_requests().await.unwrap();
    let gets: Vec<&Request> = requests.iter().filter(|r| r.method.as_str() == "GET").collect();
    assert_eq!(gets.len(), 2);
    for request in gets {
        let agent = request.headers.get("user-agent").and_then(|v| v.to_str().ok());
        assert_eq!(agent, Some(DEFAULT_USER_AGENT));
    }
}

#[tokio::test]
async fn login_without_cookies_is_forbidden() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let portal = portal(&server);
    let err = portal.login("ann", "pw").await.unwrap_err();
    assert!(matches!(err, PortalError::AuthenticationFailed));
    assert!(portal.sessions().is_empty());
}

#[tokio::test]
async fn messages_fetch_each_peer_in_order() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    for peer in ["alice", "bob"] {
        Mock::given(method("GET"))
            .and(path(format!("/api/v3/users/ann/inbox/{}", peer)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 1,
                "messages": [{"id": 1, "body": format!("hi from {}", peer), "from": {"name": peer}}]
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let portal = portal(&server);
    let grant = portal.login("ann", "pw").await.unwrap();
    let threads = portal
        .messages(Some(grant.token.as_str()), "Alice,Bob")
        .await
        .unwrap();

    assert_eq!(threads.peers().collect::<Vec<_>>(), vec!["alice", "bob"]);
    let alice = threads.get("alice").unwrap();
    assert_eq!(alice.items.len(), 1);
    assert_eq!(alice.items[0][0].sender_name(), Some("alice"));

    let requests: Vec<Request> = server.received_requests().await.unwrap();
    let thread_paths: Vec<&str> = requests
        .iter()
        .map(|r| r.url.path())
        .filter(|p| p.contains("/inbox/"))
        .collect();
    assert_eq!(
        thread_paths,
        vec!["/api/v3/users/ann/inbox/alice", "/api/v3/users/ann/inbox/bob"]
    );
}

#[tokio::test]
async fn multi_page_thread_keeps_page_grouping() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let second = format!("{}/api/v3/users/ann/inbox/bob/older", server.uri());
    Mock::given(method("GET"))
        .and(path("/api/v3/users/ann/inbox/bob"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 3,
            "messages": [{"id": 3}, {"id": 2}],
            "nextUrl": second
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/users/ann/inbox/bob/older"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 3,
            "messages": [{"id": 1}],
            "nextUrl": ""
        })))
        .mount(&server)
        .await;

    let portal = portal(&server);
    let grant = portal.login("ann", "pw").await.unwrap();
    let threads = portal.messages(Some(grant.token.as_str()), "bob").await.unwrap();

    let bob = threads.get("bob").unwrap();
    let sizes: Vec<usize> = bob.items.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![2, 1]);
    assert_eq!(bob.raw_pages.len(), 2);
}

#[tokio::test]
async fn upstream_failure_maps_to_unavailable() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/v3/users/ann/inbox"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let portal = portal(&server);
    let grant = portal.login("ann", "pw").await.unwrap();
    let err = portal.inbox(Some(grant.token.as_str())).await.unwrap_err();
    assert!(matches!(err, PortalError::UpstreamUnavailable(_)));
    assert_eq!(err.status_code(), 502);
}

#[tokio::test]
async fn token_is_rejected_after_logout() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/v3/users/ann/inbox"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 0, "threads": []})))
        .expect(1)
        .mount(&server)
        .await;

    let portal = portal(&server);
    let grant = portal.login("ann", "pw").await.unwrap();
    let token = grant.token.as_str().to_string();
    portal.inbox(Some(&token)).await.unwrap();

    let logout = portal.logout(Some(&token));
    assert!(logout.invalidated);

    // A client that keeps presenting the old token is still turned away
    let err = portal.inbox(Some(&token)).await.unwrap_err();
    assert!(matches!(err, PortalError::NotAuthorized));
    assert!(portal.sessions().is_empty());
}

#[tokio::test]
async fn sessions_are_isolated_per_login() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let portal = portal(&server);
    let first = portal.login("ann", "pw").await.unwrap();
    let second = portal.login("ann", "pw").await.unwrap();
    assert_ne!(first.token, second.token);

    portal.logout(Some(first.token.as_str()));
    assert!(portal.sessions().get(&second.token).is_some());
}
