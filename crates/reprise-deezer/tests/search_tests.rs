use reprise_deezer::{DeezerClient, DeezerError, QuotaRetryPolicy};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, max_retries: u32) -> DeezerClient {
    DeezerClient::builder()
        .base_url(server.uri())
        .min_request_interval(Duration::ZERO)
        .quota_retry_policy(QuotaRetryPolicy {
            backoff: Duration::from_millis(10),
            max_retries,
        })
        .build()
        .unwrap()
}

fn search_hit(title: &str, artist: &str) -> serde_json::Value {
    json!({
        "data": [
            {
                "id": 3135556,
                "title": title,
                "preview": "https://cdns-preview.dzcdn.net/stream/preview.mp3",
                "artist": { "id": 27, "name": artist }
            },
            {
                "id": 3135557,
                "title": "Another take",
                "preview": "",
                "artist": { "id": 28, "name": "Someone else" }
            }
        ],
        "total": 2
    })
}

fn quota_error() -> serde_json::Value {
    json!({
        "error": { "type": "Exception", "message": "Quota limit exceeded", "code": 4 }
    })
}

fn artists(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[tokio::test]
async fn test_search_returns_top_candidate() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Song A Artist X"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_hit("Song A", "Artist X")))
        .expect(1)
        .mount(&server)
        .await;

    let candidate = client(&server, 3)
        .search_top_match("Song A", &artists(&["Artist X"]))
        .await
        .unwrap()
        .expect("a candidate");

    assert_eq!(candidate.title, "Song A");
    assert_eq!(candidate.primary_artist_name, "Artist X");
    assert_eq!(
        candidate.preview_url.as_deref(),
        Some("https://cdns-preview.dzcdn.net/stream/preview.mp3")
    );
}

#[tokio::test]
async fn test_query_includes_every_artist() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Under Pressure Queen David Bowie"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(search_hit("Under Pressure", "Queen")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let candidate = client(&server, 3)
        .search_top_match("Under Pressure", &artists(&["Queen", "David Bowie"]))
        .await
        .unwrap();

    assert!(candidate.is_some());
}

#[tokio::test]
async fn test_empty_result_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [], "total": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let candidate = client(&server, 3)
        .search_top_match("Unreleased demo", &artists(&["Nobody"]))
        .await
        .unwrap();

    assert!(candidate.is_none());
}

#[tokio::test]
async fn test_quota_error_is_retried_once_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(quota_error()))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_hit("Song A", "Artist X")))
        .expect(1)
        .mount(&server)
        .await;

    let candidate = client(&server, 3)
        .search_top_match("Song A", &artists(&["Artist X"]))
        .await
        .unwrap();

    assert_eq!(candidate.unwrap().title, "Song A");
}

#[tokio::test]
async fn test_http_429_counts_as_quota_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_hit("Song A", "Artist X")))
        .mount(&server)
        .await;

    let candidate = client(&server, 1)
        .search_top_match("Song A", &artists(&["Artist X"]))
        .await
        .unwrap();

    assert!(candidate.is_some());
}

#[tokio::test]
async fn test_quota_retries_are_bounded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(quota_error()))
        .expect(3)
        .mount(&server)
        .await;

    let result = client(&server, 2)
        .search_top_match("Song A", &artists(&["Artist X"]))
        .await;

    match result {
        Err(DeezerError::QuotaRetriesExhausted { query, attempts }) => {
            assert_eq!(query, "Song A Artist X");
            assert_eq!(attempts, 3);
        }
        other => panic!("expected QuotaRetriesExhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_quota_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {
                "type": "OAuthException",
                "message": "Invalid OAuth access token.",
                "code": 300
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server, 5)
        .search_top_match("Song A", &artists(&["Artist X"]))
        .await;

    assert!(matches!(
        result,
        Err(DeezerError::ApiError { code: 300, .. })
    ));
}

#[tokio::test]
async fn test_access_token_is_forwarded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("access_token", "user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_hit("Song A", "Artist X")))
        .expect(1)
        .mount(&server)
        .await;

    let client = DeezerClient::builder()
        .base_url(server.uri())
        .access_token("user-token")
        .min_request_interval(Duration::ZERO)
        .build()
        .unwrap();

    let candidate = client
        .search_top_match("Song A", &artists(&["Artist X"]))
        .await
        .unwrap();

    assert!(candidate.is_some());
}

#[tokio::test]
async fn test_current_user_with_valid_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/me"))
        .and(query_param("access_token", "user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5,
            "name": "listener",
            "country": "FR"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user = DeezerClient::builder()
        .base_url(server.uri())
        .access_token("user-token")
        .min_request_interval(Duration::ZERO)
        .build()
        .unwrap()
        .current_user()
        .await
        .unwrap();

    assert_eq!(user.id, 5);
    assert_eq!(user.name, "listener");
}

#[tokio::test]
async fn test_revoked_token_is_an_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {
                "type": "OAuthException",
                "message": "Invalid OAuth access token.",
                "code": 300
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = DeezerClient::builder()
        .base_url(server.uri())
        .access_token("revoked")
        .min_request_interval(Duration::ZERO)
        .build()
        .unwrap()
        .current_user()
        .await
        .unwrap_err();

    assert!(err.is_auth_error(), "unexpected error {err:?}");
}
