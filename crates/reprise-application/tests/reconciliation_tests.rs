use reprise_application::{ReconciliationEngine, ReportPresenter};
use reprise_deezer::{DeezerClient, QuotaRetryPolicy};
use reprise_domain::CertaintyVerdict;
use reprise_spotify::SpotifyClient;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn saved_track(id: &str, name: &str, artist: &str) -> serde_json::Value {
    json!({
        "added_at": "2023-01-01T00:00:00Z",
        "track": {
            "id": id,
            "name": name,
            "artists": [{ "id": format!("{id}-artist"), "name": artist }]
        }
    })
}

fn deezer_hit(title: &str, artist: &str) -> serde_json::Value {
    json!({
        "data": [{
            "id": 1,
            "title": title,
            "preview": "",
            "artist": { "id": 2, "name": artist }
        }],
        "total": 1
    })
}

async fn spotify_library(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/me/tracks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                saved_track("a1", "Song A", "Artist X"),
                saved_track("b2", "Song B", "Artist Y")
            ],
            "offset": 0,
            "next": null,
            "total": 2
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn clients(spotify: &MockServer, deezer: &MockServer) -> (SpotifyClient, DeezerClient) {
    let source = SpotifyClient::builder("spotify-token")
        .base_url(spotify.uri())
        .build()
        .unwrap();
    let destination = DeezerClient::builder()
        .base_url(deezer.uri())
        .min_request_interval(Duration::ZERO)
        .quota_retry_policy(QuotaRetryPolicy {
            backoff: Duration::from_millis(10),
            max_retries: 3,
        })
        .build()
        .unwrap();
    (source, destination)
}

#[tokio::test]
async fn test_reconciles_spotify_favorites_against_deezer() {
    let spotify = MockServer::start().await;
    let deezer = MockServer::start().await;
    spotify_library(&spotify).await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Song A Artist X"))
        .respond_with(ResponseTemplate::new(200).set_body_json(deezer_hit("Song A", "Artist X")))
        .expect(1)
        .mount(&deezer)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Song B Artist Y"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(deezer_hit("Song B (Remastered)", "Artist Y")),
        )
        .expect(1)
        .mount(&deezer)
        .await;

    let (source, destination) = clients(&spotify, &deezer);
    let engine = ReconciliationEngine::new(source, destination);
    let report = engine.run(-1, &CancellationToken::new()).await.unwrap();

    let counts = report.counts();
    assert_eq!((counts.sure, counts.not_sure, counts.not_found), (1, 1, 0));
    assert_eq!(report.results[0].verdict(), CertaintyVerdict::Sure);
    assert_eq!(report.results[1].verdict(), CertaintyVerdict::NotSure);
    assert!(ReportPresenter::summary(&report)
        .iter()
        .any(|line| line.starts_with("NOT_SURE tracks")));
}

#[tokio::test]
async fn test_quota_error_only_delays_the_affected_track() {
    let spotify = MockServer::start().await;
    let deezer = MockServer::start().await;
    spotify_library(&spotify).await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Song A Artist X"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "type": "Exception", "message": "Quota limit exceeded", "code": 4 }
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&deezer)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Song A Artist X"))
        .respond_with(ResponseTemplate::new(200).set_body_json(deezer_hit("Song A", "Artist X")))
        .expect(1)
        .mount(&deezer)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Song B Artist Y"))
        .respond_with(ResponseTemplate::new(200).set_body_json(deezer_hit("Song B", "Artist Y")))
        .expect(1)
        .mount(&deezer)
        .await;

    let (source, destination) = clients(&spotify, &deezer);
    let report = ReconciliationEngine::new(source, destination)
        .run(-1, &CancellationToken::new())
        .await
        .unwrap();

    let verdicts: Vec<_> = report.results.iter().map(|r| r.verdict()).collect();
    assert_eq!(verdicts, vec![CertaintyVerdict::Sure, CertaintyVerdict::Sure]);
}

#[tokio::test]
async fn test_unauthorized_source_aborts_before_searching() {
    let spotify = MockServer::start().await;
    let deezer = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me/tracks"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "status": 401, "message": "The access token expired" }
        })))
        .mount(&spotify)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(deezer_hit("x", "y")))
        .expect(0)
        .mount(&deezer)
        .await;

    let (source, destination) = clients(&spotify, &deezer);
    let result = ReconciliationEngine::new(source, destination)
        .run(-1, &CancellationToken::new())
        .await;

    assert!(result.is_err());
}
