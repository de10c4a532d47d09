mod common;

use std::fs;

use chrono::NaiveDate;
use common::{events_path, fast_settings, StubServer};
use sofascore_ingest::{DataKind, IngestError};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn events_doc(id: u64) -> String {
    format!(r#"{{"events":[{{"id":{id},"tournament":{{"slug":"premier-league"}}}}]}}"#)
}

#[tokio::test]
async fn test_second_pass_sends_no_requests() {
    let docs = [events_doc(1), events_doc(2), events_doc(3)];
    let server = StubServer::start(vec![
        (events_path("2024-01-01").as_str(), vec![(200, docs[0].as_str())]),
        (events_path("2024-01-02").as_str(), vec![(200, docs[1].as_str())]),
        (events_path("2024-01-03").as_str(), vec![(200, docs[2].as_str())]),
    ])
    .await;
    let client = common::client(server.endpoints(), fast_settings());
    let dir = tempfile::tempdir().unwrap();

    let first = client
        .fetch_range(DataKind::Events, day(1), day(3), dir.path())
        .await
        .unwrap();
    assert_eq!(first.requested, 3);
    assert_eq!(first.saved, 3);
    assert!(first.failures.is_empty());
    assert_eq!(server.hits(), 3);

    let stored = fs::read_to_string(dir.path().join("2024-01-02.json")).unwrap();
    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored["events"][0]["id"], 2);

    let second = client
        .fetch_range(DataKind::Events, day(1), day(3), dir.path())
        .await
        .unwrap();
    assert_eq!(second.requested, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn test_unusable_days_are_reported_and_not_written() {
    let good = events_doc(7);
    let server = StubServer::start(vec![
        (events_path("2024-01-01").as_str(), vec![(200, good.as_str())]),
        (events_path("2024-01-02").as_str(), vec![(403, "<html>denied</html>")]),
        (
            events_path("2024-01-03").as_str(),
            vec![(200, r#"{"error":{"code":404,"message":"Not Found"}}"#)],
        ),
    ])
    .await;
    let client = common::client(server.endpoints(), fast_settings());
    let dir = tempfile::tempdir().unwrap();

    let report = client
        .fetch_range(DataKind::Events, day(1), day(3), dir.path())
        .await
        .unwrap();
    assert_eq!(report.saved, 1);
    assert_eq!(report.failures.len(), 2);

    let forbidden = &report.failures[0];
    assert_eq!(forbidden.key, "2024-01-02");
    assert!(matches!(
        forbidden.error,
        IngestError::Decode { status: 403, .. }
    ));
    let error_payload = &report.failures[1];
    assert_eq!(error_payload.key, "2024-01-03");
    assert!(matches!(
        error_payload.error,
        IngestError::Api { status: 200, .. }
    ));

    assert!(dir.path().join("2024-01-01.json").exists());
    assert!(!dir.path().join("2024-01-02.json").exists());
    assert!(!dir.path().join("2024-01-03.json").exists());
}

#[tokio::test]
async fn test_transient_status_is_retried() {
    let good = events_doc(9);
    let server = StubServer::start(vec![(
        events_path("2024-01-05").as_str(),
        vec![(503, "{}"), (429, "{}"), (200, good.as_str())],
    )])
    .await;
    let client = common::client(server.endpoints(), fast_settings());
    let dir = tempfile::tempdir().unwrap();

    let report = client
        .fetch_range(DataKind::Events, day(5), day(5), dir.path())
        .await
        .unwrap();
    assert_eq!(report.requested, 1);
    assert_eq!(report.saved, 1);
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn test_odds_use_their_own_endpoint() {
    let server = StubServer::start(vec![(
        "/api/v1/sport/football/odds/1/2024-01-01",
        vec![(200, r#"{"odds":{"11":{"choices":[]}}}"#)],
    )])
    .await;
    let client = common::client(server.endpoints(), fast_settings());
    let dir = tempfile::tempdir().unwrap();

    let report = client
        .fetch_range(DataKind::Odds, day(1), day(1), dir.path())
        .await
        .unwrap();
    assert_eq!(report.saved, 1);
    assert_eq!(
        server.requests(),
        vec!["/api/v1/sport/football/odds/1/2024-01-01".to_string()]
    );
}

#[tokio::test]
async fn test_reversed_range_is_rejected() {
    let server = StubServer::start(vec![]).await;
    let client = common::client(server.endpoints(), fast_settings());
    let dir = tempfile::tempdir().unwrap();

    let result = client
        .fetch_range(DataKind::Events, day(3), day(1), dir.path())
        .await;
    assert!(matches!(result, Err(IngestError::Config(_))));
    assert_eq!(server.hits(), 0);
}

#[tokio::test]
async fn test_id_kind_has_no_date_endpoint() {
    let server = StubServer::start(vec![]).await;
    let client = common::client(server.endpoints(), fast_settings());
    let dir = tempfile::tempdir().unwrap();

    let result = client
        .fetch_range(DataKind::Lineups, day(1), day(1), dir.path())
        .await;
    assert!(matches!(result, Err(IngestError::Config(_))));
}
