//! HealthAggregator fan-out.

use axum::http::StatusCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use switchyard_core::HealthStatus;
use switchyard_gateway::HealthHistory;

use crate::common::{McpBackend, Stub, aggregator, closed_endpoint, directory, hanging_endpoint};

#[tokio::test]
async fn test_two_healthy_one_timeout() {
    let a = McpBackend::spawn("a").await;
    let b = McpBackend::spawn("b").await;
    let slow = Stub::delayed(Duration::from_secs(10)).spawn().await;
    let directory = directory(&[("a", &a.endpoint), ("slow", &slow), ("b", &b.endpoint)]);

    let report = aggregator(&directory, Duration::from_millis(500))
        .check_all()
        .await;

    assert_eq!(report.total, 3);
    assert_eq!(report.healthy_count, 2);
    assert_eq!(report.unhealthy_count, 1);
    assert_eq!(report.healthy_percentage, 66.7);
    assert_eq!(report.exit_code(), 1);

    let slow = report.record("slow").unwrap();
    assert_eq!(slow.status, HealthStatus::Unreachable);
    assert!(slow.error.as_deref().unwrap().contains("timed out"));
    assert!(report.record("a").unwrap().response_time_ms.is_some());
}

#[tokio::test]
async fn test_closed_ports_count_as_unhealthy() {
    let a = McpBackend::spawn("a").await;
    let gone1 = closed_endpoint().await;
    let gone2 = closed_endpoint().await;
    let directory = directory(&[("gone1", &gone1), ("a", &a.endpoint), ("gone2", &gone2)]);

    let report = aggregator(&directory, Duration::from_secs(2)).check_all().await;
    assert_eq!(report.total, 3);
    assert_eq!(report.unhealthy_count, 2);
    assert_eq!(report.healthy_percentage, 33.3);
    assert_eq!(
        report.record("gone1").unwrap().status,
        HealthStatus::Unreachable
    );
}

#[tokio::test]
async fn test_non_200_is_unhealthy() {
    let sick = Stub::failing(StatusCode::SERVICE_UNAVAILABLE).spawn().await;
    let directory = directory(&[("sick", &sick)]);

    let report = aggregator(&directory, Duration::from_secs(2)).check_all().await;
    let record = &report.services[0];
    assert_eq!(record.status, HealthStatus::Unhealthy);
    assert_eq!(record.error.as_deref(), Some("HTTP 503"));
    assert!(record.response_time_ms.is_some());
}

#[tokio::test]
async fn test_probes_run_concurrently() {
    let mut endpoints = Vec::new();
    for _ in 0..5 {
        endpoints.push(Stub::delayed(Duration::from_millis(1500)).spawn().await);
    }
    let names = ["s1", "s2", "s3", "s4", "s5"];
    let servers: Vec<(&str, &str)> = names
        .iter()
        .zip(&endpoints)
        .map(|(n, e)| (*n, e.as_str()))
        .collect();
    let directory = directory(&servers);

    let started = Instant::now();
    let report = aggregator(&directory, Duration::from_secs(2)).check_all().await;
    let elapsed = started.elapsed();

    assert_eq!(report.healthy_count, 5);
    assert!(
        elapsed < Duration::from_secs(3),
        "fan-out took {elapsed:?}, expected about 1.5s"
    );
}

#[tokio::test]
async fn test_report_order_is_directory_order() {
    // Later entries answer first
    let slowest = Stub::delayed(Duration::from_millis(600)).spawn().await;
    let slower = Stub::delayed(Duration::from_millis(300)).spawn().await;
    let fastest = Stub::healthy().spawn().await;
    let directory = directory(&[("one", &slowest), ("two", &slower), ("three", &fastest)]);

    let report = aggregator(&directory, Duration::from_secs(2)).check_all().await;
    let names: Vec<&str> = report.services.iter().map(|r| r.service.as_str()).collect();
    assert_eq!(names, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn test_concurrency_cap_still_checks_everything() {
    let mut endpoints = Vec::new();
    for _ in 0..4 {
        endpoints.push(Stub::delayed(Duration::from_millis(100)).spawn().await);
    }
    let servers: Vec<(&str, &str)> = ["a", "b", "c", "d"]
        .iter()
        .zip(&endpoints)
        .map(|(n, e)| (*n, e.as_str()))
        .collect();
    let directory = directory(&servers);

    let report = aggregator(&directory, Duration::from_secs(2))
        .with_max_concurrency(1)
        .check_all()
        .await;
    assert_eq!(report.total, 4);
    assert_eq!(report.healthy_count, 4);
}

#[tokio::test]
async fn test_monitor_fills_history_until_stopped() {
    let a = McpBackend::spawn("a").await;
    let directory = directory(&[("a", &a.endpoint)]);
    let history = Arc::new(HealthHistory::new(3));

    let monitor = aggregator(&directory, Duration::from_secs(2))
        .spawn_monitor(Duration::from_millis(50), Arc::clone(&history));

    let deadline = Instant::now() + Duration::from_secs(5);
    while history.len() < 3 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    monitor.stop().await;

    assert_eq!(history.len(), 3);
    assert!(history.reports().iter().all(|r| r.healthy_count == 1));

    let frozen = history.latest().unwrap().timestamp;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(history.latest().unwrap().timestamp, frozen);
}

#[tokio::test]
async fn test_dropped_check_all_cancels_pending_checks() {
    let (hung, mut closed) = hanging_endpoint().await;
    let directory = directory(&[("hung", &hung)]);

    let outcome = tokio::time::timeout(
        Duration::from_millis(300),
        aggregator(&directory, Duration::from_secs(30)).check_all(),
    )
    .await;
    assert!(outcome.is_err());

    // The abandoned check closes its connection instead of waiting out 30s
    let seen = tokio::time::timeout(Duration::from_secs(5), closed.recv()).await;
    assert!(matches!(seen, Ok(Some(()))), "check kept running after drop");
}

#[tokio::test]
async fn test_stopping_monitor_cancels_hung_checks() {
    let (hung, mut closed) = hanging_endpoint().await;
    let directory = directory(&[("hung", &hung)]);
    let history = Arc::new(HealthHistory::default());

    let monitor = aggregator(&directory, Duration::from_secs(30))
        .spawn_monitor(Duration::from_secs(60), Arc::clone(&history));
    tokio::time::sleep(Duration::from_millis(300)).await;

    let started = Instant::now();
    monitor.stop().await;
    assert!(started.elapsed() < Duration::from_secs(2));

    let seen = tokio::time::timeout(Duration::from_secs(5), closed.recv()).await;
    assert!(matches!(seen, Ok(Some(()))), "check kept running after stop");
    assert!(history.is_empty());
}
