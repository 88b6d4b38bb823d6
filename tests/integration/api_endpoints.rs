//! Read endpoint served by a fully started agent

use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::Value;
use sys_health::{
    agent::{Agent, RunningAgent},
    config::Settings,
    sources::SourceKind,
};

use crate::helpers::*;

async fn start_agent(procfs: &FakeProcfs, auth_token: Option<&str>) -> RunningAgent {
    let settings = Settings {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        source: SourceKind::Procfs,
        procfs_root: procfs.path().to_path_buf(),
        sample_interval_ms: 60_000,
        auth_token: auth_token.map(str::to_string),
        filesystem_mount: None,
        ..Default::default()
    };
    Agent::start(settings).await.unwrap()
}

#[tokio::test]
async fn test_report_lifecycle() {
    let procfs = FakeProcfs::new(Reading::default());
    let agent = start_agent(&procfs, None).await;
    let url = format!("http://{}/sys_health", agent.addr());

    let before = reqwest::get(&url).await.unwrap().text().await.unwrap();
    assert!(before.contains("no data yet"));

    agent.scheduler().tick_now().await.unwrap();

    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = response.text().await.unwrap();
    assert!(report.contains("Total RAM: 4096 MB"));
    assert!(report.contains("Memory Used: 25.00%"));
    assert!(report.contains("CPU Load Averages: 1 min: 0.52"));

    // reading does not change anything
    let again = reqwest::get(&url).await.unwrap().text().await.unwrap();
    assert_eq!(report, again);

    agent.shutdown().await;
}

#[tokio::test]
async fn test_json_routes() {
    let procfs = FakeProcfs::new(Reading::default());
    let agent = start_agent(&procfs, None).await;
    let base = format!("http://{}/api/v1", agent.addr());

    let response = reqwest::get(format!("{base}/snapshot")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    agent.scheduler().tick_now().await.unwrap();

    let snapshot: Value = reqwest::get(format!("{base}/snapshot"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(snapshot["tick"], 1);
    assert_eq!(snapshot["sample"]["memory_total_mb"], 4096);
    assert_eq!(snapshot["sample"]["cpu_busy_percent"], Value::Null);

    let health: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["scheduler"], "armed");

    agent.shutdown().await;
}

#[tokio::test]
async fn test_threshold_routes() {
    let procfs = FakeProcfs::new(Reading::default());
    let agent = start_agent(&procfs, None).await;
    let url = format!("http://{}/api/v1/thresholds", agent.addr());
    let client = reqwest::Client::new();

    let response = client
        .put(&url)
        .json(&serde_json::json!({ "memory_threshold_percent": 150.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .put(&url)
        .json(&serde_json::json!({ "memory_threshold_percent": 20.0, "disk_io_threshold": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let current: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(current["memory_threshold_percent"], 20.0);
    assert_eq!(current["disk_io_threshold"], 5);

    let outcome = agent.scheduler().tick_now().await.unwrap();
    assert_eq!(outcome.alerts.len(), 1);

    agent.shutdown().await;
}

#[tokio::test]
async fn test_auth_token_required() {
    let procfs = FakeProcfs::new(Reading::default());
    let agent = start_agent(&procfs, Some("test-token")).await;
    let url = format!("http://{}/sys_health", agent.addr());
    let client = reqwest::Client::new();

    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(&url)
        .bearer_auth("test-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    agent.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_releases_the_port() {
    let procfs = FakeProcfs::new(Reading::default());
    let agent = start_agent(&procfs, None).await;
    let addr = agent.addr();

    agent.shutdown().await;

    let result = reqwest::get(format!("http://{addr}/sys_health")).await;
    assert!(result.is_err());
    assert!(tokio::net::TcpListener::bind(addr).await.is_ok());
}
