use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use usdt_rates::api::rest::{self, ApiState};
use usdt_rates::health::HealthMonitor;
use usdt_rates::observability::metrics;

#[tokio::test]
async fn health_and_metrics_are_exposed() {
    let _ = metrics::register_metrics();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(ApiState { health: HealthMonitor::new(Duration::from_secs(3600)) });
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(rest::serve(listener, state, async move {
        let _ = stopped.await;
    }));

    let client = reqwest::Client::new();
    let health: serde_json::Value = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "Initializing");
    assert!(health["uptime_secs"].is_u64());

    let response = client.get(format!("http://{}/metrics", addr)).send().await.unwrap();
    assert!(response.status().is_success());
    let body = response.text().await.unwrap();
    assert!(body.contains("storage_connect_attempts_total"));

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}
