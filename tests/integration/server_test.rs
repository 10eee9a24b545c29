use super::fakes::{FakeDevice, Fixture};
use lemon_server::core::telemetry::{DeviceKind, SensorKind, Telemetry};
use lemon_server::server::Server;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

const CPU: FakeDevice = (0, DeviceKind::Cpu, "Test CPU");

async fn start(fixture: &Fixture) -> (SocketAddr, JoinHandle<lemon_server::Result<()>>) {
    let telemetry = Telemetry::new(fixture.providers(), Handle::current()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = Server::from_listener(listener, telemetry, Duration::from_millis(200));
    let addr = server.local_addr().unwrap();
    (addr, tokio::spawn(server.run()))
}

fn fixture() -> Fixture {
    let fixture = Fixture::new();
    fixture
        .sensors
        .0
        .lock()
        .add(CPU, SensorKind::Load, "CPU Total", Some(12.0));
    fixture
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_root_serves_snapshot_json() {
    let fixture = fixture();
    let (addr, server) = start(&fixture).await;

    let response = reqwest::get(format!("http://{}/", addr)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    let keys: Vec<&str> = body
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    for key in [
        "cpuName",
        "gpuName",
        "totalMemory",
        "availableMemory",
        "cpuTemp",
        "cpuLoad",
        "gpuTemp",
        "gpuLoad",
        "gpuTotalVram",
        "gpuAvailVram",
        "currFps",
    ] {
        assert!(keys.contains(&key), "missing {}", key);
    }
    assert_eq!(body["cpuName"], "Test CPU");
    assert_eq!(body["cpuLoad"], 12.0);

    reqwest::get(format!("http://{}/exit", addr)).await.unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_path_is_not_found() {
    let fixture = fixture();
    let (addr, server) = start(&fixture).await;

    let response = reqwest::get(format!("http://{}/metrics", addr)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    reqwest::get(format!("http://{}/exit", addr)).await.unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reload_reports_sensor_count() {
    let fixture = fixture();
    let (addr, server) = start(&fixture).await;

    let body: serde_json::Value = reqwest::get(format!("http://{}/reload", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["sensors"], 1);
    assert_eq!(fixture.sensors.0.lock().resets, 1);

    reqwest::get(format!("http://{}/exit", addr)).await.unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_exit_stops_server_and_closes_sensors() {
    let fixture = fixture();
    fixture.foreground.focus(31);
    let (addr, server) = start(&fixture).await;

    reqwest::get(format!("http://{}/", addr)).await.unwrap();

    let response = reqwest::get(format!("http://{}/exit", addr)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();

    assert!(fixture.sensors.0.lock().closed);
    assert_eq!(fixture.frame_rate.running(), 0);
}
