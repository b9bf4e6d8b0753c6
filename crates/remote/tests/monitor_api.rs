//! Integration tests for `MonitorApi` against a canned local HTTP responder.

use assert_matches::assert_matches;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use vigil_remote::{ApiError, MonitorApi};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Serve exactly one request with the given status line and JSON body.
///
/// Returns the base URL and a handle resolving to the request line the
/// server saw.
async fn respond_once(
    status: &'static str,
    body: String,
) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/api", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 4096];
        let n = socket.read(&mut buf).await.unwrap();
        let request = String::from_utf8_lossy(&buf[..n]).to_string();

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();

        request.lines().next().unwrap_or_default().to_string()
    });

    (base_url, handle)
}

// ---------------------------------------------------------------------------
// Test: successful queries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_monitors_hits_versioned_endpoint() {
    let body = r#"[{"SystemMonitorId":"m1","ServiceName":"Web1"},{"SystemMonitorId":"m2"}]"#;
    let (base_url, server) = respond_once("200 OK", body.to_string()).await;

    let monitors = MonitorApi::new(base_url).list_monitors().await.unwrap();

    assert_eq!(monitors.len(), 2);
    assert_eq!(monitors[0].service_name, "Web1");
    assert_eq!(server.await.unwrap(), "GET /api/v1/systemmonitor HTTP/1.1");
}

#[tokio::test]
async fn list_plugins_parses_descriptors() {
    let body = r#"[{"Id":"http","Name":"HTTP","Description":"HTTP probe",
        "pluginType":"http_monitor","compatibleDeviceTypes":["Server"]}]"#;
    let (base_url, server) = respond_once("200 OK", body.to_string()).await;

    let plugins = MonitorApi::new(base_url).list_plugins().await.unwrap();

    assert_eq!(plugins[0].id, "http");
    assert_eq!(plugins[0].plugin_type, "http_monitor");
    assert_eq!(server.await.unwrap(), "GET /api/v1/Plugins HTTP/1.1");
}

// ---------------------------------------------------------------------------
// Test: error mapping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_success_status_maps_to_status_error() {
    let (base_url, server) = respond_once("404 Not Found", r#"{"error":"missing"}"#.to_string()).await;

    let result = MonitorApi::new(base_url).get_monitor("ghost").await;

    assert_matches!(
        result,
        Err(ApiError::Status { status: 404, body }) if body.contains("missing")
    );
    assert_eq!(server.await.unwrap(), "GET /api/v1/systemmonitor/ghost HTTP/1.1");
}

#[tokio::test]
async fn malformed_body_is_a_request_error() {
    let (base_url, _server) = respond_once("200 OK", "not json".to_string()).await;

    let result = MonitorApi::new(base_url).list_results().await;

    assert_matches!(result, Err(ApiError::Request(_)));
}
