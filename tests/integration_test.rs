//! Integration tests for courtops
//!
//! Each test starts an in-process mock backend on 127.0.0.1 that answers
//! from a table of canned responses and records every request it sees.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use courtops::agent::{AgentConsole, AgentMode, RunState, Submission, RUN_FAILED_MESSAGE};
use courtops::api::models::{ReportEntity, TicketStatus, TicketUpdate};
use courtops::download::{ObjectUrl, SaveSink};
use courtops::error::GENERIC_FAILURE_MESSAGE;
use courtops::reports::Period;
use courtops::{ApiClient, ClientError, CredentialStore, DownloadClient};

#[derive(Clone)]
struct Canned {
    status: u16,
    body: Vec<u8>,
    delay: Duration,
}

#[derive(Debug, Clone)]
struct Seen {
    method: String,
    path: String,
    authorization: Option<String>,
    content_type: Option<String>,
    body: String,
}

#[derive(Clone, Default)]
struct MockBackend {
    routes: Arc<Mutex<HashMap<(String, String), Canned>>>,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl MockBackend {
    fn respond(&self, method: &str, path: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.respond_after(method, path, status, body, Duration::ZERO);
    }

    fn respond_json(&self, method: &str, path: &str, body: Value) {
        self.respond(method, path, 200, body.to_string());
    }

    fn respond_after(
        &self,
        method: &str,
        path: &str,
        status: u16,
        body: impl Into<Vec<u8>>,
        delay: Duration,
    ) {
        self.routes.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            Canned {
                status,
                body: body.into(),
                delay,
            },
        );
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

async fn handle(
    State(mock): State<MockBackend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    mock.seen.lock().unwrap().push(Seen {
        method: method.to_string(),
        path: path.clone(),
        authorization: header_str(header::AUTHORIZATION),
        content_type: header_str(header::CONTENT_TYPE),
        body: String::from_utf8_lossy(&body).to_string(),
    });

    let canned = mock
        .routes
        .lock()
        .unwrap()
        .get(&(method.to_string(), path))
        .cloned();

    match canned {
        Some(canned) => {
            if !canned.delay.is_zero() {
                tokio::time::sleep(canned.delay).await;
            }
            let status = StatusCode::from_u16(canned.status).unwrap();
            (status, canned.body).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_backend(mock: MockBackend) -> (String, oneshot::Sender<()>) {
    let app = Router::new().fallback(handle).with_state(mock);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        let _ = server.await;
    });
    (format!("http://{}", addr), shutdown_tx)
}

fn case_row(id: i64, number: &str) -> Value {
    json!({
        "id": id,
        "case_number": number,
        "defendant_name": "J. Doe",
        "charge_type": "Speeding",
        "status": "open",
        "court": "Municipal Court",
        "courtroom": "2B",
        "judge": null,
        "filing_date": "2024-04-02",
        "hearing_date": null,
        "disposition_date": null,
        "fine_amount": 200.0,
        "amount_paid": 0.0
    })
}

#[tokio::test]
async fn test_login_then_authenticated_request() {
    let mock = MockBackend::default();
    mock.respond_json(
        "POST",
        "/auth/token",
        json!({"access_token": "tok-123", "token_type": "bearer"}),
    );
    mock.respond_json(
        "GET",
        "/cases/",
        json!([case_row(2, "MC-2024-0002"), case_row(1, "MC-2024-0001")]),
    );
    let (base, _shutdown) = spawn_backend(mock.clone()).await;

    let api = ApiClient::new(&base, CredentialStore::in_memory());
    api.login("supervisor", "password").await.unwrap();
    assert_eq!(api.credentials().get().as_deref(), Some("tok-123"));

    let cases = api.list_cases().await.unwrap();
    let numbers: Vec<_> = cases.iter().map(|c| c.case_number.as_str()).collect();
    assert_eq!(numbers, vec!["MC-2024-0002", "MC-2024-0001"]);

    let seen = mock.seen();
    assert_eq!(seen[0].path, "/auth/token");
    assert_eq!(seen[0].authorization, None);
    assert_eq!(
        seen[0].content_type.as_deref(),
        Some("application/x-www-form-urlencoded")
    );
    assert!(seen[0].body.contains("grant_type=password"));
    assert!(seen[0].body.contains("username=supervisor"));

    assert_eq!(seen[1].authorization.as_deref(), Some("Bearer tok-123"));
    assert_eq!(seen[1].content_type.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn test_failed_login_stores_nothing() {
    let mock = MockBackend::default();
    mock.respond("POST", "/auth/token", 401, r#"{"detail":"Incorrect username or password"}"#);
    let (base, _shutdown) = spawn_backend(mock).await;

    let api = ApiClient::new(&base, CredentialStore::in_memory());
    let err = api.login("clerk", "wrong").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(!api.credentials().is_present());
}

#[tokio::test]
async fn test_no_token_omits_authorization() {
    let mock = MockBackend::default();
    mock.respond_json("GET", "/tickets", json!([]));
    let (base, _shutdown) = spawn_backend(mock.clone()).await;

    let api = ApiClient::new(&base, CredentialStore::in_memory());
    assert!(api.list_tickets().await.unwrap().is_empty());

    let seen = mock.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].authorization, None);
}

#[tokio::test]
async fn test_logout_stops_sending_token() {
    let mock = MockBackend::default();
    mock.respond_json("GET", "/patches", json!([]));
    let (base, _shutdown) = spawn_backend(mock.clone()).await;

    let credentials = CredentialStore::in_memory();
    credentials.set("tok-1");
    let api = ApiClient::new(&base, credentials);
    api.list_patches().await.unwrap();
    api.logout();
    api.list_patches().await.unwrap();

    let seen = mock.seen();
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer tok-1"));
    assert_eq!(seen[1].authorization, None);
}

#[tokio::test]
async fn test_trailing_slash_base_url() {
    let mock = MockBackend::default();
    mock.respond_json("GET", "/inventory", json!([]));
    let (base, _shutdown) = spawn_backend(mock.clone()).await;

    let api = ApiClient::new(&format!("{}//", base), CredentialStore::in_memory());
    api.list_devices().await.unwrap();
    assert_eq!(mock.seen()[0].path, "/inventory");
}

#[tokio::test]
async fn test_non_success_status_is_api_error() {
    let mock = MockBackend::default();
    mock.respond("GET", "/tickets", 401, r#"{"detail":"Not authenticated"}"#);
    mock.respond("GET", "/inventory", 500, "Internal Server Error");
    let (base, _shutdown) = spawn_backend(mock).await;

    let api = ApiClient::new(&base, CredentialStore::in_memory());
    let unauthorized = api.list_tickets().await.unwrap_err();
    assert!(matches!(unauthorized, ClientError::Api { status: 401 }));
    assert!(unauthorized.is_unauthorized());

    let server = api.list_devices().await.unwrap_err();
    assert!(matches!(server, ClientError::Api { status: 500 }));
    assert_eq!(server.user_message(), GENERIC_FAILURE_MESSAGE);
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let mock = MockBackend::default();
    mock.respond("GET", "/cases/", 200, "<html>not json</html>");
    mock.respond_json("GET", "/tickets", json!({"unexpected": "shape"}));
    let (base, _shutdown) = spawn_backend(mock).await;

    let api = ApiClient::new(&base, CredentialStore::in_memory());
    assert!(matches!(api.list_cases().await, Err(ClientError::Parse(_))));
    assert!(matches!(api.list_tickets().await, Err(ClientError::Parse(_))));
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = ApiClient::new(&format!("http://{}", addr), CredentialStore::in_memory());
    let err = api.list_tickets().await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let mock = MockBackend::default();
    mock.respond_after("GET", "/agent/status", 200, "{}", Duration::from_secs(3));
    let (base, _shutdown) = spawn_backend(mock).await;

    let api = ApiClient::with_timeout(
        &base,
        CredentialStore::in_memory(),
        Some(Duration::from_millis(200)),
    )
    .unwrap();
    assert!(matches!(api.agent_status().await, Err(ClientError::Network(_))));
}

#[tokio::test]
async fn test_update_ticket_sends_patch() {
    let mock = MockBackend::default();
    mock.respond_json(
        "PATCH",
        "/tickets/42",
        json!({
            "id": 42,
            "title": "Printer jam",
            "description": "",
            "category": "hardware",
            "priority": "low",
            "status": "resolved",
            "created_at": "2024-05-01T10:00:00"
        }),
    );
    let (base, _shutdown) = spawn_backend(mock.clone()).await;

    let api = ApiClient::new(&base, CredentialStore::in_memory());
    let update = TicketUpdate {
        status: Some(TicketStatus::Resolved),
        ..Default::default()
    };
    let ticket = api.update_ticket(42, &update).await.unwrap();
    assert_eq!(ticket.status, "resolved");

    let seen = mock.seen();
    assert_eq!(seen[0].method, "PATCH");
    assert_eq!(
        serde_json::from_str::<Value>(&seen[0].body).unwrap(),
        json!({"status": "resolved"})
    );
}

#[tokio::test]
async fn test_download_saves_file_and_revokes_url() {
    let mock = MockBackend::default();
    mock.respond("GET", "/reports/monthly/2024-05/pdf", 200, b"%PDF-1.4 monthly".to_vec());
    let (base, _shutdown) = spawn_backend(mock.clone()).await;

    let dir = tempfile::tempdir().unwrap();
    let credentials = CredentialStore::in_memory();
    credentials.set("tok-dl");
    let downloads =
        DownloadClient::to_directory(ApiClient::new(&base, credentials), dir.path());

    let period = Period::parse("2024-05").unwrap();
    let saved = downloads.monthly_report_pdf(&period).await.unwrap();

    assert_eq!(saved, dir.path().join("monthly_operations_2024-05.pdf"));
    assert_eq!(std::fs::read(&saved).unwrap(), b"%PDF-1.4 monthly");
    assert_eq!(downloads.registry().live_count(), 0);
    assert_eq!(downloads.registry().revoked_count(), 1);

    let seen = mock.seen();
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer tok-dl"));
    assert_eq!(seen[0].content_type, None);
}

#[tokio::test]
async fn test_download_with_query_string() {
    let mock = MockBackend::default();
    mock.respond(
        "GET",
        "/reports/custom-query.csv?entity=devices",
        200,
        "asset_tag,type\nCT-001,laptop\n",
    );
    let (base, _shutdown) = spawn_backend(mock).await;

    let dir = tempfile::tempdir().unwrap();
    let downloads = DownloadClient::to_directory(
        ApiClient::new(&base, CredentialStore::in_memory()),
        dir.path(),
    );
    let saved = downloads
        .custom_query_csv(ReportEntity::Devices)
        .await
        .unwrap();
    assert_eq!(saved.file_name().unwrap(), "devices_report.csv");
}

#[tokio::test]
async fn test_download_failure_saves_nothing() {
    let mock = MockBackend::default();
    mock.respond("GET", "/reports/revenue-at-risk.csv", 401, "");
    let (base, _shutdown) = spawn_backend(mock).await;

    let dir = tempfile::tempdir().unwrap();
    let downloads = DownloadClient::to_directory(
        ApiClient::new(&base, CredentialStore::in_memory()),
        dir.path(),
    );

    let err = downloads.revenue_at_risk_csv().await.unwrap_err();
    assert!(matches!(err, ClientError::Download { status: Some(401), .. }));
    assert_eq!(err.user_message(), courtops::error::DOWNLOAD_FAILURE_MESSAGE);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    assert_eq!(downloads.registry().revoked_count(), 0);
}

struct ReadOnlySink;

impl SaveSink for ReadOnlySink {
    fn save(&self, _url: &ObjectUrl<'_>, _filename: &str) -> io::Result<PathBuf> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    }
}

struct CrashingSink;

impl SaveSink for CrashingSink {
    fn save(&self, _url: &ObjectUrl<'_>, _filename: &str) -> io::Result<PathBuf> {
        panic!("save dialog crashed");
    }
}

#[tokio::test]
async fn test_download_save_error_still_revokes_url() {
    let mock = MockBackend::default();
    mock.respond("GET", "/reports/revenue-at-risk.csv", 200, "case_number,balance\n");
    let (base, _shutdown) = spawn_backend(mock).await;

    let downloads = DownloadClient::new(
        ApiClient::new(&base, CredentialStore::in_memory()),
        Arc::new(ReadOnlySink),
    );

    let err = downloads
        .download("/reports/revenue-at-risk.csv", "revenue_at_risk.csv")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Download { status: None, .. }));
    assert_eq!(downloads.registry().live_count(), 0);
    assert_eq!(downloads.registry().revoked_count(), 1);
}

#[tokio::test]
async fn test_download_save_panic_still_revokes_url() {
    let mock = MockBackend::default();
    mock.respond("GET", "/reports/monthly/2024-05/pdf", 200, b"%PDF-1.4".to_vec());
    let (base, _shutdown) = spawn_backend(mock).await;

    let downloads = Arc::new(DownloadClient::new(
        ApiClient::new(&base, CredentialStore::in_memory()),
        Arc::new(CrashingSink),
    ));

    let task = {
        let downloads = downloads.clone();
        tokio::spawn(async move {
            downloads
                .download("/reports/monthly/2024-05/pdf", "monthly.pdf")
                .await
        })
    };
    let joined = task.await;
    assert!(joined.unwrap_err().is_panic());
    assert_eq!(downloads.registry().live_count(), 0);
    assert_eq!(downloads.registry().revoked_count(), 1);
}

#[tokio::test]
async fn test_preset_dry_run() {
    let mock = MockBackend::default();
    mock.respond_json(
        "POST",
        "/agent/run",
        json!({
            "summary": "Would refresh the case cache and triage 4 tickets.",
            "actions_taken": [
                {"tool": "refresh_case_cache", "args": {}, "result": {"dry_run": true}},
                {"tool": "generate_monthly_report", "args": {"period": "2024-05"}, "result": null}
            ],
            "artifact_paths": [],
            "dry_run": true
        }),
    );
    let (base, _shutdown) = spawn_backend(mock.clone()).await;

    let api = ApiClient::new(&base, CredentialStore::in_memory());
    let mut console = AgentConsole::new(AgentMode::Interactive, true);
    console.goal = "ignored for presets".to_string();

    let state = console
        .run(&api, Submission::Preset("daily_ops_demo".to_string()))
        .await;
    assert!(matches!(state, RunState::Settled(_)));

    let view = console.view(&api.reports_base()).unwrap();
    assert_eq!(view.dry_run_notice, Some("Dry run: no changes were made."));
    assert_eq!(view.actions.len(), 2);
    assert_eq!(view.actions[0].args, None);
    assert_eq!(view.actions[1].args.as_deref(), Some(r#"{"period":"2024-05"}"#));
    assert_eq!(view.actions[1].result, "null");
    assert!(view.artifacts.is_empty());

    let body: Value = serde_json::from_str(&mock.seen()[0].body).unwrap();
    assert_eq!(
        body,
        json!({"goal": "", "mode": "demo", "dry_run": true, "preset": "daily_ops_demo"})
    );
}

#[tokio::test]
async fn test_custom_run_with_blank_goal() {
    let mock = MockBackend::default();
    mock.respond_json(
        "POST",
        "/agent/run",
        json!({
            "summary": "",
            "actions_taken": [],
            "artifact_paths": ["reports/2024-05/monthly_operations_2024-05.pdf"],
            "dry_run": false
        }),
    );
    let (base, _shutdown) = spawn_backend(mock.clone()).await;

    let api = ApiClient::new(&base, CredentialStore::in_memory());
    let mut console = AgentConsole::new(AgentMode::Interactive, false);
    console.goal = "   ".to_string();
    console.run(&api, Submission::Custom).await;

    let view = console.view(&api.reports_base()).unwrap();
    assert_eq!(view.summary, "No summary.");
    assert_eq!(view.dry_run_notice, None);
    assert_eq!(
        view.artifacts[0].link,
        Some(format!("{}/reports/2024-05/pdf", base))
    );

    let body: Value = serde_json::from_str(&mock.seen()[0].body).unwrap();
    assert_eq!(
        body,
        json!({
            "goal": "Run daily operations demo.",
            "mode": "interactive",
            "dry_run": false,
            "preset": null
        })
    );
}

#[tokio::test]
async fn test_failed_run_shows_single_message() {
    let mock = MockBackend::default();
    mock.respond("POST", "/agent/run", 500, "boom");
    let (base, _shutdown) = spawn_backend(mock).await;

    let api = ApiClient::new(&base, CredentialStore::in_memory());
    let mut console = AgentConsole::default();
    console.run(&api, Submission::Custom).await;

    assert_eq!(console.error(), Some(RUN_FAILED_MESSAGE));
    assert!(console.result().is_none());
}
