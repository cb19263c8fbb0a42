use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, Uri, header},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};
use stratus::config::Config;
use stratus::waiter::{
    ActivityWaiter, BackupJobWaiter, DetectionWaiter, DiskInventoryWaiter, FibonacciBackoff,
    GuestToolsWaiter, Poller, WaitContext,
};
use stratus::{ApiClient, OperationHandle, StratusError};
use tokio::net::TcpListener;
use url::Url;

/// Scripted backend: each path answers its queued responses in order, repeating the last one.
#[derive(Clone, Default)]
struct MockBackend {
    scripts: Arc<Mutex<HashMap<String, VecDeque<(StatusCode, Value)>>>>,
    reads: Arc<Mutex<HashMap<String, usize>>>,
    auth_hits: Arc<Mutex<usize>>,
    authorizations: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    fn script(&self, path: &str, responses: Vec<(StatusCode, Value)>) {
        self.scripts
            .lock()
            .expect("scripts lock")
            .insert(path.to_string(), responses.into());
    }

    fn reads(&self, path: &str) -> usize {
        self.reads
            .lock()
            .expect("reads lock")
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    fn auth_hits(&self) -> usize {
        *self.auth_hits.lock().expect("auth lock")
    }
}

async fn issue_token(State(state): State<MockBackend>, Json(body): Json<Value>) -> String {
    assert_eq!(body["id"], "client-1");
    assert_eq!(body["secret"], "secret-1");
    *state.auth_hits.lock().expect("auth lock") += 1;
    "tok-1".to_string()
}

async fn scripted(
    State(state): State<MockBackend>,
    headers: HeaderMap,
    uri: Uri,
) -> (StatusCode, Json<Value>) {
    let path = uri.path().to_string();
    if let Some(auth) = headers.get(header::AUTHORIZATION) {
        state
            .authorizations
            .lock()
            .expect("authorizations lock")
            .push(auth.to_str().unwrap_or_default().to_string());
    }
    *state
        .reads
        .lock()
        .expect("reads lock")
        .entry(path.clone())
        .or_default() += 1;

    let mut scripts = state.scripts.lock().expect("scripts lock");
    let Some(queue) = scripts.get_mut(&path) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "unknown" })));
    };
    let (status, body) = if queue.len() > 1 {
        queue.pop_front().expect("non-empty queue")
    } else {
        queue.front().cloned().expect("script must not be empty")
    };
    (status, Json(body))
}

async fn spawn_test_server(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let base = Url::parse(&format!("http://{}", addr)).expect("valid base url");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    base
}

async fn setup() -> (MockBackend, ApiClient) {
    let backend = MockBackend::default();
    let app = Router::new()
        .route("/auth", post(issue_token))
        .route("/activity/v1/activities/{id}", get(scripted))
        .route("/backup/v1/jobs/{id}", get(scripted))
        .route("/compute/v1/vcenters/virtual_disks/{id}", get(scripted))
        .route("/compute/v1/open_iaas/virtual_machines/{id}", get(scripted))
        .with_state(backend.clone());
    let base = spawn_test_server(app).await;

    let mut cfg = Config::default();
    cfg.api.base_url = base.clone();
    cfg.api.auth.token_url = base.join("/auth").expect("token url");
    cfg.api.auth.client_id = "client-1".to_string();
    cfg.api.auth.client_secret = "secret-1".to_string();

    let client = ApiClient::from_config(&cfg.api()).expect("client");
    (backend, client)
}

fn fast_poller() -> Poller {
    Poller::new(FibonacciBackoff::new(
        Duration::from_millis(10),
        Duration::from_millis(50),
    ))
}

fn handle(id: &str) -> OperationHandle {
    OperationHandle::new(id).expect("valid handle")
}

fn activity(id: &str, state: &str, fields: Value) -> Value {
    json!({
        "id": id,
        "tenantId": "tenant-1",
        "description": "Create virtual machine",
        "type": "ComputeActivity",
        "concernedItems": [{ "id": "vm-9", "type": "virtual_machine" }],
        "state": { state: fields },
    })
}

#[tokio::test]
async fn activity_completed_on_first_read() {
    let (backend, client) = setup().await;
    let path = "/activity/v1/activities/act-1";
    backend.script(
        path,
        vec![(
            StatusCode::OK,
            activity(
                "act-1",
                "completed",
                json!({ "result": "vm-9", "stopDate": "2024-01-01T00:00:00Z" }),
            ),
        )],
    );

    let waiter = ActivityWaiter::new(client, fast_poller());
    let done = waiter
        .wait(&WaitContext::new(), &handle("act-1"))
        .await
        .expect("activity should complete");

    assert!(done.is_completed());
    assert_eq!(done.concerned_item_id("virtual_machine"), Some("vm-9"));
    assert_eq!(backend.reads(path), 1);
    assert_eq!(backend.auth_hits(), 1);
    assert_eq!(
        backend.authorizations.lock().expect("lock").as_slice(),
        ["Bearer tok-1"]
    );
}

#[tokio::test]
async fn activity_failure_is_terminal_and_carries_reason() {
    let (backend, client) = setup().await;
    let path = "/activity/v1/activities/act-2";
    backend.script(
        path,
        vec![
            (StatusCode::OK, activity("act-2", "failed", json!({ "reason": "disk full" }))),
            (StatusCode::OK, activity("act-2", "completed", json!({}))),
        ],
    );

    let waiter = ActivityWaiter::new(client, fast_poller());
    let err = waiter
        .wait(&WaitContext::new(), &handle("act-2"))
        .await
        .expect_err("failed activity must not succeed");

    assert!(err.is_domain_failure());
    assert!(err.to_string().contains("disk full"), "got: {err}");
    assert_eq!(backend.reads(path), 1);
}

#[tokio::test]
async fn activity_not_visible_at_first_is_polled_until_completed() {
    let (backend, client) = setup().await;
    let path = "/activity/v1/activities/act-3";
    backend.script(
        path,
        vec![
            (StatusCode::NOT_FOUND, json!({ "message": "not found" })),
            (StatusCode::NOT_FOUND, json!({ "message": "not found" })),
            (StatusCode::OK, activity("act-3", "running", json!({ "progression": 40.0 }))),
            (StatusCode::OK, activity("act-3", "completed", json!({}))),
        ],
    );

    let waiter = ActivityWaiter::new(client, fast_poller());
    let done = waiter
        .wait(&WaitContext::new(), &handle("act-3"))
        .await
        .expect("activity should complete");

    assert_eq!(done.id, "act-3");
    assert_eq!(backend.reads(path), 4);
    assert_eq!(backend.auth_hits(), 1);
}

#[tokio::test]
async fn undecodable_activity_snapshot_is_polled_again() {
    let (backend, client) = setup().await;
    let path = "/activity/v1/activities/act-m";
    backend.script(
        path,
        vec![
            (StatusCode::OK, json!({ "id": "act-m", "state": ["running"] })),
            (StatusCode::OK, activity("act-m", "completed", json!({}))),
        ],
    );

    let waiter = ActivityWaiter::new(client, fast_poller());
    let done = waiter
        .wait(&WaitContext::new(), &handle("act-m"))
        .await
        .expect("a bad snapshot must not end the wait");

    assert!(done.is_completed());
    assert_eq!(backend.reads(path), 2);
}

#[tokio::test]
async fn read_maps_undecodable_body_to_malformed_snapshot() {
    let (backend, client) = setup().await;
    backend.script(
        "/activity/v1/activities/act-n",
        vec![(StatusCode::OK, json!({ "id": "act-n", "state": ["running"] }))],
    );

    let err = client
        .read_activity(&handle("act-n"))
        .await
        .expect_err("list-shaped state does not decode");

    match err {
        StratusError::MalformedSnapshot { kind, handle, .. } => {
            assert_eq!(kind, "activity");
            assert_eq!(handle, "act-n");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn activity_disappearing_after_being_seen_fails() {
    let (backend, client) = setup().await;
    let path = "/activity/v1/activities/act-4";
    backend.script(
        path,
        vec![
            (StatusCode::OK, activity("act-4", "running", json!({}))),
            (StatusCode::NOT_FOUND, json!({ "message": "not found" })),
        ],
    );

    let waiter = ActivityWaiter::new(client, fast_poller());
    let err = waiter
        .wait(&WaitContext::new(), &handle("act-4"))
        .await
        .expect_err("vanished activity must fail");

    assert!(matches!(err, StratusError::Vanished { .. }), "got: {err:?}");
    assert_eq!(backend.reads(path), 2);
}

#[tokio::test]
async fn unexpected_status_stops_polling() {
    let (backend, client) = setup().await;
    let path = "/activity/v1/activities/act-5";
    backend.script(
        path,
        vec![(StatusCode::INTERNAL_SERVER_ERROR, json!({ "message": "boom" }))],
    );

    let waiter = ActivityWaiter::new(client, fast_poller());
    let err = waiter
        .wait(&WaitContext::new(), &handle("act-5"))
        .await
        .expect_err("server error is terminal");

    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(backend.reads(path), 1);
}

#[tokio::test]
async fn concurrent_activity_waits_share_one_token() {
    let (backend, client) = setup().await;
    for id in ["act-a", "act-b", "act-c"] {
        backend.script(
            &format!("/activity/v1/activities/{id}"),
            vec![
                (StatusCode::OK, activity(id, "running", json!({}))),
                (StatusCode::OK, activity(id, "completed", json!({}))),
            ],
        );
    }

    let waiter = ActivityWaiter::new(client, fast_poller());
    let handles = [handle("act-a"), handle("act-b"), handle("act-c")];
    let done = waiter
        .wait_all(&WaitContext::new(), &handles)
        .await
        .expect("all activities complete");

    let ids: Vec<&str> = done.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, ["act-a", "act-b", "act-c"]);
    assert_eq!(backend.auth_hits(), 1);
}

#[tokio::test]
async fn cancelled_wait_returns_promptly() {
    let (backend, client) = setup().await;
    let path = "/activity/v1/activities/act-6";
    backend.script(path, vec![(StatusCode::OK, activity("act-6", "running", json!({})))]);

    let waiter = ActivityWaiter::new(
        client,
        Poller::new(FibonacciBackoff::new(
            Duration::from_secs(10),
            Duration::from_secs(30),
        )),
    );
    let ctx = WaitContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let err = waiter
        .wait(&ctx, &handle("act-6"))
        .await
        .expect_err("cancelled wait");

    assert!(matches!(err, StratusError::Cancelled), "got: {err:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(backend.reads(path), 1);
}

#[tokio::test]
async fn backup_job_waits_for_idle() {
    let (backend, client) = setup().await;
    let path = "/backup/v1/jobs/job-1";
    let job = |status: &str| json!({ "id": "job-1", "name": "nightly", "status": status });
    backend.script(
        path,
        vec![
            (StatusCode::OK, job("RUNNING")),
            (StatusCode::OK, job("RUNNING")),
            (StatusCode::OK, job("IDLE")),
        ],
    );

    let waiter = BackupJobWaiter::new(client, fast_poller());
    let done = waiter
        .wait(&WaitContext::new(), &handle("job-1"))
        .await
        .expect("job should finish");

    assert_eq!(done.status, "IDLE");
    assert_eq!(backend.reads(path), 3);
}

#[tokio::test]
async fn disk_forbidden_means_not_inventoried_yet() {
    let (backend, client) = setup().await;
    let path = "/compute/v1/vcenters/virtual_disks/disk-1";
    backend.script(
        path,
        vec![
            (StatusCode::FORBIDDEN, json!({ "message": "forbidden" })),
            (StatusCode::FORBIDDEN, json!({ "message": "forbidden" })),
            (
                StatusCode::OK,
                json!({
                    "id": "disk-1",
                    "name": "data",
                    "capacity": 10737418240_u64,
                    "virtualMachineId": "vm-9",
                }),
            ),
        ],
    );

    let waiter = DiskInventoryWaiter::new(client, fast_poller());
    let disk = waiter
        .wait(&WaitContext::new(), &handle("disk-1"))
        .await
        .expect("disk should appear");

    assert_eq!(disk.capacity, 10_737_418_240);
    assert_eq!(disk.virtual_machine_id.as_deref(), Some("vm-9"));
    assert_eq!(backend.reads(path), 3);
}

#[tokio::test]
async fn guest_tools_detection_stops_once_detected() {
    let (backend, client) = setup().await;
    let path = "/compute/v1/open_iaas/virtual_machines/vm-9";
    let vm = |detected: bool| {
        json!({
            "id": "vm-9",
            "name": "web",
            "powerState": "Running",
            "PVDrivers": { "detected": detected, "version": "9.3", "areUpToDate": true },
            "managementAgent": { "detected": detected },
        })
    };
    backend.script(
        path,
        vec![(StatusCode::OK, vm(false)), (StatusCode::OK, vm(true))],
    );

    let waiter = GuestToolsWaiter::new(
        client,
        DetectionWaiter::new(Duration::from_millis(20), Duration::from_secs(5)),
    );
    let detection = waiter
        .wait(&WaitContext::new(), &handle("vm-9"))
        .await
        .expect("detection should not error");

    assert!(detection.is_detected());
    assert_eq!(backend.reads(path), 2);
}

#[tokio::test]
async fn guest_tools_detection_timeout_is_soft() {
    let (backend, client) = setup().await;
    let path = "/compute/v1/open_iaas/virtual_machines/vm-10";
    backend.script(
        path,
        vec![(
            StatusCode::OK,
            json!({
                "id": "vm-10",
                "PVDrivers": { "detected": true },
                "managementAgent": { "detected": false },
            }),
        )],
    );

    let waiter = GuestToolsWaiter::new(
        client,
        DetectionWaiter::new(Duration::from_millis(20), Duration::from_millis(200)),
    );
    let detection = waiter
        .wait(&WaitContext::new(), &handle("vm-10"))
        .await
        .expect("timeout is not an error");

    assert!(!detection.is_detected());
    let vm = detection.into_snapshot().expect("last snapshot kept");
    assert!(vm.pv_drivers.detected);
    assert!(backend.reads(path) >= 2);
}
