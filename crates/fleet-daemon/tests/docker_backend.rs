//! DockerBackend against a local stub of the Docker Engine API

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use fleet_daemon::backend::{ContainerBackend, DockerBackend, RemoveOptions};
use fleet_daemon::BackendError;
use fleet_types::{ContainerId, Selector};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
enum Recorded {
    List(HashMap<String, String>),
    Create(Value),
    Start(String),
    Remove(String, HashMap<String, String>),
}

type Log = Arc<Mutex<Vec<Recorded>>>;

async fn list(State(log): State<Log>, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    log.lock().await.push(Recorded::List(query));
    Json(json!([
        {
            "Id": "8dfafdbc3a40",
            "Names": ["/web-1"],
            "Image": "nginx:1.25",
            "ImageID": "sha256:abc",
            "Command": "nginx -g 'daemon off;'",
            "Created": 1700000000,
            "State": "running",
            "Status": "Up 5 minutes",
            "Ports": [],
            "Labels": {"com.swarm.app": "web"}
        },
        {
            "Id": "9cd87474be90",
            "Names": null,
            "Image": "nginx:1.25",
            "Created": 1700000100,
            "Labels": null
        }
    ]))
}

async fn create(State(log): State<Log>, Json(body): Json<Value>) -> impl IntoResponse {
    log.lock().await.push(Recorded::Create(body));
    (
        StatusCode::CREATED,
        Json(json!({"Id": "e90e34656806", "Warnings": null})),
    )
}

async fn start(State(log): State<Log>, Path(id): Path<String>) -> impl IntoResponse {
    log.lock().await.push(Recorded::Start(id.clone()));
    match id.as_str() {
        "already-running" => StatusCode::NOT_MODIFIED.into_response(),
        "missing" => (
            StatusCode::NOT_FOUND,
            Json(json!({"message": "No such container: missing"})),
        )
            .into_response(),
        _ => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn remove(
    State(log): State<Log>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    log.lock().await.push(Recorded::Remove(id.clone(), query));
    if id == "locked" {
        (StatusCode::CONFLICT, "removal of container locked is already in progress").into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn spawn_engine() -> (DockerBackend, Log) {
    let log: Log = Arc::default();

    let app = Router::new()
        .route("/containers/json", get(list))
        .route("/containers/create", post(create))
        .route("/containers/:id/start", post(start))
        .route("/containers/:id", delete(remove))
        .with_state(log.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (DockerBackend::new(format!("http://{}/", addr)), log)
}

#[tokio::test]
async fn list_sends_label_filter_and_decodes_containers() {
    let (backend, log) = spawn_engine().await;

    let containers = backend
        .list_containers(&Selector::for_workload("web"))
        .await
        .unwrap();

    assert_eq!(containers.len(), 2);
    assert_eq!(containers[0].id.as_str(), "8dfafdbc3a40");
    assert_eq!(containers[0].names, vec!["/web-1".to_string()]);
    assert_eq!(containers[0].created, 1700000000);
    assert_eq!(containers[0].labels.get("com.swarm.app").map(String::as_str), Some("web"));
    assert!(containers[1].names.is_empty());
    assert!(containers[1].labels.is_empty());

    let log = log.lock().await;
    let Recorded::List(query) = &log[0] else {
        panic!("unexpected request {:?}", log[0]);
    };
    assert_eq!(query.get("all").map(String::as_str), Some("false"));

    let filters: Value = serde_json::from_str(&query["filters"]).unwrap();
    assert_eq!(filters, json!({"label": ["com.swarm.app=web"]}));
}

#[tokio::test]
async fn create_posts_image_and_labels() {
    let (backend, log) = spawn_engine().await;

    let id = backend
        .create_container("nginx:1.25", &Selector::for_workload("web").labels())
        .await
        .unwrap();

    assert_eq!(id, ContainerId::new("e90e34656806"));
    assert_eq!(
        log.lock().await[0],
        Recorded::Create(json!({
            "Image": "nginx:1.25",
            "Labels": {"com.swarm.app": "web"}
        }))
    );
}

#[tokio::test]
async fn start_treats_not_modified_as_success() {
    let (backend, log) = spawn_engine().await;

    backend
        .start_container(&ContainerId::new("e90e34656806"))
        .await
        .unwrap();
    backend
        .start_container(&ContainerId::new("already-running"))
        .await
        .unwrap();

    assert_eq!(
        *log.lock().await,
        vec![
            Recorded::Start("e90e34656806".to_string()),
            Recorded::Start("already-running".to_string()),
        ]
    );
}

#[tokio::test]
async fn engine_error_message_is_surfaced() {
    let (backend, _log) = spawn_engine().await;

    let err = backend
        .start_container(&ContainerId::new("missing"))
        .await
        .unwrap_err();

    match err {
        BackendError::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "No such container: missing");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn remove_passes_force_and_volume_flags() {
    let (backend, log) = spawn_engine().await;

    backend
        .remove_container(&ContainerId::new("8dfafdbc3a40"), RemoveOptions::purge())
        .await
        .unwrap();

    let err = backend
        .remove_container(
            &ContainerId::new("locked"),
            RemoveOptions {
                force: false,
                remove_volumes: false,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Api { status: 409, ref message } if message.contains("in progress")));

    let log = log.lock().await;
    let expected = |force: &str, v: &str| {
        HashMap::from([
            ("force".to_string(), force.to_string()),
            ("v".to_string(), v.to_string()),
        ])
    };
    assert_eq!(
        log[0],
        Recorded::Remove("8dfafdbc3a40".to_string(), expected("true", "true"))
    );
    assert_eq!(
        log[1],
        Recorded::Remove("locked".to_string(), expected("false", "false"))
    );
}

#[tokio::test]
async fn unreachable_engine_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = DockerBackend::new(format!("http://{}", addr));
    let err = backend
        .list_containers(&Selector::for_workload("web"))
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::Transport(_)));
}
