//! Control-plane tests driven through the router with `tower::oneshot`.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use sonde::api::{build_router, create_api_state};
use sonde::core::report::ProbeReport;
use sonde::core::task::Task;
use sonde::core::types::TaskId;
use sonde::probes::{ProbeRunner, ProbeSpec};
use sonde::queue::TaskQueue;
use sonde::scheduler::{Archive, Poller, SchedulerHandle};

struct NoopRunner;

#[async_trait]
impl ProbeRunner for NoopRunner {
    async fn run(&self, _spec: &ProbeSpec) -> ProbeReport {
        ProbeReport {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            error: None,
            payload: None,
        }
    }
}

struct Fixture {
    router: Router,
    queue: Arc<TaskQueue>,
    archive: Arc<Archive>,
    handle: SchedulerHandle,
}

/// Router over a live queue and archive; the scheduler loop ticks so slowly
/// it never interferes with the requests under test.
async fn fixture() -> Fixture {
    let queue = Arc::new(TaskQueue::new());
    let archive = Arc::new(Archive::default());
    let poller = Poller::new(Arc::clone(&queue), Arc::new(NoopRunner))
        .with_archive(Arc::clone(&archive))
        .with_tick_interval(Duration::from_secs(3600));
    let (handle, _join) = poller.start();

    let state = create_api_state(Arc::clone(&queue), Arc::clone(&archive), handle.clone());
    Fixture {
        router: build_router(state),
        queue,
        archive,
        handle,
    }
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_running_scheduler() {
    let fx = fixture().await;
    let response = fx
        .router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["scheduler"], "running");
}

#[tokio::test]
async fn post_valid_task_is_queued() {
    let fx = fixture().await;
    let response = fx
        .router
        .oneshot(json_request(
            Method::POST,
            "/tasks",
            json!({
                "type": "Ping",
                "device": "192.0.2.1",
                "_id": 101,
                "recurrence_time": 60
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let snapshot = fx.queue.snapshot().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id(), TaskId::new(101));
    assert_eq!(snapshot[0].recurrence_time(), Some(60));
}

#[tokio::test]
async fn post_unknown_type_answers_501_and_queues_nothing() {
    let fx = fixture().await;
    let response = fx
        .router
        .oneshot(json_request(
            Method::POST,
            "/tasks",
            json!({"type": "DnsLookup", "device": "192.0.2.1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);

    let body = body_json(response).await;
    assert_eq!(body["error"], "task type not found");
    assert!(fx.queue.is_empty().await);
}

#[tokio::test]
async fn post_without_type_is_bad_request() {
    let fx = fixture().await;
    let response = fx
        .router
        .oneshot(json_request(
            Method::POST,
            "/tasks",
            json!({"device": "192.0.2.1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(fx.queue.is_empty().await);
}

#[tokio::test]
async fn post_invalid_recurrence_is_bad_request() {
    let fx = fixture().await;
    let response = fx
        .router
        .oneshot(json_request(
            Method::POST,
            "/tasks",
            json!({
                "type": "GetPage",
                "url": "http://example.org",
                "recurrence_count": 3
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(fx.queue.is_empty().await);
}

#[tokio::test]
async fn post_oversized_recurrence_time_is_bad_request() {
    let fx = fixture().await;
    let response = fx
        .router
        .oneshot(json_request(
            Method::POST,
            "/tasks",
            json!({
                "type": "GetPage",
                "url": "http://example.org",
                "recurrence_time": 10_000_000_000_000_000u64
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(fx.queue.is_empty().await);
}

#[tokio::test]
async fn post_out_of_range_run_at_is_bad_request() {
    let fx = fixture().await;
    let response = fx
        .router
        .oneshot(json_request(
            Method::POST,
            "/tasks",
            json!({
                "type": "GetPage",
                "url": "http://example.org",
                "run_at": 1e300
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(fx.queue.is_empty().await);
}

#[tokio::test]
async fn post_duplicate_id_conflicts() {
    let fx = fixture().await;
    let body = json!({"type": "GetPage", "url": "http://example.org", "_id": 7});

    let first = fx
        .router
        .clone()
        .oneshot(json_request(Method::POST, "/tasks", body.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::NO_CONTENT);

    let second = fx
        .router
        .oneshot(json_request(Method::POST, "/tasks", body))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(fx.queue.len().await, 1);
}

#[tokio::test]
async fn get_tasks_lists_queued_tasks() {
    let fx = fixture().await;
    let task = Task::new(
        TaskId::new(11),
        ProbeSpec::SystemInfoProbe {
            device: "core-sw1".to_string(),
        },
        None,
        Some(120),
        None,
    )
    .unwrap();
    fx.queue.enqueue(task).await;

    let response = fx
        .router
        .oneshot(Request::get("/tasks").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["_id"], 11);
    assert_eq!(list[0]["type"], "SystemInfoProbe");
    assert_eq!(list[0]["recurrence_time"], 120);
}

#[tokio::test]
async fn get_task_finds_archived_tasks_too() {
    let fx = fixture().await;
    let task = Task::new(
        TaskId::new(12),
        ProbeSpec::GetPage {
            url: "http://example.org".to_string(),
        },
        None,
        None,
        None,
    )
    .unwrap();
    fx.archive.retire(task).await;

    let response = fx
        .router
        .oneshot(Request::get("/tasks/12").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["_id"], 12);
}

#[tokio::test]
async fn get_unknown_task_is_404_with_error_body() {
    let fx = fixture().await;
    let response = fx
        .router
        .oneshot(Request::get("/tasks/9999").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Task 9999 not found");
}

#[tokio::test]
async fn delete_removes_queued_task() {
    let fx = fixture().await;
    fx.queue
        .enqueue(
            Task::new(
                TaskId::new(21),
                ProbeSpec::GetPage {
                    url: "http://example.org".to_string(),
                },
                None,
                None,
                None,
            )
            .unwrap(),
        )
        .await;

    let response = fx
        .router
        .oneshot(json_request(Method::DELETE, "/tasks", json!({"task_id": 21})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(fx.queue.is_empty().await);
}

#[tokio::test]
async fn delete_absent_id_is_still_no_content() {
    let fx = fixture().await;
    let response = fx
        .router
        .oneshot(json_request(Method::DELETE, "/tasks", json!({"task_id": 404})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn delete_without_task_id_is_bad_request() {
    let fx = fixture().await;
    fx.queue
        .enqueue(
            Task::new(
                TaskId::new(22),
                ProbeSpec::GetPage {
                    url: "http://example.org".to_string(),
                },
                None,
                None,
                None,
            )
            .unwrap(),
        )
        .await;

    let response = fx
        .router
        .oneshot(json_request(Method::DELETE, "/tasks", json!({"id": 22})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Expecting {\"task_id\": id}");
    assert_eq!(fx.queue.len().await, 1);
}

#[tokio::test]
async fn get_results_covers_queue_and_archive() {
    let fx = fixture().await;

    let queued = Task::new(
        TaskId::new(31),
        ProbeSpec::GetPage {
            url: "http://example.org".to_string(),
        },
        None,
        Some(60),
        None,
    )
    .unwrap();
    queued.results().append(ProbeReport {
        started_at: Utc::now(),
        finished_at: Utc::now(),
        error: None,
        payload: None,
    });
    fx.queue.enqueue(queued).await;

    let retired = Task::new(
        TaskId::new(32),
        ProbeSpec::Ping {
            device: "192.0.2.1".to_string(),
            count: 9,
            preload: 3,
            timeout: 1,
        },
        None,
        None,
        None,
    )
    .unwrap();
    fx.archive.retire(retired).await;

    let response = fx
        .router
        .oneshot(Request::get("/results").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["31"].as_array().unwrap().len(), 1);
    assert!(entries[1]["32"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn health_reports_stopped_after_shutdown() {
    let fx = fixture().await;
    fx.handle.shutdown().await.unwrap();

    let response = fx
        .router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["scheduler"], "stopped");
}
