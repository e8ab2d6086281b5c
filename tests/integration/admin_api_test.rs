// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::helpers::{
    message, setup_repo, tracker, SlowResultBackend, StaticResultBackend,
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;
use tasktrail::config::settings::{
    DatabaseSettings, MetricsSettings, ResultSettings, RetentionSettings, ServerSettings,
    Settings,
};
use tasktrail::domain::repositories::result_backend::{NoResultBackend, ResultBackend};
use tasktrail::infrastructure::repositories::task_repo_impl::TaskRepositoryImpl;
use tasktrail::presentation::routes;
use tasktrail::tracking::middleware::ProcessOutcome;
use tower::util::ServiceExt;

fn settings() -> Arc<Settings> {
    Arc::new(Settings {
        database: DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: None,
            min_connections: None,
            connect_timeout: None,
            idle_timeout: None,
        },
        server: ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        tracker: super::helpers::tracker_settings(),
        retention: RetentionSettings {
            enabled: false,
            max_task_age_seconds: 3600,
            interval_seconds: 60,
        },
        results: ResultSettings {
            redis_url: None,
            namespace: "tasktrail-results".to_string(),
            fetch_timeout_ms: 50,
        },
        metrics: MetricsSettings {
            enabled: false,
            listen_addr: "127.0.0.1:0".to_string(),
        },
    })
}

fn server(repo: Arc<TaskRepositoryImpl>, backend: Arc<dyn ResultBackend>) -> TestServer {
    TestServer::new(routes::app(repo, backend, settings())).unwrap()
}

/// 健康检查测试
#[tokio::test]
async fn health_check_works() {
    let app = routes::routes();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_list_and_detail() {
    let (_db, repo) = setup_repo().await;
    let tracker = tracker(repo.clone());
    let msg = message("send_report");

    tracker.on_enqueue(&msg, None).await;
    let measurement = tracker.on_process_start(&msg).await;
    tracker
        .on_process_finish(&msg, &ProcessOutcome::success(None), Some(measurement))
        .await;

    let server = server(repo, Arc::new(StaticResultBackend(json!({"rows": 3}))));

    let list = server.get("/admin/tasks").await;
    list.assert_status_ok();
    let body: Value = list.json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["has_more"], false);
    let row = &body["tasks"][0];
    assert_eq!(row["id"], msg.message_id.to_string());
    assert_eq!(row["status"], "done");
    assert_eq!(row["summary"], r#"send_report(42, "weekly", dry_run=true)"#);
    assert_eq!(row["eta"], "now");
    assert_eq!(row["worker_hostname"], "worker-test-1");
    assert!(row["runtime_display"].as_str().unwrap().ends_with(" sec"));

    let detail = server
        .get(&format!("/admin/tasks/{}", msg.message_id))
        .await;
    detail.assert_status_ok();
    let body: Value = detail.json();
    assert_eq!(body["status"], "done");
    assert_eq!(body["result"], r#"{"rows":3}"#);
    assert_eq!(body["args"], r#"[42,"weekly"]"#);
    assert_eq!(body["kwargs"], r#"{"dry_run":true}"#);
    assert!(body["message_details"]
        .as_str()
        .unwrap()
        .contains("\n    \"actor_name\": \"send_report\""));
    assert_eq!(body["traceback"], Value::Null);
}

#[tokio::test]
async fn test_list_filters_by_status_and_search() {
    let (_db, repo) = setup_repo().await;
    let tracker = tracker(repo.clone());
    let ok = message("send_report");
    let bad = message("explode");

    tracker
        .on_process_finish(&ok, &ProcessOutcome::success(None), None)
        .await;
    tracker
        .on_process_finish(&bad, &ProcessOutcome::failure("boom"), None)
        .await;

    let server = server(repo, Arc::new(NoResultBackend));

    let body: Value = server
        .get("/admin/tasks")
        .add_query_param("status", "failed")
        .await
        .json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["tasks"][0]["actor_name"], "explode");

    let body: Value = server
        .get("/admin/tasks")
        .add_query_param("q", "report")
        .add_query_param("created", "today")
        .await
        .json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["tasks"][0]["actor_name"], "send_report");

    let body: Value = server
        .get("/admin/tasks")
        .add_query_param("limit", "1")
        .await
        .json();
    assert_eq!(body["tasks"].as_array().unwrap().len(), 1);
    assert_eq!(body["has_more"], true);
}

#[tokio::test]
async fn test_invalid_limit_is_rejected() {
    let (_db, repo) = setup_repo().await;
    let server = server(repo, Arc::new(NoResultBackend));

    let response = server
        .get("/admin/tasks")
        .add_query_param("limit", "5000")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_filters_endpoint_lists_facets() {
    let (_db, repo) = setup_repo().await;
    let tracker = tracker(repo.clone());
    tracker.on_process_start(&message("resize")).await;

    let server = server(repo, Arc::new(NoResultBackend));
    let body: Value = server.get("/admin/tasks/filters").await.json();

    assert_eq!(body["queue_names"], json!(["default"]));
    assert_eq!(body["actor_names"], json!(["resize"]));
    assert_eq!(body["worker_hostnames"], json!(["worker-test-1"]));
    assert_eq!(body["created"], json!(["today", "past_7_days", "this_month", "this_year"]));
    assert_eq!(body["statuses"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let (_db, repo) = setup_repo().await;
    let server = server(repo, Arc::new(NoResultBackend));

    let response = server
        .get(&format!("/admin/tasks/{}", uuid::Uuid::new_v4()))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_is_read_only() {
    let (_db, repo) = setup_repo().await;
    let tracker = tracker(repo.clone());
    let msg = message("immutable");
    tracker.on_enqueue(&msg, None).await;

    let server = server(repo, Arc::new(NoResultBackend));

    server
        .post("/admin/tasks")
        .json(&json!({"actor_name": "x"}))
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
    server
        .delete(&format!("/admin/tasks/{}", msg.message_id))
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
    server
        .put(&format!("/admin/tasks/{}", msg.message_id))
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_result_view_shows_inline_errors() {
    let (_db, repo) = setup_repo().await;
    let tracker = tracker(repo.clone());
    let done = message("finished");
    let failed = message("broken");
    tracker
        .on_process_finish(&done, &ProcessOutcome::success(None), None)
        .await;
    tracker
        .on_process_finish(&failed, &ProcessOutcome::failure("boom"), None)
        .await;

    let slow = server(repo.clone(), Arc::new(SlowResultBackend));
    let body: Value = slow
        .get(&format!("/admin/tasks/{}", done.message_id))
        .await
        .json();
    assert!(body["result"].as_str().unwrap().contains("timed out"));

    // 非完成状态不读取结果
    let body: Value = slow
        .get(&format!("/admin/tasks/{}", failed.message_id))
        .await
        .json();
    assert_eq!(body["result"], "");

    let none = server(repo.clone(), Arc::new(StaticResultBackend(Value::Null)));
    let body: Value = none
        .get(&format!("/admin/tasks/{}", done.message_id))
        .await
        .json();
    assert_eq!(body["result"], "None");

    let long = server(repo, Arc::new(StaticResultBackend(json!("x".repeat(5000)))));
    let body: Value = long
        .get(&format!("/admin/tasks/{}", done.message_id))
        .await
        .json();
    assert_eq!(body["result"].as_str().unwrap().len(), 2000);
}

#[tokio::test]
async fn test_traceback_is_shown() {
    let (_db, repo) = setup_repo().await;
    let tracker = tracker(repo.clone());
    let msg = message("explode").with_option("traceback", json!("Traceback: ValueError"));
    tracker
        .on_process_finish(&msg, &ProcessOutcome::failure("ValueError"), None)
        .await;

    let server = server(repo, Arc::new(NoResultBackend));
    let body: Value = server
        .get(&format!("/admin/tasks/{}", msg.message_id))
        .await
        .json();
    assert_eq!(body["traceback"], "Traceback: ValueError");
}
