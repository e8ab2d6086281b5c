// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{
    message, setup_repo, tracker, tracker_settings, FailingRepository, ScriptedProbe,
};
use sea_orm::{EntityTrait, PaginatorTrait};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tasktrail::domain::models::task::TaskStatus;
use tasktrail::domain::repositories::task_repository::TaskRepository;
use tasktrail::infrastructure::database::entities::task as task_entity;
use tasktrail::tracking::default_stack;
use tasktrail::tracking::measurement::Measurement;
use tasktrail::tracking::middleware::ProcessOutcome;
use tasktrail::tracking::tracker::TaskTracker;
use tokio::time::Instant;

/// 入队、开始、成功完成
#[tokio::test]
async fn test_successful_lifecycle_ends_done() {
    let (_db, repo) = setup_repo().await;
    let tracker = tracker(repo.clone());
    let msg = message("send_report");

    tracker.on_enqueue(&msg, None).await;
    let stored = repo.find_by_id(msg.message_id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Enqueued);
    assert_eq!(stored.actor_name.as_deref(), Some("send_report"));
    assert_eq!(stored.queue_name.as_deref(), Some("default"));
    assert_eq!(stored.args.as_deref(), Some(r#"[42,"weekly"]"#));
    assert_eq!(stored.kwargs.as_deref(), Some(r#"{"dry_run":true}"#));
    assert_eq!(stored.worker_hostname, None);
    assert_eq!(stored.runtime, None);

    let measurement = tracker.on_process_start(&msg).await;
    let running = repo.find_by_id(msg.message_id).await.unwrap().unwrap();
    assert_eq!(running.status, TaskStatus::Running);
    assert_eq!(running.worker_hostname.as_deref(), Some("worker-test-1"));
    assert_eq!(running.created_at, stored.created_at);

    tracker
        .on_process_finish(&msg, &ProcessOutcome::success(None), Some(measurement))
        .await;

    let done = repo.find_by_id(msg.message_id).await.unwrap().unwrap();
    assert_eq!(done.status, TaskStatus::Done);
    assert!(done.runtime.unwrap() >= 0.0);
    assert_eq!(done.worker_hostname.as_deref(), Some("worker-test-1"));
    assert_eq!(done.created_at, stored.created_at);
    assert!(done.updated_at >= running.updated_at);
    assert_eq!(done.message().unwrap(), msg);
}

#[tokio::test]
async fn test_delayed_enqueue() {
    let (_db, repo) = setup_repo().await;
    let tracker = tracker(repo.clone());

    let delayed = message("later");
    tracker
        .on_enqueue(&delayed, Some(Duration::from_secs(30)))
        .await;
    let zero = message("now");
    tracker.on_enqueue(&zero, Some(Duration::ZERO)).await;

    assert_eq!(
        repo.find_by_id(delayed.message_id).await.unwrap().unwrap().status,
        TaskStatus::Delayed
    );
    assert_eq!(
        repo.find_by_id(zero.message_id).await.unwrap().unwrap().status,
        TaskStatus::Enqueued
    );
}

#[tokio::test]
async fn test_exception_marks_failed() {
    let (_db, repo) = setup_repo().await;
    let tracker = tracker(repo.clone());
    let msg = message("explode");

    tracker.on_enqueue(&msg, None).await;
    let measurement = tracker.on_process_start(&msg).await;
    tracker
        .on_process_finish(
            &msg,
            &ProcessOutcome::failure("ValueError: boom"),
            Some(measurement),
        )
        .await;

    let stored = repo.find_by_id(msg.message_id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Failed);
    assert!(stored.runtime.is_some());
}

/// 先到的事件也会创建记录
#[tokio::test]
async fn test_finish_without_prior_events_creates_row() {
    let (_db, repo) = setup_repo().await;
    let tracker = tracker(repo.clone());
    let msg = message("orphan");

    tracker
        .on_process_finish(&msg, &ProcessOutcome::failure("lost"), None)
        .await;

    let stored = repo.find_by_id(msg.message_id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Failed);
    assert_eq!(stored.runtime, None);
    assert_eq!(stored.memory_delta, None);
}

#[tokio::test]
async fn test_skip_does_not_overwrite_terminal_status() {
    let (_db, repo) = setup_repo().await;
    let tracker = tracker(repo.clone());

    for outcome in [ProcessOutcome::success(None), ProcessOutcome::failure("boom")] {
        let msg = message("settled");
        let measurement = tracker.on_process_start(&msg).await;
        tracker
            .on_process_finish(&msg, &outcome, Some(measurement))
            .await;
        let finished = repo.find_by_id(msg.message_id).await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        tracker.on_skip(&msg, None).await;

        let after_skip = repo.find_by_id(msg.message_id).await.unwrap().unwrap();
        assert_eq!(after_skip.status, finished.status);
        assert_eq!(after_skip.runtime, finished.runtime);
        assert!(after_skip.updated_at > finished.updated_at);
    }
}

#[tokio::test]
async fn test_skip_before_terminal_write_marks_skipped() {
    let (_db, repo) = setup_repo().await;
    let tracker = tracker(repo.clone());
    let msg = message("skippable");

    tracker.on_enqueue(&msg, None).await;
    let measurement = tracker.on_process_start(&msg).await;
    tracker.on_skip(&msg, Some(measurement)).await;

    let stored = repo.find_by_id(msg.message_id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Skipped);
    assert!(stored.runtime.is_some());

    // 之后的完成事件仍可覆盖临时状态
    tracker
        .on_process_finish(&msg, &ProcessOutcome::success(None), None)
        .await;
    let stored = repo.find_by_id(msg.message_id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Done);
}

#[tokio::test]
async fn test_duplicate_enqueue_keeps_one_row() {
    let (db, repo) = setup_repo().await;
    let tracker = tracker(repo.clone());
    let msg = message("twice");

    tracker.on_enqueue(&msg, None).await;
    tracker.on_enqueue(&msg, None).await;

    let count = task_entity::Entity::find().count(db.as_ref()).await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_runtime_reflects_measured_interval() {
    let (_db, repo) = setup_repo().await;
    let tracker = tracker(repo.clone());
    let msg = message("timed");

    tracker.on_process_start(&msg).await;
    let started = Instant::now() - Duration::from_millis(842);
    let measurement = Measurement::from_parts(msg.message_id, started, None);

    tracker
        .on_process_finish(&msg, &ProcessOutcome::success(None), Some(measurement))
        .await;

    let stored = repo.find_by_id(msg.message_id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Done);
    let runtime = stored.runtime.unwrap();
    assert!((0.842..0.842 + 0.5).contains(&runtime), "runtime was {runtime}");
}

#[tokio::test]
async fn test_mismatched_measurement_stores_null_metrics() {
    let (_db, repo) = setup_repo().await;
    let tracker = tracker(repo.clone());
    let first = message("first");
    let second = message("second");

    let foreign = tracker.on_process_start(&first).await;
    tracker.on_process_start(&second).await;
    tracker
        .on_process_finish(&second, &ProcessOutcome::success(None), Some(foreign))
        .await;

    let stored = repo.find_by_id(second.message_id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Done);
    assert_eq!(stored.runtime, None);
    assert_eq!(stored.memory_delta, None);
}

#[tokio::test]
async fn test_enqueue_after_finish_keeps_metrics() {
    let (_db, repo) = setup_repo().await;
    let tracker = tracker(repo.clone());
    let msg = message("retry");

    let measurement = tracker.on_process_start(&msg).await;
    tracker
        .on_process_finish(&msg, &ProcessOutcome::failure("boom"), Some(measurement))
        .await;
    tracker.on_enqueue(&msg, Some(Duration::from_secs(10))).await;

    let stored = repo.find_by_id(msg.message_id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Delayed);
    assert!(stored.runtime.is_some());
    assert_eq!(stored.worker_hostname.as_deref(), Some("worker-test-1"));
}

#[tokio::test]
async fn test_memory_delta_uses_probe() {
    let (_db, repo) = setup_repo().await;
    let probe = Arc::new(ScriptedProbe::new(50 * 1024 * 1024));
    let tracker = tracker(repo.clone()).with_memory_probe(probe.clone());
    let msg = message("alloc");

    let measurement = tracker.on_process_start(&msg).await;
    probe.set(50 * 1024 * 1024 + 3 * 1024 * 1024);
    tracker
        .on_process_finish(&msg, &ProcessOutcome::success(None), Some(measurement))
        .await;

    let stored = repo.find_by_id(msg.message_id).await.unwrap().unwrap();
    assert_eq!(stored.memory_delta, Some(3 * 1024 * 1024));

    let shrink = message("free");
    let measurement = tracker.on_process_start(&shrink).await;
    probe.set(40 * 1024 * 1024);
    tracker
        .on_process_finish(&shrink, &ProcessOutcome::success(None), Some(measurement))
        .await;

    let stored = repo.find_by_id(shrink.message_id).await.unwrap().unwrap();
    assert_eq!(stored.memory_delta, Some(-(13 * 1024 * 1024)));
}

/// 两个执行上下文交错处理不同任务，各自的耗时互不干扰
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_contexts_do_not_share_measurements() {
    let (_db, repo) = setup_repo().await;
    let stack = Arc::new(default_stack(repo.clone(), &tracker_settings()));
    let slow = message("slow");
    let fast = message("fast");

    let run = |msg: tasktrail::domain::models::message::Message, work: Duration| {
        let stack = stack.clone();
        async move {
            stack.after_enqueue(&msg, None).await;
            let scope = stack.before_process_message(&msg).await;
            tokio::time::sleep(work).await;
            stack
                .after_process_message(scope, &msg, &ProcessOutcome::success(None))
                .await;
        }
    };

    futures::future::join(
        run(slow.clone(), Duration::from_millis(300)),
        run(fast.clone(), Duration::from_millis(20)),
    )
    .await;

    let slow_row = repo.find_by_id(slow.message_id).await.unwrap().unwrap();
    let fast_row = repo.find_by_id(fast.message_id).await.unwrap().unwrap();
    assert_eq!(slow_row.status, TaskStatus::Done);
    assert_eq!(fast_row.status, TaskStatus::Done);
    assert!(slow_row.runtime.unwrap() >= 0.3);
    assert!(fast_row.runtime.unwrap() < 0.3);
}

/// 存储不可用时所有钩子照常返回，度量令牌仍然可用
#[tokio::test]
async fn test_store_failures_do_not_reach_the_broker() {
    let repo = Arc::new(FailingRepository::default());
    let tracker = TaskTracker::new(repo.clone(), &tracker_settings());
    let msg = message("send_report");

    tracker.on_enqueue(&msg, None).await;
    tracker.on_enqueue(&msg, Some(Duration::from_secs(5))).await;

    let measurement = tracker.on_process_start(&msg).await;
    assert_eq!(measurement.message_id(), msg.message_id);
    tracker
        .on_process_finish(&msg, &ProcessOutcome::success(None), Some(measurement))
        .await;

    let measurement = tracker.on_process_start(&msg).await;
    assert_eq!(measurement.message_id(), msg.message_id);
    tracker.on_skip(&msg, Some(measurement)).await;

    assert_eq!(repo.writes.load(Ordering::SeqCst), 6);
}
