//! 后台任务运行时测试

use std::sync::{Arc, Mutex};
use std::time::Duration;

use beacon_core::discovery::FakeDiscovery;
use beacon_core::runtime::{RuntimeConfig, SpawnTask, TaskResult, TaskRuntime};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_discovery_task_stops_on_shutdown() {
    let discovery = Arc::new(FakeDiscovery::default());
    let running = assert_ok!(
        TaskRuntime::new("test")
            .add_discovery("fake-discovery", discovery)
            .start()
    );
    assert_eq!(running.len(), 1);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_ok!(running.shutdown().await);
}

#[tokio::test]
async fn test_tasks_start_in_dependency_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let record = |name: &'static str| {
        let order = order.clone();
        async move {
            order.lock().unwrap().push(name);
            TaskResult::Ok(())
        }
    };

    let mut running = assert_ok!(
        TaskRuntime::new("test")
            .add_task(Box::new(
                SpawnTask::new("resolver-warmup", record("resolver-warmup"))
                    .with_dependencies(vec!["discovery".to_string()]),
            ))
            .add_spawn("discovery", record("discovery"))
            .start()
    );
    assert_ok!(running.wait().await);

    // current_thread 运行时按 spawn 顺序轮询
    assert_eq!(*order.lock().unwrap(), vec!["discovery", "resolver-warmup"]);
}

#[tokio::test]
async fn test_missing_dependency_is_rejected() {
    let result = TaskRuntime::new("test")
        .add_task(Box::new(
            SpawnTask::new("a", async { Ok(()) }).with_dependencies(vec!["ghost".to_string()]),
        ))
        .start();
    let err = assert_err!(result);
    assert!(err.to_string().contains("ghost"));
}

#[tokio::test]
async fn test_circular_dependency_is_rejected() {
    let result = TaskRuntime::new("test")
        .add_task(Box::new(
            SpawnTask::new("a", async { Ok(()) }).with_dependencies(vec!["b".to_string()]),
        ))
        .add_task(Box::new(
            SpawnTask::new("b", async { Ok(()) }).with_dependencies(vec!["a".to_string()]),
        ))
        .start();
    let err = assert_err!(result);
    assert!(err.to_string().contains("Circular dependency"));
}

#[tokio::test]
async fn test_duplicate_task_name_is_rejected() {
    let result = TaskRuntime::new("test")
        .add_spawn("dup", async { Ok(()) })
        .add_spawn("dup", async { Ok(()) })
        .start();
    assert_err!(result);
}

#[tokio::test]
async fn test_wait_reports_failed_tasks() {
    let mut running = assert_ok!(
        TaskRuntime::new("test")
            .add_spawn("ok", async { Ok(()) })
            .add_spawn("broken", async { Err("boom".into()) })
            .start()
    );
    let err = assert_err!(running.wait().await);
    assert!(err.to_string().contains("broken"));
    assert!(running.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_times_out_on_stuck_task() {
    let running = assert_ok!(
        TaskRuntime::new("test")
            .with_config(RuntimeConfig::new().with_shutdown_timeout(Duration::from_millis(50)))
            .add_spawn("stuck", async {
                std::future::pending::<()>().await;
                Ok(())
            })
            .start()
    );
    let err = assert_err!(running.shutdown().await);
    assert!(err.to_string().contains("timeout"));
}

#[tokio::test]
async fn test_run_until_cancels_context_aware_tasks() {
    let stopped = Arc::new(Mutex::new(false));
    let flag = stopped.clone();

    let result = TaskRuntime::new("test")
        .add_spawn_with_context("watcher", move |ctx| async move {
            ctx.done().await;
            *flag.lock().unwrap() = true;
            Ok(())
        })
        .run_until(tokio::time::sleep(Duration::from_millis(10)))
        .await;

    assert_ok!(result);
    assert!(*stopped.lock().unwrap());
}
