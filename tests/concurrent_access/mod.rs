//! Registration, cancellation and shutdown racing the tick loop on a
//! multi-threaded runtime with the real clock.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use wheel_monitor::Error;
use wheel_monitor::MonitorError;

use crate::common::eventually;
use crate::common::start_monitor;
use crate::common::RecordingHandler;

const PRODUCERS: usize = 8;
const TASKS_PER_PRODUCER: u64 = 100;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_each_task_fires_once_unless_removed() {
    let monitor = Arc::new(start_monitor(10, Duration::from_millis(20), 2));
    let handler = RecordingHandler::new();

    let producers = (0..PRODUCERS).map(|p| {
        let monitor = monitor.clone();
        let handler = handler.clone();
        tokio::spawn(async move {
            let mut removed = Vec::new();
            for i in 0..TASKS_PER_PRODUCER {
                let task_id = format!("p{p}-t{i}");
                monitor
                    .add_task_monitor(
                        task_id.clone(),
                        format!("node-{p}"),
                        Duration::from_millis(50 + (i % 10) * 25),
                        handler.clone(),
                    )
                    .unwrap();
                if i % 2 == 0 && monitor.remove_task_monitor(&task_id) {
                    removed.push(task_id);
                }
                if i % 10 == 0 {
                    tokio::task::yield_now().await;
                }
            }
            removed
        })
    });

    let removed: HashSet<String> = join_all(producers)
        .await
        .into_iter()
        .flat_map(|result| result.unwrap())
        .collect();
    let total = PRODUCERS * TASKS_PER_PRODUCER as usize;
    let expected = total - removed.len();

    assert!(eventually(|| monitor.monitored_task_count() == 0).await);
    assert!(eventually(|| handler.total_fired() == expected).await);

    for p in 0..PRODUCERS {
        for i in 0..TASKS_PER_PRODUCER {
            let task_id = format!("p{p}-t{i}");
            let expected_fires = usize::from(!removed.contains(&task_id));
            assert_eq!(handler.fire_count(&task_id), expected_fires, "task {task_id}");
        }
    }
    monitor.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_while_registering_leaves_nothing_behind() {
    let monitor = Arc::new(start_monitor(10, Duration::from_millis(20), 2));
    let handler = RecordingHandler::new();

    let producers = (0..4).map(|p| {
        let monitor = monitor.clone();
        let handler = handler.clone();
        tokio::spawn(async move {
            let mut accepted = 0usize;
            for i in 0u64.. {
                match monitor.add_task_monitor(
                    format!("p{p}-t{i}"),
                    "node-1",
                    Duration::from_millis(40 + (i % 5) * 20),
                    handler.clone(),
                ) {
                    Ok(()) => accepted += 1,
                    Err(Error::Monitor(MonitorError::NotRunning)) => break,
                    Err(e) => panic!("unexpected registration error: {e}"),
                }
                tokio::task::yield_now().await;
            }
            accepted
        })
    });
    let producers: Vec<_> = producers.collect();

    tokio::time::sleep(Duration::from_millis(150)).await;
    monitor.stop().await;
    let fired_at_stop = handler.total_fired();

    let accepted: usize = join_all(producers)
        .await
        .into_iter()
        .map(|result| result.unwrap())
        .sum();
    assert!(accepted > 0);
    assert!(!monitor.is_running());
    assert_eq!(monitor.monitored_task_count(), 0);
    assert_eq!(monitor.pending_dispatch_count(), 0);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(handler.total_fired(), fired_at_stop);
}
