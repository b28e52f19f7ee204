mod mock;

use k3s_orchestrator::{ConvergenceWaiter, ErrorKind};
use mock::Harness;
use std::time::Duration;
use tokio::time::Instant;

const NODE: &str = "ip-10-0-0-7-a1b2c3d4e5";
const DELAY: Duration = Duration::from_secs(5);

#[tokio::test(start_paused = true)]
async fn visible_node_is_returned_at_once() {
    let harness = Harness::new();
    harness.cluster.add_node(NODE, None);
    let waiter = ConvergenceWaiter::new(&harness.cluster, DELAY, harness.cancel.clone());
    let start = Instant::now();
    let nodes = waiter.wait_for_node(NODE, 20).await.unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].name, NODE);
    assert_eq!(harness.cluster.gets(NODE), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn absent_node_is_retried_with_fixed_delay() {
    let harness = Harness::new();
    harness.cluster.visible_after(Some(3));
    let waiter = ConvergenceWaiter::new(&harness.cluster, DELAY, harness.cancel.clone());
    let start = Instant::now();
    let nodes = waiter.wait_for_node(NODE, 20).await.unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(harness.cluster.gets(NODE), 4);
    assert_eq!(start.elapsed(), DELAY * 3);
}

#[tokio::test(start_paused = true)]
async fn exhausted_attempts_return_nothing() {
    let harness = Harness::new();
    harness.cluster.visible_after(None);
    let waiter = ConvergenceWaiter::new(&harness.cluster, DELAY, harness.cancel.clone());
    let start = Instant::now();
    let nodes = waiter.wait_for_node(NODE, 20).await.unwrap();
    assert!(nodes.is_empty());
    assert_eq!(harness.cluster.gets(NODE), 20);
    // No sleep after the final attempt.
    assert_eq!(start.elapsed(), DELAY * 19);
}

#[tokio::test(start_paused = true)]
async fn other_errors_are_not_retried() {
    let harness = Harness::new();
    harness.cluster.fail_gets();
    let waiter = ConvergenceWaiter::new(&harness.cluster, DELAY, harness.cancel.clone());
    let error = waiter.wait_for_node(NODE, 20).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ClusterApi);
    assert_eq!(harness.journal.entries(), vec![format!("get {}", NODE)]);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_wait() {
    let harness = Harness::new();
    harness.cluster.visible_after(None);
    let waiter = ConvergenceWaiter::new(&harness.cluster, DELAY, harness.cancel.clone());
    let cancel = harness.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        cancel.cancel();
    });
    let error = waiter.wait_for_node(NODE, 20).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Cancelled);
    assert_eq!(harness.cluster.gets(NODE), 3);
}
