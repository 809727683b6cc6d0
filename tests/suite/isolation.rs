//! Unrelated flows never observe each other's values.

use std::sync::Arc;

use flowlocal::{FlowLocal, flow};
use tokio::sync::Barrier;

use crate::common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn example_scenario_flow_b_keeps_its_default() {
    common::init_tracing();
    let store = Arc::new(FlowLocal::new(|| 0));

    let flow_a = Arc::clone(&store);
    let a = flow::scope(async move {
        let first = flow_a.get();
        flow_a.set(5);
        (first, flow_a.get())
    })
    .await;
    assert_eq!(a, (0, 5));

    let flow_b = Arc::clone(&store);
    let b = flow::scope(async move { flow_b.get() }).await;
    assert_eq!(b, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_unrelated_flows_stay_isolated() {
    common::init_tracing();
    let store = Arc::new(FlowLocal::new(|| 0));
    let barrier = Arc::new(Barrier::new(2));

    let writer = {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(flow::scope(async move {
            store.set(5);
            barrier.wait().await;
            barrier.wait().await;
            common::hop().await;
            store.get()
        }))
    };
    let reader = {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(flow::scope(async move {
            barrier.wait().await;
            let seen = store.get();
            store.set(9);
            barrier.wait().await;
            seen
        }))
    };

    assert_eq!(writer.await.expect("writer"), 5);
    assert_eq!(reader.await.expect("reader"), 0);
    assert_eq!(store.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn children_forked_before_assignment_get_their_own_handles() {
    common::init_tracing();
    let store = Arc::new(FlowLocal::new(|| 0));

    flow::scope({
        let store = Arc::clone(&store);
        async move {
            let first = flow::spawn({
                let store = Arc::clone(&store);
                async move {
                    store.set(1);
                    store.current_handle()
                }
            });
            let second = flow::spawn({
                let store = Arc::clone(&store);
                async move {
                    store.set(2);
                    store.current_handle()
                }
            });
            let first = first.await.expect("first child");
            let second = second.await.expect("second child");
            assert_ne!(first, second);

            assert_eq!(store.peek_handle(), None);
            assert_eq!(store.get(), 0);
        }
    })
    .await;

    assert_eq!(store.len(), 3);
}
