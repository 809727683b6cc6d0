//! A flow keeps its value across suspension and thread hops.

use std::sync::Arc;
use std::thread;

use flowlocal::{FlowLocal, ScopeKind, flow};

use crate::common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn value_survives_suspension() {
    common::init_tracing();
    let store = Arc::new(FlowLocal::new(String::new));

    let task = tokio::spawn(flow::scope({
        let store = Arc::clone(&store);
        async move {
            store.set("configured".to_string());
            let handle = store.current_handle();
            common::hop().await;
            assert_eq!(store.scope_kind(), ScopeKind::Flow);
            assert_eq!(store.current_handle(), handle);
            store.get()
        }
    }));

    assert_eq!(task.await.expect("flow task"), "configured");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn value_follows_the_flow_onto_the_blocking_pool() {
    common::init_tracing();
    let store = Arc::new(FlowLocal::new(|| 0_u32));

    flow::scope({
        let store = Arc::clone(&store);
        async move {
            store.set(42);
            let origin = thread::current().id();

            let (hopped_to, seen) = flow::spawn_blocking({
                let store = Arc::clone(&store);
                move || (thread::current().id(), store.get())
            })
            .await
            .expect("blocking task");

            assert_ne!(hopped_to, origin);
            assert_eq!(seen, 42);
        }
    })
    .await;
}

#[test]
fn synchronous_flow_carries_value_onto_a_new_thread() {
    common::init_tracing();
    let store = Arc::new(FlowLocal::new(|| 0_u32));

    let seen = flow::sync_scope(|| {
        store.set(7);
        let store = Arc::clone(&store);
        flow::spawn_thread(move || store.get())
            .join()
            .expect("thread")
    });

    assert_eq!(seen, 7);
}

#[test]
fn outside_any_flow_the_thread_is_the_flow() {
    common::init_tracing();
    let store = Arc::new(FlowLocal::new(|| 0_u32));
    assert_eq!(store.scope_kind(), ScopeKind::Thread);

    store.set(3);
    assert_eq!(store.get(), 3);

    let other = Arc::clone(&store);
    let unforked = thread::spawn(move || other.get()).join().expect("thread");
    assert_eq!(unforked, 0);

    let other = Arc::clone(&store);
    let forked = flow::spawn_thread(move || other.get())
        .join()
        .expect("thread");
    assert_eq!(forked, 3);
}
