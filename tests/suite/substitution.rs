//! How a mocking layer would track "the substitute currently being configured".

use std::mem;
use std::num::NonZeroUsize;
use std::sync::{Arc, LazyLock};

use flowlocal::{FallbackNotice, FlowLocal, StoreOptions, flow};

use crate::common;

static CURRENT_SUBSTITUTE: LazyLock<FlowLocal<Option<String>>> =
    LazyLock::new(FlowLocal::default);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_tests_each_see_their_own_substitute() {
    common::init_tracing();

    let runs: Vec<_> = (0..8)
        .map(|run| {
            tokio::spawn(flow::scope(async move {
                let lease = CURRENT_SUBSTITUTE.lease();
                assert_eq!(lease.get(), None);
                lease.set(Some(format!("substitute-{run}")));
                common::hop().await;
                let configured = flow::spawn(async { CURRENT_SUBSTITUTE.get() })
                    .await
                    .expect("configure call");
                (run, configured)
            }))
        })
        .collect();

    for run in runs {
        let (run, configured) = run.await.expect("run");
        assert_eq!(configured, Some(format!("substitute-{run}")));
    }
}

/// State owned by one object and handed to its consumers explicitly.
struct SubstitutionState {
    current: FlowLocal<Option<String>>,
    pending_rules: FlowLocal<Vec<String>>,
}

impl SubstitutionState {
    fn new() -> Self {
        let options = StoreOptions::from_toml_str(
            r#"
            label = "pending-rules"
            fallback_notice = "warn"
            capacity_warning = 64
            "#,
        )
        .expect("options");
        Self {
            current: FlowLocal::default(),
            pending_rules: FlowLocal::with_options(Vec::new, options),
        }
    }

    fn enqueue(&self, rule: &str) {
        self.pending_rules.update(|rules| rules.push(rule.to_string()));
    }

    fn dequeue_all(&self) -> Vec<String> {
        self.pending_rules.update(mem::take)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn injected_state_is_scoped_per_flow() {
    common::init_tracing();
    let state = Arc::new(SubstitutionState::new());
    assert_eq!(
        state.pending_rules.options().fallback_notice,
        FallbackNotice::Warn
    );
    assert_eq!(
        state.pending_rules.options().capacity_warning,
        NonZeroUsize::new(64)
    );

    let first = tokio::spawn(flow::scope({
        let state = Arc::clone(&state);
        async move {
            state.current.set(Some("reader".to_string()));
            state.enqueue("any_arg");
            common::hop().await;
            state.enqueue("returns 3");
            state.dequeue_all()
        }
    }));
    let second = tokio::spawn(flow::scope({
        let state = Arc::clone(&state);
        async move {
            state.enqueue("throws");
            (state.current.get(), state.dequeue_all())
        }
    }));

    assert_eq!(first.await.expect("first"), ["any_arg", "returns 3"]);
    let (current, rules) = second.await.expect("second");
    assert_eq!(current, None);
    assert_eq!(rules, ["throws"]);
}
