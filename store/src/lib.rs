//! Context-scoped storage for logical execution flows.
//!
//! A [`FlowLocal<T>`] holds one `T` per logical flow (a request, a test, an
//! async call chain) instead of per OS thread. Flow identity travels through
//! the ambient channel in [`flow`]; the store keeps the values.
//!
//! ```ignore
//! static CURRENT_SUBSTITUTE: LazyLock<FlowLocal<Option<String>>> =
//!     LazyLock::new(FlowLocal::default);
//!
//! flow::scope(async {
//!     CURRENT_SUBSTITUTE.set(Some("calculator".into()));
//!     flow::spawn(async { CURRENT_SUBSTITUTE.get() }).await
//! })
//! .await;
//! ```

mod lease;
mod store;

pub use flowlocal_channel::{
    AmbientChannel, ChannelError, FlowChannel, FlowContext, ScopeKind, ThreadChannel, flow,
};
pub use flowlocal_types::{ConfigError, ContextHandle, FallbackNotice, SlotId, StoreOptions};
pub use lease::FlowLease;
pub use store::FlowLocal;
