//! Ambient propagation channel for flowlocal.
//!
//! - **`ambient`**: the [`AmbientChannel`] trait stores resolve handles through
//! - **`flow`**: task-local flow scopes, fork helpers, and [`FlowChannel`]
//! - **`thread`**: thread-identity slots and [`ThreadChannel`]
//!
//! Outside any flow scope [`FlowChannel`] degrades to thread identity. That
//! is correct for synchronous call chains on one thread, but assignments no
//! longer follow work that moves to another thread. On a tokio runtime it
//! also means unrelated tasks on one worker share slots; run tasks inside
//! [`flow::scope`]. Callers can detect the degradation through
//! [`ScopeKind::Thread`] and [`flow::runtime_active`].

mod ambient;
pub mod flow;
mod thread;

pub use ambient::{AmbientChannel, ChannelError, ScopeKind};
pub use flow::{FlowChannel, FlowContext};
pub use thread::ThreadChannel;
