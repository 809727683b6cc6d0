//! Flow scopes built on a tokio task-local.
//!
//! A flow owns a small slot map (`SlotId -> ContextHandle`). The map travels
//! with the task that runs the flow, so it survives suspension and resumption
//! on a different worker thread. Forking copies the map: the child sees every
//! assignment made before the fork and nothing made after it, on either side.
//!
//! Plain `tokio::spawn` does not fork; the spawned task starts outside any
//! flow. Use [`spawn`], [`spawn_blocking`], [`spawn_thread`], or an explicit
//! [`FlowContext::capture`] to carry assignments across a spawn boundary.
//!
//! Thread-identity fallback is only meaningful off the runtime. On a runtime
//! worker, unrelated tasks share the thread, so a capture made there outside
//! any flow starts from an empty context instead of the worker's slots.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::thread;

use flowlocal_types::{ContextHandle, SlotId};
use tokio::runtime::Handle;
use tokio::task::{self, JoinHandle};

use crate::ambient::{AmbientChannel, ChannelError, ScopeKind};
use crate::thread as thread_slots;

pub(crate) type SlotMap = HashMap<SlotId, ContextHandle>;

tokio::task_local! {
    static FLOW_SLOTS: RefCell<SlotMap>;
}

/// Immutable snapshot of slot assignments, used to seed a flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowContext {
    slots: SlotMap,
}

impl FlowContext {
    /// An empty root context. Flows seeded from it share nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the caller's current assignments.
    ///
    /// Inside a flow this copies the flow's slots. Outside one it copies the
    /// calling thread's slots, unless the caller is on a tokio runtime, where
    /// the thread is shared by unrelated tasks and the capture is empty.
    #[must_use]
    pub fn capture() -> Self {
        match Self::try_current() {
            Ok(context) => context,
            Err(_) if runtime_active() => Self::new(),
            Err(_) => Self {
                slots: thread_slots::snapshot(),
            },
        }
    }

    /// Snapshot the current flow's assignments, failing outside a flow scope.
    pub fn try_current() -> Result<Self, ChannelError> {
        let slots = FLOW_SLOTS
            .try_with(|slots| slots.borrow().clone())
            .map_err(|_| ChannelError::OutsideFlow)?;
        Ok(Self { slots })
    }

    #[must_use]
    pub fn handle(&self, slot: SlotId) -> Option<ContextHandle> {
        self.slots.get(&slot).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Run `fut` as a flow seeded with this snapshot.
    pub fn scope<F: Future>(self, fut: F) -> impl Future<Output = F::Output> {
        FLOW_SLOTS.scope(RefCell::new(self.slots), fut)
    }

    /// Run `f` as a flow seeded with this snapshot.
    pub fn sync_scope<R>(self, f: impl FnOnce() -> R) -> R {
        FLOW_SLOTS.sync_scope(RefCell::new(self.slots), f)
    }
}

/// Run `fut` as a new root flow, unrelated to the caller.
pub fn scope<F: Future>(fut: F) -> impl Future<Output = F::Output> {
    FlowContext::new().scope(fut)
}

/// Run `f` as a new root flow, unrelated to the caller.
pub fn sync_scope<R>(f: impl FnOnce() -> R) -> R {
    FlowContext::new().sync_scope(f)
}

/// Fork the current flow onto a new tokio task.
pub fn spawn<F>(fut: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let context = FlowContext::capture();
    tracing::trace!(slots = context.len(), "forking flow onto task");
    tokio::spawn(context.scope(fut))
}

/// Fork the current flow onto tokio's blocking pool.
pub fn spawn_blocking<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let context = FlowContext::capture();
    tracing::trace!(slots = context.len(), "forking flow onto blocking pool");
    task::spawn_blocking(move || context.sync_scope(f))
}

/// Fork the current flow onto a new OS thread.
pub fn spawn_thread<F, R>(f: F) -> thread::JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let context = FlowContext::capture();
    tracing::trace!(slots = context.len(), "forking flow onto thread");
    thread::spawn(move || context.sync_scope(f))
}

#[must_use]
pub fn current_scope() -> ScopeKind {
    if FLOW_SLOTS.try_with(|_| ()).is_ok() {
        ScopeKind::Flow
    } else {
        ScopeKind::Thread
    }
}

/// Whether the caller runs inside a tokio runtime context.
#[must_use]
pub fn runtime_active() -> bool {
    Handle::try_current().is_ok()
}

/// The default channel: flow scopes, degrading to thread identity outside them.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowChannel;

impl FlowChannel {
    /// Read a slot from the current flow only.
    pub fn try_get_slot(&self, slot: SlotId) -> Result<Option<ContextHandle>, ChannelError> {
        FLOW_SLOTS
            .try_with(|slots| slots.borrow().get(&slot).copied())
            .map_err(|_| ChannelError::OutsideFlow)
    }

    /// Write a slot in the current flow only.
    pub fn try_set_slot(&self, slot: SlotId, handle: ContextHandle) -> Result<(), ChannelError> {
        FLOW_SLOTS
            .try_with(|slots| {
                slots.borrow_mut().insert(slot, handle);
            })
            .map_err(|_| ChannelError::OutsideFlow)
    }
}

impl AmbientChannel for FlowChannel {
    fn get_slot(&self, slot: SlotId) -> Option<ContextHandle> {
        self.try_get_slot(slot).unwrap_or_else(|_| thread_slots::get(slot))
    }

    fn set_slot(&self, slot: SlotId, handle: ContextHandle) {
        if self.try_set_slot(slot, handle).is_err() {
            thread_slots::set(slot, handle);
        }
    }

    fn scope_kind(&self) -> ScopeKind {
        current_scope()
    }
}
