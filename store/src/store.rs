//! The context-scoped store.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use flowlocal_channel::{AmbientChannel, FlowChannel, ScopeKind, flow};
use flowlocal_types::{ContextHandle, FallbackNotice, SlotId, StoreOptions};

use crate::lease::FlowLease;

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// A value of `T` per logical execution flow.
///
/// Each store owns one slot in the ambient channel. The first access from a
/// flow assigns that flow a [`ContextHandle`] and writes it into the slot;
/// the handle is then copied into every flow forked afterwards. Values live
/// in a concurrent map keyed by handle, so a parent and the children it forks
/// after assignment share one mutable cell: a write by either is visible to
/// both.
///
/// Resolution goes through `C`. With the default [`FlowChannel`], callers
/// outside any flow scope are keyed by OS thread instead (see
/// [`FlowLocal::scope_kind`]); the store logs this once, always as a warning
/// when the caller is a tokio task.
///
/// Entries are never evicted on their own. Use [`FlowLocal::release`],
/// [`FlowLocal::remove`], or [`FlowLocal::lease`] to bound their lifetime.
///
/// The default factory and the closures passed to [`FlowLocal::with`] and
/// [`FlowLocal::update`] run while part of the map is locked and must not
/// call back into the same store.
pub struct FlowLocal<T, C = FlowChannel> {
    slot: SlotId,
    values: DashMap<ContextHandle, T>,
    factory: Factory<T>,
    channel: C,
    options: StoreOptions,
    fallback_reported: AtomicBool,
    over_capacity: AtomicBool,
}

impl<T> FlowLocal<T> {
    pub fn new(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self::with_options(factory, StoreOptions::default())
    }

    pub fn with_options(
        factory: impl Fn() -> T + Send + Sync + 'static,
        options: StoreOptions,
    ) -> Self {
        Self::with_channel(factory, FlowChannel, options)
    }
}

impl<T: Default + 'static> Default for FlowLocal<T> {
    fn default() -> Self {
        Self::new(T::default)
    }
}

impl<T, C> FlowLocal<T, C> {
    #[must_use]
    pub fn slot_id(&self) -> SlotId {
        self.slot
    }

    #[must_use]
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Number of materialized entries across all flows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop the entry for `handle`, returning its value.
    ///
    /// Flows still carrying the handle see a fresh default on next access.
    pub fn remove(&self, handle: ContextHandle) -> Option<T> {
        let removed = self.values.remove(&handle).map(|(_, value)| value);
        if removed.is_some() {
            tracing::debug!(
                slot = %self.slot,
                label = self.options.label(),
                handle = %handle,
                "released flow-local entry"
            );
            self.rearm_capacity();
        }
        removed
    }

    pub fn clear(&self) {
        self.values.clear();
        self.over_capacity.store(false, Ordering::Relaxed);
    }

    pub(crate) fn with_at<R>(&self, handle: ContextHandle, f: impl FnOnce(&T) -> R) -> R {
        if let Some(value) = self.values.get(&handle) {
            return f(&value);
        }
        let mut inserted = false;
        let out = {
            let value = self
                .values
                .entry(handle)
                .or_insert_with(|| {
                    inserted = true;
                    self.materialize(handle)
                })
                .downgrade();
            f(&value)
        };
        if inserted {
            self.check_capacity();
        }
        out
    }

    pub(crate) fn update_at<R>(&self, handle: ContextHandle, f: impl FnOnce(&mut T) -> R) -> R {
        let mut inserted = false;
        let out = {
            let mut value = self.values.entry(handle).or_insert_with(|| {
                inserted = true;
                self.materialize(handle)
            });
            f(&mut value)
        };
        if inserted {
            self.check_capacity();
        }
        out
    }

    pub(crate) fn replace_at(&self, handle: ContextHandle, value: T) -> Option<T> {
        let previous = self.values.insert(handle, value);
        if previous.is_none() {
            self.check_capacity();
        }
        previous
    }

    fn materialize(&self, handle: ContextHandle) -> T {
        tracing::trace!(slot = %self.slot, handle = %handle, "materializing default value");
        (self.factory)()
    }

    // Must not be called while holding a map guard.
    fn check_capacity(&self) {
        let Some(threshold) = self.options.capacity_warning else {
            return;
        };
        let entries = self.values.len();
        if entries > threshold.get() && !self.over_capacity.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                slot = %self.slot,
                label = self.options.label(),
                entries,
                threshold = threshold.get(),
                "flow-local store grew past its capacity warning; release entries when flows finish"
            );
        }
    }

    fn rearm_capacity(&self) {
        if let Some(threshold) = self.options.capacity_warning
            && self.values.len() <= threshold.get()
        {
            self.over_capacity.store(false, Ordering::Relaxed);
        }
    }
}

impl<T, C: AmbientChannel> FlowLocal<T, C> {
    /// Build a store that resolves handles through `channel`.
    pub fn with_channel(
        factory: impl Fn() -> T + Send + Sync + 'static,
        channel: C,
        options: StoreOptions,
    ) -> Self {
        let slot = SlotId::allocate();
        tracing::debug!(slot = %slot, label = options.label(), "created flow-local store");
        Self {
            slot,
            values: DashMap::new(),
            factory: Box::new(factory),
            channel,
            options,
            fallback_reported: AtomicBool::new(false),
            over_capacity: AtomicBool::new(false),
        }
    }

    /// The current flow's value, materializing the default on first access.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Overwrite the current flow's value.
    pub fn set(&self, value: T) {
        self.replace(value);
    }

    /// Overwrite the current flow's value, returning the previous one if it
    /// had been materialized.
    pub fn replace(&self, value: T) -> Option<T> {
        self.replace_at(self.current_handle(), value)
    }

    /// Borrow the current flow's value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.with_at(self.current_handle(), f)
    }

    /// Modify the current flow's value in place.
    ///
    /// Atomic with respect to every other operation on the same handle.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.update_at(self.current_handle(), f)
    }

    /// The caller's handle, assigning one if the flow has none yet.
    ///
    /// Does not materialize a value. A parent can call this before forking so
    /// its children share the handle.
    pub fn current_handle(&self) -> ContextHandle {
        if let Some(handle) = self.channel.get_slot(self.slot) {
            return handle;
        }
        let handle = ContextHandle::generate();
        self.channel.set_slot(self.slot, handle);
        let scope = self.channel.scope_kind();
        tracing::trace!(
            slot = %self.slot,
            handle = %handle,
            scope = scope.as_str(),
            "assigned context handle"
        );
        if scope == ScopeKind::Thread {
            self.report_fallback();
        }
        handle
    }

    /// The caller's handle if one was already assigned.
    #[must_use]
    pub fn peek_handle(&self) -> Option<ContextHandle> {
        self.channel.get_slot(self.slot)
    }

    #[must_use]
    pub fn scope_kind(&self) -> ScopeKind {
        self.channel.scope_kind()
    }

    /// Drop the current flow's entry, if it has a handle. Never assigns one.
    pub fn release(&self) -> Option<T> {
        self.peek_handle().and_then(|handle| self.remove(handle))
    }

    /// Pin the current handle; its entry is removed when the lease drops.
    pub fn lease(&self) -> FlowLease<'_, T, C> {
        FlowLease::new(self, self.current_handle())
    }

    /// Once per store. A tokio task outside any flow always warns, whatever
    /// `fallback_notice` says.
    fn report_fallback(&self) {
        if self.fallback_reported.swap(true, Ordering::Relaxed) {
            return;
        }
        let notice = self.options.fallback_notice;
        if flow::runtime_active() {
            tracing::warn!(
                slot = %self.slot,
                label = self.options.label(),
                notice = notice.as_str(),
                "task outside any flow scope; values are shared by every such task on this worker thread"
            );
            return;
        }
        match notice {
            FallbackNotice::Debug => tracing::debug!(
                slot = %self.slot,
                label = self.options.label(),
                notice = notice.as_str(),
                "no flow scope active; resolving by thread identity"
            ),
            FallbackNotice::Warn => tracing::warn!(
                slot = %self.slot,
                label = self.options.label(),
                notice = notice.as_str(),
                "no flow scope active; resolving by thread identity"
            ),
        }
    }
}

impl<T, C> fmt::Debug for FlowLocal<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowLocal")
            .field("slot", &self.slot)
            .field("label", &self.options.label())
            .field("entries", &self.values.len())
            .finish_non_exhaustive()
    }
}
