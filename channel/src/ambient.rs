//! The channel seam between a store and whatever carries flow identity.

use std::sync::Arc;

use flowlocal_types::{ContextHandle, SlotId};

/// Where the caller's slot assignments currently live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Inside a flow scope; assignments follow the logical flow across threads.
    Flow,
    /// Outside any flow scope; assignments are keyed by the calling OS thread.
    Thread,
}

impl ScopeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flow => "flow",
            Self::Thread => "thread",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("no flow scope is active for the caller")]
    OutsideFlow,
}

/// Per-flow slot storage that a store reads and conditionally writes.
///
/// A value written with `set_slot` must be visible to the same flow after any
/// thread hop, and to flows forked from it afterwards, but not to flows that
/// existed independently or forked earlier.
pub trait AmbientChannel: Send + Sync {
    fn get_slot(&self, slot: SlotId) -> Option<ContextHandle>;

    fn set_slot(&self, slot: SlotId, handle: ContextHandle);

    fn scope_kind(&self) -> ScopeKind;
}

impl<C: AmbientChannel + ?Sized> AmbientChannel for Arc<C> {
    fn get_slot(&self, slot: SlotId) -> Option<ContextHandle> {
        (**self).get_slot(slot)
    }

    fn set_slot(&self, slot: SlotId, handle: ContextHandle) {
        (**self).set_slot(slot, handle);
    }

    fn scope_kind(&self) -> ScopeKind {
        (**self).scope_kind()
    }
}
