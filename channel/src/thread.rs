//! Thread-identity slots.
//!
//! Used when no flow scope is active. Correct for synchronous call chains
//! that stay on one OS thread; assignments do not follow work that hops to
//! another thread unless it was forked through [`crate::flow`].

use std::cell::RefCell;
use std::collections::HashMap;

use flowlocal_types::{ContextHandle, SlotId};

use crate::ambient::{AmbientChannel, ScopeKind};
use crate::flow::SlotMap;

thread_local! {
    static THREAD_SLOTS: RefCell<SlotMap> = RefCell::new(HashMap::new());
}

pub(crate) fn get(slot: SlotId) -> Option<ContextHandle> {
    THREAD_SLOTS.with(|slots| slots.borrow().get(&slot).copied())
}

pub(crate) fn set(slot: SlotId, handle: ContextHandle) {
    THREAD_SLOTS.with(|slots| {
        slots.borrow_mut().insert(slot, handle);
    });
}

pub(crate) fn snapshot() -> SlotMap {
    THREAD_SLOTS.with(|slots| slots.borrow().clone())
}

/// Channel keyed purely by the calling thread.
///
/// For hosts that never enter flow scopes. Always reports
/// [`ScopeKind::Thread`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadChannel;

impl AmbientChannel for ThreadChannel {
    fn get_slot(&self, slot: SlotId) -> Option<ContextHandle> {
        get(slot)
    }

    fn set_slot(&self, slot: SlotId, handle: ContextHandle) {
        set(slot, handle);
    }

    fn scope_kind(&self) -> ScopeKind {
        ScopeKind::Thread
    }
}
