use flowlocal_types::ContextHandle;

use crate::store::FlowLocal;

/// A pinned handle whose store entry is removed when the lease drops.
///
/// Obtained from [`FlowLocal::lease`] at the start of a unit of work. The
/// flow keeps its handle after the lease ends; only the value is released.
#[must_use = "dropping a lease immediately releases the entry"]
pub struct FlowLease<'a, T, C> {
    store: &'a FlowLocal<T, C>,
    handle: ContextHandle,
    armed: bool,
}

impl<'a, T, C> FlowLease<'a, T, C> {
    pub(crate) fn new(store: &'a FlowLocal<T, C>, handle: ContextHandle) -> Self {
        Self {
            store,
            handle,
            armed: true,
        }
    }

    #[must_use]
    pub fn handle(&self) -> ContextHandle {
        self.handle
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.store.with_at(self.handle, T::clone)
    }

    pub fn set(&self, value: T) {
        self.store.replace_at(self.handle, value);
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.store.update_at(self.handle, f)
    }

    /// End the lease without releasing the entry.
    pub fn keep(mut self) -> ContextHandle {
        self.armed = false;
        self.handle
    }
}

impl<T, C> Drop for FlowLease<'_, T, C> {
    fn drop(&mut self) {
        if self.armed {
            self.store.remove(self.handle);
        }
    }
}
