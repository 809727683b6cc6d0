//! Core types for flowlocal.
//!
//! Pure data with no IO and no async: context handles, slot identities, and
//! the options a store is built with.

mod ids;
mod settings;

pub use ids::{ContextHandle, SlotId};
pub use settings::{
    CAPACITY_WARNING_ENV, ConfigError, FALLBACK_NOTICE_ENV, FallbackNotice, StoreOptions,
};
