//! Store configuration.
//!
//! `StoreOptions` deserializes from TOML so hosts can embed a `[flowlocal]`
//! table in their own config file. Every field has a default; an empty table
//! yields `StoreOptions::default()`.

use std::env;
use std::num::NonZeroUsize;

use serde::Deserialize;

pub const FALLBACK_NOTICE_ENV: &str = "FLOWLOCAL_FALLBACK_NOTICE";
pub const CAPACITY_WARNING_ENV: &str = "FLOWLOCAL_CAPACITY_WARNING";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse store options: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{var}={value:?} is invalid (expected {expected})")]
    InvalidEnv {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Level used when a store first resolves a handle outside any flow scope.
///
/// Only applies off the runtime. On a tokio runtime the notice is always a
/// warning.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FallbackNotice {
    Debug,
    #[default]
    Warn,
}

impl FallbackNotice {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Warn => "warn",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(Self::Debug),
            "warn" | "warning" => Some(Self::Warn),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreOptions {
    /// Name attached to the store's log events.
    pub label: Option<String>,
    /// How loudly to report thread-identity fallback.
    pub fallback_notice: FallbackNotice,
    /// Entry count above which the store emits a single warning.
    pub capacity_warning: Option<NonZeroUsize>,
}

impl StoreOptions {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_fallback_notice(mut self, notice: FallbackNotice) -> Self {
        self.fallback_notice = notice;
        self
    }

    #[must_use]
    pub fn with_capacity_warning(mut self, threshold: NonZeroUsize) -> Self {
        self.capacity_warning = Some(threshold);
        self
    }

    /// Apply `FLOWLOCAL_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|var| env::var(var).ok())
    }

    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(FALLBACK_NOTICE_ENV) {
            self.fallback_notice =
                FallbackNotice::parse(&value).ok_or_else(|| ConfigError::InvalidEnv {
                    var: FALLBACK_NOTICE_ENV,
                    value: value.clone(),
                    expected: "debug or warn",
                })?;
        }
        if let Some(value) = lookup(CAPACITY_WARNING_ENV) {
            let threshold = value.trim().parse::<NonZeroUsize>().map_err(|_| {
                ConfigError::InvalidEnv {
                    var: CAPACITY_WARNING_ENV,
                    value: value.clone(),
                    expected: "a positive integer",
                }
            })?;
            self.capacity_warning = Some(threshold);
        }
        Ok(self)
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("unnamed")
    }
}
