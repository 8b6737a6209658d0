//! Adapter configuration.
//!
//! # Example
//!
//! ```ignore
//! use lambda_bridge::AdapterOptions;
//!
//! let options = AdapterOptions::new()
//!     .with_lifespan()
//!     .with_base_path("/api")
//!     .with_text_mime_type("application/csv");
//! ```
//!
//! # Environment
//!
//! | Variable | Field | Format |
//! |----------|-------|--------|
//! | `BRIDGE_ENABLE_LIFESPAN` | `enable_lifespan` | `true`/`false`/`1`/`0` |
//! | `BRIDGE_API_GATEWAY_BASE_PATH` | `api_gateway_base_path` | path prefix |
//! | `BRIDGE_TEXT_MIME_TYPES` | `text_mime_types` | comma-separated list |

// ============================================================================
// Imports
// ============================================================================

use std::env;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Environment variable enabling lifespan.
pub const ENV_ENABLE_LIFESPAN: &str = "BRIDGE_ENABLE_LIFESPAN";

/// Environment variable holding the base path.
pub const ENV_API_GATEWAY_BASE_PATH: &str = "BRIDGE_API_GATEWAY_BASE_PATH";

/// Environment variable listing extra text MIME types.
pub const ENV_TEXT_MIME_TYPES: &str = "BRIDGE_TEXT_MIME_TYPES";

// ============================================================================
// AdapterOptions
// ============================================================================

/// Adapter behavior switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterOptions {
    /// Run the lifespan handshake on the first invocation.
    pub enable_lifespan: bool,

    /// Prefix stripped from HTTP paths (custom domain mappings).
    pub api_gateway_base_path: Option<String>,

    /// Extra content types whose bodies are returned as text.
    pub text_mime_types: Vec<String>,
}

// ============================================================================
// Constructors
// ============================================================================

impl AdapterOptions {
    /// Creates options with lifespan disabled and no base path.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enable_lifespan: false,
            api_gateway_base_path: None,
            text_mime_types: Vec::new(),
        }
    }

    /// Reads options from the process environment.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `BRIDGE_ENABLE_LIFESPAN` is not a
    /// boolean.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads options through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the lifespan flag is not a boolean.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::new();

        if let Some(value) = lookup(ENV_ENABLE_LIFESPAN) {
            options.enable_lifespan = parse_bool(ENV_ENABLE_LIFESPAN, &value)?;
        }

        if let Some(value) = lookup(ENV_API_GATEWAY_BASE_PATH)
            && !value.trim().is_empty()
        {
            options.api_gateway_base_path = Some(value.trim().to_string());
        }

        if let Some(value) = lookup(ENV_TEXT_MIME_TYPES) {
            options.text_mime_types = value
                .split(',')
                .map(str::trim)
                .filter(|mime| !mime.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(options)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl AdapterOptions {
    /// Enables lifespan.
    #[inline]
    #[must_use]
    pub fn with_lifespan(mut self) -> Self {
        self.enable_lifespan = true;
        self
    }

    /// Sets the base path stripped from HTTP paths.
    #[inline]
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.api_gateway_base_path = Some(base_path.into());
        self
    }

    /// Adds a content type returned as text.
    #[inline]
    #[must_use]
    pub fn with_text_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.text_mime_types.push(mime.into());
        self
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::config(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
