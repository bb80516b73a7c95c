#![forbid(unsafe_code)]

//! Localization configuration.
//!
//! Settings can be built in code, deserialized from a host application's
//! settings file, or read from the environment:
//!
//! | Variable | Values | Effect |
//! |----------|--------|--------|
//! | `PROPWIRE_JOIN_DIRECTION` | `ltr`, `rtl` | Fragment join order |
//! | `PROPWIRE_DEBUG_TRANSLATION` | `1`, `true`, `yes`, `on` | Start with the debug-marker translator |
//!
//! Unrecognized values are ignored and the default is kept.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Order in which a compound translatable joins its rendered parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinDirection {
    /// Source first, then fragments in append order.
    #[default]
    LeftToRight,
    /// The left-to-right sequence, reversed.
    RightToLeft,
}

impl JoinDirection {
    /// Parse `ltr` / `rtl` (and the spelled-out forms), case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ltr" | "left_to_right" | "left-to-right" => Some(Self::LeftToRight),
            "rtl" | "right_to_left" | "right-to-left" => Some(Self::RightToLeft),
            _ => None,
        }
    }
}

/// Configuration for the localization context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizationConfig {
    /// Join order for compound translatables.
    pub join_direction: JoinDirection,
    /// Start with the debug-marker translator instead of identity, to audit
    /// strings that were never tagged translatable.
    pub debug_markers: bool,
}

impl LocalizationConfig {
    /// Default configuration: left-to-right joins, identity translator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fragment join direction.
    #[must_use]
    pub fn with_join_direction(mut self, direction: JoinDirection) -> Self {
        self.join_direction = direction;
        self
    }

    /// Set whether the debug-marker translator is installed at start.
    #[must_use]
    pub fn with_debug_markers(mut self, enabled: bool) -> Self {
        self.debug_markers = enabled;
        self
    }

    /// Read configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Read configuration through a custom environment lookup.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = get_env("PROPWIRE_JOIN_DIRECTION") {
            match JoinDirection::parse(&raw) {
                Some(direction) => config.join_direction = direction,
                None => warn!(value = %raw, "unrecognized PROPWIRE_JOIN_DIRECTION, keeping default"),
            }
        }
        if let Some(value) = get_env("PROPWIRE_DEBUG_TRANSLATION") {
            config.debug_markers = env_flag(&value);
        }
        config
    }
}

#[inline]
fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
