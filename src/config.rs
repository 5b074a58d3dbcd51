//! # Configuration Module
//!
//! Dispatcher configuration: where the application lives (`base_url`), which
//! query parameter selects the action (`action_key`), which action a bare
//! request is redirected to (`default_action`), and whether failures are
//! surfaced in full (`debug`).
//!
//! ## Sources
//!
//! Configuration is usually built in code through the fluent setters on
//! [`crate::App`]. Hosts that prefer files can load YAML or TOML:
//!
//! ```yaml
//! base_url: "http://127.0.0.1:8080/"
//! action_key: "_"
//! default_action: "home"
//! debug: false
//! ```
//!
//! and then layer environment overrides on top with [`AppConfig::apply_env`]:
//!
//! - `METIME_BASE_URL`
//! - `METIME_ACTION_KEY`
//! - `METIME_DEFAULT_ACTION`
//! - `METIME_DEBUG` (`true`/`false`/`1`/`0`)
//!
//! ## Validation
//!
//! Nothing is checked when a value is set. [`AppConfig::validate`] runs once at
//! the start of every dispatch cycle, before the action is resolved.

use crate::error::DispatchError;
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::{debug, warn};

/// Default query parameter carrying the action name.
pub const DEFAULT_ACTION_KEY: &str = "_";
/// Default action a request without an action is redirected to.
pub const DEFAULT_ACTION: &str = "home";

#[allow(clippy::expect_used)]
static ACTION_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-]+$").expect("valid action key regex"));

/// Dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Absolute URL of the single entry point. Required before dispatch.
    pub base_url: Option<String>,
    /// Query parameter name that selects the action.
    pub action_key: String,
    /// Action used when the request carries no action.
    pub default_action: String,
    /// Surface full error detail in 500 responses.
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            action_key: DEFAULT_ACTION_KEY.to_string(),
            default_action: DEFAULT_ACTION.to_string(),
            debug: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML or TOML file.
    ///
    /// Files ending in `.toml` are parsed as TOML; everything else as YAML.
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let config = if is_toml {
            Self::from_toml_str(&raw)
        } else {
            Self::from_yaml_str(&raw)
        }
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
        debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parse configuration from a YAML document.
    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Parse configuration from a TOML document.
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `METIME_*` environment overrides.
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|name| env::var(name).ok())
    }

    /// Apply `METIME_*` overrides read through `lookup`.
    ///
    /// An unparseable `METIME_DEBUG` is logged and leaves `debug` unchanged.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup("METIME_BASE_URL") {
            self.base_url = Some(base_url);
        }
        if let Some(action_key) = lookup("METIME_ACTION_KEY") {
            self.action_key = action_key;
        }
        if let Some(default_action) = lookup("METIME_DEFAULT_ACTION") {
            self.default_action = default_action;
        }
        if let Some(raw) = lookup("METIME_DEBUG") {
            match parse_flag(&raw) {
                Some(flag) => self.debug = flag,
                None => warn!(value = %raw, "Ignoring unparseable METIME_DEBUG"),
            }
        }
        self
    }

    /// Check the configuration before an action is resolved.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Configuration`] when the base URL is missing or not a
    /// valid absolute URL, or the action key contains characters outside
    /// `[A-Za-z0-9_-]`.
    pub fn validate(&self) -> Result<(), DispatchError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| DispatchError::Configuration("App must have a base URL".to_string()))?;

        url::Url::parse(base_url).map_err(|err| {
            DispatchError::Configuration(format!("Invalid base URL '{base_url}': {err}"))
        })?;

        if !ACTION_KEY_RE.is_match(&self.action_key) {
            return Err(DispatchError::Configuration(format!(
                "Invalid action key '{}'. Action keys may only contain letters, digits, '_' and '-'",
                self.action_key
            )));
        }

        Ok(())
    }

    /// Base URL, or an empty string when unset.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or_default()
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
