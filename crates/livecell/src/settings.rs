//! Options for live cells, persisted as JSON.
//!
//! The default location is the user's config directory:
//! - macOS: ~/Library/Application Support/livecell/options.json
//! - Linux: ~/.config/livecell/options.json
//! - Windows: C:\Users\<User>\AppData\Roaming\livecell\options.json
//!
//! Every field has a default, so partial files (or files written by an older
//! version) load cleanly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

pub const DEFAULT_KERNEL_NAME: &str = "python3";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8888";
pub const DEFAULT_MATHJAX_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/mathjax/2.7.4/MathJax.js";
pub const DEFAULT_MATHJAX_CONFIG: &str = "TeX-AMS_CHTML-full,Safe";

/// Kernel requested for a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelOptions {
    /// Kernelspec name (e.g. "python3", "ir")
    pub name: String,
    /// Working directory path on the server
    pub path: String,
}

impl Default for KernelOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_KERNEL_NAME.to_string(),
            path: "/".to_string(),
        }
    }
}

/// Jupyter server the kernel lives on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub base_url: String,
    /// Websocket URL; derived from `base_url` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
    pub token: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ws_url: None,
            token: String::new(),
        }
    }
}

impl ServerSettings {
    /// Websocket URL for the server, falling back to `base_url` with a ws scheme.
    pub fn ws_url(&self) -> String {
        if let Some(ref url) = self.ws_url {
            return url.clone();
        }
        if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        }
    }
}

/// Math typesetting options handed to each cell's output area on init.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MathjaxOptions {
    pub url: String,
    pub config: String,
}

impl Default for MathjaxOptions {
    fn default() -> Self {
        Self {
            url: DEFAULT_MATHJAX_URL.to_string(),
            config: DEFAULT_MATHJAX_CONFIG.to_string(),
        }
    }
}

/// Top-level options, stored in the `config` slice of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub kernel_options: KernelOptions,
    pub server_settings: ServerSettings,
    pub mathjax: MathjaxOptions,
}

/// Get the default path to the options file
pub fn default_options_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("livecell")
        .join("options.json")
}

/// Load options from `path`, returning defaults if the file doesn't exist.
///
/// A file that exists but cannot be parsed is an error rather than a silent
/// reset, so a typo doesn't discard a user's server token.
pub fn load_options(path: &Path) -> Result<Options, SettingsError> {
    if !path.exists() {
        return Ok(Options::default());
    }
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Save options to `path`, creating parent directories as needed
pub fn save_options(path: &Path, options: &Options) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(options)?)?;
    Ok(())
}
