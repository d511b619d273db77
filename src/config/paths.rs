//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\asr-relay\
//!   macOS:   ~/Library/Application Support/asr-relay/
//!   Linux:   ~/.config/asr-relay/
//!
//! Cache file (persisted recognition results):
//!   <system temp dir>/asr-relay/asr_cache.json
//!
//! The cache lives under the temp dir on purpose: it is a disposable
//! deduplication store, not user data, and the OS is free to clean it up.

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Default path of the recognition cache store.
    pub cache_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "asr-relay";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path (should be extremely rare in practice).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let cache_file = std::env::temp_dir()
            .join(Self::APP_NAME)
            .join("asr_cache.json");

        Self {
            config_dir,
            settings_file,
            cache_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
