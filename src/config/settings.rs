//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// BackendConfig
// ---------------------------------------------------------------------------

/// Connection settings for the remote recognition services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the Bcut recognition endpoint.
    pub bcut_base_url: String,
    /// Base URL of the JianYing recognition endpoint.
    pub jianying_base_url: String,
    /// Maximum seconds to wait for a recognition response before timing out.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            bcut_base_url: "https://member.bilibili.com/x/bcut".into(),
            jianying_base_url: "https://lv-pc-api.ulikecam.com".into(),
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// DispatcherConfig
// ---------------------------------------------------------------------------

/// Settings for the job dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Hard cap on concurrently running jobs; excess submissions wait in
    /// the FIFO queue.
    pub max_concurrent_jobs: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// CacheConfig
// ---------------------------------------------------------------------------

/// Settings for the persisted recognition cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether recognition results are cached at all.
    pub enabled: bool,
    /// Size ceiling in bytes; the whole store is wiped once exceeded.
    pub max_bytes: u64,
    /// Explicit store file path — `None` means the default under the
    /// system temp dir.
    pub file: Option<PathBuf>,
}

impl CacheConfig {
    /// The store file to use: the configured override, or the default
    /// temp-directory path.
    pub fn resolved_file(&self) -> PathBuf {
        self.file
            .clone()
            .unwrap_or_else(|| AppPaths::new().cache_file)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_bytes: 10 * 1024 * 1024,
            file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// StreamConfig
// ---------------------------------------------------------------------------

/// Settings for the streaming assembler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Buffered bytes at which the assembler flushes to the backend.
    pub chunk_threshold: usize,
    /// Capacity of the bounded input queue, in chunks.  A full queue
    /// rejects `feed` calls (backpressure) instead of blocking the capture
    /// source.
    pub queue_capacity: usize,
    /// Poll timeout of the consumer loop in milliseconds — the upper bound
    /// on how long `stop()` waits for the loop to notice the stop flag.
    pub poll_interval_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_threshold: 16 * 1024,
            queue_capacity: 100,
            poll_interval_ms: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use asr_relay::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote backend connection settings.
    pub backend: BackendConfig,
    /// Job dispatcher settings.
    pub dispatcher: DispatcherConfig,
    /// Recognition cache settings.
    pub cache: CacheConfig,
    /// Streaming assembler settings.
    pub stream: StreamConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
