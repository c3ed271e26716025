//! Gateway configuration, loadable from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! [gateway]
//! time_cookie = "gromit-time"
//! max_clock_skew_ms = 604800000
//! skew_notice_delay_ms = 3000
//! background_header = "X-Gromit-Background"
//! max_auth_retries = 1
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

/// One week.
pub const DEFAULT_MAX_CLOCK_SKEW_MS: i64 = 604_800_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Cookie carrying the server's epoch time in milliseconds.
    pub time_cookie: String,
    pub max_clock_skew_ms: i64,
    pub skew_notice_delay_ms: u64,
    /// Header sent with `true` on background requests.
    pub background_header: String,
    /// How many times one request may enter the challenge path before it
    /// is failed instead of queued again.
    pub max_auth_retries: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            time_cookie: "gromit-time".to_string(),
            max_clock_skew_ms: DEFAULT_MAX_CLOCK_SKEW_MS,
            skew_notice_delay_ms: 3000,
            background_header: "X-Gromit-Background".to_string(),
            max_auth_retries: 1,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    gateway: Option<GatewayConfig>,
}

impl GatewayConfig {
    pub fn skew_notice_delay(&self) -> Duration {
        Duration::from_millis(self.skew_notice_delay_ms)
    }

    /// Parse the `[gateway]` table of a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(content)?;
        Ok(file.gateway.unwrap_or_default())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
