use serde::{Deserialize, Serialize};
use zrep_core::error::AppError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for one Zabbix server profile.
///
/// Loading and persisting profiles is the caller's concern; this is the already-loaded value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZabbixConfig {
    /// JSON-RPC endpoint, e.g. `https://zabbix.example.com/api_jsonrpc.php`.
    pub url: String,
    pub token: String,
    /// Per-request timeout. Missing or zero falls back to `DEFAULT_TIMEOUT_SECS`.
    #[serde(default)]
    pub timeout_secs: u64,
}

impl ZabbixConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn effective_timeout_secs(&self) -> u64 {
        if self.timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            self.timeout_secs
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(AppError::new("ZBX_CONFIG_INVALID", "Zabbix URL is empty"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(
                AppError::new("ZBX_CONFIG_INVALID", "Zabbix URL must use http or https")
                    .with_details(format!("url={url}")),
            );
        }
        if self.token.trim().is_empty() {
            return Err(AppError::new("ZBX_CONFIG_INVALID", "Zabbix API token is empty")
                .with_details(format!("url={url}")));
        }
        Ok(())
    }
}
