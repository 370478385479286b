use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zrep_core::error::AppError;

use crate::config::ZabbixConfig;

#[derive(Debug, Clone, Serialize)]
struct RpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: P,
    id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

const AUTH_MARKERS: [&str; 5] = [
    "not authorized",
    "not authorised",
    "session terminated",
    "re-login",
    "api token expired",
];

/// Map a JSON-RPC error object to `ZBX_AUTH_FAILED` or `ZBX_API_ERROR`.
pub fn classify_rpc_error(method: &str, err: &RpcError) -> AppError {
    let text = format!("{} {}", err.message, err.data).to_lowercase();
    let code = if AUTH_MARKERS.iter().any(|m| text.contains(m)) {
        "ZBX_AUTH_FAILED"
    } else {
        "ZBX_API_ERROR"
    };
    AppError::new(code, format!("Zabbix API call {method} failed"))
        .with_details(format!("rpc_code={}; message={}; data={}", err.code, err.message, err.data))
}

/// Blocking JSON-RPC client for one Zabbix server.
#[derive(Clone)]
pub struct ZabbixClient {
    config: ZabbixConfig,
    agent: ureq::Agent,
}

impl fmt::Debug for ZabbixClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZabbixClient")
            .field("url", &self.config.url)
            .field("timeout_secs", &self.config.effective_timeout_secs())
            .finish_non_exhaustive()
    }
}

impl ZabbixClient {
    pub fn new(config: ZabbixConfig) -> Result<Self, AppError> {
        config.validate()?;
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.effective_timeout_secs()))
            .build();
        Ok(Self { config, agent })
    }

    pub fn config(&self) -> &ZabbixConfig {
        &self.config
    }

    /// Query `apiinfo.version`; used as the connection test. Sent without credentials.
    pub fn api_version(&self) -> Result<String, AppError> {
        self.send("apiinfo.version", serde_json::json!([]), false)
    }

    pub fn test_connection(&self) -> Result<(), AppError> {
        let version = self.api_version()?;
        tracing::info!(url = %self.config.url, %version, "connected to zabbix");
        Ok(())
    }

    pub(crate) fn call<P, T>(&self, method: &str, params: P) -> Result<T, AppError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        self.send(method, params, true)
    }

    fn send<P, T>(&self, method: &str, params: P, authenticated: bool) -> Result<T, AppError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        })
        .map_err(|e| {
            AppError::new("ZBX_ENCODE_FAILED", "Failed to encode Zabbix request")
                .with_details(format!("method={method}; err={e}"))
        })?;

        let mut req = self
            .agent
            .post(self.config.url.trim())
            .set("Content-Type", "application/json-rpc");
        if authenticated {
            req = req.set("Authorization", &format!("Bearer {}", self.config.token.trim()));
        }

        let resp = match req.send_json(body) {
            Ok(r) => r,
            Err(ureq::Error::Status(status, r)) => {
                let text = r.into_string().unwrap_or_default();
                return Err(
                    AppError::new("ZBX_HTTP_STATUS", "Zabbix server returned an error status")
                        .with_details(format!("method={method}; status={status}; body={text}"))
                        .with_retryable(status >= 500),
                );
            }
            Err(e) => {
                return Err(AppError::new(
                    "ZBX_TRANSPORT_FAILED",
                    "Failed to reach Zabbix server",
                )
                .with_details(format!("method={method}; url={}; err={e}", self.config.url))
                .with_retryable(true));
            }
        };

        let parsed: RpcResponse<T> = resp.into_json().map_err(|e| {
            AppError::new("ZBX_DECODE_FAILED", "Failed to decode Zabbix response")
                .with_details(format!("method={method}; err={e}"))
        })?;

        if let Some(err) = parsed.error {
            let mapped = classify_rpc_error(method, &err);
            tracing::warn!(method, code = %mapped.code, rpc_code = err.code, "zabbix api error");
            return Err(mapped);
        }
        parsed.result.ok_or_else(|| {
            AppError::new("ZBX_DECODE_FAILED", "Zabbix response has neither result nor error")
                .with_details(format!("method={method}"))
        })
    }
}
