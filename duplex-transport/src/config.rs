use serde::Deserialize;
use serde::Serialize;

/// Level-gated logger threshold (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration recognised by the Transport (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportConfig {
    pub base_url: String,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default = "TransportConfig::default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "TransportConfig::default_reconnection")]
    pub reconnection: bool,
    #[serde(default)]
    pub reconnection_attempts: Option<u32>,
    #[serde(default = "TransportConfig::default_reconnection_delay_ms")]
    pub reconnection_delay_ms: u64,
    #[serde(default = "TransportConfig::default_reconnection_delay_max_ms")]
    pub reconnection_delay_max_ms: u64,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

impl TransportConfig {
    const fn default_timeout_ms() -> u64 {
        5000
    }
    const fn default_reconnection() -> bool {
        true
    }
    const fn default_reconnection_delay_ms() -> u64 {
        200
    }
    const fn default_reconnection_delay_max_ms() -> u64 {
        30_000
    }

    pub fn builder(base_url: impl Into<String>) -> TransportConfigBuilder {
        TransportConfigBuilder::new(base_url)
    }

    /// Derive the websocket URL from `base_url`, swapping http↔ws,
    /// https↔wss, and defaulting the socket.io path for `localhost`.
    pub fn websocket_url(&self) -> Result<url::Url, url::ParseError> {
        let mut url = url::Url::parse(&self.base_url)?;
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => other,
        };
        let _ = url.set_scheme(scheme);
        if url.path() == "/" || url.path().is_empty() {
            let is_localhost = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"));
            if is_localhost {
                url.set_path("/socket.io");
            }
        }
        Ok(url)
    }
}

/// Builder mirroring this codebase's `SessionBuilder` shape.
#[derive(Debug, Default)]
pub struct TransportConfigBuilder {
    base_url: String,
    log_level: LogLevel,
    timeout_ms: Option<u64>,
    reconnection: Option<bool>,
    reconnection_attempts: Option<u32>,
    reconnection_delay_ms: Option<u64>,
    reconnection_delay_max_ms: Option<u64>,
    organization_id: Option<String>,
    tenant_id: Option<String>,
}

impl TransportConfigBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn reconnection(mut self, enabled: bool) -> Self {
        self.reconnection = Some(enabled);
        self
    }

    pub fn reconnection_attempts(mut self, attempts: u32) -> Self {
        self.reconnection_attempts = Some(attempts);
        self
    }

    pub fn reconnection_delay_ms(mut self, ms: u64) -> Self {
        self.reconnection_delay_ms = Some(ms);
        self
    }

    pub fn reconnection_delay_max_ms(mut self, ms: u64) -> Self {
        self.reconnection_delay_max_ms = Some(ms);
        self
    }

    pub fn organization_id(mut self, id: impl Into<String>) -> Self {
        self.organization_id = Some(id.into());
        self
    }

    pub fn tenant_id(mut self, id: impl Into<String>) -> Self {
        self.tenant_id = Some(id.into());
        self
    }

    pub fn build(self) -> TransportConfig {
        TransportConfig {
            base_url: self.base_url,
            log_level: self.log_level,
            timeout_ms: self.timeout_ms.unwrap_or_else(TransportConfig::default_timeout_ms),
            reconnection: self
                .reconnection
                .unwrap_or_else(TransportConfig::default_reconnection),
            reconnection_attempts: self.reconnection_attempts,
            reconnection_delay_ms: self
                .reconnection_delay_ms
                .unwrap_or_else(TransportConfig::default_reconnection_delay_ms),
            reconnection_delay_max_ms: self
                .reconnection_delay_max_ms
                .unwrap_or_else(TransportConfig::default_reconnection_delay_max_ms),
            organization_id: self.organization_id,
            tenant_id: self.tenant_id,
        }
    }
}

#[cfg(test)]
#[path = "config.test.rs"]
mod tests;
