use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{topics::DEFAULT_NAMESPACE, types::DashboardView};

pub const DEFAULT_SETPOINT: i64 = 69;
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_ICON_BASE_DIR: &str = "../assets/images/weather/icon-set/GIF/50x50/";
pub const DEFAULT_ICON_EXTENSION: &str = ".gif";
pub const DEFAULT_ICON_FALLBACK: &str = "na";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid dashboard config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown dashboard view '{0}'")]
    UnknownView(String),
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub use_tls: bool,
    pub ws_path: String,
    pub connect_timeout_secs: u64,
    pub reconnect_interval_ms: u64,
    pub keep_alive_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "ziggyhome.mooo.com".to_string(),
            port: 8183,
            user: String::new(),
            pass: String::new(),
            use_tls: true,
            ws_path: "/mqtt".to_string(),
            connect_timeout_secs: 3,
            reconnect_interval_ms: 2_000,
            keep_alive_secs: 30,
        }
    }
}

impl BrokerConfig {
    /// WebSocket URL handed to the MQTT client, e.g. `wss://host:8183/mqtt`.
    pub fn ws_url(&self) -> String {
        let scheme = if self.use_tls { "wss" } else { "ws" };
        format!("{scheme}://{}:{}{}", self.host, self.port, self.ws_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IconConfig {
    pub base_dir: String,
    pub extension: String,
    pub fallback: String,
    /// Known icon names. Empty means every well-formed name is accepted.
    pub catalog: Vec<String>,
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            base_dir: DEFAULT_ICON_BASE_DIR.to_string(),
            extension: DEFAULT_ICON_EXTENSION.to_string(),
            fallback: DEFAULT_ICON_FALLBACK.to_string(),
            catalog: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SetpointConfig {
    pub default: i64,
    pub echo_guard: bool,
}

impl Default for SetpointConfig {
    fn default() -> Self {
        Self {
            default: DEFAULT_SETPOINT,
            echo_guard: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub broker: BrokerConfig,
    pub namespace: String,
    pub view: DashboardView,
    pub icons: IconConfig,
    pub setpoint: SetpointConfig,
    pub http_port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            view: DashboardView::Weather,
            icons: IconConfig::default(),
            setpoint: SetpointConfig::default(),
            http_port: DEFAULT_HTTP_PORT,
        }
    }
}

impl DashboardConfig {
    pub fn from_json(raw: &[u8]) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_slice(raw)?;
        config.sanitize();
        Ok(config)
    }

    /// Applies `KEY=value` overrides on top of the loaded config. `lookup`
    /// is `std::env::var` in the host and a map in tests.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("MQTT_HOST") {
            self.broker.host = host;
        }
        if let Some(port) = lookup("MQTT_PORT") {
            self.broker.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MQTT_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(user) = lookup("MQTT_USER") {
            self.broker.user = user;
        }
        if let Some(pass) = lookup("MQTT_PASS") {
            self.broker.pass = pass;
        }
        if let Some(path) = lookup("MQTT_WS_PATH") {
            self.broker.ws_path = path;
        }
        if let Some(tls) = lookup("MQTT_TLS") {
            self.broker.use_tls = !matches!(
                tls.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }
        if let Some(namespace) = lookup("DASHBOARD_NAMESPACE") {
            self.namespace = namespace;
        }
        if let Some(view) = lookup("DASHBOARD_VIEW") {
            self.view = DashboardView::parse(&view).ok_or(ConfigError::UnknownView(view))?;
        }
        if let Some(port) = lookup("DASHBOARD_HTTP_PORT") {
            self.http_port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "DASHBOARD_HTTP_PORT",
                value: port.clone(),
            })?;
        }
        self.sanitize();
        Ok(())
    }

    pub fn sanitize(&mut self) {
        let namespace = self.namespace.trim().trim_end_matches('/');
        self.namespace = if namespace.is_empty() {
            DEFAULT_NAMESPACE.to_string()
        } else {
            namespace.to_string()
        };

        if self.broker.port == 0 {
            self.broker.port = 8183;
        }
        if self.http_port == 0 {
            self.http_port = DEFAULT_HTTP_PORT;
        }
        self.broker.connect_timeout_secs = self.broker.connect_timeout_secs.clamp(1, 60);
        self.broker.reconnect_interval_ms = self.broker.reconnect_interval_ms.clamp(100, 60_000);
        if !self.broker.ws_path.starts_with('/') {
            self.broker.ws_path.insert(0, '/');
        }

        if self.icons.extension.is_empty() {
            self.icons.extension = DEFAULT_ICON_EXTENSION.to_string();
        }
        if self.icons.fallback.is_empty() {
            self.icons.fallback = DEFAULT_ICON_FALLBACK.to_string();
        }
        if !self.icons.base_dir.is_empty() && !self.icons.base_dir.ends_with('/') {
            self.icons.base_dir.push('/');
        }
    }
}
