//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Which listeners to run.
    pub mode: GatewayMode,

    /// HTTP listener configuration.
    pub listener: ListenerConfig,

    /// The wrapped file-management backend.
    pub backend: BackendConfig,

    /// Route surface exposed by the HTTP gateway.
    pub routes: RoutesConfig,

    /// Login interception and trusted identity settings.
    pub auth: AuthConfig,

    /// Raw TCP forwarding mode.
    pub forwarder: ForwarderConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Deployment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    /// HTTP-aware gateway only.
    #[default]
    Http,
    /// Raw byte-stream forwarding only.
    Tcp,
    /// Both listeners, side by side.
    Both,
}

impl GatewayMode {
    pub fn runs_http(self) -> bool {
        matches!(self, GatewayMode::Http | GatewayMode::Both)
    }

    pub fn runs_tcp(self) -> bool {
        matches!(self, GatewayMode::Tcp | GatewayMode::Both)
    }
}

impl std::str::FromStr for GatewayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(GatewayMode::Http),
            "tcp" => Ok(GatewayMode::Tcp),
            "both" => Ok(GatewayMode::Both),
            other => Err(format!("unknown mode '{}', expected http, tcp or both", other)),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Backend service location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend authority reachable over HTTP and WebSocket (e.g., "127.0.0.1:8080").
    pub address: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Route surface. Login and command paths are relative to `base_path`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Forwarded prefix, without trailing slash.
    pub base_path: String,

    /// Login endpoint intercepted for credential translation.
    pub login_path: String,

    /// Command endpoint prefix upgraded to a WebSocket bridge.
    pub command_path: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            base_path: "/admin".to_string(),
            login_path: "/api/login".to_string(),
            command_path: "/api/command/".to_string(),
        }
    }
}

impl RoutesConfig {
    /// Any path under the base containing the login segment.
    pub fn login_route(&self) -> String {
        if self.base_path == "/" {
            format!("/*{}", self.login_path)
        } else {
            format!("{}/*{}", self.base_path, self.login_path)
        }
    }

    pub fn command_route(&self) -> String {
        format!("{}*", self.under_base(&self.command_path))
    }

    fn under_base(&self, path: &str) -> String {
        if self.base_path == "/" {
            path.to_string()
        } else {
            format!("{}{}", self.base_path, path)
        }
    }
}

/// Login interception settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Header the backend trusts in proxy-auth mode.
    pub identity_header: String,

    /// Upper bound for a login body.
    pub max_payload_bytes: usize,

    /// Accounts known to the built-in identity store.
    pub users: Vec<UserConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            identity_header: "X-Generic-AppName".to_string(),
            max_payload_bytes: 64 * 1024,
            users: Vec::new(),
        }
    }
}

/// A single account for the static identity store.
#[derive(Clone, Deserialize, Serialize)]
pub struct UserConfig {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for UserConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Raw TCP forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwarderConfig {
    /// Bind address for the raw listener.
    pub bind_address: String,

    /// Where accepted connections are relayed.
    pub backend_address: String,

    /// Maximum concurrent forwarded pairs.
    pub max_connections: usize,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            backend_address: "127.0.0.1:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (time until response headers) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
