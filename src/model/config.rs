use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TlsBackend {
    #[default]
    Rustls,
    NativeTls,
}

/// Which credential fields are forwarded to the backend's load endpoint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LoadPayload {
    /// Only `user_id` and `org_id`, so the backend resolves (and refreshes) the stored tokens
    #[default]
    Minimal,
    /// The entire Credential Bundle as returned by the backend
    Full,
}

/// Console configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Origin of the integrations backend
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Console API bind host (serve mode)
    #[serde(default = "default_host")]
    pub host: String,

    /// Console API bind port (serve mode)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Surface closure sampling interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on how long a handshake waits for the surface to close
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,

    /// Per-request timeout for backend calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub tls_backend: TlsBackend,

    /// HTTP proxy URL (optional)
    /// Supported formats: http://host:port, https://host:port, socks5://host:port
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// Proxy authentication username (optional)
    #[serde(default)]
    pub proxy_username: Option<String>,

    /// Proxy authentication password (optional)
    #[serde(default)]
    pub proxy_password: Option<String>,

    /// Console API key (optional, protects the serve-mode API when non-empty)
    #[serde(default)]
    pub admin_api_key: Option<String>,

    /// Allowed CORS origins for the console API (empty = any)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default)]
    pub load_payload: LoadPayload,

    #[serde(default = "default_user")]
    pub default_user: String,

    #[serde(default = "default_org")]
    pub default_org: String,

    /// Config file path (runtime metadata, not written to JSON)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_poll_interval_ms() -> u64 {
    300
}

fn default_handshake_timeout_secs() -> u64 {
    // Backend state tokens expire after ten minutes
    600
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user() -> String {
    "TestUser".to_string()
}

fn default_org() -> String {
    "TestOrg".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            host: default_host(),
            port: default_port(),
            poll_interval_ms: default_poll_interval_ms(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            tls_backend: TlsBackend::default(),
            proxy_url: None,
            proxy_username: None,
            proxy_password: None,
            admin_api_key: None,
            cors_origins: Vec::new(),
            load_payload: LoadPayload::default(),
            default_user: default_user(),
            default_org: default_org(),
            config_path: None,
        }
    }
}

impl Config {
    /// Get default config file path
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            // Config file doesn't exist, return default config
            let mut config = Self::default();
            config.config_path = Some(path.to_path_buf());
            return Ok(config);
        }

        let content = fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get config file path (if available)
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Backend origin without a trailing slash
    pub fn backend_origin(&self) -> &str {
        self.backend_url.trim_end_matches('/')
    }

    /// Admin API key, treating a blank value as not configured
    pub fn effective_admin_api_key(&self) -> Option<&str> {
        self.admin_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn handshake_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.handshake_timeout_secs)
    }
}
