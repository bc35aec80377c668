//! Outbound HTTP for the integrations backend
//!
//! Every backend call goes through one shared reqwest client carrying the
//! configured request timeout, TLS backend, and optional proxy.

use reqwest::{Client, Proxy};
use std::time::Duration;

use crate::model::config::{Config, TlsBackend};

/// Upstream proxy the backend client connects through
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    /// `http://`, `https://` or `socks5://` endpoint
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Unauthenticated proxy at `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    /// Attach basic-auth credentials
    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// `proxyUrl` from the config, with credentials only when both halves are present
    pub fn from_config(config: &Config) -> Option<Self> {
        let url = config.proxy_url.as_deref().filter(|u| !u.trim().is_empty())?;
        let mut proxy = Self::new(url);
        if let (Some(username), Some(password)) = (&config.proxy_username, &config.proxy_password) {
            proxy = proxy.with_auth(username, password);
        }
        Some(proxy)
    }
}

/// Client for backend calls; `timeout_secs` bounds each request end to end
pub fn build_client(
    proxy: Option<&ProxyConfig>,
    timeout_secs: u64,
    tls_backend: TlsBackend,
) -> anyhow::Result<Client> {
    let mut builder = Client::builder().timeout(Duration::from_secs(timeout_secs));

    if tls_backend == TlsBackend::Rustls {
        builder = builder.use_rustls_tls();
    }

    if let Some(proxy_config) = proxy {
        let mut proxy = Proxy::all(&proxy_config.url)?;

        if let (Some(username), Some(password)) = (&proxy_config.username, &proxy_config.password) {
            proxy = proxy.basic_auth(username, password);
        }

        builder = builder.proxy(proxy);
        tracing::debug!(proxy = %proxy_config.url, "Backend calls routed through proxy");
    }

    Ok(builder.build()?)
}

/// Backend client as configured by `requestTimeoutSecs`, `tlsBackend` and the proxy keys
pub fn build_backend_client(config: &Config) -> anyhow::Result<Client> {
    let proxy = ProxyConfig::from_config(config);
    build_client(proxy.as_ref(), config.request_timeout_secs, config.tls_backend)
}
