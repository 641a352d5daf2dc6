//! Gateway configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindAddr {
    pub addr: String,
    pub port: u16,
}

impl BindAddr {
    pub fn new(addr: &str, port: u16) -> Self {
        Self {
            addr: addr.to_string(),
            port,
        }
    }

    pub fn replay_default() -> Self {
        Self {
            addr: "0.0.0.0".to_string(),
            port: 2016,
        }
    }

    pub fn to_socket_addr_string(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

impl Default for BindAddr {
    fn default() -> Self {
        Self::replay_default()
    }
}

/// Replay server configuration. Defaults match a local content-store
/// daemon and an index file in the working directory; the `RECAP_*`
/// environment variables override individual fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    pub bind: BindAddr,
    /// Path of the CDXJ index file.
    pub index_path: String,
    /// Base URL of the content-store daemon HTTP API.
    pub store_api: String,
    /// Optional reverse-proxy target rewritten into generated links.
    pub proxy: Option<String>,
    /// Bound on each blob fetch, in seconds.
    pub fetch_timeout_secs: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            bind: BindAddr::replay_default(),
            index_path: "index.cdxj".to_string(),
            store_api: "http://localhost:5001".to_string(),
            proxy: None,
            fetch_timeout_secs: 10,
        }
    }
}

impl ReplayConfig {
    /// Builds a config from defaults plus `RECAP_*` environment
    /// overrides: `RECAP_BIND_ADDR`, `RECAP_BIND_PORT`, `RECAP_INDEX`,
    /// `RECAP_STORE_API`, `RECAP_PROXY`, `RECAP_FETCH_TIMEOUT`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("RECAP_BIND_ADDR") {
            config.bind.addr = addr;
        }
        if let Ok(port) = std::env::var("RECAP_BIND_PORT") {
            if let Ok(port) = port.parse() {
                config.bind.port = port;
            }
        }
        if let Ok(path) = std::env::var("RECAP_INDEX") {
            config.index_path = path;
        }
        if let Ok(api) = std::env::var("RECAP_STORE_API") {
            config.store_api = api;
        }
        if let Ok(proxy) = std::env::var("RECAP_PROXY") {
            config.proxy = Some(proxy);
        }
        if let Ok(timeout) = std::env::var("RECAP_FETCH_TIMEOUT") {
            if let Ok(timeout) = timeout.parse() {
                config.fetch_timeout_secs = timeout;
            }
        }
        config
    }

    /// `host:port` used when generating absolute links. A wildcard bind
    /// address is presented as `localhost`.
    pub fn public_host(&self) -> String {
        let host = match self.bind.addr.as_str() {
            "0.0.0.0" | "::" | "[::]" => "localhost",
            other => other,
        };
        format!("{host}:{}", self.bind.port)
    }

    /// The `host:port` spellings under which this server sees itself;
    /// used to strip self-referential prefixes from requested URIs.
    pub fn local_hosts(&self) -> Vec<String> {
        let mut hosts = vec![
            self.public_host(),
            format!("localhost:{}", self.bind.port),
            format!("127.0.0.1:{}", self.bind.port),
        ];
        hosts.dedup();
        hosts
    }
}
