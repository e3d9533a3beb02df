use std::env;

use serde::{Deserialize, Serialize};

use crate::{Result, TsdbError};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 4242;

/// Where the TSDB server listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ClientConfig {
    /// Reads `TSDB_HOST` and `TSDB_PORT`, falling back to the defaults.
    pub fn from_env() -> Result<Self> {
        let host = env::var("TSDB_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = match env::var("TSDB_PORT") {
            Ok(port) => port
                .trim()
                .parse()
                .map_err(|_| TsdbError::InvalidRequest(format!("TSDB_PORT {:?} is not a port", port)))?,
            Err(_) => DEFAULT_PORT,
        };
        Ok(Self { host, port })
    }

    /// `host:port`, bracketing IPv6 literals.
    pub fn authority(&self) -> String {
        join_host_port(&self.host, self.port)
    }
}

pub(crate) fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.authority(), "127.0.0.1:4242");
    }

    #[test]
    fn test_join_host_port() {
        assert_eq!(join_host_port("localhost", 4242), "localhost:4242");
        assert_eq!(join_host_port("::1", 4242), "[::1]:4242");
        assert_eq!(join_host_port("[::1]", 4242), "[::1]:4242");
    }
}
