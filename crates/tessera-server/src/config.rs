use std::env;
use std::net::SocketAddr;

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Address both listeners bind to
    pub host: String,
    /// HTTP/JSON listener port
    pub http_port: u16,
    /// Binary RPC listener port
    pub rpc_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 8083,
            rpc_port: 50051,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let host = lookup("HOST").unwrap_or(defaults.host);
        let http_port = match lookup("HTTP_PORT") {
            Some(port) => port.parse()?,
            None => defaults.http_port,
        };
        let rpc_port = match lookup("RPC_PORT") {
            Some(port) => port.parse()?,
            None => defaults.rpc_port,
        };

        Ok(Self {
            host,
            http_port,
            rpc_port,
        })
    }

    pub fn http_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.http_port).parse()?)
    }

    pub fn rpc_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.rpc_port).parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.http_addr().unwrap().port(), 8083);
        assert_eq!(config.rpc_addr().unwrap().port(), 50051);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("HTTP_PORT", "9000"),
            ("RPC_PORT", "9001"),
        ]))
        .unwrap();
        assert_eq!(config.http_addr().unwrap().to_string(), "127.0.0.1:9000");
        assert_eq!(config.rpc_port, 9001);
    }

    #[test]
    fn test_invalid_port() {
        assert!(Config::from_lookup(lookup(&[("HTTP_PORT", "http")])).is_err());
        assert!(Config::from_lookup(lookup(&[("RPC_PORT", "70000")])).is_err());
    }
}
