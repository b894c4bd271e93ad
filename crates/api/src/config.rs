//! Server configuration read from the environment.

use std::net::SocketAddr;

use storecraft_infra::EngineConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub bind: SocketAddr,
    /// Postgres connection string. Without one the server keeps everything in memory.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub engine: EngineConfig,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind = lookup("STORECRAFT_BIND")
            .and_then(|raw| match raw.trim().parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    tracing::warn!(value = %raw, error = %e, "ignoring unparseable STORECRAFT_BIND");
                    None
                }
            })
            .unwrap_or_else(default_bind);

        let db_max_connections = lookup("STORECRAFT_DB_MAX_CONNECTIONS")
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(5);

        Self {
            bind,
            database_url: lookup("DATABASE_URL")
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            db_max_connections,
            engine: EngineConfig::from_lookup(&lookup),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_run_in_memory_on_port_8080() {
        let config = ApiConfig::from_lookup(lookup(&[]));
        assert_eq!(config.bind, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.database_url, None);
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn environment_overrides_are_applied() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("STORECRAFT_BIND", "127.0.0.1:9000"),
            ("DATABASE_URL", "postgres://localhost/storecraft"),
            ("STORECRAFT_DB_MAX_CONNECTIONS", "12"),
            ("STORECRAFT_LOW_STOCK_THRESHOLD", "3"),
        ]));
        assert_eq!(config.bind, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/storecraft"));
        assert_eq!(config.db_max_connections, 12);
        assert_eq!(config.engine.low_stock_threshold, 3);
    }

    #[test]
    fn bad_values_fall_back() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("STORECRAFT_BIND", "not an address"),
            ("DATABASE_URL", "   "),
            ("STORECRAFT_DB_MAX_CONNECTIONS", "0"),
        ]));
        assert_eq!(config.bind, default_bind());
        assert_eq!(config.database_url, None);
        assert_eq!(config.db_max_connections, 5);
    }
}
