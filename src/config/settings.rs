//! Process settings from the environment (`.env` honored).

use std::net::SocketAddr;

pub const DEFAULT_MAX_PAGE_SIZE: u64 = 1000;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Path of the entity registry JSON.
    pub entity_config: String,
    pub db_max_connections: u32,
    /// Upper bound for `limit` and `take`.
    pub max_page_size: u64,
    /// Schema for entities and relations that do not name one.
    pub default_schema: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: "postgres://localhost/app".into(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            entity_config: "entities.json".into(),
            db_max_connections: 5,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            default_schema: "public".into(),
        }
    }
}

impl Settings {
    /// Read `DATABASE_URL`, `BIND_ADDR`, `ENTITY_CONFIG`, `DB_MAX_CONNECTIONS`, `MAX_PAGE_SIZE`, `DEFAULT_SCHEMA`.
    /// Unset or unparseable values keep their defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Settings::default();
        Settings {
            database_url: get("DATABASE_URL").unwrap_or(d.database_url),
            bind_addr: get("BIND_ADDR").and_then(|v| v.parse().ok()).unwrap_or(d.bind_addr),
            entity_config: get("ENTITY_CONFIG").unwrap_or(d.entity_config),
            db_max_connections: get("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.db_max_connections),
            max_page_size: get("MAX_PAGE_SIZE")
                .and_then(|v| v.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(d.max_page_size),
            default_schema: get("DEFAULT_SCHEMA").unwrap_or(d.default_schema),
        }
    }
}

/// Install the global `tracing` subscriber. `RUST_LOG` wins over `default_directive`.
pub fn init_tracing(default_directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn overrides_and_fallbacks() {
        let env: HashMap<&str, &str> = [
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("MAX_PAGE_SIZE", "0"),
            ("DB_MAX_CONNECTIONS", "lots"),
            ("DEFAULT_SCHEMA", "app"),
        ]
        .into_iter()
        .collect();
        let s = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(s.bind_addr.port(), 8080);
        assert_eq!(s.max_page_size, DEFAULT_MAX_PAGE_SIZE);
        assert_eq!(s.db_max_connections, 5);
        assert_eq!(s.default_schema, "app");
        assert_eq!(s.entity_config, "entities.json");
    }
}
