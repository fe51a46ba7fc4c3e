use std::net::{IpAddr, SocketAddr};

use crate::error::ConfigError;

/// Startup settings, read once from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_path: String,
    pub model_path: String,
    pub meta_path: String,
    pub bind: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let or = |k: &str, default: &str| get(k).unwrap_or_else(|| default.to_string());

        let host = or("BIND_ADDR", "0.0.0.0");
        let ip: IpAddr = host.parse().map_err(|_| ConfigError::Invalid {
            name: "BIND_ADDR",
            expected: "IP address",
            value: host.clone(),
        })?;

        let port = match get("PORT") {
            Some(p) => p.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                expected: "port number",
                value: p,
            })?,
            None => 8080,
        };

        Ok(Self {
            data_path: or("DATA_PATH", "clean_df.csv"),
            model_path: or("MODEL_PATH", "pipe.json"),
            meta_path: or("META_PATH", "meta.json"),
            bind: SocketAddr::new(ip, port),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.data_path, "clean_df.csv");
        assert_eq!(cfg.model_path, "pipe.json");
        assert_eq!(cfg.bind, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn overrides_and_bad_port() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATA_PATH", "/data/cars.csv"),
            ("BIND_ADDR", "127.0.0.1"),
            ("PORT", "9000"),
        ]))
        .unwrap();
        assert_eq!(cfg.data_path, "/data/cars.csv");
        assert_eq!(cfg.bind, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());

        let err = AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }
}
