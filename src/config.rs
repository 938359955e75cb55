use std::{env, path::PathBuf};

use anyhow::{Context, Result};

use crate::db::DEFAULT_MAX_POOL_SIZE;

pub const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:5173,http://localhost:3000,http://127.0.0.1:5173";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_pool_size: u32,
    pub server_host: String,
    pub server_port: u16,
    pub storage_path: PathBuf,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source; unset keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| "papers.db".to_string());
        let database_max_pool_size = match lookup("DATABASE_MAX_POOL_SIZE") {
            Some(value) => value
                .parse()
                .context("DATABASE_MAX_POOL_SIZE must be a positive integer")?,
            None => DEFAULT_MAX_POOL_SIZE,
        };
        let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let server_port = lookup("SERVER_PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let storage_path = lookup("STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("storage/papers"));
        let cors_allowed_origins = parse_origins(
            &lookup("CORS_ALLOWED_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
        );
        let max_upload_bytes = lookup("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|| DEFAULT_MAX_UPLOAD_BYTES.to_string())
            .parse()
            .context("MAX_UPLOAD_BYTES must be a positive integer")?;

        Ok(Self {
            database_url,
            database_max_pool_size,
            server_host,
            server_port,
            storage_path,
            cors_allowed_origins,
            max_upload_bytes,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn unset_variables_take_defaults() {
        let config = config_from(&[]).expect("defaults");
        assert_eq!(config.database_url, "papers.db");
        assert_eq!(config.database_max_pool_size, DEFAULT_MAX_POOL_SIZE);
        assert_eq!(config.server_host, "127.0.0.1");
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.storage_path, PathBuf::from("storage/papers"));
        assert_eq!(config.cors_allowed_origins.len(), 3);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn set_variables_override_defaults() {
        let config = config_from(&[
            ("DATABASE_MAX_POOL_SIZE", "8"),
            ("SERVER_PORT", "9100"),
            ("STORAGE_PATH", "/srv/papers"),
            ("CORS_ALLOWED_ORIGIN", "https://papers.example"),
        ])
        .expect("config");
        assert_eq!(config.database_max_pool_size, 8);
        assert_eq!(config.server_port, 9100);
        assert_eq!(config.storage_path, PathBuf::from("/srv/papers"));
        assert_eq!(config.cors_allowed_origins, vec!["https://papers.example"]);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = config_from(&[("DATABASE_MAX_POOL_SIZE", "many")]).expect_err("bad pool size");
        assert!(err.to_string().contains("DATABASE_MAX_POOL_SIZE"));
        assert!(config_from(&[("SERVER_PORT", "70000")]).is_err());
        assert!(config_from(&[("MAX_UPLOAD_BYTES", "-1")]).is_err());
    }

    #[test]
    fn splits_and_trims_origins() {
        let origins = parse_origins(" http://localhost:5173 ,http://localhost:3000,, ");
        assert_eq!(
            origins,
            vec!["http://localhost:5173", "http://localhost:3000"]
        );
    }

    #[test]
    fn empty_origin_list_is_empty() {
        assert!(parse_origins("").is_empty());
    }
}
