//! # Application Configuration
//!
//! Settings are layered, later layers winning:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`--config registrar.toml`)
//! 3. `REGISTRAR_*` environment variables
//! 4. explicit CLI flags (applied by the CLI module)
//!
//! ```toml
//! [storage]
//! path = "registrar.redb"
//! backend = "redb"            # or "memory"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! rate_limit = 100            # requests/second, 0 disables
//! cors_origins = ["http://localhost:3000"]
//!
//! [registrar]
//! digest_algorithm = "blake3" # or "sha256"
//! duplicate_policy = "reject" # or "idempotent"
//! join_mode = "lenient"       # or "strict"
//! ```
//!
//! ## Environment Variables
//!
//! `REGISTRAR_DATABASE`, `REGISTRAR_BACKEND`, `REGISTRAR_HOST`,
//! `REGISTRAR_PORT`, `REGISTRAR_RATE_LIMIT`, `REGISTRAR_CORS_ORIGINS`
//! (comma-separated, or `*`), `REGISTRAR_DIGEST_ALGORITHM`,
//! `REGISTRAR_DUPLICATE_POLICY`, `REGISTRAR_JOIN_MODE`.

use registrar_core::{Registrar, RegistrarConfig, RegistrarError, StateBackend};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum size of a configuration file (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// SECTIONS
// =============================================================================

/// Which world state the registrar runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Disk-backed redb database (ACID, persistent).
    #[default]
    Redb,
    /// Volatile in-memory state.
    Memory,
}

impl BackendKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            BackendKind::Redb => "redb",
            BackendKind::Memory => "memory",
        }
    }
}

/// `[storage]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
    pub backend: BackendKind,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("registrar.redb"),
            backend: BackendKind::Redb,
        }
    }
}

/// `[server]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
    /// Allowed CORS origins. Empty means localhost only, `["*"]` allows all.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            rate_limit: 100,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// APP CONFIG
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub registrar: RegistrarConfig,
}

impl AppConfig {
    /// Defaults, then the optional file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, RegistrarError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RegistrarError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            RegistrarError::Configuration(format!(
                "Cannot read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(RegistrarError::Configuration(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            RegistrarError::Configuration(format!(
                "Cannot read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse TOML text. Missing tables and keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, RegistrarError> {
        toml::from_str(text)
            .map_err(|e| RegistrarError::Configuration(format!("Invalid config: {}", e)))
    }

    /// Override fields from `REGISTRAR_*` variables, looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), RegistrarError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("REGISTRAR_DATABASE") {
            self.storage.path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("REGISTRAR_BACKEND") {
            self.storage.backend = parse_setting("REGISTRAR_BACKEND", &raw)?;
        }
        if let Some(host) = lookup("REGISTRAR_HOST") {
            self.server.host = host;
        }
        if let Some(raw) = lookup("REGISTRAR_PORT") {
            self.server.port = parse_number("REGISTRAR_PORT", &raw)?;
        }
        if let Some(raw) = lookup("REGISTRAR_RATE_LIMIT") {
            self.server.rate_limit = parse_number("REGISTRAR_RATE_LIMIT", &raw)?;
        }
        if let Some(raw) = lookup("REGISTRAR_CORS_ORIGINS") {
            self.server.cors_origins = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(raw) = lookup("REGISTRAR_DIGEST_ALGORITHM") {
            self.registrar.digest_algorithm = parse_setting("REGISTRAR_DIGEST_ALGORITHM", &raw)?;
        }
        if let Some(raw) = lookup("REGISTRAR_DUPLICATE_POLICY") {
            self.registrar.duplicate_policy = parse_setting("REGISTRAR_DUPLICATE_POLICY", &raw)?;
        }
        if let Some(raw) = lookup("REGISTRAR_JOIN_MODE") {
            self.registrar.join_mode = parse_setting("REGISTRAR_JOIN_MODE", &raw)?;
        }
        Ok(())
    }

    /// Open the configured world state and attach a registrar to it.
    pub fn open_registrar(&self) -> Result<Registrar, RegistrarError> {
        let state = match self.storage.backend {
            BackendKind::Redb => StateBackend::open_redb(&self.storage.path)?,
            BackendKind::Memory => StateBackend::default(),
        };
        Registrar::open(state, self.registrar)
    }
}

/// Parse a snake_case enum setting through its serde representation.
fn parse_setting<T: DeserializeOwned>(name: &str, raw: &str) -> Result<T, RegistrarError> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_ascii_lowercase())).map_err(
        |_| RegistrarError::Configuration(format!("{} has unsupported value '{}'", name, raw)),
    )
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, RegistrarError> {
    raw.trim()
        .parse()
        .map_err(|_| RegistrarError::Configuration(format!("{} is not a number: '{}'", name, raw)))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use registrar_core::{DigestAlgorithm, DuplicatePolicy, ErrorKind, JoinMode};
    use std::collections::BTreeMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_toml_is_default() {
        let config = AppConfig::from_toml_str("").expect("parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn toml_sections() {
        let config = AppConfig::from_toml_str(
            r#"
            [storage]
            backend = "memory"

            [server]
            port = 9000
            cors_origins = ["*"]

            [registrar]
            digest_algorithm = "sha256"
            join_mode = "strict"
            "#,
        )
        .expect("parse");

        assert_eq!(config.storage.backend, BackendKind::Memory);
        assert_eq!(config.storage.path, PathBuf::from("registrar.redb"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.cors_origins, vec!["*".to_string()]);
        assert_eq!(config.registrar.digest_algorithm, DigestAlgorithm::Sha256);
        assert_eq!(config.registrar.join_mode, JoinMode::Strict);
        assert_eq!(config.registrar.duplicate_policy, DuplicatePolicy::Reject);
    }

    #[test]
    fn invalid_toml_is_configuration_error() {
        let err = AppConfig::from_toml_str("[server]\nport = \"high\"").expect_err("bad");
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn env_overrides_file() {
        let mut config = AppConfig::from_toml_str("[server]\nport = 9000").expect("parse");
        config
            .apply_env(env(&[
                ("REGISTRAR_PORT", "7000"),
                ("REGISTRAR_BACKEND", "Memory"),
                ("REGISTRAR_DUPLICATE_POLICY", "idempotent"),
                ("REGISTRAR_CORS_ORIGINS", "http://a.test, http://b.test,"),
            ]))
            .expect("env");

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.storage.backend, BackendKind::Memory);
        assert_eq!(config.registrar.duplicate_policy, DuplicatePolicy::Idempotent);
        assert_eq!(config.server.cors_origins.len(), 2);
    }

    #[test]
    fn bad_env_values_are_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(env(&[("REGISTRAR_JOIN_MODE", "sometimes")]))
            .expect_err("bad mode");
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = config
            .apply_env(env(&[("REGISTRAR_RATE_LIMIT", "-1")]))
            .expect_err("bad number");
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn config_file_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("registrar.toml");
        std::fs::write(&path, "[storage]\npath = \"data/records.redb\"\n").expect("write");

        let config = AppConfig::from_file(&path).expect("load");
        assert_eq!(config.storage.path, PathBuf::from("data/records.redb"));

        let err = AppConfig::from_file(&dir.path().join("missing.toml")).expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn memory_backend_opens_registrar() {
        let config = AppConfig {
            storage: StorageConfig {
                backend: BackendKind::Memory,
                ..StorageConfig::default()
            },
            ..AppConfig::default()
        };
        let registrar = config.open_registrar().expect("open");
        assert!(!registrar.state().is_persistent());
    }
}
