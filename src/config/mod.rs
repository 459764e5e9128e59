use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Signing secret shipped with the local platform stack; only used by the development preset.
const LOCAL_JWT_SECRET: &str = "super-secret-jwt-token-with-at-least-32-characters-long";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreBackend::Memory),
            "postgres" | "postgresql" | "pg" => Ok(StoreBackend::Postgres),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    /// Switch the transaction role to the `role` claim of the caller's token.
    pub assume_jwt_role: bool,
    /// YAML or JSON file used to seed the memory store.
    pub fixture: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub url: Option<String>,
    pub service_role_key: String,
    pub default_bucket: String,
    /// Gateway address the storage service embeds in signed URLs.
    pub internal_url: Option<String>,
    /// Address clients should use instead of `internal_url`.
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_audience: Option<String>,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
    pub cors_allow_credentials: bool,
}

impl StorageConfig {
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().map_or(false, |url| !url.trim().is_empty())
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Apply per-key overrides from `lookup`. Values that fail to parse are logged and skipped.
    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Server overrides
        if let Some(v) = lookup("HOST") {
            self.server.host = v;
        }
        if let Some((key, v)) = lookup("PLAYGROUND_PORT")
            .map(|v| ("PLAYGROUND_PORT", v))
            .or_else(|| lookup("PORT").map(|v| ("PORT", v)))
        {
            self.server.port = parse_or_warn(key, &v, self.server.port);
        }

        // Database overrides
        if let Some(v) = lookup("STORE_BACKEND") {
            self.database.backend = parse_or_warn("STORE_BACKEND", &v, self.database.backend);
        }
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_or_warn("DATABASE_MAX_CONNECTIONS", &v, self.database.max_connections);
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout =
                parse_or_warn("DATABASE_CONNECTION_TIMEOUT", &v, self.database.connection_timeout);
        }
        if let Some(v) = lookup("DATABASE_ASSUME_JWT_ROLE") {
            self.database.assume_jwt_role = parse_or_warn("DATABASE_ASSUME_JWT_ROLE", &v, self.database.assume_jwt_role);
        }
        if let Some(v) = lookup("STORE_FIXTURE") {
            self.database.fixture = Some(PathBuf::from(v));
        }

        // Storage overrides
        if let Some(v) = lookup("STORAGE_URL").or_else(|| lookup("SUPABASE_URL")) {
            self.storage.url = Some(v);
        }
        if let Some(v) = lookup("STORAGE_SERVICE_ROLE_KEY").or_else(|| lookup("SUPABASE_SERVICE_ROLE_KEY")) {
            self.storage.service_role_key = v;
        }
        if let Some(v) = lookup("STORAGE_DEFAULT_BUCKET") {
            self.storage.default_bucket = v;
        }
        if let Some(v) = lookup("STORAGE_INTERNAL_URL") {
            self.storage.internal_url = Some(v);
        }
        if let Some(v) = lookup("STORAGE_PUBLIC_URL") {
            self.storage.public_url = Some(v);
        }

        // Security overrides
        if let Some(v) = lookup("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = lookup("JWT_AUDIENCE") {
            self.security.jwt_audience = if v.trim().is_empty() { None } else { Some(v) };
        }
        if let Some(v) = lookup("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = parse_or_warn("JWT_EXPIRY_HOURS", &v, self.security.jwt_expiry_hours);
        }
        if let Some(v) = lookup("CORS_ALLOW_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Some(v) = lookup("CORS_ALLOW_CREDENTIALS") {
            self.security.cors_allow_credentials =
                parse_or_warn("CORS_ALLOW_CREDENTIALS", &v, self.security.cors_allow_credentials);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Memory,
                url: None,
                max_connections: 5,
                connection_timeout: 30,
                assume_jwt_role: false,
                fixture: None,
            },
            storage: StorageConfig {
                url: Some("http://127.0.0.1:54321".to_string()),
                service_role_key: String::new(),
                default_bucket: "test-uploads".to_string(),
                internal_url: Some("http://kong:8000".to_string()),
                public_url: Some("http://localhost:54321".to_string()),
            },
            security: SecurityConfig {
                jwt_secret: LOCAL_JWT_SECRET.to_string(),
                jwt_audience: None,
                jwt_expiry_hours: 24,
                cors_origins: vec!["*".to_string()],
                cors_allow_credentials: false,
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 10,
                connection_timeout: 10,
                assume_jwt_role: true,
                fixture: None,
            },
            storage: StorageConfig {
                url: None,
                service_role_key: String::new(),
                default_bucket: "test-uploads".to_string(),
                internal_url: None,
                public_url: None,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_audience: Some("authenticated".to_string()),
                jwt_expiry_hours: 4,
                cors_origins: vec!["*".to_string()],
                cors_allow_credentials: false,
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 20,
                connection_timeout: 5,
                assume_jwt_role: true,
                fixture: None,
            },
            storage: StorageConfig {
                url: None,
                service_role_key: String::new(),
                default_bucket: "test-uploads".to_string(),
                internal_url: None,
                public_url: None,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_audience: Some("authenticated".to_string()),
                jwt_expiry_hours: 1,
                cors_origins: vec!["https://app.example.com".to_string()],
                cors_allow_credentials: true,
            },
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Parse an environment value, keeping `current` when it is malformed.
fn parse_or_warn<T>(key: &str, raw: &str, current: T) -> T
where
    T: std::str::FromStr + std::fmt::Debug,
    T::Err: std::fmt::Display,
{
    match raw.trim().parse() {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("ignoring {}={:?}: {}; keeping {:?}", key, raw, e, current);
            current
        }
    }
}

// Global singleton config - read by the binaries only; library code takes config explicitly
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}
