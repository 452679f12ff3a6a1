use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Logical database every deployment uses.
pub const DATABASE_NAME: &str = "prototype_db";

const DEFAULT_MONGO_PORT: u16 = 27017;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1/";

/// Top-level application configuration loaded from file + environment.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub mongo: MongoSection,
    pub auth: AuthSection,
    pub openai: OpenAiSection,
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Load configuration from disk and environment.
    pub fn load() -> Result<Self> {
        let config_path =
            env::var("PROTOTYPE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

        let mut builder = config::Config::builder();

        if Path::new(&config_path).exists() {
            builder = builder.add_source(config::File::from(PathBuf::from(&config_path)));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("PROTOTYPE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build()?;
        let mut config: Self = settings.try_deserialize()?;

        // Deployment variables (docker-compose / .env) take precedence
        config.apply_env_overrides(|key| env::var(key).ok())?;

        if config.logging.level.trim().is_empty() {
            config.logging.level = "info".to_string();
        }

        config.validate()?;

        Ok(config)
    }

    /// Apply the conventional, unprefixed deployment variables.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("MONGO_HOST") {
            self.mongo.host = host;
        }
        if let Some(port) = get("MONGO_PORT") {
            self.mongo.port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid MONGO_PORT '{}'", port))?;
        }
        if let Some(username) = get("MONGO_USERNAME") {
            self.mongo.username = Some(username);
        }
        if let Some(password) = get("MONGO_PASSWORD") {
            self.mongo.password = Some(password);
        }
        if let Some(enabled) = get("AUTH_ENABLED") {
            self.auth.enabled = parse_flag(&enabled);
        }
        if let Some(json) = get("FIREBASE_SERVICE_ACCOUNT_JSON") {
            self.auth.service_account_json = Some(json);
        }
        if let Some(origin) = get("CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }
        if let Some(enabled) = get("DOCS_ENABLED") {
            self.server.docs_enabled = parse_flag(&enabled);
        }
        if let Some(api_key) = get("OPENAI_API_KEY") {
            self.openai.api_key = Some(api_key);
        }

        Ok(())
    }

    /// Reject combinations that cannot produce a working server.
    pub fn validate(&self) -> Result<()> {
        if self.server.cors_origin.trim().is_empty() {
            bail!("server.cors_origin must not be empty");
        }

        if matches!(self.mongo.backend, StoreBackendKind::Mongodb) {
            if self.mongo.host.trim().is_empty() {
                bail!("mongo.host must be specified");
            }
            if self.mongo.port == 0 {
                bail!("mongo.port must be non-zero");
            }
            if self.mongo.password.is_some() && self.mongo.username.is_none() {
                bail!("mongo.password requires mongo.username");
            }
            if self.mongo.connect_timeout_ms == 0 {
                bail!("mongo.connect_timeout_ms must be greater than zero");
            }
        }

        if self.auth.jwks_refresh_secs == 0 {
            bail!("auth.jwks_refresh_secs must be greater than zero");
        }

        if self.openai.default_model.trim().is_empty() {
            bail!("openai.default_model must not be empty");
        }

        Ok(())
    }
}

/// Only a case-insensitive `true` enables a flag.
fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub docs_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            docs_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MongoSection {
    pub backend: StoreBackendKind,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connect_timeout_ms: u64,
    pub verify_on_startup: bool,
}

impl MongoSection {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for MongoSection {
    fn default() -> Self {
        Self {
            backend: StoreBackendKind::Mongodb,
            host: "db".to_string(),
            port: DEFAULT_MONGO_PORT,
            username: None,
            password: None,
            connect_timeout_ms: 5000,
            verify_on_startup: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendKind {
    #[default]
    Mongodb,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub enabled: bool,
    pub service_account_json: Option<String>,
    pub jwks_url: String,
    /// Static key set, used instead of fetching `jwks_url` when present.
    pub jwks_json: Option<String>,
    pub jwks_refresh_secs: u64,
    pub clock_skew_secs: u64,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            enabled: true,
            service_account_json: None,
            jwks_url: DEFAULT_JWKS_URL.to_string(),
            jwks_json: None,
            jwks_refresh_secs: 3600,
            clock_skew_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiSection {
    pub api_key: Option<String>,
    pub base_url: String,
    pub default_model: String,
}

impl Default for OpenAiSection {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            default_model: "gpt-4".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}
