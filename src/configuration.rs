use std::{env, fmt, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::domain::locator::LocatorTable;

pub const LOGIN_EMAIL_VAR: &str = "LINKEDIN_EMAIL";
pub const LOGIN_PASSWORD_VAR: &str = "LINKEDIN_PASSWORD";

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub browser: BrowserSettings,
    pub scraper: ScraperSettings,
    pub search: SearchSettings,
    pub site: SiteUrls,
    #[serde(skip)]
    pub credentials: Credentials,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserSettings {
    pub webdriver_url: String,
    pub headless: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScraperSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub poll_interval_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub wait_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub page_cap: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub navigation_delay_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub navigation_jitter_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_relogin_attempts: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub relogin_backoff_ms: u64,
    pub discovery: DiscoveryMode,
    pub locators_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    SearchProvider,
    SiteSearch,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchProviderKind {
    CustomSearch,
    Web,
}

#[derive(Deserialize, Clone)]
pub struct SearchSettings {
    pub provider: SearchProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub engine_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteUrls {
    pub login: String,
    /// Template with `{query}` and `{page}` placeholders.
    pub people_search: String,
    pub profile_base: String,
}

#[derive(Clone, Default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Poll interval and ceiling for waits on asynchronously loaded content.
#[derive(Debug, Clone, Copy)]
pub struct WaitSettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

/// Target delay and jitter between consecutive navigations.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub delay: Duration,
    pub jitter: Duration,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(&self.password)
            .port(self.port)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

impl ScraperSettings {
    pub fn wait(&self) -> WaitSettings {
        WaitSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_secs(self.wait_timeout_secs),
        }
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            delay: Duration::from_millis(self.navigation_delay_ms),
            jitter: Duration::from_millis(self.navigation_jitter_ms),
        }
    }

    pub fn locator_table(&self) -> Result<LocatorTable, ConfigError> {
        match &self.locators_path {
            Some(path) => LocatorTable::linkedin_with_overrides(path),
            None => Ok(LocatorTable::linkedin()),
        }
    }
}

impl Credentials {
    /// Read login credentials from the environment. Both are required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Credentials {
            email: required_env(LOGIN_EMAIL_VAR)?,
            password: required_env(LOGIN_PASSWORD_VAR)?,
        })
    }
}

fn required_env(key: &str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Message(format!("{key} must be set"))),
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let base_path = env::current_dir()
        .map_err(|e| ConfigError::Message(format!("Failed to determine current dir: {e}")))?;
    let configuration_directory = base_path.join("configuration");

    let environment = env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "local".into());

    let settings = Config::builder()
        .add_source(File::from(configuration_directory.join("base.yaml")))
        .add_source(
            File::from(configuration_directory.join(format!("{environment}.yaml")))
                .required(false),
        )
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let mut settings: Settings = settings.try_deserialize()?;
    settings.credentials = Credentials::from_env()?;

    Ok(settings)
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "[MISSING]"
    } else {
        "[REDACTED]"
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &redact(&self.password))
            .finish()
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("port", &self.port)
            .field("host", &self.host)
            .field("database_name", &self.database_name)
            .field("require_ssl", &self.require_ssl)
            .finish()
    }
}

impl fmt::Debug for SearchSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchSettings")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("engine_id", &self.engine_id)
            .finish()
    }
}
