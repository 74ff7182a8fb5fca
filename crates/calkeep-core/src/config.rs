use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Environment variable that overrides `google.client_secret`.
pub const CLIENT_SECRET_ENV: &str = "CALKEEP_GOOGLE_CLIENT_SECRET";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory (not stored in the file)
    #[serde(skip, default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Google API and credential settings
    #[serde(default)]
    pub google: GoogleConfig,

    /// Calendars to manage, one adapter each
    #[serde(default)]
    pub calendars: Vec<CalendarConfig>,

    /// Output preferences
    #[serde(default)]
    pub display: DisplayConfig,

    /// Logging preferences
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Google OAuth client and Calendar API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// OAuth client ID (needed only to refresh stored tokens)
    pub client_id: Option<String>,

    /// OAuth client secret; `CALKEEP_GOOGLE_CLIENT_SECRET` takes precedence
    pub client_secret: Option<String>,

    /// Directory holding stored tokens. Defaults to `<config_dir>/tokens`.
    pub token_dir: Option<PathBuf>,

    /// Token file stem inside `token_dir` (`<token_service>.json`)
    #[serde(default = "default_token_service")]
    pub token_service: String,

    /// Calendar API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// OAuth token endpoint used for refresh
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_token_service() -> String {
    "google".to_string()
}

fn default_api_base_url() -> String {
    GOOGLE_CALENDAR_API_BASE.to_string()
}

fn default_token_url() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl GoogleConfig {
    /// Check if OAuth client credentials are configured (not placeholders)
    pub fn is_configured(&self) -> bool {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => {
                !id.is_empty()
                    && !secret.is_empty()
                    && !id.starts_with("YOUR_")
                    && !secret.starts_with("YOUR_")
            }
            _ => false,
        }
    }

    /// Directory tokens are read from, falling back under `config_dir`.
    pub fn effective_token_dir(&self, config_dir: &Path) -> PathBuf {
        self.token_dir
            .clone()
            .unwrap_or_else(|| config_dir.join("tokens"))
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            token_dir: None,
            token_service: default_token_service(),
            api_base_url: default_api_base_url(),
            token_url: default_token_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// One remote calendar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarConfig {
    /// Display label, also used as the logging span field
    pub name: String,

    /// Remote calendar identifier (`primary` or an address-like id)
    pub calendar_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Append timezone labels to event summaries
    #[serde(default)]
    pub show_time_zones: bool,

    /// How many days ahead to load on startup
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: u32,

    /// Optional free-text filter for loaded events
    #[serde(default)]
    pub text_search: Option<String>,
}

fn default_lookahead_days() -> u32 {
    7
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_time_zones: false,
            lookahead_days: default_lookahead_days(),
            text_search: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("calkeep")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            google: GoogleConfig::default(),
            calendars: vec![CalendarConfig {
                name: "primary".to_string(),
                calendar_id: Some("primary".to_string()),
            }],
            display: DisplayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file, writing defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_dir);

        if !path.exists() {
            let config = Self {
                config_dir,
                ..Self::default()
            };
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.config_dir = config_dir;

        Ok(config)
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(CLIENT_SECRET_ENV).filter(|s| !s.is_empty()) {
            self.google.client_secret = Some(secret);
        }
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings. Warnings are
    /// left to the caller to report, since logging is usually configured
    /// from the loaded file.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::load()?.into_validated()
    }

    /// Validate, failing on critical errors.
    pub fn into_validated(self) -> Result<(Self, ValidationResult)> {
        let validation = self.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        Ok((self, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.google.api_base_url, "google.api_base_url", &mut result);
        self.validate_url(&self.google.token_url, "google.token_url", &mut result);

        if self.google.request_timeout_secs == 0 {
            result.add_error(
                "google.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        if self.google.token_service.trim().is_empty() {
            result.add_error("google.token_service", "Token service name cannot be empty");
        }

        if !self.google.is_configured() {
            result.add_warning(
                "google",
                "OAuth client not configured - expired tokens cannot be refreshed",
            );
        }

        if self.calendars.is_empty() {
            result.add_warning("calendars", "No calendars configured");
        }

        for (i, calendar) in self.calendars.iter().enumerate() {
            let missing_id = calendar
                .calendar_id
                .as_deref()
                .map_or(true, |id| id.trim().is_empty());
            if missing_id {
                result.add_error(
                    format!("calendars[{}].calendar_id", i),
                    format!("Calendar '{}' has no calendar_id", calendar.name),
                );
            }
            if calendar.name.trim().is_empty() {
                result.add_warning(format!("calendars[{}].name", i), "Calendar name is empty");
            }
            if self.calendars[..i].iter().any(|c| c.name == calendar.name) {
                result.add_warning(
                    format!("calendars[{}].name", i),
                    format!("Duplicate calendar name '{}'", calendar.name),
                );
            }
        }

        if self.display.lookahead_days == 0 {
            result.add_warning(
                "display.lookahead_days",
                "Lookahead is 0 days - no events will be loaded",
            );
        } else if self.display.lookahead_days > 366 {
            result.add_warning(
                "display.lookahead_days",
                "Lookahead is more than a year",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if let Some(port) = url.port() {
                    if port == 0 {
                        result.add_error(field_name, "Port cannot be 0");
                    }
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("calkeep");

        Ok(config_dir.join("config.toml"))
    }
}
