use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use mirrorlink_providers::netmirror::{HttpOptions, RelayMode, DEFAULT_COOKIE_POINTER, DEFAULT_USER_AGENT};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub credential: CredentialConfig,
    pub profiles: Vec<MirrorProfile>,
    pub default_profile: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            http: HttpConfig::default(),
            credential: CredentialConfig::default(),
            profiles: vec![MirrorProfile::default()],
            default_profile: DEFAULT_PROFILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_seconds: u64,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: 10,
            timeout_seconds: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpConfig {
    #[must_use]
    pub fn to_options(&self) -> HttpOptions {
        HttpOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_seconds),
            timeout: Duration::from_secs(self.timeout_seconds),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Session cookie configuration
///
/// `extra_cookies` holds opaque site-specific entries (bypass hashes and the
/// like) appended after the session token; their values carry no meaning here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// JSON document holding the session cookie
    pub source_url: Option<String>,
    /// JSON pointer to the cookie string inside `source_url`'s document
    pub field_pointer: String,
    /// Fixed cookie; when set, `source_url` is never fetched
    pub static_cookie: Option<String>,
    pub extra_cookies: BTreeMap<String, String>,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            source_url: Some(DEFAULT_COOKIE_SOURCE.to_string()),
            field_pointer: DEFAULT_COOKIE_POINTER.to_string(),
            static_cookie: None,
            extra_cookies: BTreeMap::new(),
        }
    }
}

/// One interchangeable mirror: where it lives and how its streams are exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorProfile {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    /// Higher ranks are preferred when a caller walks several mirrors.
    #[serde(default)]
    pub rank: u32,
    pub base_url: String,
    #[serde(default)]
    pub relay: RelayMode,
}

impl Default for MirrorProfile {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROFILE.to_string(),
            display_name: "NetMirror".to_string(),
            rank: 182,
            base_url: "https://netfree.cc/".to_string(),
            relay: RelayMode::Direct,
        }
    }
}

pub const DEFAULT_PROFILE: &str = "netfree";
pub const DEFAULT_COOKIE_SOURCE: &str = "https://anshu78780.github.io/json/cookie.json";

const LOG_FORMATS: [&str; 2] = ["pretty", "json"];

fn is_http_url(raw: &str) -> bool {
    url::Url::parse(raw).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

impl Config {
    /// Load configuration from file and environment variables
    ///
    /// Priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file
    /// 3. Defaults
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        // Load config file if provided
        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // Override with environment variables (MIRRORLINK_LOGGING__LEVEL, etc.)
        builder = builder.add_source(
            Environment::with_prefix("MIRRORLINK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Check the configuration, collecting every problem instead of stopping
    /// at the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(format!(
                "logging.format must be one of {LOG_FORMATS:?}, got {:?}",
                self.logging.format
            ));
        }

        if self.http.connect_timeout_seconds == 0 || self.http.timeout_seconds == 0 {
            errors.push("http timeouts must be greater than zero".to_string());
        }

        let credential = &self.credential;
        match (&credential.static_cookie, &credential.source_url) {
            (Some(cookie), _) if !cookie.is_empty() => {}
            (_, Some(url)) if is_http_url(url) => {
                if !credential.field_pointer.starts_with('/') {
                    errors.push(format!(
                        "credential.field_pointer must be a JSON pointer starting with '/': {:?}",
                        credential.field_pointer
                    ));
                }
            }
            (_, Some(url)) => errors.push(format!("credential.source_url is not an http(s) URL: {url}")),
            _ => errors.push("credential needs either static_cookie or source_url".to_string()),
        }

        if self.profiles.is_empty() {
            errors.push("at least one mirror profile is required".to_string());
        }

        let mut seen = HashSet::new();
        for profile in &self.profiles {
            if profile.name.is_empty() {
                errors.push("profile name must not be empty".to_string());
            } else if !seen.insert(profile.name.as_str()) {
                errors.push(format!("duplicate profile name: {}", profile.name));
            }
            if !is_http_url(&profile.base_url) {
                errors.push(format!(
                    "profile {}: base_url is not an http(s) URL: {}",
                    profile.name, profile.base_url
                ));
            }
            if let RelayMode::Relayed { template } = &profile.relay {
                if !template.contains("{url}") {
                    errors.push(format!(
                        "profile {}: relay template must contain {{url}}",
                        profile.name
                    ));
                }
            }
        }

        if self.profile(None).is_none() {
            errors.push(format!("default_profile {} does not exist", self.default_profile));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Look up a profile by name, falling back to `default_profile`.
    #[must_use]
    pub fn profile(&self, name: Option<&str>) -> Option<&MirrorProfile> {
        let name = name.unwrap_or(&self.default_profile);
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Profiles ordered by descending rank, then name.
    #[must_use]
    pub fn profiles_by_rank(&self) -> Vec<&MirrorProfile> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by(|a, b| b.rank.cmp(&a.rank).then_with(|| a.name.cmp(&b.name)));
        profiles
    }
}
