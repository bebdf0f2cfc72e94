use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::notifications::{NotificationType, TriggerWindows};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub notifications: NotificationPaths,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let notifications = NotificationPaths {
            module_config: env::var_os("POLICY_NOTIFICATION_CONFIG").map(PathBuf::from),
            policies_csv: env::var_os("POLICY_NOTIFICATION_POLICIES").map(PathBuf::from),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            notifications,
        })
    }

    /// Module configuration from the configured file, or the stored defaults.
    pub fn module_config(&self) -> Result<ModuleConfig, ConfigError> {
        match &self.notifications.module_config {
            Some(path) => ModuleConfig::from_path(path),
            None => Ok(ModuleConfig::default()),
        }
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Locations of the notification module inputs.
#[derive(Debug, Clone, Default)]
pub struct NotificationPaths {
    pub module_config: Option<PathBuf>,
    pub policies_csv: Option<PathBuf>,
}

/// Notification module configuration as stored by the admin panel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleConfig {
    #[serde(default)]
    pub providers: ProviderSettings,
    #[serde(default)]
    pub eligible_notification_types: BTreeMap<String, bool>,
    #[serde(default)]
    pub trigger_windows: TriggerWindows,
    #[serde(default)]
    pub default_notification_data: DefaultNotificationData,
}

impl ModuleConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ModuleConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|source| ConfigError::ModuleConfigParse { source })
    }

    /// Enabled notification types in their canonical order.
    pub fn enabled_notification_types(&self) -> Vec<NotificationType> {
        let mut enabled = Vec::new();
        for (name, flag) in &self.eligible_notification_types {
            match name.parse::<NotificationType>() {
                Ok(kind) if *flag => enabled.push(kind),
                Ok(_) => {}
                Err(_) => warn!(notification_type = %name, "unknown notification type in configuration"),
            }
        }
        enabled.sort();
        enabled
    }
}

/// Delivery providers configured for the module.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSettings {
    #[serde(rename = "TextNotificationProvider", default)]
    pub text: Option<TextProviderSettings>,
    /// Provider entries without a local implementation.
    #[serde(flatten)]
    pub unsupported: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextProviderSettings {
    #[serde(rename = "DestinationFolder")]
    pub destination_folder: PathBuf,
}

/// Notification preferences assumed for families that never set them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DefaultNotificationData {
    pub approval_of_notification: bool,
    pub language_of_notification: String,
}

impl Default for DefaultNotificationData {
    fn default() -> Self {
        Self {
            approval_of_notification: false,
            language_of_notification: "en".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    ModuleConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },
    ModuleConfigParse {
        source: serde_json::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::ModuleConfigIo { path, .. } => {
                write!(f, "unable to read module configuration {}", path.display())
            }
            ConfigError::ModuleConfigParse { source } => {
                write!(f, "module configuration is not valid: {source}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::ModuleConfigIo { source, .. } => Some(source),
            ConfigError::ModuleConfigParse { source } => Some(source),
        }
    }
}
