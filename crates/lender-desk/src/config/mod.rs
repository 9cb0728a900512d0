use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::lending::eligibility::{SelectionColumnPolicy, UnknownFilterMode};
use crate::workflows::lending::OpportunityStage;

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
    pub workflow: WorkflowConfig,
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
        let ansi = match env::var("APP_LOG_ANSI") {
            Ok(raw) => parse_flag("APP_LOG_ANSI", &raw)?,
            Err(_) => false,
        };

        let workflow = WorkflowConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, ansi },
            workflow,
        })
    }
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: raw.to_string(),
        }),
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
    pub ansi: bool,
}

/// Submission workflow dials.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowConfig {
    /// Stage an opportunity moves to when it is submitted to lenders.
    pub submission_stage: OpportunityStage,
    pub selection_columns: SelectionColumnPolicy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            submission_stage: OpportunityStage::Underwriting,
            selection_columns: SelectionColumnPolicy::default(),
        }
    }
}

impl WorkflowConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(stage) = env::var("APP_SUBMISSION_STAGE") {
            if stage.trim().is_empty() {
                return Err(ConfigError::EmptySubmissionStage);
            }
            config.submission_stage = OpportunityStage::from_label(&stage);
        }

        if let Ok(modes) = env::var("APP_SELECTION_COLUMN_MODES") {
            config.selection_columns = SelectionColumnPolicy::from_labels(modes.split(','))
                .map_err(|source| ConfigError::InvalidFilterMode { source })?;
        }

        Ok(config)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidFlag { name: &'static str, value: String },
    EmptySubmissionStage,
    InvalidFilterMode { source: UnknownFilterMode },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} must be a boolean flag, found '{value}'")
            }
            ConfigError::EmptySubmissionStage => {
                write!(f, "APP_SUBMISSION_STAGE must not be blank")
            }
            ConfigError::InvalidFilterMode { source } => {
                write!(f, "APP_SELECTION_COLUMN_MODES: {source}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidFilterMode { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidFlag { .. }
            | ConfigError::EmptySubmissionStage => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::lending::FilterMode;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_ANSI",
            "APP_SUBMISSION_STAGE",
            "APP_SELECTION_COLUMN_MODES",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(!config.telemetry.ansi);
        assert_eq!(config.workflow, WorkflowConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_workflow_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_SUBMISSION_STAGE", "Lender Review");
        env::set_var("APP_SELECTION_COLUMN_MODES", "Qualified, All");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.workflow.submission_stage,
            OpportunityStage::Custom("Lender Review".to_string())
        );
        assert!(config.workflow.selection_columns.shows_selection(FilterMode::All));
        assert!(!config
            .workflow
            .selection_columns
            .shows_selection(FilterMode::NotQualified));
        reset_env();
    }

    #[test]
    fn rejects_unknown_selection_column_mode() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_SELECTION_COLUMN_MODES", "Qualified,Preferred");
        match AppConfig::load() {
            Err(ConfigError::InvalidFilterMode { source }) => {
                assert_eq!(source.0, "Preferred");
            }
            other => panic!("expected filter mode error, got {other:?}"),
        }
        reset_env();
    }
}
