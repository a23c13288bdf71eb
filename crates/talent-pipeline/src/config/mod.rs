use chrono::Duration;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::ops::RangeInclusive;

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
    pub pipeline: PipelineConfig,
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

        let defaults = PipelineConfig::default();
        let pipeline = PipelineConfig {
            interview_followup_days: window_days(
                "PIPELINE_INTERVIEW_FOLLOWUP_DAYS",
                defaults.interview_followup_days,
            )?,
            review_window_days: window_days(
                "PIPELINE_REVIEW_WINDOW_DAYS",
                defaults.review_window_days,
            )?,
            onboarding_window_days: window_days(
                "PIPELINE_ONBOARDING_WINDOW_DAYS",
                defaults.onboarding_window_days,
            )?,
            shortlist_window_days: window_days(
                "PIPELINE_SHORTLIST_WINDOW_DAYS",
                defaults.shortlist_window_days,
            )?,
            max_expansion_days: bounded_days(
                "PIPELINE_MAX_EXPANSION_DAYS",
                defaults.max_expansion_days,
                1..=PipelineConfig::MAX_EXPANSION_DAYS,
            )?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            pipeline,
        })
    }
}

fn window_days(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    bounded_days(key, default, 0..=PipelineConfig::MAX_WINDOW_DAYS)
}

fn bounded_days(
    key: &'static str,
    default: u32,
    range: RangeInclusive<u32>,
) -> Result<u32, ConfigError> {
    let days = match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidWindow { key })?,
        Err(_) => default,
    };
    if !range.contains(&days) {
        return Err(ConfigError::WindowOutOfRange {
            key,
            min: *range.start(),
            max: *range.end(),
        });
    }
    Ok(days)
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

/// Deadline offsets applied when a workflow moves between stages, plus the widest date
/// range a single recurring-rule expansion may cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Gap between an interview-1 selection and the technical test setup deadline.
    pub interview_followup_days: u32,
    /// Time reviewers get to grade a submitted answer sheet.
    pub review_window_days: u32,
    /// Gap between a technical test selection and the onboarding deadline.
    pub onboarding_window_days: u32,
    /// Initial deadline for scheduling the first interview after shortlisting.
    pub shortlist_window_days: u32,
    /// Days one expansion request may span, both ends included.
    pub max_expansion_days: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            interview_followup_days: 7,
            review_window_days: 3,
            onboarding_window_days: 7,
            shortlist_window_days: 7,
            max_expansion_days: 366,
        }
    }
}

impl PipelineConfig {
    /// Longest deadline window; larger configured values are capped here.
    pub const MAX_WINDOW_DAYS: u32 = 365;
    pub const MAX_EXPANSION_DAYS: u32 = 3660;

    pub fn interview_followup(&self) -> Duration {
        window(self.interview_followup_days)
    }

    pub fn review_window(&self) -> Duration {
        window(self.review_window_days)
    }

    pub fn onboarding_window(&self) -> Duration {
        window(self.onboarding_window_days)
    }

    pub fn shortlist_window(&self) -> Duration {
        window(self.shortlist_window_days)
    }
}

fn window(days: u32) -> Duration {
    Duration::days(i64::from(days.min(PipelineConfig::MAX_WINDOW_DAYS)))
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidWindow { key: &'static str },
    WindowOutOfRange {
        key: &'static str,
        min: u32,
        max: u32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidWindow { key } => {
                write!(f, "{key} must be a non-negative number of days")
            }
            ConfigError::WindowOutOfRange { key, min, max } => {
                write!(f, "{key} must be between {min} and {max} days")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidWindow { .. }
            | ConfigError::WindowOutOfRange { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
