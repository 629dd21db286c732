//! Configuration for Gatehouse
//!
//! CLI arguments and environment variable handling using clap.
//! Secrets are process-wide and read-only once parsed.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

/// Services that can be mounted on this instance
pub const KNOWN_SERVICES: &[&str] = &["profile", "notifications", "setting", "actions", "admin"];

/// Gatehouse - authenticated relay between internal services
#[derive(Parser, Debug, Clone)]
#[command(name = "gatehouse")]
#[command(about = "Inter-service authenticated relay with signed payloads and session cookies")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Base URL that relative relay paths are resolved against
    #[arg(long, env = "INTERNAL_GATEWAY", default_value = "http://127.0.0.1:8080")]
    pub internal_gateway: String,

    /// Public gateway URL, sent as ORIGIN when forwarding dispatches
    #[arg(long, env = "GATEWAY", default_value = "http://127.0.0.1:8080")]
    pub gateway: String,

    /// Real-time messaging backend that receives room dispatches
    #[arg(long, env = "WEBSOCKET_SERVER_URL", default_value = "http://127.0.0.1:3001")]
    pub websocket_server_url: String,

    /// Shared secret for inter-service payload signatures (required in production)
    #[arg(long, env = "PAYLOAD_SECRET", hide_env_values = true)]
    pub payload_secret: Option<String>,

    /// HS256 secret for session cookies
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// ES256 public key (PEM) for session cookies; takes precedence over JWT_SECRET
    #[arg(long, env = "COOKIE_PUBLIC_KEY")]
    pub cookie_public_key: Option<String>,

    /// Cookie carrying the JWT header segment
    #[arg(long, env = "HEADER_COOKIE_NAME", default_value = "he")]
    pub header_cookie_name: String,

    /// Cookie carrying the JWT payload segment
    #[arg(long, env = "PAYLOAD_COOKIE_NAME", default_value = "pa")]
    pub payload_cookie_name: String,

    /// Cookie carrying the JWT signature segment
    #[arg(long, env = "SIGNATURE_COOKIE_NAME", default_value = "si")]
    pub signature_cookie_name: String,

    /// Default deadline for outbound relay calls in milliseconds
    #[arg(long, env = "RELAY_TIMEOUT_MS", default_value = "10000")]
    pub relay_timeout_ms: u64,

    /// Deadline for supervised background tasks in milliseconds
    #[arg(long, env = "BACKGROUND_TASK_TIMEOUT_MS", default_value = "15000")]
    pub background_task_timeout_ms: u64,

    /// Enables timestamped signatures, rejecting any older than this many seconds
    #[arg(long, env = "SIGNATURE_MAX_AGE_SECS")]
    pub signature_max_age_secs: Option<u64>,

    /// Comma-separated services to mount (profile,notifications,setting,actions,admin)
    #[arg(long, env = "SERVICES", default_value = "profile,notifications,setting,actions,admin")]
    pub services: String,

    /// Product name used in email subjects
    #[arg(long, env = "APP_NAME", default_value = "Gatehouse")]
    pub app_name: String,

    /// Public web URL used in email bodies
    #[arg(long, env = "WEB_DOMAIN", default_value = "http://127.0.0.1:8080")]
    pub web_domain: String,

    /// HTTP mail API endpoint (unset: emails are only logged)
    #[arg(long, env = "MAIL_API_URL")]
    pub mail_api_url: Option<String>,

    /// Bearer key for the mail API
    #[arg(long, env = "MAIL_API_KEY", hide_env_values = true)]
    pub mail_api_key: Option<String>,

    /// Sender address for outbound email
    #[arg(long, env = "MAIL_SENDER", default_value = "no-reply@localhost")]
    pub mail_sender: String,

    /// Enable development mode (insecure default secrets)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Args {
    /// Effective payload secret (uses default in dev mode)
    pub fn payload_secret(&self) -> Option<String> {
        match (&self.payload_secret, self.dev_mode) {
            (Some(secret), _) => Some(secret.clone()),
            (None, true) => Some("dev-only-insecure-payload-secret".to_string()),
            (None, false) => None,
        }
    }

    /// Effective HS256 cookie secret (uses default in dev mode)
    pub fn jwt_secret(&self) -> Option<String> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => Some(secret.clone()),
            (None, true) => Some("dev-only-insecure-cookie-secret".to_string()),
            (None, false) => None,
        }
    }

    /// Default relay deadline
    pub fn relay_timeout(&self) -> Duration {
        Duration::from_millis(self.relay_timeout_ms)
    }

    /// Background task deadline
    pub fn background_task_timeout(&self) -> Duration {
        Duration::from_millis(self.background_task_timeout_ms)
    }

    /// Services enabled on this instance
    pub fn service_list(&self) -> Vec<String> {
        self.services
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Check whether a service is mounted
    pub fn service_enabled(&self, name: &str) -> bool {
        self.service_list().iter().any(|s| s == name)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.payload_secret.as_deref().map_or(true, str::is_empty) {
                return Err("PAYLOAD_SECRET is required in production mode".to_string());
            }
            if self.jwt_secret.is_none() && self.cookie_public_key.is_none() {
                return Err(
                    "JWT_SECRET or COOKIE_PUBLIC_KEY is required in production mode".to_string(),
                );
            }
        }

        // An explicitly empty secret is never replaced by the dev default
        if self.payload_secret.as_deref() == Some("") {
            return Err("PAYLOAD_SECRET must not be empty".to_string());
        }
        if self.jwt_secret.as_deref() == Some("") {
            return Err("JWT_SECRET must not be empty".to_string());
        }

        for service in self.service_list() {
            if !KNOWN_SERVICES.contains(&service.as_str()) {
                return Err(format!("Unknown service in SERVICES: {}", service));
            }
        }

        if self.relay_timeout_ms == 0 {
            return Err("RELAY_TIMEOUT_MS must be greater than zero".to_string());
        }
        if self.background_task_timeout_ms == 0 {
            return Err("BACKGROUND_TASK_TIMEOUT_MS must be greater than zero".to_string());
        }

        for (name, url) in [
            ("INTERNAL_GATEWAY", &self.internal_gateway),
            ("WEBSOCKET_SERVER_URL", &self.websocket_server_url),
        ] {
            if reqwest::Url::parse(url).is_err() {
                return Err(format!("{} is not a valid URL: {}", name, url));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["gatehouse"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_production_requires_payload_secret() {
        let args = parse(&["--jwt-secret", "cookie"]);
        assert!(args.validate().unwrap_err().contains("PAYLOAD_SECRET"));
    }

    #[test]
    fn test_production_requires_cookie_key() {
        let args = parse(&["--payload-secret", "shared"]);
        assert!(args.validate().unwrap_err().contains("COOKIE_PUBLIC_KEY"));
    }

    #[test]
    fn test_dev_mode_defaults() {
        let args = parse(&["--dev-mode"]);
        assert!(args.validate().is_ok());
        assert!(args.payload_secret().is_some());
        assert!(args.jwt_secret().is_some());
    }

    #[test]
    fn test_empty_secret_rejected_in_dev_mode() {
        let args = parse(&["--dev-mode", "--payload-secret", ""]);
        assert_eq!(args.validate().unwrap_err(), "PAYLOAD_SECRET must not be empty");

        let args = parse(&["--dev-mode", "--jwt-secret", ""]);
        assert_eq!(args.validate().unwrap_err(), "JWT_SECRET must not be empty");
    }

    #[test]
    fn test_zero_task_timeout_rejected() {
        let args = parse(&["--dev-mode", "--background-task-timeout-ms", "0"]);
        assert!(args
            .validate()
            .unwrap_err()
            .contains("BACKGROUND_TASK_TIMEOUT_MS"));
    }

    #[test]
    fn test_service_list() {
        let args = parse(&["--dev-mode", "--services", "Actions, setting,"]);
        assert_eq!(args.service_list(), vec!["actions", "setting"]);
        assert!(args.service_enabled("actions"));
        assert!(!args.service_enabled("profile"));
    }

    #[test]
    fn test_unknown_service_rejected() {
        let args = parse(&["--dev-mode", "--services", "profile,storage"]);
        assert!(args.validate().unwrap_err().contains("storage"));
    }

    #[test]
    fn test_bad_gateway_url_rejected() {
        let args = parse(&["--dev-mode", "--internal-gateway", "not a url"]);
        assert!(args.validate().is_err());
    }
}
