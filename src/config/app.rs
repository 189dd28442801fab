use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use crate::services::qr_service::QrProvider;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub log_level: String,
    pub jwt_secret: String,
    pub qr_secret: String,
    pub qr_providers: Vec<QrProvider>,
    pub qr_timeout: Duration,
    pub checkin_cooldown_minutes: i64,
    pub max_freeze_days: i64,
    pub run_migrations: bool,
    pub seed_demo_data: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid port number")?;
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string());
        let qr_secret = env::var("QR_SECRET")
            .unwrap_or_else(|_| "qr-secret-change-in-production".to_string());

        let qr_providers = match env::var("QR_PROVIDERS") {
            Ok(names) => parse_provider_list(&names)?,
            Err(_) => QrProvider::defaults(),
        };

        let qr_timeout_secs = env::var("QR_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);

        let checkin_cooldown_minutes = env::var("CHECKIN_COOLDOWN_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60);

        let max_freeze_days = env::var("MAX_FREEZE_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let run_migrations = env_flag("RUN_MIGRATIONS", true);
        let seed_demo_data = env_flag("SEED_DEMO_DATA", false);

        let config = AppConfig {
            host,
            port,
            environment,
            log_level,
            jwt_secret,
            qr_secret,
            qr_providers,
            qr_timeout: Duration::from_secs(qr_timeout_secs),
            checkin_cooldown_minutes,
            max_freeze_days,
            run_migrations,
            seed_demo_data,
        };

        if config.is_production() {
            config.ensure_production_secrets()?;
        }

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn ensure_production_secrets(&self) -> Result<()> {
        if self.jwt_secret.contains("change-in-production") {
            anyhow::bail!("JWT_SECRET must be set in production");
        }
        if self.qr_secret.contains("change-in-production") {
            anyhow::bail!("QR_SECRET must be set in production");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            environment: "development".to_string(),
            log_level: "info".to_string(),
            jwt_secret: "your-secret-key-change-in-production".to_string(),
            qr_secret: "qr-secret-change-in-production".to_string(),
            qr_providers: QrProvider::defaults(),
            qr_timeout: Duration::from_secs(5),
            checkin_cooldown_minutes: 60,
            max_freeze_days: 30,
            run_migrations: false,
            seed_demo_data: false,
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) => matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn parse_provider_list(names: &str) -> Result<Vec<QrProvider>> {
    let providers = names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            QrProvider::by_name(name).with_context(|| format!("Unknown QR provider '{}'", name))
        })
        .collect::<Result<Vec<_>>>()?;

    if providers.is_empty() {
        anyhow::bail!("QR_PROVIDERS must name at least one provider");
    }

    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_list_keeps_configured_order() {
        let providers = parse_provider_list("quickchart, qrserver").unwrap();
        let names: Vec<_> = providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["quickchart", "qrserver"]);
    }

    #[test]
    fn provider_list_rejects_unknown_names() {
        assert!(parse_provider_list("qrserver,nope").is_err());
        assert!(parse_provider_list(" , ").is_err());
    }

    #[test]
    fn production_requires_real_secrets() {
        let config = AppConfig {
            environment: "production".to_string(),
            ..AppConfig::default()
        };
        assert!(config.ensure_production_secrets().is_err());

        let config = AppConfig {
            environment: "production".to_string(),
            jwt_secret: "a-real-secret".to_string(),
            qr_secret: "another-real-secret".to_string(),
            ..AppConfig::default()
        };
        assert!(config.ensure_production_secrets().is_ok());
    }
}
