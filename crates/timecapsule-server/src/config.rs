use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use timecapsule_engine::{EngineConfig, SenderIdentity};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your-jwt-secret",
];

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub encryption_key: String,
    pub jwt_secret: String,
    pub admin_key: String,
    pub sendgrid_api_key: Option<String>,
    pub engine: EngineConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| var(key).with_context(|| format!("{} is not set", key));

        let jwt_secret = required("TIMECAPSULE_JWT_SECRET")?;
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("TIMECAPSULE_JWT_SECRET is still a placeholder");
        }

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            poll_interval: Duration::from_secs(parse_or(&var, "TIMECAPSULE_POLL_INTERVAL_SECS", 60)?),
            warmup_delay: Duration::from_secs(parse_or(&var, "TIMECAPSULE_WARMUP_DELAY_SECS", 5)?),
            send_interval: Duration::from_millis(parse_or(&var, "TIMECAPSULE_SEND_INTERVAL_MS", 100)?),
            send_timeout: Duration::from_secs(parse_or(&var, "TIMECAPSULE_SEND_TIMEOUT_SECS", 30)?),
            sender: SenderIdentity {
                address: required("TIMECAPSULE_FROM_EMAIL")?,
                name: var("TIMECAPSULE_FROM_NAME").unwrap_or(defaults.sender.name),
            },
        };
        if engine.poll_interval.is_zero() {
            bail!("TIMECAPSULE_POLL_INTERVAL_SECS must be greater than zero");
        }

        Ok(Self {
            host: var("TIMECAPSULE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&var, "TIMECAPSULE_PORT", 3001)?,
            db_path: var("TIMECAPSULE_DB_PATH")
                .unwrap_or_else(|| "timecapsule.db".into())
                .into(),
            encryption_key: required("TIMECAPSULE_ENCRYPTION_KEY")?,
            jwt_secret,
            admin_key: required("TIMECAPSULE_ADMIN_KEY")?,
            sendgrid_api_key: var("SENDGRID_API_KEY"),
            engine,
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        let mut map: HashMap<String, String> = [
            ("TIMECAPSULE_JWT_SECRET", "a-real-secret"),
            ("TIMECAPSULE_ADMIN_KEY", "admin"),
            ("TIMECAPSULE_ENCRYPTION_KEY", "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="),
            ("TIMECAPSULE_FROM_EMAIL", "noreply@example.com"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in pairs {
            map.insert(k.to_string(), v.to_string());
        }
        map
    }

    fn load(map: &HashMap<String, String>) -> Result<ServerConfig> {
        ServerConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&env(&[])).unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.db_path, PathBuf::from("timecapsule.db"));
        assert!(config.sendgrid_api_key.is_none());
        assert_eq!(config.engine.poll_interval, Duration::from_secs(60));
        assert_eq!(config.engine.send_interval, Duration::from_millis(100));
        assert_eq!(config.engine.sender.name, "FutureMe");
    }

    #[test]
    fn overrides() {
        let config = load(&env(&[
            ("TIMECAPSULE_PORT", "8080"),
            ("TIMECAPSULE_POLL_INTERVAL_SECS", "15"),
            ("TIMECAPSULE_FROM_NAME", "Capsule"),
            ("SENDGRID_API_KEY", "SG.key"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.engine.poll_interval, Duration::from_secs(15));
        assert_eq!(config.engine.sender.name, "Capsule");
        assert_eq!(config.sendgrid_api_key.as_deref(), Some("SG.key"));
    }

    #[test]
    fn rejects_placeholder_and_missing() {
        assert!(load(&env(&[("TIMECAPSULE_JWT_SECRET", "dev-secret-change-me")])).is_err());
        assert!(load(&env(&[("TIMECAPSULE_ADMIN_KEY", " ")])).is_err());
        assert!(load(&env(&[("TIMECAPSULE_PORT", "eighty")])).is_err());
        assert!(load(&env(&[("TIMECAPSULE_POLL_INTERVAL_SECS", "0")])).is_err());
    }
}
