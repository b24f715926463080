use std::env;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://dms.sqlite?mode=rwc";
pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_BODY_LIMIT_MB: usize = 10;

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    /// `None` allows any origin.
    pub cors_origin: Option<String>,
    pub body_limit_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            port: DEFAULT_PORT,
            cors_origin: None,
            body_limit_bytes: DEFAULT_BODY_LIMIT_MB * 1024 * 1024,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| {
                tracing::warn!("DATABASE_URL not found in env, using {}", DEFAULT_DATABASE_URL);
                defaults.database_url.clone()
            });

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
                tracing::warn!("Invalid PORT '{}', falling back to {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => defaults.port,
        };

        let cors_origin = lookup("CORS_ORIGIN")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && v != "*");

        let body_limit_bytes = match lookup("BODY_LIMIT_MB") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(mb) if mb > 0 => mb * 1024 * 1024,
                _ => {
                    tracing::warn!(
                        "Invalid BODY_LIMIT_MB '{}', falling back to {}",
                        raw,
                        DEFAULT_BODY_LIMIT_MB
                    );
                    defaults.body_limit_bytes
                }
            },
            None => defaults.body_limit_bytes,
        };

        Self {
            database_url,
            port,
            cors_origin,
            body_limit_bytes,
        }
    }
}
