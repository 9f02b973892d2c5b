use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    pub log_level: String,
    pub cors_origins: Vec<String>,
    /// Without SMTP settings, notifications are only logged.
    pub smtp: Option<SmtpConfig>,
    pub mail_from: String,
}

impl Config {
    pub fn init() -> Result<Config, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET_KEY")?;
        let jwt_maxage = parse("JWT_MAXAGE", required("JWT_MAXAGE")?)?;

        let port = match lookup("PORT") {
            Some(value) => parse("PORT", value)?,
            None => 8000,
        };
        let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(value) => parse("DATABASE_MAX_CONNECTIONS", value)?,
            None => 10,
        };

        let smtp = match lookup("SMTP_HOST").filter(|h| !h.trim().is_empty()) {
            Some(host) => Some(SmtpConfig {
                host,
                port: match lookup("SMTP_PORT") {
                    Some(value) => parse("SMTP_PORT", value)?,
                    None => 587,
                },
                username: lookup("SMTP_USERNAME").unwrap_or_default(),
                password: lookup("SMTP_PASSWORD").unwrap_or_default(),
            }),
            None => None,
        };

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]);

        Ok(Config {
            database_url,
            database_max_connections,
            jwt_secret,
            jwt_maxage,
            port,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "debug".to_string()),
            cors_origins,
            smtp,
            mail_from: lookup("MAIL_FROM")
                .unwrap_or_else(|| "Helpdesk <noreply@helpdesk.local>".to_string()),
        })
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid { key, value })
}
