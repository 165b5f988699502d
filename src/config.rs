use std::env;
use std::fmt;
use std::str::FromStr;

/// How much detail the error classifier may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Production,
    Development,
    Test,
}

impl Mode {
    pub fn is_production(self) -> bool {
        self == Mode::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Production => "production",
            Mode::Development => "development",
            Mode::Test => "test",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Mode::Production),
            "development" | "dev" => Ok(Mode::Development),
            "test" => Ok(Mode::Test),
            other => Err(ConfigError::Invalid {
                name: "APP_MODE",
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
pub const DEFAULT_BCRYPT_COST: u32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string; the in-memory store is used when unset.
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub mode: Mode,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            server_port: parse_or(&non_empty, "SERVER_PORT", 8080)?,
            server_host: non_empty("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            jwt_secret: non_empty("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            token_ttl_hours: parse_or(&non_empty, "TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS)?,
            bcrypt_cost: parse_or(&non_empty, "BCRYPT_COST", DEFAULT_BCRYPT_COST)?,
            mode: match non_empty("APP_MODE") {
                Some(value) => value.parse()?,
                None => Mode::default(),
            },
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
