use anyhow::{anyhow, Context};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Postgres,
    Memory,
}

impl FromStr for Storage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" | "mock" => Ok(Self::Memory),
            _ => Err(anyhow!("unknown storage \"{s}\", expected postgres or memory")),
        }
    }
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => f.write_str("postgres"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub app_port: u16,
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    pub storage: Storage,
}

impl Config {
    /// Loads `.env` into the process environment if the file exists.
    pub fn load_dotenv() -> Result<(), anyhow::Error> {
        match std::fs::metadata(".env") {
            Ok(_) => envmnt::load_file(".env").context("Unable to load .env"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(anyhow!("Unable to open .env file: {err}")),
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_vars(|key| Some(envmnt::get_or(key, "")))
    }

    pub fn from_vars<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            var(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let db_user = get("DB_USER").unwrap_or_else(|| "postgres".to_string());
        Ok(Self {
            app_port: parse_var(get("APP_PORT"), "APP_PORT")?.unwrap_or(8080),
            db_host: get("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            db_port: parse_var(get("DB_PORT"), "DB_PORT")?.unwrap_or(5432),
            db_password: get("DB_PASSWORD").unwrap_or_default(),
            db_name: get("DB_NAME").unwrap_or_else(|| db_user.clone()),
            db_user,
            storage: get("STORAGE")
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(Storage::Postgres),
        })
    }

    pub fn pg_config(&self) -> tokio_postgres::Config {
        let mut cfg = tokio_postgres::Config::new();
        cfg.host(&self.db_host)
            .port(self.db_port)
            .user(&self.db_user)
            .dbname(&self.db_name);
        if !self.db_password.is_empty() {
            cfg.password(&self.db_password);
        }
        cfg
    }
}

fn parse_var<T>(value: Option<String>, key: &str) -> Result<Option<T>, anyhow::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .map(|v| {
            v.parse::<T>()
                .with_context(|| format!("Invalid {key} value \"{v}\""))
        })
        .transpose()
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = if self.db_password.is_empty() {
            "(empty)"
        } else {
            "********"
        };
        write!(
            f,
            "app_port={} storage={} db_host={} db_port={} db_user={} db_name={} db_password={password}",
            self.app_port, self.storage, self.db_host, self.db_port, self.db_user, self.db_name,
        )
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
