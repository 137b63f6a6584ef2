use crate::models::User;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("{0} must be at least 32 characters long")]
    WeakSecret(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime configuration, read from the environment once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub bind_addr: String,
    pub frontend_url: Option<String>,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub run_migrations: bool,
    /// `SEED_USERS=user-1:alice,user-2:bob`
    pub seed_users: Vec<User>,
}

const MIN_SECRET_LEN: usize = 32;

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret("JWT_SECRET"));
        }
        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid { name: "DB_MAX_CONNECTIONS", value: v })?,
            None => 5,
        };
        let run_migrations = get("RUN_MIGRATIONS").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
        let seed_users = match get("SEED_USERS") {
            Some(v) => parse_seed_users(&v).ok_or(ConfigError::Invalid { name: "SEED_USERS", value: v })?,
            None => Vec::new(),
        };
        Ok(Self {
            jwt_secret,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            frontend_url: get("FRONTEND_URL").filter(|v| !v.is_empty()),
            database_url: get("DATABASE_URL").filter(|v| !v.is_empty()),
            db_max_connections,
            run_migrations,
            seed_users,
        })
    }
}

fn parse_seed_users(raw: &str) -> Option<Vec<User>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let (id, username) = entry.split_once(':')?;
            let (id, username) = (id.trim(), username.trim());
            (!id.is_empty() && !username.is_empty()).then(|| User { id: id.into(), username: username.into() })
        })
        .collect()
}
