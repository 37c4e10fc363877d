use std::env;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Which bookings collide when they share a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictScope {
    /// No two schedules anywhere may share a timestamp.
    Global,
    /// A timestamp is only taken for the user who booked it.
    PerUser,
}

impl FromStr for ConflictScope {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(ConflictScope::Global),
            "user" | "per_user" => Ok(ConflictScope::PerUser),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mongo_uri: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub bcrypt_cost: u32,
    pub token_ttl_hours: i64,
    pub cors_origin: Option<String>,
    pub conflict_scope: ConflictScope,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mongo_uri = get("MONGODB_URI")
            .or_else(|| get("MONGODB_CLUSTER_URI"))
            .ok_or(ConfigError::Missing("MONGODB_URI"))?;
        let jwt_secret = get("JWT_SECRET")
            .or_else(|| get("SECRET"))
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let port = parse_or(get("PORT"), "PORT", 3000u16)?;
        let bcrypt_cost = parse_or(get("BCRYPT_COST"), "BCRYPT_COST", 12u32)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                name: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
            });
        }
        let token_ttl_hours = parse_or(get("JWT_TTL_HOURS"), "JWT_TTL_HOURS", 24i64)?;
        if token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                name: "JWT_TTL_HOURS",
                value: token_ttl_hours.to_string(),
            });
        }
        let conflict_scope = parse_or(
            get("SCHEDULE_CONFLICT_SCOPE"),
            "SCHEDULE_CONFLICT_SCOPE",
            ConflictScope::Global,
        )?;

        Ok(Self {
            mongo_uri,
            database_name: get("DATABASE_NAME").unwrap_or_else(|| "scheduling".to_string()),
            jwt_secret,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            bcrypt_cost,
            token_ttl_hours,
            cors_origin: get("CORS_ORIGIN"),
            conflict_scope,
        })
    }
}

fn parse_or<T: FromStr>(
    raw: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(parsed),
            Err(_) => Err(ConfigError::Invalid { name, value }),
        },
    }
}
