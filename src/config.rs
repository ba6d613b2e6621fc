// src/config.rs

use std::env;

use dotenvy::dotenv;

/// Number of strongest categories used to seed recommendations.
pub const TOP_CATEGORY_COUNT: usize = 3;

/// Maximum number of programs pulled from the catalog per recommendation run.
pub const PROGRAM_CANDIDATE_LIMIT: usize = 10;

/// Maximum number of recommendations attached to a result.
pub const MAX_RECOMMENDATIONS: usize = 3;

/// A top category only counts toward a match score at or above this percentage.
pub const MATCH_THRESHOLD_PERCENTAGE: i32 = 60;

pub const STRENGTH_THRESHOLD_PERCENTAGE: i32 = 75;
pub const MAX_STRENGTHS: usize = 3;

pub const WEAKNESS_THRESHOLD_PERCENTAGE: i32 = 50;
pub const MAX_WEAKNESSES: usize = 2;

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// How many of the newest results are echoed back with student statistics.
pub const LATEST_RESULTS_COUNT: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is not a valid number: {value}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub port: u16,
    pub database_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let port = parse_or("PORT", 3000)?;
        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 5)?;

        Ok(Self {
            database_url,
            jwt_secret,
            rust_log,
            port,
            database_max_connections,
        })
    }
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        Err(_) => Ok(default),
    }
}
