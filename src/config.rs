//! Environment-driven configuration.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;

/// Runtime settings, read once at startup. `.env` files are loaded by the
/// binary before this runs; real environment variables win over defaults.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub cart_state_path: PathBuf,
    pub nats_url: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: parse_or("PORT", 8083),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10),
            cart_state_path: env::var("CART_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("cart-state.json")),
            nats_url: env::var("NATS_URL").ok(),
        })
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
