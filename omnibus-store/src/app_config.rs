use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// How long an unconfirmed seat claim is held before it expires
    #[serde(default = "default_seat_hold_seconds")]
    pub seat_hold_seconds: u64,
    /// How often the background sweep releases expired holds
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
    /// Capacity used when a trip is created without an explicit bus size
    #[serde(default = "default_bus_capacity")]
    pub default_bus_capacity: i32,
}

fn default_seat_hold_seconds() -> u64 {
    600
}

fn default_sweep_interval_seconds() -> u64 {
    30
}

fn default_bus_capacity() -> i32 {
    50
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            seat_hold_seconds: default_seat_hold_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
            default_bus_capacity: default_bus_capacity(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `OMNIBUS__SERVER__PORT=9090`
            .add_source(config::Environment::with_prefix("OMNIBUS").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
