//! Process configuration, read once at startup.
//!
//! Environment carries the deployment-shaped values (database, bind address,
//! bot token, operator chat ids, store coordinate). Operational knobs that
//! staff tune at runtime live in the service_settings row instead.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::env;
use thiserror::Error;

use crate::models::order::GeoPoint;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub bot_token: String,
    /// Operator chat receiving kitchen notifications
    pub kitchen_chat_id: i64,
    /// Operator chat receiving courier notifications
    pub courier_chat_id: i64,
    /// Where deliveries start from
    pub store_location: GeoPoint,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Ok(Config {
            database_url: required("DATABASE_URL")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            bot_token: required("TELEGRAM_BOT_TOKEN")?,
            kitchen_chat_id: required_parsed("KITCHEN_CHAT_ID")?,
            courier_chat_id: required_parsed("COURIER_CHAT_ID")?,
            store_location: GeoPoint {
                latitude: parsed_or("STORE_LATITUDE", 40.665236)?,
                longitude: parsed_or("STORE_LONGITUDE", 72.563908)?,
            },
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn required_parsed<T: std::str::FromStr>(name: &'static str) -> Result<T, ConfigError> {
    let value = required(name)?;
    value.parse().map_err(|_| ConfigError::Invalid { name, value })
}

fn parsed_or<T: std::str::FromStr>(name: &'static str, fallback: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(fallback),
    }
}

/// Values the service_settings singleton is seeded with when absent
#[derive(Debug, Clone)]
pub struct SettingsSeed {
    pub work_start_time: NaiveTime,
    pub work_end_time: NaiveTime,
    pub delivery_base_cost: Decimal,
    pub delivery_cost_per_km: Decimal,
    pub max_delivery_radius_km: f64,
    pub min_order_value: Decimal,
}

impl Default for SettingsSeed {
    fn default() -> SettingsSeed {
        SettingsSeed {
            work_start_time: NaiveTime::from_hms_opt(10, 0, 0).expect("valid literal time"),
            work_end_time: NaiveTime::from_hms_opt(22, 0, 0).expect("valid literal time"),
            delivery_base_cost: dec!(5000),
            delivery_cost_per_km: dec!(5000),
            max_delivery_radius_km: 10.0,
            min_order_value: dec!(15000),
        }
    }
}
