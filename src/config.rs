use dotenv::dotenv;
use std::env;
use std::net::SocketAddr;

use crate::error::ConfigError;

const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Settings every stream controller is built with.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub max_body_bytes: usize,
    pub generate_request_id: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            generate_request_id: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub host: String,
    pub worker_threads: usize,
    pub channel_capacity: usize,
    pub log_format: LogFormat,
    pub processor: ProcessorConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        Ok(Self {
            port: parse_number("PORT", 9002)?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            worker_threads: parse_number("WORKER_THREADS", num_cpus::get())?,
            channel_capacity: parse_number("STREAM_CHANNEL_CAPACITY", 32)?,
            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Compact,
            },
            processor: ProcessorConfig {
                max_body_bytes: parse_number("MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
                generate_request_id: parse_bool("GENERATE_REQUEST_ID", false)?,
            },
        })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
        Err(_) => Ok(default),
    }
}

fn parse_bool(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidBool { key, value }),
        },
        Err(_) => Ok(default),
    }
}
