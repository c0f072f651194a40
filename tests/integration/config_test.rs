use inference_extproc::{AppConfig, ConfigError};
use serial_test::serial;
use std::env;

const KEYS: [&str; 6] = [
    "PORT",
    "HOST",
    "STREAM_CHANNEL_CAPACITY",
    "MAX_BODY_BYTES",
    "GENERATE_REQUEST_ID",
    "LOG_FORMAT",
];

fn clear_env() {
    for key in KEYS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn defaults_apply_when_unset() {
    clear_env();
    let config = AppConfig::from_env().unwrap();

    assert_eq!(config.port, 9002);
    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.channel_capacity, 32);
    assert_eq!(config.processor.max_body_bytes, 8 * 1024 * 1024);
    assert!(!config.processor.generate_request_id);
    assert_eq!(config.listen_addr().unwrap().to_string(), "0.0.0.0:9002");
}

#[test]
#[serial]
fn reads_overrides_from_environment() {
    clear_env();
    env::set_var("PORT", "9100");
    env::set_var("HOST", "127.0.0.1");
    env::set_var("MAX_BODY_BYTES", "1024");
    env::set_var("GENERATE_REQUEST_ID", "true");

    let config = AppConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.port, 9100);
    assert_eq!(config.processor.max_body_bytes, 1024);
    assert!(config.processor.generate_request_id);
    assert_eq!(config.listen_addr().unwrap().to_string(), "127.0.0.1:9100");
}

#[test]
#[serial]
fn invalid_values_are_reported() {
    clear_env();
    env::set_var("PORT", "not-a-port");
    let err = AppConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidNumber { key: "PORT", .. }));

    clear_env();
    env::set_var("GENERATE_REQUEST_ID", "maybe");
    let err = AppConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidBool { key: "GENERATE_REQUEST_ID", .. }));
    clear_env();
}
