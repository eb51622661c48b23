//! Environment variable parsing shared by the server and the generator.
//!
//! Every helper returns `CoreError::EnvInvalid` on malformed input; the
//! binaries treat those as fatal at startup.

use std::net::IpAddr;
use std::path::PathBuf;

use tracing::Level;

use crate::error::{CoreError, CoreResult};

/// Destination of log output, from `LOG_FILE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// Drop all log output.
    Discard,
    File(PathBuf),
}

fn env_invalid(var: &str, message: impl Into<String>) -> CoreError {
    CoreError::EnvInvalid {
        var: var.to_string(),
        message: message.into(),
    }
}

/// `PORT`: TCP listening port, 1..=65535.
pub fn port_from_env(default: u16) -> CoreResult<u16> {
    match std::env::var("PORT") {
        Ok(val) => {
            let port: u32 = val
                .parse()
                .map_err(|_| env_invalid("PORT", format!("not an integer: '{}'", val)))?;
            if !(1..=65535).contains(&port) {
                return Err(env_invalid("PORT", "must be between 1 and 65535"));
            }
            Ok(port as u16)
        }
        Err(_) => Ok(default),
    }
}

/// `SRV_IP`: listening address, must parse as an IP when present.
pub fn listen_ip_from_env(default: &str) -> CoreResult<String> {
    let ip = std::env::var("SRV_IP").unwrap_or_else(|_| default.to_string());
    ip.parse::<IpAddr>()
        .map_err(|_| env_invalid("SRV_IP", format!("not a valid IP address: '{}'", ip)))?;
    Ok(ip)
}

/// `BUFFER_SIZE`: pixel buffer around rendered tiles, 0..=256.
pub fn buffer_size_from_env(default: u32) -> CoreResult<u32> {
    match std::env::var("BUFFER_SIZE") {
        Ok(val) => {
            let buffer: u32 = val
                .parse()
                .map_err(|_| env_invalid("BUFFER_SIZE", format!("not an integer: '{}'", val)))?;
            if buffer > 256 {
                return Err(env_invalid("BUFFER_SIZE", "must be between 0 and 256"));
            }
            Ok(buffer)
        }
        Err(_) => Ok(default),
    }
}

/// `WMS_BACKEND_URL`: when set, overrides every layer's backend URL.
pub fn wms_backend_url_from_env() -> Option<String> {
    std::env::var("WMS_BACKEND_URL").ok()
}

/// `WMS_BACKEND_PREFIX`: when set, overrides the query fragment the backend
/// expects ahead of the WMS parameters.
pub fn wms_backend_prefix_from_env() -> Option<String> {
    std::env::var("WMS_BACKEND_PREFIX").ok()
}

/// `LAYERS_CONFIG_PATH`: required path of the YAML layer configuration.
pub fn layers_config_path_from_env() -> CoreResult<PathBuf> {
    std::env::var("LAYERS_CONFIG_PATH")
        .map(PathBuf::from)
        .map_err(|_| {
            env_invalid(
                "LAYERS_CONFIG_PATH",
                "must contain the path of the layer configuration file",
            )
        })
}

/// `LOG_LEVEL`: level name (`debug|info|warn|error|fatal`) or digit `0..4`.
pub fn log_level_from_env(default: Level) -> CoreResult<Level> {
    match std::env::var("LOG_LEVEL") {
        Ok(val) => match val.to_lowercase().as_str() {
            "debug" | "0" => Ok(Level::DEBUG),
            "info" | "1" => Ok(Level::INFO),
            "warn" | "2" => Ok(Level::WARN),
            // no separate fatal level; both map to error
            "error" | "3" | "fatal" | "4" => Ok(Level::ERROR),
            other => Err(env_invalid(
                "LOG_LEVEL",
                format!("unknown level '{}'", other),
            )),
        },
        Err(_) => Ok(default),
    }
}

/// `LOG_FILE`: `stdout`, `stderr`, `DISCARD` or a file path.
pub fn log_output_from_env(default: LogOutput) -> CoreResult<LogOutput> {
    match std::env::var("LOG_FILE") {
        Ok(val) => match val.as_str() {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "DISCARD" => Ok(LogOutput::Discard),
            "" => Err(env_invalid("LOG_FILE", "must not be empty when set")),
            path => Ok(LogOutput::File(PathBuf::from(path))),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_parsing() {
        std::env::remove_var("PORT");
        assert_eq!(port_from_env(8080).unwrap(), 8080);

        std::env::set_var("PORT", "9999");
        assert_eq!(port_from_env(8080).unwrap(), 9999);

        std::env::set_var("PORT", "0");
        assert!(port_from_env(8080).is_err());

        std::env::set_var("PORT", "not-a-number");
        assert!(port_from_env(8080).is_err());
        std::env::remove_var("PORT");
    }

    #[test]
    fn test_buffer_size_bounds() {
        std::env::remove_var("BUFFER_SIZE");
        assert_eq!(buffer_size_from_env(50).unwrap(), 50);

        std::env::set_var("BUFFER_SIZE", "256");
        assert_eq!(buffer_size_from_env(50).unwrap(), 256);

        std::env::set_var("BUFFER_SIZE", "257");
        assert!(buffer_size_from_env(50).is_err());
        std::env::remove_var("BUFFER_SIZE");
    }

    #[test]
    fn test_log_level_names_and_digits() {
        std::env::remove_var("LOG_LEVEL");
        assert_eq!(log_level_from_env(Level::WARN).unwrap(), Level::WARN);

        std::env::set_var("LOG_LEVEL", "debug");
        assert_eq!(log_level_from_env(Level::WARN).unwrap(), Level::DEBUG);

        std::env::set_var("LOG_LEVEL", "4");
        assert_eq!(log_level_from_env(Level::WARN).unwrap(), Level::ERROR);

        std::env::set_var("LOG_LEVEL", "loud");
        assert!(log_level_from_env(Level::WARN).is_err());
        std::env::remove_var("LOG_LEVEL");
    }

    #[test]
    fn test_srv_ip_validation() {
        std::env::remove_var("SRV_IP");
        assert_eq!(listen_ip_from_env("0.0.0.0").unwrap(), "0.0.0.0");

        std::env::set_var("SRV_IP", "127.0.0.1");
        assert_eq!(listen_ip_from_env("0.0.0.0").unwrap(), "127.0.0.1");

        std::env::set_var("SRV_IP", "localhost");
        assert!(listen_ip_from_env("0.0.0.0").is_err());
        std::env::remove_var("SRV_IP");
    }

    #[test]
    fn test_log_output() {
        std::env::remove_var("LOG_FILE");
        assert_eq!(
            log_output_from_env(LogOutput::Stderr).unwrap(),
            LogOutput::Stderr
        );

        std::env::set_var("LOG_FILE", "DISCARD");
        assert_eq!(
            log_output_from_env(LogOutput::Stderr).unwrap(),
            LogOutput::Discard
        );

        std::env::set_var("LOG_FILE", "/var/log/wmts.log");
        assert_eq!(
            log_output_from_env(LogOutput::Stderr).unwrap(),
            LogOutput::File(PathBuf::from("/var/log/wmts.log"))
        );
        std::env::remove_var("LOG_FILE");
    }
}
