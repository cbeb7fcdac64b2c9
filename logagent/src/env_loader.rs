//! Environment variable loading utilities
//!
//! Common patterns for loading environment variables with type conversion
//! and fallback defaults.

use std::env;
use std::str::FromStr;

/// Load an environment variable with a string default
pub fn load_env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Load an environment variable with type conversion and default
///
/// Values that fail to parse are ignored and the default is returned.
pub fn load_env_parsed<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Load a non-empty environment variable as an Option<String>
pub fn load_env_nonempty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Builder for loading multiple environment variables with consistent prefix
#[derive(Debug)]
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    /// Create a new environment loader with the given prefix
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.prefix, suffix)
    }

    /// Load a string value with default
    pub fn load_string(&self, suffix: &str, default: &str) -> String {
        load_env_string(&self.key(suffix), default)
    }

    /// Load a parsed value with default
    pub fn load_parsed<T>(&self, suffix: &str, default: T) -> T
    where
        T: FromStr,
    {
        load_env_parsed(&self.key(suffix), default)
    }

    /// Load a boolean, accepting `1/0`, `true/false`, `yes/no` and `on/off`
    pub fn load_bool(&self, suffix: &str, default: bool) -> bool {
        match load_env_nonempty(&self.key(suffix)) {
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => default,
            },
            None => default,
        }
    }
}
