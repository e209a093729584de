/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Initcheck Config Module
//! This module provides the common configuration framework for our crates.
//!
//! # Variable Naming Convention
//!
//! Variables in this configuration framework follow these naming conventions:
//! - Struct fields use snake_case (e.g., `label_key`, `retry_delay`)
//! - Environment variables use SCREAMING_SNAKE_CASE and are prefixed with "INITCHECK__" (e.g., `INITCHECK__CHECK__RETRIES`)
//! - Configuration file keys use snake_case (e.g., `check.retries`, `log.level`)
//!
//! # Configuration Overriding
//!
//! The configuration values are loaded and overridden in the following order (later sources take precedence):
//!
//! 1. Default values from the embedded `default.toml` file
//! 2. Values from an optional external configuration file (if provided)
//! 3. Environment variables
//!
//! To override a configuration value:
//! - In a configuration file: Use the appropriate key (e.g., `check.retries = 48`)
//! - Using environment variables: Set the variable with the "INITCHECK__" prefix and "__" as separators
//!   (e.g., `INITCHECK__CHECK__RETRIES=48`)
//!
//! # Available Environment Variables
//!
//! The following environment variables can be used to configure initcheck:
//!
//! - `INITCHECK__LOG__LEVEL`: Sets the log level for the application
//!   Default: "info"
//!   Possible values: "trace", "debug", "info", "warn", "error"
//!
//! - `INITCHECK__LOG__FORMAT`: Sets the log output format
//!   Default: "text"
//!   Possible values: "text", "json"
//!
//! - `INITCHECK__CHECK__LABEL_KEY`: Pod label whose value selects the jobs to verify
//!   Default: "app"
//!
//! - `INITCHECK__CHECK__SELECTOR`: Explicit label selector, bypassing pod label discovery
//!   Default: None
//!
//! - `INITCHECK__CHECK__NAMESPACE`: Namespace to inspect, bypassing serviceaccount discovery
//!   Default: None
//!
//! - `INITCHECK__CHECK__POD_NAME`: Name of the pod to read labels from, bypassing hostname discovery
//!   Default: None
//!
//! - `INITCHECK__CHECK__RETRIES`: Per-job retry budget before a job counts as timed out
//!   Default: 24
//!
//! - `INITCHECK__CHECK__RETRY_DELAY`: Delay between polling rounds in seconds
//!   Default: 5.0
//!
//! - `INITCHECK__CHECK__REQUEST_TIMEOUT`: Kubernetes API request timeout in seconds
//!   Default: 10.0
//!
//! - `INITCHECK__CHECK__KUBECONFIG_PATH`: Path to a kubeconfig file for out-of-cluster use
//!   Default: None (in-cluster serviceaccount config)

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

// Include the default settings file as a string constant
const DEFAULT_SETTINGS: &str = include_str!("../default.toml");

/// Represents the main settings structure for the application
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Logging configuration
    pub log: Log,
    /// Job check configuration
    pub check: Check,
}

/// Represents the logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Log {
    /// Log level (e.g., "info", "debug", "warn", "error")
    pub level: String,
    /// Log format: "text" for human-readable, "json" for structured JSON
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Represents the job check configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Check {
    /// Pod label key whose value selects the jobs to verify
    pub label_key: String,
    /// Explicit label selector; when set, pod label discovery is skipped
    pub selector: Option<String>,
    /// Namespace override; defaults to the pod's own namespace
    pub namespace: Option<String>,
    /// Pod name override; defaults to the pod's hostname
    pub pod_name: Option<String>,
    /// Per-job retry budget before a job counts as timed out
    pub retries: u32,
    /// Delay between polling rounds in seconds
    pub retry_delay: f64,
    /// Kubernetes API request timeout in seconds
    pub request_timeout: f64,
    /// Kubeconfig path for out-of-cluster use
    pub kubeconfig_path: Option<String>,
}

impl Settings {
    /// Creates a new `Settings` instance
    ///
    /// # Arguments
    ///
    /// * `file` - An optional path to a configuration file
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing the `Settings` instance or a `ConfigError`
    pub fn new(file: Option<String>) -> Result<Self, ConfigError> {
        // Start with default settings from the embedded TOML file
        let mut s = Config::builder()
            .add_source(File::from_str(DEFAULT_SETTINGS, config::FileFormat::Toml));

        // If a configuration file is provided, add it as a source
        s = match file {
            Some(x) => s.add_source(File::with_name(x.as_str())),
            None => s,
        };

        // Add environment variables as a source, prefixed with "INITCHECK" and using "__" as a separator
        s = s.add_source(Environment::with_prefix("INITCHECK").separator("__"));

        // Build the configuration
        let settings = s.build()?;

        // Deserialize the configuration into a Settings instance
        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;

    #[test]
    /// Test the creation of Settings with default values
    ///
    /// This test ensures that:
    /// 1. A Settings instance can be created successfully using the `new` method
    /// 2. When no custom configuration is provided (None), the default values are set correctly
    /// 3. Specifically, it checks that the check defaults match the embedded default.toml
    fn test_settings_default_values() {
        // Attempt to create settings with default values (no custom configuration)
        let settings = Settings::new(None).unwrap();

        assert_eq!(settings.check.label_key, "app");
        assert_eq!(settings.check.retries, 24);
        assert!((settings.check.retry_delay - 5.0).abs() < f64::EPSILON);
        assert!((settings.check.request_timeout - 10.0).abs() < f64::EPSILON);
        assert!(settings.check.selector.is_none());
        assert!(settings.check.namespace.is_none());
        assert!(settings.check.pod_name.is_none());
        assert!(settings.check.kubeconfig_path.is_none());
    }

    #[test]
    fn test_log_default_values() {
        let settings = Settings::new(None).unwrap();

        assert_eq!(settings.log.level, "info");
        assert_eq!(settings.log.format, "text");
    }
}
