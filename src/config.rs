//! Configuration management for the pixelchain mining client
//!
//! Supports configuration via command line arguments, environment variables,
//! and configuration files (YAML/JSON) with proper validation and defaults.

use crate::{Error, PixelRequest, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// The server rejects placement requests with `newDifficulty` at or above
/// this bound.
pub const MAX_NEW_DIFFICULTY: u32 = 64;

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

/// Parse a `#RRGGBB` or `RRGGBB` color string into a 24-bit value
pub fn parse_color(s: &str) -> Result<u32> {
    let hexits = s.strip_prefix('#').unwrap_or(s);
    if hexits.len() != 6 {
        return Err(Error::config(format!(
            "Color must be 6 hexits (RRGGBB), got \"{}\"",
            s
        )));
    }
    u32::from_str_radix(hexits, 16)
        .map_err(|_| Error::config(format!("Color is not valid hex: \"{}\"", s)))
}

/// Complete configuration for the mining client
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(
    name = "pixelchain-mining-client",
    version = env!("CARGO_PKG_VERSION"),
    about = "Pixelchain Mining Client",
    long_about = "A proof-of-work mining client for collaborative pixelchain canvases: \
                  fetches a pixel's state, searches for a passing nonce, and submits the placement"
)]
pub struct Config {
    /// Print program info and exit
    #[arg(long)]
    #[serde(default)]
    pub info: bool,

    /// Print the parsed configuration and exit
    #[arg(long)]
    #[serde(default)]
    pub print_config: bool,

    /// Configuration file path (YAML or JSON)
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Canvas server address
    #[arg(short = 'n', long, default_value = "localhost:8080")]
    #[serde(default = "default_node")]
    pub node: String,

    /// Use TLS to connect to the server
    #[arg(short = 't', long)]
    #[serde(default)]
    pub tls: bool,

    /// Accept self-signed TLS certificates
    #[arg(long)]
    #[serde(default)]
    pub insecure: bool,

    /// X coordinate of the pixel to place
    #[arg(short = 'x', long)]
    pub x: Option<u32>,

    /// Y coordinate of the pixel to place
    #[arg(short = 'y', long)]
    pub y: Option<u32>,

    /// Color to place, as #RRGGBB or RRGGBB
    #[arg(short = 'c', long)]
    pub color: Option<String>,

    /// Difficulty the placed pixel should demand from the next writer
    #[arg(short = 'd', long, default_value = "0")]
    #[serde(default)]
    pub new_difficulty: u32,

    /// Number of concurrent mining threads (0 = all cores)
    #[arg(short = 'j', long, default_value = "2")]
    #[serde(default = "default_thread_count")]
    pub thread_count: usize,

    /// Log level
    #[arg(short = 'l', long, default_value = "info")]
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    /// Default HTTP timeout in milliseconds
    #[arg(long, default_value = "30000")]
    #[serde(default = "default_http_timeout")]
    pub http_timeout: u64,

    /// Maximum retry attempts for HTTP requests
    #[arg(long, default_value = "10")]
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Base retry delay in milliseconds
    #[arg(long, default_value = "100")]
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,

    /// Maximum retry delay in milliseconds
    #[arg(long, default_value = "5000")]
    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay: u64,
}

impl Config {
    /// Load configuration from CLI arguments and an optional config file
    pub async fn load() -> Result<Self> {
        let mut config = Self::parse();

        if let Some(config_file) = &config.config_file {
            let file_config = Self::load_from_file(config_file).await?;
            config = config.merge_with_file(file_config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    async fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;

        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content).map_err(Error::from)
        } else {
            // Default to YAML
            serde_yaml::from_str(&content).map_err(Error::from)
        }
    }

    /// Merge CLI config with file config (CLI takes precedence)
    fn merge_with_file(mut self, file_config: Self) -> Self {
        if self.x.is_none() {
            self.x = file_config.x;
        }
        if self.y.is_none() {
            self.y = file_config.y;
        }
        if self.color.is_none() {
            self.color = file_config.color;
        }
        // For other fields, keep CLI values (they include defaults)
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(color) = &self.color {
            parse_color(color)?;
        }

        if self.new_difficulty >= MAX_NEW_DIFFICULTY {
            return Err(Error::config(format!(
                "New difficulty must be below {}, got {}",
                MAX_NEW_DIFFICULTY, self.new_difficulty
            )));
        }

        Url::parse(&self.node_url())
            .map_err(|e| Error::config(format!("Invalid node URL: {}", e)))?;

        Ok(())
    }

    /// Build the validated pixel request from the configured placement
    pub fn request(&self) -> Result<PixelRequest> {
        let x = self
            .x
            .ok_or_else(|| Error::config("An x coordinate is required (use --x)"))?;
        let y = self
            .y
            .ok_or_else(|| Error::config("A y coordinate is required (use --y)"))?;
        let color = self
            .color
            .as_deref()
            .ok_or_else(|| Error::config("A color is required (use --color)"))?;

        PixelRequest::new(x, y, parse_color(color)?, self.new_difficulty)
    }

    /// Get node URL
    pub fn node_url(&self) -> String {
        if self.tls {
            format!("https://{}", self.node)
        } else {
            format!("http://{}", self.node)
        }
    }

    /// Get HTTP timeout duration
    pub fn http_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.http_timeout)
    }

    /// Get retry delay duration
    pub fn retry_delay_duration(&self) -> Duration {
        Duration::from_millis(self.retry_delay)
    }

    /// Get max retry delay duration
    pub fn max_retry_delay_duration(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay)
    }
}

// Default value functions for serde
fn default_node() -> String {
    "localhost:8080".to_string()
}
fn default_thread_count() -> usize {
    2
}
fn default_log_level() -> LogLevel {
    LogLevel::Info
}
fn default_http_timeout() -> u64 {
    30000
}
fn default_max_retries() -> usize {
    10
}
fn default_retry_delay() -> u64 {
    100
}
fn default_max_retry_delay() -> u64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_defaults() {
        let config = Config::try_parse_from(["pixelchain-mining-client"]).unwrap();

        assert_eq!(config.node, "localhost:8080");
        assert_eq!(config.thread_count, 2);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.new_difficulty, 0);
        assert!(!config.tls);
        assert!(!config.insecure);
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#ff0000").unwrap(), 0xFF0000);
        assert_eq!(parse_color("00FF00").unwrap(), 0x00FF00);
        assert!(parse_color("#ff00").is_err());
        assert!(parse_color("#gggggg").is_err());
        assert!(parse_color("red").is_err());
    }

    #[test]
    fn test_request_requires_placement_fields() {
        let config = Config::try_parse_from(["pixelchain-mining-client"]).unwrap();
        assert!(config.request().is_err());

        let config = Config::try_parse_from([
            "pixelchain-mining-client",
            "-x",
            "10",
            "-y",
            "20",
            "-c",
            "#123456",
            "-d",
            "3",
        ])
        .unwrap();
        let request = config.request().unwrap();
        assert_eq!(request.x(), 10);
        assert_eq!(request.y(), 20);
        assert_eq!(request.color(), 0x123456);
        assert_eq!(request.new_difficulty(), 3);
    }

    #[test]
    fn test_validate_rejects_excessive_difficulty() {
        let config = Config::try_parse_from([
            "pixelchain-mining-client",
            "--new-difficulty",
            "64",
        ])
        .unwrap();
        assert!(config.validate().is_err());

        let config = Config::try_parse_from([
            "pixelchain-mining-client",
            "--new-difficulty",
            "63",
        ])
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_coordinate_is_a_range_error() {
        let config = Config::try_parse_from([
            "pixelchain-mining-client",
            "-x",
            "65536",
            "-y",
            "0",
            "-c",
            "#000000",
        ])
        .unwrap();
        assert!(matches!(
            config.request(),
            Err(Error::Range { field: "x", .. })
        ));
    }

    #[tokio::test]
    async fn test_config_from_yaml() {
        let yaml_content = r##"
node: "canvas.example.com:8080"
tls: true
x: 5
y: 6
color: "#abcdef"
thread_count: 4
"##;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = Config::load_from_file(&temp_file.path().to_path_buf())
            .await
            .unwrap();

        assert_eq!(config.node, "canvas.example.com:8080");
        assert!(config.tls);
        assert_eq!(config.x, Some(5));
        assert_eq!(config.color.as_deref(), Some("#abcdef"));
        assert_eq!(config.thread_count, 4);
    }

    #[test]
    fn test_file_values_yield_to_cli() {
        let cli = Config::try_parse_from(["pixelchain-mining-client", "-x", "1"]).unwrap();
        let mut file = Config::try_parse_from(["pixelchain-mining-client"]).unwrap();
        file.x = Some(99);
        file.y = Some(42);

        let merged = cli.merge_with_file(file);
        assert_eq!(merged.x, Some(1));
        assert_eq!(merged.y, Some(42));
    }

    #[test]
    fn test_node_url() {
        let config = Config::try_parse_from(["pixelchain-mining-client"]).unwrap();
        assert_eq!(config.node_url(), "http://localhost:8080");

        let config = Config::try_parse_from(["pixelchain-mining-client", "-t"]).unwrap();
        assert_eq!(config.node_url(), "https://localhost:8080");
    }
}
