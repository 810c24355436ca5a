//! Pixelchain canvas server client
//!
//! Handles communication with the canvas server: canvas configuration and
//! statistics, per-pixel state (current color, required difficulty, previous
//! block), and submission of mined pixel placements.

use crate::{Error, Nonce, PixelRequest, Result};
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Canvas configuration advertised by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasInfo {
    pub width: u32,
    pub height: u32,
    /// Name of the hash function the server verifies candidates with
    pub hash: String,
    #[serde(rename = "pixelPenalty")]
    pub pixel_penalty: u32,
}

/// Canvas statistics response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasStats {
    pub lagging_pixels: u64,
    pub total_estimated_hashes: u64,
    pub total_updates: u64,
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

/// Current state of a single pixel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixelState {
    /// Current 24-bit RGB color
    pub rgb: u32,
    /// Penalty plus the pixel's current difficulty; the proof must
    /// additionally cover the requested new difficulty
    #[serde(rename = "requiredDifficulty")]
    pub required_difficulty: u32,
    /// Hex-encoded previous block for this pixel
    #[serde(rename = "lastBlock")]
    pub last_block: String,
}

impl PixelState {
    /// Total difficulty a placement proof must achieve for a given request
    pub fn mining_target(&self, request: &PixelRequest) -> u32 {
        self.required_difficulty + request.new_difficulty() as u32
    }
}

/// A mined pixel placement ready for submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixelSubmission {
    #[serde(rename = "lastBlock")]
    pub last_block: String,
    pub nonce: String,
    #[serde(rename = "newDifficulty")]
    pub new_difficulty: u32,
    pub rgb: u32,
}

impl PixelSubmission {
    /// Build a submission from the mined request, its nonce, and the
    /// previous block it was mined against
    pub fn new(request: &PixelRequest, nonce: Nonce, last_block: String) -> Self {
        Self {
            last_block,
            nonce: nonce.to_hex(),
            new_difficulty: request.new_difficulty() as u32,
            rgb: request.color(),
        }
    }
}

/// Exponential backoff configuration
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub max_retries: usize,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            max_retries: 10,
        }
    }
}

/// Pixelchain canvas server client
pub struct CanvasClient {
    client: Client,
    base_url: Url,
    backoff_config: BackoffConfig,
}

impl CanvasClient {
    /// Create a new canvas client
    pub fn new(base_url: impl AsRef<str>, timeout: Duration, insecure: bool) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())
            .map_err(|e| Error::config(format!("Invalid base URL: {}", e)))?;

        let client = ClientBuilder::new()
            .timeout(timeout)
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(Error::from)?;

        Ok(Self {
            client,
            base_url,
            backoff_config: BackoffConfig::default(),
        })
    }

    /// Set custom backoff configuration
    pub fn with_backoff_config(mut self, config: BackoffConfig) -> Self {
        self.backoff_config = config;
        self
    }

    /// Get canvas configuration
    #[instrument(skip(self))]
    pub async fn get_info(&self) -> Result<CanvasInfo> {
        let url = self.endpoint("config/")?;
        debug!("Fetching canvas info from: {}", url);

        let response = self.get_with_retry(&url).await?;
        let info: CanvasInfo = response
            .json()
            .await
            .map_err(|e| Error::server(format!("Failed to parse canvas info: {}", e)))?;

        info!(
            "Connected to {}x{} canvas (hash: {}, penalty: {})",
            info.width, info.height, info.hash, info.pixel_penalty
        );

        Ok(info)
    }

    /// Get canvas statistics
    #[instrument(skip(self))]
    pub async fn get_stats(&self) -> Result<CanvasStats> {
        let url = self.endpoint("stats/")?;

        let response = self.get_with_retry(&url).await?;
        response
            .json()
            .await
            .map_err(|e| Error::server(format!("Failed to parse canvas stats: {}", e)))
    }

    /// Get the current state of a pixel
    #[instrument(skip(self))]
    pub async fn get_pixel(&self, x: u16, y: u16) -> Result<PixelState> {
        let url = self.pixel_endpoint(x, y)?;
        debug!("Fetching pixel state from: {}", url);

        let response = self.get_with_retry(&url).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::server(format!(
                "Pixel ({}, {}) is outside the canvas",
                x, y
            )));
        }
        if !response.status().is_success() {
            return Err(Error::server(format!(
                "Failed to get pixel state: HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::server(format!("Failed to parse pixel state: {}", e)))
    }

    /// Submit a mined pixel placement
    ///
    /// The server answers 201 on acceptance, 409 when the pixel's previous
    /// block changed underneath the miner, and 403 when the proof does not
    /// verify.
    #[instrument(skip(self, submission))]
    pub async fn submit_pixel(
        &self,
        x: u16,
        y: u16,
        submission: &PixelSubmission,
    ) -> Result<()> {
        let url = self.pixel_endpoint(x, y)?;
        debug!("Submitting mined pixel to: {}", url);

        let response = self
            .client
            .post(url)
            .json(submission)
            .send()
            .await
            .map_err(Error::from)?;

        match response.status() {
            StatusCode::CREATED => {
                info!("Pixel ({}, {}) accepted by the server", x, y);
                Ok(())
            }
            StatusCode::CONFLICT => Err(Error::conflict(format!(
                "Pixel ({}, {}) changed since the previous block was fetched",
                x, y
            ))),
            StatusCode::FORBIDDEN => Err(Error::rejected(format!(
                "Server rejected the proof for pixel ({}, {})",
                x, y
            ))),
            status => {
                warn!("Unexpected submission response: HTTP {}", status);
                Err(Error::server(format!(
                    "Failed to submit pixel: HTTP {}",
                    status
                )))
            }
        }
    }

    /// Fetch the latest canvas snapshot as PNG bytes
    #[instrument(skip(self))]
    pub async fn latest_png(&self) -> Result<Vec<u8>> {
        let url = self.endpoint("latest/")?;

        let response = self.get_with_retry(&url).await?;
        if !response.status().is_success() {
            return Err(Error::server(format!(
                "Failed to fetch canvas snapshot: HTTP {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::server(format!("Failed to read canvas snapshot: {}", e)))?;
        Ok(bytes.to_vec())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::server(format!("Failed to build {} URL: {}", path, e)))
    }

    fn pixel_endpoint(&self, x: u16, y: u16) -> Result<Url> {
        self.endpoint(&format!("pixel/{}/{}/", x, y))
    }

    /// GET request with exponential backoff retry
    async fn get_with_retry(&self, url: &Url) -> Result<Response> {
        let mut delay = self.backoff_config.initial_delay;
        let mut attempts = 0;

        loop {
            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    if !response.status().is_server_error() {
                        return Ok(response);
                    }

                    if attempts >= self.backoff_config.max_retries {
                        return Err(Error::server(format!(
                            "Giving up after {} attempts: HTTP {}",
                            attempts + 1,
                            response.status()
                        )));
                    }
                }
                Err(e) => {
                    if !e.is_timeout() && !e.is_connect()
                        || attempts >= self.backoff_config.max_retries
                    {
                        return Err(Error::from(e));
                    }
                }
            }

            warn!(
                "Request failed, retrying in {:?} (attempt {}/{})",
                delay,
                attempts + 1,
                self.backoff_config.max_retries
            );
            sleep(delay).await;

            delay = Duration::from_millis(
                ((delay.as_millis() as f64) * self.backoff_config.multiplier) as u64,
            )
            .min(self.backoff_config.max_delay);

            attempts += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = CanvasClient::new("http://localhost:8080", Duration::from_secs(30), false);
        assert!(client.is_ok());

        let bad = CanvasClient::new("not a url", Duration::from_secs(30), false);
        assert!(bad.is_err());
    }

    #[test]
    fn test_pixel_endpoint_layout() {
        let client =
            CanvasClient::new("http://localhost:8080", Duration::from_secs(30), false).unwrap();
        let url = client.pixel_endpoint(12, 34).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/pixel/12/34/");
    }

    #[test]
    fn test_pixel_state_deserialization() {
        let json = r#"{
            "rgb": 16711680,
            "requiredDifficulty": 8,
            "lastBlock": "7e49c83b400ab55e405f7396162309c0e311ee0eba248f960878c1d729987ff1"
        }"#;
        let state: PixelState = serde_json::from_str(json).unwrap();
        assert_eq!(state.rgb, 0xFF0000);
        assert_eq!(state.required_difficulty, 8);
        assert_eq!(state.last_block.len(), 64);
    }

    #[test]
    fn test_canvas_stats_deserialization() {
        let json = r#"{
            "lagging_pixels": 3,
            "total_estimated_hashes": 1024,
            "total_updates": 7,
            "connections": "unknown",
            "estimated_hps": "unknown"
        }"#;
        let stats: CanvasStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.lagging_pixels, 3);
        assert_eq!(stats.total_estimated_hashes, 1024);
        assert_eq!(stats.total_updates, 7);
        assert_eq!(stats.other["connections"], "unknown");
    }

    #[test]
    fn test_mining_target_includes_new_difficulty() {
        let state = PixelState {
            rgb: 0,
            required_difficulty: 8,
            last_block: String::new(),
        };
        let request = PixelRequest::new(0, 0, 0, 5).unwrap();
        assert_eq!(state.mining_target(&request), 13);
    }

    #[test]
    fn test_submission_serialization() {
        let request = PixelRequest::new(10, 20, 0xABCDEF, 3).unwrap();
        let submission =
            PixelSubmission::new(&request, Nonce::new(0x1234), "00ff".to_string());

        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["lastBlock"], "00ff");
        assert_eq!(json["nonce"], "0000000000001234");
        assert_eq!(json["newDifficulty"], 3);
        assert_eq!(json["rgb"], 0xABCDEF);
    }

    #[test]
    fn test_backoff_config() {
        let config = BackoffConfig {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(10),
            multiplier: 1.5,
            max_retries: 5,
        };

        let client =
            CanvasClient::new("http://localhost:8080", Duration::from_secs(30), false)
                .unwrap()
                .with_backoff_config(config);

        assert_eq!(client.backoff_config.max_retries, 5);
        assert_eq!(client.backoff_config.multiplier, 1.5);
    }
}
