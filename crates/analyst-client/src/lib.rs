pub mod error;
pub mod jobs;
pub mod provider;

pub use error::{ClientError, ClientResult};
pub use jobs::AnalystClient;
pub use provider::HttpJobService;

use std::time::Duration;

/// Configuration for the analysis service
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }
}
