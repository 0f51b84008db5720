use log::{debug, error};
use surf_governor::GovernorMiddleware;

use crate::{config::Config, error::NetworkError};

/// Fetches the body of a registry URL.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
  async fn get(&self, url: &str) -> Result<String, NetworkError>;
}

/// HTTP transport backed by `surf`, rate limited to be polite to the public registry.
pub struct SurfTransport {
  client: surf::Client,
  user_agent: String,
}

impl SurfTransport {
  /// # Errors
  ///
  /// If the HTTP client cannot be configured.
  pub fn new(config: &Config) -> Result<Self, NetworkError> {
    let client = surf::Client::try_from(surf::Config::new().set_timeout(config.timeout()))
      .map_err(|e| NetworkError::new(format!("cannot create HTTP client: {e}")))?;
    let governor = GovernorMiddleware::per_second(config.requests_per_second())
      .map_err(|e| NetworkError::new(format!("cannot create rate limiter: {e}")))?;

    Ok(Self {
      client: client.with(governor),
      user_agent: config.user_agent().to_string(),
    })
  }
}

#[async_trait::async_trait]
impl Transport for SurfTransport {
  async fn get(&self, url: &str) -> Result<String, NetworkError> {
    debug!("GET {url}");
    let mut response = self
      .client
      .get(url)
      .header("User-Agent", self.user_agent.as_str())
      .await
      .map_err(|e| NetworkError::new(e.to_string()))?;

    if !response.status().is_success() {
      error!("Registry answered {} for {url}", response.status());
      return Err(NetworkError::new(format!("HTTP {}", response.status())));
    }

    response
      .body_string()
      .await
      .map_err(|e| NetworkError::new(e.to_string()))
  }
}
