use std::time::Duration;

use log::error;

const DEFAULT_REGISTRY_URL: &str = "https://uldk.gugik.gov.pl/";
const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;
const DEFAULT_USER_AGENT: &str = concat!("parcelvas/", env!("CARGO_PKG_VERSION"));

/// Settings of the registry connection.
///
/// Every field is optional so that partial sources (environment, defaults) can be merged;
/// the accessors fall back to the built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Config {
  pub registry_url: Option<String>,
  pub timeout_secs: Option<u64>,
  pub requests_per_second: Option<u32>,
  pub user_agent: Option<String>,
}

impl Config {
  /// Environment overrides merged over the defaults.
  #[must_use]
  pub fn new() -> Self {
    Self::from_env().merge(&Self::default())
  }

  fn from_env() -> Self {
    let registry_url = std::env::var("PARCELVAS_REGISTRY_URL").ok();

    let timeout_secs = std::env::var("PARCELVAS_TIMEOUT_SECS")
      .ok()
      .and_then(|v| {
        v.parse()
          .inspect_err(|e| error!("Ignoring PARCELVAS_TIMEOUT_SECS={v}: {e}"))
          .ok()
      });

    let requests_per_second = std::env::var("PARCELVAS_REQUESTS_PER_SECOND")
      .ok()
      .and_then(|v| {
        v.parse()
          .inspect_err(|e| error!("Ignoring PARCELVAS_REQUESTS_PER_SECOND={v}: {e}"))
          .ok()
      });

    Self {
      registry_url,
      timeout_secs,
      requests_per_second,
      user_agent: None,
    }
  }

  #[must_use]
  pub fn merge(mut self, other: &Self) -> Self {
    self.registry_url = self.registry_url.or(other.registry_url.clone());
    self.timeout_secs = self.timeout_secs.or(other.timeout_secs);
    self.requests_per_second = self.requests_per_second.or(other.requests_per_second);
    self.user_agent = self.user_agent.or(other.user_agent.clone());
    self
  }

  #[must_use]
  pub fn with_registry_url(mut self, url: impl Into<String>) -> Self {
    self.registry_url = Some(url.into());
    self
  }

  #[must_use]
  pub fn registry_url(&self) -> &str {
    self.registry_url.as_deref().unwrap_or(DEFAULT_REGISTRY_URL)
  }

  /// No timeout unless one is configured: a request waits until the network layer gives up.
  #[must_use]
  pub fn timeout(&self) -> Option<Duration> {
    self.timeout_secs.map(Duration::from_secs)
  }

  #[must_use]
  pub fn requests_per_second(&self) -> u32 {
    self
      .requests_per_second
      .filter(|&n| n > 0)
      .unwrap_or(DEFAULT_REQUESTS_PER_SECOND)
  }

  #[must_use]
  pub fn user_agent(&self) -> &str {
    self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      registry_url: Some(DEFAULT_REGISTRY_URL.to_string()),
      timeout_secs: None,
      requests_per_second: Some(DEFAULT_REQUESTS_PER_SECOND),
      user_agent: Some(DEFAULT_USER_AGENT.to_string()),
    }
  }
}
