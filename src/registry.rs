mod request;
mod transport;

use std::sync::Arc;

use log::{debug, info};

pub use request::{RegistryRequest, WGS84_SRID};
#[cfg(test)]
pub(crate) use transport::testing;
pub use transport::{SurfTransport, Transport};

use crate::{cascade::AdministrativeUnit, config::Config, error::NetworkError};

/// The registry's text payload after the status marker has been removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryResponse {
  /// A well-formed answer without any record.
  NoMatch,
  /// Non-empty lines of the payload.
  Records(Vec<String>),
}

impl RegistryResponse {
  /// Splits off the status marker (the first character) and breaks the rest into lines.
  #[must_use]
  pub fn parse(body: &str) -> Self {
    let mut chars = body.chars();
    let Some(marker) = chars.next() else {
      return RegistryResponse::NoMatch;
    };
    let payload = chars.as_str().trim();

    if marker == '-' {
      debug!("Registry reported an error: {payload}");
      return RegistryResponse::NoMatch;
    }
    if payload.is_empty() {
      return RegistryResponse::NoMatch;
    }

    RegistryResponse::Records(
      payload
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect(),
    )
  }

  /// Reads `code|name` records; lines with a different field count are skipped.
  #[must_use]
  pub fn units(&self) -> Vec<AdministrativeUnit> {
    let RegistryResponse::Records(records) = self else {
      return vec![];
    };
    records
      .iter()
      .filter_map(|line| {
        let fields: Vec<_> = line.split('|').map(str::trim).collect();
        if let [code, name] = fields.as_slice() {
          Some(AdministrativeUnit::new(*code, *name))
        } else {
          debug!("Skipping malformed unit record: {line}");
          None
        }
      })
      .collect()
  }

  /// The WKT of the first record, without a `;`-separated prefix.
  #[must_use]
  pub fn geometry_wkt(&self) -> Option<&str> {
    let RegistryResponse::Records(records) = self else {
      return None;
    };
    let first = records.first()?;
    let wkt = match first.split_once(';') {
      Some((_, wkt)) => wkt,
      None => first,
    };
    Some(wkt.trim())
  }
}

/// Talks to the land-registry lookup service.
#[derive(Clone)]
pub struct RegistryClient {
  base_url: String,
  transport: Arc<dyn Transport>,
}

impl RegistryClient {
  #[must_use]
  pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
    Self {
      base_url: base_url.into(),
      transport,
    }
  }

  /// A client using HTTP as configured.
  ///
  /// # Errors
  ///
  /// If the HTTP client cannot be set up.
  pub fn from_config(config: &Config) -> Result<Self, NetworkError> {
    Ok(Self::new(
      config.registry_url(),
      Arc::new(SurfTransport::new(config)?),
    ))
  }

  /// Sends one request. Transport failures are returned as is, never retried.
  ///
  /// # Errors
  ///
  /// [`NetworkError`] on transport failure or a non-success status.
  pub async fn query(&self, request: &RegistryRequest) -> Result<RegistryResponse, NetworkError> {
    let url = request.url(&self.base_url);
    let body = self.transport.get(&url).await?;
    let response = RegistryResponse::parse(&body);
    match &response {
      RegistryResponse::NoMatch => info!("{request}: no match"),
      RegistryResponse::Records(records) => {
        debug!("{request}: {} record(s)", records.len());
      }
    }
    Ok(response)
  }
}
