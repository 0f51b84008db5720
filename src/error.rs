use thiserror::Error;

use crate::cascade::AdminLevel;

/// The registry could not be reached or answered with a non-success status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Registry request failed: {0}")]
pub struct NetworkError(pub String);

impl NetworkError {
  pub fn new(reason: impl Into<String>) -> Self {
    Self(reason.into())
  }
}

/// The registry returned text that is not valid WKT.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed geometry at offset {offset}: {reason}")]
pub struct MalformedGeometry {
  pub offset: usize,
  pub reason: String,
}

impl MalformedGeometry {
  pub fn new(offset: usize, reason: impl Into<String>) -> Self {
    Self {
      offset,
      reason: reason.into(),
    }
  }
}

/// Failures of a parcel lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
  #[error(transparent)]
  Network(#[from] NetworkError),
  #[error("No parcel found.")]
  NotFound,
  #[error(transparent)]
  MalformedGeometry(#[from] MalformedGeometry),
  /// Rejected before anything was sent to the registry.
  #[error("Invalid query: {0}")]
  InvalidQuery(String),
}

/// Failures while walking the administrative hierarchy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CascadeError {
  #[error("{level} has no candidate with code {code}.")]
  UnknownUnit { level: AdminLevel, code: String },
  #[error("{level} cannot be selected before a {parent} is selected.")]
  ParentNotSelected {
    level: AdminLevel,
    parent: AdminLevel,
  },
  #[error(transparent)]
  Network(#[from] NetworkError),
}
