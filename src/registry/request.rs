use std::fmt::Display;

use crate::{cascade::AdminLevel, coordinates::WGS84Coordinate};

/// Spatial reference of everything exchanged with the map: plain longitude/latitude.
pub const WGS84_SRID: u32 = 4326;

/// The request kinds understood by the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryRequest {
  /// Children of `parent` at `level`. The top level takes an empty parent.
  Units { level: AdminLevel, parent: String },
  /// A parcel addressed as `<region teryt>.<parcel number>`.
  ParcelById { id: String },
  /// A parcel addressed by its full identifier (or a number the registry can resolve).
  ParcelByIdOrNr { id: String },
  /// The parcel containing a point.
  ParcelByXY { position: WGS84Coordinate },
}

impl RegistryRequest {
  /// Value of the `request` query parameter.
  #[must_use]
  pub fn name(&self) -> &'static str {
    match self {
      RegistryRequest::Units { level, .. } => match level {
        AdminLevel::Voivodeship => "GetVoivodeshipById",
        AdminLevel::County => "GetCountyById",
        AdminLevel::Commune => "GetCommuneById",
        AdminLevel::Region => "GetRegionById",
      },
      RegistryRequest::ParcelById { .. } => "GetParcelById",
      RegistryRequest::ParcelByIdOrNr { .. } => "GetParcelByIdOrNr",
      RegistryRequest::ParcelByXY { .. } => "GetParcelByXY",
    }
  }

  /// The full request URL below `base_url`.
  #[must_use]
  pub fn url(&self, base_url: &str) -> String {
    let query = match self {
      RegistryRequest::Units { level, parent } => format!(
        "result=teryt,{}&id={}",
        level.result_field(),
        urlencoding::encode(parent)
      ),
      RegistryRequest::ParcelById { id } | RegistryRequest::ParcelByIdOrNr { id } => format!(
        "result=geom_wkt&id={}&srid={WGS84_SRID}",
        urlencoding::encode(id)
      ),
      RegistryRequest::ParcelByXY { position } => format!(
        "result=geom_wkt&srid={WGS84_SRID}&xy={},{},{WGS84_SRID}",
        position.lon, position.lat
      ),
    };
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}request={}&{query}", self.name())
  }
}

impl Display for RegistryRequest {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      RegistryRequest::Units { level, parent } if parent.is_empty() => {
        write!(f, "{} list", level.name())
      }
      RegistryRequest::Units { level, parent } => write!(f, "{} list of {parent}", level.name()),
      RegistryRequest::ParcelById { id } | RegistryRequest::ParcelByIdOrNr { id } => {
        write!(f, "{} {id}", self.name())
      }
      RegistryRequest::ParcelByXY { position } => {
        write!(f, "{} {:.6},{:.6}", self.name(), position.lon, position.lat)
      }
    }
  }
}
