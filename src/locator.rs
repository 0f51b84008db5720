use std::{fmt::Display, sync::Arc};

use geo_types::Geometry;
use geojson::{Feature, FeatureCollection, JsonObject, feature::Id};
use log::{debug, info};

use crate::{
  coordinates::{BoundingBox, WGS84Coordinate},
  error::LookupError,
  registry::{RegistryClient, RegistryRequest},
  wkt,
};

/// Separator between the region teryt and the parcel number in a parcel identifier.
pub const PARCEL_ID_SEPARATOR: char = '.';

/// Feature ids used by the map for the two ways a lookup is started.
const FORM_FEATURE_ID: u64 = 1;
const CLICK_FEATURE_ID: u64 = 3;

/// The three ways to identify a parcel.
#[derive(Debug, Clone, PartialEq)]
pub enum ParcelQuery {
  ByRegionAndNumber { region: String, number: String },
  ByWholeId(String),
  ByCoordinates(WGS84Coordinate),
}

impl ParcelQuery {
  /// The registry request answering this query.
  ///
  /// # Errors
  ///
  /// [`LookupError::InvalidQuery`] for blank identifiers or coordinates off the globe.
  pub fn to_request(&self) -> Result<RegistryRequest, LookupError> {
    match self {
      ParcelQuery::ByRegionAndNumber { region, number } => {
        let (region, number) = (region.trim(), number.trim());
        if region.is_empty() {
          return Err(LookupError::InvalidQuery("no region selected".to_string()));
        }
        if number.is_empty() {
          return Err(LookupError::InvalidQuery("empty parcel number".to_string()));
        }
        Ok(RegistryRequest::ParcelById {
          id: format!("{region}{PARCEL_ID_SEPARATOR}{number}"),
        })
      }
      ParcelQuery::ByWholeId(id) => {
        let id = id.trim();
        if id.is_empty() {
          return Err(LookupError::InvalidQuery("empty parcel identifier".to_string()));
        }
        Ok(RegistryRequest::ParcelByIdOrNr { id: id.to_string() })
      }
      ParcelQuery::ByCoordinates(position) => {
        if !position.is_valid() {
          return Err(LookupError::InvalidQuery(format!(
            "position {}, {} is not a geographic coordinate",
            position.lat, position.lon
          )));
        }
        Ok(RegistryRequest::ParcelByXY {
          position: *position,
        })
      }
    }
  }

  #[must_use]
  pub fn feature_id(&self) -> u64 {
    match self {
      ParcelQuery::ByRegionAndNumber { .. } | ParcelQuery::ByWholeId(_) => FORM_FEATURE_ID,
      ParcelQuery::ByCoordinates(_) => CLICK_FEATURE_ID,
    }
  }
}

impl Display for ParcelQuery {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ParcelQuery::ByRegionAndNumber { region, number } => {
        write!(f, "parcel {number} in region {region}")
      }
      ParcelQuery::ByWholeId(id) => write!(f, "parcel {id}"),
      ParcelQuery::ByCoordinates(p) => write!(f, "parcel at {:.6}, {:.6}", p.lat, p.lon),
    }
  }
}

/// Attribute rows of the popup. The geometry-only registry answers leave them empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParcelDetails {
  pub voivodeship: Option<String>,
  pub county: Option<String>,
  pub commune: Option<String>,
  pub region_name: Option<String>,
  pub parcel_number: Option<String>,
  pub parcel_id: Option<String>,
}

impl ParcelDetails {
  #[must_use]
  pub fn popup_text(&self) -> String {
    [
      ("Województwo", &self.voivodeship),
      ("Powiat", &self.county),
      ("Gmina", &self.commune),
      ("Nazwa obrębu", &self.region_name),
      ("Numer działki", &self.parcel_number),
      ("Numer ewidencyjny działki", &self.parcel_id),
    ]
    .iter()
    .map(|(label, value)| format!("<b>{label}</b>: {} <br>", value.as_deref().unwrap_or("")))
    .collect::<Vec<_>>()
    .join("\n")
  }
}

/// A located parcel ready to be put on the map. Replaced, never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryFeature {
  pub geometry: Geometry<f64>,
  pub popup_text: String,
  pub id: u64,
}

impl GeometryFeature {
  #[must_use]
  pub fn bounds(&self) -> BoundingBox {
    BoundingBox::from_geometry(&self.geometry)
  }

  #[must_use]
  pub fn geojson_geometry(&self) -> geojson::Geometry {
    wkt::geojson_geometry(&self.geometry)
  }

  /// A `GeoJSON` feature carrying the popup as `popupContent`.
  #[must_use]
  pub fn to_feature(&self) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert(
      "popupContent".to_string(),
      serde_json::Value::String(self.popup_text.clone()),
    );
    Feature {
      bbox: None,
      geometry: Some(self.geojson_geometry()),
      id: Some(Id::Number(self.id.into())),
      properties: Some(properties),
      foreign_members: None,
    }
  }

  #[must_use]
  pub fn to_feature_collection(&self) -> FeatureCollection {
    FeatureCollection {
      bbox: None,
      features: vec![self.to_feature()],
      foreign_members: None,
    }
  }
}

/// Resolves parcel queries to displayable features.
#[derive(Clone)]
pub struct ParcelLocator {
  registry: Arc<RegistryClient>,
}

impl ParcelLocator {
  #[must_use]
  pub fn new(registry: Arc<RegistryClient>) -> Self {
    Self { registry }
  }

  /// Looks up the parcel and converts the first geometry of the answer.
  ///
  /// # Errors
  ///
  /// [`LookupError::NotFound`] when the registry has no match, network and geometry errors
  /// as reported by the lower layers.
  pub async fn locate(&self, query: &ParcelQuery) -> Result<GeometryFeature, LookupError> {
    let request = query.to_request()?;
    let response = self.registry.query(&request).await?;

    let Some(wkt) = response.geometry_wkt() else {
      info!("No result for {query}");
      return Err(LookupError::NotFound);
    };
    let geometry = wkt::parse(wkt)?;
    debug!("Located {query}");

    Ok(GeometryFeature {
      geometry,
      popup_text: ParcelDetails::default().popup_text(),
      id: query.feature_id(),
    })
  }
}

#[cfg(test)]
mod tests {
  use futures::executor::block_on;
  use geo_types::polygon;

  use super::*;
  use crate::registry::testing::StaticTransport;

  fn locator(transport: StaticTransport) -> (ParcelLocator, Arc<StaticTransport>) {
    let transport = Arc::new(transport);
    let registry = RegistryClient::new("http://registry/", transport.clone());
    (ParcelLocator::new(Arc::new(registry)), transport)
  }

  #[test]
  fn region_and_number_are_joined_with_dot() {
    let query = ParcelQuery::ByRegionAndNumber {
      region: "066301_1.0012".to_string(),
      number: " 123/4 ".to_string(),
    };
    assert_eq!(
      query.to_request().unwrap(),
      RegistryRequest::ParcelById {
        id: "066301_1.0012.123/4".to_string()
      }
    );
    assert_eq!(query.feature_id(), 1);
  }

  #[test]
  fn blank_queries_are_rejected() {
    let query = ParcelQuery::ByRegionAndNumber {
      region: "066301_1.0012".to_string(),
      number: "  ".to_string(),
    };
    assert!(matches!(query.to_request(), Err(LookupError::InvalidQuery(_))));
    assert!(matches!(
      ParcelQuery::ByWholeId(String::new()).to_request(),
      Err(LookupError::InvalidQuery(_))
    ));
    assert!(matches!(
      ParcelQuery::ByCoordinates(WGS84Coordinate::new(200.0, 0.0)).to_request(),
      Err(LookupError::InvalidQuery(_))
    ));
  }

  #[test]
  fn locate_by_coordinates() {
    let (locator, transport) = locator(
      StaticTransport::default()
        .with("GetParcelByXY", "0\nSRID=4326;POLYGON((22.5 51.2,22.6 51.2,22.6 51.3,22.5 51.2))\n"),
    );

    let feature = block_on(locator.locate(&ParcelQuery::ByCoordinates(WGS84Coordinate::new(
      51.25, 22.55,
    ))))
    .unwrap();

    assert_eq!(feature.id, 3);
    assert_eq!(
      feature.geometry,
      Geometry::Polygon(polygon![
        (x: 22.5, y: 51.2),
        (x: 22.6, y: 51.2),
        (x: 22.6, y: 51.3),
      ])
    );
    assert!(transport.requests.lock().unwrap()[0].contains("xy=22.55,51.25,4326"));
  }

  #[test]
  fn no_match_is_not_found() {
    let (locator, _) = locator(StaticTransport::default().with("GetParcelByIdOrNr", "0\n"));
    let result = block_on(locator.locate(&ParcelQuery::ByWholeId("066301_1.0012.1".to_string())));
    assert_eq!(result, Err(LookupError::NotFound));
  }

  #[test]
  fn garbage_geometry_is_malformed() {
    let (locator, _) =
      locator(StaticTransport::default().with("GetParcelByIdOrNr", "0\nnot a geometry"));
    let result = block_on(locator.locate(&ParcelQuery::ByWholeId("1".to_string())));
    assert!(matches!(result, Err(LookupError::MalformedGeometry(_))));
  }

  #[test]
  fn network_error_is_propagated() {
    let (locator, _) = locator(StaticTransport::default().failing("GetParcelById", "timeout"));
    let result = block_on(locator.locate(&ParcelQuery::ByRegionAndNumber {
      region: "1".to_string(),
      number: "2".to_string(),
    }));
    assert!(matches!(result, Err(LookupError::Network(_))));
  }

  #[test]
  fn popup_has_labelled_empty_rows() {
    let text = ParcelDetails::default().popup_text();
    assert_eq!(text.lines().count(), 6);
    assert!(text.starts_with("<b>Województwo</b>:  <br>"));
    assert!(text.contains("<b>Numer ewidencyjny działki</b>:  <br>"));
  }

  #[test]
  fn feature_collection_carries_popup_and_id() {
    let feature = GeometryFeature {
      geometry: Geometry::Point(geo_types::point! { x: 1.0, y: 2.0 }),
      popup_text: "popup".to_string(),
      id: 1,
    };
    let json = serde_json::to_value(feature.to_feature_collection()).unwrap();

    assert_eq!(json["type"], "FeatureCollection");
    assert_eq!(json["features"][0]["id"], 1);
    assert_eq!(json["features"][0]["properties"]["popupContent"], "popup");
    assert_eq!(json["features"][0]["geometry"]["coordinates"][1], 2.0);
  }
}
