use geojson::FeatureCollection;
use log::{debug, warn};

use crate::{
  coordinates::{BoundingBox, WGS84Coordinate},
  locator::GeometryFeature,
};

/// Handle of a layer created by the map widget.
pub type LayerId = u64;

/// Called by the map for every click with the clicked geographic position.
pub type ClickHandler = Box<dyn Fn(WGS84Coordinate) + Send + Sync>;

/// The parts of the hosting map widget the pipeline uses.
pub trait MapWidget: Send {
  fn add_layer(&mut self, name: &str) -> LayerId;
  /// Removes everything drawn on the layer; the layer itself stays.
  fn clear_layer(&mut self, layer: LayerId);
  fn add_features(&mut self, layer: LayerId, features: FeatureCollection);
  fn fit_bounds(&mut self, bounds: BoundingBox);
  /// Registers a handler for the lifetime of the map.
  fn on_click(&mut self, handler: ClickHandler);
}

pub const OVERLAY_LAYER_NAME: &str = "parcels";

/// The single layer showing the located parcel.
#[derive(Debug, Default)]
pub struct MapOverlay {
  layer: Option<LayerId>,
  displayed: Option<GeometryFeature>,
}

impl MapOverlay {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates the layer on first use.
  pub fn ensure_layer(&mut self, map: &mut dyn MapWidget) -> LayerId {
    *self.layer.get_or_insert_with(|| {
      let layer = map.add_layer(OVERLAY_LAYER_NAME);
      debug!("Created overlay layer {layer}");
      layer
    })
  }

  /// Replaces whatever is displayed with `feature` and fits the view to it.
  pub fn show_feature(&mut self, map: &mut dyn MapWidget, feature: GeometryFeature) {
    let layer = self.ensure_layer(map);
    map.clear_layer(layer);
    map.add_features(layer, feature.to_feature_collection());

    let bounds = feature.bounds();
    if bounds.is_valid() {
      map.fit_bounds(bounds);
    } else {
      warn!("Feature {} has no extent, keeping the view", feature.id);
    }
    self.displayed = Some(feature);
  }

  #[must_use]
  pub fn layer(&self) -> Option<LayerId> {
    self.layer
  }

  #[must_use]
  pub fn displayed(&self) -> Option<&GeometryFeature> {
    self.displayed.as_ref()
  }
}
