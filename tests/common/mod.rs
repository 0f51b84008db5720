#![allow(dead_code)]

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

use geojson::{Feature, FeatureCollection};
use parcelvas::{
  NetworkError,
  coordinates::{BoundingBox, WGS84Coordinate},
  overlay::{ClickHandler, LayerId, MapWidget},
  registry::{RegistryClient, Transport},
};
use tokio::sync::Notify;

pub fn init_logging() {
  let _ = env_logger::builder().is_test(true).try_init();
}

struct Route {
  fragment: String,
  body: Result<String, NetworkError>,
  gate: Mutex<Option<Arc<Notify>>>,
}

/// Serves canned bodies by url fragment. The first request of a gated route waits until the
/// gate is notified; later ones are answered at once.
#[derive(Default)]
pub struct ScriptedTransport {
  routes: Vec<Route>,
  requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
  pub fn with(mut self, fragment: &str, body: &str) -> Self {
    self.routes.push(Route {
      fragment: fragment.to_string(),
      body: Ok(body.to_string()),
      gate: Mutex::new(None),
    });
    self
  }

  pub fn gated(mut self, fragment: &str, body: &str, gate: Arc<Notify>) -> Self {
    self.routes.push(Route {
      fragment: fragment.to_string(),
      body: Ok(body.to_string()),
      gate: Mutex::new(Some(gate)),
    });
    self
  }

  pub fn failing(mut self, fragment: &str, reason: &str) -> Self {
    self.routes.push(Route {
      fragment: fragment.to_string(),
      body: Err(NetworkError::new(reason)),
      gate: Mutex::new(None),
    });
    self
  }

  pub fn requests(&self) -> Vec<String> {
    self.requests.lock().unwrap().clone()
  }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
  async fn get(&self, url: &str) -> Result<String, NetworkError> {
    self.requests.lock().unwrap().push(url.to_string());
    let Some(route) = self.routes.iter().find(|r| url.contains(&r.fragment)) else {
      return Err(NetworkError::new(format!("HTTP 404 for {url}")));
    };
    let gate = route.gate.lock().unwrap().take();
    if let Some(gate) = gate {
      gate.notified().await;
    }
    route.body.clone()
  }
}

pub fn registry(transport: Arc<ScriptedTransport>) -> Arc<RegistryClient> {
  Arc::new(RegistryClient::new("https://uldk.example/", transport))
}

#[derive(Default)]
pub struct MapRecord {
  pub layers: Vec<String>,
  pub features: HashMap<LayerId, Vec<Feature>>,
  pub fitted: Vec<BoundingBox>,
  pub click_handlers: Vec<Arc<dyn Fn(WGS84Coordinate) + Send + Sync>>,
}

/// A map widget that records what it is asked to do. Clones share the record.
#[derive(Clone, Default)]
pub struct RecordingMap(pub Arc<Mutex<MapRecord>>);

impl RecordingMap {
  pub fn click(&self, position: WGS84Coordinate) {
    let handlers = self.0.lock().unwrap().click_handlers.clone();
    for handler in handlers {
      handler(position);
    }
  }

  pub fn shown_features(&self) -> Vec<Feature> {
    self
      .0
      .lock()
      .unwrap()
      .features
      .values()
      .flatten()
      .cloned()
      .collect()
  }
}

impl MapWidget for RecordingMap {
  fn add_layer(&mut self, name: &str) -> LayerId {
    let mut record = self.0.lock().unwrap();
    record.layers.push(name.to_string());
    record.layers.len() as LayerId
  }

  fn clear_layer(&mut self, layer: LayerId) {
    self.0.lock().unwrap().features.remove(&layer);
  }

  fn add_features(&mut self, layer: LayerId, features: FeatureCollection) {
    self
      .0
      .lock()
      .unwrap()
      .features
      .entry(layer)
      .or_default()
      .extend(features.features);
  }

  fn fit_bounds(&mut self, bounds: BoundingBox) {
    self.0.lock().unwrap().fitted.push(bounds);
  }

  fn on_click(&mut self, handler: ClickHandler) {
    self.0.lock().unwrap().click_handlers.push(Arc::from(handler));
  }
}
