//! The controller behind the parcel search panel.
//!
//! It owns the cascade selections and the map overlay, and is shared (`Arc`) between the
//! form, which awaits its lookups, and the map's click handler, which spawns them.

use std::sync::{
  Arc, Mutex, MutexGuard, PoisonError,
  mpsc::{Receiver, Sender},
};

use log::{debug, info, warn};
use tokio::runtime::Handle;

use crate::{
  cascade::{AdminLevel, AdministrativeResolver, AdministrativeUnit, CascadeState},
  config::Config,
  coordinates::WGS84Coordinate,
  error::{CascadeError, LookupError, NetworkError},
  locator::{GeometryFeature, ParcelLocator, ParcelQuery},
  lookup::{LookupGuard, LookupTracker, Surface},
  overlay::{MapOverlay, MapWidget},
  registry::RegistryClient,
};

/// Result of a lookup that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
  /// The feature now shown on the map.
  Displayed(GeometryFeature),
  /// A newer lookup from the same surface was started; nothing was changed.
  Superseded,
}

/// Outcomes of lookups nobody awaits, i.e. the ones started by map clicks.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
  Displayed {
    surface: Surface,
    feature: GeometryFeature,
  },
  NoResults {
    surface: Surface,
  },
  Failed {
    surface: Surface,
    error: LookupError,
  },
}

struct PanelState {
  cascade: CascadeState,
  /// Number of candidate fetches started per level; only the newest may install its list.
  fetches: [u64; 4],
  overlay: MapOverlay,
  map: Box<dyn MapWidget>,
  click_bound: bool,
}

impl PanelState {
  /// Starts a candidate fetch for `level`, superseding older ones of the level and below.
  fn begin_fetch(&mut self, level: AdminLevel) -> u64 {
    for fetch in &mut self.fetches[level.index()..] {
      *fetch += 1;
    }
    self.fetches[level.index()]
  }
}

pub struct ParcelPanel {
  resolver: AdministrativeResolver,
  locator: ParcelLocator,
  tracker: Arc<LookupTracker>,
  state: Mutex<PanelState>,
  events: Sender<PanelEvent>,
}

impl ParcelPanel {
  /// A panel talking HTTP to the configured registry.
  ///
  /// # Errors
  ///
  /// If the HTTP client cannot be set up.
  pub fn new(
    config: &Config,
    map: Box<dyn MapWidget>,
  ) -> Result<(Arc<Self>, Receiver<PanelEvent>), NetworkError> {
    let registry = Arc::new(RegistryClient::from_config(config)?);
    Ok(Self::with_registry(registry, map))
  }

  #[must_use]
  pub fn with_registry(
    registry: Arc<RegistryClient>,
    map: Box<dyn MapWidget>,
  ) -> (Arc<Self>, Receiver<PanelEvent>) {
    let (events, receiver) = std::sync::mpsc::channel();
    let panel = Self {
      resolver: AdministrativeResolver::new(registry.clone()),
      locator: ParcelLocator::new(registry),
      tracker: Arc::new(LookupTracker::new()),
      state: Mutex::new(PanelState {
        cascade: CascadeState::new(),
        fetches: [0; 4],
        overlay: MapOverlay::new(),
        map,
        click_bound: false,
      }),
      events,
    };
    (Arc::new(panel), receiver)
  }

  fn state(&self) -> MutexGuard<'_, PanelState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Installs `units` as candidates of `level` unless a newer fetch for the level was started.
  fn install_candidates(
    &self,
    level: AdminLevel,
    fetch: u64,
    units: &[AdministrativeUnit],
  ) -> bool {
    let mut state = self.state();
    if state.fetches[level.index()] != fetch {
      return false;
    }
    state.cascade.set_candidates(level, units.to_vec());
    true
  }

  /// Fetches the top level of the hierarchy and resets every selection.
  ///
  /// # Errors
  ///
  /// Network errors of the registry.
  pub async fn load_voivodeships(&self) -> Result<Vec<AdministrativeUnit>, CascadeError> {
    let fetch = self.state().begin_fetch(AdminLevel::Voivodeship);
    let units = self
      .resolver
      .list_children(AdminLevel::Voivodeship, "")
      .await?;
    if !self.install_candidates(AdminLevel::Voivodeship, fetch, &units) {
      debug!("Dropping voivodeship list, a newer one was requested");
    }
    Ok(units)
  }

  /// Selects a unit, clears everything below it and loads the candidates of the next level.
  ///
  /// Children that arrive after the selection changed again, or after a newer fetch for the
  /// same level was started, are dropped.
  ///
  /// # Errors
  ///
  /// Invalid selections and network errors.
  pub async fn select_unit(
    &self,
    level: AdminLevel,
    code: &str,
  ) -> Result<Vec<AdministrativeUnit>, CascadeError> {
    let fetch = {
      let mut state = self.state();
      state.cascade.select(level, code)?;
      level.child().map(|child| (child, state.begin_fetch(child)))
    };

    let Some((child, fetch)) = fetch else {
      return Ok(vec![]);
    };
    let units = self.resolver.list_children(child, code).await?;

    if !self.install_candidates(child, fetch, &units) {
      debug!("Dropping {child} list of {code}, a newer one was requested");
    }
    Ok(units)
  }

  /// Clears the selection of `level` and everything below; pending child fetches are dropped.
  pub fn clear_unit(&self, level: AdminLevel) {
    let mut state = self.state();
    state.cascade.clear(level);
    if let Some(child) = level.child() {
      state.begin_fetch(child);
    }
  }

  /// A snapshot of the selections and candidate lists.
  #[must_use]
  pub fn cascade(&self) -> CascadeState {
    self.state().cascade.clone()
  }

  /// Looks up `number` in the selected region.
  ///
  /// # Errors
  ///
  /// [`LookupError::InvalidQuery`] without a selected region, otherwise see
  /// [`ParcelLocator::locate`].
  pub async fn find_by_region_and_number(
    &self,
    number: &str,
  ) -> Result<LookupOutcome, LookupError> {
    let region = self
      .state()
      .cascade
      .region_code()
      .map(str::to_string)
      .unwrap_or_default();
    let query = ParcelQuery::ByRegionAndNumber {
      region,
      number: number.to_string(),
    };
    self.lookup(Surface::Form, query).await
  }

  /// # Errors
  ///
  /// See [`ParcelLocator::locate`].
  pub async fn find_by_whole_id(&self, id: &str) -> Result<LookupOutcome, LookupError> {
    self
      .lookup(Surface::Form, ParcelQuery::ByWholeId(id.to_string()))
      .await
  }

  /// The lookup behind a map click.
  ///
  /// # Errors
  ///
  /// See [`ParcelLocator::locate`].
  pub async fn find_at(&self, position: WGS84Coordinate) -> Result<LookupOutcome, LookupError> {
    self
      .lookup(Surface::Click, ParcelQuery::ByCoordinates(position))
      .await
  }

  async fn lookup(
    &self,
    surface: Surface,
    query: ParcelQuery,
  ) -> Result<LookupOutcome, LookupError> {
    let guard = LookupGuard::new(self.tracker.clone(), surface);
    let result = self.locator.locate(&query).await;

    let mut state = self.state();
    if !guard.is_current() {
      debug!(
        "Discarding result of {query} after {:?}, a newer lookup was started",
        guard.ticket().elapsed()
      );
      return Ok(LookupOutcome::Superseded);
    }

    let feature = result?;
    let PanelState { overlay, map, .. } = &mut *state;
    overlay.show_feature(map.as_mut(), feature.clone());
    info!("Showing {query}");
    Ok(LookupOutcome::Displayed(feature))
  }

  /// Registers the click lookup on the map. Later calls do nothing; the handler stays for
  /// the lifetime of the map.
  pub fn bind_click_lookup(self: &Arc<Self>, runtime: Handle) {
    let mut state = self.state();
    if state.click_bound {
      debug!("Click lookup already bound");
      return;
    }
    state.click_bound = true;

    let PanelState { overlay, map, .. } = &mut *state;
    overlay.ensure_layer(map.as_mut());

    let panel = Arc::downgrade(self);
    map.on_click(Box::new(move |position| {
      let Some(panel) = panel.upgrade() else {
        return;
      };
      runtime.spawn(async move { panel.click_lookup(position).await });
    }));
  }

  async fn click_lookup(&self, position: WGS84Coordinate) {
    let surface = Surface::Click;
    let event = match self.find_at(position).await {
      Ok(LookupOutcome::Displayed(feature)) => PanelEvent::Displayed { surface, feature },
      Ok(LookupOutcome::Superseded) => return,
      Err(LookupError::NotFound) => PanelEvent::NoResults { surface },
      Err(error) => {
        warn!("Click lookup failed: {error}");
        PanelEvent::Failed { surface, error }
      }
    };
    if self.events.send(event).is_err() {
      debug!("Nobody listens for panel events");
    }
  }

  /// Makes every outstanding lookup of `surface` a no-op when it completes.
  pub fn cancel(&self, surface: Surface) {
    self.tracker.cancel(surface);
  }

  #[must_use]
  pub fn pending_lookups(&self, surface: Surface) -> usize {
    self.tracker.in_flight(surface)
  }

  #[must_use]
  pub fn displayed(&self) -> Option<GeometryFeature> {
    self.state().overlay.displayed().cloned()
  }
}
