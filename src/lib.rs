/// The voivodeship → county → commune → region hierarchy.
pub mod cascade;
/// Registry connection settings.
pub mod config;
/// Geographic positions and bounding boxes.
pub mod coordinates;
pub mod error;
/// Finding a parcel by identifier or position.
pub mod locator;
pub mod lookup;
/// The map layer showing the located parcel.
pub mod overlay;
pub mod panel;
/// Requests to the land-registry lookup service.
pub mod registry;
/// WKT parsing and writing.
pub mod wkt;

pub use error::{CascadeError, LookupError, MalformedGeometry, NetworkError};
pub use panel::{LookupOutcome, PanelEvent, ParcelPanel};
