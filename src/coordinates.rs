use geo_types::{Coord, Geometry};
use serde::{Deserialize, Serialize};

/// A geographic position as delivered by a map click.
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct WGS84Coordinate {
  pub lat: f64,
  pub lon: f64,
}

impl WGS84Coordinate {
  #[must_use]
  pub fn new(lat: f64, lon: f64) -> Self {
    Self { lat, lon }
  }

  #[must_use]
  pub fn is_valid(&self) -> bool {
    (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
  }
}

/// Axis aligned bounds in the coordinate space of the geometry (x = longitude, y = latitude
/// for the registry's EPSG:4326 output).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
  max_x: f64,
  min_x: f64,
  max_y: f64,
  min_y: f64,
}

impl BoundingBox {
  #[must_use]
  pub fn get_invalid() -> Self {
    Self {
      max_x: f64::MIN,
      min_x: f64::MAX,
      max_y: f64::MIN,
      min_y: f64::MAX,
    }
  }

  /// Bounds of every coordinate of the geometry, nested collections included.
  #[must_use]
  pub fn from_geometry(geometry: &Geometry<f64>) -> Self {
    let mut bb = Self::get_invalid();
    bb.add_geometry(geometry);
    bb
  }

  fn add_geometry(&mut self, geometry: &Geometry<f64>) {
    match geometry {
      Geometry::Point(p) => self.add_coordinate(p.0),
      Geometry::Line(l) => {
        self.add_coordinate(l.start);
        self.add_coordinate(l.end);
      }
      Geometry::LineString(ls) => ls.0.iter().for_each(|c| self.add_coordinate(*c)),
      Geometry::Polygon(p) => p.exterior().0.iter().for_each(|c| self.add_coordinate(*c)),
      Geometry::MultiPoint(mp) => mp.0.iter().for_each(|p| self.add_coordinate(p.0)),
      Geometry::MultiLineString(mls) => mls
        .0
        .iter()
        .flat_map(|ls| ls.0.iter())
        .for_each(|c| self.add_coordinate(*c)),
      Geometry::MultiPolygon(mp) => mp
        .0
        .iter()
        .flat_map(|p| p.exterior().0.iter())
        .for_each(|c| self.add_coordinate(*c)),
      Geometry::GeometryCollection(gc) => gc.0.iter().for_each(|g| self.add_geometry(g)),
      Geometry::Rect(r) => {
        self.add_coordinate(r.min());
        self.add_coordinate(r.max());
      }
      Geometry::Triangle(t) => {
        self.add_coordinate(t.v1());
        self.add_coordinate(t.v2());
        self.add_coordinate(t.v3());
      }
    }
  }

  #[must_use]
  pub fn is_valid(&self) -> bool {
    self.min_x <= self.max_x && self.min_y <= self.max_y
  }

  fn add_coordinate(&mut self, c: Coord<f64>) {
    self.min_x = self.min_x.min(c.x);
    self.min_y = self.min_y.min(c.y);
    self.max_x = self.max_x.max(c.x);
    self.max_y = self.max_y.max(c.y);
  }

  /// South-west corner.
  #[must_use]
  pub fn min(&self) -> Coord<f64> {
    Coord {
      x: self.min_x,
      y: self.min_y,
    }
  }

  /// North-east corner.
  #[must_use]
  pub fn max(&self) -> Coord<f64> {
    Coord {
      x: self.max_x,
      y: self.max_y,
    }
  }
}

#[cfg(test)]
mod tests {
  use assert_approx_eq::assert_approx_eq;
  use geo_types::{Point, coord, line_string, polygon};

  use super::*;

  #[test]
  fn bounds_of_polygon() {
    let poly: Geometry<f64> = polygon![
      (x: 22.5, y: 51.2),
      (x: 22.6, y: 51.2),
      (x: 22.6, y: 51.3),
      (x: 22.5, y: 51.3),
    ]
    .into();

    let bb = BoundingBox::from_geometry(&poly);
    assert!(bb.is_valid());
    assert_eq!(bb.min(), coord! { x: 22.5, y: 51.2 });
    assert_eq!(bb.max(), coord! { x: 22.6, y: 51.3 });
    assert_approx_eq!(bb.max().x - bb.min().x, 0.1);
  }

  #[test]
  fn bounds_of_collection_cover_all_members() {
    let gc = Geometry::GeometryCollection(geo_types::GeometryCollection(vec![
      Point::new(0.0, 0.0).into(),
      line_string![(x: 2.0, y: -1.0), (x: 3.0, y: 4.0)].into(),
    ]));

    let bb = BoundingBox::from_geometry(&gc);
    assert_eq!(bb.min(), coord! { x: 0.0, y: -1.0 });
    assert_eq!(bb.max(), coord! { x: 3.0, y: 4.0 });
  }

  #[test]
  fn single_point_and_empty_bounds() {
    let bb = BoundingBox::from_geometry(&Geometry::Point(Point::new(1.0, 1.0)));
    assert!(bb.is_valid());
    assert_eq!(bb.min(), bb.max());

    let empty = Geometry::GeometryCollection(geo_types::GeometryCollection(vec![]));
    assert!(!BoundingBox::from_geometry(&empty).is_valid());
  }

  #[test]
  fn bounds_of_triangle() {
    let triangle = geo_types::Triangle::new(
      coord! { x: 2.0, y: 0.0 },
      coord! { x: -1.0, y: 3.0 },
      coord! { x: 0.5, y: -2.0 },
    );

    let bb = BoundingBox::from_geometry(&Geometry::Triangle(triangle));
    assert_eq!(bb.min(), coord! { x: -1.0, y: -2.0 });
    assert_eq!(bb.max(), coord! { x: 2.0, y: 3.0 });
  }

  #[test]
  fn coordinate_validity() {
    assert!(WGS84Coordinate::new(51.23, 22.49).is_valid());
    assert!(!WGS84Coordinate::new(91.0, 22.49).is_valid());
    assert!(!WGS84Coordinate::new(51.0, -181.0).is_valid());
  }
}
