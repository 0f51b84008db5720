//! Conversion between (E)WKT text and structured geometries.
//!
//! The registry answers with EWKT (`SRID=4326;POLYGON((...))`); the prefix is accepted and
//! dropped. Parsing is strict: anything that is not a complete geometry is rejected.

use geo_types::{
  Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
  Point, Polygon,
};
use log::debug;

use crate::error::MalformedGeometry;

/// Deepest `GEOMETRYCOLLECTION` nesting accepted.
const MAX_NESTING: usize = 32;

/// Parses WKT or EWKT into a geometry.
///
/// # Errors
///
/// [`MalformedGeometry`] for empty, truncated or unknown input.
pub fn parse(input: &str) -> Result<Geometry<f64>, MalformedGeometry> {
  let mut reader = WktReader::new(strip_srid(input));
  let geometry = reader.geometry()?;
  reader.skip_whitespace();
  if !reader.at_end() {
    return Err(reader.error("unexpected trailing characters"));
  }
  Ok(geometry)
}

/// Parses WKT and converts the result to a `GeoJSON` geometry.
///
/// # Errors
///
/// See [`parse`].
pub fn to_geojson(input: &str) -> Result<geojson::Geometry, MalformedGeometry> {
  parse(input).map(|g| geojson_geometry(&g))
}

#[must_use]
pub fn geojson_geometry(geometry: &Geometry<f64>) -> geojson::Geometry {
  geojson::Geometry::new(geojson::Value::from(geometry))
}

fn strip_srid(input: &str) -> &str {
  let trimmed = input.trim();
  match trimmed.split_once(';') {
    Some((prefix, rest)) if prefix.trim().to_ascii_uppercase().starts_with("SRID=") => {
      debug!("Dropping EWKT prefix {prefix}");
      rest
    }
    _ => trimmed,
  }
}

struct WktReader<'a> {
  input: &'a str,
  pos: usize,
  depth: usize,
}

impl<'a> WktReader<'a> {
  fn new(input: &'a str) -> Self {
    Self {
      input,
      pos: 0,
      depth: 0,
    }
  }

  fn error(&self, reason: &str) -> MalformedGeometry {
    MalformedGeometry::new(self.pos, reason)
  }

  fn rest(&self) -> &'a str {
    &self.input[self.pos..]
  }

  fn at_end(&self) -> bool {
    self.pos >= self.input.len()
  }

  fn skip_whitespace(&mut self) {
    let rest = self.rest();
    self.pos += rest.len() - rest.trim_start().len();
  }

  fn peek(&mut self) -> Option<char> {
    self.skip_whitespace();
    self.rest().chars().next()
  }

  fn eat(&mut self, expected: char) -> bool {
    if self.peek() == Some(expected) {
      self.pos += expected.len_utf8();
      true
    } else {
      false
    }
  }

  fn expect(&mut self, expected: char) -> Result<(), MalformedGeometry> {
    if self.eat(expected) {
      Ok(())
    } else if self.at_end() {
      Err(self.error(&format!("input ends where '{expected}' was expected")))
    } else {
      Err(self.error(&format!("expected '{expected}'")))
    }
  }

  fn word(&mut self) -> String {
    self.skip_whitespace();
    let len = self
      .rest()
      .find(|c: char| !c.is_ascii_alphabetic())
      .unwrap_or(self.rest().len());
    let word = self.rest()[..len].to_ascii_uppercase();
    self.pos += len;
    word
  }

  fn geometry(&mut self) -> Result<Geometry<f64>, MalformedGeometry> {
    let start = self.pos;
    let keyword = self.word();
    if keyword.is_empty() {
      return Err(if self.at_end() {
        self.error("empty input")
      } else {
        self.error("expected a geometry keyword")
      });
    }

    self.dimension_tag(start)?;

    match keyword.as_str() {
      "POINT" => Ok(Point(self.single_coord()?).into()),
      "LINESTRING" => Ok(LineString(self.coord_list()?).into()),
      "POLYGON" => Ok(self.polygon()?.into()),
      "MULTIPOINT" => Ok(MultiPoint(self.multi_point()?).into()),
      "MULTILINESTRING" => {
        let lines = self.list(|r| r.coord_list().map(LineString))?;
        Ok(MultiLineString(lines).into())
      }
      "MULTIPOLYGON" => Ok(MultiPolygon(self.list(Self::polygon)?).into()),
      "GEOMETRYCOLLECTION" => {
        if self.depth >= MAX_NESTING {
          return Err(MalformedGeometry::new(start, "geometry collections nested too deeply"));
        }
        self.depth += 1;
        let members = self.list(Self::geometry);
        self.depth -= 1;
        Ok(Geometry::GeometryCollection(GeometryCollection(members?)))
      }
      other => Err(MalformedGeometry::new(
        start,
        format!("unsupported geometry type {other}"),
      )),
    }
  }

  /// Skips `Z`, `M` or `ZM` and rejects `EMPTY`.
  fn dimension_tag(&mut self, start: usize) -> Result<(), MalformedGeometry> {
    let before = self.pos;
    match self.word().as_str() {
      "" => Ok(()),
      "Z" | "M" | "ZM" => {
        if self.peek() == Some('E') || self.peek() == Some('e') {
          return self.dimension_tag(start);
        }
        Ok(())
      }
      "EMPTY" => Err(MalformedGeometry::new(start, "empty geometry")),
      _ => {
        self.pos = before;
        Err(self.error("unexpected word after geometry type"))
      }
    }
  }

  /// `( <items> )` with items separated by commas.
  fn list<T>(
    &mut self,
    mut item: impl FnMut(&mut Self) -> Result<T, MalformedGeometry>,
  ) -> Result<Vec<T>, MalformedGeometry> {
    self.expect('(')?;
    let mut items = vec![item(self)?];
    while self.eat(',') {
      items.push(item(self)?);
    }
    self.expect(')')?;
    Ok(items)
  }

  fn single_coord(&mut self) -> Result<Coord<f64>, MalformedGeometry> {
    self.expect('(')?;
    let coord = self.coord()?;
    self.expect(')')?;
    Ok(coord)
  }

  fn coord_list(&mut self) -> Result<Vec<Coord<f64>>, MalformedGeometry> {
    self.list(Self::coord)
  }

  fn polygon(&mut self) -> Result<Polygon<f64>, MalformedGeometry> {
    let mut rings = self.list(|r| r.coord_list().map(LineString))?.into_iter();
    let exterior = rings.next().unwrap_or_else(|| LineString(vec![]));
    Ok(Polygon::new(exterior, rings.collect()))
  }

  /// Accepts both `MULTIPOINT(1 2, 3 4)` and `MULTIPOINT((1 2), (3 4))`.
  fn multi_point(&mut self) -> Result<Vec<Point<f64>>, MalformedGeometry> {
    self.list(|r| {
      if r.peek() == Some('(') {
        r.single_coord().map(Point)
      } else {
        r.coord().map(Point)
      }
    })
  }

  /// Two to four ordinates; only x and y are kept.
  fn coord(&mut self) -> Result<Coord<f64>, MalformedGeometry> {
    let x = self.number()?;
    let y = self.number()?;
    for _ in 0..2 {
      if matches!(self.peek(), Some(c) if starts_number(c)) {
        self.number()?;
      }
    }
    Ok(Coord { x, y })
  }

  fn number(&mut self) -> Result<f64, MalformedGeometry> {
    self.skip_whitespace();
    let len = self
      .rest()
      .find(|c: char| !(starts_number(c) || c == 'e' || c == 'E'))
      .unwrap_or(self.rest().len());
    if len == 0 {
      return Err(if self.at_end() {
        self.error("input ends where a number was expected")
      } else {
        self.error("expected a number")
      });
    }
    let text = &self.rest()[..len];
    let value = text
      .parse::<f64>()
      .ok()
      .filter(|v| v.is_finite())
      .ok_or_else(|| self.error(&format!("invalid number {text}")))?;
    self.pos += len;
    Ok(value)
  }
}

fn starts_number(c: char) -> bool {
  c.is_ascii_digit() || c == '-' || c == '+' || c == '.'
}

/// Writes a geometry as WKT; the inverse of [`parse`] for the supported types.
#[must_use]
pub fn to_wkt(geometry: &Geometry<f64>) -> String {
  let mut out = String::new();
  write_geometry(&mut out, geometry);
  out
}

fn write_geometry(out: &mut String, geometry: &Geometry<f64>) {
  match geometry {
    Geometry::Point(p) => {
      out.push_str("POINT(");
      write_coord(out, p.0);
      out.push(')');
    }
    Geometry::Line(l) => {
      out.push_str("LINESTRING");
      write_coords(out, &[l.start, l.end]);
    }
    Geometry::LineString(ls) => {
      out.push_str("LINESTRING");
      write_coords(out, &ls.0);
    }
    Geometry::Polygon(p) => {
      out.push_str("POLYGON");
      write_polygon(out, p);
    }
    Geometry::MultiPoint(mp) => {
      out.push_str("MULTIPOINT");
      let coords: Vec<_> = mp.0.iter().map(|p| p.0).collect();
      write_coords(out, &coords);
    }
    Geometry::MultiLineString(mls) => {
      out.push_str("MULTILINESTRING");
      write_joined(out, &mls.0, |out, ls| write_coords(out, &ls.0));
    }
    Geometry::MultiPolygon(mp) => {
      out.push_str("MULTIPOLYGON");
      write_joined(out, &mp.0, write_polygon);
    }
    Geometry::GeometryCollection(gc) => {
      out.push_str("GEOMETRYCOLLECTION");
      write_joined(out, &gc.0, write_geometry);
    }
    Geometry::Rect(r) => write_geometry(out, &Geometry::Polygon(r.to_polygon())),
    Geometry::Triangle(t) => write_geometry(out, &Geometry::Polygon(t.to_polygon())),
  }
}

fn write_polygon(out: &mut String, polygon: &Polygon<f64>) {
  let rings: Vec<_> = std::iter::once(polygon.exterior())
    .chain(polygon.interiors())
    .collect();
  write_joined(out, &rings, |out, ring| write_coords(out, &ring.0));
}

fn write_joined<T>(out: &mut String, items: &[T], mut write: impl FnMut(&mut String, &T)) {
  out.push('(');
  for (i, item) in items.iter().enumerate() {
    if i > 0 {
      out.push(',');
    }
    write(out, item);
  }
  out.push(')');
}

fn write_coords(out: &mut String, coords: &[Coord<f64>]) {
  write_joined(out, coords, |out, c| write_coord(out, *c));
}

fn write_coord(out: &mut String, c: Coord<f64>) {
  out.push_str(&format!("{} {}", c.x, c.y));
}
