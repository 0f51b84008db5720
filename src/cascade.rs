//! The administrative hierarchy: voivodeship → county → commune → region.

use std::{fmt::Display, sync::Arc};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
  error::{CascadeError, NetworkError},
  registry::{RegistryClient, RegistryRequest},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdminLevel {
  Voivodeship,
  County,
  Commune,
  Region,
}

impl AdminLevel {
  pub const ALL: [AdminLevel; 4] = [
    AdminLevel::Voivodeship,
    AdminLevel::County,
    AdminLevel::Commune,
    AdminLevel::Region,
  ];

  #[must_use]
  pub fn index(self) -> usize {
    match self {
      AdminLevel::Voivodeship => 0,
      AdminLevel::County => 1,
      AdminLevel::Commune => 2,
      AdminLevel::Region => 3,
    }
  }

  #[must_use]
  pub fn parent(self) -> Option<Self> {
    self.index().checked_sub(1).map(|i| Self::ALL[i])
  }

  #[must_use]
  pub fn child(self) -> Option<Self> {
    Self::ALL.get(self.index() + 1).copied()
  }

  /// Name of the field the registry uses for this level's display name.
  #[must_use]
  pub fn result_field(self) -> &'static str {
    match self {
      AdminLevel::Voivodeship => "voivodeship",
      AdminLevel::County => "county",
      AdminLevel::Commune => "commune",
      AdminLevel::Region => "region",
    }
  }

  #[must_use]
  pub fn name(self) -> &'static str {
    match self {
      AdminLevel::Voivodeship => "Voivodeship",
      AdminLevel::County => "County",
      AdminLevel::Commune => "Commune",
      AdminLevel::Region => "Region",
    }
  }
}

impl Display for AdminLevel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.name())
  }
}

/// One entry of an administrative level, e.g. `0663` / `Lublin`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdministrativeUnit {
  pub name: String,
  /// Hierarchical teryt code.
  pub code: String,
}

impl AdministrativeUnit {
  pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      code: code.into(),
      name: name.into(),
    }
  }
}

impl Display for AdministrativeUnit {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} ({})", self.name, self.code)
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct LevelState {
  candidates: Vec<AdministrativeUnit>,
  selected: Option<AdministrativeUnit>,
}

/// Selections and candidate lists of all levels.
///
/// Changing a level always empties every level below it, so a selection is always a child
/// of the selection above.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CascadeState {
  levels: [LevelState; 4],
}

impl CascadeState {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn candidates(&self, level: AdminLevel) -> &[AdministrativeUnit] {
    &self.levels[level.index()].candidates
  }

  #[must_use]
  pub fn selected(&self, level: AdminLevel) -> Option<&AdministrativeUnit> {
    self.levels[level.index()].selected.as_ref()
  }

  /// Installs a freshly fetched candidate list; the level's selection and everything below
  /// is cleared.
  pub fn set_candidates(&mut self, level: AdminLevel, units: Vec<AdministrativeUnit>) {
    self.clear(level);
    self.levels[level.index()].candidates = units;
  }

  /// Selects the candidate with `code` and clears all levels below.
  ///
  /// # Errors
  ///
  /// If the parent level has no selection or `code` is not among the candidates.
  pub fn select(
    &mut self,
    level: AdminLevel,
    code: &str,
  ) -> Result<&AdministrativeUnit, CascadeError> {
    if let Some(parent) = level.parent()
      && self.selected(parent).is_none()
    {
      return Err(CascadeError::ParentNotSelected { level, parent });
    }

    let unit = self
      .candidates(level)
      .iter()
      .find(|u| u.code == code)
      .cloned()
      .ok_or_else(|| CascadeError::UnknownUnit {
        level,
        code: code.to_string(),
      })?;

    self.clear_below(level);
    debug!("Selected {level} {unit}");
    Ok(self.levels[level.index()].selected.insert(unit))
  }

  /// Clears the selection of `level` and empties all levels below.
  pub fn clear(&mut self, level: AdminLevel) {
    self.levels[level.index()].selected = None;
    self.clear_below(level);
  }

  fn clear_below(&mut self, level: AdminLevel) {
    for below in &mut self.levels[level.index() + 1..] {
      *below = LevelState::default();
    }
  }

  /// Teryt of the selected region, the prefix of every parcel identifier in it.
  #[must_use]
  pub fn region_code(&self) -> Option<&str> {
    self.selected(AdminLevel::Region).map(|u| u.code.as_str())
  }
}

/// Fetches the children of an administrative unit.
#[derive(Clone)]
pub struct AdministrativeResolver {
  registry: Arc<RegistryClient>,
}

impl AdministrativeResolver {
  #[must_use]
  pub fn new(registry: Arc<RegistryClient>) -> Self {
    Self { registry }
  }

  /// Units of `level` below `parent_code`; an empty code lists the voivodeships.
  /// A registry answer without records yields an empty list.
  ///
  /// # Errors
  ///
  /// [`NetworkError`] from the registry.
  pub async fn list_children(
    &self,
    level: AdminLevel,
    parent_code: &str,
  ) -> Result<Vec<AdministrativeUnit>, NetworkError> {
    let response = self
      .registry
      .query(&RegistryRequest::Units {
        level,
        parent: parent_code.to_string(),
      })
      .await?;
    Ok(response.units())
  }
}
