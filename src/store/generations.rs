//! Generation naming for the current deployed version.

use serde::{Deserialize, Serialize};

/// Logical role of a cache generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  /// Assets precached at install time from the manifest
  Static,
  /// Responses stored opportunistically at runtime
  Dynamic,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::Static => "static",
      Role::Dynamic => "dynamic",
    }
  }
}

/// The current static and dynamic generation names for a deployed version.
///
/// Names encode role + version ("static-v3"). A redeploy gets a fresh pair of
/// names; anything else in the store is stale and eligible for the activation
/// GC sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSet {
  version: String,
  statik: String,
  dynamic: String,
}

impl GenerationSet {
  pub fn new(version: &str) -> Self {
    Self {
      version: version.to_string(),
      statik: format!("{}-{}", Role::Static.as_str(), version),
      dynamic: format!("{}-{}", Role::Dynamic.as_str(), version),
    }
  }

  /// The deploy version both names are derived from.
  pub fn version(&self) -> &str {
    &self.version
  }

  /// Name of the current static generation.
  pub fn static_name(&self) -> &str {
    &self.statik
  }

  /// Name of the current dynamic generation.
  pub fn dynamic_name(&self) -> &str {
    &self.dynamic
  }

  /// Whether a generation name belongs to this version.
  pub fn is_current(&self, name: &str) -> bool {
    name == self.statik || name == self.dynamic
  }

  /// Lookup order for cache reads: dynamic first, then static.
  pub fn lookup_order(&self) -> [&str; 2] {
    [&self.dynamic, &self.statik]
  }
}
