// src/model/profile.rs

use crate::error::ProfileError;
use crate::model::ResourceType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

const VM_CORE: &str = include_str!("../../resources/acceptance/vm-core.json");
const DB_ORACLE: &str = include_str!("../../resources/acceptance/db-oracle.json");
const DB_MONGO: &str = include_str!("../../resources/acceptance/db-mongo.json");

const RESOURCE_PREFIX: &str = "resource://acceptance/";

/// Thresholds a target must satisfy to pass validation.
///
/// Units differ per field: `fs_max_pct` and `mem_min_free_pct` are
/// percentages in 0..=100, `tablespace_min_free_pct` is a fraction in 0..=1.
/// Absent fields take their defaults and unknown fields are ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptanceProfile {
    pub fs_max_pct: f64,
    pub mem_min_free_pct: f64,
    pub required_services: BTreeSet<String>,
    pub tablespace_min_free_pct: f64,
    pub allowed_states: BTreeSet<i64>,
}

impl Default for AcceptanceProfile {
    fn default() -> Self {
        Self {
            fs_max_pct: 85.0,
            mem_min_free_pct: 10.0,
            required_services: BTreeSet::new(),
            tablespace_min_free_pct: 0.1,
            // PRIMARY, SECONDARY
            allowed_states: BTreeSet::from([1, 2]),
        }
    }
}

impl AcceptanceProfile {
    pub fn from_json(json: &str) -> Result<Self, ProfileError> {
        let profile: Self = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_file(path: &Path) -> Result<Self, ProfileError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Looks up a built-in profile by name, with or without the
    /// `resource://acceptance/` prefix.
    pub fn builtin(name: &str) -> Option<Self> {
        let name = name.strip_prefix(RESOURCE_PREFIX).unwrap_or(name);
        let raw = match name {
            "vm-core" => VM_CORE,
            "db-oracle" => DB_ORACLE,
            "db-mongo" => DB_MONGO,
            _ => return None,
        };
        Self::from_json(raw).ok()
    }

    /// Resolves a profile reference: a built-in name, else a JSON file path.
    /// Without a reference the resource type's built-in profile is used.
    pub fn resolve(
        reference: Option<&str>,
        resource_type: ResourceType,
    ) -> Result<Self, ProfileError> {
        let reference = reference.unwrap_or(resource_type.default_profile());
        match Self::builtin(reference) {
            Some(profile) => Ok(profile),
            None => Self::from_file(Path::new(reference)),
        }
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        check_range("fs_max_pct", self.fs_max_pct, 100.0)?;
        check_range("mem_min_free_pct", self.mem_min_free_pct, 100.0)?;
        check_range("tablespace_min_free_pct", self.tablespace_min_free_pct, 1.0)?;
        Ok(())
    }

    pub fn with_required_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_services = services.into_iter().map(Into::into).collect();
        self
    }
}

fn check_range(field: &'static str, value: f64, max: f64) -> Result<(), ProfileError> {
    if (0.0..=max).contains(&value) {
        Ok(())
    } else {
        Err(ProfileError::OutOfRange {
            field,
            value,
            min: 0.0,
            max,
        })
    }
}
