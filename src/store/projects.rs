use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// Mapping from project name to accumulated hours. This is exactly what ends up on the disk:
/// a json object like `{ "Thesis": 0.025 }`. Names are kept sorted so that rewrites of the file
/// produce stable output.
#[derive(PartialEq, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Projects(BTreeMap<String, f64>);

impl Projects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hours(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, hours)| (name.as_str(), *hours))
    }

    /// Project selected by default when nothing was picked yet.
    pub fn first(&self) -> Option<&str> {
        self.names().next()
    }

    /// Inserts a new project with no time on it.
    pub fn insert_new(&mut self, name: &str) -> Result<(), TrackerError> {
        let name = validate_name(name)?;
        if self.0.contains_key(name) {
            return Err(TrackerError::DuplicateProject(name.to_owned()));
        }
        self.0.insert(name.to_owned(), 0.);
        Ok(())
    }

    /// Adds hours to an existing project. Accumulation is strictly additive, so negative values
    /// are ignored.
    pub fn add_hours(&mut self, name: &str, hours: f64) -> Result<f64, TrackerError> {
        let value = self
            .0
            .get_mut(name)
            .ok_or_else(|| TrackerError::UnknownProject(name.to_owned()))?;
        if hours > 0. {
            *value += hours;
        }
        Ok(*value)
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<f64> {
        self.0.remove(name)
    }

    /// Resets hours the tracker could never have produced (negative or non-finite) to zero and
    /// returns the affected names. Every other project is kept as is.
    pub fn repair(&mut self) -> Vec<String> {
        let mut repaired = vec![];
        for (name, hours) in self.0.iter_mut() {
            if !hours.is_finite() || *hours < 0. {
                *hours = 0.;
                repaired.push(name.clone());
            }
        }
        repaired
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Projects {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

pub fn validate_name(name: &str) -> Result<&str, TrackerError> {
    let name = name.trim();
    if name.is_empty() {
        Err(TrackerError::InvalidProjectName)
    } else {
        Ok(name)
    }
}
