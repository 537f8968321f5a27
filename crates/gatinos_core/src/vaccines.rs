//! Vaccine catalog.
//!
//! # Responsibility
//! - Load the vaccine catalog from YAML (built-in or configured file).
//! - Resolve catalog choice names to effect durations.
//!
//! # Invariants
//! - Choice order follows file order.
//! - Choice names are the uppercased vaccine names and are unique.
//! - Effect days are `years * 365 + months * 31 + days`.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const BUILTIN_CATALOG: &str = include_str!("vaccines.yml");
const DAYS_PER_YEAR: u32 = 365;
const DAYS_PER_MONTH: u32 = 31;

#[derive(Debug)]
pub enum CatalogError {
    Io { path: PathBuf, source: std::io::Error },
    Yaml(serde_yaml::Error),
    InvalidEntry(String),
    DuplicateChoice(String),
    UnknownVaccine(String),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(
                f,
                "failed to read vaccine catalog `{}`: {source}",
                path.display()
            ),
            Self::Yaml(err) => write!(f, "invalid vaccine catalog: {err}"),
            Self::InvalidEntry(message) => write!(f, "invalid vaccine catalog entry: {message}"),
            Self::DuplicateChoice(choice) => {
                write!(f, "vaccine catalog lists `{choice}` more than once")
            }
            Self::UnknownVaccine(choice) => write!(f, "unknown vaccine: {choice}"),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Yaml(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawVaccine {
    efecto: Option<[u32; 3]>,
    observaciones: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vaccine {
    /// Position in the catalog file.
    pub index: usize,
    pub name: String,
    pub choice_name: String,
    pub effect_days: u32,
    pub notes: String,
}

impl Vaccine {
    pub fn effect(&self) -> Duration {
        Duration::days(i64::from(self.effect_days))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaccineCatalog {
    vaccines: Vec<Vaccine>,
}

impl VaccineCatalog {
    /// Catalog shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml_str(BUILTIN_CATALOG)
    }

    /// Loads `path` when given, the built-in catalog otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_yaml_str(&raw)
            }
            None => Self::builtin(),
        }
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, CatalogError> {
        let mapping: Mapping = serde_yaml::from_str(raw).map_err(CatalogError::Yaml)?;
        let mut vaccines: Vec<Vaccine> = Vec::with_capacity(mapping.len());

        for (index, (key, value)) in mapping.into_iter().enumerate() {
            let name = match key {
                Value::String(name) if !name.trim().is_empty() => name.trim().to_string(),
                other => {
                    return Err(CatalogError::InvalidEntry(format!(
                        "vaccine name must be a non-empty string, got {other:?}"
                    )))
                }
            };
            let raw_vaccine = if value.is_null() {
                RawVaccine::default()
            } else {
                serde_yaml::from_value::<RawVaccine>(value).map_err(CatalogError::Yaml)?
            };

            let choice_name = name.to_uppercase();
            if vaccines.iter().any(|v| v.choice_name == choice_name) {
                return Err(CatalogError::DuplicateChoice(choice_name));
            }

            let effect_days = match raw_vaccine.efecto {
                Some([years, months, days]) => years
                    .checked_mul(DAYS_PER_YEAR)
                    .and_then(|y| months.checked_mul(DAYS_PER_MONTH).map(|m| (y, m)))
                    .and_then(|(y, m)| y.checked_add(m))
                    .and_then(|total| total.checked_add(days))
                    .ok_or_else(|| {
                        CatalogError::InvalidEntry(format!("effect of `{name}` is too large"))
                    })?,
                None => 0,
            };

            vaccines.push(Vaccine {
                index,
                name,
                choice_name,
                effect_days,
                notes: raw_vaccine
                    .observaciones
                    .map(|notes| notes.trim().to_string())
                    .unwrap_or_default(),
            });
        }

        Ok(Self { vaccines })
    }

    /// `(choice_name, name)` pairs in catalog order.
    pub fn choices(&self) -> Vec<(&str, &str)> {
        self.vaccines
            .iter()
            .map(|v| (v.choice_name.as_str(), v.name.as_str()))
            .collect()
    }

    pub fn get(&self, choice_name: &str) -> Result<&Vaccine, CatalogError> {
        let normalized = choice_name.trim().to_uppercase();
        self.vaccines
            .iter()
            .find(|v| v.choice_name == normalized)
            .ok_or_else(|| CatalogError::UnknownVaccine(choice_name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vaccine> {
        self.vaccines.iter()
    }

    pub fn len(&self) -> usize {
        self.vaccines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vaccines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogError, VaccineCatalog};

    #[test]
    fn builtin_catalog_loads_in_file_order() {
        let catalog = VaccineCatalog::builtin().expect("builtin catalog");
        let choices = catalog.choices();
        assert_eq!(choices[0], ("TRIVALENTE", "Trivalente"));
        assert_eq!(catalog.get("rabia").expect("rabia").effect_days, 365);
        assert_eq!(catalog.get("DESPARASITACION").expect("desp").effect_days, 93);
    }

    #[test]
    fn missing_effect_defaults_to_zero() {
        let catalog = VaccineCatalog::from_yaml_str("Prueba:\nOtra:\n  observaciones: hola\n")
            .expect("catalog");
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("PRUEBA").expect("prueba").effect_days, 0);
        assert_eq!(catalog.get("OTRA").expect("otra").notes, "hola");
    }

    #[test]
    fn effect_combines_years_months_days() {
        let catalog =
            VaccineCatalog::from_yaml_str("Mixta:\n  efecto: [1, 2, 3]\n").expect("catalog");
        assert_eq!(catalog.get("MIXTA").expect("mixta").effect_days, 365 + 62 + 3);
    }

    #[test]
    fn rejects_duplicates_and_unknown_choices() {
        let err = VaccineCatalog::from_yaml_str("Rabia:\nRABIA:\n").expect_err("duplicate");
        assert!(matches!(err, CatalogError::DuplicateChoice(_)));

        let catalog = VaccineCatalog::builtin().expect("builtin catalog");
        assert!(matches!(
            catalog.get("gripe"),
            Err(CatalogError::UnknownVaccine(_))
        ));
    }
}
