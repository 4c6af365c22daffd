//! Read-only catalog of known vehicle makes, models, and years.
//!
//! The catalog backs the make/model pickers in clients and, when the server runs with the
//! curated tag policy, decides which vehicle names may be used as tags and in garages.

use crate::time::DateTime;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

pub const MIN_YEAR: i32 = 1900;

/// Lookup service for reference vehicle data. Injected into the application state so that
/// tests and deployments can substitute their own catalog.
pub trait ReferenceData: Send + Sync {
    /// All known makes, sorted alphabetically.
    fn makes(&self) -> Vec<&str>;

    /// Known models of `make`. Empty if `make` is unknown.
    fn models_for_make(&self, make: &str) -> Vec<&str>;

    /// Selectable model years, newest first.
    fn years(&self) -> Vec<i32>;

    fn is_valid_make(&self, make: &str) -> bool {
        self.makes().contains(&make)
    }

    fn is_valid_model(&self, make: &str, model: &str) -> bool {
        self.models_for_make(make).contains(&model)
    }

    fn is_valid_year(&self, year: i32) -> bool {
        self.years().contains(&year)
    }
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub enum CatalogError {
    Json(#[from] serde_json::Error),
    StdIo(#[from] std::io::Error),
}

/// A catalog held entirely in memory.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticCatalog {
    models: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_max_year")]
    max_year: i32,
}

impl StaticCatalog {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let mut catalog: Self = serde_json::from_str(json)?;
        for models in catalog.models.values_mut() {
            models.sort_unstable();
            models.dedup();
        }
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let catalog = Self::from_json(&std::fs::read_to_string(path)?)?;
        info!("Loaded {} makes from {}", catalog.models.len(), path.display());
        Ok(catalog)
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        let models = BUILT_IN_MODELS
            .iter()
            .map(|(make, models)| {
                let mut models: Vec<String> = models.iter().map(|&model| String::from(model)).collect();
                models.sort_unstable();
                (String::from(*make), models)
            })
            .collect();
        Self {
            models,
            max_year: default_max_year(),
        }
    }
}

impl ReferenceData for StaticCatalog {
    fn makes(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    fn models_for_make(&self, make: &str) -> Vec<&str> {
        self.models
            .get(make)
            .map(|models| models.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn years(&self) -> Vec<i32> {
        (MIN_YEAR..=self.max_year).rev().collect()
    }

    fn is_valid_year(&self, year: i32) -> bool {
        (MIN_YEAR..=self.max_year).contains(&year)
    }
}

/// Model years up to one past the current year are accepted, since manufacturers
/// release vehicles ahead of the calendar.
pub fn default_max_year() -> i32 {
    DateTime::current_year() + 1
}

const BUILT_IN_MODELS: &[(&str, &[&str])] = &[
    ("Acura", &["Integra", "NSX", "RSX", "TLX"]),
    ("Audi", &["A4", "R8", "RS6", "S4", "TT"]),
    ("BMW", &["M2", "M3", "M4", "M5", "Z4"]),
    ("Chevrolet", &["Camaro", "Corvette", "Silverado"]),
    ("Dodge", &["Challenger", "Charger", "Viper"]),
    ("Ford", &["Bronco", "F-150", "Focus RS", "GT", "Mustang"]),
    ("Honda", &["Accord", "Civic", "Civic Type R", "S2000"]),
    ("Mazda", &["MX-5 Miata", "RX-7", "RX-8"]),
    ("Mitsubishi", &["3000GT", "Lancer Evolution"]),
    ("Nissan", &["240SX", "300ZX", "GT-R", "Skyline", "Z"]),
    ("Porsche", &["911", "Boxster", "Cayman"]),
    ("Subaru", &["BRZ", "Impreza", "WRX", "WRX STI"]),
    ("Toyota", &["86", "Camry", "Corolla", "GR Supra", "MR2", "Supra", "Tacoma"]),
    ("Volkswagen", &["Golf GTI", "Golf R", "Jetta"]),
];

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn built_in_catalog() {
        let catalog = StaticCatalog::default();
        let makes = catalog.makes();
        assert!(makes.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(catalog.is_valid_make("Toyota"));
        assert!(!catalog.is_valid_make("toyota"));
        assert!(catalog.is_valid_model("Toyota", "Camry"));
        assert!(!catalog.is_valid_model("Honda", "Camry"));
        assert!(catalog.models_for_make("Yugo").is_empty());
    }

    #[test]
    fn years() {
        let catalog = StaticCatalog::default();
        let years = catalog.years();
        assert_eq!(years.first(), Some(&(DateTime::current_year() + 1)));
        assert_eq!(years.last(), Some(&MIN_YEAR));
        assert!(catalog.is_valid_year(1999));
        assert!(!catalog.is_valid_year(1899));
        assert!(!catalog.is_valid_year(DateTime::current_year() + 2));
    }

    #[test]
    fn from_json() {
        let json = r#"{ "models": { "Lancia": ["Stratos", "Delta", "Delta"] }, "max_year": 1995 }"#;
        let catalog = StaticCatalog::from_json(json).unwrap();
        assert_eq!(catalog.makes(), vec!["Lancia"]);
        assert_eq!(catalog.models_for_make("Lancia"), vec!["Delta", "Stratos"]);
        assert_eq!(catalog.years().first(), Some(&1995));
        assert!(StaticCatalog::from_json(r#"{ "makes": [] }"#).is_err());
    }
}
