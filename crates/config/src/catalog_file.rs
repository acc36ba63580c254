//! Catalog files exported from the metadata service.

use std::fs;
use std::path::Path;

use permcascade_engine::{Catalog, EngineError};

use crate::error::ConfigError;

/// Load a catalog JSON file (bare record array or `permissions` envelope).
pub fn load_catalog(path: &Path) -> Result<Catalog, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    let catalog = Catalog::from_json(&contents).map_err(|e| match e {
        EngineError::CatalogParse(msg) => ConfigError::parse(path, msg),
        other => ConfigError::Engine(other),
    })?;
    log::debug!("loaded {} permissions from {}", catalog.len(), path.display());
    Ok(catalog)
}
