//! Template definition files.
//!
//! TOML layout:
//!
//! ```toml
//! [templates.operator]
//! description = "Day-to-day delivery operations"
//! permissions = [1, 2, "deliveries.track"]
//! ```
//!
//! A `.json` file with the same shape (or a bare name → definition object)
//! is accepted as well.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use permcascade_engine::{EngineError, TemplateDefinition, TemplateSet};
use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Default, Deserialize)]
struct TemplateFile {
    #[serde(default)]
    templates: BTreeMap<String, TemplateDefinition>,
}

/// Parse TOML template definitions.
pub fn templates_from_toml(input: &str) -> Result<TemplateSet, EngineError> {
    let file: TemplateFile =
        toml::from_str(input).map_err(|e| EngineError::TemplateParse(e.to_string()))?;
    TemplateSet::from_definitions(file.templates)
}

/// Load templates from disk, picking the format by extension.
pub fn load_templates(path: &Path) -> Result<TemplateSet, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let parsed = if is_json {
        TemplateSet::from_json(&contents)
    } else {
        templates_from_toml(&contents)
    };

    let set = parsed.map_err(|e| match e {
        EngineError::TemplateParse(msg) => ConfigError::parse(path, msg),
        other => ConfigError::Engine(other),
    })?;
    log::debug!("loaded {} templates from {}", set.len(), path.display());
    Ok(set)
}
