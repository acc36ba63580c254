//! Configuration loading: user settings, template definitions, catalog files.

pub mod catalog_file;
pub mod error;
pub mod settings;
pub mod templates;

pub use catalog_file::load_catalog;
pub use error::ConfigError;
pub use settings::Settings;
pub use templates::{load_templates, templates_from_toml};
