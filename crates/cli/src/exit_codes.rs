//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract. Scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad args, missing catalog/template file)|
//! | 3    | `check --strict` found dependency cycles             |
//! | 4    | Catalog or template file is malformed                |
//! | 5    | Unknown template name                                |
//! | 6    | Invalid argument (empty id, unknown category)        |

use permcascade_config::ConfigError;
use permcascade_engine::EngineError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options or files.
pub const EXIT_USAGE: u8 = 2;

/// Catalog contains dependency cycles (only with `check --strict`).
pub const EXIT_CATALOG_CYCLES: u8 = 3;

/// Catalog/template/subjects document could not be parsed.
pub const EXIT_PARSE: u8 = 4;

/// Template name not defined in the template file.
pub const EXIT_UNKNOWN_TEMPLATE: u8 = 5;

/// Caller passed an id or category the engine rejects.
pub const EXIT_INVALID_ARGUMENT: u8 = 6;

/// Map an EngineError to its exit code.
pub fn engine_exit_code(err: &EngineError) -> u8 {
    match err {
        EngineError::InvalidArgument(_) => EXIT_INVALID_ARGUMENT,
        EngineError::UnknownTemplate(_) => EXIT_UNKNOWN_TEMPLATE,
        EngineError::CatalogParse(_) | EngineError::TemplateParse(_) => EXIT_PARSE,
    }
}

/// Map a ConfigError to its exit code.
pub fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::Io { .. } => EXIT_USAGE,
        ConfigError::Parse { .. } => EXIT_PARSE,
        ConfigError::Engine(inner) => engine_exit_code(inner),
    }
}
