//! `permcascade-engine`: permission dependency and cascade resolution.
//!
//! Pure engine crate: receives a catalog, returns resolved selections and
//! diffs. No CLI or IO dependencies.

pub mod bulk;
pub mod catalog;
pub mod dep_index;
pub mod diff;
pub mod error;
pub mod permission_id;
pub mod resolver;
pub mod session;
pub mod template;

pub use bulk::{plan_bulk, BulkAction, SubjectOutcome};
pub use catalog::{Catalog, CatalogReport, PermissionRecord, UNCATEGORIZED};
pub use dep_index::DepIndex;
pub use diff::{compute_changes, ChangeSet};
pub use error::EngineError;
pub use permission_id::{parse_id_list, PermissionId};
pub use resolver::{
    find_dependents, remove_with_cascade, resolve_dependency_closure, Removal, SelectionSet,
};
pub use session::{CategoryState, CategoryToggle, SelectionSession};
pub use template::{PermissionTemplate, TemplateDefinition, TemplateSet};
