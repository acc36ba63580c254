//! Scripted edit sessions: `permc edit --seed 1,2 add:7 remove:2 ...`.
//!
//! Each op maps onto one session call. Cascade notifications are collected
//! per step so the caller can show what each toggle dragged along.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use permcascade_engine::{
    Catalog, CategoryToggle, ChangeSet, EngineError, PermissionId, SelectionSession, TemplateSet,
};

use crate::report::Notice;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    Add(PermissionId),
    Remove(PermissionId),
    /// Select-all / deselect-all over a category key.
    Category(String),
    Template(String),
}

impl FromStr for EditOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid op '{s}' (expected KIND:VALUE)"))?;
        let value = value.trim();
        match kind.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(EditOp::Add(PermissionId::from(value))),
            "remove" => Ok(EditOp::Remove(PermissionId::from(value))),
            "category" => Ok(EditOp::Category(value.to_string())),
            "template" => Ok(EditOp::Template(value.to_string())),
            other => Err(format!(
                "unknown op kind '{other}' (expected add, remove, category or template)"
            )),
        }
    }
}

impl fmt::Display for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditOp::Add(id) => write!(f, "add:{id}"),
            EditOp::Remove(id) => write!(f, "remove:{id}"),
            EditOp::Category(name) => write!(f, "category:{name}"),
            EditOp::Template(name) => write!(f, "template:{name}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EditStep {
    pub op: String,
    pub auto_added: Vec<Notice>,
    pub removed_extra: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditReport {
    /// Dependencies the seed itself was missing before any op ran.
    pub missing_in_seed: Vec<PermissionId>,
    pub steps: Vec<EditStep>,
    pub selection: Vec<PermissionId>,
    pub changes: ChangeSet,
}

/// Run `ops` in order against a session seeded with `seed`.
///
/// Stops at the first op the engine rejects. An unknown category is an
/// invalid argument rather than an empty toggle.
pub fn run_edit(
    catalog: &Catalog,
    templates: &TemplateSet,
    seed: Vec<PermissionId>,
    ops: &[EditOp],
) -> Result<EditReport, EngineError> {
    let mut session = SelectionSession::start(catalog, seed)?;
    let missing_in_seed = session.missing_dependencies();
    if !missing_in_seed.is_empty() {
        log::warn!("seed selection is missing {} dependencies", missing_in_seed.len());
    }

    let mut steps = Vec::with_capacity(ops.len());
    for op in ops {
        let (auto_added, removed_extra) = match op {
            EditOp::Add(id) => (session.toggle_add(id)?, Vec::new()),
            EditOp::Remove(id) => (Vec::new(), session.toggle_remove(id)?),
            EditOp::Category(name) => {
                let ids = catalog.category_ids(name);
                if ids.is_empty() {
                    return Err(EngineError::InvalidArgument(format!("unknown category '{name}'")));
                }
                match session.toggle_category(&ids)? {
                    CategoryToggle::Added { auto_added } => (auto_added, Vec::new()),
                    CategoryToggle::Removed { removed_extra } => (Vec::new(), removed_extra),
                }
            }
            EditOp::Template(name) => (session.apply_template_named(templates, name)?, Vec::new()),
        };

        steps.push(EditStep {
            op: op.to_string(),
            auto_added: Notice::for_ids(catalog, &auto_added),
            removed_extra: Notice::for_ids(catalog, &removed_extra),
        });
    }

    Ok(EditReport {
        missing_in_seed,
        steps,
        selection: session.current_sorted(),
        changes: session.changes(),
    })
}
