//! Serializable command results and their plain-text rendering.
//!
//! Every `--json` payload is one of these structs, so the field names here
//! are part of the shell contract.

use serde::Serialize;

use permcascade_engine::{Catalog, CatalogReport, ChangeSet, PermissionId};

/// A cascade notification: an id plus the label a person would recognise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: PermissionId,
    pub label: String,
}

impl Notice {
    pub fn for_ids(catalog: &Catalog, ids: &[PermissionId]) -> Vec<Notice> {
        ids.iter()
            .map(|id| Notice {
                id: id.clone(),
                label: catalog.label_for(id),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClosureReport {
    pub requested: Vec<PermissionId>,
    pub selection: Vec<PermissionId>,
    pub auto_added: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DependentsReport {
    pub target: PermissionId,
    pub dependents: Vec<Notice>,
    /// Selection left after revoking `target` with its dependents.
    pub remaining: Vec<PermissionId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateSummary {
    pub name: String,
    pub description: String,
    pub permissions: Vec<PermissionId>,
    /// Size of the template's dependency closure.
    pub closure_size: usize,
}

pub fn join_ids(ids: &[PermissionId]) -> String {
    if ids.is_empty() {
        return "(none)".to_string();
    }
    ids.iter().map(PermissionId::as_str).collect::<Vec<_>>().join(", ")
}

/// `P1 (Read users), P2`. The label is omitted when it is just the id.
pub fn join_notices(notices: &[Notice]) -> String {
    if notices.is_empty() {
        return "(none)".to_string();
    }
    notices
        .iter()
        .map(|n| {
            if n.label == n.id.as_str() {
                n.id.to_string()
            } else {
                format!("{} ({})", n.id, n.label)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn render_changes(changes: &ChangeSet) -> String {
    if !changes.has_changes {
        return "no changes".to_string();
    }
    let mut parts = Vec::new();
    parts.extend(changes.added.iter().map(|id| format!("+{id}")));
    parts.extend(changes.removed.iter().map(|id| format!("-{id}")));
    parts.join(" ")
}

pub fn render_check(report: &CatalogReport) -> String {
    let mut out = format!(
        "{} permissions, {} dependency edges\n",
        report.permission_count, report.edge_count
    );
    if report.is_clean() {
        out.push_str("catalog is clean\n");
        return out;
    }
    if !report.duplicates.is_empty() {
        out.push_str(&format!("duplicate ids: {}\n", join_ids(&report.duplicates)));
    }
    for dangling in &report.dangling {
        out.push_str(&format!(
            "dangling: {} requires unknown {}\n",
            dangling.permission, dangling.missing
        ));
    }
    if !report.self_references.is_empty() {
        out.push_str(&format!("self-references: {}\n", join_ids(&report.self_references)));
    }
    for group in &report.cycles {
        out.push_str(&format!("cycle: {}\n", join_ids(group)));
    }
    out
}
