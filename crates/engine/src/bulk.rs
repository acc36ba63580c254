//! Bulk actions: the same delta applied to many subjects.
//!
//! Each subject gets its own session over its own seed, so outcomes are
//! independent of one another and of the order subjects are listed in.
//! Persisting the outcomes (and tracking which saves failed) is left to the
//! caller.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::diff::ChangeSet;
use crate::error::EngineError;
use crate::permission_id::PermissionId;
use crate::session::SelectionSession;
use crate::template::{PermissionTemplate, TemplateSet};

/// The delta a bulk operation applies to every subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum BulkAction {
    Add(Vec<PermissionId>),
    Remove(Vec<PermissionId>),
    Template(String),
}

/// Result of applying a [`BulkAction`] to one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectOutcome {
    pub subject: String,
    /// Resolved selection to persist for this subject. Sorted.
    pub selection: Vec<PermissionId>,
    pub changes: ChangeSet,
    pub auto_added: Vec<PermissionId>,
    pub removed_extra: Vec<PermissionId>,
}

/// Resolve `action` against each `(subject, seed)` pair.
///
/// The action is validated once up front: an unknown template or a blank id
/// fails the whole plan before any subject is touched. A blank id in a
/// subject's seed fails the plan at that subject.
pub fn plan_bulk<S>(
    catalog: &Catalog,
    templates: &TemplateSet,
    action: &BulkAction,
    subjects: impl IntoIterator<Item = (S, Vec<PermissionId>)>,
) -> Result<Vec<SubjectOutcome>, EngineError>
where
    S: Into<String>,
{
    let step = match action {
        BulkAction::Add(ids) => Step::Add(non_blank(ids)?),
        BulkAction::Remove(ids) => Step::Remove(non_blank(ids)?),
        BulkAction::Template(name) => Step::Template(templates.get(name)?),
    };

    let mut outcomes = Vec::new();
    for (subject, seed) in subjects {
        let subject: String = subject.into();
        let mut session = SelectionSession::start(catalog, seed).map_err(|e| match e {
            EngineError::InvalidArgument(msg) => {
                EngineError::InvalidArgument(format!("subject '{subject}': {msg}"))
            }
            other => other,
        })?;
        let (auto_added, removed_extra) = match step {
            Step::Add(ids) => (session.add_many(ids)?, Vec::new()),
            Step::Remove(ids) => (Vec::new(), session.remove_many(ids)?),
            Step::Template(template) => (session.apply_template(template)?, Vec::new()),
        };

        outcomes.push(SubjectOutcome {
            subject,
            selection: session.current_sorted(),
            changes: session.changes(),
            auto_added,
            removed_extra,
        });
    }

    log::debug!("bulk plan resolved for {} subjects", outcomes.len());
    Ok(outcomes)
}

fn non_blank(ids: &[PermissionId]) -> Result<&[PermissionId], EngineError> {
    if ids.iter().any(PermissionId::is_blank) {
        return Err(EngineError::InvalidArgument(
            "bulk action contains an empty permission id".into(),
        ));
    }
    Ok(ids)
}

/// A [`BulkAction`] with its template already looked up.
#[derive(Clone, Copy)]
enum Step<'a> {
    Add(&'a [PermissionId]),
    Remove(&'a [PermissionId]),
    Template(&'a PermissionTemplate),
}
