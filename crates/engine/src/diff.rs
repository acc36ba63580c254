//! Before/after comparison of two selections.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::permission_id::PermissionId;
use crate::resolver::SelectionSet;

/// What a save would change. Derived, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub added: BTreeSet<PermissionId>,
    pub removed: BTreeSet<PermissionId>,
    pub has_changes: bool,
}

impl ChangeSet {
    /// Number of ids that differ in either direction.
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_changes
    }
}

/// `added = current \ original`, `removed = original \ current`.
pub fn compute_changes(original: &SelectionSet, current: &SelectionSet) -> ChangeSet {
    let added: BTreeSet<PermissionId> = current.difference(original).cloned().collect();
    let removed: BTreeSet<PermissionId> = original.difference(current).cloned().collect();
    let has_changes = !added.is_empty() || !removed.is_empty();

    ChangeSet {
        added,
        removed,
        has_changes,
    }
}
