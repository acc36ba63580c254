//! Cascade resolution over permission selections.
//!
//! Maintains the selection invariant: for every granted permission, all of
//! its transitive dependencies are granted as well.
//!
//! Both traversals mark a node visited before enqueueing it, so each id is
//! expanded at most once. This is what makes them terminate on cyclic or
//! self-referencing catalogs; nothing here assumes the data is a DAG.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::dep_index::DepIndex;
use crate::permission_id::PermissionId;
use crate::template::PermissionTemplate;

/// A set of granted permission ids.
pub type SelectionSet = FxHashSet<PermissionId>;

/// Sorted copy of a set, for deterministic reporting.
pub fn sorted_ids<'a>(ids: impl IntoIterator<Item = &'a PermissionId>) -> Vec<PermissionId> {
    let mut v: Vec<PermissionId> = ids.into_iter().cloned().collect();
    v.sort();
    v.dedup();
    v
}

// =============================================================================
// Forward closure
// =============================================================================

/// Smallest superset of `candidates` closed under direct dependencies.
///
/// Breadth-first from every candidate. Unknown ids contribute themselves
/// and nothing else.
pub fn resolve_dependency_closure<'a>(
    candidates: impl IntoIterator<Item = &'a PermissionId>,
    index: &DepIndex,
) -> SelectionSet {
    let mut visited = SelectionSet::default();
    let mut queue: VecDeque<PermissionId> = VecDeque::new();

    for id in candidates {
        if visited.insert(id.clone()) {
            queue.push_back(id.clone());
        }
    }

    while let Some(current) = queue.pop_front() {
        for dep in index.direct_dependencies(&current) {
            if visited.insert(dep.clone()) {
                queue.push_back(dep.clone());
            }
        }
    }

    visited
}

/// Outcome of granting ids into a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub selection: SelectionSet,
    /// Dependencies pulled in that were neither requested nor already held. Sorted.
    pub auto_added: Vec<PermissionId>,
}

/// Grant `requested` on top of `selection`, closing over dependencies.
pub fn grant(requested: &[PermissionId], selection: &SelectionSet, index: &DepIndex) -> Grant {
    let resolved = resolve_dependency_closure(selection.iter().chain(requested), index);

    let requested_set: FxHashSet<&PermissionId> = requested.iter().collect();
    let auto_added = sorted_ids(
        resolved
            .iter()
            .filter(|id| !selection.contains(*id) && !requested_set.contains(id)),
    );

    Grant {
        selection: resolved,
        auto_added,
    }
}

/// Closure of a template's permission list.
pub fn expand_template(template: &PermissionTemplate, index: &DepIndex) -> SelectionSet {
    resolve_dependency_closure(&template.permissions, index)
}

// =============================================================================
// Reverse cascade
// =============================================================================

/// Walk dependents from every seed. Returns everything reached, seeds included.
fn collect_dependents<'a>(
    seeds: impl IntoIterator<Item = &'a PermissionId>,
    index: &DepIndex,
) -> FxHashSet<PermissionId> {
    let mut to_remove: FxHashSet<PermissionId> = FxHashSet::default();
    let mut queue: VecDeque<&PermissionId> = VecDeque::new();

    for seed in seeds {
        to_remove.insert(seed.clone());
        queue.extend(index.direct_dependents(seed));
    }

    while let Some(current) = queue.pop_front() {
        if !to_remove.insert(current.clone()) {
            continue;
        }
        queue.extend(index.direct_dependents(current));
    }

    to_remove
}

/// Members of `selection` that transitively require `target`.
///
/// Empty when `target` is not selected, matching what
/// [`remove_with_cascade`] would revoke. The target itself is excluded. The
/// walk follows the full dependents relation so a selection that already
/// violates the invariant still reports everything that must go; only
/// selected ids are returned. Sorted.
pub fn find_dependents(
    target: &PermissionId,
    selection: &SelectionSet,
    index: &DepIndex,
) -> Vec<PermissionId> {
    find_dependents_of_all(std::slice::from_ref(target), selection, index)
}

/// Union of [`find_dependents`] over several targets, excluding the targets.
///
/// Targets that are not selected contribute nothing.
pub fn find_dependents_of_all(
    targets: &[PermissionId],
    selection: &SelectionSet,
    index: &DepIndex,
) -> Vec<PermissionId> {
    let reached = collect_dependents(targets.iter().filter(|t| selection.contains(*t)), index);
    let targets: FxHashSet<&PermissionId> = targets.iter().collect();
    sorted_ids(
        reached
            .iter()
            .filter(|id| !targets.contains(id) && selection.contains(*id)),
    )
}

/// Outcome of removing ids from a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub selection: SelectionSet,
    /// Dependents removed alongside the requested ids. Sorted.
    pub removed_extra: Vec<PermissionId>,
}

/// Remove `target` and every selected permission that requires it.
///
/// Removing an id that is not selected changes nothing.
pub fn remove_with_cascade(
    target: &PermissionId,
    selection: &SelectionSet,
    index: &DepIndex,
) -> Removal {
    remove_many_with_cascade(std::slice::from_ref(target), selection, index)
}

/// Batched removal: one cascade seeded with every selected target.
///
/// Targets that are not selected are ignored.
pub fn remove_many_with_cascade(
    targets: &[PermissionId],
    selection: &SelectionSet,
    index: &DepIndex,
) -> Removal {
    let present: Vec<PermissionId> = targets
        .iter()
        .filter(|id| selection.contains(*id))
        .cloned()
        .collect();

    if present.is_empty() {
        return Removal {
            selection: selection.clone(),
            removed_extra: Vec::new(),
        };
    }

    let removed_extra = find_dependents_of_all(&present, selection, index);
    let mut next = selection.clone();
    for id in present.iter().chain(&removed_extra) {
        next.remove(id);
    }

    Removal {
        selection: next,
        removed_extra,
    }
}
