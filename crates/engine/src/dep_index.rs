//! Dependency index for permission catalogs.
//!
//! Tracks the declared dependencies of each permission and the inverted
//! relation (which permissions require a given one), both built once when
//! the catalog is loaded.
//!
//! # Edge Direction
//!
//! ```text
//! P → D  means  "P requires D"  (D is a dependency of P, P is a dependent of D)
//! ```
//!
//! Granting P means following outgoing edges; revoking D means following
//! incoming edges.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::catalog::PermissionRecord;
use crate::permission_id::PermissionId;

/// Immutable forward and reverse adjacency for a catalog.
///
/// - `deps[P]` = permissions P directly requires, in declared order
/// - `dependents[D]` = permissions that directly require D, in catalog order
///
/// # Invariants
///
/// 1. **Bidirectional consistency:** If D ∈ deps[P] then P ∈ dependents[D], and vice versa.
/// 2. **No dangling entries:** Empty lists are not stored.
/// 3. **No duplicate dependents:** A permission listing D twice appears once in dependents[D].
/// 4. **Built once:** There is no mutator; a new catalog builds a new index.
#[derive(Default, Debug, Clone)]
pub struct DepIndex {
    deps: FxHashMap<PermissionId, Vec<PermissionId>>,
    dependents: FxHashMap<PermissionId, Vec<PermissionId>>,
}

impl DepIndex {
    /// Build the index from catalog records.
    ///
    /// Records are expected to have unique ids; the catalog filters
    /// duplicates before calling this.
    pub fn build<'a>(records: impl IntoIterator<Item = &'a PermissionRecord>) -> Self {
        let mut deps: FxHashMap<PermissionId, Vec<PermissionId>> = FxHashMap::default();
        let mut dependents: FxHashMap<PermissionId, Vec<PermissionId>> = FxHashMap::default();

        for record in records {
            if record.dependencies.is_empty() {
                continue;
            }
            for dep in &record.dependencies {
                let entry = dependents.entry(dep.clone()).or_default();
                if !entry.contains(&record.id) {
                    entry.push(record.id.clone());
                }
            }
            deps.insert(record.id.clone(), record.dependencies.clone());
        }

        log::debug!(
            "dependency index built: {} permissions with dependencies, {} required permissions",
            deps.len(),
            dependents.len()
        );

        Self { deps, dependents }
    }

    /// Returns the permissions `id` directly requires.
    ///
    /// Unknown ids have no dependencies.
    pub fn direct_dependencies(&self, id: &PermissionId) -> &[PermissionId] {
        self.deps.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the permissions that directly require `id`.
    ///
    /// Unknown ids have no dependents.
    pub fn direct_dependents(&self, id: &PermissionId) -> &[PermissionId] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns true if `id` declares at least one dependency.
    pub fn has_dependencies(&self, id: &PermissionId) -> bool {
        self.deps.contains_key(id)
    }

    /// Number of permissions that declare dependencies.
    pub fn dependent_permission_count(&self) -> usize {
        self.deps.len()
    }

    /// Number of permissions required by at least one other permission.
    pub fn required_permission_count(&self) -> usize {
        self.dependents.len()
    }

    /// Number of distinct requires-edges.
    pub fn edge_count(&self) -> usize {
        self.dependents.values().map(Vec::len).sum()
    }

    /// Every permission reachable from `id` by following dependency edges.
    ///
    /// `id` itself is never part of the result, even when it sits on a cycle.
    pub fn transitive_dependencies(&self, id: &PermissionId) -> FxHashSet<PermissionId> {
        let mut visited: FxHashSet<PermissionId> = FxHashSet::default();
        let mut stack: Vec<&PermissionId> = self.direct_dependencies(id).iter().collect();

        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            stack.extend(self.direct_dependencies(current));
        }

        visited.remove(id);
        visited
    }

    /// Permissions required by members of `selection` but absent from it.
    ///
    /// Empty iff the selection is closed under dependencies. Sorted.
    pub fn missing_dependencies(&self, selection: &FxHashSet<PermissionId>) -> Vec<PermissionId> {
        let mut missing: Vec<PermissionId> = selection
            .iter()
            .flat_map(|id| self.transitive_dependencies(id))
            .filter(|dep| !selection.contains(dep))
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect();
        missing.sort();
        missing
    }

    // =========================================================================
    // Cycle Groups (Tarjan's SCC)
    // =========================================================================

    /// Find all non-trivial SCCs (cycle groups) over dependency edges.
    ///
    /// A cycle group is a set of permissions that all require each other,
    /// directly or transitively: granting any member grants the whole group,
    /// and revoking any member revokes it. Reported by `Catalog::diagnostics`.
    ///
    /// Each inner Vec is one SCC (size > 1, or size == 1 with self-loop),
    /// sorted by id. Groups are ordered by their first member.
    pub fn find_cycle_sccs(&self) -> Vec<Vec<PermissionId>> {
        if self.deps.is_empty() {
            return Vec::new();
        }

        // Only permissions with dependencies can close a cycle.
        let mut sorted_nodes: Vec<&PermissionId> = self.deps.keys().collect();
        sorted_nodes.sort();

        let sorted_neighbours = |id: &PermissionId| -> Vec<PermissionId> {
            let mut neighbours: Vec<PermissionId> = self
                .direct_dependencies(id)
                .iter()
                .filter(|d| self.deps.contains_key(*d))
                .cloned()
                .collect::<FxHashSet<_>>()
                .into_iter()
                .collect();
            neighbours.sort();
            neighbours
        };

        let mut index_counter: u32 = 0;
        let mut stack: Vec<PermissionId> = Vec::new();
        let mut on_stack: FxHashSet<PermissionId> = FxHashSet::default();
        let mut indices: FxHashMap<PermissionId, u32> = FxHashMap::default();
        let mut lowlinks: FxHashMap<PermissionId, u32> = FxHashMap::default();
        let mut sccs: Vec<Vec<PermissionId>> = Vec::new();

        // Iterative Tarjan's to avoid stack overflow on deep chains.
        struct DfsFrame {
            id: PermissionId,
            neighbours: Vec<PermissionId>,
            next_idx: usize,
        }

        for root in sorted_nodes {
            if indices.contains_key(root) {
                continue;
            }

            let mut dfs_stack: Vec<DfsFrame> = Vec::new();

            indices.insert(root.clone(), index_counter);
            lowlinks.insert(root.clone(), index_counter);
            index_counter += 1;
            stack.push(root.clone());
            on_stack.insert(root.clone());

            dfs_stack.push(DfsFrame {
                id: root.clone(),
                neighbours: sorted_neighbours(root),
                next_idx: 0,
            });

            while let Some(frame) = dfs_stack.last_mut() {
                if frame.next_idx < frame.neighbours.len() {
                    let w = frame.neighbours[frame.next_idx].clone();
                    frame.next_idx += 1;

                    if let Some(&w_idx) = indices.get(&w) {
                        if on_stack.contains(&w) {
                            if let Some(v_low) = lowlinks.get_mut(&frame.id) {
                                *v_low = (*v_low).min(w_idx);
                            }
                        }
                    } else {
                        indices.insert(w.clone(), index_counter);
                        lowlinks.insert(w.clone(), index_counter);
                        index_counter += 1;
                        stack.push(w.clone());
                        on_stack.insert(w.clone());

                        let neighbours = sorted_neighbours(&w);
                        dfs_stack.push(DfsFrame {
                            id: w,
                            neighbours,
                            next_idx: 0,
                        });
                    }
                    continue;
                }

                // All neighbours explored: pop and propagate lowlink
                let Some(finished) = dfs_stack.pop() else {
                    break;
                };
                let v = finished.id;
                let v_low = lowlinks.get(&v).copied().unwrap_or(u32::MAX);
                let v_idx = indices.get(&v).copied().unwrap_or(u32::MAX);

                if let Some(parent) = dfs_stack.last() {
                    if let Some(parent_low) = lowlinks.get_mut(&parent.id) {
                        *parent_low = (*parent_low).min(v_low);
                    }
                }

                if v_low != v_idx {
                    continue;
                }

                let mut scc = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack.remove(&w);
                    let is_root = w == v;
                    scc.push(w);
                    if is_root {
                        break;
                    }
                }

                let is_cycle = scc.len() > 1 || self.direct_dependencies(&v).contains(&v);
                if is_cycle {
                    scc.sort();
                    sccs.push(scc);
                }
            }
        }

        sccs.sort();
        sccs
    }

    /// All permissions that sit on some cycle.
    pub fn find_cycle_members(&self) -> FxHashSet<PermissionId> {
        self.find_cycle_sccs().into_iter().flatten().collect()
    }

    /// Check all invariants. Panics if any are violated.
    ///
    /// Only available in test builds.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        // Invariant 1: deps → dependents
        for (id, deps) in &self.deps {
            for dep in deps {
                assert!(
                    self.dependents.get(dep).map_or(false, |d| d.contains(id)),
                    "Missing dependent edge: {dep} should list {id}"
                );
            }
        }

        // Invariant 1: dependents → deps
        for (id, dependents) in &self.dependents {
            for dependent in dependents {
                assert!(
                    self.deps.get(dependent).map_or(false, |d| d.contains(id)),
                    "Missing dependency edge: {dependent} should require {id}"
                );
            }
        }

        // Invariant 2: no empty lists
        for (id, deps) in &self.deps {
            assert!(!deps.is_empty(), "Empty dependency list stored for {id}");
        }
        for (id, dependents) in &self.dependents {
            assert!(!dependents.is_empty(), "Empty dependent list stored for {id}");
        }

        // Invariant 3: no duplicate dependents
        for (id, dependents) in &self.dependents {
            let unique: FxHashSet<&PermissionId> = dependents.iter().collect();
            assert_eq!(unique.len(), dependents.len(), "Duplicate dependents stored for {id}");
        }
    }
}
