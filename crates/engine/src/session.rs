//! Selection session: one in-progress permission edit.
//!
//! A session holds the selection as it was when the edit started
//! (`original`) and the working copy (`current`). Every mutation goes
//! through the resolver, so `current` stays closed under dependencies as
//! long as the seed was. The session does no persistence; the caller saves
//! `current` (or the [`ChangeSet`]) and then calls [`SelectionSession::commit`].
//!
//! One session per subject. Sessions borrow the catalog immutably, so any
//! number of them can run side by side over the same catalog.

use crate::catalog::Catalog;
use crate::diff::{compute_changes, ChangeSet};
use crate::error::EngineError;
use crate::permission_id::PermissionId;
use crate::resolver::{self, SelectionSet};
use crate::template::{PermissionTemplate, TemplateSet};

/// What a category toggle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryToggle {
    /// Not every id was selected, so all were granted.
    Added { auto_added: Vec<PermissionId> },
    /// Every id was selected, so all were revoked in one cascade.
    Removed { removed_extra: Vec<PermissionId> },
}

/// Tri-state selection of a group of ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryState {
    All,
    Partial,
    Unselected,
}

#[derive(Debug, Clone)]
pub struct SelectionSession<'a> {
    catalog: &'a Catalog,
    original: SelectionSet,
    current: SelectionSet,
}

fn validate(ids: &[PermissionId]) -> Result<(), EngineError> {
    if ids.iter().any(PermissionId::is_blank) {
        return Err(EngineError::InvalidArgument("permission id is empty".into()));
    }
    Ok(())
}

impl<'a> SelectionSession<'a> {
    /// Start an edit with `original = current = seed`.
    ///
    /// A blank id in the seed is an invalid argument.
    pub fn start(
        catalog: &'a Catalog,
        seed: impl IntoIterator<Item = PermissionId>,
    ) -> Result<Self, EngineError> {
        let seed: Vec<PermissionId> = seed.into_iter().collect();
        validate(&seed)?;
        let original: SelectionSet = seed.into_iter().collect();
        Ok(Self {
            catalog,
            current: original.clone(),
            original,
        })
    }

    pub fn empty(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            original: SelectionSet::default(),
            current: SelectionSet::default(),
        }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn current(&self) -> &SelectionSet {
        &self.current
    }

    pub fn original(&self) -> &SelectionSet {
        &self.original
    }

    /// Current selection, sorted.
    pub fn current_sorted(&self) -> Vec<PermissionId> {
        resolver::sorted_ids(&self.current)
    }

    pub fn is_granted(&self, id: &PermissionId) -> bool {
        self.current.contains(id)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Grant `id` and its dependencies. Returns the dependencies that were
    /// newly pulled in, excluding `id` itself.
    pub fn toggle_add(&mut self, id: &PermissionId) -> Result<Vec<PermissionId>, EngineError> {
        self.add_many(std::slice::from_ref(id))
    }

    /// Revoke `id` and every selected permission that requires it. Returns
    /// the dependents removed alongside it.
    pub fn toggle_remove(&mut self, id: &PermissionId) -> Result<Vec<PermissionId>, EngineError> {
        self.remove_many(std::slice::from_ref(id))
    }

    /// Grant several ids with a single closure pass.
    pub fn add_many(&mut self, ids: &[PermissionId]) -> Result<Vec<PermissionId>, EngineError> {
        validate(ids)?;
        let grant = resolver::grant(ids, &self.current, self.catalog.index());
        if !grant.auto_added.is_empty() {
            log::debug!(
                "granting {} pulled in {} dependencies",
                ids.len(),
                grant.auto_added.len()
            );
        }
        self.current = grant.selection;
        Ok(grant.auto_added)
    }

    /// Revoke several ids with one cascade seeded by all of them.
    ///
    /// Ids that are not selected are ignored.
    pub fn remove_many(&mut self, ids: &[PermissionId]) -> Result<Vec<PermissionId>, EngineError> {
        validate(ids)?;
        let removal = resolver::remove_many_with_cascade(ids, &self.current, self.catalog.index());
        if !removal.removed_extra.is_empty() {
            log::debug!(
                "revoking {} cascaded to {} dependents",
                ids.len(),
                removal.removed_extra.len()
            );
        }
        self.current = removal.selection;
        Ok(removal.removed_extra)
    }

    /// Select-all / deselect-all for a group of ids.
    ///
    /// If every id is already granted they are all revoked in one batched
    /// cascade; otherwise all are granted in one closure pass.
    pub fn toggle_category(&mut self, ids: &[PermissionId]) -> Result<CategoryToggle, EngineError> {
        validate(ids)?;
        if self.category_state(ids) == CategoryState::All {
            let removed_extra = self.remove_many(ids)?;
            Ok(CategoryToggle::Removed { removed_extra })
        } else {
            let auto_added = self.add_many(ids)?;
            Ok(CategoryToggle::Added { auto_added })
        }
    }

    /// Whether all, some, or none of `ids` are granted.
    ///
    /// An empty group counts as fully selected.
    pub fn category_state(&self, ids: &[PermissionId]) -> CategoryState {
        let granted = ids.iter().filter(|id| self.current.contains(*id)).count();
        if granted == ids.len() {
            CategoryState::All
        } else if granted == 0 {
            CategoryState::Unselected
        } else {
            CategoryState::Partial
        }
    }

    /// Merge a template into the selection. Returns the dependencies pulled
    /// in beyond the template's own list.
    pub fn apply_template(
        &mut self,
        template: &PermissionTemplate,
    ) -> Result<Vec<PermissionId>, EngineError> {
        log::debug!("applying template '{}'", template.name);
        self.add_many(&template.permissions)
    }

    pub fn apply_template_named(
        &mut self,
        templates: &TemplateSet,
        name: &str,
    ) -> Result<Vec<PermissionId>, EngineError> {
        let template = templates.get(name)?;
        self.apply_template(template)
    }

    /// Close the selection under dependencies. Seeds loaded from persisted
    /// data may violate the invariant; returns what had to be added.
    pub fn repair(&mut self) -> Vec<PermissionId> {
        let grant = resolver::grant(&[], &self.current, self.catalog.index());
        if !grant.auto_added.is_empty() {
            log::warn!("selection was missing {} dependencies", grant.auto_added.len());
        }
        self.current = grant.selection;
        grant.auto_added
    }

    /// Dependencies required by the selection but not granted. Sorted.
    pub fn missing_dependencies(&self) -> Vec<PermissionId> {
        self.catalog.index().missing_dependencies(&self.current)
    }

    /// Discard edits: `current = original`.
    pub fn reset(&mut self) {
        self.current = self.original.clone();
    }

    // =========================================================================
    // Diff + commit
    // =========================================================================

    pub fn changes(&self) -> ChangeSet {
        compute_changes(&self.original, &self.current)
    }

    /// Mark the current selection as saved. Returns the changes that the
    /// caller just persisted and rebases `original = current`.
    pub fn commit(&mut self) -> ChangeSet {
        let changes = self.changes();
        self.original = self.current.clone();
        changes
    }
}
