//! Permission catalog.
//!
//! The catalog is a read-only table of permission records supplied by the
//! metadata service. It is replaced wholesale on reload and never edited in
//! place; the dependency index is derived from it at construction.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Deserializer, Serialize};

use crate::dep_index::DepIndex;
use crate::error::EngineError;
use crate::permission_id::PermissionId;

/// Category key for records that do not declare one.
pub const UNCATEGORIZED: &str = "uncategorized";

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One grantable capability.
///
/// Field names follow the REST backend (`isCritical`, `isSensitive`); the
/// snake_case spellings are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRecord {
    pub id: PermissionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Direct requirements, in declared order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dependencies: Vec<PermissionId>,
    #[serde(default, alias = "is_critical")]
    pub is_critical: bool,
    #[serde(default, alias = "is_sensitive")]
    pub is_sensitive: bool,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<PermissionId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<PermissionId>>::deserialize(deserializer)?.unwrap_or_default())
}

impl PermissionRecord {
    pub fn new(id: impl Into<PermissionId>) -> Self {
        Self {
            id: id.into(),
            label: None,
            value: None,
            category: None,
            dependencies: Vec::new(),
            is_critical: false,
            is_sensitive: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_dependencies<I, T>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<PermissionId>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn critical(mut self) -> Self {
        self.is_critical = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.is_sensitive = true;
        self
    }

    /// Human-readable name: label, then value, then the raw id.
    pub fn display_name(&self) -> &str {
        self.label
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.value.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| self.id.as_str())
    }

    /// Grouping key, falling back to [`UNCATEGORIZED`].
    pub fn category_key(&self) -> &str {
        self.category
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(UNCATEGORIZED)
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Either a bare record array or the `{"permissions": [...]}` envelope the
/// metadata endpoint returns.
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    Bare(Vec<PermissionRecord>),
    Envelope { permissions: Vec<PermissionRecord> },
}

/// Immutable permission table plus its derived dependency index.
///
/// Safe to share across sessions and threads; nothing mutates it after
/// construction except a full [`Catalog::replace`].
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<PermissionRecord>,
    positions: FxHashMap<PermissionId, usize>,
    duplicates: Vec<PermissionId>,
    index: DepIndex,
}

impl Catalog {
    /// Build a catalog. The first record wins when an id repeats.
    pub fn new(records: Vec<PermissionRecord>) -> Self {
        let mut kept: Vec<PermissionRecord> = Vec::with_capacity(records.len());
        let mut positions: FxHashMap<PermissionId, usize> = FxHashMap::default();
        let mut duplicates: Vec<PermissionId> = Vec::new();

        for record in records {
            if positions.contains_key(&record.id) {
                log::warn!("duplicate permission id {} in catalog, keeping first record", record.id);
                duplicates.push(record.id);
                continue;
            }
            positions.insert(record.id.clone(), kept.len());
            kept.push(record);
        }

        let index = DepIndex::build(&kept);
        let catalog = Self {
            records: kept,
            positions,
            duplicates,
            index,
        };

        for dangling in catalog.dangling_references() {
            log::warn!(
                "permission {} requires unknown permission {}",
                dangling.permission,
                dangling.missing
            );
        }

        catalog
    }

    /// Parse a catalog from JSON (bare array or `permissions` envelope).
    pub fn from_json(input: &str) -> Result<Self, EngineError> {
        let doc: CatalogDocument =
            serde_json::from_str(input).map_err(|e| EngineError::CatalogParse(e.to_string()))?;
        let records = match doc {
            CatalogDocument::Bare(records) => records,
            CatalogDocument::Envelope { permissions } => permissions,
        };
        Ok(Self::new(records))
    }

    /// Replace the whole catalog, rebuilding the dependency index.
    pub fn replace(&mut self, records: Vec<PermissionRecord>) {
        *self = Self::new(records);
    }

    pub fn index(&self) -> &DepIndex {
        &self.index
    }

    pub fn records(&self) -> &[PermissionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &PermissionId) -> Option<&PermissionRecord> {
        self.positions.get(id).map(|&pos| &self.records[pos])
    }

    pub fn contains(&self, id: &PermissionId) -> bool {
        self.positions.contains_key(id)
    }

    /// Display label for notifications. Unknown ids render as themselves.
    pub fn label_for(&self, id: &PermissionId) -> String {
        self.get(id)
            .map(|r| r.display_name().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn labels_for<'a>(&self, ids: impl IntoIterator<Item = &'a PermissionId>) -> Vec<String> {
        ids.into_iter().map(|id| self.label_for(id)).collect()
    }

    /// Category key → member ids, members in catalog order.
    pub fn categories(&self) -> BTreeMap<String, Vec<PermissionId>> {
        let mut groups: BTreeMap<String, Vec<PermissionId>> = BTreeMap::new();
        for record in &self.records {
            groups
                .entry(record.category_key().to_string())
                .or_default()
                .push(record.id.clone());
        }
        groups
    }

    /// Ids in one category, in catalog order. Empty for unknown categories.
    pub fn category_ids(&self, category: &str) -> Vec<PermissionId> {
        self.records
            .iter()
            .filter(|r| r.category_key() == category)
            .map(|r| r.id.clone())
            .collect()
    }

    /// Case-insensitive substring match over label, value and id.
    pub fn search(&self, query: &str) -> Vec<&PermissionRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.records.iter().collect();
        }
        self.records
            .iter()
            .filter(|r| {
                r.id.as_str().to_lowercase().contains(&needle)
                    || r.label.as_deref().is_some_and(|s| s.to_lowercase().contains(&needle))
                    || r.value.as_deref().is_some_and(|s| s.to_lowercase().contains(&needle))
            })
            .collect()
    }

    pub fn critical(&self) -> impl Iterator<Item = &PermissionRecord> + '_ {
        self.records.iter().filter(|r| r.is_critical)
    }

    pub fn sensitive(&self) -> impl Iterator<Item = &PermissionRecord> + '_ {
        self.records.iter().filter(|r| r.is_sensitive)
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    fn dangling_references(&self) -> Vec<DanglingReference> {
        let mut dangling = Vec::new();
        for record in &self.records {
            let mut seen: FxHashSet<&PermissionId> = FxHashSet::default();
            for dep in &record.dependencies {
                if !self.contains(dep) && seen.insert(dep) {
                    dangling.push(DanglingReference {
                        permission: record.id.clone(),
                        missing: dep.clone(),
                    });
                }
            }
        }
        dangling
    }

    /// Report malformed data. The engine still operates on such catalogs.
    pub fn diagnostics(&self) -> CatalogReport {
        let mut self_references: Vec<PermissionId> = self
            .records
            .iter()
            .filter(|r| r.dependencies.contains(&r.id))
            .map(|r| r.id.clone())
            .collect();
        self_references.sort();

        let cycles = self.index.find_cycle_sccs();
        for group in &cycles {
            log::warn!(
                "dependency cycle: {}",
                group.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(" → ")
            );
        }

        CatalogReport {
            permission_count: self.records.len(),
            edge_count: self.index.edge_count(),
            duplicates: self.duplicates.clone(),
            dangling: self.dangling_references(),
            self_references,
            cycles,
        }
    }
}

/// A dependency that names no record in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingReference {
    pub permission: PermissionId,
    pub missing: PermissionId,
}

/// Catalog health summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogReport {
    pub permission_count: usize,
    pub edge_count: usize,
    pub duplicates: Vec<PermissionId>,
    pub dangling: Vec<DanglingReference>,
    pub self_references: Vec<PermissionId>,
    /// Cycle groups (size > 1, or a single self-referencing permission).
    pub cycles: Vec<Vec<PermissionId>>,
}

impl CatalogReport {
    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty()
            && self.dangling.is_empty()
            && self.self_references.is_empty()
            && self.cycles.is_empty()
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }
}
