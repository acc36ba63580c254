//! Named permission presets ("operator", "auditor", ...).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::permission_id::PermissionId;

/// A role preset: a fixed list of ids plus a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionTemplate {
    pub name: String,
    pub description: String,
    pub permissions: Vec<PermissionId>,
}

/// Template body as it appears in configuration, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDefinition {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<PermissionId>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TemplateDocument {
    Envelope { templates: BTreeMap<String, TemplateDefinition> },
    Bare(BTreeMap<String, TemplateDefinition>),
}

/// Templates ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSet {
    templates: BTreeMap<String, PermissionTemplate>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from name → definition pairs, rejecting blank names and ids.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = (String, TemplateDefinition)>,
    ) -> Result<Self, EngineError> {
        let mut set = Self::new();
        for (name, def) in definitions {
            set.insert(PermissionTemplate {
                name,
                description: def.description,
                permissions: def.permissions,
            })?;
        }
        Ok(set)
    }

    /// Parse `{"templates": {...}}` or a bare name → definition object.
    pub fn from_json(input: &str) -> Result<Self, EngineError> {
        let doc: TemplateDocument =
            serde_json::from_str(input).map_err(|e| EngineError::TemplateParse(e.to_string()))?;
        let definitions = match doc {
            TemplateDocument::Envelope { templates } => templates,
            TemplateDocument::Bare(templates) => templates,
        };
        Self::from_definitions(definitions)
    }

    /// Add or replace a template.
    pub fn insert(&mut self, template: PermissionTemplate) -> Result<(), EngineError> {
        if template.name.trim().is_empty() {
            return Err(EngineError::InvalidArgument("template name is empty".into()));
        }
        if template.permissions.iter().any(PermissionId::is_blank) {
            return Err(EngineError::InvalidArgument(format!(
                "template '{}' contains an empty permission id",
                template.name
            )));
        }
        self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&PermissionTemplate, EngineError> {
        self.templates
            .get(name)
            .ok_or_else(|| EngineError::UnknownTemplate(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionTemplate> + '_ {
        self.templates.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_envelope() {
        let json = r#"{"templates": {
            "operator": {"description": "Day-to-day ops", "permissions": [1, 2, "deliveries.track"]},
            "auditor": {"permissions": [5]}
        }}"#;
        let set = TemplateSet::from_json(json).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["auditor", "operator"]);

        let op = set.get("operator").unwrap();
        assert_eq!(op.description, "Day-to-day ops");
        assert_eq!(
            op.permissions,
            vec![
                PermissionId::from(1u64),
                PermissionId::from(2u64),
                PermissionId::from("deliveries.track"),
            ]
        );
        assert_eq!(set.get("auditor").unwrap().description, "");
    }

    #[test]
    fn test_parse_bare_map() {
        let set = TemplateSet::from_json(r#"{"basic": {"permissions": ["2"]}}"#).unwrap();
        assert_eq!(set.get("basic").unwrap().permissions, vec![PermissionId::from("2")]);
    }

    #[test]
    fn test_unknown_template() {
        let set = TemplateSet::new();
        assert_eq!(
            set.get("ghost").unwrap_err(),
            EngineError::UnknownTemplate("ghost".into())
        );
    }

    #[test]
    fn test_rejects_blank_ids() {
        let err = TemplateSet::from_json(r#"{"bad": {"permissions": ["1", " "]}}"#).unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[test]
    fn test_rejects_blank_name() {
        let mut set = TemplateSet::new();
        let err = set
            .insert(PermissionTemplate {
                name: "".into(),
                description: String::new(),
                permissions: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[test]
    fn test_parse_error() {
        let err = TemplateSet::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, EngineError::TemplateParse(_)));
    }
}
