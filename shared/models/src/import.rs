use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::graph::{LinkRecord, NodeRecord};
use crate::DEFAULT_DOMAIN;

/// What to do with an incoming entity whose id already exists in the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Create the incoming entity under a fresh `<id>_<n>` id.
    #[default]
    AutoId,
    /// Fill only the empty fields of the existing entity.
    MergeData,
    /// Leave the existing entity untouched.
    Skip,
}

/// What to do with an incoming relationship that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStrategy {
    #[default]
    Merge,
    Skip,
    Overwrite,
    CreateNew,
}

impl ConflictResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictResolution::AutoId => "auto_id",
            ConflictResolution::MergeData => "merge_data",
            ConflictResolution::Skip => "skip",
        }
    }
}

impl ImportStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStrategy::Merge => "merge",
            ImportStrategy::Skip => "skip",
            ImportStrategy::Overwrite => "overwrite",
            ImportStrategy::CreateNew => "create_new",
        }
    }
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ImportStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto_id" => Ok(ConflictResolution::AutoId),
            "merge_data" => Ok(ConflictResolution::MergeData),
            "skip" => Ok(ConflictResolution::Skip),
            other => Err(format!(
                "unknown conflict resolution '{}', expected auto_id, merge_data or skip",
                other
            )),
        }
    }
}

impl FromStr for ImportStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge" => Ok(ImportStrategy::Merge),
            "skip" => Ok(ImportStrategy::Skip),
            "overwrite" => Ok(ImportStrategy::Overwrite),
            "create_new" => Ok(ImportStrategy::CreateNew),
            other => Err(format!(
                "unknown strategy '{}', expected merge, skip, overwrite or create_new",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
    #[serde(default)]
    pub strategy: ImportStrategy,
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default)]
    pub conflict_resolution: ConflictResolution,
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

impl ImportRequest {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            strategy: ImportStrategy::default(),
            domain: domain.into(),
            conflict_resolution: ConflictResolution::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityImportStats {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub conflicts: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationshipImportStats {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// A notable event during import, reported back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImportConflict {
    EntityIdConflict {
        original_id: String,
        new_id: String,
        message: String,
    },
    RelationshipEntityNotFound {
        source: String,
        target: String,
        message: String,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportStats {
    pub entities: EntityImportStats,
    pub relationships: RelationshipImportStats,
    pub conflicts: Vec<ImportConflict>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportReport {
    pub import_stats: ImportStats,
    /// Incoming id to stored id, for every entity that resolved to a row.
    pub entity_id_mapping: BTreeMap<String, String>,
    pub domain: String,
    pub strategy: ImportStrategy,
    pub conflict_resolution: ConflictResolution,
    pub dry_run: bool,
}

impl ImportReport {
    pub fn new(request: &ImportRequest) -> Self {
        Self {
            import_stats: ImportStats::default(),
            entity_id_mapping: BTreeMap::new(),
            domain: request.domain.clone(),
            strategy: request.strategy,
            conflict_resolution: request.conflict_resolution,
            dry_run: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req: ImportRequest = serde_json::from_str(r#"{"nodes": []}"#).unwrap();
        assert_eq!(req.domain, "default");
        assert_eq!(req.strategy, ImportStrategy::Merge);
        assert_eq!(req.conflict_resolution, ConflictResolution::AutoId);
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let err = serde_json::from_str::<ImportRequest>(r#"{"strategy": "replace"}"#);
        assert!(err.is_err());
        assert!("replace".parse::<ImportStrategy>().is_err());
        assert_eq!("create_new".parse::<ImportStrategy>(), Ok(ImportStrategy::CreateNew));
    }

    #[test]
    fn test_conflict_is_tagged_by_type() {
        let conflict = ImportConflict::EntityIdConflict {
            original_id: "1".into(),
            new_id: "1_1".into(),
            message: "exists".into(),
        };
        let value = serde_json::to_value(&conflict).unwrap();
        assert_eq!(value["type"], "entity_id_conflict");
        assert_eq!(value["new_id"], "1_1");
    }
}
