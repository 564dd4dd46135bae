use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::de::{double_option, opt_string_or_number, string_or_number};
use crate::DEFAULT_DOMAIN;

/// Entity row. `(id, domain)` is unique; `pk` is the internal row key that
/// relationships reference.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Entity {
    #[serde(skip)]
    pub pk: i64,
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub entity_type: String,
    pub description: String,
    pub domain: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Relationship row joined with the string ids of both endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Relationship {
    pub id: i64,
    #[serde(skip)]
    pub source_pk: i64,
    #[serde(skip)]
    pub target_pk: i64,
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub rel_type: String,
    pub description: String,
    pub domain: String,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntity {
    pub id: String,
    pub name: String,
    pub entity_type: String,
    pub description: String,
    pub domain: String,
}

/// Fields needed to insert a relationship between two stored entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelationship {
    pub source_pk: i64,
    pub target_pk: i64,
    pub rel_type: String,
    pub description: String,
    pub domain: String,
}

/// Node as rendered to the visualizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeView {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub description: String,
    pub domain: String,
}

/// Link as rendered to the visualizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub description: String,
    pub domain: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphData {
    pub nodes: Vec<NodeView>,
    pub links: Vec<LinkView>,
}

impl From<&Entity> for NodeView {
    fn from(e: &Entity) -> Self {
        Self {
            id: e.id.clone(),
            name: e.name.clone(),
            entity_type: e.entity_type.clone(),
            description: e.description.clone(),
            domain: e.domain.clone(),
        }
    }
}

impl From<&Relationship> for LinkView {
    fn from(r: &Relationship) -> Self {
        Self {
            id: Some(r.id),
            source: r.source_id.clone(),
            target: r.target_id.clone(),
            rel_type: r.rel_type.clone(),
            description: r.description.clone(),
            domain: r.domain.clone(),
        }
    }
}

impl GraphData {
    pub fn from_rows(entities: &[Entity], relationships: &[Relationship]) -> Self {
        Self {
            nodes: entities.iter().map(NodeView::from).collect(),
            links: relationships.iter().map(LinkView::from).collect(),
        }
    }
}

/// A link endpoint as sent by clients: either a bare id, or the node object
/// the force layout substituted for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LinkEndpoint {
    Id(#[serde(deserialize_with = "string_or_number")] String),
    Node {
        #[serde(deserialize_with = "string_or_number")]
        id: String,
        #[serde(default)]
        name: Option<String>,
    },
}

impl LinkEndpoint {
    pub fn id(&self) -> &str {
        match self {
            LinkEndpoint::Id(id) => id,
            LinkEndpoint::Node { id, .. } => id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            LinkEndpoint::Id(_) => None,
            LinkEndpoint::Node { name, .. } => name.as_deref(),
        }
    }
}

impl From<&str> for LinkEndpoint {
    fn from(id: &str) -> Self {
        LinkEndpoint::Id(id.to_string())
    }
}

/// Incoming node record (create, import, save-data). Every field is optional
/// on the wire so that validation can report what is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeRecord {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Used by entity and relationship creation; imports place every record
    /// in the request domain instead.
    #[serde(default)]
    pub domain: Option<String>,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Id and name, when both are present and non-empty.
    pub fn required(&self) -> Option<(&str, &str)> {
        match (self.id.as_deref(), self.name.as_deref()) {
            (Some(id), Some(name)) if !id.is_empty() && !name.is_empty() => Some((id, name)),
            _ => None,
        }
    }

    pub fn type_or_empty(&self) -> &str {
        self.entity_type.as_deref().unwrap_or("")
    }

    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    pub fn domain_or_default(&self) -> &str {
        self.domain.as_deref().filter(|d| !d.is_empty()).unwrap_or(DEFAULT_DOMAIN)
    }
}

/// Incoming link record (create, import, save-data).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LinkRecord {
    #[serde(default)]
    pub source: Option<LinkEndpoint>,
    #[serde(default)]
    pub target: Option<LinkEndpoint>,
    #[serde(default, rename = "type")]
    pub rel_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Used by entity and relationship creation; imports place every record
    /// in the request domain instead.
    #[serde(default)]
    pub domain: Option<String>,
}

impl LinkRecord {
    pub fn new(source: &str, target: &str, rel_type: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            target: Some(target.into()),
            rel_type: Some(rel_type.into()),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Source id, target id and type, when all three are present and non-empty.
    pub fn required(&self) -> Option<(&str, &str, &str)> {
        let source = self.source.as_ref().map(LinkEndpoint::id)?;
        let target = self.target.as_ref().map(LinkEndpoint::id)?;
        let rel_type = self.rel_type.as_deref()?;
        if source.is_empty() || target.is_empty() || rel_type.is_empty() {
            return None;
        }
        Some((source, target, rel_type))
    }

    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    pub fn domain_or_default(&self) -> &str {
        self.domain.as_deref().filter(|d| !d.is_empty()).unwrap_or(DEFAULT_DOMAIN)
    }
}

/// Partial entity update. `Some(None)` is an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEntityRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub name: Option<Option<String>>,
    #[serde(default, rename = "type", deserialize_with = "double_option")]
    pub entity_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub domain: Option<Option<String>>,
}

/// Partial relationship update. Endpoints are given as entity ids.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRelationshipRequest {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub target: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "double_option")]
    pub rel_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub domain: Option<Option<String>>,
}

impl UpdateRelationshipRequest {
    pub fn is_empty(&self) -> bool {
        self.source.is_none()
            && self.target.is_none()
            && self.rel_type.is_none()
            && self.description.is_none()
            && self.domain.is_none()
    }
}

/// `?domain=` selector; absent means every domain.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DomainQuery {
    pub domain: Option<String>,
}

impl DomainQuery {
    /// `None` selects every domain.
    pub fn selected(&self) -> Option<&str> {
        match self.domain.as_deref() {
            None | Some("") | Some(crate::ALL_DOMAINS) => None,
            Some(d) => Some(d),
        }
    }

    pub fn label(&self) -> &str {
        self.selected().unwrap_or(crate::ALL_DOMAINS)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityFilter {
    pub q: Option<String>,
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelationshipFilter {
    pub source: Option<String>,
    pub target: Option<String>,
    #[serde(rename = "type")]
    pub rel_type: Option<String>,
    pub domain: Option<String>,
}

/// Body of `save-data`: the full client-side state for one domain or all.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveDataRequest {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
    #[serde(default = "all_domains", rename = "currentDomain")]
    pub current_domain: String,
}

fn all_domains() -> String {
    crate::ALL_DOMAINS.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaveDataSummary {
    pub saved_entities: usize,
    pub saved_relationships: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeletedCounts {
    pub entities: usize,
    pub relationships: usize,
}
