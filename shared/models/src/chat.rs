use serde::{Deserialize, Serialize};

use crate::de::string_or_number;
use crate::graph::LinkEndpoint;
use crate::{ALL_DOMAINS, DEFAULT_DOMAIN};

/// Node in the client-held graph snapshot sent with a chat question.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SnapshotNode {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_domain")]
    pub domain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotLink {
    pub source: LinkEndpoint,
    pub target: LinkEndpoint,
    #[serde(default, rename = "type")]
    pub rel_type: String,
    #[serde(default)]
    pub description: String,
}

impl SnapshotLink {
    pub fn touches(&self, id: &str) -> bool {
        self.source.id() == id || self.target.id() == id
    }

    /// The endpoint opposite `id`, if the link touches it.
    pub fn other_end(&self, id: &str) -> Option<&str> {
        if self.source.id() == id {
            Some(self.target.id())
        } else if self.target.id() == id {
            Some(self.source.id())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<SnapshotNode>,
    #[serde(default)]
    pub links: Vec<SnapshotLink>,
}

impl GraphSnapshot {
    pub fn node(&self, id: &str) -> Option<&SnapshotNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Display name for an id, falling back to the id itself.
    pub fn name_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.node(id).map(|n| n.name.as_str()).unwrap_or(id)
    }

    pub fn links_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a SnapshotLink> + 'a {
        self.links.iter().filter(move |l| l.touches(id))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "graphData")]
    pub graph_data: GraphSnapshot,
    #[serde(default = "all_domains", rename = "currentDomain")]
    pub current_domain: String,
    #[serde(default, rename = "selectedNode")]
    pub selected_node: Option<SnapshotNode>,
    #[serde(default, rename = "selectedLink")]
    pub selected_link: Option<SnapshotLink>,
    #[serde(default = "default_true", rename = "useExternalAI")]
    pub use_external_ai: bool,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, graph_data: GraphSnapshot) -> Self {
        Self {
            message: message.into(),
            graph_data,
            current_domain: all_domains(),
            selected_node: None,
            selected_link: None,
            use_external_ai: false,
        }
    }
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn all_domains() -> String {
    ALL_DOMAINS.to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_from_client_payload() {
        let req: ChatRequest = serde_json::from_str(
            r#"{
                "message": "hello",
                "graphData": {
                    "nodes": [{"id": 1, "name": "A"}, {"id": "2", "name": "B", "domain": "ai"}],
                    "links": [{"source": {"id": 1, "name": "A"}, "target": "2", "type": "r"}]
                },
                "selectedNode": {"id": "1", "name": "A"}
            }"#,
        )
        .unwrap();

        assert!(req.use_external_ai);
        assert_eq!(req.current_domain, "all");
        assert_eq!(req.graph_data.nodes[0].domain, "default");
        assert_eq!(req.graph_data.name_of("2"), "B");
        assert_eq!(req.graph_data.links_of("1").count(), 1);
        assert_eq!(req.graph_data.links[0].other_end("2"), Some("1"));
        assert_eq!(req.selected_node.map(|n| n.id), Some("1".to_string()));
    }

    #[test]
    fn test_snapshot_node_without_id_is_accepted() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"message": "hi", "graphData": {"nodes": [{"name": "Loose"}, {"id": 7, "name": "Seven"}]}}"#,
        )
        .unwrap();

        assert_eq!(req.graph_data.nodes.len(), 2);
        assert_eq!(req.graph_data.nodes[0].id, "");
        assert_eq!(req.graph_data.name_of("7"), "Seven");
    }
}
