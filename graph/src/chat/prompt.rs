use std::fmt::Write;

use kgviz_models::chat::{ChatRequest, GraphSnapshot, SnapshotLink};
use kgviz_models::graph::LinkEndpoint;
use kgviz_models::{ALL_DOMAINS, DEFAULT_DOMAIN};

use super::local::{tally, truncate};

const ENTITY_SAMPLE: usize = 20;
const LINK_SAMPLE: usize = 15;
const SELECTED_LINK_SAMPLE: usize = 10;

/// System and user messages for one chat completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn for_request(request: &ChatRequest) -> Self {
        Self {
            system: system_prompt(&context(request)),
            user: user_prompt(&request.message),
        }
    }
}

fn endpoint_name<'a>(graph: &'a GraphSnapshot, endpoint: &'a LinkEndpoint) -> &'a str {
    endpoint
        .name()
        .unwrap_or_else(|| graph.name_of(endpoint.id()))
}

fn describe_link(graph: &GraphSnapshot, link: &SnapshotLink) -> String {
    format!(
        "{} --[{}]--> {}",
        endpoint_name(graph, &link.source),
        link.rel_type,
        endpoint_name(graph, &link.target)
    )
}

/// Plain-text digest of the snapshot and the current selection.
pub fn context(request: &ChatRequest) -> String {
    let graph = &request.graph_data;
    let total_nodes = graph.nodes.len();
    let total_links = graph.links.len();
    let mut out = String::new();

    out.push_str("Knowledge graph report\n\n");
    out.push_str("Statistics:\n");
    let _ = writeln!(out, "- entities: {}", total_nodes);
    let _ = writeln!(out, "- relations: {}", total_links);
    let viewing = if request.current_domain == ALL_DOMAINS {
        "all domains"
    } else {
        request.current_domain.as_str()
    };
    let _ = writeln!(out, "- current domain: {}\n", viewing);

    out.push_str("Domains:\n");
    for (domain, count) in tally(graph.nodes.iter().map(|n| n.domain.as_str())) {
        let _ = writeln!(out, "  - {}: {} entities", domain, count);
    }

    out.push_str("\nRelation types:\n");
    for (rel_type, count) in tally(graph.links.iter().map(|l| {
        if l.rel_type.is_empty() {
            "unknown"
        } else {
            l.rel_type.as_str()
        }
    })) {
        let _ = writeln!(out, "  - {}: {} relations", rel_type, count);
    }

    let _ = writeln!(out, "\nEntities (first {}):", ENTITY_SAMPLE);
    for node in graph.nodes.iter().take(ENTITY_SAMPLE) {
        let _ = write!(out, "  - {} (ID: {})", node.name, node.id);
        if !node.description.is_empty() {
            let _ = write!(out, " - {}", truncate(&node.description, 50));
        }
        if !node.domain.is_empty() && node.domain != DEFAULT_DOMAIN {
            let _ = write!(out, " [domain: {}]", node.domain);
        }
        out.push('\n');
    }
    if total_nodes > ENTITY_SAMPLE {
        let _ = writeln!(out, "  ... and {} more entities", total_nodes - ENTITY_SAMPLE);
    }

    let _ = writeln!(out, "\nRelations (first {}):", LINK_SAMPLE);
    for link in graph.links.iter().take(LINK_SAMPLE) {
        let _ = write!(out, "  - {}", describe_link(graph, link));
        if !link.description.is_empty() {
            let _ = write!(out, " ({})", truncate(&link.description, 30));
        }
        out.push('\n');
    }
    if total_links > LINK_SAMPLE {
        let _ = writeln!(out, "  ... and {} more relations", total_links - LINK_SAMPLE);
    }

    if let Some(node) = &request.selected_node {
        let links: Vec<&SnapshotLink> = graph.links_of(&node.id).collect();
        out.push_str("\nSelected entity:\n");
        let _ = writeln!(out, "- name: {}", node.name);
        let _ = writeln!(out, "- id: {}", node.id);
        let _ = writeln!(out, "- type: {}", or(&node.entity_type, "unspecified"));
        let _ = writeln!(out, "- domain: {}", node.domain);
        let _ = writeln!(out, "- description: {}", or(&node.description, "none"));
        let _ = writeln!(out, "- relations: {}", links.len());
        for link in links.iter().take(SELECTED_LINK_SAMPLE) {
            let _ = writeln!(out, "  * {}", describe_link(graph, link));
        }
    }

    if let Some(link) = &request.selected_link {
        out.push_str("\nSelected relation:\n");
        let _ = writeln!(out, "- {}", describe_link(graph, link));
        let _ = writeln!(out, "- type: {}", link.rel_type);
        let _ = writeln!(out, "- description: {}", or(&link.description, "none"));
    }

    out
}

fn or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

fn system_prompt(context: &str) -> String {
    format!(
        "You are a knowledge graph assistant. Answer only from the graph data below; \
         do not use outside knowledge.\n\n\
         How to find entities:\n\
         1. exact match on an entity name in the entity list\n\
         2. entity names containing the query keywords\n\
         3. descriptions containing the query keywords\n\
         4. matching domains, then entity ids\n\n\
         Then use the relation list to describe how the entities found connect to others. \
         Quote concrete entity names, relation types and counts, and keep the answer well \
         structured. When the data holds nothing relevant, say \
         \"No related information was found in the provided data.\"\n\n\
         Current knowledge graph data:\n{}",
        context
    )
}

fn user_prompt(message: &str) -> String {
    format!(
        "User question: {}\n\n\
         Look for an exact entity name first, then for entities whose name, description \
         or id contains the keywords, and analyze their relations from the relation list. \
         Base every statement on the provided data.",
        message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgviz_models::chat::SnapshotNode;

    fn request() -> ChatRequest {
        let nodes = (0..25)
            .map(|i| SnapshotNode {
                id: i.to_string(),
                name: format!("Node {i}"),
                domain: if i == 0 { "ai".into() } else { "default".into() },
                description: if i == 0 { "x".repeat(80) } else { String::new() },
                ..Default::default()
            })
            .collect();
        let links = vec![SnapshotLink {
            source: LinkEndpoint::Node {
                id: "0".into(),
                name: Some("Embedded".into()),
            },
            target: "1".into(),
            rel_type: "rel".into(),
            description: String::new(),
        }];
        ChatRequest::new("what is node 0?", GraphSnapshot { nodes, links })
    }

    #[test]
    fn test_context_samples_and_clips() {
        let mut request = request();
        request.selected_node = request.graph_data.node("1").cloned();
        let text = context(&request);

        assert!(text.contains("- entities: 25"));
        assert!(text.contains("- current domain: all domains"));
        assert!(text.contains(&format!("  - Node 0 (ID: 0) - {} [domain: ai]", "x".repeat(50))));
        assert!(text.contains("... and 5 more entities"));
        assert!(!text.contains("Node 24 (ID: 24)"));
        assert!(text.contains("  - Embedded --[rel]--> Node 1"));
        assert!(text.contains("Selected entity:\n- name: Node 1"));
        assert!(text.contains("- type: unspecified"));
    }

    #[test]
    fn test_prompt_carries_question() {
        let prompt = Prompt::for_request(&request());
        assert!(prompt.user.starts_with("User question: what is node 0?"));
        assert!(prompt.system.contains("Current knowledge graph data:"));
    }
}
