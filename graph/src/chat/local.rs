use std::collections::HashSet;
use std::fmt::Write;

use kgviz_models::chat::{ChatRequest, GraphSnapshot, SnapshotLink, SnapshotNode};
use kgviz_models::graph::LinkEndpoint;
use kgviz_models::DEFAULT_DOMAIN;

use super::rules::{mentions, RuleTable};

const UNKNOWN_RELATION: &str = "unknown";

/// Rule-based answers computed from the snapshot the client sent along.
#[derive(Debug, Clone, Default)]
pub struct LocalResponder {
    rules: RuleTable,
}

impl LocalResponder {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules }
    }

    pub fn respond(&self, request: &ChatRequest) -> String {
        Conversation::new(&self.rules, request).answer()
    }

    /// Snapshot nodes ranked by how well they match `query`, best first.
    /// Nodes scoring zero are left out.
    pub fn search<'a>(&self, graph: &'a GraphSnapshot, query: &str) -> Vec<&'a SnapshotNode> {
        search(&self.rules, graph, &query.to_lowercase())
    }
}

/// Occurrence counts in first-seen order.
pub(crate) fn tally<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(&'a str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for key in keys {
        match counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += 1,
            None => counts.push((key, 1)),
        }
    }
    counts
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// At most `max_chars` characters of `text`.
pub(crate) fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn relation_type(link: &SnapshotLink) -> &str {
    if link.rel_type.is_empty() {
        UNKNOWN_RELATION
    } else {
        &link.rel_type
    }
}

fn has_latin(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_lowercase())
}

fn score(rules: &RuleTable, node: &SnapshotNode, query: &str) -> u32 {
    let w = &rules.weights;
    let name = node.name.to_lowercase();
    let id = node.id.to_lowercase();
    let description = node.description.to_lowercase();
    let entity_type = node.entity_type.to_lowercase();
    let domain = node.domain.to_lowercase();

    let mut score = 0;

    if query == name {
        score += w.exact_name;
    } else if query == id {
        score += w.exact_id;
    }

    if name.contains(query) {
        score += w.name_contains;
    } else if id.contains(query) {
        score += w.id_contains;
    } else if description.contains(query) {
        score += w.description_contains;
    }

    for word in query.split_whitespace().filter(|w| w.chars().count() > 1) {
        if name.contains(word) {
            score += w.word_in_name;
        } else if description.contains(word) {
            score += w.word_in_description;
        } else if entity_type.contains(word) {
            score += w.word_in_type;
        } else if domain.contains(word) {
            score += w.word_in_domain;
        }
    }

    if has_latin(query) && has_latin(&name) {
        score += w.latin_script;
    }

    for topic in rules.topics.iter().filter(|t| query.contains(t.key.as_str())) {
        let hit = topic
            .keywords
            .iter()
            .any(|k| name.contains(k.as_str()) || description.contains(k.as_str()));
        if hit {
            score += w.topic;
        }
    }

    score
}

fn search<'a>(rules: &RuleTable, graph: &'a GraphSnapshot, query: &str) -> Vec<&'a SnapshotNode> {
    let mut scored: Vec<(&SnapshotNode, u32)> = graph
        .nodes
        .iter()
        .map(|node| (node, score(rules, node, query)))
        .filter(|(_, score)| *score > 0)
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.into_iter().map(|(node, _)| node).collect()
}

struct Conversation<'a> {
    rules: &'a RuleTable,
    graph: &'a GraphSnapshot,
    selected: Option<&'a SnapshotNode>,
    message: String,
    domains: Vec<(&'a str, usize)>,
    relation_types: Vec<(&'a str, usize)>,
}

impl<'a> Conversation<'a> {
    fn new(rules: &'a RuleTable, request: &'a ChatRequest) -> Self {
        let graph = &request.graph_data;
        Self {
            rules,
            graph,
            selected: request.selected_node.as_ref(),
            message: request.message.to_lowercase(),
            domains: tally(graph.nodes.iter().map(|n| n.domain.as_str())),
            relation_types: tally(graph.links.iter().map(relation_type)),
        }
    }

    fn total_nodes(&self) -> usize {
        self.graph.nodes.len()
    }

    fn total_links(&self) -> usize {
        self.graph.links.len()
    }

    fn mentions(&self, keywords: &[String]) -> bool {
        mentions(&self.message, keywords)
    }

    fn answer(&self) -> String {
        let keywords = &self.rules.keywords;

        if let Some(answer) = self.entity_query() {
            return answer;
        }
        if let Some(answer) = self.relation_query() {
            return answer;
        }
        if self.mentions(&keywords.summary) {
            return self.statistics_report();
        }
        if self.mentions(&keywords.recommend_fallback) {
            return self.recommendation_report();
        }
        if self.mentions(&keywords.help) {
            return help_text();
        }

        let hits = search(self.rules, self.graph, &self.message);
        if !hits.is_empty() {
            let limit = self.rules.fallback_list_limit.min(hits.len());
            return self.entity_list(&hits[..limit]);
        }
        self.generic_response()
    }

    fn entity_query(&self) -> Option<String> {
        let keywords = &self.rules.keywords;

        let named = self.graph.nodes.iter().find(|node| {
            let name = node.name.to_lowercase();
            name.chars().count() > 1 && self.message.contains(&name)
        });
        if let Some(node) = named {
            return Some(self.entity_detail(node));
        }

        let hits = search(self.rules, self.graph, &self.message);
        match hits.len() {
            0 => {}
            1 => return Some(self.entity_detail(hits[0])),
            n => {
                let limit = self.rules.search_list_limit.min(n);
                return Some(self.entity_list(&hits[..limit]));
            }
        }

        if self.mentions(&keywords.domain) {
            return Some(self.domain_report());
        }
        if self.mentions(&keywords.count) {
            return Some(self.statistics_report());
        }
        if self.mentions(&keywords.recommend) {
            return Some(self.recommendation_report());
        }
        None
    }

    fn relation_query(&self) -> Option<String> {
        let keywords = &self.rules.keywords;
        if !self.mentions(&keywords.relation) {
            return None;
        }
        if self.mentions(&keywords.relation_count) {
            return Some(format!("The graph currently has {} relations.", self.total_links()));
        }
        if self.mentions(&keywords.relation_type) {
            return Some(self.relation_type_report());
        }
        if self.mentions(&keywords.relation_path) {
            return Some(self.path_report());
        }
        Some(self.relation_type_report())
    }

    fn endpoint_name(&self, endpoint: &'a LinkEndpoint) -> &'a str {
        match endpoint.name() {
            Some(name) => name,
            None => self.graph.name_of(endpoint.id()),
        }
    }

    fn links_of(&self, id: &str) -> Vec<&'a SnapshotLink> {
        self.graph.links.iter().filter(|l| l.touches(id)).collect()
    }

    /// Neighbours of `id` in first-seen order.
    fn neighbours(&self, id: &str, limit: usize) -> Vec<&'a SnapshotNode> {
        let mut seen = HashSet::new();
        self.graph
            .links
            .iter()
            .filter_map(|link| link.other_end(id))
            .filter(|other| *other != id && seen.insert(*other))
            .take(limit)
            .filter_map(|other| self.graph.node(other))
            .collect()
    }

    fn entity_detail(&self, node: &SnapshotNode) -> String {
        let links = self.links_of(&node.id);
        let mut out = String::new();

        let _ = writeln!(out, "Found entity: {} (ID: {})", node.name, node.id);
        if node.domain != DEFAULT_DOMAIN {
            let _ = writeln!(out, "Domain: {}", node.domain);
        }
        if !node.description.is_empty() {
            let _ = writeln!(out, "Description: {}", node.description);
        }
        let _ = writeln!(out, "Relations: {}", links.len());

        if links.is_empty() {
            return out;
        }

        let types: Vec<&str> = tally(links.iter().map(|l| l.rel_type.as_str()))
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        let _ = writeln!(out, "Relation types: {}\n", types.join(", "));

        out.push_str("Relations in detail:\n");
        let limit = self.rules.detail_relation_limit;
        for link in links.iter().take(limit) {
            let _ = writeln!(
                out,
                "  • {} --[{}]--> {}",
                self.endpoint_name(&link.source),
                link.rel_type,
                self.endpoint_name(&link.target)
            );
        }
        if links.len() > limit {
            let _ = writeln!(out, "  ... and {} more relations", links.len() - limit);
        }

        let recommended = self.neighbours(&node.id, self.rules.detail_recommendation_limit);
        if !recommended.is_empty() {
            out.push_str("\nYou may also look at:\n");
            for rec in recommended {
                let _ = writeln!(out, "  • {} ({})", rec.name, rec.domain);
            }
        }
        out
    }

    fn entity_list(&self, nodes: &[&SnapshotNode]) -> String {
        let mut out = format!("Found {} matching entities:\n\n", nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            let _ = write!(out, "{}. {} ({})", i + 1, node.name, node.domain);
            let description = truncate(&node.description, 30);
            if !description.is_empty() {
                let _ = write!(out, " - {}...", description);
            }
            out.push('\n');
        }
        if nodes.len() > 5 {
            out.push_str("\nTip: a more specific question will narrow these results down.");
        }
        out
    }

    fn domain_report(&self) -> String {
        let total = self.total_nodes();
        let mut out = String::from("Domain distribution of the knowledge graph:\n\n");
        for (domain, count) in &self.domains {
            let _ = writeln!(out, "• {}: {} entities ({:.1}%)", domain, count, percent(*count, total));
        }

        // First domain wins a tie.
        let busiest = self
            .domains
            .iter()
            .fold(None::<&(&str, usize)>, |best, entry| match best {
                Some(b) if b.1 >= entry.1 => Some(b),
                _ => Some(entry),
            });
        match busiest {
            Some((domain, count)) => {
                let _ = write!(out, "\nMost active domain: {} ({} entities)", domain, count);
            }
            None => out.push_str("The graph has no entities yet."),
        }
        out
    }

    fn statistics_report(&self) -> String {
        let nodes = self.total_nodes();
        let links = self.total_links();
        let average = if nodes == 0 { 0.0 } else { links as f64 / nodes as f64 };

        let mut out = String::from("Knowledge graph overview:\n\n");
        out.push_str("Totals:\n");
        let _ = writeln!(out, "  • Entities: {}", nodes);
        let _ = writeln!(out, "  • Relations: {}", links);
        let _ = writeln!(out, "  • Average degree: {:.1} (relations per entity)\n", average);

        out.push_str("Domains:\n");
        for (domain, count) in &self.domains {
            let _ = writeln!(out, "  • {}: {} entities ({:.1}%)", domain, count, percent(*count, nodes));
        }

        out.push_str("\nRelation types:\n");
        for (rel_type, count) in &self.relation_types {
            let _ = writeln!(out, "  • {}: {} relations ({:.1}%)", rel_type, count, percent(*count, links));
        }
        out
    }

    fn recommendation_report(&self) -> String {
        if let Some(selected) = self.selected {
            let recommended = self.neighbours(&selected.id, self.rules.recommendation_limit);
            if recommended.is_empty() {
                return format!("{} has no related recommendations yet.", selected.name);
            }
            let mut out = format!("Recommendations based on {}:\n\n", selected.name);
            for (i, rec) in recommended.iter().enumerate() {
                let _ = write!(out, "{}. {} ({})", i + 1, rec.name, rec.domain);
                let description = truncate(&rec.description, 40);
                if !description.is_empty() {
                    let _ = write!(out, "\n   {}...", description);
                }
                out.push('\n');
            }
            return out;
        }

        let mut busiest: Option<(&SnapshotNode, usize)> = None;
        for node in &self.graph.nodes {
            let degree = self.graph.links_of(&node.id).count();
            if busiest.map(|(_, best)| degree > best).unwrap_or(true) {
                busiest = Some((node, degree));
            }
        }
        match busiest {
            Some((node, degree)) => {
                format!("Most connected entity: {} ({} relations)", node.name, degree)
            }
            None => "Select an entity first and I can recommend related content.".to_string(),
        }
    }

    fn relation_type_report(&self) -> String {
        let total = self.total_links();
        let mut sorted = self.relation_types.clone();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));

        let mut out = String::from("Relation type analysis:\n\n");
        for (rel_type, count) in &sorted {
            let _ = writeln!(out, "• {}: {} relations ({:.1}%)", rel_type, count, percent(*count, total));
        }
        if let Some((rel_type, count)) = sorted.first() {
            let _ = write!(out, "\nMost common relation type: {} ({} relations)", rel_type, count);
        }
        out
    }

    fn path_report(&self) -> String {
        let Some(selected) = self.selected else {
            return "Select an entity first and I can analyze its connection paths.".to_string();
        };
        let links = self.links_of(&selected.id);
        if links.is_empty() {
            return format!("{} has no connections yet.", selected.name);
        }

        let mut groups: Vec<(&str, Vec<&SnapshotLink>)> = Vec::new();
        for link in links {
            let key = relation_type(link);
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, group)) => group.push(link),
                None => groups.push((key, vec![link])),
            }
        }

        let limit = self.rules.path_group_limit;
        let mut out = format!("Connection paths of {}:\n\n", selected.name);
        for (rel_type, group) in groups {
            let _ = writeln!(out, "{} relations ({}):", rel_type, group.len());
            for link in group.iter().take(limit) {
                let _ = writeln!(
                    out,
                    "  • {} --> {}",
                    self.endpoint_name(&link.source),
                    self.endpoint_name(&link.target)
                );
            }
            if group.len() > limit {
                let _ = writeln!(out, "  ... and {} more", group.len() - limit);
            }
            out.push('\n');
        }
        out
    }

    fn generic_response(&self) -> String {
        format!(
            "I understand your question. The current graph has {} entities and {} relations.\n\n\
             You can try:\n\
             • typing an entity name\n\
             • asking for statistics or a summary\n\
             • searching a topic such as AI, medical or finance\n\
             • asking for recommendations\n\n\
             Describe what you want to know and I will analyze it for you.",
            self.total_nodes(),
            self.total_links()
        )
    }
}

fn help_text() -> String {
    "I am the knowledge graph assistant. I can help with:\n\n\
     Analysis:\n\
     \x20 • entity counts and domain distribution\n\
     \x20 • relation types and connectivity\n\
     \x20 • connection paths of the selected entity\n\n\
     Search:\n\
     \x20 • exact entity lookup by name\n\
     \x20 • fuzzy keyword search over names, descriptions and types\n\
     \x20 • topic matching (ai, medical, finance, education, tech)\n\n\
     Recommendations:\n\
     \x20 • neighbours of the selected entity\n\
     \x20 • the most connected entity\n\n\
     Tips: type an entity name for details, ask for \"statistics\" for an overview, \
     or \"recommend\" for suggestions."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, name: &str, description: &str, domain: &str) -> SnapshotNode {
        SnapshotNode {
            id: id.into(),
            name: name.into(),
            entity_type: String::new(),
            description: description.into(),
            domain: domain.into(),
        }
    }

    fn link(source: &str, target: &str, rel_type: &str) -> SnapshotLink {
        SnapshotLink {
            source: source.into(),
            target: target.into(),
            rel_type: rel_type.into(),
            description: String::new(),
        }
    }

    fn graph() -> GraphSnapshot {
        GraphSnapshot {
            nodes: vec![
                node("ai", "Artificial Intelligence", "Machines that learn", "tech"),
                node("ml", "Machine Learning", "Learning from data", "tech"),
                node("dl", "Deep Learning", "Neural networks with many layers", "tech"),
                node("med", "医学影像", "医疗诊断", "medical"),
            ],
            links: vec![
                link("ml", "ai", "subfield_of"),
                link("dl", "ml", "subfield_of"),
                link("med", "dl", "applies"),
            ],
        }
    }

    fn ask(message: &str) -> String {
        LocalResponder::default().respond(&ChatRequest::new(message, graph()))
    }

    #[test]
    fn test_entity_name_in_message_gives_detail() {
        let answer = ask("Tell me about machine learning");
        assert!(answer.starts_with("Found entity: Machine Learning (ID: ml)"));
        assert!(answer.contains("Description: Learning from data"));
        assert!(answer.contains("Relations: 2"));
        assert!(answer.contains("Domain: tech"));
        assert!(answer.contains("Deep Learning --[subfield_of]--> Machine Learning"));
    }

    #[test]
    fn test_exact_name_outranks_partial_matches() {
        let responder = LocalResponder::default();
        let graph = graph();
        let hits = responder.search(&graph, "deep learning");
        assert_eq!(hits[0].id, "dl");
        assert!(hits.iter().any(|n| n.id == "ml"));
    }

    #[test]
    fn test_topic_bucket_matches_chinese_keywords() {
        let responder = LocalResponder::default();
        let graph = graph();
        let hits = responder.search(&graph, "medical");
        assert_eq!(hits.first().map(|n| n.id.as_str()), Some("med"));
    }

    #[test]
    fn test_help_and_generic_fallbacks() {
        assert!(ask("帮助").contains("knowledge graph assistant"));
        assert!(ask("？？").contains("4 entities and 3 relations"));
    }

    #[test]
    fn test_domain_report() {
        let answer = ask("领域");
        assert!(answer.contains("• tech: 3 entities (75.0%)"));
        assert!(answer.contains("Most active domain: tech (3 entities)"));
    }

    #[test]
    fn test_relation_type_report_sorted_by_count() {
        let answer = ask("关系类型");
        assert!(answer.contains("Most common relation type: subfield_of (2 relations)"));
    }

    #[test]
    fn test_path_report_needs_selection() {
        assert!(ask("连接").contains("Select an entity first"));

        let mut request = ChatRequest::new("关系 路径", graph());
        request.selected_node = graph().node("ml").cloned();
        let answer = LocalResponder::default().respond(&request);
        assert!(answer.starts_with("Connection paths of Machine Learning"));
        assert!(answer.contains("subfield_of relations (2):"));
    }

    #[test]
    fn test_recommendations_for_selected_node() {
        let mut request = ChatRequest::new("推荐", graph());
        request.selected_node = graph().node("ml").cloned();
        let answer = LocalResponder::default().respond(&request);
        assert!(answer.contains("1. Artificial Intelligence (tech)"));
        assert!(answer.contains("2. Deep Learning (tech)"));
    }

    #[test]
    fn test_most_connected_without_selection() {
        assert_eq!(ask("推荐"), "Most connected entity: Machine Learning (2 relations)");
    }

    #[test]
    fn test_statistics_on_empty_graph() {
        let request = ChatRequest::new("统计", GraphSnapshot::default());
        let answer = LocalResponder::default().respond(&request);
        assert!(answer.contains("Entities: 0"));
        assert!(answer.contains("Average degree: 0.0"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("医学影像诊断", 2), "医学");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn test_tally_keeps_first_seen_order() {
        let counts = tally(["b", "a", "b", "c", "b"].into_iter());
        assert_eq!(counts, vec![("b", 3), ("a", 1), ("c", 1)]);
    }
}
