//! Pure import planning.
//!
//! [`plan_import`] compares an import request against the stored state of
//! the target domain and produces the list of mutations to apply together
//! with the report the caller receives. Nothing here touches storage, so a
//! dry run is simply a plan that is never applied.

use std::collections::HashMap;

use kgviz_models::{
    ConflictResolution, Entity, ImportConflict, ImportReport, ImportRequest, ImportStrategy,
    NewEntity, Relationship,
};

/// Stored rows of the import domain.
#[derive(Debug, Clone, Default)]
pub struct ImportSnapshot {
    pub entities: Vec<Entity>,
    /// Relationships of the domain whose endpoints both belong to `entities`.
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateEntity(NewEntity),
    /// Rewrites type and description of an existing row.
    UpdateEntity {
        pk: i64,
        entity_type: String,
        description: String,
    },
    /// Endpoints are entity ids inside the import domain.
    CreateRelationship {
        source_id: String,
        target_id: String,
        rel_type: String,
        description: String,
    },
    UpdateRelationship { id: i64, description: String },
}

#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub mutations: Vec<Mutation>,
    pub report: ImportReport,
}

impl ImportPlan {
    pub fn is_noop(&self) -> bool {
        self.mutations.is_empty()
    }
}

/// Where an entity in the working set comes from.
#[derive(Debug, Clone, Copy)]
enum Origin {
    /// Stored row, with the index of its pending update if any
    Stored { pk: i64, update: Option<usize> },
    /// Created by this plan at the given mutation index
    Planned(usize),
}

#[derive(Debug, Clone)]
struct EntitySlot {
    entity_type: String,
    description: String,
    origin: Origin,
}

#[derive(Debug, Clone)]
struct RelationshipSlot {
    description: String,
    origin: Origin,
}

type EdgeKey = (String, String, String);

struct Planner {
    domain: String,
    mutations: Vec<Mutation>,
    entities: HashMap<String, EntitySlot>,
    relationships: HashMap<EdgeKey, RelationshipSlot>,
    report: ImportReport,
}

/// Plans the import of `request` into `request.domain`.
///
/// Every record lands in the import domain; a per-record `domain` field is
/// ignored. Entities are processed before relationships, and relationships
/// only resolve against entities named in the same request.
pub fn plan_import(snapshot: &ImportSnapshot, request: &ImportRequest) -> ImportPlan {
    let mut planner = Planner::new(snapshot, request);

    for node in &request.nodes {
        note_foreign_domain("node", node.domain.as_deref(), &request.domain);
        match node.required() {
            Some((id, name)) => {
                planner.plan_entity(id, name, node.type_or_empty(), node.description_or_empty())
            }
            None => planner.report.import_stats.entities.errors += 1,
        }
    }

    for link in &request.links {
        note_foreign_domain("link", link.domain.as_deref(), &request.domain);
        match link.required() {
            Some((source, target, rel_type)) if source != target => {
                planner.plan_relationship(source, target, rel_type, link.description_or_empty())
            }
            _ => planner.report.import_stats.relationships.errors += 1,
        }
    }

    ImportPlan {
        mutations: planner.mutations,
        report: planner.report,
    }
}

fn note_foreign_domain(kind: &str, record_domain: Option<&str>, import_domain: &str) {
    if let Some(domain) = record_domain.filter(|d| !d.is_empty() && *d != import_domain) {
        tracing::debug!(
            kind,
            record_domain = domain,
            import_domain,
            "Record domain ignored, importing into request domain"
        );
    }
}

impl Planner {
    fn new(snapshot: &ImportSnapshot, request: &ImportRequest) -> Self {
        let entities = snapshot
            .entities
            .iter()
            .map(|e| {
                (
                    e.id.clone(),
                    EntitySlot {
                        entity_type: e.entity_type.clone(),
                        description: e.description.clone(),
                        origin: Origin::Stored { pk: e.pk, update: None },
                    },
                )
            })
            .collect();

        let relationships = snapshot
            .relationships
            .iter()
            .map(|r| {
                (
                    (r.source_id.clone(), r.target_id.clone(), r.rel_type.clone()),
                    RelationshipSlot {
                        description: r.description.clone(),
                        origin: Origin::Stored { pk: r.id, update: None },
                    },
                )
            })
            .collect();

        Self {
            domain: request.domain.clone(),
            mutations: Vec::new(),
            entities,
            relationships,
            report: ImportReport::new(request),
        }
    }

    fn plan_entity(&mut self, id: &str, name: &str, entity_type: &str, description: &str) {
        let resolution = self.report.conflict_resolution;

        if !self.entities.contains_key(id) {
            self.create_entity(id, name, entity_type, description);
            self.map(id, id);
            return;
        }

        match resolution {
            ConflictResolution::Skip => {
                self.report.import_stats.entities.skipped += 1;
                self.map(id, id);
            }
            ConflictResolution::MergeData => {
                let changed = self.merge_entity(id, entity_type, description);
                if changed {
                    self.report.import_stats.entities.updated += 1;
                } else {
                    self.report.import_stats.entities.skipped += 1;
                }
                self.map(id, id);
            }
            ConflictResolution::AutoId => {
                let new_id = self.free_id(id);
                self.report.import_stats.entities.conflicts += 1;
                self.report.import_stats.conflicts.push(ImportConflict::EntityIdConflict {
                    original_id: id.to_string(),
                    new_id: new_id.clone(),
                    message: format!(
                        "Entity ID '{}' already exists, created as '{}'",
                        id, new_id
                    ),
                });
                self.create_entity(&new_id, name, entity_type, description);
                self.map(id, &new_id);
            }
        }
    }

    fn create_entity(&mut self, id: &str, name: &str, entity_type: &str, description: &str) {
        let index = self.mutations.len();
        self.mutations.push(Mutation::CreateEntity(NewEntity {
            id: id.to_string(),
            name: name.to_string(),
            entity_type: entity_type.to_string(),
            description: description.to_string(),
            domain: self.domain.clone(),
        }));
        self.entities.insert(
            id.to_string(),
            EntitySlot {
                entity_type: entity_type.to_string(),
                description: description.to_string(),
                origin: Origin::Planned(index),
            },
        );
        self.report.import_stats.entities.created += 1;
    }

    /// Fills empty type/description of `id`; returns whether anything changed.
    fn merge_entity(&mut self, id: &str, entity_type: &str, description: &str) -> bool {
        let Some(slot) = self.entities.get_mut(id) else {
            return false;
        };

        let mut changed = false;
        if slot.entity_type.is_empty() && !entity_type.is_empty() {
            slot.entity_type = entity_type.to_string();
            changed = true;
        }
        if slot.description.is_empty() && !description.is_empty() {
            slot.description = description.to_string();
            changed = true;
        }
        if !changed {
            return false;
        }

        let (new_type, new_description) = (slot.entity_type.clone(), slot.description.clone());
        match slot.origin {
            Origin::Planned(index) => {
                if let Some(Mutation::CreateEntity(new)) = self.mutations.get_mut(index) {
                    new.entity_type = new_type;
                    new.description = new_description;
                }
            }
            Origin::Stored { pk, update: Some(index) } => {
                self.mutations[index] = Mutation::UpdateEntity {
                    pk,
                    entity_type: new_type,
                    description: new_description,
                };
            }
            Origin::Stored { pk, update: None } => {
                slot.origin = Origin::Stored { pk, update: Some(self.mutations.len()) };
                self.mutations.push(Mutation::UpdateEntity {
                    pk,
                    entity_type: new_type,
                    description: new_description,
                });
            }
        }
        true
    }

    /// First `<id>_<n>` not taken by a stored or planned entity.
    fn free_id(&self, id: &str) -> String {
        (1..)
            .map(|n| format!("{}_{}", id, n))
            .find(|candidate| !self.entities.contains_key(candidate))
            .unwrap_or_else(|| format!("{}_{}", id, self.entities.len() + 1))
    }

    fn map(&mut self, from: &str, to: &str) {
        self.report
            .entity_id_mapping
            .insert(from.to_string(), to.to_string());
    }

    fn plan_relationship(&mut self, source: &str, target: &str, rel_type: &str, description: &str) {
        let mapping = &self.report.entity_id_mapping;
        let mapped = (mapping.get(source).cloned(), mapping.get(target).cloned());
        let (mapped_source, mapped_target) = match mapped {
            (Some(s), Some(t)) if s != t => (s, t),
            (Some(_), Some(_)) => {
                self.report.import_stats.relationships.errors += 1;
                return;
            }
            _ => {
                self.report.import_stats.relationships.errors += 1;
                self.report
                    .import_stats
                    .conflicts
                    .push(ImportConflict::RelationshipEntityNotFound {
                        source: source.to_string(),
                        target: target.to_string(),
                        message: "Source or target entity not found".to_string(),
                    });
                return;
            }
        };

        let key = (mapped_source, mapped_target, rel_type.to_string());
        let strategy = self.report.strategy;

        let Some(slot) = self.relationships.get_mut(&key) else {
            let index = self.mutations.len();
            self.mutations.push(Mutation::CreateRelationship {
                source_id: key.0.clone(),
                target_id: key.1.clone(),
                rel_type: key.2.clone(),
                description: description.to_string(),
            });
            self.relationships.insert(
                key,
                RelationshipSlot {
                    description: description.to_string(),
                    origin: Origin::Planned(index),
                },
            );
            self.report.import_stats.relationships.created += 1;
            return;
        };

        let replace = match strategy {
            ImportStrategy::Merge => slot.description.is_empty() && !description.is_empty(),
            ImportStrategy::Overwrite => !description.is_empty() && slot.description != description,
            ImportStrategy::Skip | ImportStrategy::CreateNew => false,
        };
        if !replace {
            self.report.import_stats.relationships.skipped += 1;
            return;
        }

        slot.description = description.to_string();
        match slot.origin {
            Origin::Planned(index) => {
                if let Some(Mutation::CreateRelationship { description: d, .. }) =
                    self.mutations.get_mut(index)
                {
                    *d = description.to_string();
                }
            }
            Origin::Stored { pk, update: Some(index) } => {
                self.mutations[index] = Mutation::UpdateRelationship {
                    id: pk,
                    description: description.to_string(),
                };
            }
            Origin::Stored { pk, update: None } => {
                slot.origin = Origin::Stored { pk, update: Some(self.mutations.len()) };
                self.mutations.push(Mutation::UpdateRelationship {
                    id: pk,
                    description: description.to_string(),
                });
            }
        }
        self.report.import_stats.relationships.updated += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kgviz_models::{LinkRecord, NodeRecord};

    fn stored_entity(pk: i64, id: &str, entity_type: &str, description: &str) -> Entity {
        Entity {
            pk,
            id: id.to_string(),
            name: format!("Stored {id}"),
            entity_type: entity_type.to_string(),
            description: description.to_string(),
            domain: "default".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn stored_relationship(id: i64, source: &str, target: &str, rel_type: &str, description: &str) -> Relationship {
        Relationship {
            id,
            source_pk: 0,
            target_pk: 0,
            source_id: source.to_string(),
            target_id: target.to_string(),
            rel_type: rel_type.to_string(),
            description: description.to_string(),
            domain: "default".to_string(),
            created_at: Utc::now(),
        }
    }

    fn request(nodes: Vec<NodeRecord>, links: Vec<LinkRecord>) -> ImportRequest {
        let mut req = ImportRequest::new("default");
        req.nodes = nodes;
        req.links = links;
        req
    }

    #[test]
    fn test_import_into_empty_domain_creates_everything() {
        let req = request(
            vec![NodeRecord::new("a", "A"), NodeRecord::new("b", "B")],
            vec![LinkRecord::new("a", "b", "knows")],
        );
        let plan = plan_import(&ImportSnapshot::default(), &req);

        let stats = &plan.report.import_stats;
        assert_eq!(stats.entities.created, 2);
        assert_eq!(stats.relationships.created, 1);
        assert_eq!(plan.mutations.len(), 3);
        assert_eq!(plan.report.entity_id_mapping.get("a").map(String::as_str), Some("a"));
    }

    #[test]
    fn test_auto_id_renames_and_relinks() {
        let snapshot = ImportSnapshot {
            entities: vec![stored_entity(1, "1", "", "")],
            relationships: vec![],
        };
        let req = request(
            vec![NodeRecord::new("1", "One again"), NodeRecord::new("2", "Two")],
            vec![LinkRecord::new("1", "2", "rel")],
        );
        let plan = plan_import(&snapshot, &req);
        let stats = &plan.report.import_stats;

        assert_eq!(plan.report.entity_id_mapping.get("1").map(String::as_str), Some("1_1"));
        assert_eq!(stats.entities.conflicts, 1);
        assert_eq!(stats.entities.created, 2);
        assert!(matches!(
            &stats.conflicts[0],
            ImportConflict::EntityIdConflict { original_id, new_id, .. } if original_id == "1" && new_id == "1_1"
        ));
        assert!(plan.mutations.contains(&Mutation::CreateRelationship {
            source_id: "1_1".into(),
            target_id: "2".into(),
            rel_type: "rel".into(),
            description: String::new(),
        }));
    }

    #[test]
    fn test_record_domain_does_not_redirect_import() {
        let mut node = NodeRecord::new("a", "A");
        node.domain = Some("other".to_string());
        let mut link = LinkRecord::new("a", "a2", "knows");
        link.domain = Some("other".to_string());
        let req = request(vec![node, NodeRecord::new("a2", "A2")], vec![link]);

        let plan = plan_import(&ImportSnapshot::default(), &req);
        assert_eq!(plan.report.import_stats.relationships.created, 1);
        assert!(plan.mutations.iter().all(|m| match m {
            Mutation::CreateEntity(new) => new.domain == "default",
            _ => true,
        }));
    }

    #[test]
    fn test_auto_id_skips_ids_taken_in_same_batch() {
        let snapshot = ImportSnapshot {
            entities: vec![stored_entity(1, "x", "", ""), stored_entity(2, "x_1", "", "")],
            relationships: vec![],
        };
        let req = request(vec![NodeRecord::new("x", "X"), NodeRecord::new("x", "X")], vec![]);
        let plan = plan_import(&snapshot, &req);

        let created: Vec<_> = plan
            .mutations
            .iter()
            .filter_map(|m| match m {
                Mutation::CreateEntity(e) => Some(e.id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(created, vec!["x_2", "x_3"]);
    }

    #[test]
    fn test_merge_data_fills_empty_fields_once() {
        let snapshot = ImportSnapshot {
            entities: vec![stored_entity(7, "e", "", "kept")],
            relationships: vec![],
        };
        let mut req = request(
            vec![NodeRecord::new("e", "E").with_type("concept").with_description("ignored")],
            vec![],
        );
        req.conflict_resolution = ConflictResolution::MergeData;

        let plan = plan_import(&snapshot, &req);
        assert_eq!(plan.report.import_stats.entities.updated, 1);
        assert_eq!(
            plan.mutations,
            vec![Mutation::UpdateEntity {
                pk: 7,
                entity_type: "concept".into(),
                description: "kept".into(),
            }]
        );

        // The same node again against the merged state changes nothing.
        let merged = ImportSnapshot {
            entities: vec![stored_entity(7, "e", "concept", "kept")],
            relationships: vec![],
        };
        let again = plan_import(&merged, &req);
        assert_eq!(again.report.import_stats.entities.updated, 0);
        assert_eq!(again.report.import_stats.entities.skipped, 1);
        assert!(again.is_noop());
    }

    #[test]
    fn test_skip_never_modifies_existing() {
        let snapshot = ImportSnapshot {
            entities: vec![stored_entity(1, "s", "", "")],
            relationships: vec![],
        };
        let mut req = request(
            vec![NodeRecord::new("s", "S").with_type("t").with_description("d")],
            vec![],
        );
        req.conflict_resolution = ConflictResolution::Skip;

        let plan = plan_import(&snapshot, &req);
        assert!(plan.is_noop());
        assert_eq!(plan.report.import_stats.entities.skipped, 1);
        assert_eq!(plan.report.entity_id_mapping.get("s").map(String::as_str), Some("s"));
    }

    #[test]
    fn test_invalid_records_are_counted_as_errors() {
        let req = request(
            vec![NodeRecord::default(), NodeRecord::new("a", ""), NodeRecord::new("b", "B")],
            vec![
                LinkRecord::new("b", "b", "self"),
                LinkRecord::new("b", "missing", "r"),
                LinkRecord { rel_type: None, ..LinkRecord::new("b", "b", "") },
            ],
        );
        let plan = plan_import(&ImportSnapshot::default(), &req);
        let stats = &plan.report.import_stats;

        assert_eq!(stats.entities.errors, 2);
        assert_eq!(stats.entities.created, 1);
        assert_eq!(stats.relationships.errors, 3);
        assert_eq!(stats.relationships.created, 0);
        assert!(stats.conflicts.iter().any(|c| matches!(
            c,
            ImportConflict::RelationshipEntityNotFound { target, .. } if target == "missing"
        )));
    }

    #[test]
    fn test_relationship_strategies() {
        let snapshot = ImportSnapshot {
            entities: vec![stored_entity(1, "a", "", ""), stored_entity(2, "b", "", "")],
            relationships: vec![stored_relationship(40, "a", "b", "r", "")],
        };
        let base = request(
            vec![NodeRecord::new("a", "A"), NodeRecord::new("b", "B")],
            vec![LinkRecord::new("a", "b", "r").with_description("new text")],
        );
        let with = |strategy: ImportStrategy| {
            let mut req = base.clone();
            req.conflict_resolution = ConflictResolution::Skip;
            req.strategy = strategy;
            plan_import(&snapshot, &req)
        };

        let merge = with(ImportStrategy::Merge);
        assert_eq!(merge.report.import_stats.relationships.updated, 1);
        assert_eq!(
            merge.mutations,
            vec![Mutation::UpdateRelationship { id: 40, description: "new text".into() }]
        );

        let skip = with(ImportStrategy::Skip);
        assert_eq!(skip.report.import_stats.relationships.skipped, 1);
        assert!(skip.is_noop());

        let create_new = with(ImportStrategy::CreateNew);
        assert_eq!(create_new.report.import_stats.relationships.skipped, 1);
        assert!(create_new.is_noop());
    }

    #[test]
    fn test_overwrite_replaces_differing_description() {
        let snapshot = ImportSnapshot {
            entities: vec![stored_entity(1, "a", "", ""), stored_entity(2, "b", "", "")],
            relationships: vec![stored_relationship(9, "a", "b", "r", "old")],
        };
        let mut req = request(
            vec![NodeRecord::new("a", "A"), NodeRecord::new("b", "B")],
            vec![
                LinkRecord::new("a", "b", "r").with_description("fresh"),
                LinkRecord::new("a", "b", "r").with_description("fresh"),
                LinkRecord::new("a", "b", "r"),
            ],
        );
        req.conflict_resolution = ConflictResolution::Skip;
        req.strategy = ImportStrategy::Overwrite;

        let plan = plan_import(&snapshot, &req);
        let stats = &plan.report.import_stats.relationships;
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.skipped, 2);

        // Merge keeps a non-empty description.
        req.strategy = ImportStrategy::Merge;
        let plan = plan_import(&snapshot, &req);
        assert_eq!(plan.report.import_stats.relationships.skipped, 3);
        assert!(plan.is_noop());
    }

    #[test]
    fn test_duplicate_links_in_batch_merge_into_one_create() {
        let req = request(
            vec![NodeRecord::new("a", "A"), NodeRecord::new("b", "B")],
            vec![
                LinkRecord::new("a", "b", "r"),
                LinkRecord::new("a", "b", "r").with_description("later"),
            ],
        );
        let plan = plan_import(&ImportSnapshot::default(), &req);
        let stats = &plan.report.import_stats.relationships;
        assert_eq!(stats.created, 1);
        assert_eq!(stats.updated, 1);

        let rels: Vec<_> = plan
            .mutations
            .iter()
            .filter(|m| matches!(m, Mutation::CreateRelationship { .. }))
            .collect();
        assert_eq!(rels.len(), 1);
        assert!(matches!(
            rels[0],
            Mutation::CreateRelationship { description, .. } if description == "later"
        ));
    }

    #[test]
    fn test_no_two_created_entities_share_an_id() {
        let snapshot = ImportSnapshot {
            entities: vec![stored_entity(1, "n", "", "")],
            relationships: vec![],
        };
        let req = request(
            vec![
                NodeRecord::new("n", "N"),
                NodeRecord::new("n_1", "N1"),
                NodeRecord::new("n", "N"),
                NodeRecord::new("m", "M"),
                NodeRecord::new("m", "M"),
            ],
            vec![],
        );
        let plan = plan_import(&snapshot, &req);

        let mut ids: Vec<_> = snapshot.entities.iter().map(|e| e.id.clone()).collect();
        ids.extend(plan.mutations.iter().filter_map(|m| match m {
            Mutation::CreateEntity(e) => Some(e.id.clone()),
            _ => None,
        }));
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }
}
