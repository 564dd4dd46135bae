use kgviz_database::sqlx::SqliteConnection;
use kgviz_database::{Database, DbError, EntityRepository, RelationshipRepository};
use kgviz_models::{
    DeletedCounts, Entity, EntityFilter, GraphData, LinkRecord, NewEntity, NewRelationship,
    NodeRecord, Relationship, RelationshipFilter, SaveDataRequest, SaveDataSummary,
    UpdateEntityRequest, UpdateRelationshipRequest, ALL_DOMAINS, DEFAULT_DOMAIN,
};

use crate::errors::{GraphError, GraphResult};

/// Entity and relationship CRUD plus the whole-graph maintenance operations.
#[derive(Clone)]
pub struct GraphService {
    db: Database,
}

/// Outcome of an entity delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDeletion {
    pub deleted_relationships: i64,
}

/// Snapshot taken before `clear_all` wiped the store.
#[derive(Debug, Clone)]
pub struct ClearedGraph {
    pub backup: GraphData,
    pub deleted: DeletedCounts,
}

impl GraphService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Nodes and links of one domain, or everything for `None`.
    pub async fn graph_data(&self, domain: Option<&str>) -> GraphResult<GraphData> {
        let entities = EntityRepository::list_in_domain(self.db.pool(), domain).await?;
        let relationships = RelationshipRepository::list_in_domain(self.db.pool(), domain).await?;

        tracing::debug!(
            domain = domain.unwrap_or(ALL_DOMAINS),
            entities = entities.len(),
            relationships = relationships.len(),
            "Loaded graph data"
        );
        Ok(GraphData::from_rows(&entities, &relationships))
    }

    // --- entities ---

    pub async fn list_entities(&self, filter: &EntityFilter) -> GraphResult<Vec<Entity>> {
        Ok(EntityRepository::list(self.db.pool(), filter).await?)
    }

    pub async fn create_entity(&self, record: &NodeRecord) -> GraphResult<Entity> {
        let (id, name) = record
            .required()
            .ok_or_else(|| GraphError::validation("'id' and 'name' are required"))?;

        let new = NewEntity {
            id: id.to_string(),
            name: name.to_string(),
            entity_type: record.type_or_empty().to_string(),
            description: record.description_or_empty().to_string(),
            domain: record.domain_or_default().to_string(),
        };
        let entity = EntityRepository::insert(self.db.pool(), &new).await?;
        tracing::info!(id = %entity.id, domain = %entity.domain, "Entity created");
        Ok(entity)
    }

    pub async fn get_entity(&self, id: &str, domain: Option<&str>) -> GraphResult<Entity> {
        let mut conn = self.db.pool().acquire().await?;
        resolve_entity(&mut conn, id, domain).await
    }

    pub async fn update_entity(
        &self,
        id: &str,
        domain: Option<&str>,
        update: &UpdateEntityRequest,
    ) -> GraphResult<Entity> {
        let mut conn = self.db.pool().acquire().await?;
        let entity = resolve_entity(&mut conn, id, domain).await?;

        let name = match &update.name {
            None => entity.name.clone(),
            Some(Some(name)) if !name.is_empty() => name.clone(),
            Some(_) => return Err(GraphError::validation("'name' is required")),
        };
        let fields = NewEntity {
            id: entity.id.clone(),
            name,
            entity_type: merge_field(&update.entity_type, &entity.entity_type, ""),
            description: merge_field(&update.description, &entity.description, ""),
            domain: merge_field(&update.domain, &entity.domain, DEFAULT_DOMAIN),
        };

        let updated = EntityRepository::update(&mut *conn, entity.pk, &fields).await?;
        tracing::info!(id = %updated.id, domain = %updated.domain, "Entity updated");
        Ok(updated)
    }

    /// Deletes the entity and reports how many relationships went with it.
    pub async fn delete_entity(&self, id: &str, domain: Option<&str>) -> GraphResult<EntityDeletion> {
        let mut tx = self.db.begin().await?;
        let entity = resolve_entity(&mut tx, id, domain).await?;

        let deleted_relationships = RelationshipRepository::count_touching(&mut *tx, entity.pk).await?;
        EntityRepository::delete(&mut *tx, entity.pk).await?;
        tx.commit().await?;

        tracing::info!(
            id = %entity.id,
            domain = %entity.domain,
            deleted_relationships,
            "Entity deleted"
        );
        Ok(EntityDeletion {
            deleted_relationships,
        })
    }

    // --- relationships ---

    pub async fn list_relationships(&self, filter: &RelationshipFilter) -> GraphResult<Vec<Relationship>> {
        Ok(RelationshipRepository::list(self.db.pool(), filter).await?)
    }

    pub async fn create_relationship(&self, record: &LinkRecord) -> GraphResult<i64> {
        let (source, target, rel_type) = record
            .required()
            .ok_or_else(|| GraphError::validation("'source', 'target' and 'type' are required"))?;
        if source == target {
            return Err(GraphError::validation("source and target must be different"));
        }
        let domain = record.domain_or_default();

        let mut conn = self.db.pool().acquire().await?;
        let src = find_endpoint(&mut conn, source, domain).await?;
        let tgt = find_endpoint(&mut conn, target, domain).await?;
        let (src, tgt) = match (src, tgt) {
            (Some(s), Some(t)) => (s, t),
            _ => return Err(GraphError::not_found("source or target entity not found")),
        };

        let new = NewRelationship {
            source_pk: src.pk,
            target_pk: tgt.pk,
            rel_type: rel_type.to_string(),
            description: record.description_or_empty().to_string(),
            domain: domain.to_string(),
        };
        let id = RelationshipRepository::insert(&mut *conn, &new).await?;
        tracing::info!(id, source, target, rel_type, "Relationship created");
        Ok(id)
    }

    pub async fn get_relationship(&self, id: i64) -> GraphResult<Relationship> {
        RelationshipRepository::find(self.db.pool(), id)
            .await?
            .ok_or_else(|| GraphError::not_found("relationship not found"))
    }

    /// Applies the fields present in `update`; returns whether anything was sent.
    pub async fn update_relationship(
        &self,
        id: i64,
        update: &UpdateRelationshipRequest,
    ) -> GraphResult<bool> {
        let mut conn = self.db.pool().acquire().await?;
        let rel = RelationshipRepository::find(&mut *conn, id)
            .await?
            .ok_or_else(|| GraphError::not_found("relationship not found"))?;

        if update.is_empty() {
            return Ok(false);
        }

        let domain = merge_field(&update.domain, &rel.domain, DEFAULT_DOMAIN);
        let source_pk = match &update.source {
            Some(source) => find_endpoint(&mut conn, source, &domain)
                .await?
                .ok_or_else(|| GraphError::not_found(format!("Source entity {} not found", source)))?
                .pk,
            None => rel.source_pk,
        };
        let target_pk = match &update.target {
            Some(target) => find_endpoint(&mut conn, target, &domain)
                .await?
                .ok_or_else(|| GraphError::not_found(format!("Target entity {} not found", target)))?
                .pk,
            None => rel.target_pk,
        };
        if source_pk == target_pk {
            return Err(GraphError::validation("source and target must be different"));
        }

        let rel_type = match &update.rel_type {
            Some(Some(t)) if !t.is_empty() => t.clone(),
            _ => rel.rel_type.clone(),
        };
        let fields = NewRelationship {
            source_pk,
            target_pk,
            rel_type,
            description: merge_field(&update.description, &rel.description, ""),
            domain,
        };

        RelationshipRepository::update(&mut *conn, id, &fields).await?;
        tracing::info!(id, "Relationship updated");
        Ok(true)
    }

    pub async fn delete_relationship(&self, id: i64) -> GraphResult<()> {
        if !RelationshipRepository::delete(self.db.pool(), id).await? {
            return Err(GraphError::not_found("relationship not found"));
        }
        tracing::info!(id, "Relationship deleted");
        Ok(())
    }

    // --- maintenance ---

    /// Deletes every entity and relationship, returning what was there.
    pub async fn clear_all(&self) -> GraphResult<ClearedGraph> {
        let mut tx = self.db.begin().await?;

        let entities = EntityRepository::list_in_domain(&mut *tx, None).await?;
        let relationships = RelationshipRepository::list_in_domain(&mut *tx, None).await?;
        let backup = GraphData::from_rows(&entities, &relationships);

        RelationshipRepository::delete_in_domain(&mut *tx, None).await?;
        EntityRepository::delete_in_domain(&mut *tx, None).await?;
        tx.commit().await?;

        let deleted = DeletedCounts {
            entities: backup.nodes.len(),
            relationships: backup.links.len(),
        };
        tracing::warn!(
            entities = deleted.entities,
            relationships = deleted.relationships,
            "Graph cleared"
        );
        Ok(ClearedGraph { backup, deleted })
    }

    /// Replaces one domain (or everything, for `all`) with the client's copy.
    ///
    /// Nodes without an id or colliding with a saved node are skipped, as are
    /// links whose endpoints do not exist after the nodes are written.
    pub async fn save_data(&self, request: &SaveDataRequest) -> GraphResult<SaveDataSummary> {
        let scope = match request.current_domain.as_str() {
            "" | ALL_DOMAINS => None,
            domain => Some(domain),
        };

        let mut tx = self.db.begin().await?;
        RelationshipRepository::delete_in_domain(&mut *tx, scope).await?;
        EntityRepository::delete_in_domain(&mut *tx, scope).await?;

        let mut saved_entities = 0;
        for node in &request.nodes {
            let Some(id) = node.id.as_deref().filter(|id| !id.is_empty()) else {
                continue;
            };
            let new = NewEntity {
                id: id.to_string(),
                name: node.name.clone().unwrap_or_default(),
                entity_type: node.type_or_empty().to_string(),
                description: node.description_or_empty().to_string(),
                domain: scope.unwrap_or_else(|| node.domain_or_default()).to_string(),
            };
            match EntityRepository::insert(&mut *tx, &new).await {
                Ok(_) => saved_entities += 1,
                Err(DbError::AlreadyExists(what)) => {
                    tracing::debug!("Skipping duplicate node: {}", what);
                }
                Err(e) => return Err(e.into()),
            }
        }

        let mut saved_relationships = 0;
        for link in &request.links {
            let (Some(source), Some(target)) = (link.source.as_ref(), link.target.as_ref()) else {
                continue;
            };
            let domain = scope.unwrap_or_else(|| link.domain_or_default());
            let src = find_endpoint(&mut tx, source.id(), domain).await?;
            let tgt = find_endpoint(&mut tx, target.id(), domain).await?;
            let (Some(src), Some(tgt)) = (src, tgt) else {
                tracing::debug!(
                    source = source.id(),
                    target = target.id(),
                    "Skipping link with missing endpoint"
                );
                continue;
            };

            let new = NewRelationship {
                source_pk: src.pk,
                target_pk: tgt.pk,
                rel_type: link.rel_type.clone().unwrap_or_default(),
                description: link.description_or_empty().to_string(),
                domain: domain.to_string(),
            };
            match RelationshipRepository::insert(&mut *tx, &new).await {
                Ok(_) => saved_relationships += 1,
                Err(DbError::AlreadyExists(what)) => {
                    tracing::debug!("Skipping duplicate link: {}", what);
                }
                Err(e) => return Err(e.into()),
            }
        }

        tx.commit().await?;
        tracing::info!(
            domain = scope.unwrap_or(ALL_DOMAINS),
            saved_entities,
            saved_relationships,
            "Graph saved"
        );
        Ok(SaveDataSummary {
            saved_entities,
            saved_relationships,
        })
    }
}

/// New value for an optional nullable field: absent keeps `current`,
/// `null` or empty falls back to `empty`.
fn merge_field(update: &Option<Option<String>>, current: &str, empty: &str) -> String {
    match update {
        None => current.to_string(),
        Some(Some(value)) if !value.is_empty() => value.clone(),
        Some(_) => empty.to_string(),
    }
}

/// Looks up an entity by id. With a domain the match is exact; without one
/// the id must be unique across domains.
pub(crate) async fn resolve_entity(
    conn: &mut SqliteConnection,
    id: &str,
    domain: Option<&str>,
) -> GraphResult<Entity> {
    if let Some(domain) = domain.filter(|d| !d.is_empty() && *d != ALL_DOMAINS) {
        return EntityRepository::find(&mut *conn, id, domain)
            .await?
            .ok_or_else(|| GraphError::not_found("entity not found"));
    }

    let mut matches = EntityRepository::find_all_with_id(&mut *conn, id).await?;
    match matches.len() {
        0 => Err(GraphError::not_found("entity not found")),
        1 => Ok(matches.remove(0)),
        n => Err(GraphError::Conflict(format!(
            "entity id '{}' exists in {} domains, specify ?domain=",
            id, n
        ))),
    }
}

/// Endpoint lookup for relationships: the entity in `domain` if there is
/// one, otherwise the only entity carrying `id` anywhere.
pub(crate) async fn find_endpoint(
    conn: &mut SqliteConnection,
    id: &str,
    domain: &str,
) -> GraphResult<Option<Entity>> {
    if let Some(entity) = EntityRepository::find(&mut *conn, id, domain).await? {
        return Ok(Some(entity));
    }
    let mut matches = EntityRepository::find_all_with_id(&mut *conn, id).await?;
    Ok(if matches.len() == 1 {
        Some(matches.remove(0))
    } else {
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_field() {
        assert_eq!(merge_field(&None, "keep", ""), "keep");
        assert_eq!(merge_field(&Some(None), "keep", "default"), "default");
        assert_eq!(merge_field(&Some(Some(String::new())), "keep", ""), "");
        assert_eq!(merge_field(&Some(Some("new".into())), "keep", ""), "new");
    }
}
