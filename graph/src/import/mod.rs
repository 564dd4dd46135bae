pub mod planner;

pub use planner::{plan_import, ImportPlan, ImportSnapshot, Mutation};

use std::collections::{HashMap, HashSet};

use kgviz_database::sqlx::SqliteConnection;
use kgviz_database::{Database, EntityRepository, RelationshipRepository};
use kgviz_models::{ImportReport, ImportRequest, NewRelationship};

use crate::errors::{GraphError, GraphResult};

/// Loads the import domain, plans against it and applies the plan in one
/// transaction. Used by the HTTP endpoint and the admin CLI alike.
#[derive(Clone)]
pub struct ImportService {
    db: Database,
}

impl ImportService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn import(&self, request: &ImportRequest) -> GraphResult<ImportReport> {
        validate_domain(&request.domain)?;

        let mut tx = self.db.begin().await?;
        let snapshot = load_snapshot(&mut *tx, &request.domain).await?;
        let plan = plan_import(&snapshot, request);

        apply(&mut *tx, &request.domain, &snapshot, &plan.mutations).await?;
        tx.commit().await?;

        let stats = &plan.report.import_stats;
        tracing::info!(
            domain = %request.domain,
            strategy = %request.strategy,
            conflict_resolution = %request.conflict_resolution,
            entities_created = stats.entities.created,
            entities_updated = stats.entities.updated,
            relationships_created = stats.relationships.created,
            relationships_updated = stats.relationships.updated,
            conflicts = stats.conflicts.len(),
            "Import completed"
        );
        Ok(plan.report)
    }

    /// Plans without writing anything; the report carries `dry_run: true`.
    pub async fn dry_run(&self, request: &ImportRequest) -> GraphResult<ImportReport> {
        validate_domain(&request.domain)?;

        let mut conn = self.db.pool().acquire().await?;
        let snapshot = load_snapshot(&mut *conn, &request.domain).await?;
        let mut report = plan_import(&snapshot, request).report;
        report.dry_run = true;

        tracing::info!(domain = %request.domain, "Import dry run planned");
        Ok(report)
    }
}

fn validate_domain(domain: &str) -> GraphResult<()> {
    if domain.trim().is_empty() || domain == kgviz_models::ALL_DOMAINS {
        return Err(GraphError::validation(format!(
            "'{}' is not a valid import domain",
            domain
        )));
    }
    Ok(())
}

/// Entities of `domain` and the relationships of `domain` between them.
pub async fn load_snapshot(conn: &mut SqliteConnection, domain: &str) -> GraphResult<ImportSnapshot> {
    let entities = EntityRepository::list_in_domain(&mut *conn, Some(domain)).await?;
    let pks: HashSet<i64> = entities.iter().map(|e| e.pk).collect();

    let relationships = RelationshipRepository::list_in_domain(&mut *conn, Some(domain))
        .await?
        .into_iter()
        .filter(|r| pks.contains(&r.source_pk) && pks.contains(&r.target_pk))
        .collect();

    Ok(ImportSnapshot {
        entities,
        relationships,
    })
}

async fn apply(
    conn: &mut SqliteConnection,
    domain: &str,
    snapshot: &ImportSnapshot,
    mutations: &[Mutation],
) -> GraphResult<()> {
    let mut pks: HashMap<String, i64> = snapshot
        .entities
        .iter()
        .map(|e| (e.id.clone(), e.pk))
        .collect();
    let resolve = |pks: &HashMap<String, i64>, id: &str| {
        pks.get(id)
            .copied()
            .ok_or_else(|| GraphError::Internal(format!("unresolved entity '{}' in plan", id)))
    };

    for mutation in mutations {
        match mutation {
            Mutation::CreateEntity(new) => {
                let entity = EntityRepository::insert(&mut *conn, new).await?;
                pks.insert(entity.id, entity.pk);
            }
            Mutation::UpdateEntity {
                pk,
                entity_type,
                description,
            } => {
                EntityRepository::update_details(&mut *conn, *pk, entity_type, description).await?;
            }
            Mutation::CreateRelationship {
                source_id,
                target_id,
                rel_type,
                description,
            } => {
                let new = NewRelationship {
                    source_pk: resolve(&pks, source_id)?,
                    target_pk: resolve(&pks, target_id)?,
                    rel_type: rel_type.clone(),
                    description: description.clone(),
                    domain: domain.to_string(),
                };
                RelationshipRepository::insert(&mut *conn, &new).await?;
            }
            Mutation::UpdateRelationship { id, description } => {
                RelationshipRepository::update_description(&mut *conn, *id, description).await?;
            }
        }
    }
    Ok(())
}
