use chrono::Utc;
use kgviz_models::{NewRelationship, Relationship, RelationshipFilter};
use sqlx::{Executor, Sqlite};

use super::{domain_filter, search_term};
use crate::{DbError, DbResult};

// Endpoint string ids come from the joined entity rows.
const SELECT_RELATIONSHIP: &str = r#"
    SELECT r.id, r.source_pk, r.target_pk, s.id AS source_id, t.id AS target_id,
           r.type, r.description, r.domain, r.created_at
    FROM relationships r
    JOIN entities s ON s.pk = r.source_pk
    JOIN entities t ON t.pk = r.target_pk"#;

pub struct RelationshipRepository;

impl RelationshipRepository {
    pub async fn insert<'e, E>(executor: E, new: &NewRelationship) -> DbResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO relationships (source_pk, target_pk, type, description, domain, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id
            "#,
        )
        .bind(new.source_pk)
        .bind(new.target_pk)
        .bind(&new.rel_type)
        .bind(&new.description)
        .bind(&new.domain)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
        .map_err(|e| DbError::unique(e, format!("relationship '{}'", new.rel_type)))?;
        Ok(id)
    }

    pub async fn find<'e, E>(executor: E, id: i64) -> DbResult<Option<Relationship>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rel = sqlx::query_as::<_, Relationship>(&format!("{SELECT_RELATIONSHIP} WHERE r.id = ?1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(rel)
    }

    /// The edge identified by its uniqueness key, if present.
    pub async fn find_existing<'e, E>(
        executor: E,
        source_pk: i64,
        target_pk: i64,
        rel_type: &str,
        domain: &str,
    ) -> DbResult<Option<Relationship>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rel = sqlx::query_as::<_, Relationship>(&format!(
            "{SELECT_RELATIONSHIP} WHERE r.source_pk = ?1 AND r.target_pk = ?2 AND r.type = ?3 AND r.domain = ?4"
        ))
        .bind(source_pk)
        .bind(target_pk)
        .bind(rel_type)
        .bind(domain)
        .fetch_optional(executor)
        .await?;
        Ok(rel)
    }

    pub async fn list<'e, E>(executor: E, filter: &RelationshipFilter) -> DbResult<Vec<Relationship>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rels = sqlx::query_as::<_, Relationship>(&format!(
            r#"{SELECT_RELATIONSHIP}
            WHERE (?1 IS NULL OR s.id = ?1)
              AND (?2 IS NULL OR t.id = ?2)
              AND (?3 IS NULL OR instr(lower(r.type), lower(?3)) > 0)
              AND (?4 IS NULL OR r.domain = ?4)
            ORDER BY r.id"#
        ))
        .bind(search_term(filter.source.as_deref()))
        .bind(search_term(filter.target.as_deref()))
        .bind(search_term(filter.rel_type.as_deref()))
        .bind(domain_filter(filter.domain.as_deref()))
        .fetch_all(executor)
        .await?;
        Ok(rels)
    }

    /// Relationships of one domain, or of every domain for `None`.
    pub async fn list_in_domain<'e, E>(
        executor: E,
        domain: Option<&str>,
    ) -> DbResult<Vec<Relationship>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rels = sqlx::query_as::<_, Relationship>(&format!(
            "{SELECT_RELATIONSHIP} WHERE (?1 IS NULL OR r.domain = ?1) ORDER BY r.id"
        ))
        .bind(domain_filter(domain))
        .fetch_all(executor)
        .await?;
        Ok(rels)
    }

    pub async fn update<'e, E>(executor: E, id: i64, fields: &NewRelationship) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            UPDATE relationships
            SET source_pk = ?1, target_pk = ?2, type = ?3, description = ?4, domain = ?5
            WHERE id = ?6
            "#,
        )
        .bind(fields.source_pk)
        .bind(fields.target_pk)
        .bind(&fields.rel_type)
        .bind(&fields.description)
        .bind(&fields.domain)
        .bind(id)
        .execute(executor)
        .await
        .map_err(|e| DbError::unique(e, format!("relationship '{}'", fields.rel_type)))?;
        Ok(())
    }

    pub async fn update_description<'e, E>(executor: E, id: i64, description: &str) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE relationships SET description = ?1 WHERE id = ?2")
            .bind(description)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> DbResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM relationships WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Relationships whose domain matches, plus any attached to entities of
    /// that domain (those go with the entities through the cascade).
    pub async fn delete_in_domain<'e, E>(executor: E, domain: Option<&str>) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            DELETE FROM relationships
            WHERE ?1 IS NULL
               OR domain = ?1
               OR source_pk IN (SELECT pk FROM entities WHERE domain = ?1)
               OR target_pk IN (SELECT pk FROM entities WHERE domain = ?1)
            "#,
        )
        .bind(domain_filter(domain))
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Number of relationships with `pk` at either end.
    pub async fn count_touching<'e, E>(executor: E, pk: i64) -> DbResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM relationships WHERE source_pk = ?1 OR target_pk = ?1",
        )
        .bind(pk)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    pub async fn count<'e, E>(executor: E) -> DbResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM relationships")
            .fetch_one(executor)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, EntityRepository};
    use kgviz_models::NewEntity;

    async fn entity(db: &Database, id: &str, domain: &str) -> i64 {
        EntityRepository::insert(
            db.pool(),
            &NewEntity {
                id: id.into(),
                name: id.into(),
                entity_type: String::new(),
                description: String::new(),
                domain: domain.into(),
            },
        )
        .await
        .unwrap()
        .pk
    }

    fn edge(source_pk: i64, target_pk: i64, rel_type: &str) -> NewRelationship {
        NewRelationship {
            source_pk,
            target_pk,
            rel_type: rel_type.into(),
            description: String::new(),
            domain: "default".into(),
        }
    }

    #[tokio::test]
    async fn test_insert_resolves_endpoint_ids() {
        let db = Database::in_memory().await.unwrap();
        let a = entity(&db, "a", "default").await;
        let b = entity(&db, "b", "default").await;

        let id = RelationshipRepository::insert(db.pool(), &edge(a, b, "knows")).await.unwrap();
        let rel = RelationshipRepository::find(db.pool(), id).await.unwrap().unwrap();
        assert_eq!(rel.source_id, "a");
        assert_eq!(rel.target_id, "b");
        assert_eq!(rel.rel_type, "knows");

        let dup = RelationshipRepository::insert(db.pool(), &edge(a, b, "knows")).await;
        assert!(matches!(dup, Err(DbError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_entity_delete_cascades() {
        let db = Database::in_memory().await.unwrap();
        let a = entity(&db, "a", "default").await;
        let b = entity(&db, "b", "default").await;
        let c = entity(&db, "c", "default").await;
        RelationshipRepository::insert(db.pool(), &edge(a, b, "r")).await.unwrap();
        RelationshipRepository::insert(db.pool(), &edge(c, a, "r")).await.unwrap();
        RelationshipRepository::insert(db.pool(), &edge(b, c, "r")).await.unwrap();

        assert_eq!(RelationshipRepository::count_touching(db.pool(), a).await.unwrap(), 2);
        EntityRepository::delete(db.pool(), a).await.unwrap();
        assert_eq!(RelationshipRepository::count(db.pool()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = Database::in_memory().await.unwrap();
        let a = entity(&db, "a", "default").await;
        let b = entity(&db, "b", "default").await;
        RelationshipRepository::insert(db.pool(), &edge(a, b, "contains")).await.unwrap();
        RelationshipRepository::insert(db.pool(), &edge(b, a, "based_on")).await.unwrap();

        let filter = RelationshipFilter { source: Some("a".into()), ..Default::default() };
        assert_eq!(RelationshipRepository::list(db.pool(), &filter).await.unwrap().len(), 1);

        let filter = RelationshipFilter { rel_type: Some("CONT".into()), ..Default::default() };
        let found = RelationshipRepository::list(db.pool(), &filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source_id, "a");

        let filter = RelationshipFilter { domain: Some("other".into()), ..Default::default() };
        assert!(RelationshipRepository::list(db.pool(), &filter).await.unwrap().is_empty());
    }
}
