use chrono::Utc;
use kgviz_models::{Entity, EntityFilter, NewEntity};
use sqlx::{Executor, Sqlite};

use super::{domain_filter, search_term};
use crate::{DbError, DbResult};

const SELECT_ENTITY: &str =
    "SELECT pk, id, name, type, description, domain, created_at, updated_at FROM entities";

pub struct EntityRepository;

impl EntityRepository {
    pub async fn insert<'e, E>(executor: E, new: &NewEntity) -> DbResult<Entity>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        sqlx::query_as::<_, Entity>(
            r#"
            INSERT INTO entities (id, name, type, description, domain, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            RETURNING pk, id, name, type, description, domain, created_at, updated_at
            "#,
        )
        .bind(&new.id)
        .bind(&new.name)
        .bind(&new.entity_type)
        .bind(&new.description)
        .bind(&new.domain)
        .bind(now)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            DbError::unique(e, format!("entity '{}' in domain '{}'", new.id, new.domain))
        })
    }

    pub async fn find<'e, E>(executor: E, id: &str, domain: &str) -> DbResult<Option<Entity>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let entity = sqlx::query_as::<_, Entity>(&format!(
            "{SELECT_ENTITY} WHERE id = ?1 AND domain = ?2"
        ))
        .bind(id)
        .bind(domain)
        .fetch_optional(executor)
        .await?;
        Ok(entity)
    }

    /// Every row carrying `id`, across all domains.
    pub async fn find_all_with_id<'e, E>(executor: E, id: &str) -> DbResult<Vec<Entity>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let entities = sqlx::query_as::<_, Entity>(&format!(
            "{SELECT_ENTITY} WHERE id = ?1 ORDER BY pk"
        ))
        .bind(id)
        .fetch_all(executor)
        .await?;
        Ok(entities)
    }

    pub async fn list<'e, E>(executor: E, filter: &EntityFilter) -> DbResult<Vec<Entity>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let entities = sqlx::query_as::<_, Entity>(&format!(
            r#"{SELECT_ENTITY}
            WHERE (?1 IS NULL OR domain = ?1)
              AND (?2 IS NULL
                   OR instr(lower(id), lower(?2)) > 0
                   OR instr(lower(name), lower(?2)) > 0
                   OR instr(lower(description), lower(?2)) > 0)
            ORDER BY pk"#
        ))
        .bind(domain_filter(filter.domain.as_deref()))
        .bind(search_term(filter.q.as_deref()))
        .fetch_all(executor)
        .await?;
        Ok(entities)
    }

    /// Entities of one domain, or of every domain for `None`.
    pub async fn list_in_domain<'e, E>(executor: E, domain: Option<&str>) -> DbResult<Vec<Entity>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let entities = sqlx::query_as::<_, Entity>(&format!(
            "{SELECT_ENTITY} WHERE (?1 IS NULL OR domain = ?1) ORDER BY pk"
        ))
        .bind(domain_filter(domain))
        .fetch_all(executor)
        .await?;
        Ok(entities)
    }

    /// Rewrites every mutable column of the row at `pk`.
    pub async fn update<'e, E>(executor: E, pk: i64, fields: &NewEntity) -> DbResult<Entity>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Entity>(
            r#"
            UPDATE entities
            SET id = ?1, name = ?2, type = ?3, description = ?4, domain = ?5, updated_at = ?6
            WHERE pk = ?7
            RETURNING pk, id, name, type, description, domain, created_at, updated_at
            "#,
        )
        .bind(&fields.id)
        .bind(&fields.name)
        .bind(&fields.entity_type)
        .bind(&fields.description)
        .bind(&fields.domain)
        .bind(Utc::now())
        .bind(pk)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            DbError::unique(e, format!("entity '{}' in domain '{}'", fields.id, fields.domain))
        })
    }

    pub async fn update_details<'e, E>(
        executor: E,
        pk: i64,
        entity_type: &str,
        description: &str,
    ) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE entities SET type = ?1, description = ?2, updated_at = ?3 WHERE pk = ?4")
            .bind(entity_type)
            .bind(description)
            .bind(Utc::now())
            .bind(pk)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Deletes the row; relationships touching it go with it.
    pub async fn delete<'e, E>(executor: E, pk: i64) -> DbResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM entities WHERE pk = ?1")
            .bind(pk)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_in_domain<'e, E>(executor: E, domain: Option<&str>) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM entities WHERE (?1 IS NULL OR domain = ?1)")
            .bind(domain_filter(domain))
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count<'e, E>(executor: E) -> DbResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entities")
            .fetch_one(executor)
            .await?;
        Ok(count)
    }
}
