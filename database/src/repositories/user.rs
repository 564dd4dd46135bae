use chrono::Utc;
use kgviz_models::auth::{RegisterRequest, UpdateUserRequest, User, UserStats};
use sqlx::{Executor, Sqlite};

use super::search_term;
use crate::{DbError, DbResult};

const SELECT_USER: &str = r#"
    SELECT id, username, email, password_hash, first_name, last_name,
           is_active, is_staff, is_superuser, date_joined, last_login
    FROM users"#;

pub struct UserRepository;

impl UserRepository {
    pub async fn create<'e, E>(
        executor: E,
        input: &RegisterRequest,
        password_hash: &str,
        is_superuser: bool,
    ) -> DbResult<User>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name,
                               is_active, is_staff, is_superuser, date_joined)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            RETURNING id, username, email, password_hash, first_name, last_name,
                      is_active, is_staff, is_superuser, date_joined, last_login
            "#,
        )
        .bind(&input.username)
        .bind(&input.email)
        .bind(password_hash)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(input.is_active)
        .bind(input.is_staff || is_superuser)
        .bind(is_superuser)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
        .map_err(|e| DbError::unique(e, format!("user '{}'", input.username)))
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> DbResult<Option<User>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let user = sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    pub async fn find_by_username<'e, E>(executor: E, username: &str) -> DbResult<Option<User>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let user = sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE username = ?1"))
            .bind(username)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    /// Whether another user (not `except_id`) already uses `email`.
    pub async fn email_taken<'e, E>(executor: E, email: &str, except_id: Option<i64>) -> DbResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE email = ?1 AND (?2 IS NULL OR id != ?2)",
        )
        .bind(email)
        .bind(except_id)
        .fetch_one(executor)
        .await?;
        Ok(count > 0)
    }

    pub async fn username_taken<'e, E>(executor: E, username: &str) -> DbResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?1")
            .bind(username)
            .fetch_one(executor)
            .await?;
        Ok(count > 0)
    }

    /// Users matching `q` over username, email and names; `limit` caps the result.
    pub async fn list<'e, E>(executor: E, q: Option<&str>, limit: Option<i64>) -> DbResult<Vec<User>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"{SELECT_USER}
            WHERE ?1 IS NULL
               OR instr(lower(username), lower(?1)) > 0
               OR instr(lower(email), lower(?1)) > 0
               OR instr(lower(first_name), lower(?1)) > 0
               OR instr(lower(last_name), lower(?1)) > 0
            ORDER BY id
            LIMIT ?2"#
        ))
        .bind(search_term(q))
        .bind(limit.unwrap_or(-1))
        .fetch_all(executor)
        .await?;
        Ok(users)
    }

    pub async fn update<'e, E>(executor: E, id: i64, input: &UpdateUserRequest) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            UPDATE users
            SET email = COALESCE(?1, email),
                first_name = COALESCE(?2, first_name),
                last_name = COALESCE(?3, last_name),
                is_active = COALESCE(?4, is_active),
                is_staff = COALESCE(?5, is_staff)
            WHERE id = ?6
            "#,
        )
        .bind(input.email.as_deref())
        .bind(input.first_name.as_deref())
        .bind(input.last_name.as_deref())
        .bind(input.is_active)
        .bind(input.is_staff)
        .bind(id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn touch_last_login<'e, E>(executor: E, id: i64) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE users SET last_login = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> DbResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn stats<'e, E>(executor: E) -> DbResult<UserStats>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let stats = sqlx::query_as::<_, UserStats>(
            r#"
            SELECT COUNT(*) AS total_users,
                   COALESCE(SUM(CASE WHEN is_active THEN 1 ELSE 0 END), 0) AS active_users,
                   COALESCE(SUM(CASE WHEN is_active THEN 0 ELSE 1 END), 0) AS inactive_users,
                   COALESCE(SUM(CASE WHEN is_staff THEN 1 ELSE 0 END), 0) AS staff_users,
                   COALESCE(SUM(CASE WHEN is_superuser THEN 1 ELSE 0 END), 0) AS superusers
            FROM users
            "#,
        )
        .fetch_one(executor)
        .await?;
        Ok(stats)
    }
}
