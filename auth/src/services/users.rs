use kgviz_database::utils::{hash_password, verify_password};
use kgviz_database::{Database, UserRepository};
use kgviz_models::auth::{
    LoginRequest, RegisterRequest, UpdateUserRequest, User, UserListQuery, UserStats,
};
use validator::Validate;

use crate::errors::{AuthError, AuthResult};

/// Account management on top of the `users` table.
#[derive(Clone)]
pub struct UserService {
    db: Database,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(db: Database, bcrypt_cost: u32) -> Self {
        Self { db, bcrypt_cost }
    }

    pub async fn register(&self, request: &RegisterRequest) -> AuthResult<User> {
        self.create(request, false).await
    }

    /// Creates an account with every privilege; used by the admin CLI.
    pub async fn create_superuser(&self, request: &RegisterRequest) -> AuthResult<User> {
        self.create(request, true).await
    }

    async fn create(&self, request: &RegisterRequest, is_superuser: bool) -> AuthResult<User> {
        request.validate()?;

        if UserRepository::username_taken(self.db.pool(), &request.username).await? {
            return Err(AuthError::Conflict("username already exists".to_string()));
        }
        if UserRepository::email_taken(self.db.pool(), &request.email, None).await? {
            return Err(AuthError::Conflict("email already in use".to_string()));
        }

        let hash = hash_password(&request.password, self.bcrypt_cost)?;
        let user = UserRepository::create(self.db.pool(), request, &hash, is_superuser).await?;

        tracing::info!(user_id = user.id, username = %user.username, is_superuser, "User created");
        Ok(user)
    }

    pub async fn list(&self, query: &UserListQuery) -> AuthResult<Vec<User>> {
        Ok(UserRepository::list(self.db.pool(), query.search(), query.limit()).await?)
    }

    pub async fn get(&self, id: i64) -> AuthResult<User> {
        UserRepository::find_by_id(self.db.pool(), id)
            .await?
            .ok_or_else(|| AuthError::NotFound("user not found".to_string()))
    }

    pub async fn update(&self, id: i64, request: &UpdateUserRequest) -> AuthResult<User> {
        request.validate()?;
        self.get(id).await?;

        if let Some(email) = &request.email {
            if UserRepository::email_taken(self.db.pool(), email, Some(id)).await? {
                return Err(AuthError::Conflict("email already in use".to_string()));
            }
        }

        UserRepository::update(self.db.pool(), id, request).await?;
        tracing::info!(user_id = id, "User updated");
        self.get(id).await
    }

    /// Deletes `id` on behalf of `acting_user`. Superusers and the acting
    /// user's own account are never deleted.
    pub async fn delete(&self, id: i64, acting_user: Option<i64>) -> AuthResult<()> {
        let user = self.get(id).await?;
        if user.is_superuser {
            return Err(AuthError::Forbidden("superusers cannot be deleted".to_string()));
        }
        if acting_user == Some(id) {
            return Err(AuthError::Forbidden("you cannot delete your own account".to_string()));
        }

        UserRepository::delete(self.db.pool(), id).await?;
        tracing::info!(user_id = id, username = %user.username, "User deleted");
        Ok(())
    }

    /// Checks the credentials of an active account and stamps `last_login`.
    pub async fn login(&self, request: &LoginRequest) -> AuthResult<User> {
        request.validate()?;

        let user = UserRepository::find_by_username(self.db.pool(), &request.username)
            .await?
            .filter(|u| u.is_active && verify_password(&request.password, &u.password_hash));
        let Some(user) = user else {
            tracing::warn!(username = %request.username, "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        };

        UserRepository::touch_last_login(self.db.pool(), user.id).await?;
        tracing::info!(user_id = user.id, "User logged in");
        self.get(user.id).await
    }

    pub async fn stats(&self) -> AuthResult<UserStats> {
        Ok(UserRepository::stats(self.db.pool()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> UserService {
        UserService::new(Database::in_memory().await.unwrap(), 4)
    }

    #[tokio::test]
    async fn test_register_checks_uniqueness() {
        let users = service().await;
        users
            .register(&RegisterRequest::new("alice", "alice@example.com", "pw"))
            .await
            .unwrap();

        let same_name = users
            .register(&RegisterRequest::new("alice", "other@example.com", "pw"))
            .await;
        assert!(matches!(same_name, Err(AuthError::Conflict(msg)) if msg == "username already exists"));

        let same_email = users
            .register(&RegisterRequest::new("bob", "alice@example.com", "pw"))
            .await;
        assert!(matches!(same_email, Err(AuthError::Conflict(msg)) if msg == "email already in use"));

        let missing = users.register(&RegisterRequest::new("carl", "carl@example.com", "")).await;
        assert!(matches!(missing, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn test_login_requires_active_account() {
        let users = service().await;
        let user = users
            .register(&RegisterRequest::new("alice", "alice@example.com", "s3cret"))
            .await
            .unwrap();
        assert!(user.last_login.is_none());

        let login = |password: &str| LoginRequest {
            username: "alice".into(),
            password: password.into(),
        };
        assert!(matches!(users.login(&login("nope")).await, Err(AuthError::InvalidCredentials)));

        let logged_in = users.login(&login("s3cret")).await.unwrap();
        assert!(logged_in.last_login.is_some());

        let deactivate = UpdateUserRequest {
            is_active: Some(false),
            ..Default::default()
        };
        users.update(user.id, &deactivate).await.unwrap();
        assert!(matches!(users.login(&login("s3cret")).await, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_update_rechecks_email() {
        let users = service().await;
        users
            .register(&RegisterRequest::new("alice", "alice@example.com", "pw"))
            .await
            .unwrap();
        let bob = users
            .register(&RegisterRequest::new("bob", "bob@example.com", "pw"))
            .await
            .unwrap();

        let steal = UpdateUserRequest {
            email: Some("alice@example.com".into()),
            ..Default::default()
        };
        assert!(matches!(users.update(bob.id, &steal).await, Err(AuthError::Conflict(_))));

        let keep = UpdateUserRequest {
            email: Some("bob@example.com".into()),
            last_name: Some("Builder".into()),
            ..Default::default()
        };
        assert_eq!(users.update(bob.id, &keep).await.unwrap().last_name, "Builder");
    }

    #[tokio::test]
    async fn test_delete_guards() {
        let users = service().await;
        let root = users
            .create_superuser(&RegisterRequest::new("root", "root@example.com", "pw"))
            .await
            .unwrap();
        let bob = users
            .register(&RegisterRequest::new("bob", "bob@example.com", "pw"))
            .await
            .unwrap();

        assert!(matches!(users.delete(root.id, None).await, Err(AuthError::Forbidden(_))));
        assert!(matches!(users.delete(bob.id, Some(bob.id)).await, Err(AuthError::Forbidden(_))));
        users.delete(bob.id, Some(root.id)).await.unwrap();
        assert!(matches!(users.get(bob.id).await, Err(AuthError::NotFound(_))));

        let stats = users.stats().await.unwrap();
        assert_eq!(stats.total_users, 1);
        assert_eq!(stats.superusers, 1);
    }
}
