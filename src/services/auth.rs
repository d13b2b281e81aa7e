//! Authentication and authorization: login, token resolution, role checks

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::user::{Role, UserRecord},
    repository::UserRepository,
    services::{
        password::PasswordHasher,
        tokens::{AccessToken, TokenService},
    },
};

const INVALID_CREDENTIALS: &str = "Incorrect username or password";
const CANNOT_VALIDATE: &str = "Could not validate credentials";

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: TokenService,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenService, hasher: PasswordHasher) -> Self {
        Self {
            users,
            tokens,
            hasher,
        }
    }

    /// Check a username (email) and password, returning a fresh access token
    pub async fn login(&self, username: &str, password: &str) -> AppResult<(AccessToken, UserRecord)> {
        let Some(user) = self.users.find_by_email(username).await? else {
            // Same hashing cost as a wrong password
            self.hasher.verify_unknown_blocking(password.to_string()).await?;
            tracing::warn!("Login failed: unknown user");
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        };

        let password_valid = self
            .hasher
            .verify_blocking(password.to_string(), user.password_hash.clone())
            .await?;
        if !password_valid {
            tracing::warn!(user_id = user.id, "Login failed: wrong password");
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        let token = self.tokens.issue(&user.email, None)?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok((token, user))
    }

    /// Resolve a bearer token to the user it was issued for
    pub async fn current_user(&self, token: Option<&str>) -> AppResult<UserRecord> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Authentication("Not authenticated".to_string()))?;

        let email = self.tokens.validate(token)?;

        self.users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::Authentication(CANNOT_VALIDATE.to_string()))
    }

    /// Pass the user through only when it holds `role`
    pub fn require_role(&self, user: UserRecord, role: Role) -> AppResult<UserRecord> {
        if user.has_role(role) {
            Ok(user)
        } else {
            Err(AppError::Authorization("Insufficient permissions".to_string()))
        }
    }

    /// Allow access to `target_id`'s own data, or to anyone holding `role`
    pub fn require_self_or_role(
        &self,
        user: UserRecord,
        target_id: i32,
        role: Role,
    ) -> AppResult<UserRecord> {
        if user.id == target_id || user.has_role(role) {
            Ok(user)
        } else {
            Err(AppError::Authorization("Access denied".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::user::NewUser,
        repository::{users::MockUserRepository, InMemoryUsersRepository},
        services::clock::ManualClock,
    };
    use argon2::Params;
    use chrono::Duration;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(Params::new(1024, 1, 1, None).unwrap())
    }

    fn tokens(clock: Arc<ManualClock>) -> TokenService {
        TokenService::new("guard-test-secret", Duration::minutes(30), clock).unwrap()
    }

    async fn register(repo: &InMemoryUsersRepository, email: &str, role: Role) -> UserRecord {
        repo.insert(NewUser {
            display_name: email.to_string(),
            email: email.to_string(),
            role,
            password_hash: hasher().hash("MotDePasse123").unwrap(),
        })
        .await
        .unwrap()
    }

    fn service(repo: Arc<InMemoryUsersRepository>, clock: Arc<ManualClock>) -> AuthService {
        AuthService::new(repo, tokens(clock), hasher())
    }

    #[tokio::test]
    async fn test_login_and_resolve() {
        let repo = Arc::new(InMemoryUsersRepository::new());
        let alice = register(&repo, "alice@example.com", Role::Member).await;
        let auth = service(repo, Arc::new(ManualClock::default()));

        let (token, user) = auth.login("alice@example.com", "MotDePasse123").await.unwrap();
        assert_eq!(user, alice);
        assert_eq!(auth.current_user(Some(&token.token)).await.unwrap(), alice);
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials_alike() {
        let repo = Arc::new(InMemoryUsersRepository::new());
        register(&repo, "alice@example.com", Role::Member).await;
        let auth = service(repo, Arc::new(ManualClock::default()));

        let wrong_password = auth.login("alice@example.com", "WrongPass1").await.unwrap_err();
        let unknown_user = auth.login("bob@example.com", "MotDePasse123").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
        assert!(matches!(wrong_password, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_unknown_user_still_pays_for_hashing() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(None));
        let hasher = hasher();
        let clock = Arc::new(ManualClock::default());
        let auth = AuthService::new(Arc::new(users), tokens(clock), hasher.clone());

        assert!(auth.login("ghost@example.com", "MotDePasse123").await.is_err());
        assert!(hasher.has_dummy_hash());
    }

    #[tokio::test]
    async fn test_missing_or_expired_token_is_unauthorized() {
        let repo = Arc::new(InMemoryUsersRepository::new());
        register(&repo, "alice@example.com", Role::Member).await;
        let clock = Arc::new(ManualClock::default());
        let auth = service(repo, clock.clone());

        assert!(matches!(auth.current_user(None).await, Err(AppError::Authentication(_))));
        assert!(matches!(auth.current_user(Some("")).await, Err(AppError::Authentication(_))));

        let (token, _) = auth.login("alice@example.com", "MotDePasse123").await.unwrap();
        clock.advance(Duration::minutes(30));
        match auth.current_user(Some(&token.token)).await {
            Err(AppError::Authentication(msg)) => assert_eq!(msg, "Token has expired"),
            other => panic!("Expected expired token, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_subject_is_unauthorized() {
        let clock = Arc::new(ManualClock::default());
        let tokens = tokens(clock);
        let token = tokens.issue("ghost@example.com", None).unwrap();

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(None));

        let auth = AuthService::new(Arc::new(users), tokens, hasher());
        assert!(matches!(
            auth.current_user(Some(&token.token)).await,
            Err(AppError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_role_checks() {
        let repo = Arc::new(InMemoryUsersRepository::new());
        let member = register(&repo, "member@example.com", Role::Member).await;
        let admin = register(&repo, "admin@example.com", Role::Admin).await;
        let auth = service(repo, Arc::new(ManualClock::default()));

        assert!(matches!(
            auth.require_role(member.clone(), Role::Admin),
            Err(AppError::Authorization(_))
        ));
        assert_eq!(auth.require_role(admin.clone(), Role::Admin).unwrap(), admin);

        // Own record is always readable, others only by admins
        assert!(auth.require_self_or_role(member.clone(), member.id, Role::Admin).is_ok());
        assert!(auth.require_self_or_role(member, admin.id, Role::Admin).is_err());
        assert!(auth.require_self_or_role(admin, 1, Role::Admin).is_ok());
    }
}
