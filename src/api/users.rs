//! User management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::user::{CreateUser, Role, User},
};

use super::{AdminUser, AuthenticatedUser};

/// List all users (admin only)
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("api_key" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "List of users", body = Vec<User>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<Vec<User>>> {
    let users = state.services.users.list_users().await?;
    Ok(Json(users))
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    security(("api_key" = [])),
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Admin accounts need an admin caller"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    caller: Option<AuthenticatedUser>,
    Json(user): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let caller = caller.map(|AuthenticatedUser(user)| user);
    let created = state
        .services
        .users
        .create_user(user, caller.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get the authenticated user
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    security(("api_key" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(User::from(user))
}

/// Get user details by ID (own record, or any record for admins)
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("api_key" = []), ("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 403, description = "Access denied"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<User>> {
    state
        .services
        .auth
        .require_self_or_role(user, id, Role::Admin)?;

    let user = state.services.users.get_by_id(id).await?;
    Ok(Json(user))
}
