//! Authentication endpoints

use axum::{extract::State, Form, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppResult;

/// OAuth2 password-flow form
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    /// The user's email
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    /// Always "bearer"
    pub token_type: String,
}

/// Exchange credentials for an access token
#[utoipa::path(
    post,
    path = "/token",
    tag = "auth",
    request_body(content = LoginRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Incorrect username or password"),
        (status = 429, description = "Too many requests")
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Form(request): Form<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (token, _user) = state
        .services
        .auth
        .login(&request.username, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        access_token: token.token,
        token_type: "bearer".to_string(),
    }))
}
