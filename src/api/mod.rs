//! API handlers for Biblio REST endpoints

pub mod auth;
pub mod books;
pub mod health;
pub mod openapi;
pub mod users;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::{AppError, AppResult},
    models::user::{Role, UserRecord},
    AppState,
};

/// Header carrying the caller's API key
pub const API_KEY_HEADER: &str = "api-key";

/// Extractor for the user behind the bearer token
pub struct AuthenticatedUser(pub UserRecord);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let user = state.services.auth.current_user(token).await?;
        Ok(AuthenticatedUser(user))
    }
}

/// Extractor for an authenticated user holding the admin role
pub struct AdminUser(pub UserRecord);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;
        let admin = state.services.auth.require_role(user, Role::Admin)?;
        Ok(AdminUser(admin))
    }
}

/// Token from an `Authorization: Bearer <token>` header, if any
fn bearer_token(headers: &HeaderMap) -> AppResult<Option<&str>> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AppError::Authentication("Invalid authorization header".to_string()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => Ok(Some(token.trim())),
        _ => Err(AppError::Authentication(
            "Invalid authorization header format".to_string(),
        )),
    }
}

/// Reject unknown API keys, then count the request against the caller's window
pub async fn api_key_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> AppResult<Response> {
    let api_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|key| state.api_keys.contains(*key))
        .ok_or_else(|| AppError::Authorization("Invalid API key".to_string()))?
        .to_string();

    let descriptor = format!("{} {}", request.method(), request.uri());
    state.services.rate_limiter.check(&api_key, &descriptor)?;

    Ok(next.run(request).await)
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        .route("/", get(health::welcome))
        // Authentication
        .route("/token", post(auth::login))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/search", get(books::search_books))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/me", get(users::me))
        .route("/users/:id", get(users::get_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_rate_limit,
        ))
        // Probes bypass the API key and the rate limit
        .route("/health", get(health::health_check))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
