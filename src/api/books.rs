//! Book (catalog) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::book::{Book, BookInput, BookListQuery, BookListing, BookSearchQuery},
};

use super::{AdminUser, AuthenticatedUser};

/// List all books
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("api_key" = [])),
    params(BookListQuery),
    responses(
        (status = 200, description = "List of books", body = Vec<BookListing>)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookListQuery>,
) -> AppResult<Json<Vec<BookListing>>> {
    let books = state.services.catalog.list_books(query.format).await?;
    Ok(Json(books))
}

/// Search books by title
#[utoipa::path(
    get,
    path = "/books/search",
    tag = "books",
    security(("api_key" = [])),
    params(BookSearchQuery),
    responses(
        (status = 200, description = "Matching books", body = Vec<Book>),
        (status = 400, description = "Empty search term")
    )
)]
pub async fn search_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookSearchQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.search_books(&query).await?;
    Ok(Json(books))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("api_key" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("api_key" = []), ("bearer_auth" = [])),
    request_body = BookInput,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(book): Json<BookInput>,
) -> AppResult<(StatusCode, Json<Book>)> {
    tracing::debug!(user_id = user.id, "Creating book");
    let created = state.services.catalog.create_book(book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Replace an existing book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("api_key" = []), ("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = BookInput,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(book): Json<BookInput>,
) -> AppResult<Json<Book>> {
    tracing::debug!(user_id = user.id, book_id = id, "Updating book");
    let updated = state.services.catalog.update_book(id, book).await?;
    Ok(Json(updated))
}

/// Delete a book (admin only)
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("api_key" = []), ("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin privileges required"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_book(id).await?;
    tracing::info!(admin_id = admin.id, book_id = id, "Book removed from catalog");
    Ok(StatusCode::NO_CONTENT)
}
