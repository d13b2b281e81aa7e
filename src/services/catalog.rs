//! Catalog management service

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookInput, BookListing, BookSearchQuery, BookSummary, ListFormat},
    repository::BookRepository,
};

#[derive(Clone)]
pub struct CatalogService {
    books: Arc<dyn BookRepository>,
}

impl CatalogService {
    pub fn new(books: Arc<dyn BookRepository>) -> Self {
        Self { books }
    }

    /// List all books, either as id/title pairs or in full
    pub async fn list_books(&self, format: ListFormat) -> AppResult<Vec<BookListing>> {
        let books = self.books.list().await?;
        Ok(match format {
            ListFormat::Simple => books
                .iter()
                .map(|b| BookListing::Simple(BookSummary::from(b)))
                .collect(),
            ListFormat::Detailed => books.into_iter().map(BookListing::Detailed).collect(),
        })
    }

    pub async fn search_books(&self, query: &BookSearchQuery) -> AppResult<Vec<Book>> {
        query.validate()?;
        self.books.search_by_title(&query.q).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.books
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    pub async fn create_book(&self, book: BookInput) -> AppResult<Book> {
        book.validate()?;
        let created = self.books.create(book).await?;
        tracing::info!(book_id = created.id, "Book created");
        Ok(created)
    }

    pub async fn update_book(&self, id: i32, book: BookInput) -> AppResult<Book> {
        book.validate()?;
        self.books
            .update(id, book)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        if !self.books.delete(id).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }
}
