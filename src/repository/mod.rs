//! Repository layer for stored entities

pub mod books;
pub mod users;

use std::sync::Arc;

pub use books::{BookRepository, InMemoryBooksRepository};
pub use users::{InMemoryUsersRepository, UserRepository};

/// Main repository struct holding every store behind its trait
#[derive(Clone)]
pub struct Repository {
    pub users: Arc<dyn UserRepository>,
    pub books: Arc<dyn BookRepository>,
}

impl Repository {
    pub fn new(users: Arc<dyn UserRepository>, books: Arc<dyn BookRepository>) -> Self {
        Self { users, books }
    }

    /// In-memory stores, with the catalog pre-filled with sample books
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryUsersRepository::new()),
            Arc::new(InMemoryBooksRepository::with_sample_books()),
        )
    }
}
