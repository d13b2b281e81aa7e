//! Books repository

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    error::AppResult,
    models::book::{Book, BookInput, Genre},
};

#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Book>>;

    /// Case-insensitive substring match on the title
    async fn search_by_title(&self, fragment: &str) -> AppResult<Vec<Book>>;

    async fn get(&self, id: i32) -> AppResult<Option<Book>>;

    async fn create(&self, book: BookInput) -> AppResult<Book>;

    /// Returns `None` when no book has this id
    async fn update(&self, id: i32, book: BookInput) -> AppResult<Option<Book>>;

    /// Returns whether a book was removed
    async fn delete(&self, id: i32) -> AppResult<bool>;
}

#[derive(Default)]
pub struct InMemoryBooksRepository {
    books: RwLock<Vec<Book>>,
}

impl InMemoryBooksRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with a few classics
    pub fn with_sample_books() -> Self {
        let sample = vec![
            Book {
                id: 1,
                title: "Le Petit Prince".to_string(),
                author: "Antoine de Saint-Exupéry".to_string(),
                isbn: "978-2-07-040850-4".to_string(),
                year: Some(1943),
                genre: Some(Genre::Tale),
            },
            Book {
                id: 2,
                title: "Harry Potter".to_string(),
                author: "J.K. Rowling".to_string(),
                isbn: "978-0-7475-3269-9".to_string(),
                year: Some(1997),
                genre: Some(Genre::Fantasy),
            },
            Book {
                id: 3,
                title: "1984".to_string(),
                author: "George Orwell".to_string(),
                isbn: "978-0-14-103614-4".to_string(),
                year: Some(1949),
                genre: Some(Genre::ScienceFiction),
            },
        ];
        Self {
            books: RwLock::new(sample),
        }
    }
}

#[async_trait]
impl BookRepository for InMemoryBooksRepository {
    async fn list(&self) -> AppResult<Vec<Book>> {
        Ok(self.books.read().clone())
    }

    async fn search_by_title(&self, fragment: &str) -> AppResult<Vec<Book>> {
        let needle = fragment.to_lowercase();
        Ok(self
            .books
            .read()
            .iter()
            .filter(|b| b.title.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn get(&self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.books.read().iter().find(|b| b.id == id).cloned())
    }

    async fn create(&self, book: BookInput) -> AppResult<Book> {
        let mut books = self.books.write();
        let id = books.iter().map(|b| b.id).max().map_or(1, |max| max + 1);
        let book = book.into_book(id);
        books.push(book.clone());
        Ok(book)
    }

    async fn update(&self, id: i32, book: BookInput) -> AppResult<Option<Book>> {
        let mut books = self.books.write();
        Ok(books.iter_mut().find(|b| b.id == id).map(|stored| {
            *stored = book.into_book(id);
            stored.clone()
        }))
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut books = self.books.write();
        let before = books.len();
        books.retain(|b| b.id != id);
        Ok(books.len() != before)
    }
}
