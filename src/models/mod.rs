//! Data models for Biblio

pub mod book;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookInput, BookListing, BookSummary, Genre, ListFormat};
pub use user::{CreateUser, NewUser, Role, User, UserRecord};
