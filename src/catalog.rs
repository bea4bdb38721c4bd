use std::io;
use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use crate::model::Book;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("book not found: {0}")]
    NotFound(String),
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// The narrow contract the appointment engine needs from the book catalog.
///
/// Implementations may front a remote source, so both calls can suspend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookAvailability: Send + Sync {
    async fn get_book(&self, id: &str) -> Result<Book, CatalogError>;

    async fn set_available_copies(&self, id: &str, count: i64) -> Result<(), CatalogError>;
}

/// In-memory catalog keyed by book id.
pub struct InMemoryCatalog {
    books: DashMap<String, Book>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            books: DashMap::new(),
        }
    }

    pub fn with_books(books: impl IntoIterator<Item = Book>) -> Self {
        let catalog = Self::new();
        for book in books {
            catalog.insert(book);
        }
        catalog
    }

    /// Parse a JSON array of books. Later duplicates replace earlier ones.
    pub fn from_json(json: &str) -> io::Result<Self> {
        let books: Vec<Book> =
            serde_json::from_str(json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Self::with_books(books))
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn insert(&self, book: Book) {
        self.books.insert(book.id.clone(), book);
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// All books, sorted by id.
    pub fn books(&self) -> Vec<Book> {
        let mut books: Vec<Book> = self.books.iter().map(|e| e.value().clone()).collect();
        books.sort_by(|a, b| a.id.cmp(&b.id));
        books
    }
}

#[async_trait]
impl BookAvailability for InMemoryCatalog {
    async fn get_book(&self, id: &str) -> Result<Book, CatalogError> {
        self.books
            .get(id)
            .map(|e| e.value().clone())
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    async fn set_available_copies(&self, id: &str, count: i64) -> Result<(), CatalogError> {
        let mut book = self
            .books
            .get_mut(id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
        book.available_copies = count;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_and_set_copies() {
        let catalog = InMemoryCatalog::with_books([Book::new("b1", "Dune", "Frank Herbert", 3)]);
        assert_eq!(catalog.get_book("b1").await.unwrap().available_copies, 3);

        tokio_test::assert_ok!(catalog.set_available_copies("b1", 1).await);
        assert_eq!(catalog.get_book("b1").await.unwrap().available_copies, 1);
    }

    #[tokio::test]
    async fn unknown_book_is_not_found() {
        let catalog = InMemoryCatalog::new();
        tokio_test::assert_err!(catalog.get_book("").await);
        assert_eq!(
            catalog.get_book("nope").await,
            Err(CatalogError::NotFound("nope".into()))
        );
        assert_eq!(
            catalog.set_available_copies("nope", 1).await,
            Err(CatalogError::NotFound("nope".into()))
        );
    }

    #[test]
    fn seed_from_json_last_duplicate_wins() {
        let catalog = InMemoryCatalog::from_json(
            r#"[
                {"id":"/works/OL1W","title":"Dune","author":"Frank Herbert","availableCopies":2},
                {"id":"/works/OL2W","title":"Solaris","author":"Stanislaw Lem","availableCopies":1,"genre":"science_fiction"},
                {"id":"/works/OL1W","title":"Dune","author":"Frank Herbert","availableCopies":5}
            ]"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
        let books = catalog.books();
        assert_eq!(books[0].id, "/works/OL1W");
        assert_eq!(books[0].available_copies, 5);
        assert_eq!(books[1].genre, "science_fiction");
    }

    #[test]
    fn malformed_seed_is_invalid_data() {
        let err = InMemoryCatalog::from_json("{not json").err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn load_missing_file_fails() {
        let path = std::env::temp_dir().join("holdshelf_test_catalog_missing.json");
        let _ = std::fs::remove_file(&path);
        assert!(InMemoryCatalog::load(&path).is_err());
    }
}
