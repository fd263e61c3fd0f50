//! SQLite-backed storage for books, pages and web views.
//!
//! The store owns a single connection behind a mutex. Every public method
//! takes the lock once, so a multi-statement operation (create with
//! append, the two-phase reorder) runs without interleaving with any other
//! writer.
//!
//! Page positions are guarded by a `UNIQUE (book_id, position)` index that
//! SQLite checks on every row write, not at commit. Anything that moves
//! pages around has to go through [`PageStore::reorder_pages`].

pub mod config;
pub mod reorder;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{
    Book, BookPatch, NewBook, NewPage, NewWebView, ObjectId, Page, PagePatch, ValidationError,
    WebView, WebViewSummary,
};

pub use config::StoreConfig;
pub use reorder::{ReorderResult, RepairResult};

/// Errors that can occur in store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Book not found: {0}")]
    BookNotFound(ObjectId),

    #[error("Page not found: {0}")]
    PageNotFound(ObjectId),

    #[error("Web view not found: {0}")]
    WebViewNotFound(ObjectId),

    #[error("Position {position} is already taken in book {book_id}")]
    PositionConflict { book_id: ObjectId, position: i64 },

    #[error("No free position left after the last page of book {0}")]
    PositionOverflow(ObjectId),
}

pub type Result<T> = std::result::Result<T, StoreError>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS books (
    id          TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    author      TEXT,
    cover_url   TEXT,
    description TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS web_views (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    url         TEXT NOT NULL,
    cover       TEXT,
    kind        TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pages (
    id          TEXT PRIMARY KEY,
    book_id     TEXT NOT NULL REFERENCES books(id) ON DELETE CASCADE,
    position    INTEGER NOT NULL,
    text        TEXT,
    image_url   TEXT,
    audio_url   TEXT,
    web_view_id TEXT REFERENCES web_views(id) ON DELETE SET NULL,
    extra       TEXT NOT NULL DEFAULT '{}',
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS pages_book_position ON pages (book_id, position);
CREATE INDEX IF NOT EXISTS pages_web_view ON pages (web_view_id);
";

const PAGE_SELECT: &str = "
SELECT p.id, p.book_id, p.position, p.text, p.image_url, p.audio_url, p.extra,
       p.created_at, p.updated_at,
       w.id, w.url, w.name, w.cover, w.kind
FROM pages p
LEFT JOIN web_views w ON w.id = p.web_view_id";

/// Row counts reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub books: usize,
    pub pages: usize,

    /// Pages still holding a negative reorder placeholder.
    pub placeholder_pages: usize,
}

/// Persistent store for books, pages and web views.
pub struct PageStore {
    conn: Mutex<Connection>,
}

impl PageStore {
    /// Open (or create) the database described by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let path = config.database_path();
        let conn = Connection::open(&path)?;
        conn.busy_timeout(config.busy_timeout)?;

        let store = Self::init(conn)?;
        info!(path = %path.display(), "Page store opened");

        if config.repair_on_open {
            let repaired = store.repair_all()?;
            if repaired > 0 {
                warn!(repaired, "Normalized placeholder positions left by an earlier run");
            }
        }

        Ok(store)
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // === Books ===

    /// Create a book.
    pub fn create_book(&self, new: NewBook) -> Result<Book> {
        new.validate()?;

        let now = Utc::now();
        let book = Book {
            id: ObjectId::new(),
            title: new.title,
            author: new.author,
            cover_url: new.cover_url,
            description: new.description,
            created_at: now,
            updated_at: now,
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO books (id, title, author, cover_url, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                book.id,
                book.title,
                book.author,
                book.cover_url,
                book.description,
                book.created_at,
                book.updated_at
            ],
        )?;

        debug!(book_id = %book.id, title = %book.title, "Created book");

        Ok(book)
    }

    /// Get a book by ID.
    pub fn get_book(&self, id: &ObjectId) -> Result<Option<Book>> {
        let conn = self.conn.lock();
        fetch_book(&conn, id)
    }

    /// List all books, newest first.
    pub fn list_books(&self) -> Result<Vec<Book>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, title, author, cover_url, description, created_at, updated_at
             FROM books ORDER BY created_at DESC, id DESC",
        )?;
        let books = stmt
            .query_map([], row_to_book)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(books)
    }

    /// Apply a partial update to a book.
    pub fn update_book(&self, id: &ObjectId, patch: BookPatch) -> Result<Book> {
        patch.validate()?;

        let conn = self.conn.lock();
        let mut book = fetch_book(&conn, id)?.ok_or(StoreError::BookNotFound(*id))?;
        patch.apply(&mut book);

        conn.execute(
            "UPDATE books SET title = ?1, author = ?2, cover_url = ?3, description = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                book.title,
                book.author,
                book.cover_url,
                book.description,
                book.updated_at,
                book.id
            ],
        )?;

        debug!(book_id = %id, "Updated book");

        Ok(book)
    }

    /// Delete a book and all of its pages. Returns the number of pages removed.
    pub fn delete_book(&self, id: &ObjectId) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let pages: usize = tx.query_row(
            "SELECT COUNT(*) FROM pages WHERE book_id = ?1",
            params![id],
            |row| row.get(0),
        )?;

        if tx.execute("DELETE FROM books WHERE id = ?1", params![id])? == 0 {
            return Err(StoreError::BookNotFound(*id));
        }
        tx.commit()?;

        info!(book_id = %id, pages, "Deleted book");

        Ok(pages)
    }

    // === Web views ===

    /// Register a web view.
    pub fn create_web_view(&self, new: NewWebView) -> Result<WebView> {
        new.validate()?;

        let web_view = WebView {
            id: ObjectId::new(),
            name: new.name,
            url: new.url,
            cover: new.cover,
            kind: new.kind,
            description: new.description,
            created_at: Utc::now(),
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO web_views (id, name, url, cover, kind, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                web_view.id,
                web_view.name,
                web_view.url,
                web_view.cover,
                web_view.kind,
                web_view.description,
                web_view.created_at
            ],
        )?;

        debug!(web_view_id = %web_view.id, kind = %web_view.kind, "Created web view");

        Ok(web_view)
    }

    /// Get a web view by ID.
    pub fn get_web_view(&self, id: &ObjectId) -> Result<Option<WebView>> {
        let conn = self.conn.lock();
        let web_view = conn
            .query_row(
                "SELECT id, name, url, cover, kind, description, created_at
                 FROM web_views WHERE id = ?1",
                params![id],
                row_to_web_view,
            )
            .optional()?;
        Ok(web_view)
    }

    /// List web views by name.
    pub fn list_web_views(&self) -> Result<Vec<WebView>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, url, cover, kind, description, created_at
             FROM web_views ORDER BY name ASC, id ASC",
        )?;
        let web_views = stmt
            .query_map([], row_to_web_view)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(web_views)
    }

    /// Delete a web view. Pages that embedded it lose the reference.
    pub fn delete_web_view(&self, id: &ObjectId) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let detached: usize = tx.query_row(
            "SELECT COUNT(*) FROM pages WHERE web_view_id = ?1",
            params![id],
            |row| row.get(0),
        )?;

        if tx.execute("DELETE FROM web_views WHERE id = ?1", params![id])? == 0 {
            return Err(StoreError::WebViewNotFound(*id));
        }
        tx.commit()?;

        info!(web_view_id = %id, detached, "Deleted web view");

        Ok(detached)
    }

    // === Pages ===

    /// Create a page in a book.
    ///
    /// Without an explicit position the page is appended after the last
    /// page of the book.
    pub fn create_page(&self, book_id: &ObjectId, new: NewPage) -> Result<Page> {
        new.validate()?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        if !exists(&tx, "books", book_id)? {
            return Err(StoreError::BookNotFound(*book_id));
        }
        if let Some(web_view_id) = &new.web_view_id {
            if !exists(&tx, "web_views", web_view_id)? {
                return Err(StoreError::WebViewNotFound(*web_view_id));
            }
        }

        let position = match new.position {
            Some(position) => position,
            None => next_position(&tx, book_id)?,
        };

        let id = ObjectId::new();
        let now = Utc::now();
        let extra = serde_json::to_string(&new.extra)?;

        tx.execute(
            "INSERT INTO pages (id, book_id, position, text, image_url, audio_url, web_view_id, extra, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                book_id,
                position,
                new.text,
                new.image_url,
                new.audio_url,
                new.web_view_id,
                extra,
                now,
                now
            ],
        )
        .map_err(|e| conflict_or(e, book_id, position))?;

        let page = fetch_page(&tx, &id)?.ok_or(StoreError::PageNotFound(id))?;
        tx.commit()?;

        debug!(page_id = %id, book_id = %book_id, position, "Created page");

        Ok(page)
    }

    /// Get a page by ID, with its web view expanded.
    pub fn get_page(&self, id: &ObjectId) -> Result<Option<Page>> {
        let conn = self.conn.lock();
        fetch_page(&conn, id)
    }

    /// All pages of a book, ascending by position.
    pub fn list_pages(&self, book_id: &ObjectId) -> Result<Vec<Page>> {
        let conn = self.conn.lock();
        fetch_pages(&conn, book_id)
    }

    /// Edit a page's content. The position is left alone.
    pub fn update_page(&self, id: &ObjectId, mut patch: PagePatch) -> Result<Page> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let mut page = fetch_page(&tx, id)?.ok_or(StoreError::PageNotFound(*id))?;

        let web_view_id = match patch.web_view_id.take() {
            Some(Some(web_view_id)) => {
                if !exists(&tx, "web_views", &web_view_id)? {
                    return Err(StoreError::WebViewNotFound(web_view_id));
                }
                Some(web_view_id)
            }
            Some(None) => None,
            None => page.web_view.as_ref().map(|w| w.id),
        };

        patch.apply_content(&mut page);
        let extra = serde_json::to_string(&page.extra)?;

        tx.execute(
            "UPDATE pages SET text = ?1, image_url = ?2, audio_url = ?3, web_view_id = ?4, extra = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                page.text,
                page.image_url,
                page.audio_url,
                web_view_id,
                extra,
                page.updated_at,
                id
            ],
        )?;

        let page = fetch_page(&tx, id)?.ok_or(StoreError::PageNotFound(*id))?;
        tx.commit()?;

        debug!(page_id = %id, "Updated page content");

        Ok(page)
    }

    /// Delete a page. Remaining pages keep their positions.
    pub fn delete_page(&self, id: &ObjectId) -> Result<()> {
        let conn = self.conn.lock();

        if conn.execute("DELETE FROM pages WHERE id = ?1", params![id])? == 0 {
            return Err(StoreError::PageNotFound(*id));
        }

        debug!(page_id = %id, "Deleted page");

        Ok(())
    }

    /// Row counts for health reporting.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock();
        let stats = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM books),
                    (SELECT COUNT(*) FROM pages),
                    (SELECT COUNT(*) FROM pages WHERE position < 0)",
            [],
            |row| {
                Ok(StoreStats {
                    books: row.get(0)?,
                    pages: row.get(1)?,
                    placeholder_pages: row.get(2)?,
                })
            },
        )?;
        Ok(stats)
    }
}

// === Internal ===

fn row_to_book(row: &Row) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        cover_url: row.get(3)?,
        description: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn row_to_web_view(row: &Row) -> rusqlite::Result<WebView> {
    Ok(WebView {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        cover: row.get(3)?,
        kind: row.get(4)?,
        description: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Map a row of [`PAGE_SELECT`] to a page with its web view expanded.
fn row_to_page(row: &Row) -> rusqlite::Result<Page> {
    let extra_json: String = row.get(6)?;
    let extra = serde_json::from_str(&extra_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let web_view = match row.get::<_, Option<ObjectId>>(9)? {
        Some(id) => Some(WebViewSummary {
            id,
            url: row.get(10)?,
            name: row.get(11)?,
            cover: row.get(12)?,
            kind: row.get(13)?,
        }),
        None => None,
    };

    Ok(Page {
        id: row.get(0)?,
        book_id: row.get(1)?,
        position: row.get(2)?,
        text: row.get(3)?,
        image_url: row.get(4)?,
        audio_url: row.get(5)?,
        web_view,
        extra,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn fetch_book(conn: &Connection, id: &ObjectId) -> Result<Option<Book>> {
    let book = conn
        .query_row(
            "SELECT id, title, author, cover_url, description, created_at, updated_at
             FROM books WHERE id = ?1",
            params![id],
            row_to_book,
        )
        .optional()?;
    Ok(book)
}

fn fetch_page(conn: &Connection, id: &ObjectId) -> Result<Option<Page>> {
    let page = conn
        .query_row(&format!("{PAGE_SELECT} WHERE p.id = ?1"), params![id], row_to_page)
        .optional()?;
    Ok(page)
}

fn fetch_pages(conn: &Connection, book_id: &ObjectId) -> Result<Vec<Page>> {
    let mut stmt = conn.prepare(&format!(
        "{PAGE_SELECT} WHERE p.book_id = ?1 ORDER BY p.position ASC"
    ))?;
    let pages = stmt
        .query_map(params![book_id], row_to_page)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(pages)
}

fn exists(conn: &Connection, table: &'static str, id: &ObjectId) -> Result<bool> {
    let found = conn.query_row(
        &format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = ?1)"),
        params![id],
        |row| row.get(0),
    )?;
    Ok(found)
}

/// Highest settled position in a book, or 0 for an empty book.
fn last_position(conn: &Connection, book_id: &ObjectId) -> Result<i64> {
    let last: Option<i64> = conn.query_row(
        "SELECT MAX(position) FROM pages WHERE book_id = ?1 AND position >= 0",
        params![book_id],
        |row| row.get(0),
    )?;
    Ok(last.unwrap_or(0))
}

/// One past the highest settled position in a book (1 for an empty book).
fn next_position(conn: &Connection, book_id: &ObjectId) -> Result<i64> {
    last_position(conn, book_id)?
        .checked_add(1)
        .ok_or(StoreError::PositionOverflow(*book_id))
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Translate a unique-index failure on a page write into a position conflict.
fn conflict_or(e: rusqlite::Error, book_id: &ObjectId, position: i64) -> StoreError {
    if is_unique_violation(&e) {
        StoreError::PositionConflict {
            book_id: *book_id,
            position,
        }
    } else {
        StoreError::Database(e)
    }
}
