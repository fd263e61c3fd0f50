//! Two-phase page reorder and placeholder repair.
//!
//! SQLite enforces `UNIQUE (book_id, position)` on every row write, so
//! moving pages one at a time straight to their targets fails as soon as
//! two pages trade places. The reorder therefore runs in two phases:
//!
//! 1. Quarantine: every listed page is parked on a distinct negative
//!    placeholder below anything already in the book.
//! 2. Commit: every listed page moves to its requested position. No listed
//!    page still occupies a non-negative slot, so these writes cannot
//!    collide with each other.
//!
//! Both phases run in one transaction while the connection lock is held.
//! Concurrent reorders of the same book serialize on that lock, and a
//! failure rolls everything back instead of stranding placeholders.

use chrono::Utc;
use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{conflict_or, exists, fetch_pages, last_position, PageStore, Result, StoreError};
use crate::model::{check_moves, check_position, ObjectId, Page, PageMove};

/// Result of a reorder.
#[derive(Debug, Clone, Serialize)]
pub struct ReorderResult {
    /// Number of pages actually moved.
    pub applied: usize,

    /// Placeholders from earlier failures normalized along the way.
    pub repaired: usize,

    /// The book's pages in their new order.
    pub pages: Vec<Page>,
}

/// Result of a placeholder repair.
#[derive(Debug, Clone, Serialize)]
pub struct RepairResult {
    /// Pages moved off placeholder positions.
    pub repaired: usize,

    /// The book's pages after repair.
    pub pages: Vec<Page>,
}

impl PageStore {
    /// Move pages of a book to new positions.
    ///
    /// Entries naming a page that does not belong to `book_id` have no
    /// effect, are not counted in `applied` and take no part in the
    /// duplicate checks. A target that collides with a page outside the
    /// request fails with [`StoreError::PositionConflict`] and changes
    /// nothing.
    pub fn reorder_pages(&self, book_id: &ObjectId, moves: &[PageMove]) -> Result<ReorderResult> {
        for mv in moves {
            check_position(mv.new_position)?;
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        if !exists(&tx, "books", book_id)? {
            return Err(StoreError::BookNotFound(*book_id));
        }

        let mut resolved = Vec::with_capacity(moves.len());
        for mv in moves {
            if belongs_to(&tx, book_id, &mv.page_id)? {
                resolved.push(*mv);
            } else {
                debug!(book_id = %book_id, page_id = %mv.page_id, "Reorder entry matched no page");
            }
        }
        check_moves(&resolved)?;

        // Phase 1: quarantine
        let floor = placeholder_floor(&tx, book_id)?;
        for (index, mv) in resolved.iter().enumerate() {
            let placeholder = floor
                .checked_sub(index as i64 + 1)
                .ok_or(StoreError::PositionOverflow(*book_id))?;
            set_position(&tx, book_id, &mv.page_id, placeholder)?;
        }
        debug!(book_id = %book_id, parked = resolved.len(), floor, "Parked pages on placeholders");

        // Phase 2: commit
        let now = Utc::now();
        let mut applied = 0;
        for mv in &resolved {
            applied += tx
                .execute(
                    "UPDATE pages SET position = ?1, updated_at = ?2 WHERE id = ?3 AND book_id = ?4",
                    params![mv.new_position, now, mv.page_id, book_id],
                )
                .map_err(|e| conflict_or(e, book_id, mv.new_position))?;
        }

        let repaired = normalize_placeholders(&tx, book_id)?;
        let pages = fetch_pages(&tx, book_id)?;
        tx.commit()?;

        info!(
            book_id = %book_id,
            requested = moves.len(),
            applied,
            repaired,
            "Reordered pages"
        );

        Ok(ReorderResult {
            applied,
            repaired,
            pages,
        })
    }

    /// Move every page of a book still holding a negative position to the
    /// end of the book.
    pub fn repair_book(&self, book_id: &ObjectId) -> Result<RepairResult> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        if !exists(&tx, "books", book_id)? {
            return Err(StoreError::BookNotFound(*book_id));
        }

        let repaired = normalize_placeholders(&tx, book_id)?;
        let pages = fetch_pages(&tx, book_id)?;
        tx.commit()?;

        if repaired > 0 {
            info!(book_id = %book_id, repaired, "Repaired placeholder positions");
        }

        Ok(RepairResult { repaired, pages })
    }

    /// Repair every book that has placeholder positions.
    ///
    /// A book with no room left after its last page is logged and left as
    /// it is; the other books are still repaired.
    pub fn repair_all(&self) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let books = {
            let mut stmt = tx.prepare("SELECT DISTINCT book_id FROM pages WHERE position < 0")?;
            let books = stmt
                .query_map([], |row| row.get::<_, ObjectId>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            books
        };

        let mut total = 0;
        for book_id in &books {
            match normalize_placeholders(&tx, book_id) {
                Ok(repaired) => {
                    warn!(book_id = %book_id, repaired, "Found stranded placeholder positions");
                    total += repaired;
                }
                Err(StoreError::PositionOverflow(_)) => {
                    warn!(book_id = %book_id, "No room to repair stranded placeholder positions");
                }
                Err(e) => return Err(e),
            }
        }
        tx.commit()?;

        Ok(total)
    }
}

/// Lowest position in use, capped at zero. Placeholders go below it.
fn placeholder_floor(conn: &Connection, book_id: &ObjectId) -> Result<i64> {
    let lowest: i64 = conn.query_row(
        "SELECT COALESCE(MIN(position), 0) FROM pages WHERE book_id = ?1",
        params![book_id],
        |row| row.get(0),
    )?;
    Ok(lowest.min(0))
}

fn belongs_to(conn: &Connection, book_id: &ObjectId, page_id: &ObjectId) -> Result<bool> {
    let found = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM pages WHERE id = ?1 AND book_id = ?2)",
        params![page_id, book_id],
        |row| row.get(0),
    )?;
    Ok(found)
}

fn set_position(conn: &Connection, book_id: &ObjectId, page_id: &ObjectId, position: i64) -> Result<usize> {
    conn.execute(
        "UPDATE pages SET position = ?1 WHERE id = ?2 AND book_id = ?3",
        params![position, page_id, book_id],
    )
    .map_err(|e| conflict_or(e, book_id, position))
}

/// Append negative-position pages after the last settled page, in
/// placeholder order (-1 first).
///
/// All targets are computed before the first write, so an overflow
/// leaves the book untouched.
fn normalize_placeholders(conn: &Connection, book_id: &ObjectId) -> Result<usize> {
    let stranded = {
        let mut stmt = conn.prepare(
            "SELECT id FROM pages WHERE book_id = ?1 AND position < 0 ORDER BY position DESC",
        )?;
        let ids = stmt
            .query_map(params![book_id], |row| row.get::<_, ObjectId>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        ids
    };

    if stranded.is_empty() {
        return Ok(0);
    }

    let last = last_position(conn, book_id)?;
    let targets = stranded
        .iter()
        .enumerate()
        .map(|(offset, page_id)| {
            last.checked_add(offset as i64 + 1)
                .map(|position| (page_id, position))
                .ok_or(StoreError::PositionOverflow(*book_id))
        })
        .collect::<Result<Vec<_>>>()?;

    for (page_id, position) in targets {
        set_position(conn, book_id, page_id, position)?;
    }

    Ok(stranded.len())
}
