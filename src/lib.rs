//! pageturn - book and page backend for the storybook app.
//!
//! Books own an ordered set of pages. Each page holds a position that is
//! unique within its book; the mobile app renders pages in ascending
//! position order. Pages may embed a web view (game, coloring page) by
//! reference.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MOBILE / ADMIN CLIENTS                     │
//! └───────────────────────────────┬─────────────────────────────────┘
//!                                 │ JSON over HTTP
//! ┌───────────────────────────────┴─────────────────────────────────┐
//! │                           API (axum)                            │
//! │  books, pages, reorder, repair, web views, status               │
//! └───────────────────────────────┬─────────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────┴─────────────────────────────────┐
//! │                        STORE (SQLite)                           │
//! │  UNIQUE (book_id, position), two-phase reorder in one txn       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Ordering guarantees
//!
//! - **No duplicate positions at rest**: enforced by a unique index.
//! - **Swaps never collide**: reorders park pages on negative
//!   placeholders before writing final positions.
//! - **All or nothing**: a reorder that fails leaves the book untouched.

// === Core Modules ===

/// Record types.
pub mod model;

/// SQLite-backed store.
pub mod store;

/// REST API.
pub mod api;

// === Re-exports ===

pub use model::{Book, NewPage, ObjectId, Page, PageMove, PageOrder, WebView};
pub use store::{PageStore, ReorderResult, RepairResult, StoreConfig, StoreError};
