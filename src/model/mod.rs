//! Record types for pageturn.
//!
//! Books own an ordered set of pages. Pages may embed a web view
//! (game, coloring page, web experience) by reference.

pub mod book;
pub mod id;
pub mod order;
pub mod page;
pub mod webview;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub use book::{Book, BookPatch, NewBook};
pub use id::{IdError, ObjectId};
pub use order::{check_moves, PageMove, PageOrder};
pub use page::{check_position, NewPage, Page, PagePatch, MAX_POSITION};
pub use webview::{NewWebView, WebView, WebViewSummary};

/// Input rejected before touching the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("Position {0} is negative; positions must be zero or greater")]
    NegativePosition(i64),

    #[error("Position {0} is too large; positions must not exceed {max}", max = page::MAX_POSITION)]
    PositionTooLarge(i64),

    #[error("Page {0} appears more than once in the requested order")]
    DuplicatePage(ObjectId),

    #[error("Position {0} is requested for more than one page")]
    DuplicatePosition(i64),

    #[error("pageOrder must be a list")]
    PageOrderNotList,

    #[error(transparent)]
    Id(#[from] IdError),
}

/// Require a non-blank string.
pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

/// Deserialize a field that distinguishes "absent" from "null".
///
/// Absent leaves the outer `Option` as `None` (via `#[serde(default)]`);
/// an explicit `null` yields `Some(None)`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
