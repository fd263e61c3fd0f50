//! Pages: ordered content records owned by a book.
//!
//! A page's `position` is unique within its book and defines display
//! order. Everything else on a page is payload the ordering logic never
//! reads. Feature-specific fields (video sequences, coloring flags and the
//! like) live in the open `extra` map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{nullable, ObjectId, ValidationError, WebViewSummary};

/// Highest position a caller may request. Everything above it is left
/// free for appends and placeholder normalization.
pub const MAX_POSITION: i64 = i64::MAX / 2;

/// Reject positions outside `0..=MAX_POSITION`.
pub fn check_position(position: i64) -> Result<(), ValidationError> {
    if position < 0 {
        return Err(ValidationError::NegativePosition(position));
    }
    if position > MAX_POSITION {
        return Err(ValidationError::PositionTooLarge(position));
    }
    Ok(())
}

/// A page of a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Page identifier.
    pub id: ObjectId,

    /// Owning book.
    #[serde(rename = "parentId")]
    pub book_id: ObjectId,

    /// Display order within the book (ascending).
    pub position: i64,

    pub text: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,

    /// Embedded web view, expanded to its display fields.
    pub web_view: Option<WebViewSummary>,

    /// Feature-specific fields.
    #[serde(default)]
    pub extra: Map<String, Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// Whether the page still holds a reorder placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.position < 0
    }
}

/// Request body for creating a page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPage {
    /// Explicit position; `None` appends after the last page.
    pub position: Option<i64>,

    pub text: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub web_view_id: Option<ObjectId>,

    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl NewPage {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.position {
            Some(position) => check_position(position),
            None => Ok(()),
        }
    }
}

/// Content edit for a page. Position is not editable here; use reorder.
///
/// `null` clears an optional field. `extra` is merged key by key and a
/// `null` value removes the key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePatch {
    #[serde(default, deserialize_with = "nullable")]
    pub text: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub audio_url: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub web_view_id: Option<Option<ObjectId>>,

    pub extra: Option<Map<String, Value>>,
}

impl PagePatch {
    /// Apply content fields and merge `extra`. The web view reference is
    /// resolved by the store.
    pub fn apply_content(&mut self, page: &mut Page) {
        if let Some(text) = self.text.take() {
            page.text = text;
        }
        if let Some(image_url) = self.image_url.take() {
            page.image_url = image_url;
        }
        if let Some(audio_url) = self.audio_url.take() {
            page.audio_url = audio_url;
        }
        if let Some(extra) = self.extra.take() {
            for (key, value) in extra {
                if value.is_null() {
                    page.extra.remove(&key);
                } else {
                    page.extra.insert(key, value);
                }
            }
        }
        page.updated_at = Utc::now();
    }
}
