//! Books: the parent aggregate that owns pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{nullable, require, ObjectId, ValidationError};

/// A book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Book identifier.
    pub id: ObjectId,

    /// Display title.
    pub title: String,

    /// Author credit.
    pub author: Option<String>,

    /// Cover image URL.
    pub cover_url: Option<String>,

    /// Blurb shown on the book detail screen.
    pub description: Option<String>,

    /// When the book was created.
    pub created_at: DateTime<Utc>,

    /// When the book was last edited.
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a book.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    pub author: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
}

impl NewBook {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("title", &self.title)
    }
}

/// Partial update for a book. `null` clears an optional field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
    pub title: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub author: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub cover_url: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

impl BookPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.title {
            Some(title) => require("title", title),
            None => Ok(()),
        }
    }

    /// Apply the patch to a book, bumping `updated_at`.
    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(cover_url) = self.cover_url {
            book.cover_url = cover_url;
        }
        if let Some(description) = self.description {
            book.description = description;
        }
        book.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_book() -> Book {
        let now = Utc::now();
        Book {
            id: ObjectId::new(),
            title: "The Sleepy Owl".to_string(),
            author: Some("R. Finch".to_string()),
            cover_url: None,
            description: Some("An owl who cannot sleep".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_patch_distinguishes_absent_and_null() {
        let patch: BookPatch =
            serde_json::from_str(r#"{"title":"The Wakeful Owl","author":null}"#).unwrap();

        let mut book = sample_book();
        patch.apply(&mut book);

        assert_eq!(book.title, "The Wakeful Owl");
        assert_eq!(book.author, None);
        // Absent field untouched
        assert_eq!(book.description.as_deref(), Some("An owl who cannot sleep"));
    }

    #[test]
    fn test_blank_title_rejected() {
        let new: NewBook = serde_json::from_str(r#"{"title":"   "}"#).unwrap();
        assert_eq!(new.validate(), Err(ValidationError::EmptyField("title")));

        let patch: BookPatch = serde_json::from_str(r#"{"title":""}"#).unwrap();
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(sample_book()).unwrap();
        assert!(json.get("coverUrl").is_some());
        assert!(json.get("createdAt").is_some());
    }
}
