//! Web view resources embedded by pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require, ObjectId, ValidationError};

/// An interactive resource a page can embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebView {
    pub id: ObjectId,
    pub name: String,
    pub url: String,
    pub cover: Option<String>,

    /// Resource kind, e.g. "game" or "coloring".
    #[serde(rename = "type")]
    pub kind: String,

    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WebView {
    pub fn summary(&self) -> WebViewSummary {
        WebViewSummary {
            id: self.id,
            url: self.url.clone(),
            name: self.name.clone(),
            cover: self.cover.clone(),
            kind: self.kind.clone(),
        }
    }
}

/// The display fields of a web view, as expanded on pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebViewSummary {
    pub id: ObjectId,
    pub url: String,
    pub name: String,
    pub cover: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Request body for creating a web view.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWebView {
    pub name: String,
    pub url: String,
    pub cover: Option<String>,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    pub description: Option<String>,
}

fn default_kind() -> String {
    "web".to_string()
}

impl NewWebView {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("url", &self.url)?;
        require("type", &self.kind)
    }
}
