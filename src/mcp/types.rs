use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::{Book, Graph, Link};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SetAccessTokenParams {
    /// Authorization code from the redirect URL.
    pub code: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SetTokenDirectlyParams {
    /// OAuth2 access token.
    pub access_token: String,
    /// OAuth2 refresh token, kept as-is when omitted.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct GraphParams {
    /// Graph ID (uses the default graph if not provided).
    #[serde(default)]
    pub graph_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateLinkParams {
    /// URL to save.
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Text highlights to attach to the link.
    #[serde(default)]
    pub highlights: Option<Vec<String>>,
    /// Graph ID (uses the default graph if not provided).
    #[serde(default)]
    pub graph_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateNoteParams {
    /// Note title/subject.
    pub subject: String,
    /// Note content in Markdown.
    pub content: String,
    /// Whether to pin the note (default false).
    #[serde(default)]
    pub pinned: Option<bool>,
    /// Graph ID (uses the default graph if not provided).
    #[serde(default)]
    pub graph_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AppendDailyNoteParams {
    /// Text to append.
    pub text: String,
    /// Date in YYYY-MM-DD format, defaults to today.
    #[serde(default)]
    pub date: Option<String>,
    /// List name to append to.
    #[serde(default)]
    pub list_name: Option<String>,
    /// Graph ID (uses the default graph if not provided).
    #[serde(default)]
    pub graph_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct GraphListResponse {
    pub graphs: Vec<Graph>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct BookListResponse {
    pub books: Vec<Book>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct LinkListResponse {
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DefaultGraphResponse {
    pub graph_id: Option<String>,
}
