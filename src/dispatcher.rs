use chrono::NaiveDate;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::client::Transport;
use crate::error::{ReflectError, Result};
use crate::models::{
    decode, AppendDailyNoteRequest, AppendResult, Book, CreateLinkRequest, CreateNoteRequest,
    CreatedNote, Graph, Link, TokenResponse, User,
};
use crate::session::Session;

/// Runs Reflect operations for one call sequence.
///
/// Borrows the session for the sequence and owns the transport, so the
/// transport is released when the dispatcher is dropped.
pub struct Dispatcher<'s, T: Transport> {
    session: &'s mut Session,
    transport: T,
}

fn graph_path(graph_id: &str, resource: &str) -> String {
    format!("/graphs/{}/{}", urlencoding::encode(graph_id), resource)
}

fn to_body<B: Serialize>(record: &'static str, body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(|e| ReflectError::Validation {
        record,
        reason: e.to_string(),
    })
}

impl<'s, T: Transport> Dispatcher<'s, T> {
    pub fn new(session: &'s mut Session, transport: T) -> Self {
        Self { session, transport }
    }

    /// Exchange an authorization code and store the tokens in the session.
    pub async fn exchange_code_for_token(&mut self, code: &str) -> Result<TokenResponse> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ReflectError::InvalidArgument(
                "authorization code is empty".to_string(),
            ));
        }

        let value = self.transport.exchange_code(&*self.session, code).await?;
        let token: TokenResponse = decode("token", value)?;
        if token.access_token.trim().is_empty() {
            return Err(ReflectError::Auth(
                "token endpoint returned an empty access_token".to_string(),
            ));
        }

        self.session.apply_token(&token);
        log::info!(
            "Authorization code exchanged (token type {}, expires in {:?}s, scope {:?})",
            token.token_type,
            token.expires_in,
            token.scope
        );
        Ok(token)
    }

    async fn call<R: DeserializeOwned>(
        &self,
        record: &'static str,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<R> {
        let token = self.session.require_token()?;
        let value = self.transport.send(token, method, path, body.as_ref()).await?;
        decode(record, value)
    }

    /// Pick the graph for a graph-scoped operation: explicit argument, then
    /// the configured default, then the first graph of the current user.
    async fn resolve_graph(&self, graph_id: Option<String>) -> Result<String> {
        if let Some(id) = graph_id.filter(|id| !id.trim().is_empty()) {
            return Ok(id);
        }
        if let Some(id) = self.session.default_graph_id() {
            return Ok(id.to_string());
        }

        log::info!("No graph_id given and no default configured, asking /users/me");
        let user = self.get_current_user().await?;
        user.graph_ids
            .into_iter()
            .next()
            .ok_or(ReflectError::MissingGraph)
    }

    /// The graph that graph-scoped operations fall back to, if any.
    pub async fn default_graph(&self) -> Result<Option<String>> {
        if let Some(id) = self.session.default_graph_id() {
            return Ok(Some(id.to_string()));
        }
        self.session.require_token()?;

        let user = self.get_current_user().await?;
        Ok(user.graph_ids.into_iter().next())
    }

    pub async fn list_graphs(&self) -> Result<Vec<Graph>> {
        let graphs: Vec<Graph> = self.call("graph list", Method::GET, "/graphs", None).await?;
        log::info!("Listed {} graph(s)", graphs.len());
        Ok(graphs)
    }

    pub async fn list_books(&self, graph_id: Option<String>) -> Result<Vec<Book>> {
        self.session.require_token()?;
        let graph_id = self.resolve_graph(graph_id).await?;

        let books: Vec<Book> = self
            .call("book list", Method::GET, &graph_path(&graph_id, "books"), None)
            .await?;
        log::info!("Listed {} book(s) in graph {}", books.len(), graph_id);
        Ok(books)
    }

    pub async fn list_links(&self, graph_id: Option<String>) -> Result<Vec<Link>> {
        self.session.require_token()?;
        let graph_id = self.resolve_graph(graph_id).await?;

        let links: Vec<Link> = self
            .call("link list", Method::GET, &graph_path(&graph_id, "links"), None)
            .await?;
        log::info!("Listed {} link(s) in graph {}", links.len(), graph_id);
        Ok(links)
    }

    pub async fn create_link(
        &self,
        graph_id: Option<String>,
        url: String,
        title: Option<String>,
        description: Option<String>,
        highlights: Option<Vec<String>>,
    ) -> Result<Link> {
        self.session.require_token()?;
        if url.trim().is_empty() {
            return Err(ReflectError::InvalidArgument("url is empty".to_string()));
        }
        let graph_id = self.resolve_graph(graph_id).await?;

        let request = CreateLinkRequest {
            title,
            description,
            highlights: highlights.unwrap_or_default(),
            ..CreateLinkRequest::new(url)
        };
        let body = to_body("link request", &request)?;

        let link: Link = self
            .call("link", Method::POST, &graph_path(&graph_id, "links"), Some(body))
            .await?;
        log::info!("Created link {} in graph {}", link.id, graph_id);
        Ok(link)
    }

    pub async fn create_note(
        &self,
        graph_id: Option<String>,
        subject: String,
        content_markdown: String,
        pinned: Option<bool>,
    ) -> Result<CreatedNote> {
        self.session.require_token()?;
        let graph_id = self.resolve_graph(graph_id).await?;

        let request = CreateNoteRequest {
            subject,
            content_markdown,
            pinned: pinned.unwrap_or(false),
        };
        let body = to_body("note request", &request)?;

        let note: CreatedNote = self
            .call("created note", Method::POST, &graph_path(&graph_id, "notes"), Some(body))
            .await?;
        log::info!("Created note {} in graph {}", note.id, graph_id);
        Ok(note)
    }

    /// Append to a daily note. Without `date` the service picks today.
    pub async fn append_daily_note(
        &self,
        graph_id: Option<String>,
        text: String,
        date: Option<String>,
        list_name: Option<String>,
    ) -> Result<AppendResult> {
        self.session.require_token()?;
        let date = date.filter(|d| !d.trim().is_empty());
        if let Some(date) = &date {
            NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                ReflectError::InvalidArgument(format!("date '{}' is not YYYY-MM-DD", date))
            })?;
        }
        let graph_id = self.resolve_graph(graph_id).await?;

        let request = AppendDailyNoteRequest {
            date,
            list_name: list_name.filter(|l| !l.trim().is_empty()),
            ..AppendDailyNoteRequest::new(text)
        };
        let body = to_body("daily note request", &request)?;

        let result: AppendResult = self
            .call(
                "append result",
                Method::PUT,
                &graph_path(&graph_id, "daily-notes"),
                Some(body),
            )
            .await?;
        log::info!("Appended to daily note in graph {}", graph_id);
        Ok(result)
    }

    pub async fn get_current_user(&self) -> Result<User> {
        self.call("user", Method::GET, "/users/me", None).await
    }

    /// Human-readable authentication status. Probe failures are reported as
    /// a possibly invalid token instead of an error.
    pub async fn auth_status(&self) -> String {
        if self.session.access_token().is_none() {
            return "Not authenticated".to_string();
        }

        match self.get_current_user().await {
            Ok(user) => format!("Authenticated as: {}", user.email),
            Err(e) => {
                log::warn!("Auth status probe failed: {}", e);
                "Authentication token present but may be invalid".to_string()
            }
        }
    }
}
