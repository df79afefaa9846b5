use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::{Json, Parameters};
use rmcp::model::{
    AnnotateAble, CallToolResult, Content, GetPromptRequestParam, GetPromptResult,
    ListPromptsResult, ListResourcesResult, PaginatedRequestParam, Prompt, PromptMessage,
    PromptMessageRole, RawResource, ReadResourceRequestParam, ReadResourceResult, Resource,
    ResourceContents, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{tool, tool_handler, tool_router, ErrorData, RoleServer, ServerHandler, ServiceExt};
use serde_json::json;
use tokio::sync::Mutex;

use crate::client::{authorization_url, ReflectClient};
use crate::dispatcher::Dispatcher;
use crate::error::ReflectError;
use crate::models::{AppendResult, CreatedNote, Link, User};
use crate::session::Session;

use super::prompts;
use super::types::*;

const AUTH_STATUS_URI: &str = "reflect://auth/status";
const CONFIG_URI: &str = "reflect://config";

/// Map a core error onto the MCP error space.
pub fn to_error_data(err: ReflectError) -> ErrorData {
    let message = err.to_string();
    match err {
        ReflectError::AuthRequired | ReflectError::Auth(_) => {
            ErrorData::invalid_request(message, None)
        }
        ReflectError::MissingGraph
        | ReflectError::InvalidArgument(_)
        | ReflectError::Config(_) => ErrorData::invalid_params(message, None),
        ReflectError::Api { status, body } => ErrorData::internal_error(
            message,
            Some(json!({ "status": status, "body": body })),
        ),
        ReflectError::Validation { .. } | ReflectError::Http(_) => {
            ErrorData::internal_error(message, None)
        }
    }
}

fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

/// MCP server exposing Reflect operations as tools.
///
/// Every tool call opens its own HTTP client and drops it when the call
/// returns.
#[derive(Clone)]
pub struct ReflectMcp {
    session: Arc<Mutex<Session>>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ReflectMcp {
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            tool_router: Self::tool_router(),
        }
    }

    pub async fn serve_stdio(self) -> Result<(), rmcp::RmcpError> {
        let service = self.serve((tokio::io::stdin(), tokio::io::stdout())).await?;
        service.waiting().await?;
        Ok(())
    }

    fn open_client(session: &Session) -> Result<ReflectClient, ErrorData> {
        ReflectClient::open(session).map_err(to_error_data)
    }

    /// Start the OAuth2 flow for the Reflect API. Returns the authorization
    /// URL; after approving, call `set_access_token` with the code from the
    /// redirect URL.
    #[tool]
    async fn authenticate(&self) -> Result<CallToolResult, ErrorData> {
        let mut session = self.session.lock().await;
        if !session.has_client_credentials() {
            return Err(to_error_data(ReflectError::Config(
                "REFLECT_CLIENT_ID and REFLECT_CLIENT_SECRET must be set".to_string(),
            )));
        }

        let url = authorization_url(&session);
        session.mark_authorization_requested();
        log::info!("Authorization URL issued");

        Ok(text_result(format!(
            "Please open this URL in your browser to authenticate:\n{}\n\n\
            After authorizing, use 'set_access_token' with the authorization code from the redirect URL.",
            url
        )))
    }

    /// Exchange an authorization code for an access token.
    #[tool]
    async fn set_access_token(
        &self,
        params: Parameters<SetAccessTokenParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut session = self.session.lock().await;
        let client = Self::open_client(&session)?;
        let mut dispatcher = Dispatcher::new(&mut *session, client);

        let token = dispatcher
            .exchange_code_for_token(&params.0.code)
            .await
            .map_err(to_error_data)?;

        Ok(text_result(format!(
            "Authentication successful! Access token saved. Token type: {}",
            token.token_type
        )))
    }

    /// Set an access token (and optionally a refresh token) you already have.
    #[tool]
    async fn set_token_directly(
        &self,
        params: Parameters<SetTokenDirectlyParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let SetTokenDirectlyParams {
            access_token,
            refresh_token,
        } = params.0;
        if access_token.trim().is_empty() {
            return Err(to_error_data(ReflectError::InvalidArgument(
                "access_token is empty".to_string(),
            )));
        }

        self.session.lock().await.set_tokens(access_token, refresh_token);
        log::info!("Access token set directly");
        Ok(text_result("Access token set successfully"))
    }

    /// List all graphs accessible to the authenticated user.
    #[tool]
    async fn list_graphs(&self) -> Result<Json<GraphListResponse>, ErrorData> {
        let mut session = self.session.lock().await;
        let client = Self::open_client(&session)?;
        let dispatcher = Dispatcher::new(&mut *session, client);

        let graphs = dispatcher.list_graphs().await.map_err(to_error_data)?;
        Ok(Json(GraphListResponse { graphs }))
    }

    /// The graph ID used when an operation gets none: the configured default,
    /// else the user's first graph.
    #[tool]
    async fn get_default_graph(&self) -> Result<Json<DefaultGraphResponse>, ErrorData> {
        let mut session = self.session.lock().await;
        let client = Self::open_client(&session)?;
        let dispatcher = Dispatcher::new(&mut *session, client);

        let graph_id = dispatcher.default_graph().await.map_err(to_error_data)?;
        Ok(Json(DefaultGraphResponse { graph_id }))
    }

    /// List the books of a graph.
    #[tool]
    async fn list_books(
        &self,
        params: Parameters<GraphParams>,
    ) -> Result<Json<BookListResponse>, ErrorData> {
        let mut session = self.session.lock().await;
        let client = Self::open_client(&session)?;
        let dispatcher = Dispatcher::new(&mut *session, client);

        let books = dispatcher
            .list_books(params.0.graph_id)
            .await
            .map_err(to_error_data)?;
        Ok(Json(BookListResponse { books }))
    }

    /// List the saved links of a graph.
    #[tool]
    async fn list_links(
        &self,
        params: Parameters<GraphParams>,
    ) -> Result<Json<LinkListResponse>, ErrorData> {
        let mut session = self.session.lock().await;
        let client = Self::open_client(&session)?;
        let dispatcher = Dispatcher::new(&mut *session, client);

        let links = dispatcher
            .list_links(params.0.graph_id)
            .await
            .map_err(to_error_data)?;
        Ok(Json(LinkListResponse { links }))
    }

    /// Save a link, optionally with title, description and highlights.
    #[tool]
    async fn create_link(
        &self,
        params: Parameters<CreateLinkParams>,
    ) -> Result<Json<Link>, ErrorData> {
        let CreateLinkParams {
            url,
            title,
            description,
            highlights,
            graph_id,
        } = params.0;

        let mut session = self.session.lock().await;
        let client = Self::open_client(&session)?;
        let dispatcher = Dispatcher::new(&mut *session, client);

        let link = dispatcher
            .create_link(graph_id, url, title, description, highlights)
            .await
            .map_err(to_error_data)?;
        Ok(Json(link))
    }

    /// Create a note with a subject and Markdown content.
    #[tool]
    async fn create_note(
        &self,
        params: Parameters<CreateNoteParams>,
    ) -> Result<Json<CreatedNote>, ErrorData> {
        let CreateNoteParams {
            subject,
            content,
            pinned,
            graph_id,
        } = params.0;

        let mut session = self.session.lock().await;
        let client = Self::open_client(&session)?;
        let dispatcher = Dispatcher::new(&mut *session, client);

        let note = dispatcher
            .create_note(graph_id, subject, content, pinned)
            .await
            .map_err(to_error_data)?;
        Ok(Json(note))
    }

    /// Append text to a daily note (today unless `date` is given).
    #[tool]
    async fn append_daily_note(
        &self,
        params: Parameters<AppendDailyNoteParams>,
    ) -> Result<Json<AppendResult>, ErrorData> {
        let AppendDailyNoteParams {
            text,
            date,
            list_name,
            graph_id,
        } = params.0;

        let mut session = self.session.lock().await;
        let client = Self::open_client(&session)?;
        let dispatcher = Dispatcher::new(&mut *session, client);

        let result = dispatcher
            .append_daily_note(graph_id, text, date, list_name)
            .await
            .map_err(to_error_data)?;
        Ok(Json(result))
    }

    /// Information about the authenticated user, including graph IDs.
    #[tool]
    async fn get_current_user(&self) -> Result<Json<User>, ErrorData> {
        let mut session = self.session.lock().await;
        let client = Self::open_client(&session)?;
        let dispatcher = Dispatcher::new(&mut *session, client);

        let user = dispatcher.get_current_user().await.map_err(to_error_data)?;
        Ok(Json(user))
    }

    async fn auth_status(&self) -> Result<String, ErrorData> {
        let mut session = self.session.lock().await;
        let client = Self::open_client(&session)?;
        let dispatcher = Dispatcher::new(&mut *session, client);
        Ok(dispatcher.auth_status().await)
    }
}

fn resource(uri: &str, name: &str) -> Resource {
    RawResource::new(uri, name.to_string()).no_annotation()
}

#[tool_handler]
impl ServerHandler for ReflectMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Reflect notes server (tools: authenticate, set_access_token, set_token_directly, list_graphs, get_default_graph, list_books, list_links, create_link, create_note, append_daily_note, get_current_user). Authenticate first, then call graph tools; graph_id falls back to the default graph."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .enable_prompts()
                .build(),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(ListResourcesResult {
            resources: vec![
                resource(AUTH_STATUS_URI, "auth_status"),
                resource(CONFIG_URI, "config"),
            ],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let uri = request.uri;
        let text = match uri.as_str() {
            AUTH_STATUS_URI => self.auth_status().await?,
            CONFIG_URI => self.session.lock().await.summary(),
            _ => {
                return Err(ErrorData::resource_not_found(
                    "resource not found",
                    Some(json!({ "uri": uri })),
                ))
            }
        };

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, ErrorData> {
        Ok(ListPromptsResult {
            prompts: prompts::PROMPTS
                .iter()
                .map(|p| Prompt::new(p.name, Some(p.description), None))
                .collect(),
            next_cursor: None,
        })
    }

    async fn get_prompt(
        &self,
        GetPromptRequestParam { name, .. }: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, ErrorData> {
        let prompt = prompts::find(&name).ok_or_else(|| {
            ErrorData::invalid_params("prompt not found", Some(json!({ "name": name })))
        })?;

        Ok(GetPromptResult {
            description: Some(prompt.description.to_string()),
            messages: vec![PromptMessage::new_text(PromptMessageRole::User, prompt.text)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rmcp::model::ErrorCode;

    #[test]
    fn test_error_mapping() {
        let err = to_error_data(ReflectError::AuthRequired);
        assert_eq!(err.code, ErrorCode::INVALID_REQUEST);

        let err = to_error_data(ReflectError::MissingGraph);
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);

        let err = to_error_data(ReflectError::Api {
            status: 401,
            body: "nope".to_string(),
        });
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert_eq!(err.data, Some(json!({"status": 401, "body": "nope"})));
    }

    #[tokio::test]
    async fn test_authenticate_requires_client_credentials() {
        let server = ReflectMcp::new(Session::new(&Config::default()));
        let err = server.authenticate().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_authenticate_marks_pending() {
        let mut config = Config::default();
        config.oauth.client_id = "id".to_string();
        config.oauth.client_secret = "secret".to_string();
        let server = ReflectMcp::new(Session::new(&config));

        server.authenticate().await.unwrap();

        let state = server.session.lock().await.state();
        assert_eq!(state, crate::session::AuthState::AuthorizationPending);
    }

    #[tokio::test]
    async fn test_set_token_directly_authenticates() {
        let server = ReflectMcp::new(Session::new(&Config::default()));
        server
            .set_token_directly(Parameters(SetTokenDirectlyParams {
                access_token: "tok".to_string(),
                refresh_token: None,
            }))
            .await
            .unwrap();

        assert_eq!(server.session.lock().await.access_token(), Some("tok"));
    }

    #[tokio::test]
    async fn test_tools_without_token_fail_fast() {
        let server = ReflectMcp::new(Session::new(&Config::default()));
        let Err(err) = server.list_books(Parameters(GraphParams::default())).await else {
            panic!("list_books succeeded without a token");
        };
        assert_eq!(err.code, ErrorCode::INVALID_REQUEST);
        assert_eq!(server.auth_status().await.unwrap(), "Not authenticated");
    }
}
