use crate::config::Config;
use crate::error::{ReflectError, Result};
use crate::models::TokenResponse;

/// Where the session sits in the OAuth2 flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    /// An authorization URL was handed out; waiting for the code.
    AuthorizationPending,
    Authenticated,
}

/// Credentials and API settings for one process.
///
/// Built once at startup and passed to the client and dispatcher. Afterwards
/// only a token exchange or an explicit token set changes the credentials;
/// `mark_authorization_requested` flips a flag that only affects `state()`.
#[derive(Debug, Clone)]
pub struct Session {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    authorize_url: String,
    token_url: String,
    api_base_url: String,
    access_token: Option<String>,
    refresh_token: Option<String>,
    default_graph_id: Option<String>,
    authorization_requested: bool,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self {
            client_id: config.oauth.client_id.clone(),
            client_secret: config.oauth.client_secret.clone(),
            redirect_uri: config.oauth.redirect_uri.clone(),
            authorize_url: config.oauth.authorize_url.clone(),
            token_url: config.oauth.token_url.clone(),
            api_base_url: config.api.base_url.trim_end_matches('/').to_string(),
            access_token: non_empty(config.oauth.access_token.clone()),
            refresh_token: non_empty(config.oauth.refresh_token.clone()),
            default_graph_id: non_empty(config.api.default_graph_id.clone()),
            authorization_requested: false,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn authorize_url(&self) -> &str {
        &self.authorize_url
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn default_graph_id(&self) -> Option<&str> {
        self.default_graph_id.as_deref()
    }

    pub fn has_client_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    /// The access token, or `AuthRequired` when none is set.
    pub fn require_token(&self) -> Result<&str> {
        self.access_token().ok_or(ReflectError::AuthRequired)
    }

    pub fn state(&self) -> AuthState {
        if self.access_token.is_some() {
            AuthState::Authenticated
        } else if self.authorization_requested {
            AuthState::AuthorizationPending
        } else {
            AuthState::Unauthenticated
        }
    }

    pub fn mark_authorization_requested(&mut self) {
        self.authorization_requested = true;
    }

    /// Store the result of a successful code exchange. The refresh token is
    /// only replaced when the exchange returned one.
    pub fn apply_token(&mut self, token: &TokenResponse) {
        self.access_token = non_empty(Some(token.access_token.clone()));
        if let Some(refresh) = non_empty(token.refresh_token.clone()) {
            self.refresh_token = Some(refresh);
        }
    }

    /// Out-of-band token entry. Same overwrite rules as `apply_token`.
    pub fn set_tokens(&mut self, access_token: String, refresh_token: Option<String>) {
        self.access_token = non_empty(Some(access_token));
        if let Some(refresh) = non_empty(refresh_token) {
            self.refresh_token = Some(refresh);
        }
    }

    /// Configuration overview that only says whether secrets are set.
    pub fn summary(&self) -> String {
        let yes_no = |set: bool| if set { "Yes" } else { "No" };
        format!(
            "Reflect MCP Configuration:\n\
            - API Base URL: {}\n\
            - Client ID Set: {}\n\
            - Client Secret Set: {}\n\
            - Access Token Set: {}\n\
            - Refresh Token Set: {}\n\
            - Default Graph ID: {}\n\
            - Redirect URI: {}\n\
            - Auth State: {:?}",
            self.api_base_url,
            yes_no(!self.client_id.is_empty()),
            yes_no(!self.client_secret.is_empty()),
            yes_no(self.access_token.is_some()),
            yes_no(self.refresh_token().is_some()),
            self.default_graph_id.as_deref().unwrap_or("Not set"),
            self.redirect_uri,
            self.state(),
        )
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        let mut config = Config::default();
        config.oauth.refresh_token = Some("r0".to_string());
        config.api.base_url = "https://reflect.app/api/".to_string();
        Session::new(&config)
    }

    fn token(access: &str, refresh: Option<&str>) -> TokenResponse {
        TokenResponse {
            access_token: access.to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_in: None,
            scope: None,
        }
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(session().api_base_url(), "https://reflect.app/api");
    }

    #[test]
    fn test_apply_token_keeps_refresh_when_absent() {
        let mut session = session();
        session.apply_token(&token("tok", None));
        assert_eq!(session.access_token(), Some("tok"));
        assert_eq!(session.refresh_token(), Some("r0"));

        session.apply_token(&token("tok2", Some("r1")));
        assert_eq!(session.refresh_token(), Some("r1"));
    }

    #[test]
    fn test_state_transitions() {
        let mut session = session();
        assert_eq!(session.state(), AuthState::Unauthenticated);
        assert!(matches!(session.require_token(), Err(ReflectError::AuthRequired)));

        session.mark_authorization_requested();
        assert_eq!(session.state(), AuthState::AuthorizationPending);

        session.apply_token(&token("tok", None));
        assert_eq!(session.state(), AuthState::Authenticated);
    }

    #[test]
    fn test_set_tokens_from_any_state() {
        let mut session = session();
        session.set_tokens("manual".to_string(), None);
        assert_eq!(session.state(), AuthState::Authenticated);
        assert_eq!(session.require_token().unwrap(), "manual");
        assert_eq!(session.refresh_token(), Some("r0"));
    }

    #[test]
    fn test_summary_hides_secrets() {
        let mut config = Config::default();
        config.oauth.client_id = "id-123".to_string();
        config.oauth.client_secret = "super-secret".to_string();
        config.oauth.access_token = Some("tok-456".to_string());
        let summary = Session::new(&config).summary();

        assert!(summary.contains("Client Secret Set: Yes"));
        assert!(summary.contains("Default Graph ID: Not set"));
        assert!(!summary.contains("super-secret"));
        assert!(!summary.contains("tok-456"));
    }

    #[test]
    fn test_empty_config_token_is_unset() {
        let mut config = Config::default();
        config.oauth.access_token = Some("  ".to_string());
        assert!(Session::new(&config).access_token().is_none());
    }
}
