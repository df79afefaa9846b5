//! Recording transport for dispatcher and server tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::client::Transport;
use crate::error::{ReflectError, Result};
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub path: String,
    pub bearer: String,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
enum Reply {
    Json(Value),
    Status(u16, String),
    Echo,
}

/// Transport returning canned replies keyed by method and path.
///
/// Clones share the call log, so a test can keep one handle while the
/// dispatcher owns another. Unknown routes answer 404.
#[derive(Clone, Default)]
pub struct MockTransport {
    replies: Arc<HashMap<(String, String), Reply>>,
    token: Option<Value>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    codes: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_reply(mut self, method: &str, path: &str, reply: Reply) -> Self {
        Arc::make_mut(&mut self.replies).insert((method.to_string(), path.to_string()), reply);
        self
    }

    pub fn respond(self, method: &str, path: &str, body: Value) -> Self {
        self.with_reply(method, path, Reply::Json(body))
    }

    pub fn fail(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.with_reply(method, path, Reply::Status(status, body.to_string()))
    }

    /// Answer with the request body as sent.
    pub fn echo(self, method: &str, path: &str) -> Self {
        self.with_reply(method, path, Reply::Echo)
    }

    /// Token JSON for code exchanges. Without one, every code is rejected.
    pub fn token(mut self, body: Value) -> Self {
        self.token = Some(body);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    pub fn exchanged_codes(&self) -> Vec<String> {
        self.codes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        bearer: &str,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        if bearer.is_empty() {
            return Err(ReflectError::AuthRequired);
        }

        self.calls.lock().unwrap().push(RecordedCall {
            method: method.to_string(),
            path: path.to_string(),
            bearer: bearer.to_string(),
            body: body.cloned(),
        });

        match self.replies.get(&(method.to_string(), path.to_string())) {
            Some(Reply::Json(value)) => Ok(value.clone()),
            Some(Reply::Status(status, body)) => Err(ReflectError::Api {
                status: *status,
                body: body.clone(),
            }),
            Some(Reply::Echo) => Ok(body.cloned().unwrap_or(Value::Null)),
            None => Err(ReflectError::Api {
                status: 404,
                body: format!("no mock for {} {}", method, path),
            }),
        }
    }

    async fn exchange_code(&self, _session: &Session, code: &str) -> Result<Value> {
        self.codes.lock().unwrap().push(code.to_string());
        self.token
            .clone()
            .ok_or_else(|| ReflectError::Auth("invalid_grant (400 Bad Request)".to_string()))
    }
}
