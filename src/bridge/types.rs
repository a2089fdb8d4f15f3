use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which Google OAuth2 client a [`crate::bridge::GoogleLogin`] drives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowMode {
    /// Access token returned straight to the page.
    #[default]
    #[serde(rename = "implicit")]
    Implicit,
    /// Authorization code meant for a server-side exchange.
    #[serde(rename = "auth-code")]
    AuthCode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonOAuthErrorKind {
    PopupFailedToOpen,
    PopupClosed,
    #[serde(other)]
    Unknown,
}

/// Browser or popup failure around the OAuth flow (blocked popup, popup closed).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonOAuthError {
    #[serde(rename = "type")]
    pub kind: NonOAuthErrorKind,
}

impl NonOAuthError {
    pub fn new(kind: NonOAuthErrorKind) -> Self {
        Self { kind }
    }

    /// Reads a `{type}` payload; anything unrecognised is [`NonOAuthErrorKind::Unknown`].
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or(Self::new(NonOAuthErrorKind::Unknown))
    }
}

/// Error codes Google documents for token and code responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OAuthErrorCode {
    InvalidRequest,
    AccessDenied,
    UnauthorizedClient,
    UnsupportedResponseType,
    InvalidScope,
    ServerError,
    TemporarilyUnavailable,
}

impl OAuthErrorCode {
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "invalid_request" => Some(Self::InvalidRequest),
            "access_denied" => Some(Self::AccessDenied),
            "unauthorized_client" => Some(Self::UnauthorizedClient),
            "unsupported_response_type" => Some(Self::UnsupportedResponseType),
            "invalid_scope" => Some(Self::InvalidScope),
            "server_error" => Some(Self::ServerError),
            "temporarily_unavailable" => Some(Self::TemporarilyUnavailable),
            _ => None,
        }
    }
}

/// Protocol-level rejection reported by the provider (consent denied, bad scope, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthError {
    #[serde(rename = "error")]
    pub code: String,
    #[serde(rename = "error_description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "error_uri", default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl OAuthError {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: None,
            uri: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn known_code(&self) -> Option<OAuthErrorCode> {
        OAuthErrorCode::parse(&self.code)
    }

    /// Extracts the error fields of a provider response. A missing, `null` or empty `error`
    /// means the response is not an error; any other non-string value is kept as its JSON text.
    pub fn from_response(response: &Value) -> Option<Self> {
        let code = match response.get("error")? {
            Value::Null => return None,
            Value::String(code) if code.is_empty() => return None,
            Value::String(code) => code.clone(),
            other => other.to_string(),
        };
        let text = |key: &str| {
            response
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Some(Self {
            code,
            description: text("error_description"),
            uri: text("error_uri"),
        })
    }
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {description}", self.code),
            None => f.write_str(&self.code),
        }
    }
}

impl std::error::Error for OAuthError {}

/// Outcome of a provider callback after translation.
#[derive(Clone, Debug, PartialEq)]
pub enum CallbackResult<T> {
    Success(T),
    OAuthError(OAuthError),
    NonOAuthError(NonOAuthError),
}

/// `initTokenClient` success payload, error fields removed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hd: Option<String>,
    pub prompt: String,
    pub token_type: String,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Fields this crate does not model, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `initCodeClient` success payload, error fields removed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeResponse {
    pub code: String,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authuser: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GoogleLoginSuccess {
    Token(TokenResponse),
    Code(CodeResponse),
}

impl GoogleLoginSuccess {
    pub fn as_token(&self) -> Option<&TokenResponse> {
        match self {
            GoogleLoginSuccess::Token(token) => Some(token),
            GoogleLoginSuccess::Code(_) => None,
        }
    }

    pub fn as_code(&self) -> Option<&CodeResponse> {
        match self {
            GoogleLoginSuccess::Code(code) => Some(code),
            GoogleLoginSuccess::Token(_) => None,
        }
    }
}

pub type SuccessCallback<T> = Rc<dyn Fn(T) + 'static>;
pub type OAuthErrorCallback = Rc<dyn Fn(OAuthError) + 'static>;
pub type NonOAuthErrorCallback = Rc<dyn Fn(NonOAuthError) + 'static>;

/// The three callback channels of an imperative bridge. Unset channels drop their events.
pub struct LoginCallbacks<T> {
    on_success: Option<SuccessCallback<T>>,
    on_error: Option<OAuthErrorCallback>,
    on_non_oauth_error: Option<NonOAuthErrorCallback>,
}

impl<T> LoginCallbacks<T> {
    pub fn new() -> Self {
        Self {
            on_success: None,
            on_error: None,
            on_non_oauth_error: None,
        }
    }

    pub fn with_on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(T) + 'static,
    {
        self.on_success = Some(Rc::new(callback));
        self
    }

    pub fn with_on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(OAuthError) + 'static,
    {
        self.on_error = Some(Rc::new(callback));
        self
    }

    pub fn with_on_non_oauth_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(NonOAuthError) + 'static,
    {
        self.on_non_oauth_error = Some(Rc::new(callback));
        self
    }

    pub(crate) fn dispatch(&self, result: CallbackResult<T>) {
        match result {
            CallbackResult::Success(payload) => {
                if let Some(callback) = &self.on_success {
                    callback(payload);
                }
            }
            CallbackResult::OAuthError(error) => {
                if let Some(callback) = &self.on_error {
                    callback(error);
                }
            }
            CallbackResult::NonOAuthError(error) => {
                if let Some(callback) = &self.on_non_oauth_error {
                    callback(error);
                }
            }
        }
    }
}

impl<T> Default for LoginCallbacks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for LoginCallbacks<T> {
    fn clone(&self) -> Self {
        Self {
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            on_non_oauth_error: self.on_non_oauth_error.clone(),
        }
    }
}

impl<T> fmt::Debug for LoginCallbacks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCallbacks")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_non_oauth_error", &self.on_non_oauth_error.is_some())
            .finish()
    }
}
