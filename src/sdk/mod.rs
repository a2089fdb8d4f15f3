//! Typed views of the third-party identity SDK globals.
//!
//! The provider scripts install `google.accounts.oauth2`, `google.accounts.id`, `FB` and
//! `AppleID` on the global object. A [`crate::platform::BrowserHost`] resolves them on demand
//! and hands back the traits below; callers must tolerate a `None` because the global only
//! exists once the script has been evaluated.

mod error;

pub use error::{SdkError, SdkResult};

use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::platform::MountTarget;

/// Raw JSON callback handed to an SDK. The bridge parses the payload itself.
pub type SdkCallback = Rc<dyn Fn(Value) + 'static>;

/// `google.accounts.oauth2` and `google.accounts.id`.
pub trait GoogleAccounts {
    fn init_token_client(&self, config: TokenClientConfig) -> SdkResult<Rc<dyn OAuth2Client>>;
    fn init_code_client(&self, config: TokenClientConfig) -> SdkResult<Rc<dyn OAuth2Client>>;
    fn initialize_id(&self, config: IdConfiguration) -> SdkResult<()>;
    fn render_button(&self, target: &MountTarget, options: &ButtonOptions) -> SdkResult<()>;
    fn prompt(&self) -> SdkResult<()>;
}

/// A token or code client returned by `initTokenClient` / `initCodeClient`.
pub trait OAuth2Client {
    fn request_access_token(&self, overrides: Option<&TokenRequestOverrides>);
    fn request_code(&self);
}

/// The `FB` global.
pub trait FacebookSdk {
    fn init(&self, options: &FacebookInitOptions) -> SdkResult<()>;
    fn login(&self, options: &FacebookLoginOptions, callback: SdkCallback) -> SdkResult<()>;
}

/// `AppleID.auth`.
#[async_trait(?Send)]
pub trait AppleIdSdk {
    fn init(&self, config: &AppleInitConfig) -> SdkResult<()>;
    /// Resolves with the authorization payload or rejects with the SDK's error object.
    async fn sign_in(&self) -> Result<Value, Value>;
}

#[derive(Clone)]
pub struct TokenClientConfig {
    pub client_id: String,
    pub scope: String,
    pub callback: SdkCallback,
    pub error_callback: SdkCallback,
}

impl fmt::Debug for TokenClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClientConfig")
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct IdConfiguration {
    pub client_id: String,
    pub nonce: Option<String>,
    pub callback: SdkCallback,
}

impl fmt::Debug for IdConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdConfiguration")
            .field("client_id", &self.client_id)
            .field("nonce", &self.nonce)
            .finish_non_exhaustive()
    }
}

/// Per-request overrides accepted by `requestAccessToken`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TokenRequestOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_serial_consent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<ConsentPrompt>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentPrompt {
    #[serde(rename = "")]
    Default,
    None,
    Consent,
    SelectAccount,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonType {
    #[default]
    Standard,
    Icon,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonShape {
    #[default]
    Rectangular,
    Pill,
    Circle,
    Square,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonTheme {
    #[default]
    Outline,
    FilledBlue,
    FilledBlack,
}

/// Style passed to `google.accounts.id.renderButton`.
///
/// The default is the fixed `{type: "standard", shape: "rectangular", theme: "outline"}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ButtonOptions {
    #[serde(rename = "type")]
    pub kind: ButtonType,
    pub shape: ButtonShape,
    pub theme: ButtonTheme,
}

/// Arguments of `FB.init`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacebookInitOptions {
    pub version: String,
    pub xfbml: bool,
    pub cookie: bool,
    pub local_storage: bool,
    pub app_id: String,
}

impl FacebookInitOptions {
    pub const SDK_VERSION: &'static str = "v17.0";

    pub fn for_app(app_id: impl Into<String>) -> Self {
        Self {
            version: Self::SDK_VERSION.to_string(),
            xfbml: false,
            cookie: false,
            local_storage: true,
            app_id: app_id.into(),
        }
    }
}

/// Second argument of `FB.login`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FacebookLoginOptions {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<String>,
    pub return_scopes: bool,
}

/// Argument of `AppleID.auth.init`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppleInitConfig {
    pub client_id: String,
    pub scope: String,
    #[serde(rename = "redirectURI")]
    pub redirect_uri: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub nonce: Option<String>,
    pub use_popup: bool,
}
