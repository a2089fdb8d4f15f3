use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bridge::types::{
    CallbackResult, LoginCallbacks, NonOAuthError, NonOAuthErrorKind, OAuthError,
};
use crate::bridge::LOGGER;
use crate::provider::{ProviderContextValue, ProviderResult, ProviderScope};
use crate::sdk::FacebookLoginOptions;

/// `authResponse` of a connected `FB.login` result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FacebookAuthResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub signed_request: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granted_scopes: Option<String>,
    #[serde(
        rename = "data_access_expiration_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub data_access_expiration_time: Option<u64>,
}

struct FacebookLoginState {
    context: Rc<ProviderContextValue>,
    options: RefCell<FacebookLoginOptions>,
    callbacks: LoginCallbacks<FacebookAuthResponse>,
}

/// `FB.login` driven from the page's own button.
pub struct FacebookLogin {
    state: Rc<FacebookLoginState>,
}

impl FacebookLogin {
    pub fn new(
        scope: &ProviderScope,
        options: FacebookLoginOptions,
        callbacks: LoginCallbacks<FacebookAuthResponse>,
    ) -> ProviderResult<Self> {
        let context = scope.facebook()?;
        Ok(Self {
            state: Rc::new(FacebookLoginState {
                context,
                options: RefCell::new(options),
                callbacks,
            }),
        })
    }

    pub fn set_options(&self, options: FacebookLoginOptions) {
        *self.state.options.borrow_mut() = options;
    }

    pub fn is_ready(&self) -> bool {
        self.state.context.is_loaded() && self.state.context.host().facebook().is_some()
    }

    /// Opens the Facebook login dialog. Does nothing until the SDK is available.
    pub fn login(&self) {
        if !self.state.context.is_loaded() {
            LOGGER.debug("Facebook login requested before the SDK loaded");
            return;
        }
        let Some(facebook) = self.state.context.host().facebook() else {
            LOGGER.warn("Facebook script loaded but `FB` is not defined");
            return;
        };

        let options = self.state.options.borrow().clone();
        let callback = response_bridge(Rc::downgrade(&self.state));
        if let Err(err) = facebook.login(&options, callback) {
            LOGGER.warn(format!("FB.login failed: {err}"));
        }
    }
}

fn response_bridge(state: Weak<FacebookLoginState>) -> Rc<dyn Fn(Value)> {
    Rc::new(move |response: Value| {
        let Some(state) = state.upgrade() else {
            return;
        };
        state.callbacks.dispatch(translate_response(response));
    })
}

pub(crate) fn translate_response(response: Value) -> CallbackResult<FacebookAuthResponse> {
    match response.get("status").and_then(Value::as_str) {
        Some("connected") => {
            let auth = response.get("authResponse").cloned().unwrap_or(Value::Null);
            match serde_json::from_value::<FacebookAuthResponse>(auth) {
                Ok(auth) => CallbackResult::Success(auth),
                Err(err) => {
                    LOGGER.warn_with(format!("Unreadable Facebook authResponse: {err}"), response);
                    CallbackResult::NonOAuthError(NonOAuthError::new(NonOAuthErrorKind::Unknown))
                }
            }
        }
        Some("not_authorized") => CallbackResult::OAuthError(
            OAuthError::new("not_authorized")
                .with_description("The person did not authorize the application"),
        ),
        _ => CallbackResult::NonOAuthError(NonOAuthError::new(NonOAuthErrorKind::Unknown)),
    }
}
