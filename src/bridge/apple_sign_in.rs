use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bridge::types::{
    CallbackResult, LoginCallbacks, NonOAuthError, NonOAuthErrorKind, OAuthError,
};
use crate::bridge::LOGGER;
use crate::provider::{ProviderContextValue, ProviderResult, ProviderScope};
use crate::sdk::AppleInitConfig;
use crate::util::Subscription;

pub const DEFAULT_APPLE_SCOPE: &str = "name email";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppleSignInOptions {
    pub scope: String,
    pub state: Option<String>,
    pub nonce: Option<String>,
    pub use_popup: bool,
}

impl Default for AppleSignInOptions {
    fn default() -> Self {
        Self {
            scope: DEFAULT_APPLE_SCOPE.to_string(),
            state: None,
            nonce: None,
            use_popup: true,
        }
    }
}

impl AppleSignInOptions {
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_use_popup(mut self, use_popup: bool) -> Self {
        self.use_popup = use_popup;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppleAuthorizationData {
    pub code: String,
    pub id_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppleUserName {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Only present on the first authorization of a user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppleUser {
    pub email: Option<String>,
    pub name: Option<AppleUserName>,
}

/// Resolved value of `AppleID.auth.signIn()`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppleAuthorization {
    pub authorization: AppleAuthorizationData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<AppleUser>,
}

struct AppleState {
    context: Rc<ProviderContextValue>,
    options: RefCell<AppleSignInOptions>,
    applied: RefCell<Option<AppleInitConfig>>,
    callbacks: LoginCallbacks<AppleAuthorization>,
}

/// Sign in with Apple through the JS SDK popup.
///
/// `AppleID.auth.init` runs once the script has loaded and again whenever the client id,
/// redirect URI or options change.
pub struct AppleSignIn {
    state: Rc<AppleState>,
    _subscription: Subscription,
}

impl AppleSignIn {
    pub fn new(
        scope: &ProviderScope,
        options: AppleSignInOptions,
        callbacks: LoginCallbacks<AppleAuthorization>,
    ) -> ProviderResult<Self> {
        let context = scope.apple()?;
        let state = Rc::new(AppleState {
            context,
            options: RefCell::new(options),
            applied: RefCell::new(None),
            callbacks,
        });

        let weak = Rc::downgrade(&state);
        let subscription = state.context.subscribe(move |_| {
            if let Some(state) = weak.upgrade() {
                reconcile(&state);
            }
        });
        reconcile(&state);

        Ok(Self {
            state,
            _subscription: subscription,
        })
    }

    pub fn set_options(&self, options: AppleSignInOptions) {
        *self.state.options.borrow_mut() = options;
        reconcile(&self.state);
    }

    pub fn is_initialized(&self) -> bool {
        self.state.applied.borrow().is_some()
    }

    /// Opens the Apple sign-in flow and routes the outcome to the callbacks.
    pub async fn sign_in(&self) {
        reconcile(&self.state);
        if !self.is_initialized() {
            LOGGER.debug("Apple sign-in requested before AppleID.auth was initialized");
            return;
        }
        let Some(apple) = self.state.context.host().apple() else {
            return;
        };

        let outcome = apple.sign_in().await;
        self.state.callbacks.dispatch(translate_outcome(outcome));
    }
}

fn init_config(state: &AppleState) -> AppleInitConfig {
    let options = state.options.borrow();
    AppleInitConfig {
        client_id: state.context.client_id().to_string(),
        scope: options.scope.clone(),
        redirect_uri: state.context.config().redirect_url.clone().unwrap_or_default(),
        state: options.state.clone(),
        nonce: options.nonce.clone(),
        use_popup: options.use_popup,
    }
}

fn reconcile(state: &Rc<AppleState>) {
    if !state.context.is_loaded() {
        state.applied.borrow_mut().take();
        return;
    }
    let config = init_config(state);
    if state.applied.borrow().as_ref() == Some(&config) {
        return;
    }
    let Some(apple) = state.context.host().apple() else {
        LOGGER.warn("Apple script loaded but `AppleID` is not defined");
        return;
    };
    match apple.init(&config) {
        Ok(()) => *state.applied.borrow_mut() = Some(config),
        Err(err) => LOGGER.warn(format!("AppleID.auth.init failed: {err}")),
    }
}

pub(crate) fn translate_outcome(outcome: Result<Value, Value>) -> CallbackResult<AppleAuthorization> {
    match outcome {
        Ok(payload) => match serde_json::from_value::<AppleAuthorization>(payload.clone()) {
            Ok(authorization) => CallbackResult::Success(authorization),
            Err(err) => {
                LOGGER.warn_with(format!("Unreadable Apple authorization: {err}"), payload);
                CallbackResult::NonOAuthError(NonOAuthError::new(NonOAuthErrorKind::Unknown))
            }
        },
        Err(error) => match error.get("error").and_then(Value::as_str) {
            Some("popup_closed_by_user") => {
                CallbackResult::NonOAuthError(NonOAuthError::new(NonOAuthErrorKind::PopupClosed))
            }
            Some("popup_blocked_by_browser") => CallbackResult::NonOAuthError(NonOAuthError::new(
                NonOAuthErrorKind::PopupFailedToOpen,
            )),
            Some(_) => match OAuthError::from_response(&error) {
                Some(oauth) => CallbackResult::OAuthError(oauth),
                None => CallbackResult::NonOAuthError(NonOAuthError::new(NonOAuthErrorKind::Unknown)),
            },
            None => CallbackResult::NonOAuthError(NonOAuthError::new(NonOAuthErrorKind::Unknown)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryHost;
    use crate::provider::{ProviderConfig, ProviderContext, APPLE_SDK_URL};
    use futures::executor::block_on;
    use serde_json::json;

    type Outcomes = Rc<RefCell<Vec<CallbackResult<AppleAuthorization>>>>;

    fn recording_callbacks() -> (Outcomes, LoginCallbacks<AppleAuthorization>) {
        let outcomes: Outcomes = Rc::default();
        let (a, b, c) = (outcomes.clone(), outcomes.clone(), outcomes.clone());
        let callbacks = LoginCallbacks::new()
            .with_on_success(move |auth| a.borrow_mut().push(CallbackResult::Success(auth)))
            .with_on_error(move |error| b.borrow_mut().push(CallbackResult::OAuthError(error)))
            .with_on_non_oauth_error(move |error| {
                c.borrow_mut().push(CallbackResult::NonOAuthError(error))
            });
        (outcomes, callbacks)
    }

    fn mount() -> (Rc<MemoryHost>, ProviderContext) {
        let host = MemoryHost::shared();
        let config = ProviderConfig::new("com.example.web")
            .with_redirect_url("https://example.com/auth/apple");
        let context = ProviderContext::apple(config, host.clone()).unwrap();
        (host, context)
    }

    #[test]
    fn initializes_after_load_and_on_option_change() {
        let (host, context) = mount();
        let apple = host.install_apple();
        let (_outcomes, callbacks) = recording_callbacks();
        let sign_in = AppleSignIn::new(
            &context.scope(),
            AppleSignInOptions::default().with_nonce("n-1"),
            callbacks,
        )
        .unwrap();
        assert!(apple.inits().is_empty());

        host.complete_script(APPLE_SDK_URL);
        let inits = apple.inits();
        assert_eq!(inits.len(), 1);
        assert_eq!(inits[0].client_id, "com.example.web");
        assert_eq!(inits[0].redirect_uri, "https://example.com/auth/apple");
        assert_eq!(inits[0].scope, DEFAULT_APPLE_SCOPE);
        assert!(inits[0].use_popup);

        sign_in.set_options(AppleSignInOptions::default().with_nonce("n-1"));
        assert_eq!(apple.inits().len(), 1);

        sign_in.set_options(AppleSignInOptions::default().with_state("s-2"));
        assert_eq!(apple.inits().len(), 2);
        assert_eq!(apple.inits()[1].state.as_deref(), Some("s-2"));
    }

    #[test]
    fn successful_sign_in_reaches_on_success() {
        let (host, context) = mount();
        let apple = host.install_apple();
        host.complete_script(APPLE_SDK_URL);
        let (outcomes, callbacks) = recording_callbacks();
        let sign_in =
            AppleSignIn::new(&context.scope(), AppleSignInOptions::default(), callbacks).unwrap();

        apple.queue_sign_in(Ok(json!({
            "authorization": {"code": "c-1", "id_token": "eyJ", "state": "s"},
            "user": {"email": "a@example.com", "name": {"firstName": "Ada", "lastName": "L"}}
        })));
        block_on(sign_in.sign_in());

        let outcomes = outcomes.borrow();
        let CallbackResult::Success(authorization) = &outcomes[0] else {
            panic!("expected success, got {:?}", outcomes[0]);
        };
        assert_eq!(authorization.authorization.code, "c-1");
        assert_eq!(authorization.authorization.id_token, "eyJ");
        let user = authorization.user.as_ref().unwrap();
        assert_eq!(user.name.as_ref().unwrap().first_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn popup_errors_map_to_non_oauth_kinds() {
        let (host, context) = mount();
        let apple = host.install_apple();
        host.complete_script(APPLE_SDK_URL);
        let (outcomes, callbacks) = recording_callbacks();
        let sign_in =
            AppleSignIn::new(&context.scope(), AppleSignInOptions::default(), callbacks).unwrap();

        apple.queue_sign_in(Err(json!({"error": "popup_blocked_by_browser"})));
        apple.queue_sign_in(Err(json!({"error": "invalid_client"})));
        block_on(sign_in.sign_in());
        block_on(sign_in.sign_in());
        block_on(sign_in.sign_in());

        assert_eq!(
            outcomes.borrow().as_slice(),
            &[
                CallbackResult::NonOAuthError(NonOAuthError::new(
                    NonOAuthErrorKind::PopupFailedToOpen
                )),
                CallbackResult::OAuthError(OAuthError::new("invalid_client")),
                CallbackResult::NonOAuthError(NonOAuthError::new(NonOAuthErrorKind::PopupClosed)),
            ]
        );
    }

    #[test]
    fn reloaded_script_is_initialized_again() {
        let (host, context) = mount();
        let first = host.install_apple();
        let (outcomes, callbacks) = recording_callbacks();
        let sign_in =
            AppleSignIn::new(&context.scope(), AppleSignInOptions::default(), callbacks).unwrap();
        host.complete_script(APPLE_SDK_URL);
        assert!(sign_in.is_initialized());

        context.set_nonce(Some("n2".into()));
        assert!(!sign_in.is_initialized());
        block_on(sign_in.sign_in());
        assert_eq!(first.sign_ins(), 0);

        let second = host.install_apple();
        host.complete_script(APPLE_SDK_URL);
        assert_eq!(first.inits().len(), 1);
        assert_eq!(second.inits().len(), 1);

        block_on(sign_in.sign_in());
        assert_eq!(second.sign_ins(), 1);
        assert_eq!(outcomes.borrow().len(), 1);
    }

    #[test]
    fn sign_in_before_load_does_nothing() {
        let (host, context) = mount();
        let apple = host.install_apple();
        let (outcomes, callbacks) = recording_callbacks();
        let sign_in =
            AppleSignIn::new(&context.scope(), AppleSignInOptions::default(), callbacks).unwrap();

        block_on(sign_in.sign_in());
        assert_eq!(apple.sign_ins(), 0);
        assert!(outcomes.borrow().is_empty());
    }
}
