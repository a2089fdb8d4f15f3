use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::bridge::types::{
    CallbackResult, CodeResponse, FlowMode, GoogleLoginSuccess, LoginCallbacks, NonOAuthError,
    NonOAuthErrorKind, OAuthError, TokenResponse,
};
use crate::bridge::LOGGER;
use crate::provider::{ProviderContextValue, ProviderResult, ProviderScope};
use crate::sdk::{OAuth2Client, TokenClientConfig, TokenRequestOverrides};
use crate::util::Subscription;

/// Scopes requested unless [`GoogleLoginOptions::override_scope`] is set.
pub const BASE_SCOPE: &str = "openid profile email";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GoogleLoginOptions {
    pub flow: FlowMode,
    /// Extra scopes, space separated.
    pub scope: String,
    /// Send `scope` as-is instead of appending it to [`BASE_SCOPE`].
    pub override_scope: bool,
}

impl GoogleLoginOptions {
    pub fn new(flow: FlowMode) -> Self {
        Self {
            flow,
            ..Default::default()
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_override_scope(mut self, override_scope: bool) -> Self {
        self.override_scope = override_scope;
        self
    }

    pub fn effective_scope(&self) -> String {
        let extra = self.scope.trim();
        if self.override_scope {
            extra.to_string()
        } else if extra.is_empty() {
            BASE_SCOPE.to_string()
        } else {
            format!("{BASE_SCOPE} {extra}")
        }
    }
}

/// Inputs a client was built from; any change means a new client.
#[derive(Clone, Debug, PartialEq, Eq)]
struct ClientKey {
    client_id: String,
    flow: FlowMode,
    scope: String,
}

struct ActiveClient {
    key: ClientKey,
    handle: Rc<dyn OAuth2Client>,
}

struct LoginState {
    context: Rc<ProviderContextValue>,
    options: RefCell<GoogleLoginOptions>,
    client: RefCell<Option<ActiveClient>>,
    callbacks: LoginCallbacks<GoogleLoginSuccess>,
}

/// Custom Google OAuth2 flow started from the page's own button.
///
/// Once the Google script has loaded a token client (implicit flow) or code client
/// (auth-code flow) is created, and [`GoogleLogin::login`] opens the provider popup. The
/// client is rebuilt whenever the client id, flow or scope changes and dropped while the
/// script is unloaded; calling `login` without a client does nothing.
pub struct GoogleLogin {
    state: Rc<LoginState>,
    _subscription: Subscription,
}

impl GoogleLogin {
    pub fn new(
        scope: &ProviderScope,
        options: GoogleLoginOptions,
        callbacks: LoginCallbacks<GoogleLoginSuccess>,
    ) -> ProviderResult<Self> {
        let context = scope.google()?;
        let state = Rc::new(LoginState {
            context,
            options: RefCell::new(options),
            client: RefCell::new(None),
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

    pub fn options(&self) -> GoogleLoginOptions {
        self.state.options.borrow().clone()
    }

    pub fn set_options(&self, options: GoogleLoginOptions) {
        *self.state.options.borrow_mut() = options;
        reconcile(&self.state);
    }

    pub fn set_scope(&self, scope: impl Into<String>) {
        let options = self.options().with_scope(scope);
        self.set_options(options);
    }

    pub fn set_flow(&self, flow: FlowMode) {
        let options = GoogleLoginOptions {
            flow,
            ..self.options()
        };
        self.set_options(options);
    }

    pub fn has_client(&self) -> bool {
        self.state.client.borrow().is_some()
    }

    /// Starts the flow: requests an access token (implicit) or an authorization code.
    pub fn login(&self) {
        self.login_with(None);
    }

    /// Like [`Self::login`], forwarding per-request overrides to `requestAccessToken`.
    /// Overrides are ignored for the auth-code flow.
    pub fn login_with(&self, overrides: Option<TokenRequestOverrides>) {
        let active = self
            .state
            .client
            .borrow()
            .as_ref()
            .map(|client| (client.key.flow, Rc::clone(&client.handle)));
        let Some((flow, handle)) = active else {
            LOGGER.debug("Google login requested before the client was initialized");
            return;
        };
        match flow {
            FlowMode::Implicit => handle.request_access_token(overrides.as_ref()),
            FlowMode::AuthCode => handle.request_code(),
        }
    }
}

fn reconcile(state: &Rc<LoginState>) {
    if !state.context.is_loaded() {
        // The handle belongs to the script that was just removed.
        state.client.borrow_mut().take();
        return;
    }

    let key = {
        let options = state.options.borrow();
        ClientKey {
            client_id: state.context.client_id().to_string(),
            flow: options.flow,
            scope: options.effective_scope(),
        }
    };
    if let Some(active) = state.client.borrow().as_ref() {
        if active.key == key {
            return;
        }
    }

    // Tear down before building the replacement.
    state.client.borrow_mut().take();

    let Some(google) = state.context.host().google() else {
        LOGGER.warn("Google script loaded but `google.accounts` is not defined");
        return;
    };

    let config = TokenClientConfig {
        client_id: key.client_id.clone(),
        scope: key.scope.clone(),
        callback: response_bridge(Rc::downgrade(state), key.flow),
        error_callback: non_oauth_bridge(Rc::downgrade(state)),
    };
    let created = match key.flow {
        FlowMode::Implicit => google.init_token_client(config),
        FlowMode::AuthCode => google.init_code_client(config),
    };

    match created {
        Ok(handle) => {
            LOGGER.debug(format!(
                "Initialized Google {:?} client with scope `{}`",
                key.flow, key.scope
            ));
            *state.client.borrow_mut() = Some(ActiveClient { key, handle });
        }
        Err(err) => LOGGER.warn(format!("Unable to initialize the Google OAuth2 client: {err}")),
    }
}

fn response_bridge(state: Weak<LoginState>, flow: FlowMode) -> Rc<dyn Fn(Value)> {
    Rc::new(move |response: Value| {
        let Some(state) = state.upgrade() else {
            return;
        };
        state.callbacks.dispatch(translate_response(flow, response));
    })
}

fn non_oauth_bridge(state: Weak<LoginState>) -> Rc<dyn Fn(Value)> {
    Rc::new(move |error: Value| {
        let Some(state) = state.upgrade() else {
            return;
        };
        state
            .callbacks
            .dispatch(CallbackResult::NonOAuthError(NonOAuthError::from_value(error)));
    })
}

/// Routes a token/code client response: error fields go to the OAuth error channel,
/// everything else becomes the success payload without them.
pub(crate) fn translate_response(
    flow: FlowMode,
    response: Value,
) -> CallbackResult<GoogleLoginSuccess> {
    if let Some(error) = OAuthError::from_response(&response) {
        return CallbackResult::OAuthError(error);
    }
    let mut response = response;
    if let Some(fields) = response.as_object_mut() {
        for key in ["error", "error_description", "error_uri"] {
            fields.remove(key);
        }
    }

    let parsed = match flow {
        FlowMode::Implicit => {
            serde_json::from_value::<TokenResponse>(response.clone()).map(GoogleLoginSuccess::Token)
        }
        FlowMode::AuthCode => {
            serde_json::from_value::<CodeResponse>(response.clone()).map(GoogleLoginSuccess::Code)
        }
    };
    match parsed {
        Ok(success) => CallbackResult::Success(success),
        Err(err) => {
            LOGGER.warn_with(format!("Unreadable Google OAuth2 response: {err}"), response);
            CallbackResult::NonOAuthError(NonOAuthError::new(NonOAuthErrorKind::Unknown))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::memory::ClientKind;
    use crate::platform::MemoryHost;
    use crate::provider::{ProviderConfig, ProviderContext, GOOGLE_SDK_URL};
    use crate::sdk::ConsentPrompt;
    use serde_json::json;

    #[derive(Default)]
    struct Recorded {
        successes: RefCell<Vec<GoogleLoginSuccess>>,
        errors: RefCell<Vec<OAuthError>>,
        non_oauth: RefCell<Vec<NonOAuthError>>,
    }

    fn recording_callbacks() -> (Rc<Recorded>, LoginCallbacks<GoogleLoginSuccess>) {
        let recorded = Rc::new(Recorded::default());
        let (a, b, c) = (recorded.clone(), recorded.clone(), recorded.clone());
        let callbacks = LoginCallbacks::new()
            .with_on_success(move |success| a.successes.borrow_mut().push(success))
            .with_on_error(move |error| b.errors.borrow_mut().push(error))
            .with_on_non_oauth_error(move |error| c.non_oauth.borrow_mut().push(error));
        (recorded, callbacks)
    }

    fn mount() -> (Rc<MemoryHost>, ProviderContext) {
        let host = MemoryHost::shared();
        let context =
            ProviderContext::google(ProviderConfig::new("client-123"), host.clone()).unwrap();
        (host, context)
    }

    #[test]
    fn implicit_success_reaches_on_success_unchanged() {
        let (host, context) = mount();
        let google = host.install_google();
        let (recorded, callbacks) = recording_callbacks();
        let login = GoogleLogin::new(
            &context.scope(),
            GoogleLoginOptions::new(FlowMode::Implicit).with_scope("calendar"),
            callbacks,
        )
        .unwrap();

        host.complete_script(GOOGLE_SDK_URL);
        login.login();

        let client = google.latest_client().unwrap();
        assert_eq!(client.kind(), ClientKind::Token);
        assert_eq!(client.client_id(), "client-123");
        assert_eq!(client.scope(), "openid profile email calendar");
        assert_eq!(client.token_requests(), vec![None]);

        let response = json!({
            "access_token": "abc",
            "expires_in": 3600,
            "token_type": "Bearer",
            "scope": "openid profile email calendar",
            "prompt": ""
        });
        client.respond(response.clone());

        let successes = recorded.successes.borrow();
        assert_eq!(successes.len(), 1);
        let token = successes[0].as_token().unwrap();
        assert_eq!(serde_json::to_value(token).unwrap(), response);
        assert!(recorded.errors.borrow().is_empty());
        assert!(recorded.non_oauth.borrow().is_empty());
    }

    #[test]
    fn popup_closed_goes_to_non_oauth_channel() {
        let (host, context) = mount();
        let google = host.install_google();
        let (recorded, callbacks) = recording_callbacks();
        let _login = GoogleLogin::new(
            &context.scope(),
            GoogleLoginOptions::new(FlowMode::Implicit).with_scope("calendar"),
            callbacks,
        )
        .unwrap();
        host.complete_script(GOOGLE_SDK_URL);

        google
            .latest_client()
            .unwrap()
            .fail(json!({"type": "popup_closed"}));

        assert_eq!(
            recorded.non_oauth.borrow().as_slice(),
            &[NonOAuthError::new(NonOAuthErrorKind::PopupClosed)]
        );
        assert!(recorded.successes.borrow().is_empty());
        assert!(recorded.errors.borrow().is_empty());
    }

    #[test]
    fn error_response_is_not_a_success() {
        let (host, context) = mount();
        let google = host.install_google();
        let (recorded, callbacks) = recording_callbacks();
        let _login =
            GoogleLogin::new(&context.scope(), GoogleLoginOptions::default(), callbacks).unwrap();
        host.complete_script(GOOGLE_SDK_URL);

        google.latest_client().unwrap().respond(json!({
            "error": "access_denied",
            "error_description": "denied",
            "scope": "openid profile email"
        }));

        assert!(recorded.successes.borrow().is_empty());
        assert_eq!(
            recorded.errors.borrow().as_slice(),
            &[OAuthError::new("access_denied").with_description("denied")]
        );
    }

    #[test]
    fn unmodelled_fields_survive_and_odd_error_codes_still_fail() {
        let (host, context) = mount();
        let google = host.install_google();
        let (recorded, callbacks) = recording_callbacks();
        let _login =
            GoogleLogin::new(&context.scope(), GoogleLoginOptions::default(), callbacks).unwrap();
        host.complete_script(GOOGLE_SDK_URL);
        let client = google.latest_client().unwrap();

        client.respond(json!({
            "access_token": "abc",
            "expires_in": 3600,
            "token_type": "Bearer",
            "scope": "openid profile email",
            "prompt": "",
            "error": null,
            "authuser": "1",
            "session_state": {"extraQueryParams": {"authuser": "1"}}
        }));
        client.respond(json!({"error": 401, "error_description": "unauthorized"}));

        let successes = recorded.successes.borrow();
        let token = successes[0].as_token().unwrap();
        assert_eq!(token.extra.get("authuser"), Some(&json!("1")));
        assert!(token.extra.contains_key("session_state"));
        assert!(!token.extra.contains_key("error"));
        assert_eq!(successes.len(), 1);
        assert_eq!(
            recorded.errors.borrow().as_slice(),
            &[OAuthError::new("401").with_description("unauthorized")]
        );
    }

    #[test]
    fn login_before_load_is_a_no_op() {
        let (host, context) = mount();
        let google = host.install_google();
        let (_recorded, callbacks) = recording_callbacks();
        let login =
            GoogleLogin::new(&context.scope(), GoogleLoginOptions::default(), callbacks).unwrap();

        login.login();
        assert!(!login.has_client());
        assert!(google.clients().is_empty());
    }

    #[test]
    fn load_creates_exactly_one_client() {
        let (host, context) = mount();
        let google = host.install_google();
        let (_recorded, callbacks) = recording_callbacks();
        let _login =
            GoogleLogin::new(&context.scope(), GoogleLoginOptions::default(), callbacks).unwrap();

        host.complete_script(GOOGLE_SDK_URL);
        assert_eq!(google.clients().len(), 1);
        assert_eq!(google.clients()[0].scope(), BASE_SCOPE);
    }

    #[test]
    fn scope_change_replaces_the_client() {
        let (host, context) = mount();
        let google = host.install_google();
        let (_recorded, callbacks) = recording_callbacks();
        let login = GoogleLogin::new(
            &context.scope(),
            GoogleLoginOptions::new(FlowMode::Implicit).with_scope("calendar"),
            callbacks,
        )
        .unwrap();
        host.complete_script(GOOGLE_SDK_URL);
        let first = google.latest_client().unwrap();

        login.set_scope("calendar");
        assert_eq!(google.clients().len(), 1);

        login.set_scope("drive");
        login.login_with(Some(TokenRequestOverrides {
            prompt: Some(ConsentPrompt::Consent),
            ..Default::default()
        }));

        let second = google.latest_client().unwrap();
        assert_eq!(google.clients().len(), 2);
        assert_eq!(second.scope(), "openid profile email drive");
        assert!(first.token_requests().is_empty());
        assert_eq!(second.token_requests().len(), 1);
        assert_eq!(
            second.token_requests()[0].as_ref().unwrap().prompt,
            Some(ConsentPrompt::Consent)
        );
    }

    #[test]
    fn auth_code_flow_requests_a_code() {
        let (host, context) = mount();
        let google = host.install_google();
        let (recorded, callbacks) = recording_callbacks();
        let login = GoogleLogin::new(
            &context.scope(),
            GoogleLoginOptions::new(FlowMode::AuthCode)
                .with_scope("https://www.googleapis.com/auth/drive.file")
                .with_override_scope(true),
            callbacks,
        )
        .unwrap();
        host.complete_script(GOOGLE_SDK_URL);
        login.login();

        let client = google.latest_client().unwrap();
        assert_eq!(client.kind(), ClientKind::Code);
        assert_eq!(client.scope(), "https://www.googleapis.com/auth/drive.file");
        assert_eq!(client.code_requests(), 1);

        client.respond(json!({"code": "4/abc", "scope": "drive.file", "authuser": "0"}));
        let successes = recorded.successes.borrow();
        assert_eq!(successes[0].as_code().unwrap().code, "4/abc");
    }

    #[test]
    fn flow_switch_rebuilds_with_the_other_client_kind() {
        let (host, context) = mount();
        let google = host.install_google();
        let (_recorded, callbacks) = recording_callbacks();
        let login =
            GoogleLogin::new(&context.scope(), GoogleLoginOptions::default(), callbacks).unwrap();
        host.complete_script(GOOGLE_SDK_URL);

        login.set_flow(FlowMode::AuthCode);
        let kinds: Vec<_> = google.clients().iter().map(|client| client.kind()).collect();
        assert_eq!(kinds, [ClientKind::Token, ClientKind::Code]);
    }

    #[test]
    fn reload_builds_the_client_on_the_new_sdk() {
        let (host, context) = mount();
        let first = host.install_google();
        let (_recorded, callbacks) = recording_callbacks();
        let login =
            GoogleLogin::new(&context.scope(), GoogleLoginOptions::default(), callbacks).unwrap();
        host.complete_script(GOOGLE_SDK_URL);
        assert!(login.has_client());

        context.set_nonce(Some("n2".into()));
        assert!(!login.has_client());
        login.login();

        let second = host.install_google();
        host.complete_script(GOOGLE_SDK_URL);
        login.login();

        assert_eq!(first.clients().len(), 1);
        assert!(first.latest_client().unwrap().token_requests().is_empty());
        assert_eq!(second.clients().len(), 1);
        assert_eq!(second.latest_client().unwrap().token_requests().len(), 1);
    }

    #[test]
    fn outside_a_google_provider_fails_fast() {
        let (_recorded, callbacks) = recording_callbacks();
        let result = GoogleLogin::new(&ProviderScope::new(), GoogleLoginOptions::default(), callbacks);
        assert!(matches!(
            result,
            Err(crate::provider::ProviderError::NotMounted { .. })
        ));
    }

    #[test]
    fn missing_sdk_global_is_tolerated() {
        let (host, context) = mount();
        let (_recorded, callbacks) = recording_callbacks();
        let login =
            GoogleLogin::new(&context.scope(), GoogleLoginOptions::default(), callbacks).unwrap();
        host.complete_script(GOOGLE_SDK_URL);

        assert!(!login.has_client());
        login.login();
    }
}
