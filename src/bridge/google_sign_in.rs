use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::bridge::LOGGER;
use crate::platform::MountTarget;
use crate::provider::{ProviderContextValue, ProviderResult, ProviderScope};
use crate::sdk::{ButtonOptions, IdConfiguration};
use crate::util::Subscription;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GoogleSignInOptions {
    /// Element the "Sign in with Google" button is rendered into.
    pub mount_target: Option<MountTarget>,
    /// Show the One Tap prompt.
    pub prompt: bool,
    /// Nonce embedded in the returned ID token.
    pub nonce: Option<String>,
}

impl GoogleSignInOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mount_target(mut self, target: MountTarget) -> Self {
        self.mount_target = Some(target);
        self
    }

    pub fn with_prompt(mut self, prompt: bool) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }
}

/// Progress of a [`GoogleSignIn`]. Render and prompt failures never propagate; they show
/// up here and in the log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SignInStatus {
    pub initialized: bool,
    pub rendered: bool,
    pub prompted: bool,
    pub render_failed: bool,
    pub prompt_failed: bool,
}

type CredentialCallback = Rc<dyn Fn(String) + 'static>;

struct SignInState {
    context: Rc<ProviderContextValue>,
    options: RefCell<GoogleSignInOptions>,
    on_success: CredentialCallback,
    initialized_with: RefCell<Option<(String, Option<String>)>>,
    rendered_into: RefCell<Option<MountTarget>>,
    prompt_consumed: Cell<bool>,
    status: Cell<SignInStatus>,
}

/// Declarative Google Identity Services sign-in.
///
/// After the script loads, `google.accounts.id` is initialized once, the button is rendered
/// into the mount target once per target and One Tap is shown once each time `prompt`
/// turns on. The ID token of a successful sign-in is passed to `on_success`.
pub struct GoogleSignIn {
    state: Rc<SignInState>,
    _subscription: Subscription,
}

impl GoogleSignIn {
    pub fn new<F>(
        scope: &ProviderScope,
        options: GoogleSignInOptions,
        on_success: F,
    ) -> ProviderResult<Self>
    where
        F: Fn(String) + 'static,
    {
        let context = scope.google()?;
        let state = Rc::new(SignInState {
            context,
            options: RefCell::new(options),
            on_success: Rc::new(on_success),
            initialized_with: RefCell::new(None),
            rendered_into: RefCell::new(None),
            prompt_consumed: Cell::new(false),
            status: Cell::new(SignInStatus::default()),
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

    pub fn status(&self) -> SignInStatus {
        self.state.status.get()
    }

    pub fn set_mount_target(&self, target: Option<MountTarget>) {
        self.state.options.borrow_mut().mount_target = target;
        reconcile(&self.state);
    }

    pub fn set_prompt(&self, prompt: bool) {
        self.state.options.borrow_mut().prompt = prompt;
        reconcile(&self.state);
    }
}

fn update_status(state: &SignInState, change: impl FnOnce(&mut SignInStatus)) {
    let mut status = state.status.get();
    change(&mut status);
    state.status.set(status);
}

fn reconcile(state: &Rc<SignInState>) {
    let options = state.options.borrow().clone();
    if !options.prompt {
        state.prompt_consumed.set(false);
    }
    if !state.context.is_loaded() {
        // A reloaded script brings a fresh `google.accounts.id` that knows nothing of us.
        state.initialized_with.borrow_mut().take();
        state.rendered_into.borrow_mut().take();
        state.prompt_consumed.set(false);
        state.status.set(SignInStatus::default());
        return;
    }
    let Some(google) = state.context.host().google() else {
        LOGGER.warn("Google script loaded but `google.accounts.id` is not defined");
        return;
    };

    let identity = (state.context.client_id().to_string(), options.nonce.clone());
    if state.initialized_with.borrow().as_ref() != Some(&identity) {
        let config = IdConfiguration {
            client_id: identity.0.clone(),
            nonce: identity.1.clone(),
            callback: credential_bridge(Rc::downgrade(state)),
        };
        if let Err(err) = google.initialize_id(config) {
            LOGGER.warn(format!("google.accounts.id.initialize failed: {err}"));
            return;
        }
        *state.initialized_with.borrow_mut() = Some(identity);
        state.rendered_into.borrow_mut().take();
        update_status(state, |status| status.initialized = true);
    }

    if let Some(target) = options.mount_target {
        let already = state.rendered_into.borrow().as_ref() == Some(&target);
        if !already {
            let outcome = google.render_button(&target, &ButtonOptions::default());
            if let Err(err) = &outcome {
                LOGGER.warn(format!(
                    "Unable to render the Google button into #{}: {err}",
                    target.element_id()
                ));
            }
            let rendered = outcome.is_ok();
            *state.rendered_into.borrow_mut() = Some(target);
            update_status(state, |status| {
                status.rendered = rendered;
                status.render_failed = !rendered;
            });
        }
    }

    if options.prompt && !state.prompt_consumed.get() {
        state.prompt_consumed.set(true);
        let outcome = google.prompt();
        if let Err(err) = &outcome {
            LOGGER.warn(format!("Google One Tap prompt failed: {err}"));
        }
        let prompted = outcome.is_ok();
        update_status(state, |status| {
            status.prompted = prompted;
            status.prompt_failed = !prompted;
        });
    }
}

fn credential_bridge(state: Weak<SignInState>) -> Rc<dyn Fn(Value)> {
    Rc::new(move |response: Value| {
        let Some(state) = state.upgrade() else {
            return;
        };
        match response.get("credential").and_then(Value::as_str) {
            Some(credential) => (state.on_success)(credential.to_string()),
            None => LOGGER.warn_with("Credential response without a `credential` field", response),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryHost;
    use crate::provider::{ProviderConfig, ProviderContext, GOOGLE_SDK_URL};
    use serde_json::json;

    fn mount() -> (Rc<MemoryHost>, ProviderContext) {
        let host = MemoryHost::shared();
        let context =
            ProviderContext::google(ProviderConfig::new("client-123"), host.clone()).unwrap();
        (host, context)
    }

    #[test]
    fn renders_once_with_fixed_style_and_forwards_credential() {
        let (host, context) = mount();
        let google = host.install_google();
        let credentials = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&credentials);
        let sign_in = GoogleSignIn::new(
            &context.scope(),
            GoogleSignInOptions::new().with_mount_target(MountTarget::new("google-button")),
            move |credential| sink.borrow_mut().push(credential),
        )
        .unwrap();
        assert_eq!(sign_in.status(), SignInStatus::default());

        host.complete_script(GOOGLE_SDK_URL);
        sign_in.set_mount_target(Some(MountTarget::new("google-button")));

        assert_eq!(google.id_initializations(), 1);
        assert_eq!(google.id_client_ids(), vec!["client-123".to_string()]);
        assert_eq!(
            google.renders(),
            vec![(MountTarget::new("google-button"), ButtonOptions::default())]
        );
        assert_eq!(google.prompts(), 0);

        google.emit_credential(json!({"credential": "eyJhbGciOi", "select_by": "btn"}));
        assert_eq!(credentials.borrow().as_slice(), &["eyJhbGciOi".to_string()]);

        let status = sign_in.status();
        assert!(status.initialized && status.rendered && !status.render_failed);
    }

    #[test]
    fn render_failure_is_reported_not_raised() {
        let (host, context) = mount();
        let google = host.install_google();
        google.fail_render(true);
        let sign_in = GoogleSignIn::new(
            &context.scope(),
            GoogleSignInOptions::new().with_mount_target(MountTarget::new("missing")),
            |_| {},
        )
        .unwrap();

        host.complete_script(GOOGLE_SDK_URL);
        let status = sign_in.status();
        assert!(status.initialized);
        assert!(status.render_failed);
        assert!(!status.rendered);
        assert_eq!(google.renders().len(), 1);
    }

    #[test]
    fn new_target_renders_again() {
        let (host, context) = mount();
        let google = host.install_google();
        host.complete_script(GOOGLE_SDK_URL);
        let sign_in = GoogleSignIn::new(
            &context.scope(),
            GoogleSignInOptions::new().with_mount_target(MountTarget::new("a")),
            |_| {},
        )
        .unwrap();

        sign_in.set_mount_target(Some(MountTarget::new("b")));
        let targets: Vec<String> = google
            .renders()
            .iter()
            .map(|(target, _)| target.element_id().to_string())
            .collect();
        assert_eq!(targets, ["a", "b"]);
        assert_eq!(google.id_initializations(), 1);
    }

    #[test]
    fn prompts_once_per_rising_edge() {
        let (host, context) = mount();
        let google = host.install_google();
        let sign_in = GoogleSignIn::new(
            &context.scope(),
            GoogleSignInOptions::new().with_prompt(true),
            |_| {},
        )
        .unwrap();

        host.complete_script(GOOGLE_SDK_URL);
        sign_in.set_prompt(true);
        assert_eq!(google.prompts(), 1);

        sign_in.set_prompt(false);
        sign_in.set_prompt(true);
        assert_eq!(google.prompts(), 2);
        assert!(sign_in.status().prompted);
    }

    #[test]
    fn prompt_failure_is_reported() {
        let (host, context) = mount();
        let google = host.install_google();
        google.fail_prompt(true);
        host.complete_script(GOOGLE_SDK_URL);

        let sign_in = GoogleSignIn::new(
            &context.scope(),
            GoogleSignInOptions::new().with_prompt(true),
            |_| {},
        )
        .unwrap();
        assert!(sign_in.status().prompt_failed);
    }

    #[test]
    fn reloaded_script_is_initialized_and_rendered_again() {
        let (host, context) = mount();
        let first = host.install_google();
        let sign_in = GoogleSignIn::new(
            &context.scope(),
            GoogleSignInOptions::new()
                .with_mount_target(MountTarget::new("google-button"))
                .with_prompt(true),
            |_| {},
        )
        .unwrap();
        host.complete_script(GOOGLE_SDK_URL);
        assert_eq!(first.id_initializations(), 1);

        context.set_nonce(Some("n2".into()));
        assert_eq!(sign_in.status(), SignInStatus::default());

        let second = host.install_google();
        host.complete_script(GOOGLE_SDK_URL);

        assert_eq!(first.id_initializations(), 1);
        assert_eq!(first.renders().len(), 1);
        assert_eq!(second.id_initializations(), 1);
        assert_eq!(
            second.renders(),
            vec![(MountTarget::new("google-button"), ButtonOptions::default())]
        );
        assert_eq!(second.prompts(), 1);
        assert!(sign_in.status().initialized && sign_in.status().rendered);
    }

    #[test]
    fn nothing_happens_before_load() {
        let (host, context) = mount();
        let google = host.install_google();
        let _sign_in = GoogleSignIn::new(
            &context.scope(),
            GoogleSignInOptions::new()
                .with_mount_target(MountTarget::new("btn"))
                .with_prompt(true),
            |_| {},
        )
        .unwrap();

        assert_eq!(google.id_initializations(), 0);
        assert!(google.renders().is_empty());
        assert_eq!(google.prompts(), 0);
    }
}
