use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::sync::LazyLock;

use crate::logger::Logger;
use crate::platform::BrowserHost;
use crate::provider::error::ProviderResult;
use crate::provider::facebook::{self, FB_ROOT_ID};
use crate::provider::{ProviderConfig, ProviderKind, ProviderScope};
use crate::script::{ScriptCallbacks, ScriptLoadState, ScriptLoader};
use crate::sdk::FacebookInitOptions;
use crate::util::Subscription;

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@identity-bridge/provider"));

/// Read-only `{config, is_loaded}` view shared with every consumer under a provider.
pub struct ProviderContextValue {
    kind: ProviderKind,
    config: ProviderConfig,
    host: Rc<dyn BrowserHost>,
    load_state: ScriptLoadState,
}

impl ProviderContextValue {
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    pub fn is_loaded(&self) -> bool {
        self.load_state.is_loaded()
    }

    pub fn load_state(&self) -> &ScriptLoadState {
        &self.load_state
    }

    /// Calls `listener` whenever the provider script's loaded flag changes.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(bool) + 'static,
    {
        self.load_state.subscribe(listener)
    }

    pub fn when_loaded(&self) -> impl Future<Output = ()> + 'static {
        self.load_state.when_loaded()
    }

    pub(crate) fn host(&self) -> &Rc<dyn BrowserHost> {
        &self.host
    }
}

impl fmt::Debug for ProviderContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderContextValue")
            .field("kind", &self.kind)
            .field("config", &self.config)
            .field("is_loaded", &self.is_loaded())
            .finish()
    }
}

/// A mounted identity provider.
///
/// Mounting injects the provider's SDK script; dropping the context removes it. Consumers
/// never hold the context itself, only its [`ProviderContextValue`] through a
/// [`ProviderScope`].
pub struct ProviderContext {
    value: Rc<ProviderContextValue>,
    loader: ScriptLoader,
    nonce: RefCell<Option<String>>,
    _effects: Vec<Subscription>,
}

impl ProviderContext {
    pub fn mount(
        kind: ProviderKind,
        config: ProviderConfig,
        host: Rc<dyn BrowserHost>,
    ) -> ProviderResult<Self> {
        Self::mount_with(kind, config, host, ScriptCallbacks::new())
    }

    /// Like [`Self::mount`], with observers for the script outcome.
    pub fn mount_with(
        kind: ProviderKind,
        config: ProviderConfig,
        host: Rc<dyn BrowserHost>,
        callbacks: ScriptCallbacks,
    ) -> ProviderResult<Self> {
        config.validate(kind)?;

        let loader = ScriptLoader::new(Rc::clone(&host), callbacks);
        let value = Rc::new(ProviderContextValue {
            kind,
            config,
            host,
            load_state: loader.state().clone(),
        });

        let mut effects = Vec::new();
        if kind == ProviderKind::Facebook {
            if let Err(err) = value.host.ensure_container(FB_ROOT_ID) {
                LOGGER.warn(format!("Unable to create #{FB_ROOT_ID}: {err}"));
            }
            effects.push(register_facebook_init(&value));
        }

        let nonce = value.config.nonce.clone();
        loader.acquire(kind.script_request(&value.config));
        LOGGER.debug(format!("Mounted {kind} provider"));

        Ok(Self {
            value,
            loader,
            nonce: RefCell::new(nonce),
            _effects: effects,
        })
    }

    pub fn google(config: ProviderConfig, host: Rc<dyn BrowserHost>) -> ProviderResult<Self> {
        Self::mount(ProviderKind::Google, config, host)
    }

    pub fn facebook(config: ProviderConfig, host: Rc<dyn BrowserHost>) -> ProviderResult<Self> {
        Self::mount(ProviderKind::Facebook, config, host)
    }

    pub fn apple(config: ProviderConfig, host: Rc<dyn BrowserHost>) -> ProviderResult<Self> {
        Self::mount(ProviderKind::Apple, config, host)
    }

    pub fn kind(&self) -> ProviderKind {
        self.value.kind
    }

    pub fn value(&self) -> Rc<ProviderContextValue> {
        Rc::clone(&self.value)
    }

    pub fn is_loaded(&self) -> bool {
        self.loader.is_loaded()
    }

    /// A scope exposing only this provider.
    pub fn scope(&self) -> ProviderScope {
        ProviderScope::new().with(self)
    }

    /// Re-injects the script with a different CSP nonce. The old element is removed and the
    /// context reports unloaded until the new one finishes.
    pub fn set_nonce(&self, nonce: Option<String>) {
        if *self.nonce.borrow() == nonce {
            return;
        }
        *self.nonce.borrow_mut() = nonce.clone();
        let request = self
            .value
            .kind
            .script_request(&self.value.config)
            .with_nonce(nonce);
        self.loader.acquire(request);
    }
}

impl fmt::Debug for ProviderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderContext")
            .field("value", &self.value)
            .field("loader", &self.loader)
            .finish()
    }
}

fn register_facebook_init(value: &Rc<ProviderContextValue>) -> Subscription {
    let host = Rc::clone(&value.host);
    let app_id = value.config.app_id().to_string();
    value.subscribe(move |loaded| {
        if !loaded {
            return;
        }
        let options = FacebookInitOptions::for_app(app_id.clone());
        if let Err(err) = facebook::register_async_init(&host, options) {
            LOGGER.warn(format!("Unable to register fbAsyncInit: {err}"));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryHost;
    use crate::provider::{APPLE_SDK_URL, FACEBOOK_SDK_URL, GOOGLE_SDK_URL};
    use crate::provider::facebook::{applied_init_options, reset_registry, ASYNC_INIT_HOOK};

    #[test]
    fn google_context_flips_loaded_once() {
        let host = MemoryHost::shared();
        let context = ProviderContext::google(ProviderConfig::new("client"), host.clone()).unwrap();
        let value = context.value();
        let flips = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&flips);
        let _subscription = value.subscribe(move |loaded| sink.borrow_mut().push(loaded));

        assert!(!value.is_loaded());
        host.complete_script(GOOGLE_SDK_URL);
        assert!(value.is_loaded());
        assert_eq!(flips.borrow().as_slice(), &[true]);

        let request = &host.attached_scripts()[0];
        assert!(request.defer());
        assert_eq!(request.nonce(), None);
    }

    #[test]
    fn unmount_removes_script_and_remount_injects_a_new_one() {
        let host = MemoryHost::shared();
        let config = ProviderConfig::new("com.example.web").with_redirect_url("https://example.com/cb");

        let context = ProviderContext::apple(config.clone(), host.clone()).unwrap();
        let first = host.attached_nodes();
        assert_eq!(host.attached_count(APPLE_SDK_URL), 1);

        drop(context);
        assert_eq!(host.attached_count(APPLE_SDK_URL), 0);

        let _context = ProviderContext::apple(config, host.clone()).unwrap();
        assert_eq!(host.attached_count(APPLE_SDK_URL), 1);
        assert_ne!(host.attached_nodes(), first);
    }

    #[test]
    fn nonce_change_reacquires_script() {
        let host = MemoryHost::shared();
        let context =
            ProviderContext::google(ProviderConfig::new("client").with_nonce("a"), host.clone())
                .unwrap();
        host.complete_script(GOOGLE_SDK_URL);
        assert!(context.is_loaded());

        context.set_nonce(Some("a".into()));
        assert_eq!(host.total_injected(), 1);

        context.set_nonce(Some("b".into()));
        assert_eq!(host.total_injected(), 2);
        assert_eq!(host.attached_count(GOOGLE_SDK_URL), 1);
        assert_eq!(host.attached_scripts()[0].nonce(), Some("b"));
        assert!(!context.is_loaded());
    }

    #[test]
    fn facebook_context_registers_async_init_after_load() {
        reset_registry();
        let host = MemoryHost::shared();
        let context = ProviderContext::facebook(ProviderConfig::new("4242"), host.clone()).unwrap();
        assert!(host.has_container(FB_ROOT_ID));
        assert!(!host.has_global(ASYNC_INIT_HOOK));

        let fb = host.install_facebook();
        host.complete_script(FACEBOOK_SDK_URL);
        assert!(context.is_loaded());
        assert!(host.has_global(ASYNC_INIT_HOOK));

        host.invoke_global(ASYNC_INIT_HOOK);
        assert_eq!(fb.inits(), vec![FacebookInitOptions::for_app("4242")]);
        assert_eq!(applied_init_options().unwrap().app_id, "4242");
    }

    #[test]
    fn invalid_configuration_fails_mount() {
        let host = MemoryHost::shared();
        let err = ProviderContext::apple(ProviderConfig::new("com.example.web"), host.clone())
            .unwrap_err();
        assert!(matches!(
            err,
            crate::provider::ProviderError::InvalidConfiguration { .. }
        ));
        assert_eq!(host.total_injected(), 0);
    }
}
