//! Facebook SDK script and its process-wide `fbAsyncInit` hook.
//!
//! The Facebook SDK looks for a single global `window.fbAsyncInit` and calls it once the
//! script has evaluated. There can only be one such hook per page, so registration always
//! reassigns it and the configuration applied is the one registered last. Running the hook
//! more than once for the same load applies the configuration only once. Several Facebook
//! contexts mounted at the same time are not supported.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::LazyLock;

use crate::logger::Logger;
use crate::platform::{BrowserHost, HostResult};
use crate::provider::ProviderConfig;
use crate::script::{CrossOrigin, ScriptRequest};
use crate::sdk::FacebookInitOptions;

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@identity-bridge/facebook"));

pub const FACEBOOK_SDK_URL: &str = "https://connect.facebook.net/en_US/sdk.js";
pub const FACEBOOK_SDK_DEBUG_URL: &str = "https://connect.facebook.net/en_US/sdk/debug.js";
/// Container the SDK expects in the document body.
pub const FB_ROOT_ID: &str = "fb-root";
pub const ASYNC_INIT_HOOK: &str = "fbAsyncInit";

pub(crate) fn script_request(config: &ProviderConfig) -> ScriptRequest {
    ScriptRequest::new(FACEBOOK_SDK_URL)
        .with_debug_src(FACEBOOK_SDK_DEBUG_URL)
        .with_debug(config.debug)
        .with_async(true)
        .with_defer(true)
        .with_cross_origin(CrossOrigin::Anonymous)
        .with_nonce(config.nonce.clone())
}

#[derive(Default)]
struct InitRegistry {
    registered: Option<FacebookInitOptions>,
    applied: Option<FacebookInitOptions>,
}

thread_local! {
    static REGISTRY: RefCell<InitRegistry> = RefCell::new(InitRegistry::default());
}

/// Assigns `window.fbAsyncInit` so that it applies `options` through `FB.init`.
///
/// Each call marks the start of a new SDK load: the previous registration is replaced and
/// forgotten. When `FB` already exists (the script evaluated before this call) the
/// configuration is applied right away.
pub fn register_async_init(
    host: &Rc<dyn BrowserHost>,
    options: FacebookInitOptions,
) -> HostResult<()> {
    REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        registry.registered = Some(options);
        registry.applied = None;
    });

    let weak = Rc::downgrade(host);
    host.set_global_hook(
        ASYNC_INIT_HOOK,
        Rc::new(move || {
            if let Some(host) = weak.upgrade() {
                apply_registered(host.as_ref());
            }
        }),
    )?;

    if host.facebook().is_some() {
        apply_registered(host.as_ref());
    }
    Ok(())
}

/// The configuration `fbAsyncInit` will apply, if any.
pub fn registered_init_options() -> Option<FacebookInitOptions> {
    REGISTRY.with(|registry| registry.borrow().registered.clone())
}

/// The configuration last passed to `FB.init` successfully.
pub fn applied_init_options() -> Option<FacebookInitOptions> {
    REGISTRY.with(|registry| registry.borrow().applied.clone())
}

fn apply_registered(host: &dyn BrowserHost) {
    let Some(fb) = host.facebook() else {
        LOGGER.warn("fbAsyncInit ran but `FB` is not defined");
        return;
    };

    let pending = REGISTRY.with(|registry| {
        let registry = registry.borrow();
        match (&registry.registered, &registry.applied) {
            (Some(registered), Some(applied)) if registered == applied => None,
            (Some(registered), _) => Some(registered.clone()),
            (None, _) => None,
        }
    });
    let Some(options) = pending else {
        return;
    };

    match fb.init(&options) {
        Ok(()) => {
            LOGGER.debug(format!("FB.init applied for app {}", options.app_id));
            REGISTRY.with(|registry| registry.borrow_mut().applied = Some(options));
        }
        Err(err) => LOGGER.warn(format!("FB.init failed: {err}")),
    }
}

#[cfg(test)]
pub(crate) fn reset_registry() {
    REGISTRY.with(|registry| *registry.borrow_mut() = InitRegistry::default());
}
