use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

use crate::logger::Logger;
use crate::platform::{BrowserHost, ScriptNode};
use crate::script::{ScriptLoadState, ScriptRequest};

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@identity-bridge/script"));

pub type ScriptEventCallback = Rc<dyn Fn() + 'static>;

/// Optional observers of a loader's outcome.
#[derive(Clone, Default)]
pub struct ScriptCallbacks {
    on_success: Option<ScriptEventCallback>,
    on_error: Option<ScriptEventCallback>,
}

impl ScriptCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.on_success = Some(Rc::new(callback));
        self
    }

    pub fn with_on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.on_error = Some(Rc::new(callback));
        self
    }
}

impl fmt::Debug for ScriptCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptCallbacks")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

struct Acquisition {
    request: ScriptRequest,
    node: Option<ScriptNode>,
    live: Rc<Cell<bool>>,
}

/// Scoped owner of one injected `<script>` element.
///
/// [`ScriptLoader::acquire`] inserts the element; [`ScriptLoader::release`] or dropping the
/// loader removes it again, whatever state the load is in. Each acquisition carries a
/// liveness flag that completion callbacks check first, so a fetch finishing after teardown
/// has no effect. Failures are reported once and never retried.
pub struct ScriptLoader {
    host: Rc<dyn BrowserHost>,
    state: ScriptLoadState,
    callbacks: ScriptCallbacks,
    active: RefCell<Option<Acquisition>>,
}

impl ScriptLoader {
    pub fn new(host: Rc<dyn BrowserHost>, callbacks: ScriptCallbacks) -> Self {
        Self {
            host,
            state: ScriptLoadState::new(),
            callbacks,
            active: RefCell::new(None),
        }
    }

    /// Inserts the script described by `request`.
    ///
    /// Acquiring the request that is already active does nothing. Any other request first
    /// releases the current element and resets the loaded flag.
    pub fn acquire(&self, request: ScriptRequest) {
        if let Some(active) = self.active.borrow().as_ref() {
            if active.request == request {
                return;
            }
        }
        self.release();

        let live = Rc::new(Cell::new(true));
        let node = self.inject(&request, &live);
        *self.active.borrow_mut() = Some(Acquisition {
            request,
            node,
            live,
        });
    }

    /// Removes the active element, if any, and stops listening for its completion.
    pub fn release(&self) {
        let Some(acquisition) = self.active.borrow_mut().take() else {
            return;
        };
        acquisition.live.set(false);
        if let Some(node) = acquisition.node {
            if let Err(err) = self.host.remove_script(&node) {
                LOGGER.warn(format!("Unable to remove script {}: {err}", node.src()));
            }
        }
        self.state.set_loaded(false);
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    pub fn state(&self) -> &ScriptLoadState {
        &self.state
    }

    pub fn active_request(&self) -> Option<ScriptRequest> {
        self.active
            .borrow()
            .as_ref()
            .map(|acquisition| acquisition.request.clone())
    }

    fn inject(&self, request: &ScriptRequest, live: &Rc<Cell<bool>>) -> Option<ScriptNode> {
        let on_load = {
            let live = Rc::clone(live);
            let state = self.state.clone();
            let on_success = self.callbacks.on_success.clone();
            let src = request.src().to_string();
            Box::new(move || {
                if !live.get() {
                    LOGGER.debug(format!("Ignoring load of detached script {src}"));
                    return;
                }
                LOGGER.debug(format!("Loaded {src}"));
                state.set_loaded(true);
                if let Some(callback) = on_success {
                    callback();
                }
            })
        };

        let on_error = {
            let live = Rc::clone(live);
            let state = self.state.clone();
            let on_error = self.callbacks.on_error.clone();
            let src = request.src().to_string();
            Box::new(move || {
                if !live.get() {
                    LOGGER.debug(format!("Ignoring failure of detached script {src}"));
                    return;
                }
                LOGGER.warn(format!("Failed to load {src}"));
                state.set_loaded(false);
                if let Some(callback) = on_error {
                    callback();
                }
            })
        };

        match self.host.append_script(request, on_load, on_error) {
            Ok(node) => Some(node),
            Err(err) => {
                LOGGER.warn(format!("Unable to inject {}: {err}", request.src()));
                if let Some(callback) = &self.callbacks.on_error {
                    callback();
                }
                None
            }
        }
    }
}

impl Drop for ScriptLoader {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ScriptLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptLoader")
            .field("state", &self.state)
            .field("active", &self.active_request())
            .finish()
    }
}
