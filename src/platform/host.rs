use std::rc::Rc;

use crate::platform::error::HostResult;
use crate::script::ScriptRequest;
use crate::sdk::{AppleIdSdk, FacebookSdk, GoogleAccounts};

/// One-shot completion callback attached to an injected script.
pub type ScriptCallback = Box<dyn FnOnce() + 'static>;

/// Handle to a `<script>` element inserted by [`BrowserHost::append_script`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScriptNode {
    id: u64,
    src: String,
}

impl ScriptNode {
    pub fn new(id: u64, src: impl Into<String>) -> Self {
        Self {
            id,
            src: src.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn src(&self) -> &str {
        &self.src
    }
}

/// Element a provider widget is rendered into, addressed by its DOM id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MountTarget {
    element_id: String,
}

impl MountTarget {
    pub fn new(element_id: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
        }
    }

    pub fn element_id(&self) -> &str {
        &self.element_id
    }
}

/// Everything the crate needs from the embedding page.
///
/// The document half injects and removes script nodes and installs global hooks; the SDK
/// half resolves the globals that provider scripts define. SDK lookups happen at call time
/// and return `None` until the corresponding script has run.
pub trait BrowserHost {
    /// Appends a script element. Exactly one of `on_load` / `on_error` fires later, unless
    /// the host is torn down first.
    fn append_script(
        &self,
        request: &ScriptRequest,
        on_load: ScriptCallback,
        on_error: ScriptCallback,
    ) -> HostResult<ScriptNode>;

    /// Detaches a node returned by [`Self::append_script`]. Removing an already detached
    /// node is not an error.
    fn remove_script(&self, node: &ScriptNode) -> HostResult<()>;

    /// Makes sure an element with `element_id` exists in the document body.
    fn ensure_container(&self, element_id: &str) -> HostResult<()>;

    /// Assigns `window[name] = hook`, replacing any previous value.
    fn set_global_hook(&self, name: &str, hook: Rc<dyn Fn() + 'static>) -> HostResult<()>;

    fn google(&self) -> Option<Rc<dyn GoogleAccounts>>;

    fn facebook(&self) -> Option<Rc<dyn FacebookSdk>>;

    fn apple(&self) -> Option<Rc<dyn AppleIdSdk>>;
}
