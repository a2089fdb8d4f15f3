mod error;
mod host;
pub mod memory;
#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
pub mod web;

pub(crate) mod environment;

pub use error::{HostError, HostResult};
pub use host::{BrowserHost, MountTarget, ScriptCallback, ScriptNode};
pub use memory::MemoryHost;

use std::rc::Rc;

use crate::script::ScriptRequest;
use crate::sdk::{AppleIdSdk, FacebookSdk, GoogleAccounts};

/// Host for targets without a document. Every DOM operation reports
/// [`HostError::Unsupported`] and no provider global is ever present.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessHost;

impl BrowserHost for HeadlessHost {
    fn append_script(
        &self,
        _request: &ScriptRequest,
        _on_load: ScriptCallback,
        _on_error: ScriptCallback,
    ) -> HostResult<ScriptNode> {
        Err(HostError::Unsupported)
    }

    fn remove_script(&self, _node: &ScriptNode) -> HostResult<()> {
        Err(HostError::Unsupported)
    }

    fn ensure_container(&self, _element_id: &str) -> HostResult<()> {
        Err(HostError::Unsupported)
    }

    fn set_global_hook(&self, _name: &str, _hook: Rc<dyn Fn() + 'static>) -> HostResult<()> {
        Err(HostError::Unsupported)
    }

    fn google(&self) -> Option<Rc<dyn GoogleAccounts>> {
        None
    }

    fn facebook(&self) -> Option<Rc<dyn FacebookSdk>> {
        None
    }

    fn apple(&self) -> Option<Rc<dyn AppleIdSdk>> {
        None
    }
}

/// Returns the host for the current target: the browser document on wasm with the
/// `wasm-web` feature, [`HeadlessHost`] everywhere else.
pub fn default_host() -> Rc<dyn BrowserHost> {
    #[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
    {
        Rc::new(web::WebHost::new())
    }
    #[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
    {
        Rc::new(HeadlessHost)
    }
}
