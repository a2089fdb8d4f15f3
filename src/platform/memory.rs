//! In-memory [`BrowserHost`] with recording SDK doubles.
//!
//! Nothing here touches a real document: injected scripts stay pending until the caller
//! completes or fails them, and the provider globals only exist once installed. Removing a
//! script keeps its callbacks around so late completions can be replayed.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::platform::error::{HostError, HostResult};
use crate::platform::host::{BrowserHost, MountTarget, ScriptCallback, ScriptNode};
use crate::script::ScriptRequest;
use crate::sdk::{
    AppleIdSdk, AppleInitConfig, ButtonOptions, FacebookInitOptions, FacebookLoginOptions,
    FacebookSdk, GoogleAccounts, IdConfiguration, OAuth2Client, SdkCallback, SdkError, SdkResult,
    TokenClientConfig, TokenRequestOverrides,
};

#[derive(Default)]
pub struct MemoryHost {
    document: RefCell<DocumentState>,
    google: RefCell<Option<Rc<RecordingGoogle>>>,
    facebook: RefCell<Option<Rc<RecordingFacebook>>>,
    apple: RefCell<Option<Rc<RecordingApple>>>,
}

#[derive(Default)]
struct DocumentState {
    next_id: u64,
    attached: Vec<(ScriptNode, ScriptRequest)>,
    pending: Vec<PendingScript>,
    containers: BTreeSet<String>,
    globals: HashMap<String, Rc<dyn Fn()>>,
    reject_injection: bool,
    total_injected: usize,
}

struct PendingScript {
    node: ScriptNode,
    on_load: ScriptCallback,
    on_error: ScriptCallback,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    /// Scripts currently attached to the document, in insertion order.
    pub fn attached_scripts(&self) -> Vec<ScriptRequest> {
        self.document
            .borrow()
            .attached
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    pub fn attached_nodes(&self) -> Vec<ScriptNode> {
        self.document
            .borrow()
            .attached
            .iter()
            .map(|(node, _)| node.clone())
            .collect()
    }

    pub fn attached_count(&self, src: &str) -> usize {
        self.document
            .borrow()
            .attached
            .iter()
            .filter(|(node, _)| node.src() == src)
            .count()
    }

    /// Number of script elements ever created.
    pub fn total_injected(&self) -> usize {
        self.document.borrow().total_injected
    }

    /// Makes the next `append_script` calls fail like a broken DOM would.
    pub fn reject_injection(&self, reject: bool) {
        self.document.borrow_mut().reject_injection = reject;
    }

    /// Fires `onload` for the most recent pending script with `src`, attached or not.
    pub fn complete_script(&self, src: &str) -> bool {
        match self.take_pending(src) {
            Some(pending) => {
                (pending.on_load)();
                true
            }
            None => false,
        }
    }

    /// Fires `onerror` for the most recent pending script with `src`.
    pub fn fail_script(&self, src: &str) -> bool {
        match self.take_pending(src) {
            Some(pending) => {
                (pending.on_error)();
                true
            }
            None => false,
        }
    }

    fn take_pending(&self, src: &str) -> Option<PendingScript> {
        let mut document = self.document.borrow_mut();
        let index = document
            .pending
            .iter()
            .rposition(|pending| pending.node.src() == src)?;
        Some(document.pending.remove(index))
    }

    pub fn has_container(&self, element_id: &str) -> bool {
        self.document.borrow().containers.contains(element_id)
    }

    pub fn has_global(&self, name: &str) -> bool {
        self.document.borrow().globals.contains_key(name)
    }

    /// Calls `window[name]()` the way a provider script would.
    pub fn invoke_global(&self, name: &str) -> bool {
        let hook = self.document.borrow().globals.get(name).cloned();
        match hook {
            Some(hook) => {
                hook();
                true
            }
            None => false,
        }
    }

    pub fn install_google(&self) -> Rc<RecordingGoogle> {
        let google = Rc::new(RecordingGoogle::default());
        *self.google.borrow_mut() = Some(Rc::clone(&google));
        google
    }

    pub fn install_facebook(&self) -> Rc<RecordingFacebook> {
        let facebook = Rc::new(RecordingFacebook::default());
        *self.facebook.borrow_mut() = Some(Rc::clone(&facebook));
        facebook
    }

    pub fn install_apple(&self) -> Rc<RecordingApple> {
        let apple = Rc::new(RecordingApple::default());
        *self.apple.borrow_mut() = Some(Rc::clone(&apple));
        apple
    }
}

impl BrowserHost for MemoryHost {
    fn append_script(
        &self,
        request: &ScriptRequest,
        on_load: ScriptCallback,
        on_error: ScriptCallback,
    ) -> HostResult<ScriptNode> {
        let mut document = self.document.borrow_mut();
        if document.reject_injection {
            return Err(HostError::dom("appendChild rejected the script element"));
        }
        document.next_id += 1;
        document.total_injected += 1;
        let node = ScriptNode::new(document.next_id, request.src());
        document.attached.push((node.clone(), request.clone()));
        document.pending.push(PendingScript {
            node: node.clone(),
            on_load,
            on_error,
        });
        Ok(node)
    }

    fn remove_script(&self, node: &ScriptNode) -> HostResult<()> {
        self.document
            .borrow_mut()
            .attached
            .retain(|(attached, _)| attached != node);
        Ok(())
    }

    fn ensure_container(&self, element_id: &str) -> HostResult<()> {
        self.document
            .borrow_mut()
            .containers
            .insert(element_id.to_string());
        Ok(())
    }

    fn set_global_hook(&self, name: &str, hook: Rc<dyn Fn() + 'static>) -> HostResult<()> {
        self.document
            .borrow_mut()
            .globals
            .insert(name.to_string(), hook);
        Ok(())
    }

    fn google(&self) -> Option<Rc<dyn GoogleAccounts>> {
        self.google
            .borrow()
            .clone()
            .map(|google| google as Rc<dyn GoogleAccounts>)
    }

    fn facebook(&self) -> Option<Rc<dyn FacebookSdk>> {
        self.facebook
            .borrow()
            .clone()
            .map(|facebook| facebook as Rc<dyn FacebookSdk>)
    }

    fn apple(&self) -> Option<Rc<dyn AppleIdSdk>> {
        self.apple
            .borrow()
            .clone()
            .map(|apple| apple as Rc<dyn AppleIdSdk>)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientKind {
    Token,
    Code,
}

/// Client created through [`RecordingGoogle`]; records every request made on it.
pub struct RecordedClient {
    kind: ClientKind,
    config: TokenClientConfig,
    token_requests: RefCell<Vec<Option<TokenRequestOverrides>>>,
    code_requests: Cell<usize>,
}

impl RecordedClient {
    pub fn kind(&self) -> ClientKind {
        self.kind
    }

    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    pub fn scope(&self) -> &str {
        &self.config.scope
    }

    pub fn token_requests(&self) -> Vec<Option<TokenRequestOverrides>> {
        self.token_requests.borrow().clone()
    }

    pub fn code_requests(&self) -> usize {
        self.code_requests.get()
    }

    /// Invokes the client's `callback` with a provider response.
    pub fn respond(&self, response: Value) {
        (self.config.callback)(response);
    }

    /// Invokes the client's `error_callback`.
    pub fn fail(&self, error: Value) {
        (self.config.error_callback)(error);
    }
}

impl OAuth2Client for RecordedClient {
    fn request_access_token(&self, overrides: Option<&TokenRequestOverrides>) {
        self.token_requests.borrow_mut().push(overrides.cloned());
    }

    fn request_code(&self) {
        self.code_requests.set(self.code_requests.get() + 1);
    }
}

#[derive(Default)]
pub struct RecordingGoogle {
    clients: RefCell<Vec<Rc<RecordedClient>>>,
    id_configs: RefCell<Vec<IdConfiguration>>,
    renders: RefCell<Vec<(MountTarget, ButtonOptions)>>,
    prompts: Cell<usize>,
    fail_render: Cell<bool>,
    fail_prompt: Cell<bool>,
}

impl RecordingGoogle {
    pub fn clients(&self) -> Vec<Rc<RecordedClient>> {
        self.clients.borrow().clone()
    }

    pub fn latest_client(&self) -> Option<Rc<RecordedClient>> {
        self.clients.borrow().last().cloned()
    }

    pub fn id_initializations(&self) -> usize {
        self.id_configs.borrow().len()
    }

    pub fn id_client_ids(&self) -> Vec<String> {
        self.id_configs
            .borrow()
            .iter()
            .map(|config| config.client_id.clone())
            .collect()
    }

    /// Delivers a credential response to the latest `google.accounts.id` callback.
    pub fn emit_credential(&self, response: Value) -> bool {
        let callback = self
            .id_configs
            .borrow()
            .last()
            .map(|config| Rc::clone(&config.callback));
        match callback {
            Some(callback) => {
                callback(response);
                true
            }
            None => false,
        }
    }

    pub fn renders(&self) -> Vec<(MountTarget, ButtonOptions)> {
        self.renders.borrow().clone()
    }

    pub fn prompts(&self) -> usize {
        self.prompts.get()
    }

    pub fn fail_render(&self, fail: bool) {
        self.fail_render.set(fail);
    }

    pub fn fail_prompt(&self, fail: bool) {
        self.fail_prompt.set(fail);
    }

    fn create_client(&self, kind: ClientKind, config: TokenClientConfig) -> Rc<dyn OAuth2Client> {
        let client = Rc::new(RecordedClient {
            kind,
            config,
            token_requests: RefCell::new(Vec::new()),
            code_requests: Cell::new(0),
        });
        self.clients.borrow_mut().push(Rc::clone(&client));
        client
    }
}

impl GoogleAccounts for RecordingGoogle {
    fn init_token_client(&self, config: TokenClientConfig) -> SdkResult<Rc<dyn OAuth2Client>> {
        Ok(self.create_client(ClientKind::Token, config))
    }

    fn init_code_client(&self, config: TokenClientConfig) -> SdkResult<Rc<dyn OAuth2Client>> {
        Ok(self.create_client(ClientKind::Code, config))
    }

    fn initialize_id(&self, config: IdConfiguration) -> SdkResult<()> {
        self.id_configs.borrow_mut().push(config);
        Ok(())
    }

    fn render_button(&self, target: &MountTarget, options: &ButtonOptions) -> SdkResult<()> {
        self.renders.borrow_mut().push((target.clone(), *options));
        if self.fail_render.get() {
            return Err(SdkError::call(
                "google.accounts.id.renderButton",
                format!("parent element `{}` not found", target.element_id()),
            ));
        }
        Ok(())
    }

    fn prompt(&self) -> SdkResult<()> {
        self.prompts.set(self.prompts.get() + 1);
        if self.fail_prompt.get() {
            return Err(SdkError::call(
                "google.accounts.id.prompt",
                "FedCM was disabled in browser settings",
            ));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingFacebook {
    inits: RefCell<Vec<FacebookInitOptions>>,
    logins: RefCell<Vec<(FacebookLoginOptions, SdkCallback)>>,
}

impl RecordingFacebook {
    pub fn inits(&self) -> Vec<FacebookInitOptions> {
        self.inits.borrow().clone()
    }

    pub fn logins(&self) -> Vec<FacebookLoginOptions> {
        self.logins
            .borrow()
            .iter()
            .map(|(options, _)| options.clone())
            .collect()
    }

    /// Completes the latest `FB.login` call with `response`.
    pub fn respond_login(&self, response: Value) -> bool {
        let callback = self
            .logins
            .borrow()
            .last()
            .map(|(_, callback)| Rc::clone(callback));
        match callback {
            Some(callback) => {
                callback(response);
                true
            }
            None => false,
        }
    }
}

impl FacebookSdk for RecordingFacebook {
    fn init(&self, options: &FacebookInitOptions) -> SdkResult<()> {
        self.inits.borrow_mut().push(options.clone());
        Ok(())
    }

    fn login(&self, options: &FacebookLoginOptions, callback: SdkCallback) -> SdkResult<()> {
        self.logins.borrow_mut().push((options.clone(), callback));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingApple {
    inits: RefCell<Vec<AppleInitConfig>>,
    responses: RefCell<VecDeque<Result<Value, Value>>>,
    sign_ins: Cell<usize>,
}

impl RecordingApple {
    pub fn inits(&self) -> Vec<AppleInitConfig> {
        self.inits.borrow().clone()
    }

    /// Queues the outcome of the next `AppleID.auth.signIn()` call.
    pub fn queue_sign_in(&self, outcome: Result<Value, Value>) {
        self.responses.borrow_mut().push_back(outcome);
    }

    pub fn sign_ins(&self) -> usize {
        self.sign_ins.get()
    }
}

#[async_trait(?Send)]
impl AppleIdSdk for RecordingApple {
    fn init(&self, config: &AppleInitConfig) -> SdkResult<()> {
        self.inits.borrow_mut().push(config.clone());
        Ok(())
    }

    async fn sign_in(&self) -> Result<Value, Value> {
        self.sign_ins.set(self.sign_ins.get() + 1);
        let next = self.responses.borrow_mut().pop_front();
        next.unwrap_or_else(|| Err(json!({ "error": "popup_closed_by_user" })))
    }
}
