//! Browser implementation of [`BrowserHost`] backed by `web-sys` and `js-sys`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;

use async_trait::async_trait;
use js_sys::{Function, Object, Promise, Reflect};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::logger::Logger;
use crate::platform::error::{HostError, HostResult};
use crate::platform::host::{BrowserHost, MountTarget, ScriptCallback, ScriptNode};
use crate::script::ScriptRequest;
use crate::sdk::{
    AppleIdSdk, AppleInitConfig, ButtonOptions, FacebookInitOptions, FacebookLoginOptions,
    FacebookSdk, GoogleAccounts, IdConfiguration, OAuth2Client, SdkCallback, SdkError, SdkResult,
    TokenClientConfig, TokenRequestOverrides,
};

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@identity-bridge/web"));

#[derive(Default)]
pub struct WebHost {
    next_id: Cell<u64>,
    scripts: RefCell<HashMap<u64, web_sys::HtmlScriptElement>>,
    global_hooks: RefCell<HashMap<String, Closure<dyn FnMut()>>>,
}

impl WebHost {
    pub fn new() -> Self {
        Self::default()
    }
}

fn document() -> HostResult<web_sys::Document> {
    web_sys::window()
        .and_then(|window| window.document())
        .ok_or(HostError::Unsupported)
}

fn body() -> HostResult<web_sys::HtmlElement> {
    document()?
        .body()
        .ok_or_else(|| HostError::dom("Document body not available"))
}

impl BrowserHost for WebHost {
    fn append_script(
        &self,
        request: &ScriptRequest,
        on_load: ScriptCallback,
        on_error: ScriptCallback,
    ) -> HostResult<ScriptNode> {
        let script = document()?
            .create_element("script")
            .map_err(|err| HostError::dom(format!("Failed to create script: {}", js_error_message(&err))))?
            .dyn_into::<web_sys::HtmlScriptElement>()
            .map_err(|_| HostError::dom("Script element has wrong type"))?;

        script.set_src(request.src());
        script.set_async(request.is_async());
        script.set_defer(request.defer());
        script.set_cross_origin(request.cross_origin().map(|value| value.as_str()));
        if let Some(nonce) = request.nonce() {
            script
                .set_attribute("nonce", nonce)
                .map_err(|err| HostError::dom(format!("Failed to set nonce: {}", js_error_message(&err))))?;
        }

        let onload = Closure::once_into_js(move || on_load());
        let onerror = Closure::once_into_js(move || on_error());
        script.set_onload(Some(onload.unchecked_ref()));
        script.set_onerror(Some(onerror.unchecked_ref()));

        body()?
            .append_child(&script)
            .map_err(|err| HostError::dom(format!("Failed to append script to <body>: {}", js_error_message(&err))))?;

        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.scripts.borrow_mut().insert(id, script);
        Ok(ScriptNode::new(id, request.src()))
    }

    fn remove_script(&self, node: &ScriptNode) -> HostResult<()> {
        let script = self.scripts.borrow_mut().remove(&node.id());
        if let Some(script) = script {
            script.set_onload(None);
            script.set_onerror(None);
            script.remove();
        }
        Ok(())
    }

    fn ensure_container(&self, element_id: &str) -> HostResult<()> {
        let document = document()?;
        if document.get_element_by_id(element_id).is_some() {
            return Ok(());
        }
        let element = document
            .create_element("div")
            .map_err(|err| HostError::dom(format!("Failed to create container: {}", js_error_message(&err))))?;
        element.set_id(element_id);
        body()?
            .append_child(&element)
            .map_err(|err| HostError::dom(format!("Failed to append container: {}", js_error_message(&err))))?;
        Ok(())
    }

    fn set_global_hook(&self, name: &str, hook: Rc<dyn Fn() + 'static>) -> HostResult<()> {
        let closure = Closure::wrap(Box::new(move || hook()) as Box<dyn FnMut()>);
        Reflect::set(&js_sys::global(), &JsValue::from_str(name), closure.as_ref())
            .map_err(|err| HostError::dom(format!("Failed to assign window.{name}: {}", js_error_message(&err))))?;
        // The global no longer points at the previous closure, so it can be released.
        self.global_hooks
            .borrow_mut()
            .insert(name.to_string(), closure);
        Ok(())
    }

    fn google(&self) -> Option<Rc<dyn GoogleAccounts>> {
        let google = lookup(&js_sys::global(), "google")?;
        let accounts = lookup(&google, "accounts")?;
        Some(Rc::new(WebGoogle { accounts }))
    }

    fn facebook(&self) -> Option<Rc<dyn FacebookSdk>> {
        let fb = lookup(&js_sys::global(), "FB")?;
        Some(Rc::new(WebFacebook { fb }))
    }

    fn apple(&self) -> Option<Rc<dyn AppleIdSdk>> {
        let apple = lookup(&js_sys::global(), "AppleID")?;
        let auth = lookup(&apple, "auth")?;
        Some(Rc::new(WebApple { auth }))
    }
}

struct WebGoogle {
    accounts: JsValue,
}

impl WebGoogle {
    fn namespace(&self, name: &'static str, global: &'static str) -> SdkResult<JsValue> {
        lookup(&self.accounts, name).ok_or(SdkError::Unavailable { global })
    }

    fn init_client(
        &self,
        method: &'static str,
        config: TokenClientConfig,
    ) -> SdkResult<Rc<dyn OAuth2Client>> {
        let oauth2 = self.namespace("oauth2", "google.accounts.oauth2")?;
        let callback = js_callback(config.callback);
        let error_callback = js_callback(config.error_callback);

        let options = Object::new();
        set_field(&options, "client_id", &JsValue::from_str(&config.client_id), method)?;
        set_field(&options, "scope", &JsValue::from_str(&config.scope), method)?;
        set_field(&options, "callback", &callback, method)?;
        set_field(&options, "error_callback", &error_callback, method)?;

        let client = function(&oauth2, method)?
            .call1(&oauth2, &options)
            .map_err(|err| SdkError::call(method, js_error_message(&err)))?;

        Ok(Rc::new(WebOAuth2Client { client }))
    }
}

impl GoogleAccounts for WebGoogle {
    fn init_token_client(&self, config: TokenClientConfig) -> SdkResult<Rc<dyn OAuth2Client>> {
        self.init_client("initTokenClient", config)
    }

    fn init_code_client(&self, config: TokenClientConfig) -> SdkResult<Rc<dyn OAuth2Client>> {
        self.init_client("initCodeClient", config)
    }

    fn initialize_id(&self, config: IdConfiguration) -> SdkResult<()> {
        const METHOD: &str = "google.accounts.id.initialize";
        let id = self.namespace("id", "google.accounts.id")?;
        let callback = js_callback(config.callback);

        let options = Object::new();
        set_field(&options, "client_id", &JsValue::from_str(&config.client_id), METHOD)?;
        if let Some(nonce) = &config.nonce {
            set_field(&options, "nonce", &JsValue::from_str(nonce), METHOD)?;
        }
        set_field(&options, "callback", &callback, METHOD)?;

        function(&id, "initialize")?
            .call1(&id, &options)
            .map_err(|err| SdkError::call(METHOD, js_error_message(&err)))?;
        Ok(())
    }

    fn render_button(&self, target: &MountTarget, options: &ButtonOptions) -> SdkResult<()> {
        const METHOD: &str = "google.accounts.id.renderButton";
        let id = self.namespace("id", "google.accounts.id")?;
        let element = document()
            .ok()
            .and_then(|document| document.get_element_by_id(target.element_id()))
            .ok_or_else(|| {
                SdkError::call(METHOD, format!("element #{} not found", target.element_id()))
            })?;
        let options = to_js(options, METHOD)?;
        function(&id, "renderButton")?
            .call2(&id, &element, &options)
            .map_err(|err| SdkError::call(METHOD, js_error_message(&err)))?;
        Ok(())
    }

    fn prompt(&self) -> SdkResult<()> {
        let id = self.namespace("id", "google.accounts.id")?;
        function(&id, "prompt")?
            .call0(&id)
            .map_err(|err| SdkError::call("google.accounts.id.prompt", js_error_message(&err)))?;
        Ok(())
    }
}

struct WebOAuth2Client {
    client: JsValue,
}

impl WebOAuth2Client {
    fn invoke(&self, method: &'static str, argument: Option<JsValue>) {
        let result = function(&self.client, method).and_then(|function| {
            let outcome = match argument {
                Some(argument) => function.call1(&self.client, &argument),
                None => function.call0(&self.client),
            };
            outcome.map_err(|err| SdkError::call(method, js_error_message(&err)))
        });
        if let Err(err) = result {
            LOGGER.warn(format!("Unable to start the Google OAuth2 flow: {err}"));
        }
    }
}

impl OAuth2Client for WebOAuth2Client {
    fn request_access_token(&self, overrides: Option<&TokenRequestOverrides>) {
        let argument = match overrides.map(|overrides| to_js(overrides, "requestAccessToken")) {
            Some(Ok(value)) => Some(value),
            Some(Err(err)) => {
                LOGGER.warn(format!("Ignoring token request overrides: {err}"));
                None
            }
            None => None,
        };
        self.invoke("requestAccessToken", argument);
    }

    fn request_code(&self) {
        self.invoke("requestCode", None);
    }
}

struct WebFacebook {
    fb: JsValue,
}

impl FacebookSdk for WebFacebook {
    fn init(&self, options: &FacebookInitOptions) -> SdkResult<()> {
        let options = to_js(options, "FB.init")?;
        function(&self.fb, "init")?
            .call1(&self.fb, &options)
            .map_err(|err| SdkError::call("FB.init", js_error_message(&err)))?;
        Ok(())
    }

    fn login(&self, options: &FacebookLoginOptions, callback: SdkCallback) -> SdkResult<()> {
        let options = to_js(options, "FB.login")?;
        let callback = Closure::once_into_js(move |response: JsValue| callback(from_js(&response)));
        function(&self.fb, "login")?
            .call2(&self.fb, &callback, &options)
            .map_err(|err| SdkError::call("FB.login", js_error_message(&err)))?;
        Ok(())
    }
}

struct WebApple {
    auth: JsValue,
}

#[async_trait(?Send)]
impl AppleIdSdk for WebApple {
    fn init(&self, config: &AppleInitConfig) -> SdkResult<()> {
        let config = to_js(config, "AppleID.auth.init")?;
        function(&self.auth, "init")?
            .call1(&self.auth, &config)
            .map_err(|err| SdkError::call("AppleID.auth.init", js_error_message(&err)))?;
        Ok(())
    }

    async fn sign_in(&self) -> Result<Value, Value> {
        let promise = function(&self.auth, "signIn")
            .and_then(|sign_in| {
                sign_in
                    .call0(&self.auth)
                    .map_err(|err| SdkError::call("AppleID.auth.signIn", js_error_message(&err)))
            })
            .and_then(|value| {
                value
                    .dyn_into::<Promise>()
                    .map_err(|_| SdkError::call("AppleID.auth.signIn", "did not return a Promise"))
            })
            .map_err(|err| serde_json::json!({ "error": err.to_string() }))?;

        match JsFuture::from(promise).await {
            Ok(value) => Ok(from_js(&value)),
            Err(err) => Err(from_js(&err)),
        }
    }
}

fn lookup(target: &JsValue, name: &str) -> Option<JsValue> {
    let value = Reflect::get(target, &JsValue::from_str(name)).ok()?;
    if value.is_null() || value.is_undefined() {
        None
    } else {
        Some(value)
    }
}

fn function(target: &JsValue, name: &'static str) -> SdkResult<Function> {
    Reflect::get(target, &JsValue::from_str(name))
        .map_err(|err| SdkError::call(name, js_error_message(&err)))?
        .dyn_into::<Function>()
        .map_err(|_| SdkError::call(name, "is not a function"))
}

fn set_field(target: &Object, key: &str, value: &JsValue, method: &'static str) -> SdkResult<()> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(|err| SdkError::call(method, format!("failed to set `{key}`: {}", js_error_message(&err))))
}

/// Hands the callback to the JS garbage collector. The SDK may keep calling it after the
/// Rust side has moved on (a popup opened by a replaced client), so it must never be dropped
/// from Rust.
fn js_callback(callback: SdkCallback) -> JsValue {
    Closure::wrap(Box::new(move |value: JsValue| callback(from_js(&value))) as Box<dyn FnMut(JsValue)>)
        .into_js_value()
}

fn to_js<T: Serialize>(value: &T, method: &'static str) -> SdkResult<JsValue> {
    let serialized =
        serde_json::to_string(value).map_err(|err| SdkError::call(method, err.to_string()))?;
    js_sys::JSON::parse(&serialized).map_err(|err| SdkError::call(method, js_error_message(&err)))
}

fn from_js(value: &JsValue) -> Value {
    if value.is_undefined() {
        return Value::Null;
    }
    js_sys::JSON::stringify(value)
        .ok()
        .and_then(|text| text.as_string())
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or(Value::Null)
}

fn js_error_message(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        String::from(error.message())
    } else if let Some(text) = value.as_string() {
        text
    } else {
        format!("{value:?}")
    }
}
