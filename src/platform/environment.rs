//! Locates the raw identity configuration JSON supplied by the embedding environment.

use std::env;
use std::fs;

pub(crate) const CONFIG_ENV: &str = "IDENTITY_BRIDGE_CONFIG";
pub(crate) const CONFIG_PATH_ENV: &str = "IDENTITY_BRIDGE_CONFIG_PATH";
#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
pub(crate) const CONFIG_GLOBAL: &str = "__IDENTITY_BRIDGE_CONFIG__";

/// Returns the first configuration source found: inline env var, env-named file, then the
/// page global on wasm.
pub(crate) fn raw_config() -> Option<String> {
    config_from_env()
        .or_else(config_from_path)
        .or_else(config_from_global)
}

fn config_from_env() -> Option<String> {
    env::var(CONFIG_ENV).ok().filter(|raw| !raw.trim().is_empty())
}

fn config_from_path() -> Option<String> {
    let path = env::var(CONFIG_PATH_ENV).ok()?;
    fs::read_to_string(path).ok()
}

#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
fn config_from_global() -> Option<String> {
    use wasm_bindgen::JsValue;

    let global = js_sys::global();
    let value = js_sys::Reflect::get(&global, &JsValue::from_str(CONFIG_GLOBAL)).ok()?;
    if value.is_null() || value.is_undefined() {
        return None;
    }
    if let Some(text) = value.as_string() {
        return Some(text);
    }
    js_sys::JSON::stringify(&value).ok()?.as_string()
}

#[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
fn config_from_global() -> Option<String> {
    None
}
