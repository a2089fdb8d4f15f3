use crate::provider::ProviderConfig;
use crate::script::ScriptRequest;

/// Sign in with Apple JS.
pub const APPLE_SDK_URL: &str =
    "https://appleid.cdn-apple.com/appleauth/static/jsapi/appleid/1/en_US/appleid.auth.js";

pub(crate) fn script_request(config: &ProviderConfig) -> ScriptRequest {
    ScriptRequest::new(APPLE_SDK_URL)
        .with_async(true)
        .with_nonce(config.nonce.clone())
}
