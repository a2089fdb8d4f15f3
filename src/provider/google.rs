use crate::provider::ProviderConfig;
use crate::script::ScriptRequest;

/// Google Identity Services client library.
pub const GOOGLE_SDK_URL: &str = "https://accounts.google.com/gsi/client";

pub(crate) fn script_request(config: &ProviderConfig) -> ScriptRequest {
    ScriptRequest::new(GOOGLE_SDK_URL)
        .with_defer(true)
        .with_nonce(config.nonce.clone())
}
