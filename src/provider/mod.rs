//! Per-provider contexts: script ownership plus the shared `{config, is_loaded}` value.

mod apple;
mod authentication;
mod config;
mod context;
mod error;
pub mod facebook;
mod google;
mod scope;

pub use apple::APPLE_SDK_URL;
pub use authentication::AuthenticationProvider;
pub use config::{IdentityConfig, ProviderConfig};
pub use context::{ProviderContext, ProviderContextValue};
pub use error::{ProviderError, ProviderResult};
pub use facebook::{FACEBOOK_SDK_DEBUG_URL, FACEBOOK_SDK_URL};
pub use google::GOOGLE_SDK_URL;
pub use scope::ProviderScope;

use std::fmt;

use crate::script::ScriptRequest;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    Google,
    Facebook,
    Apple,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Google,
        ProviderKind::Facebook,
        ProviderKind::Apple,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Google => "Google",
            ProviderKind::Facebook => "Facebook",
            ProviderKind::Apple => "Apple",
        }
    }

    /// The SDK script this provider loads for `config`.
    pub fn script_request(self, config: &ProviderConfig) -> ScriptRequest {
        match self {
            ProviderKind::Google => google::script_request(config),
            ProviderKind::Facebook => facebook::script_request(config),
            ProviderKind::Apple => apple::script_request(config),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
