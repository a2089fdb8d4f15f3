//! Authentication bridges between application code and the provider SDKs.
//!
//! Each bridge resolves its provider from a [`crate::provider::ProviderScope`], waits for
//! the provider script to load and then drives the SDK, translating raw callback payloads
//! into [`CallbackResult`] channels.

mod apple_sign_in;
mod facebook_login;
mod google_login;
mod google_sign_in;
mod types;

pub use apple_sign_in::{
    AppleAuthorization, AppleAuthorizationData, AppleSignIn, AppleSignInOptions, AppleUser,
    AppleUserName, DEFAULT_APPLE_SCOPE,
};
pub use facebook_login::{FacebookAuthResponse, FacebookLogin};
pub use google_login::{GoogleLogin, GoogleLoginOptions, BASE_SCOPE};
pub use google_sign_in::{GoogleSignIn, GoogleSignInOptions, SignInStatus};
pub use types::{
    CallbackResult, CodeResponse, FlowMode, GoogleLoginSuccess, LoginCallbacks, NonOAuthError,
    NonOAuthErrorCallback, NonOAuthErrorKind, OAuthError, OAuthErrorCallback,
    OAuthErrorCode, SuccessCallback, TokenResponse,
};

use std::sync::LazyLock;

use crate::logger::Logger;

pub(crate) static LOGGER: LazyLock<Logger> =
    LazyLock::new(|| Logger::new("@identity-bridge/bridge"));
