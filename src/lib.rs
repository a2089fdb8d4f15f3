//! # identity-bridge
//!
//! Loads the Google Identity Services, Facebook and Sign in with Apple SDKs into a page and
//! bridges their callback APIs into typed Rust callbacks.
//!
//! The crate is layered:
//!
//! * [`script`] injects a provider `<script>` once per acquisition, tracks whether it has
//!   loaded and removes it again when released.
//! * [`provider`] mounts one [`provider::ProviderContext`] per identity provider and shares
//!   its `{config, is_loaded}` view through a [`provider::ProviderScope`].
//! * [`bridge`] contains the login flows (`GoogleLogin`, `GoogleSignIn`, `FacebookLogin`,
//!   `AppleSignIn`) that wait for their provider and drive its SDK.
//!
//! All DOM and SDK access goes through a [`platform::BrowserHost`]. On `wasm32` with the
//! `wasm-web` feature [`platform::default_host`] returns the real document; elsewhere the
//! [`platform::MemoryHost`] stands in for it.
//!
//! ## Example
//!
//! ```no_run
//! use identity_bridge::bridge::{FlowMode, GoogleLogin, GoogleLoginOptions, LoginCallbacks};
//! use identity_bridge::platform::default_host;
//! use identity_bridge::provider::{ProviderConfig, ProviderContext};
//!
//! # fn main() -> Result<(), identity_bridge::provider::ProviderError> {
//! let google = ProviderContext::google(
//!     ProviderConfig::new("1234.apps.googleusercontent.com"),
//!     default_host(),
//! )?;
//!
//! let login = GoogleLogin::new(
//!     &google.scope(),
//!     GoogleLoginOptions::new(FlowMode::Implicit).with_scope("https://www.googleapis.com/auth/calendar"),
//!     LoginCallbacks::new()
//!         .with_on_success(|success| println!("signed in: {success:?}"))
//!         .with_on_error(|error| eprintln!("rejected: {error}")),
//! )?;
//!
//! // Later, from a click handler:
//! login.login();
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod logger;
pub mod platform;
pub mod provider;
pub mod script;
pub mod sdk;
pub mod util;

pub use bridge::{
    AppleSignIn, CallbackResult, FacebookLogin, FlowMode, GoogleLogin, GoogleSignIn,
    LoginCallbacks, NonOAuthError, OAuthError,
};
pub use platform::{default_host, BrowserHost, MemoryHost};
pub use provider::{
    AuthenticationProvider, IdentityConfig, ProviderConfig, ProviderContext, ProviderError,
    ProviderKind, ProviderScope,
};
pub use script::{ScriptLoadState, ScriptLoader, ScriptRequest};
