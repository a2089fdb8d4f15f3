use identity_bridge::bridge::{FlowMode, GoogleLogin, GoogleLoginOptions, LoginCallbacks};
use identity_bridge::logger::{set_log_level, LogLevel};
use identity_bridge::platform::MemoryHost;
use identity_bridge::provider::{ProviderConfig, ProviderContext, GOOGLE_SDK_URL};
use serde_json::json;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    set_log_level(LogLevel::Debug);

    // The in-memory host plays the browser: scripts stay pending until completed and the
    // `google.accounts` global only exists once installed.
    let host = MemoryHost::shared();
    let google = host.install_google();

    let context = ProviderContext::google(
        ProviderConfig::new("1234.apps.googleusercontent.com"),
        host.clone(),
    )?;

    let login = GoogleLogin::new(
        &context.scope(),
        GoogleLoginOptions::new(FlowMode::Implicit).with_scope("https://www.googleapis.com/auth/calendar"),
        LoginCallbacks::new()
            .with_on_success(|success| println!("Signed in: {success:?}"))
            .with_on_error(|error| eprintln!("Provider rejected the request: {error}"))
            .with_on_non_oauth_error(|error| eprintln!("Popup problem: {:?}", error.kind)),
    )?;

    // Nothing happens until the script has loaded.
    login.login();

    host.complete_script(GOOGLE_SDK_URL);
    login.login();

    // Simulate Google answering the token request.
    if let Some(client) = google.latest_client() {
        println!("Requested scope: {}", client.scope());
        client.respond(json!({
            "access_token": "ya29.demo",
            "expires_in": 3599,
            "token_type": "Bearer",
            "scope": client.scope(),
            "prompt": ""
        }));
        client.fail(json!({"type": "popup_closed"}));
    }

    Ok(())
}
