use serde::{Deserialize, Serialize};
use url::Url;

use crate::platform::environment;
use crate::provider::error::{ProviderError, ProviderResult};
use crate::provider::ProviderKind;

/// Identity of one provider as supplied by the application. Immutable once mounted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// OAuth client id (Google, Apple) or app id (Facebook).
    #[serde(alias = "appId")]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    /// Loads the provider's debug SDK build where one exists.
    #[serde(default)]
    pub debug: bool,
    /// CSP nonce stamped on the injected script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl ProviderConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Default::default()
        }
    }

    pub fn with_redirect_url(mut self, redirect_url: impl Into<String>) -> Self {
        self.redirect_url = Some(redirect_url.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Facebook naming for [`Self::client_id`].
    pub fn app_id(&self) -> &str {
        &self.client_id
    }

    pub fn validate(&self, kind: ProviderKind) -> ProviderResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(ProviderError::invalid_configuration(format!(
                "{kind} requires a non-empty client id"
            )));
        }
        match (&self.redirect_url, kind) {
            (Some(redirect_url), _) => {
                let parsed = Url::parse(redirect_url).map_err(|err| {
                    ProviderError::invalid_configuration(format!(
                        "{kind} redirect URL `{redirect_url}` is invalid: {err}"
                    ))
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(ProviderError::invalid_configuration(format!(
                        "{kind} redirect URL must use http or https"
                    )));
                }
                Ok(())
            }
            (None, ProviderKind::Apple) => Err(ProviderError::invalid_configuration(
                "Apple requires a redirect URL",
            )),
            (None, _) => Ok(()),
        }
    }
}

/// Provider configuration for a whole application.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google: Option<ProviderConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook: Option<ProviderConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apple: Option<ProviderConfig>,
}

impl IdentityConfig {
    pub fn from_json(raw: &str) -> ProviderResult<Self> {
        let config: IdentityConfig = serde_json::from_str(raw).map_err(|err| {
            ProviderError::invalid_configuration(format!("failed to parse identity config: {err}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `IDENTITY_BRIDGE_CONFIG`, then the file named by `IDENTITY_BRIDGE_CONFIG_PATH`,
    /// then (on wasm) `window.__IDENTITY_BRIDGE_CONFIG__`. `Ok(None)` when none is set.
    pub fn from_environment() -> ProviderResult<Option<Self>> {
        environment::raw_config()
            .map(|raw| Self::from_json(&raw))
            .transpose()
    }

    pub fn provider(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        match kind {
            ProviderKind::Google => self.google.as_ref(),
            ProviderKind::Facebook => self.facebook.as_ref(),
            ProviderKind::Apple => self.apple.as_ref(),
        }
    }

    pub fn validate(&self) -> ProviderResult<()> {
        for kind in ProviderKind::ALL {
            if let Some(config) = self.provider(kind) {
                config.validate(kind)?;
            }
        }
        Ok(())
    }
}
