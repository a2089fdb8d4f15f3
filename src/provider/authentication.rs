use std::rc::Rc;

use crate::platform::BrowserHost;
use crate::provider::error::{ProviderError, ProviderResult};
use crate::provider::{IdentityConfig, ProviderContext, ProviderKind, ProviderScope};

/// Mounts every provider present in an [`IdentityConfig`] and exposes them as one scope.
pub struct AuthenticationProvider {
    contexts: Vec<ProviderContext>,
    scope: ProviderScope,
}

impl AuthenticationProvider {
    pub fn mount(host: Rc<dyn BrowserHost>, config: &IdentityConfig) -> ProviderResult<Self> {
        config.validate()?;

        let mut contexts = Vec::new();
        let mut scope = ProviderScope::new();
        for kind in ProviderKind::ALL {
            if let Some(provider_config) = config.provider(kind) {
                let context = ProviderContext::mount(kind, provider_config.clone(), Rc::clone(&host))?;
                scope = scope.with(&context);
                contexts.push(context);
            }
        }

        Ok(Self { contexts, scope })
    }

    /// Mounts the providers described by the environment (see
    /// [`IdentityConfig::from_environment`]).
    pub fn from_environment(host: Rc<dyn BrowserHost>) -> ProviderResult<Self> {
        let config = IdentityConfig::from_environment()?.ok_or_else(|| {
            ProviderError::invalid_configuration("no identity configuration found in the environment")
        })?;
        Self::mount(host, &config)
    }

    pub fn scope(&self) -> &ProviderScope {
        &self.scope
    }

    pub fn context(&self, kind: ProviderKind) -> Option<&ProviderContext> {
        self.contexts.iter().find(|context| context.kind() == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryHost;
    use crate::provider::{ProviderConfig, GOOGLE_SDK_URL};

    #[test]
    fn mounts_only_configured_providers() {
        let host = MemoryHost::shared();
        let config = IdentityConfig {
            google: Some(ProviderConfig::new("google-client")),
            ..Default::default()
        };

        let provider = AuthenticationProvider::mount(host.clone(), &config).unwrap();
        assert!(provider.scope().google().is_ok());
        assert!(matches!(
            provider.scope().facebook(),
            Err(ProviderError::NotMounted { provider: ProviderKind::Facebook })
        ));
        assert_eq!(host.attached_scripts().len(), 1);
        assert_eq!(host.attached_count(GOOGLE_SDK_URL), 1);

        drop(provider);
        assert!(host.attached_scripts().is_empty());
    }
}
