use std::fmt;
use std::rc::Rc;

use crate::provider::error::{ProviderError, ProviderResult};
use crate::provider::{ProviderContext, ProviderContextValue, ProviderKind};

/// The provider contexts visible to a subtree of the application.
///
/// Build it once where the providers are mounted and clone it down to consumers; clones are
/// cheap and read-only. Adding a context for a kind that is already present shadows the
/// outer one, like a nested provider would.
#[derive(Clone, Default)]
pub struct ProviderScope {
    google: Option<Rc<ProviderContextValue>>,
    facebook: Option<Rc<ProviderContextValue>>,
    apple: Option<Rc<ProviderContextValue>>,
}

impl ProviderScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, context: &ProviderContext) -> Self {
        self.with_value(context.value())
    }

    pub fn with_value(mut self, value: Rc<ProviderContextValue>) -> Self {
        let kind = value.kind();
        *self.slot_mut(kind) = Some(value);
        self
    }

    /// Resolves the context for `kind`, failing with [`ProviderError::NotMounted`] when no
    /// provider of that kind wraps this scope.
    pub fn get(&self, kind: ProviderKind) -> ProviderResult<Rc<ProviderContextValue>> {
        self.slot(kind)
            .clone()
            .ok_or(ProviderError::NotMounted { provider: kind })
    }

    pub fn google(&self) -> ProviderResult<Rc<ProviderContextValue>> {
        self.get(ProviderKind::Google)
    }

    pub fn facebook(&self) -> ProviderResult<Rc<ProviderContextValue>> {
        self.get(ProviderKind::Facebook)
    }

    pub fn apple(&self) -> ProviderResult<Rc<ProviderContextValue>> {
        self.get(ProviderKind::Apple)
    }

    pub fn contains(&self, kind: ProviderKind) -> bool {
        self.slot(kind).is_some()
    }

    fn slot(&self, kind: ProviderKind) -> &Option<Rc<ProviderContextValue>> {
        match kind {
            ProviderKind::Google => &self.google,
            ProviderKind::Facebook => &self.facebook,
            ProviderKind::Apple => &self.apple,
        }
    }

    fn slot_mut(&mut self, kind: ProviderKind) -> &mut Option<Rc<ProviderContextValue>> {
        match kind {
            ProviderKind::Google => &mut self.google,
            ProviderKind::Facebook => &mut self.facebook,
            ProviderKind::Apple => &mut self.apple,
        }
    }
}

impl fmt::Debug for ProviderScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mounted: Vec<ProviderKind> = ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .collect();
        f.debug_struct("ProviderScope")
            .field("mounted", &mounted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryHost;
    use crate::provider::ProviderConfig;

    #[test]
    fn missing_provider_is_a_configuration_error() {
        let scope = ProviderScope::new();
        let err = scope.google().unwrap_err();
        assert_eq!(
            err,
            ProviderError::NotMounted {
                provider: ProviderKind::Google
            }
        );
        assert!(err.to_string().contains("wrap the component"));
    }

    #[test]
    fn with_value_fills_the_slot_of_its_kind() {
        let host = MemoryHost::shared();
        let apple = ProviderContext::apple(
            ProviderConfig::new("com.example.web").with_redirect_url("https://example.com/cb"),
            host,
        )
        .unwrap();

        let scope = ProviderScope::new().with_value(apple.value());
        assert!(scope.contains(ProviderKind::Apple));
        assert_eq!(scope.apple().unwrap().client_id(), "com.example.web");
        assert!(scope.google().is_err());
    }

    #[test]
    fn inner_context_shadows_outer() {
        let host = MemoryHost::shared();
        let outer = ProviderContext::google(ProviderConfig::new("outer"), host.clone()).unwrap();
        let inner = ProviderContext::google(ProviderConfig::new("inner"), host.clone()).unwrap();

        let scope = outer.scope().with(&inner);
        assert_eq!(scope.google().unwrap().client_id(), "inner");
        assert!(!scope.contains(ProviderKind::Apple));
    }
}
