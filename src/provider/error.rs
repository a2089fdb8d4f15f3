use std::fmt;

use crate::platform::HostError;
use crate::provider::ProviderKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// A bridge or consumer was used outside the provider's context. This is a wiring
    /// mistake in the calling code and should be propagated, not handled.
    NotMounted { provider: ProviderKind },
    InvalidConfiguration { message: String },
    Host(HostError),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl ProviderError {
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        ProviderError::InvalidConfiguration {
            message: message.into(),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::NotMounted { provider } => write!(
                f,
                "{provider} context not found: wrap the component in the {provider} provider"
            ),
            ProviderError::InvalidConfiguration { message } => {
                write!(f, "Invalid identity provider configuration: {message}")
            }
            ProviderError::Host(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProviderError::Host(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HostError> for ProviderError {
    fn from(error: HostError) -> Self {
        ProviderError::Host(error)
    }
}
