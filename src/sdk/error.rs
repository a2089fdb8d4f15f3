use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    /// The global the call needs was not installed by the provider script.
    Unavailable { global: &'static str },
    /// The SDK method threw or returned something unexpected.
    Call { method: &'static str, message: String },
}

pub type SdkResult<T> = Result<T, SdkError>;

impl SdkError {
    pub fn call(method: &'static str, message: impl Into<String>) -> Self {
        SdkError::Call {
            method,
            message: message.into(),
        }
    }
}

impl fmt::Display for SdkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdkError::Unavailable { global } => write!(f, "`{global}` is not available"),
            SdkError::Call { method, message } => write!(f, "{method}() failed: {message}"),
        }
    }
}

impl std::error::Error for SdkError {}
