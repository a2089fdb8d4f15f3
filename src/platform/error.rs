use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The current target has no document to operate on.
    Unsupported,
    Dom { message: String },
}

pub type HostResult<T> = Result<T, HostError>;

impl HostError {
    pub fn dom(message: impl Into<String>) -> Self {
        HostError::Dom {
            message: message.into(),
        }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Unsupported => write!(
                f,
                "No browser document available; enable the `wasm-web` feature on a wasm32 target"
            ),
            HostError::Dom { message } => write!(f, "DOM error: {message}"),
        }
    }
}

impl std::error::Error for HostError {}
