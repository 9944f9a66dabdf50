use crate::dispatch::EntryPointKey;

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors surfaced by the bridge.
///
/// Only `InvalidArgument` is raised by the bridge's own validation. Failures
/// reported by the native engine arrive as `Native` and are passed through
/// untouched.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("invalid argument: `{name}` must be a non-empty sequence")]
    InvalidArgument { name: &'static str },

    #[error("entry point mismatch: invoked `{invoked}` on a target answering `{target}`")]
    EntryPointMismatch {
        invoked: EntryPointKey,
        target: EntryPointKey,
    },

    #[error("target does not respond to selector `{selector}`")]
    UnknownSelector { selector: String },

    #[error(transparent)]
    Native(#[from] anyhow::Error),
}
