//! Error types for Railguard

/// Result type alias using Railguard's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Railguard operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An action with this name is already registered
    #[error("action '{0}' is already registered")]
    DuplicateAction(String),

    /// No action with this name is registered
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    /// A registered action handler failed
    #[error("action '{action}' failed: {message}")]
    ActionExecution {
        /// Name of the failing action
        action: String,
        /// Failure reported by the handler
        message: String,
    },

    /// Generation provider failures
    #[error("provider error: {0}")]
    Provider(String),

    /// Policy stage evaluation errors
    #[error("policy error: {0}")]
    Policy(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new action execution error
    pub fn action_execution(action: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ActionExecution {
            action: action.into(),
            message: msg.into(),
        }
    }

    /// Create a new provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a new policy error
    pub fn policy(msg: impl Into<String>) -> Self {
        Self::Policy(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error came from the action registry
    pub fn is_action_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateAction(_) | Self::UnknownAction(_) | Self::ActionExecution { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::DuplicateAction("get_weather".into()).to_string(),
            "action 'get_weather' is already registered"
        );
        assert_eq!(
            Error::action_execution("get_weather", "missing location").to_string(),
            "action 'get_weather' failed: missing location"
        );
        assert_eq!(Error::provider("timeout").to_string(), "provider error: timeout");
    }

    #[test]
    fn test_action_error_classification() {
        assert!(Error::UnknownAction("x".into()).is_action_error());
        assert!(!Error::config("bad").is_action_error());
    }
}
