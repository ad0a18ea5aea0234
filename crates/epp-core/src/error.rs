//! Error taxonomy shared by every encode, decode and dispatch path.
//!
//! Each error is terminal for the one message being processed. None of
//! them poison the factory directory or any other message.

use thiserror::Error;

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, EppError>;

/// Errors raised by the codec core and the mappings built on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EppError {
    /// Caller-preventable: an outbound element is missing a required
    /// field or carries an invalid value.
    #[error("state error: {field}: {reason}")]
    State { field: String, reason: String },

    /// Peer-caused: an inbound fragment is missing a required child or
    /// carries an unparsable value.
    #[error("decode error: <{element}>: {reason}")]
    Decode { element: String, reason: String },

    /// No factory is registered for the namespace of an incoming element.
    #[error("dispatch error: no mapping registered for {{{namespace}}}{element}")]
    Dispatch { namespace: String, element: String },

    /// Configuration error raised while building or registering a factory.
    #[error("registration error: {namespace}: {reason}")]
    Registration { namespace: String, reason: String },
}

/// Coarse classification of an [`EppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    State,
    Decode,
    Dispatch,
    Registration,
}

impl EppError {
    pub fn state(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EppError::State {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// A required field was never set.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::state(field, "must be set")
    }

    pub fn decode(element: impl Into<String>, reason: impl Into<String>) -> Self {
        EppError::Decode {
            element: element.into(),
            reason: reason.into(),
        }
    }

    /// A required child element was absent from an inbound fragment.
    pub fn missing_child(element: impl Into<String>) -> Self {
        Self::decode(element, "required element is absent")
    }

    pub fn dispatch(namespace: impl Into<String>, element: impl Into<String>) -> Self {
        EppError::Dispatch {
            namespace: namespace.into(),
            element: element.into(),
        }
    }

    pub fn registration(namespace: impl Into<String>, reason: impl Into<String>) -> Self {
        EppError::Registration {
            namespace: namespace.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EppError::State { .. } => ErrorKind::State,
            EppError::Decode { .. } => ErrorKind::Decode,
            EppError::Dispatch { .. } => ErrorKind::Dispatch,
            EppError::Registration { .. } => ErrorKind::Registration,
        }
    }

    /// The field or element the error names.
    pub fn subject(&self) -> &str {
        match self {
            EppError::State { field, .. } => field,
            EppError::Decode { element, .. } => element,
            EppError::Dispatch { element, .. } => element,
            EppError::Registration { namespace, .. } => namespace,
        }
    }

    pub fn is_state(&self) -> bool {
        self.kind() == ErrorKind::State
    }

    pub fn is_decode(&self) -> bool {
        self.kind() == ErrorKind::Decode
    }

    pub fn is_dispatch(&self) -> bool {
        self.kind() == ErrorKind::Dispatch
    }
}
