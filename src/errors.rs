// Copyright 2025 Cowboy AI, LLC.

//! Error types for composition and dispatch

use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while synthesizing a composite type
#[derive(Debug, Clone, Error)]
pub enum CompositionError {
    /// Precedence edges for a method cannot be linearized
    #[error("Cyclic precedence for method {method}: unresolved {unresolved:?}")]
    CyclicPrecedence {
        /// Method whose candidates could not be ordered
        method: String,
        /// Behaviours left over when no further root could be removed
        unresolved: Vec<String>,
    },

    /// A behaviour module has no usable constructor
    ///
    /// The composer handles this locally by excluding the behaviour; it only
    /// surfaces through [`crate::CompositeTypeDescriptor::excluded`].
    #[error("Behaviour {behaviour} has no usable constructor")]
    MissingConstructor {
        /// Name of the behaviour that was excluded
        behaviour: String,
    },

    /// A role named by the request or a parent edge is not in the catalog
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// A behaviour named by the request or a requirement is not in the catalog
    #[error("Unknown behaviour: {0}")]
    UnknownBehaviour(String),

    /// The requested base type is not in the catalog
    #[error("Unknown base type: {0}")]
    UnknownBaseType(String),

    /// Role inheritance forms a cycle
    #[error("Cyclic role inheritance: {0:?}")]
    CyclicRoles(Vec<String>),

    /// Behaviour requirements form a cycle
    #[error("Cyclic behaviour requirements: {0:?}")]
    CyclicBehaviours(Vec<String>),

    /// An implementation's shape cannot be matched to any collated method
    #[error("Unresolvable shape for {method}: {detail}")]
    UnresolvableShape {
        /// Method name involved
        method: String,
        /// What could not be reconciled
        detail: String,
    },

    /// A catalog entry with this name is already registered
    #[error("{kind} {name} already registered")]
    DuplicateName {
        /// What was being registered: role, behaviour or base type
        kind: String,
        /// The conflicting name
        name: String,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unexpected internal failure
    #[error("Internal composition error: {0}")]
    Internal(String),
}

/// Result type for composition
pub type CompositionResult<T> = Result<T, CompositionError>;

impl From<serde_json::Error> for CompositionError {
    fn from(err: serde_json::Error) -> Self {
        CompositionError::Configuration(err.to_string())
    }
}

impl CompositionError {
    /// Check if this error is structural (aborts composition, never retried)
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            CompositionError::CyclicPrecedence { .. }
                | CompositionError::CyclicRoles(_)
                | CompositionError::CyclicBehaviours(_)
                | CompositionError::UnresolvableShape { .. }
        )
    }

    /// Check if this error rejects a registration that clashes with the catalog
    pub fn is_conflict(&self) -> bool {
        matches!(self, CompositionError::DuplicateName { .. })
    }

    /// Check if this error names something missing from the catalog
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CompositionError::UnknownRole(_)
                | CompositionError::UnknownBehaviour(_)
                | CompositionError::UnknownBaseType(_)
        )
    }
}

/// Errors raised while invoking a composite method
#[derive(Debug, Clone, Error)]
pub enum InvocationError {
    /// A behaviour body reported a failure
    #[error("{0}")]
    Failed(String),

    /// An underlying error, surfaced as-is
    #[error(transparent)]
    Cause(Arc<dyn std::error::Error + Send + Sync>),

    /// No method with this name exists on the composite
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// More than one overload accepts the supplied argument count
    #[error("Ambiguous call to {method} with {arity} arguments")]
    AmbiguousMethod {
        /// Method name
        method: String,
        /// Number of supplied arguments
        arity: usize,
    },

    /// Wrong number of arguments for the resolved signature
    #[error("Method {method} expects {expected} arguments, got {actual}")]
    ArityMismatch {
        /// Method name
        method: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        actual: usize,
    },

    /// A body asked for an argument position that does not exist
    #[error("Missing argument {0}")]
    MissingArgument(usize),

    /// A message parameter identifier is not declared on the method
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// A body asked for behaviour state of the wrong type
    #[error("Behaviour state is not a {expected}")]
    StateMismatch {
        /// Requested type name
        expected: &'static str,
    },

    /// A behaviour slot could not be constructed
    #[error("Failed to construct behaviour {behaviour}: {reason}")]
    SlotConstruction {
        /// Behaviour whose constructor failed
        behaviour: String,
        /// Reason reported by the constructor
        reason: String,
    },

    /// Unexpected internal failure during dispatch
    #[error("Internal dispatch error: {0}")]
    Internal(String),
}

/// Result type for composite method invocation
pub type InvocationResult<T> = Result<T, InvocationError>;

impl InvocationError {
    /// Create a behaviour failure
    pub fn failed(msg: impl Into<String>) -> Self {
        InvocationError::Failed(msg.into())
    }

    /// Wrap an arbitrary error as the original cause
    pub fn cause<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        InvocationError::Cause(Arc::new(err))
    }

    /// Check if this error was produced by a behaviour rather than by dispatch
    pub fn is_behaviour_failure(&self) -> bool {
        matches!(self, InvocationError::Failed(_) | InvocationError::Cause(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyclic_precedence_display() {
        let err = CompositionError::CyclicPrecedence {
            method: "area".to_string(),
            unresolved: vec!["A".to_string(), "B".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Cyclic precedence for method area: unresolved [\"A\", \"B\"]"
        );
        assert!(err.is_structural());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_classification() {
        assert!(CompositionError::UnknownRole("Shape".into()).is_not_found());
        assert!(CompositionError::UnknownBehaviour("Circle".into()).is_not_found());
        assert!(!CompositionError::Internal("boom".into()).is_not_found());
    }

    #[test]
    fn test_duplicate_name_is_a_conflict() {
        let err = CompositionError::DuplicateName {
            kind: "Role".into(),
            name: "Shape".into(),
        };
        assert_eq!(err.to_string(), "Role Shape already registered");
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
        assert!(!err.is_structural());
        assert!(!CompositionError::Internal("boom".into()).is_conflict());
    }

    #[test]
    fn test_cause_is_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = InvocationError::cause(io);
        assert_eq!(err.to_string(), "disk on fire");
        assert!(err.is_behaviour_failure());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: CompositionError = json_err.into();
        assert!(matches!(err, CompositionError::Configuration(_)));
    }
}
