//! Errors in the library.
use thiserror::Error;

/// Errors raised by layers, pools and the backend registry.
///
/// Fallible functions return [`anyhow::Result`]; use `downcast_ref::<EnvError>()`
/// to inspect the kind of a failure.
#[derive(Error, Debug, PartialEq)]
pub enum EnvError {
    /// Declared shapes or options are inconsistent. Raised at construction,
    /// before the first step.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The number of actions given to a pool differs from the number of slots.
    #[error("Action count mismatch: expected {expected}, got {actual}")]
    ActionCountMismatch {
        /// The number of slots.
        expected: usize,
        /// The number of actions.
        actual: usize,
    },

    /// An observation does not have the declared shape.
    #[error("Observation shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The declared shape.
        expected: Vec<usize>,
        /// The shape of the observation.
        actual: Vec<usize>,
    },

    /// No backend is registered with the given id.
    #[error("Unknown environment: {0}")]
    UnknownEnv(String),

    /// A backend is registered but cannot be instantiated.
    #[error("Environment {id} is unavailable: {reason}")]
    Unavailable {
        /// Environment id.
        id: String,
        /// Why the backend is unavailable.
        reason: String,
    },

    /// The pool was closed.
    #[error("The environment pool has been closed")]
    Closed,
}

impl EnvError {
    /// Shorthand for [`EnvError::Configuration`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Returns an error if `actual` differs from `expected`.
    pub fn check_shape(expected: &[usize], actual: &[usize]) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::ShapeMismatch {
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            })
        }
    }
}
