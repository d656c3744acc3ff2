//! Error types for expression evaluation.

use crate::block::{BlockError, BlockResult};
use log::warn;
use thiserror::Error;

/// Errors raised by the scalar CIDR predicate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CidrError {
    #[error("Invalid IP address: {0}")]
    InvalidAddress(String),

    #[error("Invalid CIDR '{cidr}': {reason}")]
    InvalidCidr { cidr: String, reason: String },
}

/// Errors that abort the evaluation of a page.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error(transparent)]
    Block(#[from] BlockError),

    #[error(transparent)]
    Cidr(#[from] CidrError),

    #[error("{evaluator} declares {declared} cidr operands but was given {actual}")]
    OperandCountMismatch {
        evaluator: &'static str,
        declared: usize,
        actual: usize,
    },

    #[error("Operand {operand} produced {actual} positions for a page of {expected}")]
    PositionCountMismatch {
        operand: String,
        expected: usize,
        actual: usize,
    },

    #[error("{error} (release also failed: {suppressed})")]
    Suppressed {
        #[source]
        error: Box<EvalError>,
        suppressed: BlockError,
    },
}

impl EvalError {
    /// The error that aborted evaluation, without any suppressed release
    /// failure.
    pub fn primary(&self) -> &EvalError {
        match self {
            EvalError::Suppressed { error, .. } => error.primary(),
            other => other,
        }
    }

    /// The release failure suppressed behind this error, if any.
    pub fn suppressed(&self) -> Option<&BlockError> {
        match self {
            EvalError::Suppressed { suppressed, .. } => Some(suppressed),
            _ => None,
        }
    }
}

/// Result type for expression evaluation.
pub type EvalResult<T> = Result<T, EvalError>;

/// Combine the outcome of an evaluation with the release of its intermediate
/// resources.
///
/// A release failure after a successful evaluation is returned as the error
/// (the value is dropped, releasing it). A release failure after a failed
/// evaluation is attached to the evaluation error as suppressed.
pub(crate) fn with_release<T>(result: EvalResult<T>, released: BlockResult<()>) -> EvalResult<T> {
    match (result, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(value), Err(release_error)) => {
            drop(value);
            Err(release_error.into())
        }
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(release_error)) => {
            warn!(
                "Release failed after evaluation error '{}': {}",
                error, release_error
            );
            Err(EvalError::Suppressed {
                error: Box::new(error),
                suppressed: release_error,
            })
        }
    }
}
