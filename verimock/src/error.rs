// vim: tw=80
//! Failure taxonomy.
//!
//! Verification failures and API-misuse errors are distinct classes: a
//! [`VerificationError`] is the deterministic verdict of a checker over the
//! recorded history, while a [`UsageError`] is raised before any checking
//! happens.  Every message is fully rendered at construction; nothing is
//! formatted lazily.

use thiserror::Error;

/// Any error produced by the verification engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error(transparent)]
    Usage(#[from] UsageError),
}

impl Error {
    /// The verification failure, if that is what this is.
    pub fn as_verification(&self) -> Option<&VerificationError> {
        match self {
            Error::Verification(e) => Some(e),
            Error::Usage(_) => None,
        }
    }

    /// The usage error, if that is what this is.
    pub fn as_usage(&self) -> Option<&UsageError> {
        match self {
            Error::Verification(_) => None,
            Error::Usage(e) => Some(e),
        }
    }
}

/// A failed verification verdict.
///
/// The `message` fields carry the complete human-readable diagnostic; the
/// remaining fields expose the counts the message was rendered from.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// A positive expectation had zero matching invocations.
    #[error("{message}")]
    WantedButNotInvoked { message: String },

    /// Zero matches, but a same-or-similarly-named call was found whose
    /// arguments differ: the closest-miss refinement of
    /// [`VerificationError::WantedButNotInvoked`].
    #[error("{message}")]
    ArgumentsAreDifferent {
        message: String,
        wanted: String,
        actual: String,
    },

    /// Matches were found, but fewer than required.
    #[error("{message}")]
    TooFewActualInvocations {
        message: String,
        wanted_count: usize,
        actual_count: usize,
    },

    /// More matches than an exact expectation allows.
    #[error("{message}")]
    TooManyActualInvocations {
        message: String,
        wanted_count: usize,
        actual_count: usize,
    },

    /// More matches than an at-most or range bound allows.
    #[error("{message}")]
    MoreThanAllowedActualInvocations {
        message: String,
        max_count: usize,
        actual_count: usize,
    },

    /// A `times(0)` expectation was violated.
    #[error("{message}")]
    NeverWantedButInvoked { message: String },

    /// Any ordered-verification failure.
    #[error("{message}")]
    VerificationInOrderFailure { message: String },

    /// An unverified, non-ignored invocation remained after a
    /// no-more-interactions assertion.
    #[error("{message}")]
    NoInteractionsWanted { message: String },
}

/// Incorrect use of the verification API.  Raised immediately, before any
/// side effect, and never as the verdict of a count decision.
#[derive(Debug, Error)]
pub enum UsageError {
    /// The matcher count fits neither the expanded-argument count nor the
    /// raw count with a trailing vararg-aware matcher.
    #[error("{message}")]
    InvalidUseOfMatchers {
        message: String,
        expected: usize,
        recorded: usize,
    },

    /// A verification mode that has no ordered variant was passed to an
    /// `InOrder` session.
    #[error("{mode} is not implemented to work with InOrder")]
    NotImplementedForInOrder { mode: &'static str },

    /// `calls` is meaningful only within ordered verification.
    #[error("calls is only intended to work with InOrder")]
    CallsRequiresInOrder,

    /// `calls` requires a positive count.
    #[error("Negative and zero values are not allowed here")]
    NonPositiveCalls,

    /// A descending range bound.
    #[error("The minimum number of invocations must not exceed the maximum")]
    InvalidRange { min: usize, max: usize },

    /// The verified mock was not part of the `InOrder` session.
    #[error("{message}")]
    UnfamiliarMockForInOrder { message: String },
}
