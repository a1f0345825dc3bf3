//! Error types for mock configuration, dispatch and verification.
//!
//! Every failure surfaces through [`MockError`]. The variants fall into four
//! groups:
//!
//! - **Configuration**: a malformed setup or call (wrong arity, unknown or
//!   sealed member). Reported synchronously by the operation that was handed
//!   the bad input.
//! - **Unmatched strict call**: a strict mock received a call no setup
//!   governs.
//! - **Verification**: an expected call count was not met, or calls were left
//!   unverified.
//! - **User fault**: an error a setup was configured to throw, or one raised
//!   by an event handler. It is carried verbatim as [`MockError::Thrown`] and
//!   displays exactly like the original error.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::verify::VerificationFailure;

/// Errors produced by the interception engine.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum MockError {
    /// A setup or call supplied the wrong number of arguments.
    #[error("{member} expects {expected} argument(s), got {actual}")]
    ArityMismatch {
        /// The member signature.
        member: String,
        /// Declared parameter count.
        expected: usize,
        /// Number of matchers or arguments supplied.
        actual: usize,
    },

    /// A setup or call supplied the wrong number of generic arguments.
    #[error("{member} expects {expected} generic argument(s), got {actual}")]
    GenericArityMismatch {
        /// The member signature.
        member: String,
        /// Declared generic parameter count.
        expected: usize,
        /// Number of generic arguments supplied.
        actual: usize,
    },

    /// The member does not belong to the mocked contract.
    #[error("contract {contract} has no member {member}")]
    UnknownMember {
        /// The mocked contract.
        contract: String,
        /// The offending member.
        member: String,
    },

    /// The member cannot be intercepted.
    #[error("{member} is not overridable and cannot be set up")]
    NotOverridable {
        /// The member signature.
        member: String,
    },

    /// The contract declares no such event.
    #[error("contract {contract} has no event {event}")]
    UnknownEvent {
        /// The mocked contract.
        contract: String,
        /// The requested event name.
        event: String,
    },

    /// The contract declares no such property.
    #[error("contract {contract} has no property {property}")]
    UnknownProperty {
        /// The mocked contract.
        contract: String,
        /// The requested property name.
        property: String,
    },

    /// A matcher pattern could not be compiled.
    #[error("invalid matcher pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The pattern source.
        pattern: String,
        /// Why compilation failed.
        reason: String,
    },

    /// A strict mock received a call that no setup governs.
    #[error(
        "{mock} invocation failed with strict behavior: all invocations on the mock must have \
         a corresponding setup ({call})"
    )]
    UnmatchedCall {
        /// The mock name.
        mock: String,
        /// Rendering of the attempted call.
        call: String,
    },

    /// Delegation to a base implementation was requested but is impossible.
    #[error("{mock}: cannot call base for {member}: no base implementation available")]
    BaseUnavailable {
        /// The mock name.
        mock: String,
        /// The member signature.
        member: String,
    },

    /// A call count fell outside the expected range.
    #[error("{0}")]
    VerificationFailed(Box<VerificationFailure>),

    /// Calls were recorded that no verification accounted for.
    #[error(
        "{mock}: {} call(s) were not verified:\n{}",
        .calls.len(),
        render_lines(.calls)
    )]
    UnverifiedCalls {
        /// The mock name.
        mock: String,
        /// Rendering of every unverified call.
        calls: Vec<String>,
    },

    /// Setups checked by `verify_all` or `verify_verifiable` were not met.
    #[error(
        "{mock}: {} setup(s) were not matched as expected:\n{}",
        .setups.len(),
        render_lines(.setups)
    )]
    SetupsNotMet {
        /// The mock name.
        mock: String,
        /// Rendering of every unmet setup.
        setups: Vec<String>,
    },

    /// An error configured by the test (throw behavior or event handler).
    #[error(transparent)]
    Thrown(Fault),
}

fn render_lines(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl MockError {
    /// Creates a new arity mismatch error.
    #[must_use]
    pub fn arity_mismatch(member: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ArityMismatch {
            member: member.into(),
            expected,
            actual,
        }
    }

    /// Creates a new unknown member error.
    #[must_use]
    pub fn unknown_member(contract: impl Into<String>, member: impl Into<String>) -> Self {
        Self::UnknownMember {
            contract: contract.into(),
            member: member.into(),
        }
    }

    /// Creates a new unknown event error.
    #[must_use]
    pub fn unknown_event(contract: impl Into<String>, event: impl Into<String>) -> Self {
        Self::UnknownEvent {
            contract: contract.into(),
            event: event.into(),
        }
    }

    /// Creates a new unknown property error.
    #[must_use]
    pub fn unknown_property(contract: impl Into<String>, property: impl Into<String>) -> Self {
        Self::UnknownProperty {
            contract: contract.into(),
            property: property.into(),
        }
    }

    /// Returns `true` for malformed setups and calls.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ArityMismatch { .. }
                | Self::GenericArityMismatch { .. }
                | Self::UnknownMember { .. }
                | Self::NotOverridable { .. }
                | Self::UnknownEvent { .. }
                | Self::UnknownProperty { .. }
                | Self::InvalidPattern { .. }
        )
    }

    /// Returns `true` for failed verifications.
    #[must_use]
    pub const fn is_verification(&self) -> bool {
        matches!(
            self,
            Self::VerificationFailed(_) | Self::UnverifiedCalls { .. } | Self::SetupsNotMet { .. }
        )
    }

    /// Returns `true` if this error was configured by the test rather than
    /// produced by the engine.
    #[must_use]
    pub const fn is_user_fault(&self) -> bool {
        matches!(self, Self::Thrown(_))
    }

    /// Returns the user fault, if this is one.
    #[must_use]
    pub const fn as_fault(&self) -> Option<&Fault> {
        match self {
            Self::Thrown(fault) => Some(fault),
            _ => None,
        }
    }

    /// Returns the verification report, if this is a count failure.
    #[must_use]
    pub fn as_verification_failure(&self) -> Option<&VerificationFailure> {
        match self {
            Self::VerificationFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// An error a test configured a mock to produce.
///
/// `Fault` is shared so that a single configured error can be returned from
/// every matching call. It displays, and reports its source, exactly like the
/// wrapped error.
#[derive(Clone)]
pub struct Fault(Arc<dyn StdError + Send + Sync + 'static>);

impl Fault {
    /// Wraps an error value.
    pub fn new<E: StdError + Send + Sync + 'static>(error: E) -> Self {
        Self(Arc::new(error))
    }

    /// Creates a fault carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(FaultMessage(message.into()))
    }

    /// Attempts to view the wrapped error as an `E`.
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    /// Returns `true` if both faults share the same error instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl StdError for Fault {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// Message-only error created by [`Fault::msg`].
#[derive(Debug, Error)]
#[error("{0}")]
pub struct FaultMessage(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("disk full on {0}")]
    struct DiskFull(&'static str);

    #[test]
    fn thrown_faults_display_verbatim() {
        let err = MockError::Thrown(Fault::new(DiskFull("/var")));
        assert_eq!(err.to_string(), "disk full on /var");
        assert!(err.is_user_fault());
        assert!(!err.is_configuration());
        let fault = err.as_fault().expect("fault");
        assert!(fault.downcast_ref::<DiskFull>().is_some());
    }

    #[test]
    fn classification_helpers() {
        assert!(MockError::arity_mismatch("Svc.f(i64)", 1, 2).is_configuration());
        assert!(MockError::unknown_event("Svc", "changed").is_configuration());
        let unverified = MockError::UnverifiedCalls {
            mock: "Mock<Svc:1>".into(),
            calls: vec!["Svc.f(1)".into(), "Svc.f(2)".into()],
        };
        assert!(unverified.is_verification());
        assert_eq!(
            unverified.to_string(),
            "Mock<Svc:1>: 2 call(s) were not verified:\n  Svc.f(1)\n  Svc.f(2)"
        );
    }

    #[test]
    fn cloned_faults_share_identity() {
        let fault = Fault::msg("boom");
        let clone = fault.clone();
        assert!(fault.ptr_eq(&clone));
        assert!(!fault.ptr_eq(&Fault::msg("boom")));
        assert_eq!(clone.to_string(), "boom");
    }
}
