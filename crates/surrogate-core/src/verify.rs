//! Call-count verification against the invocation log.
//!
//! Verification re-runs the same matcher logic used by dispatch over a
//! snapshot of the log. Counting ignores which setup (if any) handled a call
//! and ignores the `verified` flag, so repeating an identical verification
//! always gives the same answer. Every invocation a verification counts is
//! flagged verified, which is what [`Mock::verify_no_other_calls`] checks.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::MockError;
use crate::invocation::{Invocation, SetupId};
use crate::matcher::{CallPattern, Matcher, RangeKind};
use crate::mock::Mock;
use crate::setup::Setup;

/// An inclusive range of acceptable call counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Times {
    min: u64,
    max: u64,
}

impl Times {
    /// Exactly `n` calls.
    #[must_use]
    pub const fn exactly(n: u64) -> Self {
        Self { min: n, max: n }
    }

    /// `n` or more calls.
    #[must_use]
    pub const fn at_least(n: u64) -> Self {
        Self {
            min: n,
            max: u64::MAX,
        }
    }

    /// At most `n` calls.
    #[must_use]
    pub const fn at_most(n: u64) -> Self {
        Self { min: 0, max: n }
    }

    /// No calls.
    #[must_use]
    pub const fn never() -> Self {
        Self::exactly(0)
    }

    /// Exactly one call.
    #[must_use]
    pub const fn once() -> Self {
        Self::exactly(1)
    }

    /// One or more calls.
    #[must_use]
    pub const fn at_least_once() -> Self {
        Self::at_least(1)
    }

    /// Zero or one call.
    #[must_use]
    pub const fn at_most_once() -> Self {
        Self::at_most(1)
    }

    /// Between `from` and `to`. An exclusive range with no integer strictly
    /// inside it accepts no count at all.
    #[must_use]
    pub const fn between(from: u64, to: u64, kind: RangeKind) -> Self {
        match kind {
            RangeKind::Inclusive => Self { min: from, max: to },
            RangeKind::Exclusive => Self {
                min: from.saturating_add(1),
                max: to.saturating_sub(1),
            },
        }
    }

    /// Smallest accepted count.
    #[must_use]
    pub const fn min(self) -> u64 {
        self.min
    }

    /// Largest accepted count; `u64::MAX` means unbounded.
    #[must_use]
    pub const fn max(self) -> u64 {
        self.max
    }

    /// Returns `true` if `count` is in range.
    #[must_use]
    pub const fn contains(self, count: u64) -> bool {
        self.min <= count && count <= self.max
    }
}

impl fmt::Display for Times {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (0, 0) => f.write_str("never"),
            (min, max) if min == max => write!(f, "exactly {min} time(s)"),
            (min, u64::MAX) => write!(f, "at least {min} time(s)"),
            (0, max) => write!(f, "at most {max} time(s)"),
            (min, max) if min > max => f.write_str("an impossible number of times"),
            (min, max) => write!(f, "between {min} and {max} time(s)"),
        }
    }
}

/// Why a [`Mock::verify`] call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationFailure {
    mock: String,
    message: Option<String>,
    pattern: String,
    expected: Times,
    actual: u64,
    setups: Vec<String>,
    calls: Vec<String>,
}

impl VerificationFailure {
    /// The verified mock's name.
    #[must_use]
    pub fn mock(&self) -> &str {
        &self.mock
    }

    /// The caller-supplied message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Rendering of the verified pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The expected range.
    #[must_use]
    pub const fn expected(&self) -> Times {
        self.expected
    }

    /// The number of matching calls.
    #[must_use]
    pub const fn actual(&self) -> u64 {
        self.actual
    }

    /// Setups configured for the verified member.
    #[must_use]
    pub fn setups(&self) -> &[String] {
        &self.setups
    }

    /// Calls recorded for the verified member.
    #[must_use]
    pub fn calls(&self) -> &[String] {
        &self.calls
    }
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.message {
            writeln!(f, "{message}")?;
        }
        writeln!(
            f,
            "{}: expected {} {}, but was called {} time(s)",
            self.mock, self.pattern, self.expected, self.actual
        )?;
        writeln!(f)?;
        writeln!(f, "Configured setups:")?;
        if self.setups.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for setup in &self.setups {
            writeln!(f, "  {setup}")?;
        }
        writeln!(f)?;
        write!(f, "Performed invocations:")?;
        if self.calls.is_empty() {
            write!(f, "\n  (none)")?;
        }
        for call in &self.calls {
            write!(f, "\n  {call}")?;
        }
        Ok(())
    }
}

fn render_call(invocation: &Invocation) -> String {
    format!("{}: {invocation}", invocation.seq())
}

impl Mock {
    /// Checks that the number of recorded calls matching `pattern` is within
    /// `times`, and flags every matching call as verified.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::VerificationFailed`] when the count is out of
    /// range, or a configuration error for a malformed pattern.
    pub fn verify(
        &self,
        pattern: &CallPattern,
        times: Times,
        message: Option<&str>,
    ) -> Result<(), MockError> {
        self.check_member(pattern.member())?;
        pattern.validate_shape()?;

        let matching: Vec<Arc<Invocation>> = self
            .log()
            .snapshot()
            .into_iter()
            .filter(|inv| pattern.matches(inv))
            .collect();
        for invocation in &matching {
            invocation.mark_verified();
        }
        let actual = matching.len() as u64;
        if times.contains(actual) {
            tracing::trace!(mock = %self.name(), %pattern, actual, "verification passed");
            return Ok(());
        }

        let member = pattern.member();
        let failure = VerificationFailure {
            mock: self.name().to_owned(),
            message: message.map(str::to_owned),
            pattern: pattern.to_string(),
            expected: times,
            actual,
            setups: self
                .setups()
                .find_all(Some(member), |_| true)
                .iter()
                .map(ToString::to_string)
                .collect(),
            calls: self
                .log()
                .for_member(member)
                .iter()
                .map(|inv| render_call(inv))
                .collect(),
        };
        tracing::debug!(mock = %self.name(), %pattern, %times, actual, "verification failed");
        Err(MockError::VerificationFailed(Box::new(failure)))
    }

    /// Checks that `pattern` was called at least once.
    ///
    /// # Errors
    ///
    /// See [`Mock::verify`].
    pub fn verify_called(&self, pattern: &CallPattern) -> Result<(), MockError> {
        self.verify(pattern, Times::at_least_once(), None)
    }

    /// Checks the number of reads of `property`.
    ///
    /// # Errors
    ///
    /// See [`Mock::verify`]; [`MockError::UnknownProperty`] if it is not
    /// declared.
    pub fn verify_get(&self, property: &str, times: Times) -> Result<(), MockError> {
        let getter = Arc::clone(self.contract().property(property)?.getter());
        self.verify(&CallPattern::any_args(getter), times, None)
    }

    /// Checks the number of writes of `property` with a value accepted by
    /// `value`.
    ///
    /// # Errors
    ///
    /// See [`Mock::verify`]; a configuration error for unknown or read-only
    /// properties.
    pub fn verify_set(&self, property: &str, value: Matcher, times: Times) -> Result<(), MockError> {
        let setter = self.setter(property)?;
        self.verify(&CallPattern::new(setter, [value]), times, None)
    }

    /// Checks the number of subscriptions to `event`.
    ///
    /// # Errors
    ///
    /// See [`Mock::verify`]; [`MockError::UnknownEvent`] if it is not
    /// declared.
    pub fn verify_subscribed(&self, event: &str, times: Times) -> Result<(), MockError> {
        let add = Arc::clone(self.contract().event(event)?.add());
        self.verify(&CallPattern::any_args(add), times, None)
    }

    /// Fails if any recorded call has not been accounted for by a
    /// verification.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::UnverifiedCalls`] listing the offending calls.
    pub fn verify_no_other_calls(&self) -> Result<(), MockError> {
        let unverified = self.log().unverified();
        if unverified.is_empty() {
            return Ok(());
        }
        Err(MockError::UnverifiedCalls {
            mock: self.name().to_owned(),
            calls: unverified.iter().map(|inv| render_call(inv)).collect(),
        })
    }

    /// Checks that every setup was matched at least once, or within its own
    /// expected [`Times`] when one was given. Property stubs are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::SetupsNotMet`] listing the unmet setups.
    pub fn verify_all(&self) -> Result<(), MockError> {
        self.verify_setups(|setup| !setup.is_property_stub())
    }

    /// Like [`Mock::verify_all`], restricted to setups flagged verifiable.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::SetupsNotMet`] listing the unmet setups.
    pub fn verify_verifiable(&self) -> Result<(), MockError> {
        self.verify_setups(Setup::is_verifiable)
    }

    /// Counts are taken from the current log, so calls forgotten by
    /// [`Mock::reset_calls`] no longer count.
    fn verify_setups<F>(&self, filter: F) -> Result<(), MockError>
    where
        F: Fn(&Setup) -> bool,
    {
        let checked: Vec<Arc<Setup>> = self.setups().find_all(None, filter);
        let invocations = self.log().snapshot();
        let mut unmet = Vec::new();
        for setup in &checked {
            let handled: Vec<&Arc<Invocation>> = invocations
                .iter()
                .filter(|inv| inv.matched_by() == Some(setup.id()))
                .collect();
            for invocation in &handled {
                invocation.mark_verified();
            }
            let expected = setup.expected_times().unwrap_or_else(Times::at_least_once);
            let actual = handled.len() as u64;
            if !expected.contains(actual) {
                unmet.push(format!("{setup}: expected {expected}, was matched {actual} time(s)"));
            }
        }
        if unmet.is_empty() {
            return Ok(());
        }
        tracing::debug!(mock = %self.name(), unmet = unmet.len(), "setups not met");
        Err(MockError::SetupsNotMet {
            mock: self.name().to_owned(),
            setups: unmet,
        })
    }

    /// Ids of the setups that handled no recorded call.
    #[must_use]
    pub fn unmatched_setups(&self) -> Vec<SetupId> {
        let invocations = self.log().snapshot();
        self.setups()
            .snapshot()
            .iter()
            .map(|setup| setup.id())
            .filter(|id| !invocations.iter().any(|inv| inv.matched_by() == Some(*id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn named_ranges() {
        assert!(Times::never().contains(0));
        assert!(!Times::never().contains(1));
        assert!(Times::once().contains(1));
        assert!(!Times::once().contains(2));
        assert!(Times::at_least_once().contains(u64::MAX));
        assert!(Times::at_most_once().contains(0));
        assert!(!Times::at_most(3).contains(4));
    }

    #[test]
    fn exclusive_between_trims_both_ends() {
        let times = Times::between(1, 4, RangeKind::Exclusive);
        assert_eq!((times.min(), times.max()), (2, 3));
        assert!(!Times::between(1, 2, RangeKind::Exclusive).contains(1));
        assert!(!Times::between(1, 2, RangeKind::Exclusive).contains(2));
        assert!(Times::between(1, 2, RangeKind::Inclusive).contains(2));
    }

    #[test]
    fn display_reads_naturally() {
        assert_eq!(Times::never().to_string(), "never");
        assert_eq!(Times::exactly(2).to_string(), "exactly 2 time(s)");
        assert_eq!(Times::at_least(1).to_string(), "at least 1 time(s)");
        assert_eq!(Times::at_most(3).to_string(), "at most 3 time(s)");
        assert_eq!(
            Times::between(1, 3, RangeKind::Inclusive).to_string(),
            "between 1 and 3 time(s)"
        );
    }

    proptest! {
        #[test]
        fn prop_exactly_accepts_only_n(n in 0u64..1000, k in 0u64..1000) {
            prop_assert_eq!(Times::exactly(n).contains(k), n == k);
        }

        #[test]
        fn prop_inclusive_between_is_the_closed_interval(
            a in 0u64..500,
            b in 0u64..500,
            k in 0u64..600,
        ) {
            let times = Times::between(a, b, RangeKind::Inclusive);
            prop_assert_eq!(times.contains(k), a <= k && k <= b);
        }

        #[test]
        fn prop_exclusive_is_inside_inclusive(a in 0u64..500, b in 0u64..500, k in 0u64..600) {
            if Times::between(a, b, RangeKind::Exclusive).contains(k) {
                prop_assert!(Times::between(a, b, RangeKind::Inclusive).contains(k));
                prop_assert!(k != a && k != b);
            }
        }
    }
}
