//! Argument matchers and call patterns.
//!
//! A [`Matcher`] is a predicate over one argument value. A [`CallPattern`]
//! pairs a member (plus a generic instantiation pattern) with one matcher per
//! parameter; setups and verifications are both expressed as call patterns.
//!
//! Matcher evaluation is pure. Verification re-runs the same matchers
//! against stored argument snapshots long after dispatch, so a matcher must
//! give the same answer every time it sees the same value.
//!
//! # Example
//!
//! ```rust
//! use surrogate_core::contract::{Contract, TypeDescriptor};
//! use surrogate_core::matcher::{CallPattern, Matcher, RangeKind};
//! use surrogate_core::value::Value;
//!
//! let svc = Contract::interface("Svc")
//!     .method(
//!         "lookup",
//!         [("name", TypeDescriptor::string()), ("limit", TypeDescriptor::int())],
//!         TypeDescriptor::string(),
//!     )
//!     .build();
//! let pattern = CallPattern::new(
//!     svc.method("lookup").unwrap(),
//!     [
//!         Matcher::regex("^user-[0-9]+$").unwrap(),
//!         Matcher::between(1, 10, RangeKind::Inclusive),
//!     ],
//! );
//! assert!(pattern.matches_args(&[Value::from("user-7"), Value::Int(10)]));
//! assert!(!pattern.matches_args(&[Value::from("admin"), Value::Int(3)]));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::contract::{Member, TypeDescriptor};
use crate::error::MockError;
use crate::invocation::Invocation;
use crate::value::{Value, write_joined};

/// Whether range bounds are part of the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RangeKind {
    /// Both bounds are included.
    #[default]
    Inclusive,
    /// Both bounds are excluded.
    Exclusive,
}

type PredicateFn = dyn Fn(&Value, &TypeDescriptor) -> bool + Send + Sync;

#[derive(Clone)]
enum Kind {
    Eq(Value),
    Any,
    OfType(TypeDescriptor),
    Predicate {
        description: Arc<str>,
        test: Arc<PredicateFn>,
    },
    Range {
        low: Value,
        high: Value,
        kind: RangeKind,
    },
    Regex(Regex),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    NotNull,
    Not(Box<Matcher>),
}

/// A predicate over one argument.
#[derive(Clone)]
pub struct Matcher(Kind);

impl Matcher {
    /// Accepts values equal to `value`.
    pub fn eq(value: impl Into<Value>) -> Self {
        Self(Kind::Eq(value.into()))
    }

    /// Accepts any value the parameter type admits. Null passes only when the
    /// parameter is nullable.
    #[must_use]
    pub const fn any() -> Self {
        Self(Kind::Any)
    }

    /// Accepts values assignable to `ty`.
    #[must_use]
    pub const fn of_type(ty: TypeDescriptor) -> Self {
        Self(Kind::OfType(ty))
    }

    /// Accepts values for which `test` returns `true`.
    ///
    /// `test` receives the value and the declared parameter type. It must be
    /// free of side effects: it runs again during verification.
    pub fn predicate<F>(description: impl Into<Arc<str>>, test: F) -> Self
    where
        F: Fn(&Value, &TypeDescriptor) -> bool + Send + Sync + 'static,
    {
        Self(Kind::Predicate {
            description: description.into(),
            test: Arc::new(test),
        })
    }

    /// Accepts values ordered between `low` and `high`.
    pub fn between(low: impl Into<Value>, high: impl Into<Value>, kind: RangeKind) -> Self {
        Self(Kind::Range {
            low: low.into(),
            high: high.into(),
            kind,
        })
    }

    /// Accepts strings matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::InvalidPattern`] if the pattern does not compile.
    pub fn regex(pattern: &str) -> Result<Self, MockError> {
        Regex::new(pattern)
            .map(|re| Self(Kind::Regex(re)))
            .map_err(|e| MockError::InvalidPattern {
                pattern: pattern.to_owned(),
                reason: e.to_string(),
            })
    }

    /// Accepts values equal to one of `values`.
    pub fn is_in(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self(Kind::In(values.into_iter().map(Into::into).collect()))
    }

    /// Accepts values equal to none of `values`.
    pub fn not_in(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self(Kind::NotIn(values.into_iter().map(Into::into).collect()))
    }

    /// Accepts every non-null value.
    #[must_use]
    pub const fn not_null() -> Self {
        Self(Kind::NotNull)
    }

    /// Inverts `inner`.
    #[must_use]
    pub fn not(inner: Self) -> Self {
        Self(Kind::Not(Box::new(inner)))
    }

    /// Evaluates the matcher against one argument of type `ty`.
    #[must_use]
    pub fn matches(&self, value: &Value, ty: &TypeDescriptor) -> bool {
        match &self.0 {
            Kind::Eq(expected) => value == expected,
            Kind::Any => ty.accepts(value),
            Kind::OfType(wanted) => wanted.accepts(value),
            Kind::Predicate { test, .. } => test(value, ty),
            Kind::Range { low, high, kind } => {
                let above = value.compare(low);
                let below = value.compare(high);
                match kind {
                    RangeKind::Inclusive => {
                        matches!(above, Some(Ordering::Greater | Ordering::Equal))
                            && matches!(below, Some(Ordering::Less | Ordering::Equal))
                    },
                    RangeKind::Exclusive => {
                        above == Some(Ordering::Greater) && below == Some(Ordering::Less)
                    },
                }
            },
            Kind::Regex(re) => value.as_str().is_some_and(|s| re.is_match(s)),
            Kind::In(values) => values.contains(value),
            Kind::NotIn(values) => !values.contains(value),
            Kind::NotNull => !value.is_null(),
            Kind::Not(inner) => !inner.matches(value, ty),
        }
    }

    /// Returns `true` for the unconstrained [`Matcher::any`].
    #[must_use]
    pub const fn is_any(&self) -> bool {
        matches!(self.0, Kind::Any)
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Kind::Eq(v) => write!(f, "{v}"),
            Kind::Any => f.write_str("any"),
            Kind::OfType(ty) => write!(f, "any<{ty}>"),
            Kind::Predicate { description, .. } => write!(f, "is({description})"),
            Kind::Range { low, high, kind } => {
                let (open, close) = match kind {
                    RangeKind::Inclusive => ('[', ']'),
                    RangeKind::Exclusive => ('(', ')'),
                };
                write!(f, "in{open}{low}, {high}{close}")
            },
            Kind::Regex(re) => write!(f, "matches(/{}/)", re.as_str()),
            Kind::In(values) => {
                f.write_str("one_of[")?;
                write_joined(f, values.iter())?;
                f.write_str("]")
            },
            Kind::NotIn(values) => {
                f.write_str("none_of[")?;
                write_joined(f, values.iter())?;
                f.write_str("]")
            },
            Kind::NotNull => f.write_str("not_null"),
            Kind::Not(inner) => write!(f, "not({inner})"),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matcher({self})")
    }
}

/// Pattern for one generic type argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeArg {
    /// Exactly this type.
    Exact(TypeDescriptor),
    /// Any type.
    Any,
}

impl fmt::Display for TypeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(ty) => write!(f, "{ty}"),
            Self::Any => f.write_str("?"),
        }
    }
}

/// A member plus per-parameter matchers: the abstract form of `f(any, 5)`.
#[derive(Debug, Clone)]
pub struct CallPattern {
    member: Arc<Member>,
    generic_args: Vec<TypeArg>,
    matchers: Vec<Matcher>,
}

impl CallPattern {
    /// A pattern over `member` with one matcher per parameter.
    pub fn new(member: Arc<Member>, matchers: impl IntoIterator<Item = Matcher>) -> Self {
        Self {
            member,
            generic_args: Vec::new(),
            matchers: matchers.into_iter().collect(),
        }
    }

    /// A pattern accepting any arguments for `member`.
    #[must_use]
    pub fn any_args(member: Arc<Member>) -> Self {
        let arity = member.params().len();
        Self::new(member, (0..arity).map(|_| Matcher::any()))
    }

    /// Restricts the generic instantiation. Without this every instantiation
    /// matches.
    #[must_use]
    pub fn with_generic_args(mut self, generic_args: impl IntoIterator<Item = TypeArg>) -> Self {
        self.generic_args = generic_args.into_iter().collect();
        self
    }

    /// The targeted member.
    #[must_use]
    pub const fn member(&self) -> &Arc<Member> {
        &self.member
    }

    /// The per-parameter matchers.
    #[must_use]
    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// Checks arity and overridability.
    pub(crate) fn validate(&self) -> Result<(), MockError> {
        if !self.member.is_overridable() {
            return Err(MockError::NotOverridable {
                member: self.member.to_string(),
            });
        }
        self.validate_shape()
    }

    /// Checks arity only; verification may target sealed members too.
    pub(crate) fn validate_shape(&self) -> Result<(), MockError> {
        let expected = self.member.params().len();
        if self.matchers.len() != expected {
            return Err(MockError::arity_mismatch(
                self.member.to_string(),
                expected,
                self.matchers.len(),
            ));
        }
        let generic_arity = self.member.generic_arity();
        if !self.generic_args.is_empty() && self.generic_args.len() != generic_arity {
            return Err(MockError::GenericArityMismatch {
                member: self.member.to_string(),
                expected: generic_arity,
                actual: self.generic_args.len(),
            });
        }
        Ok(())
    }

    /// Returns `true` if the call targets this pattern's member with an
    /// accepted generic instantiation.
    #[must_use]
    pub fn matches_member(&self, member: &Member, generic_args: &[TypeDescriptor]) -> bool {
        *self.member == *member
            && (self.generic_args.is_empty()
                || self
                    .generic_args
                    .iter()
                    .zip(generic_args)
                    .all(|(pattern, actual)| match pattern {
                        TypeArg::Any => true,
                        TypeArg::Exact(ty) => ty == actual,
                    }))
    }

    /// Returns `true` if every positional matcher accepts its argument.
    /// Stops at the first rejection.
    #[must_use]
    pub fn matches_args(&self, args: &[Value]) -> bool {
        self.matchers.len() == args.len()
            && self
                .matchers
                .iter()
                .zip(args)
                .zip(self.member.params())
                .all(|((matcher, value), param)| matcher.matches(value, &param.ty))
    }

    /// Returns `true` if `invocation` satisfies this pattern.
    #[must_use]
    pub fn matches(&self, invocation: &Invocation) -> bool {
        self.matches_member(invocation.member(), invocation.generic_args())
            && self.matches_args(invocation.args())
    }
}

impl fmt::Display for CallPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.member.contract(), self.member.name())?;
        if !self.generic_args.is_empty() {
            f.write_str("<")?;
            write_joined(f, self.generic_args.iter())?;
            f.write_str(">")?;
        }
        f.write_str("(")?;
        write_joined(f, self.matchers.iter())?;
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::contract::Contract;

    fn pattern(matchers: Vec<Matcher>) -> CallPattern {
        let contract = Contract::interface("Svc")
            .method(
                "f",
                [
                    ("a", TypeDescriptor::int()),
                    ("b", TypeDescriptor::string().nullable()),
                ],
                TypeDescriptor::unit(),
            )
            .build();
        CallPattern::new(contract.method("f").unwrap(), matchers)
    }

    #[test]
    fn any_respects_nullability() {
        let int = TypeDescriptor::int();
        let opt = TypeDescriptor::string().nullable();
        assert!(!Matcher::any().matches(&Value::Null, &int));
        assert!(Matcher::any().matches(&Value::Null, &opt));
        assert!(!Matcher::any().matches(&Value::from("x"), &int));
    }

    #[test]
    fn ranges_honor_kind() {
        let ty = TypeDescriptor::int();
        let inclusive = Matcher::between(1, 3, RangeKind::Inclusive);
        let exclusive = Matcher::between(1, 3, RangeKind::Exclusive);
        assert!(inclusive.matches(&Value::Int(3), &ty));
        assert!(!exclusive.matches(&Value::Int(3), &ty));
        assert!(exclusive.matches(&Value::Int(2), &ty));
        assert!(!inclusive.matches(&Value::from("2"), &ty));
    }

    #[test]
    fn invalid_regex_is_a_configuration_error() {
        let err = Matcher::regex("(unclosed").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn evaluation_short_circuits_on_first_rejection() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let p = pattern(vec![
            Matcher::eq(1),
            Matcher::predicate("counted", move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            }),
        ]);
        assert!(!p.matches_args(&[Value::Int(2), Value::Null]));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        assert!(p.matches_args(&[Value::Int(1), Value::Null]));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arity_is_validated() {
        let err = pattern(vec![Matcher::any()]).validate().unwrap_err();
        assert!(matches!(
            err,
            MockError::ArityMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn display_reads_like_the_call() {
        let p = pattern(vec![Matcher::is_in([1, 2]), Matcher::not(Matcher::not_null())]);
        assert_eq!(p.to_string(), "Svc.f(one_of[1, 2], not(not_null))");
    }

    proptest! {
        /// Matcher evaluation is repeatable on the same snapshot.
        #[test]
        fn prop_evaluation_is_idempotent(x in any::<i64>(), lo in -100i64..100, hi in -100i64..100, s in "[a-z]{0,8}") {
            let int = TypeDescriptor::int();
            let matchers = [
                Matcher::eq(x),
                Matcher::between(lo, hi, RangeKind::Inclusive),
                Matcher::between(lo, hi, RangeKind::Exclusive),
                Matcher::is_in([lo, hi]),
                Matcher::not(Matcher::any()),
                Matcher::predicate("even", |v, _| v.as_i64().is_some_and(|n| n % 2 == 0)),
            ];
            let value = Value::Int(x);
            for m in &matchers {
                let first = m.matches(&value, &int);
                for _ in 0..3 {
                    prop_assert_eq!(m.matches(&value, &int), first);
                }
            }
            let re = Matcher::regex("^[a-m]+$").unwrap();
            let text = Value::from(s);
            let first = re.matches(&text, &TypeDescriptor::string());
            prop_assert_eq!(re.matches(&text, &TypeDescriptor::string()), first);
        }
    }
}
