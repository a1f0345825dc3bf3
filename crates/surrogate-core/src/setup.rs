//! Declared expectations and their behaviors.
//!
//! A [`Setup`] binds a [`CallPattern`] (and an optional guard
//! [`Condition`]) to a behavior: callbacks to run, an outcome to produce, and
//! optionally an event to raise. Setups are created through
//! [`Mock::setup`](crate::mock::Mock::setup), which publishes them to the
//! mock's registry and hands back a [`SetupHandle`] for configuring the
//! behavior.
//!
//! # Lifecycle
//!
//! - `Active`: eligible whenever its pattern and guard accept a call
//! - `Exhausted`: only for response sequences, once every response has been
//!   consumed; the setup is skipped by dispatch but stays registered so that
//!   verification can still see it
//!
//! There is no removed state. A guard returning `false` makes a setup
//! ineligible for that one dispatch without changing its state.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{Fault, MockError};
use crate::invocation::{Invocation, SetupId};
use crate::matcher::CallPattern;
use crate::mock::Mock;
use crate::value::Value;
use crate::verify::Times;

/// Guard evaluated before a setup's matchers; `false` makes it inert.
pub type Condition = Arc<dyn Fn() -> bool + Send + Sync>;

/// An exclusive turn a setup must take after its matchers accept a call.
///
/// `try_take` is atomic: of several concurrent callers at most one takes a
/// given turn. `give_back` undoes a successful `try_take` when the setup
/// ends up not governing the call.
pub(crate) trait Turn: Send + Sync {
    fn try_take(&self) -> bool;
    fn give_back(&self);
}

/// Callback run with the live argument values of a matched call.
pub type Callback = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Computes a return value from the argument values of a matched call.
pub type ComputeFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// What a matched call produces.
#[derive(Clone)]
pub enum Response {
    /// Return this value.
    Return(Value),
    /// Return the result of this function over the arguments.
    Compute(ComputeFn),
    /// Fail with this error.
    Throw(Fault),
    /// Delegate to the base implementation.
    CallBase,
    /// Do nothing special: fall through to the default value.
    Pass,
}

impl Response {
    /// Returns a fixed value.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Return(value.into())
    }

    /// Computes the value from the arguments.
    pub fn compute<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self::Compute(Arc::new(f))
    }

    /// Fails with `fault`.
    #[must_use]
    pub const fn throw(fault: Fault) -> Self {
        Self::Throw(fault)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Return(v) => write!(f, "Return({v})"),
            Self::Compute(_) => f.write_str("Compute(..)"),
            Self::Throw(fault) => write!(f, "Throw({fault})"),
            Self::CallBase => f.write_str("CallBase"),
            Self::Pass => f.write_str("Pass"),
        }
    }
}

#[derive(Clone, Default)]
enum Outcome {
    #[default]
    FallThrough,
    Respond(Response),
    Sequence(Arc<[Response]>),
}

#[derive(Clone, Default)]
struct SetupState {
    callbacks: Vec<Callback>,
    outcome: Outcome,
    raise: Option<(String, Vec<Value>)>,
    call_base: bool,
    verifiable: bool,
    expected: Option<Times>,
    property_stub: bool,
}

/// The slot a dispatch claimed on a setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Claim {
    pub(crate) slot: Option<usize>,
}

/// Snapshot of a setup's behavior, taken so that no lock is held while user
/// code runs.
pub(crate) struct Plan {
    pub(crate) callbacks: Vec<Callback>,
    pub(crate) response: Option<Response>,
    pub(crate) raise: Option<(String, Vec<Value>)>,
    pub(crate) call_base: bool,
}

/// One declared expectation.
pub struct Setup {
    id: SetupId,
    pattern: CallPattern,
    condition: Option<Condition>,
    turn: Option<Arc<dyn Turn>>,
    state: RwLock<SetupState>,
    invoked: AtomicU64,
    cursor: AtomicUsize,
}

impl Setup {
    pub(crate) fn new(id: SetupId, pattern: CallPattern, condition: Option<Condition>) -> Self {
        Self {
            id,
            pattern,
            condition,
            turn: None,
            state: RwLock::new(SetupState::default()),
            invoked: AtomicU64::new(0),
            cursor: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_turn(mut self, turn: Arc<dyn Turn>) -> Self {
        self.turn = Some(turn);
        self
    }

    /// Creation-order identifier.
    #[must_use]
    pub const fn id(&self) -> SetupId {
        self.id
    }

    /// The call pattern this setup answers.
    #[must_use]
    pub const fn pattern(&self) -> &CallPattern {
        &self.pattern
    }

    /// Whether a guard condition is attached.
    #[must_use]
    pub const fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }

    /// How many dispatches this setup has governed.
    #[must_use]
    pub fn invocation_count(&self) -> u64 {
        self.invoked.load(Ordering::Acquire)
    }

    /// Whether the setup was flagged for [`Mock::verify_verifiable`].
    #[must_use]
    pub fn is_verifiable(&self) -> bool {
        self.read_state().verifiable
    }

    /// Expected call count set with [`SetupHandle::verifiable_times`].
    #[must_use]
    pub fn expected_times(&self) -> Option<Times> {
        self.read_state().expected
    }

    /// Whether the setup backs a stubbed property rather than a declared
    /// expectation. [`Mock::verify_all`] skips these.
    #[must_use]
    pub fn is_property_stub(&self) -> bool {
        self.read_state().property_stub
    }

    pub(crate) fn mark_property_stub(&self) {
        self.update(|state| state.property_stub = true);
    }

    /// Returns `true` once a response sequence has been fully consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.sequence_len()
            .is_some_and(|len| self.cursor.load(Ordering::Acquire) >= len)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, SetupState> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut SetupState)) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut state);
    }

    fn sequence_len(&self) -> Option<usize> {
        match &self.read_state().outcome {
            Outcome::Sequence(responses) => Some(responses.len()),
            _ => None,
        }
    }

    /// Decides whether this setup governs `invocation`, claiming a sequence
    /// slot if it has one.
    ///
    /// Order: member identity, guard, matchers, turn, then the sequence
    /// slot. Turns and slots are claimed with compare-and-swap, so concurrent
    /// callers never share one and a caller that loses falls through. A turn
    /// taken for a call that then finds the sequence exhausted is given back.
    pub(crate) fn try_claim(&self, invocation: &Invocation) -> Option<Claim> {
        if !self
            .pattern
            .matches_member(invocation.member(), invocation.generic_args())
        {
            return None;
        }
        if let Some(condition) = &self.condition {
            if !condition() {
                return None;
            }
        }
        if !self.pattern.matches_args(invocation.args()) {
            return None;
        }
        if let Some(turn) = &self.turn {
            if !turn.try_take() {
                return None;
            }
        }
        let claim = match self.sequence_len() {
            None => Some(Claim { slot: None }),
            Some(len) => self
                .cursor
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                    (c < len).then_some(c + 1)
                })
                .ok()
                .map(|slot| Claim { slot: Some(slot) }),
        };
        if claim.is_none() {
            if let Some(turn) = &self.turn {
                turn.give_back();
            }
        }
        claim
    }

    pub(crate) fn record_hit(&self) {
        self.invoked.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn plan(&self, claim: Claim) -> Plan {
        let state = self.read_state();
        let response = match (&state.outcome, claim.slot) {
            (Outcome::FallThrough, _) => None,
            (Outcome::Respond(response), _) => Some(response.clone()),
            (Outcome::Sequence(responses), Some(slot)) => responses.get(slot).cloned(),
            (Outcome::Sequence(_), None) => None,
        };
        Plan {
            callbacks: state.callbacks.clone(),
            response,
            raise: state.raise.clone(),
            call_base: state.call_base,
        }
    }

    pub(crate) fn set_sequence(&self, responses: Arc<[Response]>) {
        self.set_outcome(Outcome::Sequence(responses));
    }

    fn set_outcome(&self, outcome: Outcome) {
        self.update(|state| {
            // a fresh sequence starts from its first response
            if matches!(outcome, Outcome::Sequence(_)) {
                self.cursor.store(0, Ordering::Release);
            }
            state.outcome = outcome;
        });
    }
}

impl fmt::Display for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.pattern)?;
        if self.condition.is_some() {
            f.write_str(" when <condition>")?;
        }
        if self.turn.is_some() {
            f.write_str(" in order")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setup")
            .field("id", &self.id)
            .field("pattern", &self.pattern.to_string())
            .field("invoked", &self.invocation_count())
            .field("exhausted", &self.is_exhausted())
            .finish_non_exhaustive()
    }
}

/// Fluent handle returned by [`Mock::setup`] for configuring a setup's
/// behavior.
///
/// The setup is already registered when the handle is returned; each method
/// updates its behavior atomically and returns the handle for chaining.
#[derive(Clone)]
pub struct SetupHandle {
    mock: Mock,
    setup: Arc<Setup>,
}

impl SetupHandle {
    pub(crate) const fn new(mock: Mock, setup: Arc<Setup>) -> Self {
        Self { mock, setup }
    }

    /// The configured setup.
    #[must_use]
    pub const fn setup(&self) -> &Arc<Setup> {
        &self.setup
    }

    /// Creation-order identifier of the setup.
    #[must_use]
    pub fn id(&self) -> SetupId {
        self.setup.id()
    }

    /// Matching calls return `value`.
    pub fn returns(self, value: impl Into<Value>) -> Self {
        self.setup
            .set_outcome(Outcome::Respond(Response::Return(value.into())));
        self
    }

    /// Matching calls return `f(args)`.
    pub fn returns_with<F>(self, f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.setup
            .set_outcome(Outcome::Respond(Response::compute(f)));
        self
    }

    /// Matching calls fail with `fault`.
    pub fn throws(self, fault: Fault) -> Self {
        self.setup.set_outcome(Outcome::Respond(Response::Throw(fault)));
        self
    }

    /// Runs `f` with the arguments of every matching call, before the
    /// outcome is produced. Callbacks run in registration order and may
    /// re-enter the mock.
    pub fn callback<F>(self, f: F) -> Self
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.setup.update(|state| state.callbacks.push(Arc::new(f)));
        self
    }

    /// Delegates matching calls to the base implementation when no other
    /// outcome is configured.
    pub fn call_base(self) -> Self {
        self.setup.update(|state| state.call_base = true);
        self
    }

    /// Matching calls consume `responses` one at a time. Once all are
    /// consumed the setup is exhausted and dispatch falls through to older
    /// setups or the default value.
    pub fn in_sequence(self, responses: impl IntoIterator<Item = Response>) -> Self {
        self.setup.set_sequence(responses.into_iter().collect());
        self
    }

    /// Shorthand for a sequence of plain return values.
    pub fn returns_in_sequence(self, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        self.in_sequence(values.into_iter().map(Response::value))
    }

    /// Raises `event` with `args` on the mock whenever this setup matches,
    /// after callbacks and before the outcome.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the contract has no such event or the
    /// argument count differs from the event's declaration.
    pub fn raises(
        self,
        event: &str,
        args: impl IntoIterator<Item = Value>,
    ) -> Result<Self, MockError> {
        let decl = self.mock.contract().event(event)?;
        let args: Vec<Value> = args.into_iter().collect();
        if args.len() != decl.args().len() {
            return Err(MockError::arity_mismatch(
                format!("{}.{event}", self.mock.contract().name()),
                decl.args().len(),
                args.len(),
            ));
        }
        self.setup
            .update(|state| state.raise = Some((event.to_owned(), args)));
        Ok(self)
    }

    /// Flags the setup for [`Mock::verify_verifiable`].
    pub fn verifiable(self) -> Self {
        self.setup.update(|state| state.verifiable = true);
        self
    }

    /// Flags the setup for [`Mock::verify_verifiable`] with an expected call
    /// count.
    pub fn verifiable_times(self, times: Times) -> Self {
        self.setup.update(|state| {
            state.verifiable = true;
            state.expected = Some(times);
        });
        self
    }
}

impl fmt::Debug for SetupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupHandle")
            .field("mock", &self.mock.name())
            .field("setup", &self.setup)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Contract, TypeDescriptor};
    use crate::matcher::Matcher;

    fn setup_for(matcher: Matcher) -> (Setup, Arc<crate::contract::Member>) {
        let contract = Contract::interface("Svc")
            .method("f", [("x", TypeDescriptor::int())], TypeDescriptor::int())
            .build();
        let member = contract.method("f").unwrap();
        let pattern = CallPattern::new(Arc::clone(&member), [matcher]);
        (Setup::new(SetupId(1), pattern, None), member)
    }

    fn call(member: &Arc<crate::contract::Member>, x: i64) -> Invocation {
        Invocation::new(1, Arc::clone(member), Vec::new(), vec![Value::Int(x)])
    }

    #[test]
    fn sequence_slots_are_claimed_in_order_then_exhaust() {
        let (setup, member) = setup_for(Matcher::any());
        setup.set_sequence(vec![Response::value(1), Response::value(2)].into());
        let inv = call(&member, 0);
        assert_eq!(setup.try_claim(&inv), Some(Claim { slot: Some(0) }));
        assert!(!setup.is_exhausted());
        assert_eq!(setup.try_claim(&inv), Some(Claim { slot: Some(1) }));
        assert!(setup.is_exhausted());
        assert_eq!(setup.try_claim(&inv), None);
    }

    #[test]
    fn non_matching_arguments_do_not_claim() {
        let (setup, member) = setup_for(Matcher::eq(5));
        assert_eq!(setup.try_claim(&call(&member, 6)), None);
        assert_eq!(setup.try_claim(&call(&member, 5)), Some(Claim { slot: None }));
        assert!(!setup.is_exhausted());
    }

    #[test]
    fn plan_snapshots_the_configured_outcome() {
        let (setup, _) = setup_for(Matcher::any());
        setup.set_outcome(Outcome::Respond(Response::value(9)));
        let plan = setup.plan(Claim { slot: None });
        assert!(matches!(plan.response, Some(Response::Return(Value::Int(9)))));
        assert!(plan.callbacks.is_empty());
        assert!(!plan.call_base);
    }
}
