//! The substitute object and its dispatch engine.
//!
//! A [`Mock`] owns exactly one [`SetupRegistry`] and one [`InvocationLog`].
//! Adapters implementing a user trait forward every call to
//! [`Interceptor::intercept`], which runs the dispatch pipeline:
//!
//! 1. reject calls to members outside the contract, or with the wrong
//!    argument or generic argument count
//! 2. append the call to the log
//! 3. sealed members skip the registry and run the base implementation, or
//!    produce a default when no base is attached
//! 4. ask the registry for the governing setup (newest first)
//! 5. matched: count the hit, record `matched_by`, run callbacks, raise the
//!    configured event, produce the outcome
//! 6. unmatched: fail under [`MockBehavior::Strict`], otherwise delegate to
//!    the base implementation or synthesize a default
//!
//! No internal lock is held while user code (callbacks, computed returns,
//! event handlers, base implementations, default providers) runs, so any of
//! them may call back into the mock.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::config::{MockBehavior, MockOptions};
use crate::contract::{BaseImpl, Call, Contract, Interceptor, Member, PropertyDecl, TypeDescriptor};
use crate::defaults::{DefaultValueProvider, Defaults, SynthesisChain};
use crate::error::{Fault, MockError};
use crate::factory::{FactoryShared, MockFactory};
use crate::invocation::Invocation;
use crate::log::InvocationLog;
use crate::matcher::{CallPattern, Matcher};
use crate::registry::{Governing, SetupRegistry};
use crate::setup::{Condition, Plan, Response, Setup, SetupHandle, Turn};
use crate::value::Value;

/// An event handler. A returned [`Fault`] stops the raise and is reported
/// verbatim to the raiser.
pub type Handler = Arc<dyn Fn(&[Value]) -> Result<(), Fault> + Send + Sync>;

/// Identifies one event subscription on a mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    /// The numeric id, as recorded in subscription invocations.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

pub(crate) struct MockInner {
    name: String,
    contract: Arc<Contract>,
    options: MockOptions,
    registry: SetupRegistry,
    log: InvocationLog,
    base: RwLock<Option<Arc<dyn BaseImpl>>>,
    defaults: Defaults,
    handlers: Mutex<HashMap<String, Vec<(HandlerId, Handler)>>>,
    next_handler: AtomicU64,
    nested: Mutex<HashMap<Arc<Member>, Value>>,
    factory: Arc<FactoryShared>,
}

/// A substitute for one contract.
///
/// `Mock` is a cheap handle; clones share the same registry and log.
#[derive(Clone)]
pub struct Mock {
    inner: Arc<MockInner>,
}

impl Mock {
    /// Creates a loose mock through the process-wide shared factory.
    #[must_use]
    pub fn new(contract: Arc<Contract>) -> Self {
        MockFactory::shared().create(contract)
    }

    /// Creates a mock with explicit options through the shared factory.
    #[must_use]
    pub fn with_options(contract: Arc<Contract>, options: MockOptions) -> Self {
        MockFactory::shared().create_with(contract, options)
    }

    pub(crate) fn from_parts(
        name: String,
        contract: Arc<Contract>,
        options: MockOptions,
        defaults: Defaults,
        factory: Arc<FactoryShared>,
    ) -> Self {
        Self {
            inner: Arc::new(MockInner {
                name,
                contract,
                options,
                registry: SetupRegistry::new(),
                log: InvocationLog::new(),
                base: RwLock::new(None),
                defaults,
                handlers: Mutex::new(HashMap::new()),
                next_handler: AtomicU64::new(0),
                nested: Mutex::new(HashMap::new()),
                factory,
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<MockInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) const fn from_inner(inner: Arc<MockInner>) -> Self {
        Self { inner }
    }

    /// Display name, `Mock<Contract:N>` unless named explicitly.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The mocked contract.
    #[must_use]
    pub fn contract(&self) -> &Arc<Contract> {
        &self.inner.contract
    }

    /// Options fixed at creation.
    #[must_use]
    pub fn options(&self) -> &MockOptions {
        &self.inner.options
    }

    /// Strict or loose.
    #[must_use]
    pub fn behavior(&self) -> MockBehavior {
        self.inner.options.behavior
    }

    /// Returns `true` if both handles refer to the same mock.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The mock's setups.
    #[must_use]
    pub fn setups(&self) -> &SetupRegistry {
        &self.inner.registry
    }

    /// Every call recorded since creation or the last [`Mock::reset_calls`].
    #[must_use]
    pub fn invocations(&self) -> Vec<Arc<Invocation>> {
        self.inner.log.snapshot()
    }

    pub(crate) fn log(&self) -> &InvocationLog {
        &self.inner.log
    }

    /// Forgets recorded calls. Setups are kept and sequence numbers keep
    /// increasing.
    pub fn reset_calls(&self) {
        self.inner.log.clear();
        tracing::debug!(mock = %self.name(), "reset recorded calls");
    }

    pub(crate) fn defaults(&self) -> &Defaults {
        &self.inner.defaults
    }

    pub(crate) fn factory(&self) -> &Arc<FactoryShared> {
        &self.inner.factory
    }

    /// Attaches the real implementation used by call-base behaviors.
    #[must_use]
    pub fn with_base<B: BaseImpl + 'static>(self, base: B) -> Self {
        self.set_base(Arc::new(base));
        self
    }

    /// Replaces the real implementation used by call-base behaviors.
    pub fn set_base(&self, base: Arc<dyn BaseImpl>) {
        *self
            .inner
            .base
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(base);
    }

    fn base(&self) -> Option<Arc<dyn BaseImpl>> {
        self.inner
            .base
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Uses `f` for the default value of `ty`, ahead of the mock's provider.
    pub fn register_default<F>(&self, ty: TypeDescriptor, f: F)
    where
        F: Fn(&TypeDescriptor) -> Value + Send + Sync + 'static,
    {
        self.inner.defaults.register(ty, Arc::new(f));
    }

    /// Replaces the provider chosen by [`MockOptions::default_value`].
    pub fn set_default_provider(&self, provider: Arc<dyn DefaultValueProvider>) {
        self.inner.defaults.set_provider(provider);
    }

    /// Declares a setup for calls matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the member belongs to another
    /// contract, cannot be intercepted, or the matcher count differs from the
    /// member's parameter count.
    pub fn setup(&self, pattern: CallPattern) -> Result<SetupHandle, MockError> {
        self.register_setup(pattern, None)
    }

    /// Declares a setup that is only eligible while `condition` holds.
    ///
    /// # Errors
    ///
    /// Same as [`Mock::setup`].
    pub fn setup_when<F>(&self, pattern: CallPattern, condition: F) -> Result<SetupHandle, MockError>
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.register_setup(pattern, Some(Arc::new(condition)))
    }

    fn register_setup(
        &self,
        pattern: CallPattern,
        condition: Option<Condition>,
    ) -> Result<SetupHandle, MockError> {
        self.check_member(pattern.member())?;
        pattern.validate()?;
        let setup = self.inner.registry.register(pattern, condition);
        Ok(SetupHandle::new(self.clone(), setup))
    }

    pub(crate) fn setup_in_turn(
        &self,
        pattern: CallPattern,
        turn: Arc<dyn Turn>,
    ) -> Result<SetupHandle, MockError> {
        self.check_member(pattern.member())?;
        pattern.validate()?;
        let setup = self.inner.registry.register_turn(pattern, turn);
        Ok(SetupHandle::new(self.clone(), setup))
    }

    pub(crate) fn check_member(&self, member: &Member) -> Result<(), MockError> {
        if self.inner.contract.contains(member) {
            Ok(())
        } else {
            Err(MockError::unknown_member(
                self.inner.contract.name(),
                member.to_string(),
            ))
        }
    }

    /// Calls the first method named `name`.
    ///
    /// # Errors
    ///
    /// Returns what dispatch returns, or [`MockError::UnknownMember`].
    pub fn call(&self, name: &str, args: impl IntoIterator<Item = Value>) -> Result<Value, MockError> {
        let member = self.inner.contract.method(name)?;
        self.intercept(Call::new(member, args))
    }

    /// Calls the generic method named `name` with a generic instantiation.
    ///
    /// # Errors
    ///
    /// Returns what dispatch returns, or [`MockError::UnknownMember`].
    pub fn call_generic(
        &self,
        name: &str,
        generic_args: impl IntoIterator<Item = TypeDescriptor>,
        args: impl IntoIterator<Item = Value>,
    ) -> Result<Value, MockError> {
        let member = self.inner.contract.method(name)?;
        self.intercept(Call::new(member, args).with_generic_args(generic_args))
    }

    /// Reads a property through its getter.
    ///
    /// # Errors
    ///
    /// Returns what dispatch returns, or [`MockError::UnknownProperty`].
    pub fn get(&self, property: &str) -> Result<Value, MockError> {
        let getter = Arc::clone(self.inner.contract.property(property)?.getter());
        self.intercept(Call::new(getter, []))
    }

    /// Writes a property through its setter.
    ///
    /// # Errors
    ///
    /// Returns what dispatch returns, [`MockError::UnknownProperty`], or
    /// [`MockError::UnknownMember`] for read-only properties.
    pub fn set(&self, property: &str, value: impl Into<Value>) -> Result<(), MockError> {
        let setter = self.setter(property)?;
        self.intercept(Call::new(setter, [value.into()])).map(drop)
    }

    pub(crate) fn setter(&self, property: &str) -> Result<Arc<Member>, MockError> {
        let decl = self.inner.contract.property(property)?;
        decl.setter().cloned().ok_or_else(|| {
            MockError::unknown_member(self.inner.contract.name(), format!("set_{property}"))
        })
    }

    /// Attaches `handler` to `event`. The subscription is recorded as a call
    /// to the event's add accessor.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::UnknownEvent`] if the contract has no such event.
    pub fn subscribe<F>(&self, event: &str, handler: F) -> Result<HandlerId, MockError>
    where
        F: Fn(&[Value]) -> Result<(), Fault> + Send + Sync + 'static,
    {
        let decl = self.inner.contract.event(event)?;
        let id = HandlerId(self.inner.next_handler.fetch_add(1, Ordering::AcqRel) + 1);
        self.inner
            .log
            .append(Arc::clone(decl.add()), Vec::new(), vec![Value::UInt(id.0)]);
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(event.to_owned())
            .or_default()
            .push((id, Arc::new(handler)));
        tracing::debug!(mock = %self.name(), event, handler = id.0, "subscribed handler");
        Ok(id)
    }

    /// Detaches a handler. The attempt is recorded as a call to the event's
    /// remove accessor; returns `false` if the handler was not attached.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::UnknownEvent`] if the contract has no such event.
    pub fn unsubscribe(&self, event: &str, id: HandlerId) -> Result<bool, MockError> {
        let decl = self.inner.contract.event(event)?;
        self.inner
            .log
            .append(Arc::clone(decl.remove()), Vec::new(), vec![Value::UInt(id.0)]);
        let mut handlers = self
            .inner
            .handlers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(list) = handlers.get_mut(event) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|(h, _)| *h != id);
        Ok(list.len() != before)
    }

    /// Invokes every handler attached to `event`, in attachment order.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown event or wrong argument
    /// count, or the first handler fault as [`MockError::Thrown`]; handlers
    /// after a failing one do not run.
    pub fn raise(&self, event: &str, args: impl IntoIterator<Item = Value>) -> Result<(), MockError> {
        let decl = self.inner.contract.event(event)?;
        let args: Vec<Value> = args.into_iter().collect();
        if args.len() != decl.args().len() {
            return Err(MockError::arity_mismatch(
                format!("{}.{event}", self.inner.contract.name()),
                decl.args().len(),
                args.len(),
            ));
        }
        let handlers: Vec<Handler> = self
            .inner
            .handlers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(event)
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();
        tracing::debug!(
            mock = %self.name(),
            event,
            handlers = handlers.len(),
            "raising event"
        );
        for handler in handlers {
            handler(&args).map_err(MockError::Thrown)?;
        }
        Ok(())
    }

    /// Stubs `property` so that the setter stores a value the getter then
    /// returns, starting from `initial`.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::UnknownProperty`] if it is not declared.
    pub fn setup_property(&self, property: &str, initial: impl Into<Value>) -> Result<(), MockError> {
        let decl = self.inner.contract.property(property)?;
        self.stub_property(decl, initial.into());
        Ok(())
    }

    /// Stubs every declared property, starting from default values.
    pub fn setup_all_properties(&self) {
        self.stub_all_properties(&mut SynthesisChain::new());
    }

    pub(crate) fn stub_all_properties(&self, chain: &mut SynthesisChain) {
        chain.push(self.inner.contract.name());
        for decl in self.inner.contract.properties() {
            let initial = self.synthesize(decl.ty(), chain);
            self.stub_property(decl, initial);
        }
        chain.pop();
    }

    fn stub_property(&self, decl: &PropertyDecl, initial: Value) {
        let state = Arc::new(RwLock::new(initial));
        let getter = self
            .inner
            .registry
            .register(CallPattern::any_args(Arc::clone(decl.getter())), None);
        getter.mark_property_stub();
        let current = Arc::clone(&state);
        SetupHandle::new(self.clone(), getter).returns_with(move |_| {
            current
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        });
        if let Some(setter) = decl.setter() {
            let setter = self
                .inner
                .registry
                .register(CallPattern::new(Arc::clone(setter), [Matcher::any()]), None);
            setter.mark_property_stub();
            SetupHandle::new(self.clone(), setter).callback(move |args| {
                if let Some(value) = args.first() {
                    *state
                        .write()
                        .unwrap_or_else(std::sync::PoisonError::into_inner) = value.clone();
                }
            });
        }
    }

    pub(crate) fn spawn_nested(&self, contract: Arc<Contract>, chain: &mut SynthesisChain) -> Self {
        let nested = FactoryShared::spawn(
            &self.inner.factory,
            contract,
            self.inner.options,
            self.inner.defaults.inherit(),
            None,
            chain,
        );
        tracing::debug!(parent = %self.name(), nested = %nested.name(), "created nested mock");
        nested
    }

    fn synthesize(&self, ty: &TypeDescriptor, chain: &mut SynthesisChain) -> Value {
        self.inner.defaults.synthesize(ty, self, chain)
    }

    fn dispatch(&self, call: Call) -> Result<Value, MockError> {
        let Call {
            member,
            generic_args,
            args,
        } = call;
        self.check_member(&member)?;
        if args.len() != member.params().len() {
            return Err(MockError::arity_mismatch(
                member.to_string(),
                member.params().len(),
                args.len(),
            ));
        }
        if generic_args.len() != member.generic_arity() {
            return Err(MockError::GenericArityMismatch {
                member: member.to_string(),
                expected: member.generic_arity(),
                actual: generic_args.len(),
            });
        }

        let invocation = self.inner.log.append(member, generic_args, args);
        tracing::debug!(
            mock = %self.name(),
            seq = invocation.seq(),
            call = %invocation,
            "intercepted call"
        );

        // sealed members are recorded but never answered by setups
        if !invocation.member().is_overridable() {
            return self.sealed_result(&invocation);
        }
        match self.inner.registry.find_governing(&invocation) {
            Some(Governing { setup, claim }) => {
                setup.record_hit();
                invocation.set_matched_by(setup.id());
                let plan = setup.plan(claim);
                self.execute(&invocation, &setup, plan)
            }
            None => self.fall_back(&invocation),
        }
    }

    fn execute(&self, invocation: &Invocation, setup: &Setup, plan: Plan) -> Result<Value, MockError> {
        for callback in &plan.callbacks {
            callback(invocation.args());
        }
        if let Some((event, args)) = plan.raise {
            self.raise(&event, args)?;
        }
        match plan.response {
            Some(Response::Return(value)) => Ok(value),
            Some(Response::Compute(f)) => Ok(f(invocation.args())),
            Some(Response::Throw(fault)) => {
                tracing::debug!(
                    mock = %self.name(),
                    setup = %setup.id(),
                    %fault,
                    "throwing configured fault"
                );
                Err(MockError::Thrown(fault))
            },
            Some(Response::CallBase) => self.call_base(invocation),
            Some(Response::Pass) | None if plan.call_base => self.call_base(invocation),
            Some(Response::Pass) | None => self.loose_default(invocation),
        }
    }

    fn fall_back(&self, invocation: &Invocation) -> Result<Value, MockError> {
        if self.inner.options.behavior == MockBehavior::Strict {
            tracing::warn!(
                mock = %self.name(),
                call = %invocation,
                "strict mock received a call without a setup"
            );
            return Err(MockError::UnmatchedCall {
                mock: self.inner.name.clone(),
                call: invocation.to_string(),
            });
        }
        self.loose_default(invocation)
    }

    fn loose_default(&self, invocation: &Invocation) -> Result<Value, MockError> {
        if self.inner.options.call_base && invocation.member().has_base() && self.base().is_some() {
            return self.call_base(invocation);
        }
        Ok(self.default_for(invocation.member()))
    }

    /// Sealed members run the base when one is attached, regardless of
    /// behavior or the `call_base` option.
    fn sealed_result(&self, invocation: &Invocation) -> Result<Value, MockError> {
        if invocation.member().has_base() && self.base().is_some() {
            return self.call_base(invocation);
        }
        Ok(self.default_for(invocation.member()))
    }

    fn call_base(&self, invocation: &Invocation) -> Result<Value, MockError> {
        let member = invocation.member();
        let base = self
            .base()
            .filter(|_| member.has_base())
            .ok_or_else(|| MockError::BaseUnavailable {
                mock: self.inner.name.clone(),
                member: member.to_string(),
            })?;
        tracing::trace!(mock = %self.name(), seq = invocation.seq(), "calling base implementation");
        base.call_base(member, invocation.args())
            .map_err(MockError::Thrown)
    }

    /// Nested mocks are cached per member so repeated calls observe the same
    /// substitute.
    fn default_for(&self, member: &Arc<Member>) -> Value {
        if let Some(cached) = self
            .inner
            .nested
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(member)
        {
            return cached.clone();
        }
        let value = self.synthesize(member.returns(), &mut SynthesisChain::new());
        if !matches!(value, Value::Mock(_)) {
            return value;
        }
        self.inner
            .nested
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(Arc::clone(member))
            .or_insert(value)
            .clone()
    }
}

impl Interceptor for Mock {
    fn intercept(&self, call: Call) -> Result<Value, MockError> {
        self.dispatch(call)
    }
}

impl fmt::Display for Mock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

impl fmt::Debug for Mock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mock")
            .field("name", &self.inner.name)
            .field("behavior", &self.inner.options.behavior)
            .field("setups", &self.inner.registry.len())
            .field("invocations", &self.inner.log.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn calculator() -> Arc<Contract> {
        Contract::interface("Calculator")
            .method(
                "add",
                [("a", TypeDescriptor::int()), ("b", TypeDescriptor::int())],
                TypeDescriptor::int(),
            )
            .method("label", [], TypeDescriptor::string())
            .property("precision", TypeDescriptor::uint())
            .event("overflow", [TypeDescriptor::int()])
            .build()
    }

    #[test]
    fn malformed_calls_are_rejected_before_logging() {
        let mock = MockFactory::new(MockOptions::loose()).create(calculator());
        let err = mock.call("add", [Value::Int(1)]).unwrap_err();
        assert!(matches!(err, MockError::ArityMismatch { expected: 2, actual: 1, .. }));
        assert!(mock.invocations().is_empty());

        let other = Contract::interface("Other")
            .method("f", [], TypeDescriptor::unit())
            .build();
        let err = mock
            .intercept(Call::new(other.method("f").unwrap(), []))
            .unwrap_err();
        assert!(matches!(err, MockError::UnknownMember { .. }));
    }

    #[test]
    fn callbacks_run_before_the_outcome_and_may_reenter() {
        let mock = MockFactory::new(MockOptions::loose()).create(calculator());
        let add = mock.contract().method("add").unwrap();
        let seen = Arc::new(AtomicUsize::new(0));
        let reentrant = mock.clone();
        let counter = Arc::clone(&seen);
        mock.setup(CallPattern::any_args(add))
            .unwrap()
            .callback(move |_| {
                counter.fetch_add(reentrant.invocations().len(), Ordering::SeqCst);
                let _ = reentrant.call("label", []);
            })
            .returns(3);

        assert_eq!(mock.call("add", [1.into(), 2.into()]).unwrap(), Value::Int(3));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(mock.invocations().len(), 2);
    }

    #[test]
    fn setup_raises_event_before_returning() {
        let mock = MockFactory::new(MockOptions::loose()).create(calculator());
        let add = mock.contract().method("add").unwrap();
        let raised = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&raised);
        mock.subscribe("overflow", move |args| {
            sink.lock().unwrap().push(args[0].clone());
            Ok(())
        })
        .unwrap();
        mock.setup(CallPattern::any_args(add))
            .unwrap()
            .raises("overflow", [Value::Int(99)])
            .unwrap()
            .returns(0);

        mock.call("add", [1.into(), 2.into()]).unwrap();
        assert_eq!(*raised.lock().unwrap(), vec![Value::Int(99)]);
    }

    #[test]
    fn unsubscribed_handlers_stop_receiving() {
        let mock = MockFactory::new(MockOptions::loose()).create(calculator());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = mock
            .subscribe("overflow", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        mock.raise("overflow", [Value::Int(1)]).unwrap();
        assert!(mock.unsubscribe("overflow", id).unwrap());
        assert!(!mock.unsubscribe("overflow", id).unwrap());
        mock.raise("overflow", [Value::Int(2)]).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(mock.invocations().len(), 3);
    }

    #[test]
    fn property_stub_round_trips() {
        let mock = MockFactory::new(MockOptions::strict()).create(calculator());
        mock.setup_property("precision", 2u64).unwrap();
        assert_eq!(mock.get("precision").unwrap(), Value::UInt(2));
        mock.set("precision", 8u64).unwrap();
        assert_eq!(mock.get("precision").unwrap(), Value::UInt(8));
        assert!(matches!(
            mock.setup_property("missing", 0),
            Err(MockError::UnknownProperty { .. })
        ));
    }
}
