//! # surrogate-core
//!
//! Interception, setup matching and call verification for test doubles.
//!
//! A [`Mock`] stands in for a [`Contract`]: an interface-like set of methods,
//! properties and events. Every call made against it is recorded, answered by
//! the newest matching setup (or a default value), and can later be verified
//! against an expected call count.
//!
//! ## Core Concepts
//!
//! - **Contract**: member descriptors built with [`Contract::interface`] or
//!   [`Contract::class`]
//! - **Adapter**: a type implementing the user's trait by forwarding each
//!   method to [`Interceptor::intercept`]
//! - **Setup**: a [`CallPattern`] plus a behavior, declared with
//!   [`Mock::setup`]; later setups take precedence over earlier ones
//! - **Invocation**: one recorded call, with a sequence number that is
//!   strictly increasing per mock
//! - **Verification**: [`Mock::verify`] counts recorded calls matching a
//!   pattern against a [`Times`] range
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use surrogate_core::prelude::*;
//!
//! trait Calculator {
//!     fn add(&self, a: i64, b: i64) -> i64;
//! }
//!
//! // Adapter: forwards every method to the mock.
//! struct CalculatorMock {
//!     mock: Mock,
//!     add: Arc<Member>,
//! }
//!
//! impl Calculator for CalculatorMock {
//!     fn add(&self, a: i64, b: i64) -> i64 {
//!         let call = Call::new(Arc::clone(&self.add), [Value::Int(a), Value::Int(b)]);
//!         self.mock
//!             .intercept(call)
//!             .ok()
//!             .and_then(|v| v.as_i64())
//!             .unwrap_or_default()
//!     }
//! }
//!
//! # fn main() -> Result<(), MockError> {
//! let contract = Contract::interface("Calculator")
//!     .method(
//!         "add",
//!         [("a", TypeDescriptor::int()), ("b", TypeDescriptor::int())],
//!         TypeDescriptor::int(),
//!     )
//!     .build();
//! let add = contract.method("add")?;
//! let mock = MockFactory::default().create(contract);
//!
//! mock.setup(CallPattern::new(Arc::clone(&add), [Matcher::eq(2), Matcher::any()]))?
//!     .returns_with(|args| Value::Int(args[1].as_i64().unwrap_or(0) * 10));
//!
//! let calc = CalculatorMock { mock: mock.clone(), add: Arc::clone(&add) };
//! assert_eq!(calc.add(2, 3), 30);
//! assert_eq!(calc.add(1, 3), 0);
//!
//! mock.verify(
//!     &CallPattern::new(add, [Matcher::any(), Matcher::eq(3)]),
//!     Times::exactly(2),
//!     None,
//! )?;
//! mock.verify_no_other_calls()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Behaviors
//!
//! Unmatched calls fail on [`MockBehavior::Strict`] mocks and return a
//! default value on [`MockBehavior::Loose`] ones. Defaults are zero or empty
//! values, or nested mocks under [`DefaultValue::Mock`] for contracts the
//! [`MockFactory`] knows.
//!
//! ## Logging
//!
//! The crate emits `tracing` events (registration and dispatch at `debug`,
//! registry scans at `trace`, strict-mode misses at `warn`) and installs no
//! subscriber.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod contract;
pub mod defaults;
pub mod error;
pub mod factory;
pub mod invocation;
pub mod log;
pub mod matcher;
pub mod mock;
pub mod order;
pub mod registry;
pub mod setup;
pub mod value;
pub mod verify;

// Re-export main types at crate root for convenience
pub use config::{ConfigError, FactoryConfig, MockBehavior, MockOptions};
pub use contract::{
    BaseImpl, Call, Contract, ContractBuilder, ContractKind, EventDecl, Interceptor, Member,
    MemberKind, Param, PropertyDecl, TypeDescriptor, TypeKind,
};
pub use defaults::{
    DefaultFn, DefaultValue, DefaultValueProvider, EmptyDefaults, MockDefaults, Synthesis,
    SynthesisChain, empty_value,
};
pub use error::{Fault, FaultMessage, MockError};
pub use factory::MockFactory;
pub use invocation::{Invocation, SetupId};
pub use log::InvocationLog;
pub use matcher::{CallPattern, Matcher, RangeKind, TypeArg};
pub use mock::{Handler, HandlerId, Mock};
pub use order::CallOrder;
pub use registry::SetupRegistry;
pub use setup::{Callback, ComputeFn, Condition, Response, Setup, SetupHandle};
pub use value::{Opaque, Value};
pub use verify::{Times, VerificationFailure};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{MockBehavior, MockOptions};
    pub use crate::contract::{BaseImpl, Call, Contract, Interceptor, Member, TypeDescriptor};
    pub use crate::defaults::DefaultValue;
    pub use crate::error::{Fault, MockError};
    pub use crate::factory::MockFactory;
    pub use crate::matcher::{CallPattern, Matcher, RangeKind, TypeArg};
    pub use crate::mock::Mock;
    pub use crate::order::CallOrder;
    pub use crate::setup::{Response, SetupHandle};
    pub use crate::value::Value;
    pub use crate::verify::Times;
}
