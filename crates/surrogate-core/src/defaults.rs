//! Default values for calls no setup answers.
//!
//! A loose mock that receives an unmatched call synthesizes a result from the
//! member's declared return type. The lookup order is:
//!
//! 1. a custom provider registered for that exact [`TypeDescriptor`] with
//!    [`Mock::register_default`](crate::mock::Mock::register_default)
//! 2. the mock's [`DefaultValueProvider`], chosen by [`DefaultValue`]
//!
//! Under [`DefaultValue::Mock`], a return type naming a contract the factory
//! catalog knows yields a nested mock. Nested mocks that stub their
//! properties eagerly would recurse forever on self-referential contracts, so
//! synthesis carries a [`SynthesisChain`] of the contracts currently being
//! built; a contract already on the chain yields [`Value::Null`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::contract::{TypeDescriptor, TypeKind};
use crate::mock::Mock;
use crate::value::Value;

/// Default-value synthesis mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// Zero, empty or null values.
    #[default]
    Empty,
    /// Like `Empty`, but contract-typed results become nested mocks.
    Mock,
}

/// A custom default for one exact type.
pub type DefaultFn = Arc<dyn Fn(&TypeDescriptor) -> Value + Send + Sync>;

/// Produces default values for a mock.
pub trait DefaultValueProvider: Send + Sync {
    /// Returns the default for `ty`.
    fn produce(&self, ty: &TypeDescriptor, ctx: &mut Synthesis<'_>) -> Value;
}

/// Zero, empty or null for every type.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDefaults;

impl DefaultValueProvider for EmptyDefaults {
    fn produce(&self, ty: &TypeDescriptor, _ctx: &mut Synthesis<'_>) -> Value {
        empty_value(ty)
    }
}

/// Nested mocks for known contracts, empty values for everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockDefaults;

impl DefaultValueProvider for MockDefaults {
    fn produce(&self, ty: &TypeDescriptor, ctx: &mut Synthesis<'_>) -> Value {
        ty.contract_name()
            .and_then(|name| ctx.nested_mock(name))
            .map_or_else(|| empty_value(ty), Value::Mock)
    }
}

/// The empty value of `ty`.
///
/// | type | value |
/// |------|-------|
/// | any nullable type, contracts, named types, `any` | `Null` |
/// | `unit` | `Unit` |
/// | `bool` | `false` |
/// | integers and floats | zero |
/// | `String` | `""` |
/// | bytes, lists, maps | empty |
#[must_use]
pub fn empty_value(ty: &TypeDescriptor) -> Value {
    if ty.nullable {
        return Value::Null;
    }
    match &ty.kind {
        TypeKind::Unit => Value::Unit,
        TypeKind::Bool => Value::Bool(false),
        TypeKind::Int => Value::Int(0),
        TypeKind::UInt => Value::UInt(0),
        TypeKind::Float => Value::Float(0.0),
        TypeKind::Str => Value::Str(String::new()),
        TypeKind::Bytes => Value::Bytes(Vec::new()),
        TypeKind::List(_) => Value::List(Vec::new()),
        TypeKind::Map(_) => Value::Map(std::collections::BTreeMap::new()),
        TypeKind::Contract(_) | TypeKind::Named(_) | TypeKind::Any => Value::Null,
    }
}

/// Contracts currently being synthesized, outermost first.
#[derive(Debug, Clone, Default)]
pub struct SynthesisChain {
    contracts: Vec<String>,
}

impl SynthesisChain {
    /// An empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `contract` is being synthesized.
    #[must_use]
    pub fn contains(&self, contract: &str) -> bool {
        self.contracts.iter().any(|c| c == contract)
    }

    /// Number of contracts on the chain.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.contracts.len()
    }

    pub(crate) fn push(&mut self, contract: &str) {
        self.contracts.push(contract.to_owned());
    }

    pub(crate) fn pop(&mut self) {
        self.contracts.pop();
    }
}

/// Context handed to a [`DefaultValueProvider`].
pub struct Synthesis<'a> {
    parent: &'a Mock,
    chain: &'a mut SynthesisChain,
}

impl<'a> Synthesis<'a> {
    pub(crate) fn new(parent: &'a Mock, chain: &'a mut SynthesisChain) -> Self {
        Self { parent, chain }
    }

    /// The mock the value is synthesized for.
    #[must_use]
    pub const fn parent(&self) -> &Mock {
        self.parent
    }

    /// The contracts being synthesized.
    #[must_use]
    pub fn chain(&self) -> &SynthesisChain {
        &*self.chain
    }

    /// Creates a nested mock of `contract`, inheriting the parent's options,
    /// provider and custom defaults as they are at this moment.
    ///
    /// Returns `None` when the contract is unknown to the factory catalog or
    /// already on the chain.
    pub fn nested_mock(&mut self, contract: &str) -> Option<Mock> {
        if self.chain.contains(contract) {
            tracing::debug!(
                mock = %self.parent.name(),
                contract,
                depth = self.chain.depth(),
                "recursive default synthesis cut off"
            );
            return None;
        }
        let contract = self.parent.factory().lookup(contract)?;
        Some(self.parent.spawn_nested(contract, &mut *self.chain))
    }

    /// The default for `ty`, honoring custom providers.
    pub fn default_for(&mut self, ty: &TypeDescriptor) -> Value {
        let parent = self.parent;
        parent.defaults().synthesize(ty, parent, &mut *self.chain)
    }
}

impl fmt::Debug for Synthesis<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synthesis")
            .field("parent", &self.parent.name())
            .field("chain", &self.chain)
            .finish()
    }
}

/// A mock's default-value configuration.
pub(crate) struct Defaults {
    provider: RwLock<Arc<dyn DefaultValueProvider>>,
    custom: RwLock<HashMap<TypeDescriptor, DefaultFn>>,
}

impl Defaults {
    pub(crate) fn new(mode: DefaultValue) -> Self {
        let provider: Arc<dyn DefaultValueProvider> = match mode {
            DefaultValue::Empty => Arc::new(EmptyDefaults),
            DefaultValue::Mock => Arc::new(MockDefaults),
        };
        Self {
            provider: RwLock::new(provider),
            custom: RwLock::new(HashMap::new()),
        }
    }

    /// A copy for a nested mock. Later changes on either side are not
    /// shared.
    pub(crate) fn inherit(&self) -> Self {
        let provider = Arc::clone(
            &self
                .provider
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        );
        let custom = self
            .custom
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        Self {
            provider: RwLock::new(provider),
            custom: RwLock::new(custom),
        }
    }

    pub(crate) fn set_provider(&self, provider: Arc<dyn DefaultValueProvider>) {
        *self
            .provider
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = provider;
    }

    pub(crate) fn register(&self, ty: TypeDescriptor, f: DefaultFn) {
        self.custom
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(ty, f);
    }

    /// Both locks are released before user code runs.
    pub(crate) fn synthesize(
        &self,
        ty: &TypeDescriptor,
        parent: &Mock,
        chain: &mut SynthesisChain,
    ) -> Value {
        let custom = self
            .custom
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(ty)
            .cloned();
        if let Some(f) = custom {
            return f(ty);
        }
        let provider = Arc::clone(
            &self
                .provider
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        );
        provider.produce(ty, &mut Synthesis::new(parent, chain))
    }
}
