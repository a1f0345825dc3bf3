//! Contract descriptors and the interception capability.
//!
//! A [`Contract`] describes the surface a substitute stands in for: its
//! methods, properties (as getter/setter members) and events (as add/remove
//! accessor members). The engine never generates the substitute itself; an
//! adapter type implements the user's trait by forwarding every method to
//! [`Interceptor::intercept`]. That adapter may be hand-written or produced by
//! a macro, the core only sees the [`Call`]s it receives.
//!
//! # Example
//!
//! ```rust
//! use surrogate_core::contract::{Contract, TypeDescriptor};
//!
//! let calculator = Contract::interface("Calculator")
//!     .method(
//!         "add",
//!         [("a", TypeDescriptor::int()), ("b", TypeDescriptor::int())],
//!         TypeDescriptor::int(),
//!     )
//!     .property("mode", TypeDescriptor::string())
//!     .event("overflowed", [TypeDescriptor::int()])
//!     .build();
//!
//! let add = calculator.method("add").unwrap();
//! assert_eq!(add.params().len(), 2);
//! assert_eq!(add.to_string(), "Calculator.add(i64, i64) -> i64");
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Fault, MockError};
use crate::value::{Value, write_joined};

/// The shape of a value a member accepts or returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// The unit type.
    Unit,
    /// Booleans.
    Bool,
    /// Signed integers.
    Int,
    /// Unsigned integers.
    UInt,
    /// Floating point numbers.
    Float,
    /// Strings.
    Str,
    /// Byte buffers.
    Bytes,
    /// Lists of the inner type.
    List(Box<TypeDescriptor>),
    /// String-keyed maps of the inner type.
    Map(Box<TypeDescriptor>),
    /// Another mockable contract, by name.
    Contract(String),
    /// A user type carried as [`Value::Opaque`], by name.
    Named(String),
    /// Any value at all.
    Any,
}

/// A type plus its nullability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// The underlying shape.
    pub kind: TypeKind,
    /// Whether [`Value::Null`] is admitted.
    #[serde(default)]
    pub nullable: bool,
}

impl TypeDescriptor {
    /// A non-nullable type of the given kind.
    #[must_use]
    pub const fn of(kind: TypeKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    /// The unit type.
    #[must_use]
    pub const fn unit() -> Self {
        Self::of(TypeKind::Unit)
    }

    /// Booleans.
    #[must_use]
    pub const fn bool() -> Self {
        Self::of(TypeKind::Bool)
    }

    /// Signed integers.
    #[must_use]
    pub const fn int() -> Self {
        Self::of(TypeKind::Int)
    }

    /// Unsigned integers.
    #[must_use]
    pub const fn uint() -> Self {
        Self::of(TypeKind::UInt)
    }

    /// Floating point numbers.
    #[must_use]
    pub const fn float() -> Self {
        Self::of(TypeKind::Float)
    }

    /// Strings.
    #[must_use]
    pub const fn string() -> Self {
        Self::of(TypeKind::Str)
    }

    /// Byte buffers.
    #[must_use]
    pub const fn bytes() -> Self {
        Self::of(TypeKind::Bytes)
    }

    /// Lists of `inner`.
    #[must_use]
    pub fn list(inner: Self) -> Self {
        Self::of(TypeKind::List(Box::new(inner)))
    }

    /// Maps of `inner`.
    #[must_use]
    pub fn map(inner: Self) -> Self {
        Self::of(TypeKind::Map(Box::new(inner)))
    }

    /// A reference to another contract. Contract references are nullable.
    #[must_use]
    pub fn contract(name: impl Into<String>) -> Self {
        Self::of(TypeKind::Contract(name.into())).nullable()
    }

    /// A user type carried as an opaque value. Named types are nullable.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::of(TypeKind::Named(name.into())).nullable()
    }

    /// Any value, including null.
    #[must_use]
    pub const fn any() -> Self {
        Self {
            kind: TypeKind::Any,
            nullable: true,
        }
    }

    /// The same type, admitting null.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Returns `true` if `value` is assignable to this type.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return self.nullable;
        }
        match &self.kind {
            TypeKind::Any => true,
            TypeKind::Unit => matches!(value, Value::Unit),
            TypeKind::Bool => matches!(value, Value::Bool(_)),
            TypeKind::Int => value.as_i64().is_some(),
            TypeKind::UInt => value.as_u64().is_some(),
            TypeKind::Float => value.as_f64().is_some(),
            TypeKind::Str => matches!(value, Value::Str(_)),
            TypeKind::Bytes => matches!(value, Value::Bytes(_)),
            TypeKind::List(inner) => match value {
                Value::List(items) => items.iter().all(|item| inner.accepts(item)),
                _ => false,
            },
            TypeKind::Map(inner) => match value {
                Value::Map(entries) => entries.values().all(|v| inner.accepts(v)),
                _ => false,
            },
            TypeKind::Contract(name) => match value {
                Value::Mock(mock) => mock.contract().name() == name.as_str(),
                Value::Opaque(o) => o.type_name() == name.as_str(),
                _ => false,
            },
            TypeKind::Named(name) => value
                .as_opaque()
                .is_some_and(|o| o.type_name() == name.as_str()),
        }
    }

    /// Returns the contract name for contract-typed descriptors.
    #[must_use]
    pub fn contract_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Contract(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable && self.kind != TypeKind::Any {
            f.write_str("Option<")?;
        }
        match &self.kind {
            TypeKind::Unit => f.write_str("()")?,
            TypeKind::Bool => f.write_str("bool")?,
            TypeKind::Int => f.write_str("i64")?,
            TypeKind::UInt => f.write_str("u64")?,
            TypeKind::Float => f.write_str("f64")?,
            TypeKind::Str => f.write_str("String")?,
            TypeKind::Bytes => f.write_str("Vec<u8>")?,
            TypeKind::List(inner) => write!(f, "Vec<{inner}>")?,
            TypeKind::Map(inner) => write!(f, "Map<{inner}>")?,
            TypeKind::Contract(name) => write!(f, "dyn {name}")?,
            TypeKind::Named(name) => f.write_str(name)?,
            TypeKind::Any => f.write_str("any")?,
        }
        if self.nullable && self.kind != TypeKind::Any {
            f.write_str(">")?;
        }
        Ok(())
    }
}

/// What kind of contract surface a member implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    /// An ordinary method.
    Method,
    /// A property getter.
    PropertyGet,
    /// A property setter.
    PropertySet,
    /// An event subscription accessor.
    EventAdd,
    /// An event unsubscription accessor.
    EventRemove,
}

/// A named, typed parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Parameter type.
    pub ty: TypeDescriptor,
}

/// One interceptable member of a contract.
///
/// Two members are the same member when their contract, name, kind and
/// parameter types agree, which keeps overloads apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Member {
    contract: String,
    name: String,
    kind: MemberKind,
    params: Vec<Param>,
    returns: TypeDescriptor,
    generic_arity: usize,
    overridable: bool,
    has_base: bool,
}

impl Member {
    /// The owning contract's name.
    #[must_use]
    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// The member name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The member kind.
    #[must_use]
    pub const fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Declared parameters.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Declared return type.
    #[must_use]
    pub const fn returns(&self) -> &TypeDescriptor {
        &self.returns
    }

    /// Number of generic type parameters.
    #[must_use]
    pub const fn generic_arity(&self) -> usize {
        self.generic_arity
    }

    /// Whether setups may target this member.
    #[must_use]
    pub const fn is_overridable(&self) -> bool {
        self.overridable
    }

    /// Whether a base implementation exists to delegate to.
    #[must_use]
    pub const fn has_base(&self) -> bool {
        self.has_base
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.contract, self.name)?;
        if self.generic_arity > 0 {
            f.write_str("<")?;
            write_joined(f, (0..self.generic_arity).map(|i| format!("T{i}")))?;
            f.write_str(">")?;
        }
        f.write_str("(")?;
        write_joined(f, self.params.iter().map(|p| &p.ty))?;
        write!(f, ") -> {}", self.returns)
    }
}

/// A property exposed as getter and setter members.
#[derive(Debug, Clone)]
pub struct PropertyDecl {
    name: String,
    ty: TypeDescriptor,
    getter: Arc<Member>,
    setter: Option<Arc<Member>>,
}

impl PropertyDecl {
    /// Property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Property type.
    #[must_use]
    pub const fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }

    /// The getter member.
    #[must_use]
    pub const fn getter(&self) -> &Arc<Member> {
        &self.getter
    }

    /// The setter member, absent for read-only properties.
    #[must_use]
    pub const fn setter(&self) -> Option<&Arc<Member>> {
        self.setter.as_ref()
    }
}

/// An event exposed as add/remove accessor members.
#[derive(Debug, Clone)]
pub struct EventDecl {
    name: String,
    args: Vec<TypeDescriptor>,
    add: Arc<Member>,
    remove: Arc<Member>,
}

impl EventDecl {
    /// Event name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Types of the arguments handlers receive.
    #[must_use]
    pub fn args(&self) -> &[TypeDescriptor] {
        &self.args
    }

    /// The subscription accessor.
    #[must_use]
    pub const fn add(&self) -> &Arc<Member> {
        &self.add
    }

    /// The unsubscription accessor.
    #[must_use]
    pub const fn remove(&self) -> &Arc<Member> {
        &self.remove
    }
}

/// Whether members carry a real implementation that can be called through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    /// No member has a base implementation.
    Interface,
    /// Members have base implementations unless declared abstract.
    Class,
}

/// The full surface a substitute stands in for.
#[derive(Debug)]
pub struct Contract {
    name: String,
    kind: ContractKind,
    members: Vec<Arc<Member>>,
    properties: Vec<PropertyDecl>,
    events: Vec<EventDecl>,
}

impl Contract {
    /// Starts describing an interface-like contract.
    pub fn interface(name: impl Into<String>) -> ContractBuilder {
        ContractBuilder::new(name.into(), ContractKind::Interface)
    }

    /// Starts describing a class-like contract whose members have bases.
    pub fn class(name: impl Into<String>) -> ContractBuilder {
        ContractBuilder::new(name.into(), ContractKind::Class)
    }

    /// Contract name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Contract kind.
    #[must_use]
    pub const fn kind(&self) -> ContractKind {
        self.kind
    }

    /// Every member, including property and event accessors.
    #[must_use]
    pub fn members(&self) -> &[Arc<Member>] {
        &self.members
    }

    /// Declared properties.
    #[must_use]
    pub fn properties(&self) -> &[PropertyDecl] {
        &self.properties
    }

    /// Declared events.
    #[must_use]
    pub fn events(&self) -> &[EventDecl] {
        &self.events
    }

    /// Returns `true` if `member` belongs to this contract.
    #[must_use]
    pub fn contains(&self, member: &Member) -> bool {
        self.members.iter().any(|m| **m == *member)
    }

    /// Looks up the first method with the given name.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::UnknownMember`] if no method has that name.
    pub fn method(&self, name: &str) -> Result<Arc<Member>, MockError> {
        self.members
            .iter()
            .find(|m| m.kind == MemberKind::Method && m.name == name)
            .cloned()
            .ok_or_else(|| MockError::unknown_member(&self.name, name))
    }

    /// Looks up a method overload by parameter types.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::UnknownMember`] if no overload matches.
    pub fn overload(&self, name: &str, params: &[TypeDescriptor]) -> Result<Arc<Member>, MockError> {
        self.members
            .iter()
            .find(|m| {
                m.kind == MemberKind::Method
                    && m.name == name
                    && m.params.iter().map(|p| &p.ty).eq(params.iter())
            })
            .cloned()
            .ok_or_else(|| MockError::unknown_member(&self.name, name))
    }

    /// Looks up a property.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::UnknownProperty`] if it is not declared.
    pub fn property(&self, name: &str) -> Result<&PropertyDecl, MockError> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| MockError::unknown_property(&self.name, name))
    }

    /// Looks up an event.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::UnknownEvent`] if it is not declared.
    pub fn event(&self, name: &str) -> Result<&EventDecl, MockError> {
        self.events
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| MockError::unknown_event(&self.name, name))
    }
}

/// Incremental builder for [`Contract`].
#[derive(Debug)]
#[must_use]
pub struct ContractBuilder {
    name: String,
    kind: ContractKind,
    members: Vec<Arc<Member>>,
    properties: Vec<PropertyDecl>,
    events: Vec<EventDecl>,
}

type ParamList<'a> = &'a [(&'a str, TypeDescriptor)];

impl ContractBuilder {
    const fn new(name: String, kind: ContractKind) -> Self {
        Self {
            name,
            kind,
            members: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
        }
    }

    fn member(
        &self,
        name: &str,
        kind: MemberKind,
        params: ParamList<'_>,
        returns: TypeDescriptor,
    ) -> Member {
        Member {
            contract: self.name.clone(),
            name: name.to_owned(),
            kind,
            params: params
                .iter()
                .map(|(name, ty)| Param {
                    name: (*name).to_owned(),
                    ty: ty.clone(),
                })
                .collect(),
            returns,
            generic_arity: 0,
            overridable: true,
            has_base: self.kind == ContractKind::Class,
        }
    }

    fn push(mut self, member: Member) -> Self {
        self.members.push(Arc::new(member));
        self
    }

    /// Declares an overridable method.
    pub fn method<const N: usize>(
        self,
        name: &str,
        params: [(&str, TypeDescriptor); N],
        returns: TypeDescriptor,
    ) -> Self {
        let member = self.member(name, MemberKind::Method, &params, returns);
        self.push(member)
    }

    /// Declares a generic method with `arity` type parameters.
    pub fn generic_method<const N: usize>(
        self,
        name: &str,
        arity: usize,
        params: [(&str, TypeDescriptor); N],
        returns: TypeDescriptor,
    ) -> Self {
        let mut member = self.member(name, MemberKind::Method, &params, returns);
        member.generic_arity = arity;
        self.push(member)
    }

    /// Declares a method without a base implementation.
    pub fn abstract_method<const N: usize>(
        self,
        name: &str,
        params: [(&str, TypeDescriptor); N],
        returns: TypeDescriptor,
    ) -> Self {
        let mut member = self.member(name, MemberKind::Method, &params, returns);
        member.has_base = false;
        self.push(member)
    }

    /// Declares a method that cannot be intercepted.
    pub fn sealed_method<const N: usize>(
        self,
        name: &str,
        params: [(&str, TypeDescriptor); N],
        returns: TypeDescriptor,
    ) -> Self {
        let mut member = self.member(name, MemberKind::Method, &params, returns);
        member.overridable = false;
        self.push(member)
    }

    /// Declares a read/write property.
    pub fn property(self, name: &str, ty: TypeDescriptor) -> Self {
        self.add_property(name, ty, true)
    }

    /// Declares a read-only property.
    pub fn read_only_property(self, name: &str, ty: TypeDescriptor) -> Self {
        self.add_property(name, ty, false)
    }

    fn add_property(mut self, name: &str, ty: TypeDescriptor, writable: bool) -> Self {
        let getter = Arc::new(self.member(
            &format!("get_{name}"),
            MemberKind::PropertyGet,
            &[],
            ty.clone(),
        ));
        let setter = writable.then(|| {
            Arc::new(self.member(
                &format!("set_{name}"),
                MemberKind::PropertySet,
                &[("value", ty.clone())],
                TypeDescriptor::unit(),
            ))
        });
        self.members.push(Arc::clone(&getter));
        if let Some(setter) = &setter {
            self.members.push(Arc::clone(setter));
        }
        self.properties.push(PropertyDecl {
            name: name.to_owned(),
            ty,
            getter,
            setter,
        });
        self
    }

    /// Declares an event whose handlers receive arguments of `args` types.
    pub fn event<const N: usize>(mut self, name: &str, args: [TypeDescriptor; N]) -> Self {
        let handler = [("handler", TypeDescriptor::uint())];
        let mut add = self.member(
            &format!("add_{name}"),
            MemberKind::EventAdd,
            &handler,
            TypeDescriptor::unit(),
        );
        let mut remove = self.member(
            &format!("remove_{name}"),
            MemberKind::EventRemove,
            &handler,
            TypeDescriptor::unit(),
        );
        add.has_base = false;
        remove.has_base = false;
        let add = Arc::new(add);
        let remove = Arc::new(remove);
        self.members.push(Arc::clone(&add));
        self.members.push(Arc::clone(&remove));
        self.events.push(EventDecl {
            name: name.to_owned(),
            args: args.to_vec(),
            add,
            remove,
        });
        self
    }

    /// Finishes the contract.
    #[must_use]
    pub fn build(self) -> Arc<Contract> {
        Arc::new(Contract {
            name: self.name,
            kind: self.kind,
            members: self.members,
            properties: self.properties,
            events: self.events,
        })
    }
}

/// One call as delivered by an adapter.
#[derive(Debug, Clone)]
pub struct Call {
    /// The member being called.
    pub member: Arc<Member>,
    /// Generic instantiation, one type per generic parameter.
    pub generic_args: Vec<TypeDescriptor>,
    /// Argument values, in declaration order.
    pub args: Vec<Value>,
}

impl Call {
    /// A call to a non-generic member.
    pub fn new(member: Arc<Member>, args: impl IntoIterator<Item = Value>) -> Self {
        Self {
            member,
            generic_args: Vec::new(),
            args: args.into_iter().collect(),
        }
    }

    /// Sets the generic instantiation.
    #[must_use]
    pub fn with_generic_args(mut self, generic_args: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        self.generic_args = generic_args.into_iter().collect();
        self
    }
}

/// The capability every substitute adapter relies on: each call made on the
/// adapter is funneled through `intercept`.
pub trait Interceptor: Send + Sync {
    /// Handles one call and produces its result.
    ///
    /// # Errors
    ///
    /// Returns the error the governing setup was configured to throw, or an
    /// engine error (strict-mode miss, malformed call).
    fn intercept(&self, call: Call) -> Result<Value, MockError>;
}

/// A real implementation a substitute can delegate to ("call base").
pub trait BaseImpl: Send + Sync {
    /// Invokes the real implementation of `member`.
    ///
    /// # Errors
    ///
    /// Returns whatever the real implementation fails with.
    fn call_base(&self, member: &Member, args: &[Value]) -> Result<Value, Fault>;
}

impl<F> BaseImpl for F
where
    F: Fn(&Member, &[Value]) -> Result<Value, Fault> + Send + Sync,
{
    fn call_base(&self, member: &Member, args: &[Value]) -> Result<Value, Fault> {
        self(member, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> Arc<Contract> {
        Contract::class("Repo")
            .method("get", [("id", TypeDescriptor::int())], TypeDescriptor::string())
            .method("get", [("key", TypeDescriptor::string())], TypeDescriptor::string())
            .abstract_method("save", [("v", TypeDescriptor::string())], TypeDescriptor::unit())
            .sealed_method("id", [], TypeDescriptor::uint())
            .generic_method("cast", 1, [("v", TypeDescriptor::any())], TypeDescriptor::any())
            .read_only_property("size", TypeDescriptor::uint())
            .event("saved", [TypeDescriptor::string()])
            .build()
    }

    #[test]
    fn overloads_are_distinct_members() {
        let repo = repo();
        let by_id = repo.overload("get", &[TypeDescriptor::int()]).unwrap();
        let by_key = repo.overload("get", &[TypeDescriptor::string()]).unwrap();
        assert_ne!(by_id, by_key);
        assert!(repo.contains(&by_id));
        assert!(repo.overload("get", &[TypeDescriptor::bool()]).is_err());
    }

    #[test]
    fn class_members_have_bases_unless_abstract() {
        let repo = repo();
        assert!(repo.method("get").unwrap().has_base());
        assert!(!repo.method("save").unwrap().has_base());
        assert!(!repo.method("id").unwrap().is_overridable());
    }

    #[test]
    fn properties_and_events_expand_to_accessors() {
        let repo = repo();
        let size = repo.property("size").unwrap();
        assert_eq!(size.getter().kind(), MemberKind::PropertyGet);
        assert!(size.setter().is_none());
        let saved = repo.event("saved").unwrap();
        assert_eq!(saved.add().kind(), MemberKind::EventAdd);
        assert!(repo.contains(saved.remove()));
        assert!(matches!(
            repo.event("deleted"),
            Err(MockError::UnknownEvent { .. })
        ));
    }

    #[test]
    fn nullability_governs_null_acceptance() {
        assert!(!TypeDescriptor::string().accepts(&Value::Null));
        assert!(TypeDescriptor::string().nullable().accepts(&Value::Null));
        assert!(TypeDescriptor::any().accepts(&Value::Null));
        assert!(TypeDescriptor::float().accepts(&Value::Int(3)));
        assert!(TypeDescriptor::list(TypeDescriptor::int()).accepts(&Value::list([1, 2])));
        assert!(!TypeDescriptor::list(TypeDescriptor::int()).accepts(&Value::list(["x"])));
        assert!(TypeDescriptor::named("Point").accepts(&Value::opaque("Point", 1u8)));
    }

    #[test]
    fn member_display_renders_signature() {
        let repo = repo();
        let cast = repo.method("cast").unwrap();
        assert_eq!(cast.to_string(), "Repo.cast<T0>(any) -> any");
        let size = repo.property("size").unwrap();
        assert_eq!(size.getter().to_string(), "Repo.get_size() -> u64");
    }
}
