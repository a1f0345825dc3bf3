//! Recorded observations of intercepted calls.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::contract::{Member, TypeDescriptor};
use crate::value::{Value, write_joined};

/// Identifies a setup within its mock; ids follow creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SetupId(pub u64);

impl fmt::Display for SetupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One intercepted call.
///
/// Everything but the `matched_by` back-reference and the `verified` flag is
/// fixed at creation. Invocations are owned by the mock's
/// [`InvocationLog`](crate::log::InvocationLog), which assigns `seq`.
#[derive(Debug)]
pub struct Invocation {
    seq: u64,
    member: Arc<Member>,
    generic_args: Vec<TypeDescriptor>,
    args: Vec<Value>,
    matched_by: OnceLock<SetupId>,
    verified: AtomicBool,
}

impl Invocation {
    pub(crate) const fn new(
        seq: u64,
        member: Arc<Member>,
        generic_args: Vec<TypeDescriptor>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            seq,
            member,
            generic_args,
            args,
            matched_by: OnceLock::new(),
            verified: AtomicBool::new(false),
        }
    }

    /// Position in the owning log's total order.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    /// The member that was called.
    #[must_use]
    pub const fn member(&self) -> &Arc<Member> {
        &self.member
    }

    /// Generic instantiation of the call.
    #[must_use]
    pub fn generic_args(&self) -> &[TypeDescriptor] {
        &self.generic_args
    }

    /// Argument snapshot.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// The setup that governed this call, if any.
    #[must_use]
    pub fn matched_by(&self) -> Option<SetupId> {
        self.matched_by.get().copied()
    }

    /// Whether a verification has accounted for this call.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verified.load(Ordering::Acquire)
    }

    pub(crate) fn set_matched_by(&self, id: SetupId) {
        // dispatch matches each invocation at most once
        let _ = self.matched_by.set(id);
    }

    pub(crate) fn mark_verified(&self) {
        self.verified.store(true, Ordering::Release);
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.member.contract(), self.member.name())?;
        if !self.generic_args.is_empty() {
            f.write_str("<")?;
            write_joined(f, self.generic_args.iter())?;
            f.write_str(">")?;
        }
        f.write_str("(")?;
        write_joined(f, self.args.iter())?;
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Contract;

    #[test]
    fn flags_start_clear_and_matched_by_is_set_once() {
        let contract = Contract::interface("Svc")
            .method("f", [("x", TypeDescriptor::int())], TypeDescriptor::unit())
            .build();
        let inv = Invocation::new(1, contract.method("f").unwrap(), Vec::new(), vec![Value::Int(4)]);
        assert_eq!(inv.matched_by(), None);
        assert!(!inv.is_verified());

        inv.set_matched_by(SetupId(2));
        inv.set_matched_by(SetupId(3));
        inv.mark_verified();
        assert_eq!(inv.matched_by(), Some(SetupId(2)));
        assert!(inv.is_verified());
        assert_eq!(inv.to_string(), "Svc.f(4)");
    }
}
