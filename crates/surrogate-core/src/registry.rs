//! Ordered store of a mock's setups.
//!
//! # Precedence
//!
//! Setups are scanned in reverse creation order and the first eligible one
//! governs the call, so a later, narrower setup overrides an earlier
//! catch-all without removing it. Exhausted response sequences are skipped,
//! letting the call fall through to the next older setup.
//!
//! # Thread Safety
//!
//! Registration pushes a fully built setup under the write lock, so readers
//! never observe a partial setup. Readers copy the list of `Arc<Setup>` and
//! release the lock before evaluating guards and matchers, which may run user
//! code that re-enters the mock.

use std::sync::{Arc, RwLock};

use crate::contract::Member;
use crate::invocation::{Invocation, SetupId};
use crate::matcher::CallPattern;
use crate::setup::{Claim, Condition, Setup, Turn};

/// The setup selected for a dispatch, with the slot it claimed.
pub(crate) struct Governing {
    pub(crate) setup: Arc<Setup>,
    pub(crate) claim: Claim,
}

/// A mock's setups in creation order.
#[derive(Debug, Default)]
pub struct SetupRegistry {
    setups: RwLock<Vec<Arc<Setup>>>,
}

impl SetupRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds and publishes a setup for a pattern that has already been
    /// validated. Ids follow registration order.
    pub(crate) fn register(&self, pattern: CallPattern, condition: Option<Condition>) -> Arc<Setup> {
        self.publish(|id| Setup::new(id, pattern, condition))
    }

    /// Like [`register`](Self::register), for a setup that must also take
    /// `turn` before it governs a call.
    pub(crate) fn register_turn(&self, pattern: CallPattern, turn: Arc<dyn Turn>) -> Arc<Setup> {
        self.publish(|id| Setup::new(id, pattern, None).with_turn(turn))
    }

    fn publish(&self, build: impl FnOnce(SetupId) -> Setup) -> Arc<Setup> {
        let mut setups = self
            .setups
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let id = SetupId(setups.len() as u64 + 1);
        let setup = Arc::new(build(id));
        setups.push(Arc::clone(&setup));
        tracing::debug!(setup = %setup, "registered setup");
        setup
    }

    /// Copy of the current setups, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Setup>> {
        self.setups
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of registered setups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.setups
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a setup by id.
    #[must_use]
    pub fn get(&self, id: SetupId) -> Option<Arc<Setup>> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.setups
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(index)
            .cloned()
    }

    /// Selects the setup that governs `invocation`, newest first.
    ///
    /// Returns `None` when nothing is eligible; that is the normal signal to
    /// fall back to strict failure or default-value synthesis.
    pub(crate) fn find_governing(&self, invocation: &Invocation) -> Option<Governing> {
        for setup in self.snapshot().into_iter().rev() {
            if let Some(claim) = setup.try_claim(invocation) {
                tracing::trace!(
                    seq = invocation.seq(),
                    setup = %setup.id(),
                    slot = ?claim.slot,
                    "setup governs invocation"
                );
                return Some(Governing { setup, claim });
            }
        }
        tracing::trace!(seq = invocation.seq(), "no setup governs invocation");
        None
    }

    /// Every setup, active or exhausted, targeting `member` (or any member
    /// when `None`) and accepted by `filter`.
    pub fn find_all<F>(&self, member: Option<&Member>, filter: F) -> Vec<Arc<Setup>>
    where
        F: Fn(&Setup) -> bool,
    {
        self.snapshot()
            .into_iter()
            .filter(|s| member.is_none_or(|m| **s.pattern().member() == *m))
            .filter(|s| filter(s.as_ref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Contract, TypeDescriptor};
    use crate::matcher::Matcher;
    use crate::setup::Response;
    use crate::value::Value;

    fn member() -> Arc<Member> {
        Contract::interface("Svc")
            .method("f", [("x", TypeDescriptor::int())], TypeDescriptor::int())
            .method("g", [], TypeDescriptor::int())
            .build()
            .method("f")
            .unwrap()
    }

    fn call(member: &Arc<Member>, seq: u64, x: i64) -> Invocation {
        Invocation::new(seq, Arc::clone(member), Vec::new(), vec![Value::Int(x)])
    }

    #[test]
    fn newest_matching_setup_wins() {
        let registry = SetupRegistry::new();
        let f = member();
        let catch_all = registry.register(CallPattern::new(Arc::clone(&f), [Matcher::any()]), None);
        let five = registry.register(CallPattern::new(Arc::clone(&f), [Matcher::eq(5)]), None);

        let governing = registry.find_governing(&call(&f, 1, 5)).unwrap();
        assert_eq!(governing.setup.id(), five.id());
        let governing = registry.find_governing(&call(&f, 2, 6)).unwrap();
        assert_eq!(governing.setup.id(), catch_all.id());
    }

    #[test]
    fn false_guard_makes_setup_inert() {
        let registry = SetupRegistry::new();
        let f = member();
        registry.register(
            CallPattern::new(Arc::clone(&f), [Matcher::any()]),
            Some(Arc::new(|| false)),
        );
        assert!(registry.find_governing(&call(&f, 1, 1)).is_none());
    }

    #[test]
    fn exhausted_sequences_fall_through_but_stay_registered() {
        let registry = SetupRegistry::new();
        let f = member();
        let older = registry.register(CallPattern::any_args(Arc::clone(&f)), None);
        let seq = registry.register(CallPattern::any_args(Arc::clone(&f)), None);
        seq.set_sequence(vec![Response::value(1)].into());

        assert_eq!(registry.find_governing(&call(&f, 1, 0)).unwrap().setup.id(), seq.id());
        assert_eq!(registry.find_governing(&call(&f, 2, 0)).unwrap().setup.id(), older.id());
        assert!(seq.is_exhausted());
        assert_eq!(registry.find_all(Some(&*f), |_| true).len(), 2);
        assert_eq!(registry.find_all(None, Setup::is_exhausted).len(), 1);
        assert_eq!(registry.get(seq.id()).map(|s| s.id()), Some(seq.id()));
        assert!(registry.get(SetupId(0)).is_none());
    }
}
