//! Ordered expectations across setups and mocks.
//!
//! A [`CallOrder`] hands out steps. Each setup created through it only
//! governs a call while the order's cursor is at that setup's step, and
//! moves the cursor on with a compare-and-swap at the moment it is selected.
//! Of several concurrent calls arriving at the same step, exactly one takes
//! it; the others, like any call made out of turn, fall through to older
//! setups, a default value, or a strict-mode failure.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::MockError;
use crate::matcher::CallPattern;
use crate::mock::Mock;
use crate::setup::{SetupHandle, Turn};

#[derive(Debug, Default)]
struct OrderState {
    cursor: AtomicUsize,
    steps: Mutex<usize>,
    cyclic: bool,
}

impl OrderState {
    fn len(&self) -> usize {
        *self
            .steps
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn after(&self, step: usize) -> usize {
        if self.cyclic && step + 1 == self.len() {
            0
        } else {
            step + 1
        }
    }
}

/// One declared step of an order.
struct Step {
    state: Arc<OrderState>,
    index: usize,
}

impl Turn for Step {
    fn try_take(&self) -> bool {
        let next = self.state.after(self.index);
        let taken = self
            .state
            .cursor
            .compare_exchange(self.index, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if taken {
            tracing::trace!(step = self.index, next, "call order advanced");
        }
        taken
    }

    fn give_back(&self) {
        let next = self.state.after(self.index);
        // only if nothing moved the cursor since
        let _ = self
            .state
            .cursor
            .compare_exchange(next, self.index, Ordering::AcqRel, Ordering::Acquire);
    }
}

/// A sequence of setups that must be matched one after another.
#[derive(Debug, Clone, Default)]
pub struct CallOrder {
    state: Arc<OrderState>,
}

impl CallOrder {
    /// A one-shot order: once every step has been matched, no ordered setup
    /// matches again.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An order that starts over after its last step.
    #[must_use]
    pub fn cyclic() -> Self {
        Self {
            state: Arc::new(OrderState {
                cyclic: true,
                ..OrderState::default()
            }),
        }
    }

    /// Declares the next step on `mock`.
    ///
    /// # Errors
    ///
    /// Returns the configuration errors of [`Mock::setup`]; a rejected
    /// pattern does not consume a step.
    pub fn setup(&self, mock: &Mock, pattern: CallPattern) -> Result<SetupHandle, MockError> {
        let mut steps = self
            .state
            .steps
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let step = Step {
            state: Arc::clone(&self.state),
            index: *steps,
        };
        let handle = mock.setup_in_turn(pattern, Arc::new(step))?;
        *steps += 1;
        Ok(handle)
    }

    /// Index of the step expected next.
    #[must_use]
    pub fn position(&self) -> usize {
        self.state.cursor.load(Ordering::Acquire)
    }

    /// Number of declared steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// Returns `true` if no step has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once every step of a one-shot order has been matched.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.state.cyclic && self.position() >= self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MockOptions;
    use crate::contract::{Contract, TypeDescriptor};
    use crate::factory::MockFactory;
    use crate::value::Value;

    fn svc() -> Mock {
        let contract = Contract::interface("Svc")
            .method("open", [], TypeDescriptor::int())
            .method("close", [], TypeDescriptor::int())
            .build();
        MockFactory::new(MockOptions::strict()).create(contract)
    }

    #[test]
    fn steps_match_only_in_turn() {
        let mock = svc();
        let order = CallOrder::new();
        let open = mock.contract().method("open").unwrap();
        let close = mock.contract().method("close").unwrap();
        order
            .setup(&mock, CallPattern::any_args(open))
            .unwrap()
            .returns(1);
        order
            .setup(&mock, CallPattern::any_args(close))
            .unwrap()
            .returns(2);

        assert!(matches!(
            mock.call("close", []),
            Err(MockError::UnmatchedCall { .. })
        ));
        assert_eq!(mock.call("open", []).unwrap(), Value::Int(1));
        assert_eq!(order.position(), 1);
        assert_eq!(mock.call("close", []).unwrap(), Value::Int(2));
        assert!(order.is_complete());
        assert!(mock.call("open", []).is_err());
    }

    #[test]
    fn cyclic_orders_wrap_around() {
        let mock = svc();
        let order = CallOrder::cyclic();
        let open = mock.contract().method("open").unwrap();
        let close = mock.contract().method("close").unwrap();
        order.setup(&mock, CallPattern::any_args(open)).unwrap();
        order.setup(&mock, CallPattern::any_args(close)).unwrap();

        for _ in 0..3 {
            mock.call("open", []).unwrap();
            mock.call("close", []).unwrap();
        }
        assert_eq!(order.position(), 0);
        assert!(!order.is_complete());
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn concurrent_callers_take_a_step_once() {
        let contract = Contract::interface("Svc")
            .method("open", [], TypeDescriptor::int())
            .build();
        let mock = MockFactory::default().create(contract);
        let order = CallOrder::new();
        let open = mock.contract().method("open").unwrap();
        order
            .setup(&mock, CallPattern::any_args(open))
            .unwrap()
            .returns(1);

        let barrier = Arc::new(std::sync::Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let mock = mock.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    mock.call("open", []).unwrap()
                })
            })
            .collect();
        let results: Vec<Value> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|v| **v == Value::Int(1)).count(), 1);
        assert_eq!(results.iter().filter(|v| **v == Value::Int(0)).count(), 7);
        assert_eq!(order.position(), 1);
        assert_eq!(mock.setups().snapshot()[0].invocation_count(), 1);
    }

    #[test]
    fn exhausted_sequence_keeps_its_turn() {
        let mock = svc();
        let order = CallOrder::cyclic();
        let open = mock.contract().method("open").unwrap();
        let close = mock.contract().method("close").unwrap();
        order
            .setup(&mock, CallPattern::any_args(open))
            .unwrap()
            .returns_in_sequence([7]);
        order
            .setup(&mock, CallPattern::any_args(close))
            .unwrap()
            .returns(8);

        assert_eq!(mock.call("open", []).unwrap(), Value::Int(7));
        assert_eq!(mock.call("close", []).unwrap(), Value::Int(8));
        assert_eq!(order.position(), 0);
        // the second round finds the sequence spent and hands the step back
        assert!(matches!(
            mock.call("open", []),
            Err(MockError::UnmatchedCall { .. })
        ));
        assert_eq!(order.position(), 0);
    }
}
