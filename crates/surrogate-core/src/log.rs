//! Append-only record of every call a mock received.
//!
//! Sequence numbers are assigned and entries appended under a single mutex,
//! so appends are linearizable: concurrent callers receive distinct,
//! gap-free numbers and no append is lost. Numbers keep increasing across
//! [`InvocationLog::clear`].

use std::sync::{Arc, Mutex};

use crate::contract::{Member, TypeDescriptor};
use crate::invocation::Invocation;
use crate::value::Value;

#[derive(Debug, Default)]
struct LogState {
    next_seq: u64,
    entries: Vec<Arc<Invocation>>,
}

/// A mock's invocation history.
#[derive(Debug, Default)]
pub struct InvocationLog {
    state: Mutex<LogState>,
}

impl InvocationLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a call and returns the stored invocation.
    pub(crate) fn append(
        &self,
        member: Arc<Member>,
        generic_args: Vec<TypeDescriptor>,
        args: Vec<Value>,
    ) -> Arc<Invocation> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        state.next_seq += 1;
        let invocation = Arc::new(Invocation::new(state.next_seq, member, generic_args, args));
        state.entries.push(Arc::clone(&invocation));
        invocation
    }

    /// Copy of the recorded invocations in sequence order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Invocation>> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entries
            .clone()
    }

    /// Recorded invocations of `member`.
    #[must_use]
    pub fn for_member(&self, member: &Member) -> Vec<Arc<Invocation>> {
        self.snapshot()
            .into_iter()
            .filter(|inv| **inv.member() == *member)
            .collect()
    }

    /// Invocations no verification has accounted for yet.
    #[must_use]
    pub fn unverified(&self) -> Vec<Arc<Invocation>> {
        self.snapshot()
            .into_iter()
            .filter(|inv| !inv.is_verified())
            .collect()
    }

    /// Number of recorded invocations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entries
            .len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets recorded invocations. Sequence numbers are not reused.
    pub fn clear(&self) {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entries
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::thread;

    use super::*;
    use crate::contract::Contract;

    fn member() -> Arc<Member> {
        Contract::interface("Svc")
            .method("ping", [], TypeDescriptor::unit())
            .build()
            .method("ping")
            .unwrap()
    }

    #[test]
    fn sequence_numbers_survive_clear() {
        let log = InvocationLog::new();
        let ping = member();
        assert_eq!(log.append(Arc::clone(&ping), Vec::new(), Vec::new()).seq(), 1);
        assert_eq!(log.append(Arc::clone(&ping), Vec::new(), Vec::new()).seq(), 2);
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.append(ping, Vec::new(), Vec::new()).seq(), 3);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn concurrent_appends_are_gap_free() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 250;

        let log = Arc::new(InvocationLog::new());
        let ping = member();
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let log = Arc::clone(&log);
                let ping = Arc::clone(&ping);
                thread::spawn(move || {
                    for _ in 0..PER_THREAD {
                        log.append(Arc::clone(&ping), Vec::new(), Vec::new());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("appender panicked");
        }

        let seqs: Vec<u64> = log.snapshot().iter().map(|inv| inv.seq()).collect();
        let total = THREADS * PER_THREAD;
        assert_eq!(seqs.len() as u64, total);
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
        let distinct: HashSet<u64> = seqs.iter().copied().collect();
        assert_eq!(distinct, (1..=total).collect());
    }
}
