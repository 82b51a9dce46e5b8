// vim: tw=80
//! The mocking session and the per-mock invocation history.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use parking_lot::Mutex;

use crate::invocation::{Invocation, InvocationBuilder};

struct SessionCore {
    sequence: AtomicU64,
    mock_ids: AtomicU64,
}

/// Owns the counters shared by every mock it creates.
///
/// The sequence counter assigns one globally unique, monotonically increasing
/// number per recorded invocation, across all of the session's mocks and all
/// recording threads.  Keeping the counters on an explicit session object
/// (instead of process-wide globals) keeps parallel test runs independent of
/// each other.
///
/// # Examples
/// ```
/// use verimock::MockingSession;
///
/// let session = MockingSession::new();
/// let first = session.mock("first");
/// let second = session.mock("second");
/// assert_ne!(first.id(), second.id());
/// ```
#[derive(Clone)]
pub struct MockingSession {
    core: Arc<SessionCore>,
}

impl MockingSession {
    pub fn new() -> Self {
        MockingSession {
            core: Arc::new(SessionCore {
                sequence: AtomicU64::new(0),
                mock_ids: AtomicU64::new(0),
            }),
        }
    }

    /// Register a new mock identity with an empty invocation history.
    pub fn mock(&self, name: &str) -> Mock {
        let id = self.core.mock_ids.fetch_add(1, Ordering::Relaxed) + 1;
        Mock {
            core: Arc::new(MockCore {
                id,
                name: Arc::from(name),
                session: self.core.clone(),
                invocations: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl Default for MockingSession {
    fn default() -> Self {
        Self::new()
    }
}

struct MockCore {
    id: u64,
    name: Arc<str>,
    session: Arc<SessionCore>,
    invocations: Mutex<Vec<Arc<Invocation>>>,
}

/// A mock identity plus its append-only invocation history.
///
/// The interception layer records one [`Invocation`] per call; verification
/// reads consistent snapshots.  Recording never blocks recording on other
/// mocks, and history order always agrees with sequence-number order.
/// Cloning a `Mock` clones the handle, not the history.
#[derive(Clone)]
pub struct Mock {
    core: Arc<MockCore>,
}

impl Mock {
    pub fn id(&self) -> u64 {
        self.core.id
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        self.core.name.clone()
    }

    /// Record one intercepted call: assign the next session sequence number
    /// and append to the history.
    ///
    /// The sequence number is taken while the history lock is held, so the
    /// per-mock history order and the global sequence order never disagree.
    pub fn record(&self, builder: InvocationBuilder) -> Arc<Invocation> {
        let mut history = self.core.invocations.lock();
        let seq = self.core.session.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let invocation = Arc::new(builder.build(seq));
        history.push(invocation.clone());
        invocation
    }

    /// A snapshot of the history in recording order.
    pub fn invocations(&self) -> Vec<Arc<Invocation>> {
        self.core.invocations.lock().clone()
    }

    /// Clear the history.  The only way an invocation record is ever
    /// discarded.
    pub fn reset(&self) {
        self.core.invocations.lock().clear();
    }
}

#[cfg(test)]
mod t {
    use super::*;
    use crate::invocation::{MethodSignature, ParamType};

    fn nullary(name: &str) -> MethodSignature {
        MethodSignature::new(name, vec![], ParamType::of::<()>())
    }

    #[test]
    fn sequence_numbers_are_global_to_the_session() {
        let session = MockingSession::new();
        let a = session.mock("a");
        let b = session.mock("b");
        let i1 = a.record(InvocationBuilder::new(&a, nullary("f")));
        let i2 = b.record(InvocationBuilder::new(&b, nullary("g")));
        let i3 = a.record(InvocationBuilder::new(&a, nullary("f")));
        assert_eq!(i1.sequence_number(), 1);
        assert_eq!(i2.sequence_number(), 2);
        assert_eq!(i3.sequence_number(), 3);
    }

    #[test]
    fn reset_clears_history() {
        let session = MockingSession::new();
        let m = session.mock("m");
        m.record(InvocationBuilder::new(&m, nullary("f")));
        assert_eq!(m.invocations().len(), 1);
        m.reset();
        assert!(m.invocations().is_empty());
    }

    #[test]
    fn clones_share_history() {
        let session = MockingSession::new();
        let m = session.mock("m");
        let m2 = m.clone();
        m.record(InvocationBuilder::new(&m, nullary("f")));
        assert_eq!(m2.invocations().len(), 1);
    }
}
