//! Fault injection for the in-memory store
//!
//! Lets tests make one store fail or lag while the other keeps working, which
//! is how partial writes and capacity races are reproduced without a database.

use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Kind of repository call, for fault matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

#[derive(Debug, Default)]
struct FaultState {
    fail_reads: bool,
    fail_writes: bool,
    /// Fail only this many upcoming writes, then recover
    write_failures_left: Option<usize>,
    latency: Option<Duration>,
}

/// Shared, mutable fault configuration for one store.
///
/// Cloning shares the plan, so a test can keep a handle and flip faults on a
/// store that is already wired into a coordinator.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    state: Arc<Mutex<FaultState>>,
}

impl FaultPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every write until cleared.
    pub fn fail_writes(&self) {
        self.with_state(|s| s.fail_writes = true);
    }

    /// Fail the next `n` writes, then behave normally.
    pub fn fail_next_writes(&self, n: usize) {
        self.with_state(|s| s.write_failures_left = Some(n));
    }

    /// Fail every read until cleared.
    pub fn fail_reads(&self) {
        self.with_state(|s| s.fail_reads = true);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.with_state(|s| s.latency = Some(latency));
    }

    /// Remove all faults.
    pub fn clear(&self) {
        self.with_state(|s| *s = FaultState::default());
    }

    pub(crate) fn latency(&self) -> Option<Duration> {
        self.with_state(|s| s.latency)
    }

    /// Decide whether this call fails. Returns the reason if it does.
    pub(crate) fn check(&self, access: Access, operation: &str) -> Option<String> {
        self.with_state(|s| match access {
            Access::Read if s.fail_reads => Some(format!("injected read fault during {operation}")),
            Access::Read => None,
            Access::Write if s.fail_writes => {
                Some(format!("injected write fault during {operation}"))
            }
            Access::Write => match s.write_failures_left {
                Some(n) if n > 0 => {
                    s.write_failures_left = Some(n - 1);
                    Some(format!("injected write fault during {operation}"))
                }
                _ => None,
            },
        })
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut FaultState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_faults_by_default() {
        let plan = FaultPlan::new();
        assert!(plan.check(Access::Read, "get").is_none());
        assert!(plan.check(Access::Write, "create").is_none());
        assert!(plan.latency().is_none());
    }

    #[test]
    fn counted_write_failures_recover() {
        let plan = FaultPlan::new();
        plan.fail_next_writes(2);

        assert!(plan.check(Access::Write, "create").is_some());
        assert!(plan.check(Access::Read, "get").is_none());
        assert!(plan.check(Access::Write, "update").is_some());
        assert!(plan.check(Access::Write, "update").is_none());
    }

    #[test]
    fn clones_share_state() {
        let plan = FaultPlan::new();
        let handle = plan.clone();
        handle.fail_reads();
        assert!(plan.check(Access::Read, "get").is_some());

        handle.clear();
        assert!(plan.check(Access::Read, "get").is_none());
    }
}
