//! Zero-copy read capability tracking
//!
//! An engine starts [`Capable`](CapabilityState::Capable) and moves to
//! [`Incapable`](CapabilityState::Incapable) the first time the kernel refuses to vmsplice pipe
//! contents into user memory. The transition never reverses.

use spliceio_types::CapabilityScope;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set once any process-scoped engine observes a refusal
static PROCESS_INCAPABLE: AtomicBool = AtomicBool::new(false);

/// Whether zero-copy reads may be attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityState {
    /// Reads try the zero-copy path first
    Capable,
    /// Reads always take the copying path
    Incapable,
}

/// One-way capability flag for an engine instance
#[derive(Debug, Clone)]
pub struct Capability {
    state: CapabilityState,
    scope: CapabilityScope,
}

impl Capability {
    /// Initial capability; `zero_copy = false` starts incapable
    pub fn new(zero_copy: bool, scope: CapabilityScope) -> Self {
        let state = if zero_copy {
            CapabilityState::Capable
        } else {
            CapabilityState::Incapable
        };
        Self { state, scope }
    }

    /// Current state, folding in the process-wide flag for process scope
    pub fn state(&self) -> CapabilityState {
        if self.state == CapabilityState::Capable
            && self.scope == CapabilityScope::Process
            && PROCESS_INCAPABLE.load(Ordering::Acquire)
        {
            return CapabilityState::Incapable;
        }
        self.state
    }

    /// Whether the zero-copy path should be attempted
    pub fn is_capable(&self) -> bool {
        self.state() == CapabilityState::Capable
    }

    /// Scope the transition is shared across
    pub fn scope(&self) -> CapabilityScope {
        self.scope
    }

    /// Record a refusal; returns `true` if this call performed the transition
    pub(crate) fn mark_incapable(&mut self) -> bool {
        let was_capable = self.is_capable();
        self.state = CapabilityState::Incapable;
        if self.scope == CapabilityScope::Process {
            PROCESS_INCAPABLE.store(true, Ordering::Release);
        }
        was_capable
    }
}

#[cfg(test)]
pub(crate) fn reset_process_scope() {
    PROCESS_INCAPABLE.store(false, Ordering::Release);
}
