//! Worker pool management.
//!
//! # Responsibilities
//! - Hold the workers of one service family in construction order
//! - Hand out workers in round-robin order
//! - Drop workers that were observed failing
//!
//! # Design Decisions
//! - One mutex per pool; pools never share a lock
//! - The lock is never held across an await point
//! - Pools only shrink; nothing re-adds a removed worker

use std::sync::{Mutex, MutexGuard};

use crate::load_balancer::worker::Worker;

#[derive(Debug)]
struct PoolState {
    members: Vec<Worker>,
    cursor: usize,
}

/// Round-robin pool for a single service family.
#[derive(Debug)]
pub struct WorkerPool {
    prefix: String,
    state: Mutex<PoolState>,
}

impl WorkerPool {
    /// Create a pool routing `prefix` to the given workers, in order.
    pub fn new(prefix: impl Into<String>, members: Vec<Worker>) -> Self {
        Self {
            prefix: prefix.into(),
            state: Mutex::new(PoolState { members, cursor: 0 }),
        }
    }

    /// Build a pool of `instances` workers on consecutive ports of `host`.
    pub fn with_port_range(prefix: impl Into<String>, host: &str, start_port: u16, instances: u16) -> Self {
        let members = (0..instances)
            .filter_map(|i| start_port.checked_add(i))
            .map(|port| Worker::new(host, port))
            .collect();
        Self::new(prefix, members)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Select the next worker, or `None` when the pool is exhausted.
    pub fn next(&self) -> Option<Worker> {
        let mut state = self.lock();
        if state.members.is_empty() {
            return None;
        }

        let worker = state.members[state.cursor].clone();
        state.cursor = (state.cursor + 1) % state.members.len();
        Some(worker)
    }

    /// Remove `worker` if present. Returns true if a member was removed.
    pub fn remove(&self, worker: &Worker) -> bool {
        let mut state = self.lock();
        let Some(index) = state.members.iter().position(|w| w == worker) else {
            return false;
        };

        state.members.remove(index);
        if state.cursor >= state.members.len() {
            state.cursor = 0;
        }
        true
    }

    /// Current membership in rotation order.
    pub fn snapshot(&self) -> Vec<Worker> {
        self.lock().members.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave the state inconsistent:
    // every mutation restores the cursor invariant before returning.
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(test)]
    fn cursor(&self) -> usize {
        self.lock().cursor
    }

    #[cfg(test)]
    fn cursor_and_len(&self) -> (usize, usize) {
        let state = self.lock();
        (state.cursor, state.members.len())
    }
}
