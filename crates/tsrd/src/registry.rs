//! TTL-bounded registry of machine session inventories.
//!
//! The registry holds the latest pushed inventory per machine behind a
//! reader/writer lock: `update` and `evict` take the write lock,
//! `snapshot` the read lock, and no lock is ever held across an await
//! point. Machines whose last push is older than the TTL disappear
//! from snapshots immediately and are physically removed by the
//! background eviction task, so eviction never changes visible
//! behavior, only memory footprint.
//!
//! Per-key lifecycle: absent -> live -> (stale) -> absent. Stale is
//! only an internal state between eviction sweeps; readers never see
//! it.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tsr_core::{Machine, PushRequest};

/// Concurrent key-value store of machines, keyed by machine name.
pub struct Registry {
    machines: RwLock<HashMap<String, Machine>>,
    ttl: TimeDelta,
}

impl Registry {
    /// Creates a registry that considers machines stale after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            machines: RwLock::new(HashMap::new()),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, HashMap<String, Machine>> {
        self.machines.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, HashMap<String, Machine>> {
        self.machines.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, machine: &Machine, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(machine.last_seen) <= self.ttl
    }

    /// Upserts the machine described by a push request.
    ///
    /// The stored record is replaced wholesale; the previous session
    /// list is discarded and `last_seen` is stamped here, never taken
    /// from the caller.
    pub fn update(&self, req: PushRequest) {
        let machine = Machine {
            name: req.machine_name,
            ssh_host: req.ssh_host,
            ssh_user: req.ssh_user,
            sessions: req.sessions,
            last_seen: Utc::now(),
        };

        debug!(
            machine = %machine.name,
            sessions = machine.sessions.len(),
            "machine inventory updated"
        );

        let mut machines = self.write_lock();
        machines.insert(machine.name.clone(), machine);
    }

    /// Returns every machine still within the TTL, as of now.
    pub fn snapshot(&self) -> Vec<Machine> {
        self.snapshot_at(Utc::now())
    }

    /// Returns every machine with `now - last_seen <= ttl`.
    ///
    /// Entries are owned clones: every nested session, window, and
    /// pane list is a fresh allocation, so callers can never mutate
    /// internal state through the result. Order is map order and
    /// carries no meaning.
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> Vec<Machine> {
        let machines = self.read_lock();
        machines
            .values()
            .filter(|machine| self.is_fresh(machine, now))
            .cloned()
            .collect()
    }

    /// Physically removes stale machines, as of now.
    pub fn evict(&self) -> usize {
        self.evict_at(Utc::now())
    }

    /// Removes every machine with `now - last_seen > ttl`.
    ///
    /// Returns the number of machines removed. Snapshots already
    /// filter by the same predicate, so this only reclaims memory.
    pub fn evict_at(&self, now: DateTime<Utc>) -> usize {
        let mut machines = self.write_lock();
        let before = machines.len();
        machines.retain(|_, machine| self.is_fresh(machine, now));
        before - machines.len()
    }

    /// Number of machines physically resident, including stale ones.
    pub fn len(&self) -> usize {
        self.read_lock().len()
    }

    /// True when no machine is physically resident.
    pub fn is_empty(&self) -> bool {
        self.read_lock().is_empty()
    }
}

/// Spawns the background eviction task.
///
/// The task sweeps the registry every `period` (ttl/2 is the usual
/// choice, bounding residency of a stale entry to ~1.5x ttl) and exits
/// promptly when the token is cancelled.
pub fn spawn_eviction_task(
    registry: std::sync::Arc<Registry>,
    period: Duration,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        // interval() panics on a zero period.
        let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    debug!("eviction task stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = registry.evict();
                    if removed > 0 {
                        info!(removed, remaining = registry.len(), "evicted stale machines");
                    }
                }
            }
        }
    })
}
