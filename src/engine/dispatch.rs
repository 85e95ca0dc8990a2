use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Notify;
use tracing::warn;

use super::change::run_cycle;
use super::change::ChangeCycle;

/// How dispatch cycles run relative to the triggering write.
///
/// `Deferred` is the production mode: cycles are spawned onto the Tokio
/// runtime (one must be current) and the write returns without waiting.
/// `Inline` runs the whole cycle on the calling thread before the write
/// returns, which makes tests deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    #[default]
    Deferred,
    Inline,
}

/// Hands change cycles off for execution and tracks how many deferred cycles
/// are still in flight so embedders can wait for convergence.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    mode: DispatchMode,
    /// Deferred cycles allowed in flight before new ones fall back to
    /// running inline as backpressure (0 = unlimited).
    max_in_flight: usize,
    in_flight: Arc<InFlight>,
}

struct InFlight {
    count: AtomicUsize,
    notify: Notify,
}

impl Dispatcher {
    pub fn new(mode: DispatchMode, max_in_flight: usize) -> Self {
        Self {
            mode,
            max_in_flight,
            in_flight: Arc::new(InFlight {
                count: AtomicUsize::new(0),
                notify: Notify::new(),
            }),
        }
    }

    pub fn dispatch(&self, cycle: ChangeCycle) {
        match self.mode {
            DispatchMode::Inline => run_cycle(cycle),
            DispatchMode::Deferred => {
                let current = self.in_flight.count.load(Ordering::SeqCst);
                if self.max_in_flight > 0 && current >= self.max_in_flight {
                    warn!(
                        "denormalization backlog at {current} deferred cycles, running inline"
                    );
                    run_cycle(cycle);
                    return;
                }

                let guard = InFlightGuard::enter(self.in_flight.clone());
                tokio::spawn(async move {
                    run_cycle(cycle);
                    drop(guard);
                });
            }
        }
    }

    /// Resolves once no deferred cycle is in flight. Cycles triggered by
    /// another cycle's commit are counted before their parent finishes, so
    /// this waits for whole propagation chains.
    pub async fn quiesce(&self) {
        loop {
            let notified = self.in_flight.notify.notified();
            if self.in_flight.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    #[cfg(test)]
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }
}

struct InFlightGuard {
    in_flight: Arc<InFlight>,
}

impl InFlightGuard {
    fn enter(in_flight: Arc<InFlight>) -> Self {
        in_flight.count.fetch_add(1, Ordering::SeqCst);
        Self { in_flight }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.in_flight.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.in_flight.notify.notify_waiters();
        }
    }
}
