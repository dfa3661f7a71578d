//! Per-client token-bucket rate limiting with idle eviction.
//!
//! [`ClientRateLimiter`] keeps one `governor` bucket per client address. A
//! single mutex guards the map; the buckets themselves are lock free. A
//! background sweeper started with [`ClientRateLimiter::start`] periodically
//! drops clients that have been idle longer than the configured threshold.
//! Time is read from an injectable [`governor::clock::Clock`], so tests can
//! drive refill and eviction with `FakeRelativeClock`.

mod config;

pub use config::RateLimitSettings;

use std::collections::HashMap;
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use governor::clock::{Clock, DefaultClock, Reference};
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

type Bucket<C> = RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// Tunables for [`ClientRateLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub requests_per_second: NonZeroU32,
    pub burst: NonZeroU32,
    pub sweep_interval: Duration,
    pub idle_timeout: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            requests_per_second: NonZeroU32::MIN.saturating_add(1),
            burst: NonZeroU32::MIN.saturating_add(3),
            sweep_interval: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(3 * 60),
        }
    }
}

/// Result of charging one request to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    /// No token left; the next one is available after `retry_after`.
    Limited { retry_after: Duration },
}

struct ClientEntry<C: Clock> {
    bucket: Bucket<C>,
    last_seen: C::Instant,
}

struct Sweeper {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

struct Shared<C: Clock> {
    clients: Mutex<HashMap<IpAddr, ClientEntry<C>>>,
    quota: Quota,
    clock: C,
    policy: RateLimitPolicy,
}

impl<C: Clock> Shared<C> {
    fn clients(&self) -> MutexGuard<'_, HashMap<IpAddr, ClientEntry<C>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sweep(&self) -> usize {
        let now = self.clock.now();
        let idle_timeout = self.policy.idle_timeout;
        let mut clients = self.clients();
        let before = clients.len();
        clients.retain(|_, entry| Duration::from(now.duration_since(entry.last_seen)) <= idle_timeout);
        before - clients.len()
    }
}

/// Token-bucket limiter keyed by client IP.
pub struct ClientRateLimiter<C: Clock = DefaultClock> {
    shared: Arc<Shared<C>>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl ClientRateLimiter<DefaultClock> {
    /// Limiter using the monotonic system clock.
    #[must_use]
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_clock(policy, DefaultClock::default())
    }
}

impl<C> ClientRateLimiter<C>
where
    C: Clock + Clone + Send + Sync + 'static,
    C::Instant: Send + Sync,
{
    /// Limiter reading time from `clock`.
    pub fn with_clock(policy: RateLimitPolicy, clock: C) -> Self {
        let quota = Quota::per_second(policy.requests_per_second).allow_burst(policy.burst);
        Self {
            shared: Arc::new(Shared {
                clients: Mutex::new(HashMap::new()),
                quota,
                clock,
                policy,
            }),
            sweeper: Mutex::new(None),
        }
    }

    /// Charge one request to `ip`, creating its bucket on first sight.
    pub fn check(&self, ip: IpAddr) -> Decision {
        let shared = &self.shared;
        let now = shared.clock.now();
        let mut clients = shared.clients();
        let entry = clients.entry(ip).or_insert_with(|| ClientEntry {
            bucket: RateLimiter::direct_with_clock(shared.quota, shared.clock.clone()),
            last_seen: now,
        });
        entry.last_seen = now;
        match entry.bucket.check() {
            Ok(()) => Decision::Allowed,
            Err(not_until) => Decision::Limited {
                retry_after: not_until.wait_time_from(now),
            },
        }
    }

    /// Drop clients idle for longer than the idle timeout.
    ///
    /// Returns the number of evicted clients.
    pub fn sweep(&self) -> usize {
        self.shared.sweep()
    }

    /// Number of clients currently tracked.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.shared.clients().len()
    }

    /// Start the periodic sweeper. Returns `false` if it is already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut slot = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        let (shutdown, mut stopped) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let period = shared.policy.sweep_interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {
                        let evicted = shared.sweep();
                        if evicted > 0 {
                            debug!(evicted, "evicted idle rate limit clients");
                        }
                    }
                }
            }
        });
        *slot = Some(Sweeper { shutdown, task });
        info!(interval_secs = period.as_secs(), "rate limit sweeper started");
        true
    }

    /// Stop the sweeper and wait for it to exit. No-op when not running.
    pub async fn stop(&self) {
        let sweeper = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(Sweeper { shutdown, task }) = sweeper {
            // The receiver is gone only if the task already exited.
            let _ = shutdown.send(());
            if let Err(err) = task.await {
                debug!(error = %err, "rate limit sweeper ended abnormally");
            }
            info!("rate limit sweeper stopped");
        }
    }

    /// Whether the sweeper is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
