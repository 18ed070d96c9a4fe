//! Named collection of circuit breakers with idle eviction.

use crate::circuit_breaker::breaker::{BreakerStats, CircuitBreaker};
use crate::circuit_breaker::config::CircuitBreakerConfig;
use crate::core::{SharedClock, SystemClock};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Default idle time after which a closed breaker is evicted.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug)]
struct RegistryEntry {
    breaker: Arc<CircuitBreaker>,
    last_access: Instant,
}

/// Keyed breakers, one per adapter name.
///
/// The registry holds lookup authority only: breakers are handed out as
/// `Arc`s, so evicting an entry never invalidates a reference held by a
/// caller. Lookups are serialized by one lock, so concurrent
/// [`get_or_create`](Self::get_or_create) calls for the same name always
/// observe the same breaker.
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    defaults: CircuitBreakerConfig,
    clock: SharedClock,
    entries: Mutex<HashMap<String, RegistryEntry>>,
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerRegistry {
    /// Creates an empty registry using the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock::shared())
    }

    /// Creates an empty registry with an explicit clock, which is also handed
    /// to every breaker it creates.
    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            defaults: CircuitBreakerConfig::default(),
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the configuration used when `get_or_create` receives none.
    pub fn with_defaults(mut self, config: CircuitBreakerConfig) -> Self {
        self.defaults = config;
        self
    }

    /// Returns the breaker for `name`, creating it on first use.
    ///
    /// `config` only applies when the breaker is created; an existing breaker
    /// keeps its configuration. Every call refreshes the access time.
    pub fn get_or_create(
        &self,
        name: &str,
        config: Option<CircuitBreakerConfig>,
    ) -> Arc<CircuitBreaker> {
        let now = self.clock.now();
        let mut entries = self.lock();

        if let Some(entry) = entries.get_mut(name) {
            entry.last_access = now;
            return Arc::clone(&entry.breaker);
        }

        let config = config.unwrap_or_else(|| self.defaults.clone());
        let breaker = Arc::new(CircuitBreaker::with_clock(
            name,
            config,
            Arc::clone(&self.clock),
        ));
        tracing::debug!(breaker = %name, "Created circuit breaker");

        entries.insert(
            name.to_string(),
            RegistryEntry {
                breaker: Arc::clone(&breaker),
                last_access: now,
            },
        );
        breaker
    }

    /// Returns the breaker for `name` without creating or touching it.
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.lock().get(name).map(|e| Arc::clone(&e.breaker))
    }

    /// Removes the breaker for `name`, returning it if present.
    pub fn remove(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.lock().remove(name).map(|e| e.breaker)
    }

    /// Returns the number of registered breakers.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no breakers are registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Evicts breakers that are closed and have been idle for at least `ttl`.
    ///
    /// Open and half-open breakers are always retained. Returns the number of
    /// breakers removed.
    pub fn cleanup(&self, ttl: Duration) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();

        entries.retain(|name, entry| {
            let idle = now.saturating_duration_since(entry.last_access);
            let evict = idle >= ttl && entry.breaker.state().is_closed();
            if evict {
                tracing::debug!(
                    breaker = %name,
                    idle_ms = idle.as_millis() as u64,
                    "Evicting idle circuit breaker"
                );
            }
            !evict
        });

        before - entries.len()
    }

    /// Returns stats for every breaker, sorted by name.
    ///
    /// Counts as an access for every breaker.
    pub fn all_stats(&self) -> Vec<BreakerStats> {
        let now = self.clock.now();
        let mut entries = self.lock();
        let mut stats: Vec<BreakerStats> = entries
            .values_mut()
            .map(|entry| {
                entry.last_access = now;
                entry.breaker.stats()
            })
            .collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    /// Resets every registered breaker.
    pub fn reset_all(&self) {
        for entry in self.lock().values() {
            entry.breaker.reset();
        }
    }

    /// Starts a background task that runs [`cleanup`](Self::cleanup) every
    /// `interval`.
    ///
    /// The task holds a weak reference and exits once the registry is
    /// dropped. Must be called from within a tokio runtime.
    pub fn start_cleanup(self: &Arc<Self>, interval: Duration, ttl: Duration) -> CleanupTask {
        let registry: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let removed = registry.cleanup(ttl);
                if removed > 0 {
                    tracing::info!(removed, "Evicted idle circuit breakers");
                }
            }
        });

        CleanupTask {
            handle: Some(handle),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RegistryEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Handle to a periodic registry cleanup task. Dropping it stops the task.
#[derive(Debug)]
pub struct CleanupTask {
    handle: Option<JoinHandle<()>>,
}

impl CleanupTask {
    /// Stops the cleanup task.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Returns `true` while the task is scheduled.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for CleanupTask {
    fn drop(&mut self) {
        self.stop();
    }
}
