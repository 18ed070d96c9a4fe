//! Deadline enforcement for single operations, batches and step sequences.
//!
//! A timeout abandons waiting: the timed-out future is dropped, and anything
//! it already started outside the task (a child process, say) may keep
//! running.

use crate::core::{CerberError, CerberResult};

use futures::future::{join_all, BoxFuture};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Runs `future`, failing with [`CerberError::Timeout`] if it does not
/// finish within `timeout`.
///
/// The timer is dropped together with the race on either path.
pub async fn with_timeout<F, T>(future: F, timeout: Duration, operation: &str) -> CerberResult<T>
where
    F: Future<Output = CerberResult<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                operation = %operation,
                timeout_ms = timeout.as_millis() as u64,
                "Operation timed out"
            );
            Err(CerberError::timeout(operation, timeout))
        }
    }
}

/// An operation paired with its own deadline.
pub struct TimedOperation<'a, T> {
    name: String,
    timeout: Duration,
    future: BoxFuture<'a, CerberResult<T>>,
}

impl<'a, T> TimedOperation<'a, T> {
    /// Creates a timed operation.
    pub fn new<F>(name: impl Into<String>, timeout: Duration, future: F) -> Self
    where
        F: Future<Output = CerberResult<T>> + Send + 'a,
    {
        Self {
            name: name.into(),
            timeout,
            future: Box::pin(future),
        }
    }

    /// Returns the operation name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Runs every operation concurrently, each under its own deadline.
///
/// One operation failing or timing out never affects the others; results
/// are returned in input order.
pub async fn with_timeouts<T>(operations: Vec<TimedOperation<'_, T>>) -> Vec<CerberResult<T>> {
    join_all(operations.into_iter().map(|op| async move {
        let TimedOperation {
            name,
            timeout,
            future,
        } = op;
        with_timeout(future, timeout, &name).await
    }))
    .await
}

/// A lazily started step of a sequential operation.
pub struct Step<'a, T> {
    name: String,
    timeout: Duration,
    run: Box<dyn FnOnce() -> BoxFuture<'a, CerberResult<T>> + Send + 'a>,
}

impl<'a, T> Step<'a, T> {
    /// Creates a step; `run` is only called when the step starts.
    pub fn new<F, Fut>(name: impl Into<String>, timeout: Duration, run: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = CerberResult<T>> + Send + 'a,
    {
        Self {
            name: name.into(),
            timeout,
            run: Box::new(move || -> BoxFuture<'a, CerberResult<T>> { Box::pin(run()) }),
        }
    }
}

/// Runs `steps` in order under a shared global budget.
///
/// Each step gets `min(step timeout, remaining budget)`. The whole operation
/// fails with [`CerberError::GlobalTimeout`] when the budget is gone before a
/// step starts, or when a step cut short by the budget expires. The first
/// step error aborts the sequence.
pub async fn with_global_and_step_timeouts<T>(
    steps: Vec<Step<'_, T>>,
    global_timeout: Duration,
    operation: &str,
) -> CerberResult<Vec<T>> {
    let deadline = Instant::now() + global_timeout;
    let global_error = || CerberError::GlobalTimeout {
        operation: operation.to_string(),
        budget: global_timeout,
    };

    let mut results = Vec::with_capacity(steps.len());
    for step in steps {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            tracing::warn!(operation = %operation, step = %step.name, "Global timeout exhausted");
            return Err(global_error());
        }

        let effective = step.timeout.min(remaining);
        let cut_short = effective < step.timeout;

        match tokio::time::timeout(effective, (step.run)()).await {
            Ok(Ok(value)) => results.push(value),
            Ok(Err(error)) => return Err(error),
            Err(_) if cut_short => {
                tracing::warn!(operation = %operation, step = %step.name, "Global timeout exhausted");
                return Err(global_error());
            }
            Err(_) => {
                tracing::warn!(
                    operation = %operation,
                    step = %step.name,
                    timeout_ms = effective.as_millis() as u64,
                    "Step timed out"
                );
                return Err(CerberError::timeout(
                    format!("{operation}/{}", step.name),
                    effective,
                ));
            }
        }
    }

    Ok(results)
}

type Handles = HashMap<String, (u64, JoinHandle<()>)>;

/// Named one-shot timers.
///
/// Setting a timer under an id that is already armed cancels the old one
/// first, so only the latest callback for an id can fire. Cancelled timers
/// never fire. Dropping the manager cancels everything.
#[derive(Debug, Default)]
pub struct TimeoutManager {
    handles: Arc<Mutex<Handles>>,
    generation: Mutex<u64>,
}

impl TimeoutManager {
    /// Creates a manager with no timers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a timer that calls `callback` after `delay`, replacing any timer
    /// under `id`. Must be called from within a tokio runtime.
    pub fn set<F>(&self, id: impl Into<String>, delay: Duration, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let id = id.into();
        let generation = {
            let mut counter = self
                .generation
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *counter += 1;
            *counter
        };

        let mut handles = lock(&self.handles);
        if let Some((_, previous)) = handles.remove(&id) {
            previous.abort();
        }

        let registry = Arc::clone(&self.handles);
        let key = id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut handles = lock(&registry);
                match handles.get(&key) {
                    Some((current, _)) if *current == generation => {
                        handles.remove(&key);
                    }
                    _ => return,
                }
            }
            callback();
        });

        handles.insert(id, (generation, handle));
    }

    /// Cancels the timer under `id`. Returns `true` if one was armed.
    pub fn clear(&self, id: &str) -> bool {
        match lock(&self.handles).remove(id) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancels every timer.
    pub fn clear_all(&self) {
        for (_, (_, handle)) in lock(&self.handles).drain() {
            handle.abort();
        }
    }

    /// Returns the number of armed timers.
    pub fn active_count(&self) -> usize {
        lock(&self.handles).len()
    }
}

impl Drop for TimeoutManager {
    fn drop(&mut self) {
        self.clear_all();
    }
}

fn lock(handles: &Mutex<Handles>) -> MutexGuard<'_, Handles> {
    handles
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    async fn finishes_after(delay: Duration, value: u32) -> CerberResult<u32> {
        tokio::time::sleep(delay).await;
        Ok(value)
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_success_and_expiry() {
        let ok = with_timeout(finishes_after(ms(10), 1), ms(100), "fast").await;
        assert_eq!(ok.unwrap(), 1);

        let err = with_timeout(finishes_after(ms(500), 2), ms(100), "slow")
            .await
            .unwrap_err();
        match err {
            CerberError::Timeout { operation, timeout } => {
                assert_eq!(operation, "slow");
                assert_eq!(timeout, ms(100));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeouts_isolates_entries() {
        let results = with_timeouts(vec![
            TimedOperation::new("a", ms(100), finishes_after(ms(10), 1)),
            TimedOperation::new("b", ms(100), finishes_after(ms(500), 2)),
            TimedOperation::new("c", ms(100), async {
                Err::<u32, _>(CerberError::validation("bad"))
            }),
            TimedOperation::new("d", ms(100), finishes_after(ms(50), 4)),
        ])
        .await;

        assert_eq!(results.len(), 4);
        assert_eq!(*results[0].as_ref().unwrap(), 1);
        assert!(matches!(results[1], Err(CerberError::Timeout { .. })));
        assert!(matches!(results[2], Err(CerberError::Validation { .. })));
        assert_eq!(*results[3].as_ref().unwrap(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_global_and_step_timeouts_runs_in_order() {
        let results = with_global_and_step_timeouts(
            vec![
                Step::new("lint", ms(100), || finishes_after(ms(10), 1)),
                Step::new("scan", ms(100), || finishes_after(ms(10), 2)),
            ],
            ms(1_000),
            "pipeline",
        )
        .await
        .unwrap();
        assert_eq!(results, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_timeout_reports_step() {
        let err = with_global_and_step_timeouts(
            vec![Step::new("scan", ms(50), || finishes_after(ms(500), 1))],
            ms(1_000),
            "pipeline",
        )
        .await
        .unwrap_err();

        match err {
            CerberError::Timeout { operation, .. } => assert_eq!(operation, "pipeline/scan"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_global_budget_caps_steps() {
        let started = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&started);

        let err = with_global_and_step_timeouts(
            vec![
                Step::new("first", ms(200), || finishes_after(ms(80), 1)),
                Step::new("second", ms(200), || finishes_after(ms(80), 2)),
                Step::new("third", ms(200), move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    finishes_after(ms(10), 3)
                }),
            ],
            ms(100),
            "pipeline",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CerberError::GlobalTimeout { .. }));
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manager_replace_fires_only_latest() {
        let manager = TimeoutManager::new();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        let f = Arc::clone(&first);
        manager.set("x", ms(100), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let s = Arc::clone(&second);
        manager.set("x", ms(200), move || {
            s.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(manager.active_count(), 1);

        tokio::time::sleep(ms(300)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(manager.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manager_clear_prevents_firing() {
        let manager = TimeoutManager::new();
        let fired = Arc::new(AtomicU32::new(0));

        for id in ["a", "b"] {
            let fired = Arc::clone(&fired);
            manager.set(id, ms(100), move || {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(manager.active_count(), 2);

        assert!(manager.clear("a"));
        assert!(!manager.clear("a"));
        manager.clear_all();
        assert_eq!(manager.active_count(), 0);

        tokio::time::sleep(ms(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
