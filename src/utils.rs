//! Small helpers scripts commonly need.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Runs the most recent call once `delay` has passed with no newer call.
/// Calls made outside a tokio runtime are dropped.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Schedule `f`, cancelling any call still waiting. Returns false when
    /// there is no runtime to schedule on.
    pub fn call<F>(&self, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("[QoL] Debounced call dropped: no tokio runtime");
            return false;
        };
        let delay = self.delay;
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            f();
        });
        if let Some(previous) = self.pending.lock().replace(task) {
            previous.abort();
        }
        true
    }

    /// Drop the waiting call, if any.
    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Leading-edge throttle: the first call runs, calls within `limit` of it
/// are dropped.
#[derive(Clone)]
pub struct Throttle {
    limit: Duration,
    last: Arc<Mutex<Option<Instant>>>,
}

impl Throttle {
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// Run `f` unless throttled. Returns whether it ran.
    pub fn call<F: FnOnce()>(&self, f: F) -> bool {
        let now = Instant::now();
        {
            let mut last = self.last.lock();
            if matches!(*last, Some(t) if now.duration_since(t) < self.limit) {
                return false;
            }
            *last = Some(now);
        }
        f();
        true
    }
}

/// `qol_<unix millis>_<9 random hex chars>`.
pub fn generate_id() -> String {
    let suffix: String = uuid::Uuid::new_v4().simple().to_string().chars().take(9).collect();
    format!("qol_{}_{}", chrono::Utc::now().timestamp_millis(), suffix)
}

/// Host name of `url`, or an empty string when it does not parse.
pub fn domain_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn debouncer_runs_only_last_call() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let seen = seen.clone();
            debouncer.call(move || seen.lock().push(i));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(seen.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(*seen.lock(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn debouncer_cancel_drops_pending_call() {
        let debouncer = Debouncer::new(Duration::from_millis(50));
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        debouncer.call(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn debouncer_without_runtime_drops_call() {
        let debouncer = Debouncer::new(Duration::from_millis(10));
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        assert!(!debouncer.call(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_is_leading_edge() {
        let throttle = Throttle::new(Duration::from_millis(300));
        let hits = AtomicUsize::new(0);
        let bump = || {
            hits.fetch_add(1, Ordering::SeqCst);
        };

        assert!(throttle.call(bump));
        assert!(!throttle.call(bump));
        tokio::time::advance(Duration::from_millis(299)).await;
        assert!(!throttle.call(bump));
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(throttle.call(bump));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn generated_ids_have_expected_shape() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        let parts: Vec<&str> = a.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "qol");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
    }

    #[test]
    fn domain_of_handles_bad_input() {
        assert_eq!(domain_of("https://news.example.com/a?b=1"), "news.example.com");
        assert_eq!(domain_of("not a url"), "");
        assert_eq!(domain_of("mailto:someone@example.com"), "");
    }
}
