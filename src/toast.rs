//! Transient, non-blocking status messages.
//!
//! Toasts stack in arrival order with no limit and no dedup. Each one shows
//! for its duration, then spends a short grace period in the `Dismissing`
//! phase (exit animation) before it is removed. Deadlines use the tokio clock;
//! inside a runtime a timer task removes expired toasts, otherwise they are
//! swept on the next read.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::FrameworkConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    /// Border color of the toast.
    pub fn accent(self) -> &'static str {
        match self {
            Self::Info => "#6366f1",
            Self::Success => "#10b981",
            Self::Warning => "#f59e0b",
            Self::Error => "#ef4444",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastPhase {
    Showing,
    Dismissing,
}

/// What a renderer paints for one toast.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToastView {
    pub id: u64,
    pub timestamp_ms: i64,
    pub message: String,
    pub severity: Severity,
    pub accent: &'static str,
    pub phase: ToastPhase,
}

struct ToastEntry {
    id: u64,
    timestamp_ms: i64,
    message: String,
    severity: Severity,
    dismiss_at: Instant,
    remove_at: Instant,
}

struct ToastStack {
    entries: Vec<ToastEntry>,
    /// Monotonically increasing ID for the next toast
    next_id: u64,
}

impl ToastStack {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    fn push(&mut self, message: String, severity: Severity, dismiss_at: Instant, remove_at: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(ToastEntry {
            id,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            message,
            severity,
            dismiss_at,
            remove_at,
        });
        id
    }

    fn sweep(&mut self, now: Instant) {
        self.entries.retain(|t| t.remove_at > now);
    }

    fn views(&self, now: Instant) -> Vec<ToastView> {
        self.entries
            .iter()
            .map(|t| ToastView {
                id: t.id,
                timestamp_ms: t.timestamp_ms,
                message: t.message.clone(),
                severity: t.severity,
                accent: t.severity.accent(),
                phase: if now >= t.dismiss_at {
                    ToastPhase::Dismissing
                } else {
                    ToastPhase::Showing
                },
            })
            .collect()
    }
}

/// Roughly 30 years; stands in for durations too large for the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn deadline(from: Instant, after: Duration) -> Instant {
    from.checked_add(after)
        .or_else(|| from.checked_add(FAR_FUTURE))
        .unwrap_or(from)
}

/// Handle to the shared toast stack. Clones notify into the same stack.
#[derive(Clone)]
pub struct Toaster {
    stack: Arc<Mutex<ToastStack>>,
    default_duration: Duration,
    grace: Duration,
}

impl Toaster {
    pub fn new(default_duration: Duration, grace: Duration) -> Self {
        Self {
            stack: Arc::new(Mutex::new(ToastStack::new())),
            default_duration,
            grace,
        }
    }

    pub fn from_config(config: &FrameworkConfig) -> Self {
        Self::new(
            Duration::from_millis(config.toast_duration_ms),
            Duration::from_millis(config.toast_grace_ms),
        )
    }

    /// Show `message` for the default duration.
    pub fn notify(&self, message: impl Into<String>, severity: Severity) {
        self.notify_for(message, severity, self.default_duration);
    }

    pub fn notify_for(&self, message: impl Into<String>, severity: Severity, duration: Duration) {
        let now = Instant::now();
        let dismiss_at = deadline(now, duration);
        let remove_at = deadline(dismiss_at, self.grace);
        let message = message.into();

        let mut stack = self.stack.lock();
        stack.sweep(now);
        stack.push(message, severity, dismiss_at, remove_at);
        drop(stack);

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let stack = Arc::downgrade(&self.stack);
            runtime.spawn(async move {
                tokio::time::sleep_until(remove_at).await;
                if let Some(stack) = stack.upgrade() {
                    stack.lock().sweep(Instant::now());
                }
            });
        }
    }

    /// Toasts currently on screen, oldest first.
    pub fn visible(&self) -> Vec<ToastView> {
        let now = Instant::now();
        let mut stack = self.stack.lock();
        stack.sweep(now);
        stack.views(now)
    }

    /// Entries still held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.stack.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
