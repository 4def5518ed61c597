//! Toast notifications
//!
//! [`NotificationCenter`] is the process-wide toast list. Toasts are appended
//! in call order and removed by a per-toast timer, or by hand. Front ends
//! render by subscribing to [`ToastEvent`]s.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error};
use uuid::Uuid;

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(5000);

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

impl ToastKind {
    pub fn default_title(&self) -> &'static str {
        match self {
            ToastKind::Success => "Success",
            ToastKind::Error => "Error",
            ToastKind::Warning => "Warning",
            ToastKind::Info => "Info",
        }
    }
}

impl fmt::Display for ToastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToastKind::Success => "success",
            ToastKind::Error => "error",
            ToastKind::Warning => "warning",
            ToastKind::Info => "info",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: Uuid,
    pub message: String,
    pub kind: ToastKind,
    /// Time until automatic removal; zero persists until dismissed
    pub duration: Duration,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ToastOptions {
    pub title: Option<String>,
    /// `None` uses the center's default duration
    pub duration: Option<Duration>,
}

impl ToastOptions {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToastEvent {
    Shown(Toast),
    Dismissed(Uuid),
}

struct Inner {
    toasts: Mutex<Vec<Toast>>,
    timers: Mutex<HashMap<Uuid, JoinHandle<()>>>,
    events: broadcast::Sender<ToastEvent>,
    default_duration: Duration,
}

impl Inner {
    fn remove(&self, id: Uuid) -> bool {
        let removed = {
            let mut toasts = self.toasts.lock();
            let before = toasts.len();
            toasts.retain(|t| t.id != id);
            toasts.len() != before
        };
        if removed {
            let _ = self.events.send(ToastEvent::Dismissed(id));
        }
        removed
    }

    fn abort_timers(&self) {
        for (_, handle) in self.timers.lock().drain() {
            handle.abort();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.abort_timers();
    }
}

/// Shared toast list. Clones refer to the same list.
#[derive(Clone)]
pub struct NotificationCenter {
    inner: Arc<Inner>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_DURATION)
    }
}

impl NotificationCenter {
    pub fn new(default_duration: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                toasts: Mutex::new(Vec::new()),
                timers: Mutex::new(HashMap::new()),
                events,
                default_duration,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ToastEvent> {
        self.inner.events.subscribe()
    }

    /// Append a toast and schedule its removal. Returns its id.
    pub fn show_toast(&self, message: impl Into<String>, kind: ToastKind, options: ToastOptions) -> Uuid {
        let toast = Toast {
            id: Uuid::new_v4(),
            message: message.into(),
            kind,
            duration: options.duration.unwrap_or(self.inner.default_duration),
            title: options.title,
        };
        let id = toast.id;

        match kind {
            ToastKind::Error => error!(toast_id = %id, title = ?toast.title, "{}", toast.message),
            _ => debug!(toast_id = %id, kind = %kind, "{}", toast.message),
        }

        self.inner.toasts.lock().push(toast.clone());
        let _ = self.inner.events.send(ToastEvent::Shown(toast.clone()));

        if !toast.duration.is_zero() {
            self.schedule_removal(id, toast.duration);
        }
        id
    }

    fn schedule_removal(&self, id: Uuid, after: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(toast_id = %id, "No runtime, toast persists until dismissed");
            return;
        };
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        // Held across spawn so the timer cannot finish before it is registered
        let mut timers = self.inner.timers.lock();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(inner) = weak.upgrade() {
                inner.timers.lock().remove(&id);
                inner.remove(id);
            }
        });
        timers.insert(id, handle);
    }

    /// Remove a toast now. Unknown ids are ignored.
    pub fn remove_toast(&self, id: Uuid) -> bool {
        if let Some(handle) = self.inner.timers.lock().remove(&id) {
            handle.abort();
        }
        self.inner.remove(id)
    }

    pub fn show_success(&self, message: impl Into<String>) -> Uuid {
        self.show_toast(message, ToastKind::Success, ToastOptions::titled("Success"))
    }

    pub fn show_error(&self, message: impl Into<String>) -> Uuid {
        self.show_toast(message, ToastKind::Error, ToastOptions::titled("Error"))
    }

    pub fn show_warning(&self, message: impl Into<String>) -> Uuid {
        self.show_toast(message, ToastKind::Warning, ToastOptions::titled("Warning"))
    }

    pub fn show_info(&self, message: impl Into<String>) -> Uuid {
        self.show_toast(message, ToastKind::Info, ToastOptions::titled("Info"))
    }

    /// Snapshot of the current toasts, in append order
    pub fn toasts(&self) -> Vec<Toast> {
        self.inner.toasts.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.toasts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Abort pending removal timers. Toasts already shown stay listed.
    pub fn shutdown(&self) {
        self.inner.abort_timers();
    }
}

impl fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("toasts", &self.len())
            .field("pending_timers", &self.inner.timers.lock().len())
            .field("default_duration", &self.inner.default_duration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_without_runtime_persists() {
        let center = NotificationCenter::default();
        let id = center.show_info("hello");
        assert_eq!(center.len(), 1);
        assert_eq!(center.toasts()[0].title.as_deref(), Some("Info"));
        assert!(center.remove_toast(id));
        assert!(!center.remove_toast(id));
        assert!(center.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_persists() {
        let center = NotificationCenter::default();
        center.show_toast("sticky", ToastKind::Warning, ToastOptions::default().with_duration(Duration::ZERO));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(center.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_follow_lifecycle() {
        let center = NotificationCenter::default();
        let mut events = center.subscribe();

        let id = center.show_success("Done");
        assert!(matches!(events.recv().await.unwrap(), ToastEvent::Shown(t) if t.id == id));

        center.remove_toast(id);
        assert_eq!(events.recv().await.unwrap(), ToastEvent::Dismissed(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_timers() {
        let center = NotificationCenter::new(Duration::from_millis(100));
        center.show_info("a");
        center.shutdown();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(center.len(), 1);
    }
}
