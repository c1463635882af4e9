//! OS-level alert dispatch.
//!
//! Alerts are best-effort: failures are logged but never propagate. The
//! dispatcher keeps one click registry keyed by alert handle rather than
//! registering a listener per alert, so long-running daemons do not
//! accumulate callbacks. Entries resolve (and vacate) on click and the
//! registry itself is bounded.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::{info, warn};

#[cfg(not(target_os = "macos"))]
use tracing::debug;

use taskpulse_core::{EngineConfig, Notification};

/// Opaque identifier of a shown alert, echoed back on click.
pub type AlertHandle = String;

/// Most recent alerts whose click targets are retained.
const CLICK_REGISTRY_CAP: usize = 64;

/// One-way sink that renders an alert to the user.
///
/// The daemon wires this to the platform notifier; tests substitute a
/// recording sink.
pub trait AlertSink: Send + Sync {
    fn show(&self, handle: &AlertHandle, notification: &Notification, sound_enabled: bool);
}

/// Routes newly observed notifications to the sink and resolves clicks
/// back to task deep links.
pub struct AlertDispatcher {
    sink: Box<dyn AlertSink>,
    clicks: Mutex<ClickRegistry>,
}

#[derive(Default)]
struct ClickRegistry {
    targets: HashMap<AlertHandle, String>,
    order: VecDeque<AlertHandle>,
}

impl ClickRegistry {
    fn insert(&mut self, handle: AlertHandle, target: String) {
        if self.order.len() >= CLICK_REGISTRY_CAP {
            if let Some(evicted) = self.order.pop_front() {
                self.targets.remove(&evicted);
            }
        }
        self.order.push_back(handle.clone());
        self.targets.insert(handle, target);
    }

    fn take(&mut self, handle: &str) -> Option<String> {
        let target = self.targets.remove(handle)?;
        self.order.retain(|h| h != handle);
        Some(target)
    }
}

impl AlertDispatcher {
    pub fn new(sink: Box<dyn AlertSink>) -> Self {
        Self {
            sink,
            clicks: Mutex::new(ClickRegistry::default()),
        }
    }

    /// Show one alert for a newly observed notification.
    ///
    /// When the notification carries a task id, its deep link is retained
    /// for click resolution.
    pub fn dispatch(&self, config: &EngineConfig, notification: &Notification) -> AlertHandle {
        let handle: AlertHandle = uuid::Uuid::new_v4().to_string();

        if let Some(task_id) = notification.task_id {
            let target = config.task_url(task_id);
            let mut clicks = self.clicks.lock().expect("click registry poisoned");
            clicks.insert(handle.clone(), target);
        }

        info!(
            event = "daemon.alerts.dispatched",
            handle = %handle,
            id = %notification.id,
        );
        self.sink.show(&handle, notification, config.sound_enabled);
        handle
    }

    /// Resolve a click to its deep link.
    ///
    /// Stale or unknown handles resolve to `None`; the entry is consumed
    /// so a second click on the same alert does nothing.
    pub fn resolve_click(&self, handle: &str) -> Option<String> {
        let mut clicks = self.clicks.lock().expect("click registry poisoned");
        let target = clicks.take(handle);
        match &target {
            Some(url) => info!(event = "daemon.alerts.click_resolved", handle = handle, url = %url),
            None => info!(event = "daemon.alerts.click_unknown", handle = handle),
        }
        target
    }

    /// Number of retained click targets (bounded by the registry cap).
    pub fn pending_clicks(&self) -> usize {
        self.clicks.lock().expect("click registry poisoned").order.len()
    }
}

/// Platform-native notifier.
///
/// - macOS: `osascript` (Notification Center)
/// - Linux: `notify-send` (requires libnotify)
/// - Other: no-op
pub struct PlatformAlertSink;

impl AlertSink for PlatformAlertSink {
    fn show(&self, _handle: &AlertHandle, notification: &Notification, sound_enabled: bool) {
        send_platform_notification(&notification.title, &notification.content, sound_enabled);
    }
}

#[cfg(target_os = "macos")]
fn send_platform_notification(title: &str, message: &str, sound_enabled: bool) {
    let script = if sound_enabled {
        format!(
            r#"display notification "{}" with title "{}" sound name "default""#,
            applescript_escape(message),
            applescript_escape(title)
        )
    } else {
        format!(
            r#"display notification "{}" with title "{}""#,
            applescript_escape(message),
            applescript_escape(title)
        )
    };

    match std::process::Command::new("osascript")
        .arg("-e")
        .arg(&script)
        .output()
    {
        Ok(output) if output.status.success() => {
            info!(event = "daemon.alerts.send_completed", title = title);
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                event = "daemon.alerts.send_failed",
                title = title,
                stderr = %stderr,
            );
        }
        Err(e) => {
            warn!(
                event = "daemon.alerts.send_failed",
                title = title,
                error = %e,
            );
        }
    }
}

#[cfg(target_os = "macos")]
fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(target_os = "linux")]
fn send_platform_notification(title: &str, message: &str, _sound_enabled: bool) {
    match which::which("notify-send") {
        Ok(_) => {}
        Err(which::Error::CannotFindBinaryPath) => {
            debug!(
                event = "daemon.alerts.send_skipped",
                reason = "notify-send not found",
            );
            return;
        }
        Err(e) => {
            warn!(
                event = "daemon.alerts.send_failed",
                title = title,
                error = %e,
            );
            return;
        }
    }

    match std::process::Command::new("notify-send")
        .arg(title)
        .arg(message)
        .output()
    {
        Ok(output) if output.status.success() => {
            info!(event = "daemon.alerts.send_completed", title = title);
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                event = "daemon.alerts.send_failed",
                title = title,
                stderr = %stderr,
            );
        }
        Err(e) => {
            warn!(
                event = "daemon.alerts.send_failed",
                title = title,
                error = %e,
            );
        }
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn send_platform_notification(_title: &str, _message: &str, _sound_enabled: bool) {
    debug!(
        event = "daemon.alerts.send_skipped",
        reason = "unsupported platform",
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use taskpulse_core::NotificationId;

    struct CountingSink {
        shown: Arc<AtomicUsize>,
    }

    impl AlertSink for CountingSink {
        fn show(&self, _handle: &AlertHandle, _notification: &Notification, _sound: bool) {
            self.shown.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_dispatcher() -> (Arc<AtomicUsize>, AlertDispatcher) {
        let shown = Arc::new(AtomicUsize::new(0));
        let dispatcher = AlertDispatcher::new(Box::new(CountingSink {
            shown: shown.clone(),
        }));
        (shown, dispatcher)
    }

    fn config() -> EngineConfig {
        EngineConfig {
            server_url: "http://localhost:5000".to_string(),
            um_code: "UM001".to_string(),
            ..EngineConfig::default()
        }
    }

    fn notification(id: i64, task_id: Option<i64>) -> Notification {
        Notification {
            id: NotificationId::Number(id),
            title: "t".to_string(),
            content: "c".to_string(),
            task_id,
            timestamp: "2026-03-01T09:00:00Z".to_string(),
            received_at: "2026-03-01T09:00:01Z".to_string(),
            read: false,
        }
    }

    #[test]
    fn test_dispatch_shows_alert_and_registers_click_target() {
        let (shown, dispatcher) = test_dispatcher();
        let handle = dispatcher.dispatch(&config(), &notification(1, Some(12)));

        assert_eq!(shown.load(Ordering::SeqCst), 1);
        assert_eq!(
            dispatcher.resolve_click(&handle),
            Some("http://localhost:5000/#/tasks/12".to_string())
        );
    }

    #[test]
    fn test_click_is_consumed_once() {
        let (_shown, dispatcher) = test_dispatcher();
        let handle = dispatcher.dispatch(&config(), &notification(1, Some(12)));

        assert!(dispatcher.resolve_click(&handle).is_some());
        assert!(dispatcher.resolve_click(&handle).is_none());
    }

    #[test]
    fn test_notification_without_task_has_no_click_target() {
        let (shown, dispatcher) = test_dispatcher();
        let handle = dispatcher.dispatch(&config(), &notification(1, None));

        assert_eq!(shown.load(Ordering::SeqCst), 1);
        assert!(dispatcher.resolve_click(&handle).is_none());
        assert_eq!(dispatcher.pending_clicks(), 0);
    }

    #[test]
    fn test_unknown_handle_resolves_to_none() {
        let (_shown, dispatcher) = test_dispatcher();
        assert!(dispatcher.resolve_click("no-such-handle").is_none());
    }

    #[test]
    fn test_registry_stays_bounded_across_many_alerts() {
        let (_shown, dispatcher) = test_dispatcher();
        for i in 0..(CLICK_REGISTRY_CAP as i64 + 40) {
            dispatcher.dispatch(&config(), &notification(i, Some(i)));
        }
        assert_eq!(dispatcher.pending_clicks(), CLICK_REGISTRY_CAP);
    }
}
