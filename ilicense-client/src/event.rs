//! License lifecycle notifications.
//!
//! The manager reports three events through a [`LicenseEventListener`]:
//! activation, expiry and "expiring soon". Delivery is fire-and-forget; a
//! listener that panics is logged and otherwise ignored.

use crate::record::LicenseRecord;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
#[cfg(feature = "channel")]
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};

/// Receives lifecycle notifications. Every method defaults to a no-op.
pub trait LicenseEventListener: Send + Sync {
    /// A code was validated, persisted and adopted.
    fn on_activated(&self, _license: &LicenseRecord) {}

    /// The current license is expired. Repeats on every periodic check.
    fn on_expired(&self, _license: &LicenseRecord) {}

    /// The current license is within the warning window. Repeats on every
    /// periodic check.
    fn on_expiring_soon(&self, _license: &LicenseRecord, _days_left: i64) {}
}

/// Listener that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl LicenseEventListener for NoopListener {}

/// Writes each event to the log, tiering "expiring soon" by urgency.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl LoggingListener {
    /// Urgency label for a number of remaining days.
    #[must_use]
    pub fn warning_level(days_left: i64) -> &'static str {
        match days_left {
            d if d <= 7 => "urgent",
            d if d <= 15 => "warning",
            _ => "notice",
        }
    }
}

impl LicenseEventListener for LoggingListener {
    fn on_activated(&self, license: &LicenseRecord) {
        info!(
            customer = %license.customer_name,
            product = %license.product_name,
            expire_at = %license.expire_at,
            "license activated successfully"
        );
    }

    fn on_expired(&self, license: &LicenseRecord) {
        error!(expire_at = %license.expire_at, "license expired");
    }

    fn on_expiring_soon(&self, license: &LicenseRecord, days_left: i64) {
        warn!(
            level = Self::warning_level(days_left),
            expire_at = %license.expire_at,
            days_left,
            "license expiring soon, please renew in time to avoid service interruption"
        );
    }
}

/// A lifecycle notification as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseEvent {
    Activated(Arc<LicenseRecord>),
    Expired(Arc<LicenseRecord>),
    ExpiringSoon {
        license: Arc<LicenseRecord>,
        days_left: i64,
    },
}

/// Forwards events into a channel drained by an external subscriber.
///
/// Sends never block. Once the receiver is dropped events are discarded.
#[cfg(feature = "channel")]
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: UnboundedSender<LicenseEvent>,
}

#[cfg(feature = "channel")]
impl ChannelListener {
    /// Creates a listener sending into `tx`.
    #[must_use]
    pub fn new(tx: UnboundedSender<LicenseEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: LicenseEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("license event receiver closed, dropping event");
        }
    }
}

#[cfg(feature = "channel")]
impl LicenseEventListener for ChannelListener {
    fn on_activated(&self, license: &LicenseRecord) {
        self.send(LicenseEvent::Activated(Arc::new(license.clone())));
    }

    fn on_expired(&self, license: &LicenseRecord) {
        self.send(LicenseEvent::Expired(Arc::new(license.clone())));
    }

    fn on_expiring_soon(&self, license: &LicenseRecord, days_left: i64) {
        self.send(LicenseEvent::ExpiringSoon {
            license: Arc::new(license.clone()),
            days_left,
        });
    }
}

/// Invokes `deliver` on `listener`, containing any panic.
pub(crate) fn dispatch<F>(listener: &dyn LicenseEventListener, event: &str, deliver: F)
where
    F: FnOnce(&dyn LicenseEventListener),
{
    if catch_unwind(AssertUnwindSafe(|| deliver(listener))).is_err() {
        warn!(event, "license event listener panicked; ignoring");
    }
}

impl fmt::Debug for dyn LicenseEventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LicenseEventListener")
    }
}
