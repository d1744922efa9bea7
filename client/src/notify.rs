//! UI notifications for reservation lifecycle events.
//!
//! Each notification carries a severity and an auto-dismiss deadline (5
//! seconds after creation). The watcher emits one for every lifecycle
//! transition it observes and for every failed request.

use crate::api::ClientError;
use chrono::{DateTime, Duration, Utc};

/// How long a notification stays on screen before auto-dismissing.
pub const AUTO_DISMISS_SECS: i64 = 5;

/// What happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    /// A hold was placed.
    Created,
    /// A hold was converted to a sale.
    Confirmed,
    /// A hold was cancelled by the user.
    Cancelled,
    /// A hold's countdown reached zero.
    Expired,
    /// A request failed.
    Error,
}

/// Visual weight of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Positive outcome (created, confirmed).
    Success,
    /// Neutral outcome (cancelled, expired).
    Info,
    /// Failure.
    Error,
}

impl NotificationKind {
    /// The severity this kind renders with.
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::Created | Self::Confirmed => Severity::Success,
            Self::Cancelled | Self::Expired => Severity::Info,
            Self::Error => Severity::Error,
        }
    }
}

/// A transient message for the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// What happened
    pub kind: NotificationKind,
    /// Visual weight
    pub severity: Severity,
    /// Message to display
    pub message: String,
    /// When the notification should disappear without user action
    pub dismiss_at: DateTime<Utc>,
}

impl Notification {
    /// Creates a notification dismissing [`AUTO_DISMISS_SECS`] after `now`.
    #[must_use]
    pub fn new(kind: NotificationKind, message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: message.into(),
            dismiss_at: now + Duration::seconds(AUTO_DISMISS_SECS),
        }
    }

    /// Builds an error notification from a failed request.
    #[must_use]
    pub fn from_error(error: &ClientError, now: DateTime<Utc>) -> Self {
        let message = match error {
            ClientError::Api { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        };
        Self::new(NotificationKind::Error, message, now)
    }

    /// Whether the auto-dismiss deadline has passed.
    #[must_use]
    pub fn is_dismissed(&self, now: DateTime<Utc>) -> bool {
        now >= self.dismiss_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_follows_kind() {
        assert_eq!(NotificationKind::Created.severity(), Severity::Success);
        assert_eq!(NotificationKind::Confirmed.severity(), Severity::Success);
        assert_eq!(NotificationKind::Cancelled.severity(), Severity::Info);
        assert_eq!(NotificationKind::Expired.severity(), Severity::Info);
        assert_eq!(NotificationKind::Error.severity(), Severity::Error);
    }

    #[test]
    fn auto_dismisses_after_five_seconds() {
        let now = Utc::now();
        let n = Notification::new(NotificationKind::Created, "Reserva creada", now);
        assert!(!n.is_dismissed(now));
        assert!(!n.is_dismissed(now + Duration::seconds(4)));
        assert!(n.is_dismissed(now + Duration::seconds(5)));
    }

    #[test]
    fn error_notification_prefers_the_server_message() {
        let now = Utc::now();
        let error = ClientError::Api {
            status: 409,
            code: "INSUFFICIENT_STOCK".to_string(),
            message: "Stock insuficiente".to_string(),
        };
        let n = Notification::from_error(&error, now);
        assert_eq!(n.kind, NotificationKind::Error);
        assert_eq!(n.message, "Stock insuficiente");
    }
}
