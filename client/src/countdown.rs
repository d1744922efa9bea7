//! Countdown formatting for a held reservation.
//!
//! The deadline is server-issued; the countdown is advisory UI state derived
//! from `expires_at - now`. Never use it to decide whether a confirm will
//! succeed — only the server's answer settles that.

use chrono::{DateTime, Utc};
use reserva_core::HoldExpiry;

/// Terminal label shown once the deadline has passed.
pub const EXPIRED_LABEL: &str = "Expirado";

/// Whole seconds remaining until `expiry`, zero once past.
#[must_use]
pub fn remaining_seconds(expiry: HoldExpiry, now: DateTime<Utc>) -> i64 {
    expiry
        .remaining(now)
        .map_or(0, |d| d.num_seconds().max(0))
}

/// Formats the remaining time as `M:SS`, or [`EXPIRED_LABEL`] once past.
///
/// Minutes are not zero-padded and carry past 59 (a 2-hour hold starts at
/// `120:00`).
#[must_use]
pub fn format_remaining(expiry: HoldExpiry, now: DateTime<Utc>) -> String {
    match expiry.remaining(now) {
        None => EXPIRED_LABEL.to_string(),
        Some(left) => {
            let total = left.num_seconds().max(0);
            format!("{}:{:02}", total / 60, total % 60)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn expiry_in(seconds: i64) -> (HoldExpiry, DateTime<Utc>) {
        let now = Utc::now();
        (HoldExpiry::new(now + Duration::seconds(seconds)), now)
    }

    #[test]
    fn formats_minutes_and_padded_seconds() {
        let (expiry, now) = expiry_in(90);
        assert_eq!(format_remaining(expiry, now), "1:30");

        let (expiry, now) = expiry_in(1800);
        assert_eq!(format_remaining(expiry, now), "30:00");

        let (expiry, now) = expiry_in(9);
        assert_eq!(format_remaining(expiry, now), "0:09");
    }

    #[test]
    fn long_holds_keep_counting_minutes() {
        let (expiry, now) = expiry_in(2 * 3600);
        assert_eq!(format_remaining(expiry, now), "120:00");
    }

    #[test]
    fn past_deadline_is_the_terminal_label() {
        let now = Utc::now();
        let expiry = HoldExpiry::new(now);
        assert_eq!(format_remaining(expiry, now), EXPIRED_LABEL);
        assert_eq!(
            format_remaining(expiry, now + Duration::seconds(30)),
            EXPIRED_LABEL
        );
        assert_eq!(remaining_seconds(expiry, now), 0);
    }

    #[test]
    fn counts_down_second_by_second() {
        let (expiry, now) = expiry_in(3);
        assert_eq!(remaining_seconds(expiry, now), 3);
        assert_eq!(remaining_seconds(expiry, now + Duration::seconds(1)), 2);
        assert_eq!(remaining_seconds(expiry, now + Duration::seconds(3)), 0);
        assert_eq!(format_remaining(expiry, now + Duration::seconds(2)), "0:01");
    }
}
