//! Validation expiry arithmetic

use chrono::{DateTime, Utc};

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryCheck {
    pub expired: bool,
    /// Whole days since validation, floored
    pub days_elapsed: i64,
}

/// The boundary day counts as expired: `days_elapsed >= window_days`
pub fn check_expiry(
    validated_at: DateTime<Utc>,
    window_days: u32,
    now: DateTime<Utc>,
) -> ExpiryCheck {
    let days_elapsed = (now - validated_at).num_seconds().div_euclid(SECONDS_PER_DAY);
    ExpiryCheck {
        expired: days_elapsed >= i64::from(window_days),
        days_elapsed,
    }
}

/// Tightest reminder threshold already reached
///
/// With thresholds `[30, 14, 7]` and 10 days left this returns `Some(14)`.
pub fn reminder_due(days_until_expiry: i64, thresholds: &[u32]) -> Option<u32> {
    thresholds
        .iter()
        .copied()
        .filter(|t| days_until_expiry <= i64::from(*t))
        .min()
}
