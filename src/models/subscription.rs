use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: i64,
    pub status: SubscriptionStatus,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub payment_reference: String,
}

impl Subscription {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.expires_at > now
    }

    /// Applies a paid period on top of `current`.
    ///
    /// A still-active subscription is extended from its current expiry, anything
    /// else (none, expired, cancelled) starts a fresh period at `now`.
    pub fn create_or_extend(
        current: Option<&Subscription>,
        user_id: i64,
        reference: &str,
        days: u32,
        now: DateTime<Utc>,
    ) -> Subscription {
        let period = Duration::days(i64::from(days));
        match current {
            Some(existing) if existing.is_active_at(now) => Subscription {
                user_id,
                status: SubscriptionStatus::Active,
                started_at: existing.started_at,
                expires_at: existing.expires_at + period,
                payment_reference: reference.to_string(),
            },
            _ => Subscription {
                user_id,
                status: SubscriptionStatus::Active,
                started_at: now,
                expires_at: now + period,
                payment_reference: reference.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_subscription_runs_from_now() {
        let now = Utc::now();
        let sub = Subscription::create_or_extend(None, 7, "sub-7-1", 30, now);
        assert_eq!(sub.expires_at, now + Duration::days(30));
        assert!(sub.is_active_at(now));
    }

    #[test]
    fn active_subscription_is_extended_from_expiry() {
        let now = Utc::now();
        let first = Subscription::create_or_extend(None, 7, "sub-7-1", 30, now);
        let second = Subscription::create_or_extend(Some(&first), 7, "sub-7-2", 30, now);
        assert_eq!(second.expires_at, now + Duration::days(60));
        assert_eq!(second.started_at, first.started_at);
        assert_eq!(second.payment_reference, "sub-7-2");
    }

    #[test]
    fn cancelled_subscription_restarts() {
        let now = Utc::now();
        let mut first = Subscription::create_or_extend(None, 7, "sub-7-1", 30, now);
        first.status = SubscriptionStatus::Cancelled;
        let second = Subscription::create_or_extend(Some(&first), 7, "sub-7-2", 30, now);
        assert_eq!(second.expires_at, now + Duration::days(30));
    }
}
