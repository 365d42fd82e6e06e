//! # Subscription
//!
//! Trial and plan gating, evaluated against an explicit `now`.
//!
//! ```text
//!   new_trial ──► Trial ──(trial_ends_at passed, sweep)──► Expired
//!                   │
//!                   └──(payment)──► Active ──(ends_at passed)──► no access
//!                                      │
//!                                      └──► Canceled
//! ```
//!
//! Storage of subscriptions belongs to the hosted backend; this module only
//! evaluates a record it is given.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::TRIAL_DAYS;

/// Plan granted by both trial and paid subscriptions.
pub const PREMIUM_PLAN: &str = "premium";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Expired,
    Canceled,
}

/// A subscription record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Subscription {
    pub id: String,
    pub owner_id: String,
    pub status: SubscriptionStatus,
    #[ts(as = "Option<String>")]
    pub trial_ends_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub subscription_ends_at: Option<DateTime<Utc>>,
    pub plan_type: String,
}

/// Evaluated view of a subscription at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SubscriptionInfo {
    pub status: SubscriptionStatus,
    pub plan_type: String,
    /// Only for trials with an end date. Never negative.
    pub days_left_in_trial: Option<i64>,
    pub is_expired: bool,
    pub can_access: bool,
}

impl Subscription {
    /// Starts a 14-day premium trial.
    pub fn new_trial(owner_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Subscription {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            status: SubscriptionStatus::Trial,
            trial_ends_at: Some(now + Duration::days(TRIAL_DAYS)),
            subscription_ends_at: None,
            plan_type: PREMIUM_PLAN.to_string(),
        }
    }

    /// Starts a one-month paid subscription.
    pub fn new_premium(owner_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Subscription {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            status: SubscriptionStatus::Active,
            trial_ends_at: None,
            subscription_ends_at: now.checked_add_months(Months::new(1)),
            plan_type: PREMIUM_PLAN.to_string(),
        }
    }

    /// Whole days left in the trial, rounded up and clamped at zero.
    pub fn days_left_in_trial(&self, now: DateTime<Utc>) -> Option<i64> {
        if self.status != SubscriptionStatus::Trial {
            return None;
        }
        let ends = self.trial_ends_at?;
        let remaining_ms = (ends - now).num_milliseconds();
        let day_ms = Duration::days(1).num_milliseconds();
        let days = if remaining_ms > 0 {
            (remaining_ms + day_ms - 1) / day_ms
        } else {
            0
        };
        Some(days)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            SubscriptionStatus::Trial => self.trial_ends_at.map_or(false, |end| now > end),
            SubscriptionStatus::Active => self.subscription_ends_at.map_or(false, |end| now > end),
            SubscriptionStatus::Expired => true,
            SubscriptionStatus::Canceled => false,
        }
    }

    /// Trials and active plans grant access until their end date, inclusive.
    pub fn can_access(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            SubscriptionStatus::Trial => self.trial_ends_at.map_or(true, |end| now <= end),
            SubscriptionStatus::Active => self.subscription_ends_at.map_or(true, |end| now <= end),
            SubscriptionStatus::Expired | SubscriptionStatus::Canceled => false,
        }
    }

    pub fn info(&self, now: DateTime<Utc>) -> SubscriptionInfo {
        SubscriptionInfo {
            status: self.status,
            plan_type: self.plan_type.clone(),
            days_left_in_trial: self.days_left_in_trial(now),
            is_expired: self.is_expired(now),
            can_access: self.can_access(now),
        }
    }

    /// Moves a lapsed trial to `Expired`. Returns true when the status changed.
    ///
    /// Called by the periodic expiry sweep.
    pub fn expire_if_lapsed(&mut self, now: DateTime<Utc>) -> bool {
        let lapsed = self.status == SubscriptionStatus::Trial
            && self.trial_ends_at.map_or(false, |end| end < now);
        if lapsed {
            self.status = SubscriptionStatus::Expired;
        }
        lapsed
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
