//! Subscription detail resolution
//!
//! Produces one normalized subscription record per user, either straight
//! from an explicit profile subscription object (the source of truth when
//! present) or synthesized from the legacy `trial_start_date` /
//! `trial_end_date` columns that predate stored subscriptions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use tenantry_shared::UserRecord;

use crate::profile::{coerce_string, coerce_timestamp, ProfileShape};
use crate::status::PaymentStatus;

// =============================================================================
// Plan Catalog
// =============================================================================

/// Monthly legacy plan price (TRY)
pub const MONTHLY_PLAN_PRICE: f64 = 149.0;

/// Yearly legacy plan price (TRY)
pub const YEARLY_PLAN_PRICE: f64 = 1490.0;

/// Trial spans at or above this many days are classed as yearly plans
// TODO: confirm the 300-day yearly cutoff with product before changing it
pub const YEARLY_SPAN_THRESHOLD_DAYS: i64 = 300;

pub const LEGACY_MONTHLY_PLAN_ID: &str = "legacy-monthly";
pub const LEGACY_YEARLY_PLAN_ID: &str = "legacy-yearly";

/// Billing duration class of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanDuration {
    Monthly,
    Yearly,
}

impl PlanDuration {
    /// Customer-facing duration label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Monthly => "Aylık",
            Self::Yearly => "Yıllık",
        }
    }

    /// Legacy plan price for this duration class
    pub fn legacy_price(&self) -> f64 {
        match self {
            Self::Monthly => MONTHLY_PLAN_PRICE,
            Self::Yearly => YEARLY_PLAN_PRICE,
        }
    }

    /// Legacy plan identifier for this duration class
    pub fn legacy_plan_id(&self) -> &'static str {
        match self {
            Self::Monthly => LEGACY_MONTHLY_PLAN_ID,
            Self::Yearly => LEGACY_YEARLY_PLAN_ID,
        }
    }

    /// Parse a duration from a stored value ("annual" is a yearly alias)
    pub fn from_value(value: &Value) -> Option<Self> {
        match coerce_string(value)?.to_lowercase().as_str() {
            "monthly" => Some(Self::Monthly),
            "yearly" | "annual" => Some(Self::Yearly),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlanDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monthly => write!(f, "monthly"),
            Self::Yearly => write!(f, "yearly"),
        }
    }
}

// =============================================================================
// Subscription Detail
// =============================================================================

/// Normalized subscription facts for one user
///
/// Built once per user per aggregation pass and never persisted on its own.
/// `payment_status` is attached after status derivation runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDetail {
    pub plan_id: Option<String>,
    pub plan_name: Option<String>,
    pub display_name: Option<String>,
    pub price: Option<f64>,
    pub duration: Option<PlanDuration>,
    pub duration_label: Option<String>,
    pub activated_at: Option<OffsetDateTime>,
    pub trial_ends_at: Option<OffsetDateTime>,
    pub extra_trial_days: u32,
    pub payment_status: Option<PaymentStatus>,
}

impl SubscriptionDetail {
    /// Decode an explicit profile subscription record
    ///
    /// Tolerant by design: each field is pulled independently and bad
    /// values degrade to `None`. Key aliases cover the shapes that have
    /// shipped over time (camelCase current, snake_case transitional).
    fn from_profile_record(record: &Map<String, Value>, user: &UserRecord) -> Self {
        let duration = pick(record, &["duration", "interval", "billingInterval"])
            .and_then(PlanDuration::from_value);

        Self {
            plan_id: pick(record, &["planId", "plan_id", "id"]).and_then(coerce_string),
            plan_name: pick(record, &["planName", "plan_name", "plan"]).and_then(coerce_string),
            display_name: pick(record, &["displayName", "display_name", "name"])
                .and_then(coerce_string),
            price: pick(record, &["price", "amount"]).and_then(Value::as_f64),
            duration,
            duration_label: pick(record, &["durationLabel", "duration_label"])
                .and_then(coerce_string)
                .or_else(|| duration.map(|d| d.label().to_string())),
            activated_at: pick(record, &["activatedAt", "activationDate", "activated_at"])
                .and_then(coerce_timestamp),
            trial_ends_at: pick(record, &["trialEndsAt", "trialEndDate", "trial_ends_at"])
                .and_then(coerce_timestamp),
            extra_trial_days: pick(record, &["extraTrialDays", "extra_trial_days"])
                .and_then(Value::as_i64)
                .map(|v| v.max(0) as u32)
                .unwrap_or_else(|| user.extra_trial_days()),
            payment_status: None,
        }
    }

    /// Synthesize a legacy detail from the user's trial date columns
    fn from_legacy_trial(user: &UserRecord) -> Self {
        let duration = match trial_span_days(user.trial_start_date, user.trial_end_date) {
            Some(span) if span >= YEARLY_SPAN_THRESHOLD_DAYS => PlanDuration::Yearly,
            _ => PlanDuration::Monthly,
        };

        Self {
            plan_id: Some(duration.legacy_plan_id().to_string()),
            plan_name: Some(duration.to_string()),
            display_name: Some(match duration {
                PlanDuration::Monthly => "Aylık Plan".to_string(),
                PlanDuration::Yearly => "Yıllık Plan".to_string(),
            }),
            price: Some(duration.legacy_price()),
            duration: Some(duration),
            duration_label: Some(duration.label().to_string()),
            activated_at: user.trial_start_date,
            trial_ends_at: user.trial_end_date,
            extra_trial_days: user.extra_trial_days(),
            payment_status: None,
        }
    }
}

/// Build the subscription detail for a user, if any exists to report
///
/// An explicit profile subscription always wins. Without one, users that
/// never had a trial have nothing to report; everyone else gets a legacy
/// detail inferred from their trial window.
pub fn build_subscription_detail(
    user: &UserRecord,
    shape: &ProfileShape,
) -> Option<SubscriptionDetail> {
    if let Some(record) = shape.subscription() {
        return Some(SubscriptionDetail::from_profile_record(&record, user));
    }

    if user.trial_start_date.is_none() && user.trial_end_date.is_none() {
        return None;
    }

    Some(SubscriptionDetail::from_legacy_trial(user))
}

/// Whole days between trial start and end
///
/// `None` unless both bounds are present and the end is strictly after the
/// start; a backwards window must not promote anyone to a yearly plan.
fn trial_span_days(
    start: Option<OffsetDateTime>,
    end: Option<OffsetDateTime>,
) -> Option<i64> {
    match (start, end) {
        (Some(start), Some(end)) if end > start => Some((end - start).whole_days()),
        _ => None,
    }
}

/// First present value among aliased keys
fn pick<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| record.get(*k))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use uuid::Uuid;

    fn user_with_trial(
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
    ) -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            first_name: None,
            last_name: None,
            phone: None,
            status: "ACTIVE".to_string(),
            role: "USER".to_string(),
            trial_start_date: start,
            trial_end_date: end,
            extra_trial_days: 0,
            tenant_id: None,
            profile: None,
            created_at: datetime!(2025-01-01 00:00 UTC),
            updated_at: datetime!(2025-01-01 00:00 UTC),
        }
    }

    #[test]
    fn test_explicit_profile_subscription_wins() {
        let user = user_with_trial(
            Some(datetime!(2024-01-01 00:00 UTC)),
            Some(datetime!(2025-01-01 00:00 UTC)),
        );
        let shape = ProfileShape::parse(Some(
            r#"{"subscription":{"planId":"pro-2024","displayName":"Pro","price":499,"duration":"monthly"}}"#,
        ));

        let detail = build_subscription_detail(&user, &shape).unwrap();
        assert_eq!(detail.plan_id.as_deref(), Some("pro-2024"));
        assert_eq!(detail.display_name.as_deref(), Some("Pro"));
        assert_eq!(detail.price, Some(499.0));
        assert_eq!(detail.duration, Some(PlanDuration::Monthly));
        // Not the synthesized legacy plan, despite the year-long trial
        assert_ne!(detail.plan_id.as_deref(), Some(LEGACY_YEARLY_PLAN_ID));
    }

    #[test]
    fn test_no_trial_no_subscription() {
        let user = user_with_trial(None, None);
        let shape = ProfileShape::parse(None);
        assert!(build_subscription_detail(&user, &shape).is_none());
    }

    #[test]
    fn test_legacy_yearly_synthesis() {
        let user = user_with_trial(
            Some(datetime!(2024-01-01 00:00 UTC)),
            Some(datetime!(2024-12-15 00:00 UTC)), // 349 days
        );
        let detail = build_subscription_detail(&user, &ProfileShape::parse(None)).unwrap();

        assert_eq!(detail.duration, Some(PlanDuration::Yearly));
        assert_eq!(detail.price, Some(YEARLY_PLAN_PRICE));
        assert_eq!(detail.plan_id.as_deref(), Some(LEGACY_YEARLY_PLAN_ID));
        assert_eq!(detail.display_name.as_deref(), Some("Yıllık Plan"));
        assert_eq!(detail.duration_label.as_deref(), Some("Yıllık"));
        assert_eq!(detail.activated_at, user.trial_start_date);
        assert_eq!(detail.trial_ends_at, user.trial_end_date);
    }

    #[test]
    fn test_legacy_monthly_synthesis() {
        let user = user_with_trial(
            Some(datetime!(2025-01-01 00:00 UTC)),
            Some(datetime!(2025-01-31 00:00 UTC)),
        );
        let detail = build_subscription_detail(&user, &ProfileShape::parse(None)).unwrap();

        assert_eq!(detail.duration, Some(PlanDuration::Monthly));
        assert_eq!(detail.price, Some(MONTHLY_PLAN_PRICE));
        assert_eq!(detail.display_name.as_deref(), Some("Aylık Plan"));
    }

    #[test]
    fn test_threshold_boundary() {
        // Exactly 300 days is yearly
        let user = user_with_trial(
            Some(datetime!(2024-01-01 00:00 UTC)),
            Some(datetime!(2024-10-27 00:00 UTC)),
        );
        let detail = build_subscription_detail(&user, &ProfileShape::parse(None)).unwrap();
        assert_eq!(detail.duration, Some(PlanDuration::Yearly));

        // 299 days is monthly
        let user = user_with_trial(
            Some(datetime!(2024-01-01 00:00 UTC)),
            Some(datetime!(2024-10-26 00:00 UTC)),
        );
        let detail = build_subscription_detail(&user, &ProfileShape::parse(None)).unwrap();
        assert_eq!(detail.duration, Some(PlanDuration::Monthly));
    }

    #[test]
    fn test_backwards_window_never_promotes_to_yearly() {
        let user = user_with_trial(
            Some(datetime!(2025-01-01 00:00 UTC)),
            Some(datetime!(2023-01-01 00:00 UTC)), // end before start
        );
        let detail = build_subscription_detail(&user, &ProfileShape::parse(None)).unwrap();
        assert_eq!(detail.duration, Some(PlanDuration::Monthly));
    }

    #[test]
    fn test_end_only_window_is_monthly() {
        let user = user_with_trial(None, Some(datetime!(2025-02-01 00:00 UTC)));
        let detail = build_subscription_detail(&user, &ProfileShape::parse(None)).unwrap();
        assert_eq!(detail.duration, Some(PlanDuration::Monthly));
        assert_eq!(detail.activated_at, None);
    }

    #[test]
    fn test_extra_trial_days_carried_through() {
        let mut user = user_with_trial(
            Some(datetime!(2025-01-01 00:00 UTC)),
            Some(datetime!(2025-01-31 00:00 UTC)),
        );
        user.extra_trial_days = 14;
        let detail = build_subscription_detail(&user, &ProfileShape::parse(None)).unwrap();
        assert_eq!(detail.extra_trial_days, 14);

        // Negative stored values surface as zero
        user.extra_trial_days = -5;
        let detail = build_subscription_detail(&user, &ProfileShape::parse(None)).unwrap();
        assert_eq!(detail.extra_trial_days, 0);
    }

    #[test]
    fn test_profile_record_epoch_timestamps() {
        let user = user_with_trial(None, None);
        let shape = ProfileShape::parse(Some(
            r#"{"subscription":{"planId":"pro","activatedAt":1735689600,"trialEndsAt":"2025-02-01T00:00:00Z"}}"#,
        ));
        let detail = build_subscription_detail(&user, &shape).unwrap();
        assert_eq!(
            detail.activated_at,
            Some(datetime!(2025-01-01 00:00 UTC))
        );
        assert_eq!(
            detail.trial_ends_at,
            Some(datetime!(2025-02-01 00:00 UTC))
        );
    }
}
