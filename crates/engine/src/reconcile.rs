//! Expiry reconciliation
//!
//! Detects users that have crossed into an expired state and stages the
//! corrective writes: expire the user, suspend the owning tenant, and force
//! every sibling in a suspended tenant into the same terminal state.
//! Suspension is all-or-nothing per tenant; a single offending user taints
//! the whole group.
//!
//! The reconciler only corrects the in-memory aggregates and *stages* a
//! plan. Applying the plan against the store is a separate, explicit step
//! owned by the caller or the scheduled worker.

use serde::Serialize;
use uuid::Uuid;

use tenantry_shared::{TenantStatus, UserStatus};

use crate::aggregate::{TenantAggregate, UserSummary};
use crate::status::{PaymentStatus, SubscriptionState};

/// Batched corrective writes staged by one reconciliation pass
///
/// At most two store commands come out of this: a bulk user expiry and a
/// bulk tenant suspension (with its user cascade). Both are idempotent
/// terminal-status writes.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcilePlan {
    /// Users whose lifecycle status must become `TRIAL_EXPIRED`
    pub expire_user_ids: Vec<Uuid>,
    /// Real tenants to suspend (synthetic individual groups never appear)
    pub suspend_tenant_ids: Vec<Uuid>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.expire_user_ids.is_empty() && self.suspend_tenant_ids.is_empty()
    }
}

/// Whether this user drags the whole tenant into suspension
fn is_offending(user: &UserSummary) -> bool {
    user.subscription_status == SubscriptionState::Expired
        || user.status == UserStatus::TrialExpired
        || user.payment_status == PaymentStatus::Failed
}

/// Reconcile expiry state across all tenant groups
///
/// Groups with at least one offending user are marked `SUSPENDED` and
/// every member is forced to expired/failed. The plan records only users
/// whose lifecycle status actually changes; a suspended tenant never
/// regresses to `ACTIVE` within the pass.
pub fn reconcile(tenants: &mut [TenantAggregate]) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    for tenant in tenants.iter_mut() {
        if !tenant.users.iter().any(is_offending) {
            continue;
        }

        tenant.status = TenantStatus::Suspended;
        if let Some(tenant_id) = tenant.tenant_id {
            plan.suspend_tenant_ids.push(tenant_id);
        }

        for user in &mut tenant.users {
            if user.status != UserStatus::TrialExpired {
                plan.expire_user_ids.push(user.id);
                user.status = UserStatus::TrialExpired;
            }
            user.subscription_status = SubscriptionState::Expired;
            user.payment_status = PaymentStatus::Failed;
            if let Some(detail) = user.subscription.as_mut() {
                detail.payment_status = Some(PaymentStatus::Failed);
            }
        }
    }

    plan
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn summary(status: UserStatus, sub: SubscriptionState, pay: PaymentStatus) -> UserSummary {
        UserSummary {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            name: "User".to_string(),
            role: "USER".to_string(),
            status,
            subscription_status: sub,
            payment_status: pay,
            subscription: None,
            trial_start_date: None,
            trial_end_date: None,
            extra_trial_days: 0,
            created_at: datetime!(2025-01-01 00:00 UTC),
        }
    }

    fn group(tenant_id: Option<Uuid>, users: Vec<UserSummary>) -> TenantAggregate {
        TenantAggregate {
            key: tenant_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "individual-test".to_string()),
            tenant_id,
            name: "Tenant".to_string(),
            slug: "tenant".to_string(),
            status: TenantStatus::Active,
            plan: "Demo".to_string(),
            user_count: 0,
            active_users: 0,
            pending_users: 0,
            suspended_users: 0,
            demo_users: 0,
            expired_trial_users: 0,
            subscribed_users: 0,
            first_created: datetime!(2025-01-01 00:00 UTC),
            last_activity: datetime!(2025-01-01 00:00 UTC),
            users,
        }
    }

    fn healthy() -> UserSummary {
        summary(
            UserStatus::Active,
            SubscriptionState::Subscribed,
            PaymentStatus::Success,
        )
    }

    #[test]
    fn test_healthy_group_untouched() {
        let mut tenants = vec![group(Some(Uuid::new_v4()), vec![healthy(), healthy()])];
        let plan = reconcile(&mut tenants);

        assert!(plan.is_empty());
        assert_eq!(tenants[0].status, TenantStatus::Active);
        assert_eq!(tenants[0].users[0].status, UserStatus::Active);
    }

    #[test]
    fn test_one_offender_taints_whole_tenant() {
        let tid = Uuid::new_v4();
        let offender = summary(
            UserStatus::Active,
            SubscriptionState::Expired,
            PaymentStatus::Failed,
        );
        let mut tenants = vec![group(Some(tid), vec![offender, healthy()])];
        let plan = reconcile(&mut tenants);

        assert_eq!(tenants[0].status, TenantStatus::Suspended);
        assert_eq!(plan.suspend_tenant_ids, vec![tid]);
        // Both users changed lifecycle status, both are in the plan
        assert_eq!(plan.expire_user_ids.len(), 2);
        for user in &tenants[0].users {
            assert_eq!(user.status, UserStatus::TrialExpired);
            assert_eq!(user.subscription_status, SubscriptionState::Expired);
            assert_eq!(user.payment_status, PaymentStatus::Failed);
        }
    }

    #[test]
    fn test_failed_payment_alone_is_offending() {
        let offender = summary(
            UserStatus::Active,
            SubscriptionState::Subscribed,
            PaymentStatus::Failed,
        );
        let mut tenants = vec![group(Some(Uuid::new_v4()), vec![offender])];
        let plan = reconcile(&mut tenants);

        assert_eq!(tenants[0].status, TenantStatus::Suspended);
        assert_eq!(plan.expire_user_ids.len(), 1);
    }

    #[test]
    fn test_already_expired_users_not_replanned() {
        let tid = Uuid::new_v4();
        let already = summary(
            UserStatus::TrialExpired,
            SubscriptionState::Expired,
            PaymentStatus::Failed,
        );
        let mut tenants = vec![group(Some(tid), vec![already])];
        let plan = reconcile(&mut tenants);

        // Tenant suspension is still staged, but no user write is needed
        assert!(plan.expire_user_ids.is_empty());
        assert_eq!(plan.suspend_tenant_ids, vec![tid]);
        assert_eq!(tenants[0].status, TenantStatus::Suspended);
    }

    #[test]
    fn test_individual_groups_never_stage_tenant_writes() {
        let offender = summary(
            UserStatus::Active,
            SubscriptionState::Expired,
            PaymentStatus::Failed,
        );
        let mut tenants = vec![group(None, vec![offender])];
        let plan = reconcile(&mut tenants);

        assert_eq!(tenants[0].status, TenantStatus::Suspended);
        assert!(plan.suspend_tenant_ids.is_empty());
        assert_eq!(plan.expire_user_ids.len(), 1);
    }

    #[test]
    fn test_suspension_never_regresses_within_pass() {
        let tid = Uuid::new_v4();
        let offender = summary(
            UserStatus::Active,
            SubscriptionState::Expired,
            PaymentStatus::Failed,
        );
        let mut tenants = vec![group(Some(tid), vec![offender, healthy(), healthy()])];
        reconcile(&mut tenants);
        assert_eq!(tenants[0].status, TenantStatus::Suspended);

        // A second reconcile over the corrected state keeps the suspension
        let plan = reconcile(&mut tenants);
        assert_eq!(tenants[0].status, TenantStatus::Suspended);
        assert!(plan.expire_user_ids.is_empty());
    }
}
