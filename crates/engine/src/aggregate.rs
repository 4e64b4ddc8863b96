//! Tenant aggregation
//!
//! Folds the flat user snapshot into one aggregate per resolved tenant:
//! group users by tenant identity, apply expiry reconciliation, then
//! compute the count rollups in a second pass. The count pass deliberately
//! runs after reconciliation so corrected statuses are what gets counted.

use std::collections::HashMap;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use tenantry_shared::{TenantStatus, UserRecord, UserStatus};

use crate::profile::{coerce_string, ProfileShape};
use crate::reconcile::{reconcile, ReconcilePlan};
use crate::status::{
    derive_payment_status, derive_subscription_state, is_placeholder_name, resolve_tenant_name,
    resolve_tenant_slug, PaymentStatus, SubscriptionState, DEFAULT_PLAN_LABEL,
};
use crate::subscription::{build_subscription_detail, SubscriptionDetail};

// =============================================================================
// Output Types
// =============================================================================

/// Per-user projection carried inside a tenant aggregate
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    /// Lifecycle status, reflecting in-memory corrections
    pub status: UserStatus,
    pub subscription_status: SubscriptionState,
    pub payment_status: PaymentStatus,
    pub subscription: Option<SubscriptionDetail>,
    pub trial_start_date: Option<OffsetDateTime>,
    pub trial_end_date: Option<OffsetDateTime>,
    pub extra_trial_days: u32,
    pub created_at: OffsetDateTime,
}

/// One tenant's aggregated view
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantAggregate {
    /// Grouping key: tenant UUID, profile organization id, or `individual-<userId>`
    pub key: String,
    /// Set only for real (store-backed) tenants
    pub tenant_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub status: TenantStatus,
    pub plan: String,
    pub user_count: u32,
    pub active_users: u32,
    pub pending_users: u32,
    pub suspended_users: u32,
    pub demo_users: u32,
    pub expired_trial_users: u32,
    pub subscribed_users: u32,
    pub first_created: OffsetDateTime,
    pub last_activity: OffsetDateTime,
    pub users: Vec<UserSummary>,
}

/// Result of one pure aggregation pass
#[derive(Debug, Clone)]
pub struct AggregationPass {
    /// Aggregates, sorted by descending user count (ties keep input order)
    pub tenants: Vec<TenantAggregate>,
    /// Corrective writes staged by the reconciler
    pub plan: ReconcilePlan,
}

// =============================================================================
// Aggregation
// =============================================================================

/// Run one full aggregation pass over a user snapshot
///
/// Pure and deterministic for a fixed `now`: derivation, grouping,
/// reconciliation, and counting all happen in memory. The staged plan is
/// the only thing that touches the store, and applying it is the caller's
/// decision.
pub fn run_aggregation(rows: &[UserRecord], now: OffsetDateTime) -> AggregationPass {
    let mut tenants: Vec<TenantAggregate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for user in rows {
        let shape = ProfileShape::parse(user.profile.as_deref());

        let mut detail = build_subscription_detail(user, &shape);
        let subscription_status = derive_subscription_state(user, detail.as_ref(), now);
        let payment_status = derive_payment_status(&shape, subscription_status);
        if let Some(d) = detail.as_mut() {
            d.payment_status = Some(payment_status);
        }

        let name = resolve_tenant_name(&shape);
        let slug = resolve_tenant_slug(&shape, &name);
        let (key, tenant_id) = resolve_tenant_identity(user, &shape);
        let plan_label = detail
            .as_ref()
            .and_then(|d| d.display_name.clone())
            .unwrap_or_else(|| DEFAULT_PLAN_LABEL.to_string());

        let summary = UserSummary {
            id: user.id,
            email: user.email.clone(),
            name: user.display_name(),
            role: user.role.clone(),
            status: user.approval_status(),
            subscription_status,
            payment_status,
            subscription: detail,
            trial_start_date: user.trial_start_date,
            trial_end_date: user.trial_end_date,
            extra_trial_days: user.extra_trial_days(),
            created_at: user.created_at,
        };

        match index.get(&key) {
            Some(&i) => merge_into(&mut tenants[i], user, summary, &name, &slug, &plan_label),
            None => {
                index.insert(key.clone(), tenants.len());
                tenants.push(seed_aggregate(
                    key, tenant_id, user, summary, name, slug, plan_label,
                ));
            }
        }
    }

    let plan = reconcile(&mut tenants);

    for tenant in &mut tenants {
        recompute_counts(tenant);
    }

    // Stable sort: ties retain insertion order
    tenants.sort_by(|a, b| b.user_count.cmp(&a.user_count));

    AggregationPass { tenants, plan }
}

/// Resolve the grouping identity for one user
///
/// Explicit tenant id first, then a profile-declared organization id, then
/// a synthetic per-user key so unattached users never merge with each other.
fn resolve_tenant_identity(user: &UserRecord, shape: &ProfileShape) -> (String, Option<Uuid>) {
    if let Some(tenant_id) = user.tenant_id {
        return (tenant_id.to_string(), Some(tenant_id));
    }

    let declared = shape
        .organization()
        .and_then(|org| org.get("id").or_else(|| org.get("organizationId")).and_then(coerce_string))
        .or_else(|| shape.str_field("organizationId"))
        .or_else(|| shape.str_field("tenantId"));
    if let Some(org_id) = declared {
        return (org_id, None);
    }

    (format!("individual-{}", user.id), None)
}

fn seed_aggregate(
    key: String,
    tenant_id: Option<Uuid>,
    user: &UserRecord,
    summary: UserSummary,
    name: String,
    slug: String,
    plan_label: String,
) -> TenantAggregate {
    TenantAggregate {
        key,
        tenant_id,
        name,
        slug,
        status: TenantStatus::Active,
        plan: plan_label,
        user_count: 0,
        active_users: 0,
        pending_users: 0,
        suspended_users: 0,
        demo_users: 0,
        expired_trial_users: 0,
        subscribed_users: 0,
        first_created: user.created_at,
        last_activity: user.updated_at,
        users: vec![summary],
    }
}

/// Fold one more user into an existing aggregate
///
/// A still-placeholder name/slug may be upgraded to a real one, never the
/// reverse; the plan label is only replaced while it is the default.
fn merge_into(
    tenant: &mut TenantAggregate,
    user: &UserRecord,
    summary: UserSummary,
    name: &str,
    slug: &str,
    plan_label: &str,
) {
    if is_placeholder_name(&tenant.name) && !is_placeholder_name(name) {
        tenant.name = name.to_string();
        tenant.slug = slug.to_string();
    }

    if (tenant.plan.is_empty() || tenant.plan == DEFAULT_PLAN_LABEL)
        && plan_label != DEFAULT_PLAN_LABEL
    {
        tenant.plan = plan_label.to_string();
    }

    tenant.first_created = tenant.first_created.min(user.created_at);
    tenant.last_activity = tenant.last_activity.max(user.updated_at);
    tenant.users.push(summary);
}

/// Second-pass count rollup over an aggregate's user list
///
/// Runs after reconciliation on purpose; `expired_trial_users` is a
/// cross-cutting bucket, so the lifecycle counts do not sum to the total.
fn recompute_counts(tenant: &mut TenantAggregate) {
    tenant.user_count = tenant.users.len() as u32;
    tenant.active_users = count(tenant, |u| u.status == UserStatus::Active);
    tenant.pending_users = count(tenant, |u| u.status.is_pending());
    tenant.suspended_users = count(tenant, |u| u.status == UserStatus::Suspended);
    tenant.demo_users = count(tenant, |u| u.subscription_status == SubscriptionState::Demo);
    tenant.subscribed_users = count(tenant, |u| {
        u.subscription_status == SubscriptionState::Subscribed
    });
    tenant.expired_trial_users = count(tenant, |u| {
        u.payment_status == PaymentStatus::Failed
            || u.subscription_status == SubscriptionState::Expired
            || u.status == UserStatus::TrialExpired
    });
}

fn count(tenant: &TenantAggregate, pred: impl Fn(&UserSummary) -> bool) -> u32 {
    tenant.users.iter().filter(|u| pred(u)).count() as u32
}

// =============================================================================
// Tests
// =============================================================================
