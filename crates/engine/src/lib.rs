// Engine crate clippy configuration
// These are intentional patterns in this crate:
#![allow(clippy::too_many_arguments)] // Aggregate seeding threads several resolved fields at once
// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Tenantry Subscription Resolution Engine
//!
//! Derives a consistent per-user and per-tenant view of subscription,
//! payment, and trial-expiry state from the flat user table, and stages
//! the corrective writes that keep the store in line with that view.
//!
//! ## Features
//!
//! - **Profile Parsing**: Tolerant decoding of the opaque per-user profile blob
//! - **Subscription Details**: Explicit profile subscriptions or legacy trial-date synthesis
//! - **Status Derivation**: Pure subscription/payment/tenant-identity rules
//! - **Tenant Aggregation**: Per-tenant rollups with counts and activity bounds
//! - **Expiry Reconciliation**: All-or-nothing tenant suspension with batched write-back

pub mod aggregate;
pub mod error;
pub mod profile;
pub mod reconcile;
pub mod service;
pub mod status;
pub mod store;
pub mod subscription;

// Aggregation
pub use aggregate::{run_aggregation, AggregationPass, TenantAggregate, UserSummary};

// Error
pub use error::{EngineError, EngineResult};

// Profile
pub use profile::{coerce_object, coerce_string, coerce_timestamp, ProfileShape};

// Reconciliation
pub use reconcile::{reconcile, ReconcilePlan};

// Service
pub use service::{retrieval_failure, DirectoryService, ReconcileOutcome, TenantOverview};

// Status
pub use status::{
    derive_payment_status, derive_subscription_state, is_placeholder_name, resolve_tenant_name,
    resolve_tenant_slug, slugify, PaymentStatus, SubscriptionState, DEFAULT_PLAN_LABEL,
    INDIVIDUAL_TENANT_NAME,
};

// Store
pub use store::TenantStore;

// Subscription
pub use subscription::{
    build_subscription_detail, PlanDuration, SubscriptionDetail, MONTHLY_PLAN_PRICE,
    YEARLY_PLAN_PRICE, YEARLY_SPAN_THRESHOLD_DAYS,
};
