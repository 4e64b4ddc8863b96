//! Tenant directory service
//!
//! Ties one aggregation pass together: snapshot fetch, pure derivation,
//! best-effort corrective write-back, response assembly. The snapshot
//! fetch is the only fatal step; everything after it either succeeds or
//! degrades to a log line.

use serde::Serialize;
use sqlx::PgPool;
use time::OffsetDateTime;

use tenantry_shared::ErrorResponse;

use crate::aggregate::{run_aggregation, TenantAggregate};
use crate::error::EngineResult;
use crate::reconcile::ReconcilePlan;
use crate::store::TenantStore;

/// Aggregate payload handed to the presentation layer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantOverview {
    pub tenants: Vec<TenantAggregate>,
    pub total_tenants: u32,
    pub total_users: u32,
}

impl TenantOverview {
    /// The canonical empty payload for a snapshot with no eligible users
    pub fn empty() -> Self {
        Self {
            tenants: Vec::new(),
            total_tenants: 0,
            total_users: 0,
        }
    }
}

/// Summary of one reconciliation sweep, for the worker's logs
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub scanned_users: u32,
    pub expired_users: u32,
    pub suspended_tenants: u32,
}

/// Tenant directory service
pub struct DirectoryService {
    store: TenantStore,
}

impl DirectoryService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            store: TenantStore::new(pool),
        }
    }

    /// Build the tenant overview for the admin dashboard
    ///
    /// Reads a snapshot, derives the aggregates, then applies the staged
    /// corrective writes best-effort. The returned overview already
    /// reflects the corrected view whether or not those writes land; only
    /// the initial fetch can fail the call.
    pub async fn tenant_overview(&self) -> EngineResult<TenantOverview> {
        let rows = self.store.fetch_user_rows().await?;
        if rows.is_empty() {
            return Ok(TenantOverview::empty());
        }

        let pass = run_aggregation(&rows, OffsetDateTime::now_utc());
        self.apply_plan(&pass.plan).await;

        Ok(TenantOverview {
            total_tenants: pass.tenants.len() as u32,
            total_users: rows.len() as u32,
            tenants: pass.tenants,
        })
    }

    /// Explicit reconciliation sweep, scheduled from the worker
    ///
    /// Same pass as [`Self::tenant_overview`], but the aggregates are
    /// discarded and the staged plan is the point.
    pub async fn reconcile_once(&self) -> EngineResult<ReconcileOutcome> {
        let rows = self.store.fetch_user_rows().await?;
        let pass = run_aggregation(&rows, OffsetDateTime::now_utc());
        self.apply_plan(&pass.plan).await;

        Ok(ReconcileOutcome {
            scanned_users: rows.len() as u32,
            expired_users: pass.plan.expire_user_ids.len() as u32,
            suspended_tenants: pass.plan.suspend_tenant_ids.len() as u32,
        })
    }

    /// Apply a staged plan: at most two batched writes, each fire-and-forget
    ///
    /// A failed batch is logged and swallowed; the in-memory aggregates
    /// already reflect the corrected view and the next pass will stage the
    /// same idempotent writes again.
    pub async fn apply_plan(&self, plan: &ReconcilePlan) {
        if plan.is_empty() {
            return;
        }

        if let Err(err) = self.store.expire_users(&plan.expire_user_ids).await {
            tracing::error!(
                error = %err,
                user_count = plan.expire_user_ids.len(),
                "Failed to persist user expiry batch"
            );
        }

        if let Err(err) = self.store.suspend_tenants(&plan.suspend_tenant_ids).await {
            tracing::error!(
                error = %err,
                tenant_count = plan.suspend_tenant_ids.len(),
                "Failed to persist tenant suspension batch"
            );
        }
    }
}

/// Map an engine failure to the generic caller-facing payload
///
/// Callers get either a full overview or this one shape; no partial
/// payload exists.
pub fn retrieval_failure() -> ErrorResponse {
    ErrorResponse::new("Failed to retrieve tenant overview")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_overview_shape() {
        let overview = TenantOverview::empty();
        assert!(overview.tenants.is_empty());
        assert_eq!(overview.total_tenants, 0);
        assert_eq!(overview.total_users, 0);
    }

    #[test]
    fn test_overview_serializes_camel_case() {
        let json = serde_json::to_value(TenantOverview::empty()).unwrap();
        assert!(json.get("totalTenants").is_some());
        assert!(json.get("totalUsers").is_some());
        assert!(json.get("tenants").is_some());
    }

    #[test]
    fn test_retrieval_failure_payload() {
        let json = serde_json::to_value(retrieval_failure()).unwrap();
        assert!(json.get("error").is_some());
    }
}
