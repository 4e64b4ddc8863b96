//! Tenant store
//!
//! The engine's only window onto the database: one bulk snapshot read and
//! the two batched corrective writes the reconciler is allowed to request.
//! Status transitions only — profile blobs and trial dates are never
//! touched from here.

use sqlx::PgPool;
use uuid::Uuid;

use tenantry_shared::UserRecord;

use crate::error::{EngineError, EngineResult};

/// Persistence gateway for the resolution engine
pub struct TenantStore {
    pool: PgPool,
}

impl TenantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Bulk snapshot of user rows for one aggregation pass
    ///
    /// Super-admin accounts are operator logins, not tenant members, and
    /// are excluded. Newest rows first; group insertion order downstream
    /// depends on this.
    pub async fn fetch_user_rows(&self) -> EngineResult<Vec<UserRecord>> {
        let rows: Vec<UserRecord> = sqlx::query_as(
            r#"
            SELECT
                id,
                email,
                first_name,
                last_name,
                phone,
                status,
                role,
                trial_start_date,
                trial_end_date,
                extra_trial_days,
                tenant_id,
                profile,
                created_at,
                updated_at
            FROM users
            WHERE role != 'SUPER_ADMIN'
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(EngineError::SnapshotFetch)?;

        Ok(rows)
    }

    /// Bulk-expire users whose trial has run out
    ///
    /// Idempotent: rows already at `TRIAL_EXPIRED` are left alone, so
    /// overlapping passes racing on the same users are harmless.
    pub async fn expire_users(&self, user_ids: &[Uuid]) -> EngineResult<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE users
            SET status = 'TRIAL_EXPIRED',
                updated_at = NOW()
            WHERE id = ANY($1)
              AND status != 'TRIAL_EXPIRED'
            "#,
        )
        .bind(user_ids)
        .execute(&self.pool)
        .await?;

        let updated = result.rows_affected();
        tracing::info!(
            requested = user_ids.len(),
            updated = updated,
            "Expired users past their trial window"
        );

        Ok(updated)
    }

    /// Bulk-suspend tenants and cascade expiry to their remaining users
    ///
    /// Both statements ride one transaction so a tenant is never suspended
    /// while its users keep an active status in the store.
    pub async fn suspend_tenants(&self, tenant_ids: &[Uuid]) -> EngineResult<u64> {
        if tenant_ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        let suspended = sqlx::query(
            r#"
            UPDATE tenants
            SET status = 'SUSPENDED',
                updated_at = NOW()
            WHERE id = ANY($1)
            "#,
        )
        .bind(tenant_ids)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let cascaded = sqlx::query(
            r#"
            UPDATE users
            SET status = 'TRIAL_EXPIRED',
                updated_at = NOW()
            WHERE tenant_id = ANY($1)
              AND status IN ('ACTIVE', 'PENDING_APPROVAL', 'PENDING_VERIFICATION')
            "#,
        )
        .bind(tenant_ids)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        tracing::info!(
            requested = tenant_ids.len(),
            suspended = suspended,
            cascaded_users = cascaded,
            "Suspended tenants and cascaded user expiry"
        );

        Ok(suspended)
    }
}
