//! Common types used across Tenantry

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// User lifecycle status
///
/// Stored as an uppercase VARCHAR; every user row carries exactly one of
/// these values. `TRIAL_EXPIRED` is terminal for non-paying accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    PendingApproval,
    PendingVerification,
    Active,
    Rejected,
    Suspended,
    TrialExpired,
}

impl Default for UserStatus {
    fn default() -> Self {
        Self::PendingApproval
    }
}

impl UserStatus {
    /// Check if the user is awaiting admin approval or e-mail verification
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::PendingApproval | Self::PendingVerification)
    }

    /// Check if the trial for this user has been closed out
    pub fn is_trial_expired(&self) -> bool {
        matches!(self, Self::TrialExpired)
    }

    /// Parse a status from string (case insensitive)
    ///
    /// Unknown values fall back to `PendingApproval`: pending is the only
    /// state that neither grants nor revokes access on its own.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PENDING_APPROVAL" => Self::PendingApproval,
            "PENDING_VERIFICATION" => Self::PendingVerification,
            "ACTIVE" => Self::Active,
            "REJECTED" => Self::Rejected,
            "SUSPENDED" => Self::Suspended,
            "TRIAL_EXPIRED" => Self::TrialExpired,
            _ => Self::PendingApproval,
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PendingApproval => write!(f, "PENDING_APPROVAL"),
            Self::PendingVerification => write!(f, "PENDING_VERIFICATION"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Suspended => write!(f, "SUSPENDED"),
            Self::TrialExpired => write!(f, "TRIAL_EXPIRED"),
        }
    }
}

impl std::str::FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING_APPROVAL" => Ok(Self::PendingApproval),
            "PENDING_VERIFICATION" => Ok(Self::PendingVerification),
            "ACTIVE" => Ok(Self::Active),
            "REJECTED" => Ok(Self::Rejected),
            "SUSPENDED" => Ok(Self::Suspended),
            "TRIAL_EXPIRED" => Ok(Self::TrialExpired),
            _ => Err(format!("Invalid user status: {}", s)),
        }
    }
}

/// Tenant status
///
/// A tenant is `SUSPENDED` when every one of its users has run out of
/// trial/subscription coverage; otherwise it stays `ACTIVE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantStatus {
    Active,
    Suspended,
}

impl Default for TenantStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl TenantStatus {
    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended)
    }
}

impl std::fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Suspended => write!(f, "SUSPENDED"),
        }
    }
}

impl std::str::FromStr for TenantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "SUSPENDED" => Ok(Self::Suspended),
            _ => Err(format!("Invalid tenant status: {}", s)),
        }
    }
}

// =============================================================================
// Database Models
// =============================================================================

/// User row model
///
/// `status` and `role` are kept as raw strings the way the store hands them
/// over; use [`UserRecord::approval_status`] for the typed view. `profile`
/// is an opaque serialized blob whose structure is not guaranteed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub status: String,
    pub role: String,
    pub trial_start_date: Option<OffsetDateTime>,
    pub trial_end_date: Option<OffsetDateTime>,
    pub extra_trial_days: i32,
    pub tenant_id: Option<Uuid>,
    pub profile: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl UserRecord {
    /// Typed view of the raw lifecycle status (lossy: unknown → pending)
    pub fn approval_status(&self) -> UserStatus {
        UserStatus::from_str_lossy(&self.status)
    }

    /// Extra trial days granted to this user, clamped at zero
    pub fn extra_trial_days(&self) -> u32 {
        self.extra_trial_days.max(0) as u32
    }

    /// Best-effort display name: "First Last", falling back to the e-mail
    pub fn display_name(&self) -> String {
        let full = match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.to_string(),
            (None, Some(last)) => last.to_string(),
            (None, None) => String::new(),
        };
        let trimmed = full.trim();
        if trimmed.is_empty() {
            self.email.clone()
        } else {
            trimmed.to_string()
        }
    }
}

/// Tenant row model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TenantRecord {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TenantRecord {
    /// Typed view of the raw tenant status (lossy: unknown → active)
    pub fn tenant_status(&self) -> TenantStatus {
        self.status.parse().unwrap_or_default()
    }
}

// =============================================================================
// API Response Types
// =============================================================================

/// Generic error payload returned to callers on internal failure
///
/// Callers only ever see either a full payload or this shape; there is no
/// partial/degraded response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample_user() -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            email: "owner@example.com".to_string(),
            first_name: Some("Ayşe".to_string()),
            last_name: Some("Demir".to_string()),
            phone: None,
            status: "ACTIVE".to_string(),
            role: "ADMIN".to_string(),
            trial_start_date: None,
            trial_end_date: None,
            extra_trial_days: 0,
            tenant_id: None,
            profile: None,
            created_at: datetime!(2025-01-01 00:00 UTC),
            updated_at: datetime!(2025-01-02 00:00 UTC),
        }
    }

    // =========================================================================
    // UserStatus Tests
    // =========================================================================

    #[test]
    fn test_user_status_default() {
        assert_eq!(UserStatus::default(), UserStatus::PendingApproval);
    }

    #[test]
    fn test_user_status_display_and_parse() {
        assert_eq!(UserStatus::TrialExpired.to_string(), "TRIAL_EXPIRED");
        assert_eq!(
            "TRIAL_EXPIRED".parse::<UserStatus>().unwrap(),
            UserStatus::TrialExpired
        );
        assert_eq!(
            "pending_approval".parse::<UserStatus>().unwrap(),
            UserStatus::PendingApproval
        );
        assert!("invalid".parse::<UserStatus>().is_err());
    }

    #[test]
    fn test_user_status_from_str_lossy() {
        assert_eq!(UserStatus::from_str_lossy("active"), UserStatus::Active);
        assert_eq!(
            UserStatus::from_str_lossy("SUSPENDED"),
            UserStatus::Suspended
        );
        // Unknown values default to pending
        assert_eq!(
            UserStatus::from_str_lossy("garbage"),
            UserStatus::PendingApproval
        );
        assert_eq!(UserStatus::from_str_lossy(""), UserStatus::PendingApproval);
    }

    #[test]
    fn test_user_status_predicates() {
        assert!(UserStatus::PendingApproval.is_pending());
        assert!(UserStatus::PendingVerification.is_pending());
        assert!(!UserStatus::Active.is_pending());

        assert!(UserStatus::TrialExpired.is_trial_expired());
        assert!(!UserStatus::Suspended.is_trial_expired());
    }

    // =========================================================================
    // TenantStatus Tests
    // =========================================================================

    #[test]
    fn test_tenant_status_default() {
        assert_eq!(TenantStatus::default(), TenantStatus::Active);
    }

    #[test]
    fn test_tenant_status_display_and_parse() {
        assert_eq!(TenantStatus::Suspended.to_string(), "SUSPENDED");
        assert_eq!(
            "suspended".parse::<TenantStatus>().unwrap(),
            TenantStatus::Suspended
        );
        assert!("invalid".parse::<TenantStatus>().is_err());
        assert!(TenantStatus::Suspended.is_suspended());
        assert!(!TenantStatus::Active.is_suspended());
    }

    // =========================================================================
    // UserRecord Tests
    // =========================================================================

    #[test]
    fn test_user_record_approval_status() {
        let mut user = sample_user();
        assert_eq!(user.approval_status(), UserStatus::Active);

        user.status = "nonsense".to_string();
        assert_eq!(user.approval_status(), UserStatus::PendingApproval);
    }

    #[test]
    fn test_user_record_extra_trial_days_clamped() {
        let mut user = sample_user();
        user.extra_trial_days = 7;
        assert_eq!(user.extra_trial_days(), 7);

        user.extra_trial_days = -3;
        assert_eq!(user.extra_trial_days(), 0);
    }

    #[test]
    fn test_user_record_display_name() {
        let mut user = sample_user();
        assert_eq!(user.display_name(), "Ayşe Demir");

        user.last_name = None;
        assert_eq!(user.display_name(), "Ayşe");

        user.first_name = None;
        assert_eq!(user.display_name(), "owner@example.com");
    }
}
