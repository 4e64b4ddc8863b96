//! Status derivation rules
//!
//! Three pure functions computing, per user: subscription state, payment
//! status, and the tenant display name / slug. All three are total — every
//! input, however incomplete, yields a valid value. There is no
//! "unparseable" terminal state at this layer.

use serde::{Deserialize, Serialize};
use serde_json::Map;
use serde_json::Value;
use time::OffsetDateTime;

use tenantry_shared::UserRecord;

use crate::profile::{coerce_string, ProfileShape};
use crate::subscription::SubscriptionDetail;

/// Display name used when no real tenant/organization name resolves
/// ("Individual User"). Kept as a named sentinel; comparisons against it
/// must go through [`is_placeholder_name`].
pub const INDIVIDUAL_TENANT_NAME: &str = "Bireysel Kullanıcı";

/// Plan label a tenant aggregate starts out with
pub const DEFAULT_PLAN_LABEL: &str = "Demo";

/// Check whether a resolved name is the individual-user sentinel
pub fn is_placeholder_name(name: &str) -> bool {
    name == INDIVIDUAL_TENANT_NAME
}

// =============================================================================
// Derived Enums
// =============================================================================

/// Derived subscription state of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionState {
    Subscribed,
    Expired,
    Pending,
    Demo,
}

impl std::fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Subscribed => write!(f, "subscribed"),
            Self::Expired => write!(f, "expired"),
            Self::Pending => write!(f, "pending"),
            Self::Demo => write!(f, "demo"),
        }
    }
}

/// Derived payment status of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Success,
    Pending,
    Failed,
    Unknown,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Pending => write!(f, "pending"),
            Self::Failed => write!(f, "failed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// =============================================================================
// Subscription State
// =============================================================================

/// Derive the subscription state for one user
///
/// Evaluation order is load-bearing: an explicit `TRIAL_EXPIRED` status or
/// a past trial end always wins over an `ACTIVE` flag. The user row's
/// trial end is preferred; the profile detail's only fills in when the row
/// carries none. Without any subscription detail — explicit or synthesized
/// from trial dates — the account is a demo, whatever its lifecycle flag
/// says.
pub fn derive_subscription_state(
    user: &UserRecord,
    detail: Option<&SubscriptionDetail>,
    now: OffsetDateTime,
) -> SubscriptionState {
    let status = user.approval_status();

    if status.is_pending() {
        return SubscriptionState::Pending;
    }

    let trial_end = user
        .trial_end_date
        .or_else(|| detail.and_then(|d| d.trial_ends_at));
    if status.is_trial_expired() || trial_end.is_some_and(|end| end < now) {
        return SubscriptionState::Expired;
    }

    if detail.is_some() {
        return SubscriptionState::Subscribed;
    }

    SubscriptionState::Demo
}

// =============================================================================
// Payment Status
// =============================================================================

/// Status-like keys scanned for a raw payment signal, in priority order
const PAYMENT_STATUS_KEYS: [&str; 7] = [
    "paymentStatus",
    "payment_status",
    "status",
    "state",
    "paymentState",
    "payment_state",
    "subscriptionStatus",
];

/// Derive the payment status for one user
///
/// An expired subscription state forces `failed` no matter what the blob
/// claims. Otherwise the first recognizable raw signal wins; with none
/// found, the subscription state maps to a default.
pub fn derive_payment_status(shape: &ProfileShape, state: SubscriptionState) -> PaymentStatus {
    if state == SubscriptionState::Expired {
        return PaymentStatus::Failed;
    }

    if let Some(found) = scan_payment_signal(shape) {
        return found;
    }

    match state {
        SubscriptionState::Subscribed => PaymentStatus::Success,
        SubscriptionState::Pending => PaymentStatus::Pending,
        SubscriptionState::Expired => PaymentStatus::Failed,
        SubscriptionState::Demo => PaymentStatus::Unknown,
    }
}

/// Scan the profile sub-trees for an explicit status-like field
///
/// Keys are the outer priority loop so a `paymentStatus` anywhere beats a
/// bare `status`. The root is scanned last: a top-level `status` field may
/// describe something else entirely. Raw values that normalize into no
/// vocabulary bucket are skipped, not treated as a match.
fn scan_payment_signal(shape: &ProfileShape) -> Option<PaymentStatus> {
    let sections: [Option<Map<String, Value>>; 5] = [
        shape.subscription(),
        shape.payment(),
        shape.billing(),
        shape.invoice(),
        Some(shape.root().clone()),
    ];

    for key in PAYMENT_STATUS_KEYS {
        for section in sections.iter().flatten() {
            if let Some(status) = section
                .get(key)
                .and_then(coerce_string)
                .and_then(|raw| normalize_payment_value(&raw))
            {
                return Some(status);
            }
        }
    }

    None
}

/// Normalize a raw status string into a vocabulary bucket
pub fn normalize_payment_value(raw: &str) -> Option<PaymentStatus> {
    match raw.trim().to_lowercase().as_str() {
        "success" | "succeeded" | "paid" | "completed" | "complete" | "active" | "ok" => {
            Some(PaymentStatus::Success)
        }
        "pending" | "processing" | "awaiting" | "awaiting_payment" | "incomplete"
        | "in_progress" => Some(PaymentStatus::Pending),
        "failed" | "failure" | "declined" | "rejected" | "canceled" | "cancelled"
        | "expired" | "past_due" | "unpaid" | "error" => Some(PaymentStatus::Failed),
        _ => None,
    }
}

// =============================================================================
// Tenant Name / Slug Resolution
// =============================================================================

type Candidate = fn(&ProfileShape) -> Option<String>;

/// Ordered name candidates; first non-empty, non-placeholder match wins
const NAME_CANDIDATES: [Candidate; 9] = [
    |s| s.str_field("tenantName"),
    |s| s.str_field("companyName"),
    |s| s.str_field("organizationName"),
    |s| s.organization().and_then(|o| o.get("name").and_then(coerce_string)),
    |s| s.organization().and_then(|o| o.get("companyName").and_then(coerce_string)),
    |s| s.metadata().and_then(|m| m.get("organizationName").and_then(coerce_string)),
    |s| s.metadata().and_then(|m| m.get("companyName").and_then(coerce_string)),
    |s| s.metadata().and_then(|m| m.get("organization").and_then(coerce_string)),
    |s| s.metadata().and_then(|m| m.get("company").and_then(coerce_string)),
];

/// Ordered slug candidates, mirroring the name scan
const SLUG_CANDIDATES: [Candidate; 3] = [
    |s| s.str_field("tenantSlug"),
    |s| s.str_field("slug"),
    |s| s.organization().and_then(|o| o.get("slug").and_then(coerce_string)),
];

/// Resolve the tenant display name for one user's profile
pub fn resolve_tenant_name(shape: &ProfileShape) -> String {
    NAME_CANDIDATES
        .iter()
        .find_map(|candidate| candidate(shape).filter(|name| !is_placeholder_name(name)))
        .unwrap_or_else(|| INDIVIDUAL_TENANT_NAME.to_string())
}

/// Resolve the tenant slug for one user's profile
///
/// Declared slugs are normalized through [`slugify`] too, so the output is
/// always URL-safe; without one the resolved name is slugified.
pub fn resolve_tenant_slug(shape: &ProfileShape, resolved_name: &str) -> String {
    SLUG_CANDIDATES
        .iter()
        .find_map(|candidate| candidate(shape))
        .map(|declared| slugify(&declared))
        .filter(|slug| !slug.is_empty())
        .unwrap_or_else(|| slugify(resolved_name))
}

/// Deterministic slugification
///
/// Lowercases, folds the diacritics that occur in stored tenant names
/// (Turkish plus Latin-1), and collapses runs of anything else into single
/// hyphens. No uniqueness suffix: the same name always yields the same slug.
pub fn slugify(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut prev_dash = false;

    for c in input.chars() {
        let folded = match c {
            'ç' | 'Ç' => Some('c'),
            'ğ' | 'Ğ' => Some('g'),
            'ı' | 'İ' => Some('i'),
            'ş' | 'Ş' => Some('s'),
            'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' => Some('a'),
            'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => Some('e'),
            'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => Some('i'),
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => Some('o'),
            'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => Some('u'),
            'ñ' | 'Ñ' => Some('n'),
            c if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase()),
            _ => None,
        };

        match folded {
            Some(ch) => {
                result.push(ch);
                prev_dash = false;
            }
            None => {
                if !prev_dash && !result.is_empty() {
                    result.push('-');
                    prev_dash = true;
                }
            }
        }
    }

    result.trim_end_matches('-').to_string()
}

// =============================================================================
// Tests
// =============================================================================
