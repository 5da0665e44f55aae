//! Company domain model.
//!
//! A company is the tenant: the unit of data isolation. Every principal
//! on the company side, every building, unit, project, linking code and
//! permission grant belongs to exactly one company. Companies are
//! created at signup and are never merged or split.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubscriptionTier {
    Basic,
    Professional,
    Enterprise,
}

/// A rope-access company account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    /// Human-readable name.
    pub name: String,
    pub subscription_tier: SubscriptionTier,
    /// Number of company-side principals (owner included) the
    /// subscription pays for.
    pub seat_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCompany {
    pub name: String,
    pub subscription_tier: SubscriptionTier,
    pub seat_count: u32,
}

/// Fields that can be updated on an existing company.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateCompany {
    pub name: Option<String>,
    pub subscription_tier: Option<SubscriptionTier>,
    pub seat_count: Option<u32>,
}
