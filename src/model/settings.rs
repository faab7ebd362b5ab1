use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct OrganizationSettings {
    pub id: u64,
    #[schema(example = "Acme Pvt Ltd")]
    pub name: String,
    #[schema(example = "hr@acme.in", nullable = true)]
    pub email: Option<String>,
    #[schema(nullable = true)]
    pub address: Option<String>,
    #[schema(example = "april", nullable = true)]
    pub fiscal_year_start: Option<String>,
    #[schema(example = "monday-friday", nullable = true)]
    pub working_days: Option<String>,
    #[schema(nullable = true)]
    pub leave_policy_url: Option<String>,
    #[schema(nullable = true)]
    pub employee_handbook_url: Option<String>,
    #[schema(nullable = true)]
    pub posh_policy_url: Option<String>,
    #[schema(nullable = true)]
    pub cpp_url: Option<String>,
}

/// Switches that decide which notifications get created.
#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow, ToSchema)]
pub struct NotificationPreferences {
    pub id: u64,
    pub new_leave_request: bool,
    pub leave_approved: bool,
    pub leave_rejected: bool,
    pub low_balance_alert: bool,
    pub upcoming_holiday: bool,
    pub probation_ending: bool,
}

impl Default for NotificationPreferences {
    /// Everything on, used while the preferences row is missing.
    fn default() -> Self {
        NotificationPreferences {
            id: 0,
            new_leave_request: true,
            leave_approved: true,
            leave_rejected: true,
            low_balance_alert: true,
            upcoming_holiday: true,
            probation_ending: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BannerColor {
    Red,
    Yellow,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct AnnouncementBanner {
    pub id: u64,
    #[schema(example = "Office closed on Friday for maintenance")]
    pub message: String,
    #[schema(example = "yellow")]
    pub color: String,
    pub is_active: bool,
    #[schema(example = 1)]
    pub position: i32,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}
