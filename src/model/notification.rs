use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationType {
    /// Sent to the applicant when a decision is made
    LeaveStatus,
    /// Sent to the reporting manager when a request is submitted
    PendingApproval,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Notification {
    #[schema(example = 3)]
    pub id: u64,
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = "leave_status")]
    pub notification_type: String,
    #[schema(example = "Leave approved")]
    pub title: String,
    #[schema(example = "Your Casual Leave from 2026-03-02 to 2026-03-04 was approved.")]
    pub message: String,
    #[schema(nullable = true)]
    pub related_id: Option<u64>,
    pub is_read: bool,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}
