use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveType {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Casual Leave")]
    pub name: String,
    #[schema(example = "CL")]
    pub code: String,
    #[schema(nullable = true)]
    pub description: Option<String>,
    /// Entitlement granted to new employees for the current year
    #[schema(example = 12.0)]
    pub default_days: f64,
    /// Unpaid types are booked entirely as loss of pay
    #[schema(example = true)]
    pub is_paid: bool,
    #[schema(example = true)]
    pub is_active: bool,
}
