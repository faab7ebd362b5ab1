use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::types::Json;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct AuditLog {
    pub id: u64,
    #[schema(nullable = true)]
    pub user_id: Option<u64>,
    #[schema(example = "leave_balances")]
    pub table_name: String,
    #[schema(example = "balance_adjustment")]
    pub action: String,
    #[schema(nullable = true)]
    pub record_id: Option<u64>,
    #[schema(value_type = Option<Object>)]
    pub old_values: Option<Json<Value>>,
    #[schema(value_type = Option<Object>)]
    pub new_values: Option<Json<Value>>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}
