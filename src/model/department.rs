use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Department {
    #[schema(example = 3)]
    pub id: u64,
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(example = "Product and platform engineering", nullable = true)]
    pub description: Option<String>,
}

/// Department with the number of employees currently assigned to it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DepartmentWithCount {
    #[serde(flatten)]
    pub department: Department,
    #[schema(example = 12)]
    pub employee_count: i64,
}
