use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "first_name": "Asha",
        "last_name": "Rao",
        "email": "asha.rao@company.com",
        "department_id": 10,
        "reporting_manager_id": 4,
        "employment_type": "full_time",
        "date_of_joining": "2024-01-01",
        "gender": "female",
        "work_location": "Bengaluru",
        "state": "KA",
        "is_active": true
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "Asha")]
    pub first_name: String,

    #[schema(example = "Rao")]
    pub last_name: String,

    #[schema(example = "asha.rao@company.com")]
    pub email: String,

    #[schema(example = 10, nullable = true)]
    pub department_id: Option<u64>,

    #[schema(example = 4, nullable = true)]
    pub reporting_manager_id: Option<u64>,

    #[schema(example = "full_time")]
    pub employment_type: String,

    #[schema(
        example = "2024-01-01",
        value_type = String,
        format = "date"
    )]
    pub date_of_joining: NaiveDate,

    #[schema(example = "female", nullable = true)]
    pub gender: Option<String>,

    #[schema(example = "Bengaluru", nullable = true)]
    pub work_location: Option<String>,

    #[schema(example = "KA", nullable = true)]
    pub state: Option<String>,

    #[schema(example = true)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}
