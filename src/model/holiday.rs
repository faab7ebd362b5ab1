use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::types::Json;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::domain::holidays::{HolidaySeed, HolidayType};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Holiday {
    #[schema(example = 5)]
    pub id: u64,
    #[schema(example = "Pongal")]
    pub name: String,
    #[schema(example = "2026-01-14", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub is_national: bool,
    pub is_optional: bool,
    #[schema(value_type = Option<Vec<String>>, example = json!(["Tamil Nadu", "Puducherry"]))]
    pub states: Option<Json<Vec<String>>>,
    #[schema(example = "regional")]
    pub holiday_type: String,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl Holiday {
    /// The rule-checking view of this row; unknown type strings count as company holidays.
    pub fn to_seed(&self) -> HolidaySeed {
        HolidaySeed {
            name: self.name.clone(),
            date: self.date,
            is_national: self.is_national,
            is_optional: self.is_optional,
            states: self.states.as_ref().map(|s| s.0.clone()),
            holiday_type: HolidayType::from_str(&self.holiday_type).unwrap_or(HolidayType::Company),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct RegionalHolidayOptIn {
    pub id: u64,
    pub employee_id: u64,
    pub holiday_id: u64,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}
