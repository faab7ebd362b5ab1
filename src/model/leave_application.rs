use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct LeaveApplication {
    #[schema(example = 41)]
    pub id: u64,
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-04", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 2.5)]
    pub days_count: f64,
    #[schema(example = "Family function", nullable = true)]
    pub reason: Option<String>,
    #[schema(example = "pending")]
    pub status: String,
    pub is_lop: bool,
    #[schema(example = 0.0)]
    pub lop_days: f64,
    /// Employee who decided the application
    #[schema(nullable = true)]
    pub approver_id: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub decided_at: Option<NaiveDateTime>,
    #[schema(nullable = true)]
    pub remarks: Option<String>,
    #[schema(example = "2026-02-20T09:30:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

/// Application with the names the history and approval screens display.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct LeaveApplicationView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: LeaveApplication,
    #[schema(example = "Asha Rao")]
    pub employee_name: String,
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "Engineering", nullable = true)]
    pub department_name: Option<String>,
    #[schema(example = "Casual Leave", nullable = true)]
    pub leave_type_name: Option<String>,
    #[schema(example = "CL", nullable = true)]
    pub leave_type_code: Option<String>,
}

pub const VIEW_SELECT: &str = r#"
    SELECT la.id, la.employee_id, la.leave_type_id, la.start_date, la.end_date,
           la.days_count, la.reason, la.status, la.is_lop, la.lop_days,
           la.approver_id, la.decided_at, la.remarks, la.created_at,
           CONCAT(e.first_name, ' ', e.last_name) AS employee_name,
           e.employee_code,
           d.name AS department_name,
           lt.name AS leave_type_name,
           lt.code AS leave_type_code
    FROM leave_applications la
    JOIN employees e ON e.id = la.employee_id
    LEFT JOIN departments d ON d.id = e.department_id
    LEFT JOIN leave_types lt ON lt.id = la.leave_type_id
"#;
