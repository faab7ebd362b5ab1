use crate::{
    auth::auth::AuthUser,
    domain::analytics::{
        DepartmentOverview, LeaveAnalytics, aggregate, department_overview, month_bounds,
        week_bounds,
    },
    error::ApiError,
    model::{
        leave_application::{LeaveApplicationView, VIEW_SELECT},
        role::Role,
    },
    store::{load_application_facts, load_year_balances},
    utils::query_cache,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

const RECENT_APPLICATIONS: i64 = 5;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AnalyticsQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
}

async fn build_report(pool: &MySqlPool, year: i32) -> sqlx::Result<LeaveAnalytics> {
    let facts = load_application_facts(pool, year).await?;
    let balances = load_year_balances(pool, year).await?;
    Ok(aggregate(&facts, &balances))
}

#[utoipa::path(
    get,
    path = "/api/analytics",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Leave analytics for the year", body = LeaveAnalytics),
        (status = 403, description = "HR, Admin or Finance only")
    ),
    tag = "Analytics",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn leave_analytics(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AnalyticsQuery>,
) -> actix_web::Result<impl Responder> {
    if !(auth.role.is_hr_or_admin() || auth.role == Role::Finance) {
        return Err(ApiError::forbidden("HR, Admin or Finance only").into());
    }
    let year = query.year.unwrap_or_else(|| Utc::now().year());

    let report = query_cache::analytics(year, build_report(pool.get_ref(), year)).await?;
    Ok(HttpResponse::Ok().json(report.as_ref()))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrgDashboard {
    #[schema(example = 4)]
    pub pending_requests: i64,
    #[schema(example = 3)]
    pub on_leave_today: i64,
    /// Approved leaves starting between today and Sunday
    #[schema(example = 5)]
    pub starting_this_week: i64,
    /// LOP days of approved leaves starting this month
    #[schema(example = 1.5)]
    pub lop_days_this_month: f64,
    pub recent_applications: Vec<LeaveApplicationView>,
    pub departments: Vec<DepartmentOverview>,
}

async fn count_on_date_range(
    pool: &MySqlPool,
    sql: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<i64, ApiError> {
    sqlx::query_scalar::<_, i64>(sql)
        .bind(from)
        .bind(to)
        .fetch_one(pool)
        .await
        .map_err(ApiError::db("Failed to compute dashboard counter"))
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Organization dashboard", body = OrgDashboard),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "Analytics",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn org_dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let pool = pool.get_ref();
    let today = Utc::now().date_naive();
    let (_, sunday) = week_bounds(today);
    let (month_start, month_end) = month_bounds(today);

    let pending_requests = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM leave_applications WHERE status = 'pending'",
    )
    .fetch_one(pool)
    .await
    .map_err(ApiError::db("Failed to count pending requests"))?;

    let on_leave_today = count_on_date_range(
        pool,
        "SELECT COUNT(DISTINCT employee_id) FROM leave_applications \
         WHERE status = 'approved' AND start_date <= ? AND end_date >= ?",
        today,
        today,
    )
    .await?;

    let starting_this_week = count_on_date_range(
        pool,
        "SELECT COUNT(*) FROM leave_applications \
         WHERE status = 'approved' AND start_date >= ? AND start_date <= ?",
        today,
        sunday,
    )
    .await?;

    let lop_days_this_month = sqlx::query_scalar::<_, Option<f64>>(
        "SELECT SUM(lop_days) FROM leave_applications \
         WHERE status = 'approved' AND start_date >= ? AND start_date <= ?",
    )
    .bind(month_start)
    .bind(month_end)
    .fetch_one(pool)
    .await
    .map_err(ApiError::db("Failed to sum LOP days"))?
    .unwrap_or(0.0);

    let recent_applications = sqlx::query_as::<_, LeaveApplicationView>(&format!(
        "{} ORDER BY la.created_at DESC LIMIT ?",
        VIEW_SELECT
    ))
    .bind(RECENT_APPLICATIONS)
    .fetch_all(pool)
    .await
    .map_err(ApiError::db("Failed to fetch recent applications"))?;

    let departments = sqlx::query_as::<_, (u64, String)>("SELECT id, name FROM departments ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(ApiError::db("Failed to fetch departments"))?;

    let active_employees = sqlx::query_as::<_, (u64, Option<u64>)>(
        "SELECT id, department_id FROM employees WHERE is_active = 1",
    )
    .fetch_all(pool)
    .await
    .map_err(ApiError::db("Failed to fetch employees"))?;

    let pending = sqlx::query_scalar::<_, u64>(
        "SELECT employee_id FROM leave_applications WHERE status = 'pending'",
    )
    .fetch_all(pool)
    .await
    .map_err(ApiError::db("Failed to fetch pending requests"))?;

    let on_leave = sqlx::query_scalar::<_, u64>(
        "SELECT DISTINCT employee_id FROM leave_applications \
         WHERE status = 'approved' AND start_date <= ? AND end_date >= ?",
    )
    .bind(today)
    .bind(today)
    .fetch_all(pool)
    .await
    .map_err(ApiError::db("Failed to fetch employees on leave"))?;

    Ok(HttpResponse::Ok().json(OrgDashboard {
        pending_requests,
        on_leave_today,
        starting_this_week,
        lop_days_this_month,
        recent_applications,
        departments: department_overview(&departments, &active_employees, &pending, &on_leave),
    }))
}
