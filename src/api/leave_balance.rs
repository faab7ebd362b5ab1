use crate::{
    auth::auth::AuthUser,
    domain::{
        adjustment::{AdjustmentRequest, adjust_balance},
        balance::BalanceFigures,
    },
    error::ApiError,
    model::{
        leave_balance::{BalanceWithTypeRow, EmployeeLeaveBalance},
        leave_type::LeaveType,
    },
    utils::query_cache,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[utoipa::path(
    get,
    path = "/api/leave-types",
    responses(
        (status = 200, description = "Active leave types", body = [LeaveType])
    ),
    tag = "Leave Balance",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_leave_types(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let types = sqlx::query_as::<_, LeaveType>(
        r#"
        SELECT id, name, code, description, default_days, is_paid, is_active
        FROM leave_types
        WHERE is_active = 1
        ORDER BY name
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to fetch leave types"))?;

    Ok(HttpResponse::Ok().json(types))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct BalanceQuery {
    /// Defaults to the caller's own employee record
    pub employee_id: Option<u64>,
    /// Defaults to the current year
    pub year: Option<i32>,
}

pub async fn load_employee_balances(
    pool: &MySqlPool,
    employee_id: u64,
    year: i32,
) -> sqlx::Result<Vec<EmployeeLeaveBalance>> {
    let rows = sqlx::query_as::<_, BalanceWithTypeRow>(
        r#"
        SELECT lb.id, lb.employee_id, lb.leave_type_id, lb.year,
               lb.entitled_days, lb.used_days, lb.carried_forward_days, lb.adjusted_days,
               lt.name AS leave_type_name, lt.code AS leave_type_code
        FROM leave_balances lb
        LEFT JOIN leave_types lt ON lt.id = lb.leave_type_id
        WHERE lb.employee_id = ? AND lb.year = ?
        ORDER BY lb.leave_type_id
        "#,
    )
    .bind(employee_id)
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(EmployeeLeaveBalance::from).collect())
}

/// HR/Admin read any balance; managers those of their direct reports.
async fn ensure_can_read(
    pool: &MySqlPool,
    auth: &AuthUser,
    employee_id: u64,
) -> Result<(), ApiError> {
    if auth.role.is_hr_or_admin() || auth.employee_id == Some(employee_id) {
        return Ok(());
    }
    let Some(caller) = auth.employee_id else {
        return Err(ApiError::forbidden("Not allowed to view these balances"));
    };

    let manager = sqlx::query_scalar::<_, Option<u64>>(
        "SELECT reporting_manager_id FROM employees WHERE id = ?",
    )
    .bind(employee_id)
    .fetch_optional(pool)
    .await
    .map_err(ApiError::db("Failed to check reporting line"))?
    .ok_or_else(|| ApiError::not_found("Employee not found"))?;

    if manager == Some(caller) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not allowed to view these balances"))
    }
}

#[utoipa::path(
    get,
    path = "/api/leave-balance",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Balances per leave type; available_days may be negative", body = [EmployeeLeaveBalance]),
        (status = 403, description = "Forbidden")
    ),
    tag = "Leave Balance",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_balances(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<BalanceQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = match query.employee_id {
        Some(id) => id,
        None => auth.require_employee()?,
    };
    let year = query.year.unwrap_or_else(|| Utc::now().year());

    ensure_can_read(pool.get_ref(), &auth, employee_id).await?;

    let balances = query_cache::balances(
        employee_id,
        year,
        load_employee_balances(pool.get_ref(), employee_id, year),
    )
    .await?;

    Ok(HttpResponse::Ok().json(balances.as_ref()))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustBalance {
    /// New absolute value of `adjusted_days`, not a delta
    #[schema(example = 2.5)]
    pub adjusted_days: f64,
    #[schema(example = "Compensation for weekend release work")]
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdjustmentResponse {
    #[schema(example = 11)]
    pub id: u64,
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = 2026)]
    pub year: i32,
    #[serde(flatten)]
    pub figures: BalanceFigures,
    #[schema(example = 8.5)]
    pub available_days: f64,
    #[schema(example = 0.0)]
    pub previous_adjusted_days: f64,
    /// False when the audit entry could not be written
    pub audit_recorded: bool,
}

#[utoipa::path(
    put,
    path = "/api/leave-balance/{balance_id}/adjustment",
    params(
        ("balance_id", Path, description = "Leave balance ID")
    ),
    request_body = AdjustBalance,
    responses(
        (status = 200, description = "Balance adjusted", body = AdjustmentResponse),
        (status = 400, description = "Invalid reason or days"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Leave balance not found")
    ),
    tag = "Leave Balance",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn adjust(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<AdjustBalance>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let payload = payload.into_inner();

    let outcome = adjust_balance(
        pool.get_ref(),
        pool.get_ref(),
        auth.user_id,
        AdjustmentRequest {
            balance_id: path.into_inner(),
            adjusted_days: payload.adjusted_days,
            reason: payload.reason,
        },
    )
    .await
    .map_err(ApiError::from)?;

    let balance = outcome.balance;
    query_cache::invalidate_balances(balance.employee_id, balance.year).await;
    query_cache::invalidate_analytics(balance.year).await;

    Ok(HttpResponse::Ok().json(AdjustmentResponse {
        id: balance.id,
        employee_id: balance.employee_id,
        leave_type_id: balance.leave_type_id,
        year: balance.year,
        available_days: balance.figures.available(),
        figures: balance.figures,
        previous_adjusted_days: outcome.previous_adjusted_days,
        audit_recorded: outcome.audit_recorded,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn adjustment_response_is_flat() {
        let body = serde_json::to_value(AdjustmentResponse {
            id: 1,
            employee_id: 2,
            leave_type_id: 3,
            year: 2026,
            figures: BalanceFigures {
                entitled_days: 12.0,
                used_days: 15.0,
                carried_forward_days: 0.0,
                adjusted_days: 1.5,
            },
            available_days: -1.5,
            previous_adjusted_days: 0.0,
            audit_recorded: false,
        })
        .unwrap();

        assert_eq!(body["adjusted_days"], json!(1.5));
        assert_eq!(body["available_days"], json!(-1.5));
        assert_eq!(body["audit_recorded"], json!(false));
    }
}
