use crate::{
    auth::auth::AuthUser,
    domain::{
        approval::{ApprovalAction, LeaveStatus, cancel_application, decide_application},
        balance::{is_half_day_multiple, split_lop},
    },
    error::ApiError,
    model::{
        leave_application::{LeaveApplicationView, VIEW_SELECT},
        leave_balance::LeaveBalanceRow,
        notification::NotificationType,
    },
    store::{NewNotification, notification_preferences, notify_best_effort},
    utils::{
        db_utils::{SqlValue, bind_query_as, bind_query_scalar},
        query_cache,
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyLeave {
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-04", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    /// Whole or half days, at most the calendar span of the dates
    #[schema(example = 2.5)]
    pub days_count: f64,
    #[schema(example = "Family function", nullable = true)]
    pub reason: Option<String>,
}

/// Date order and day count of a new application.
pub fn validate_request(start: NaiveDate, end: NaiveDate, days: f64) -> Result<(), ApiError> {
    if start > end {
        return Err(ApiError::bad_request("Start date must be on or before end date"));
    }
    if days <= 0.0 || !is_half_day_multiple(days) {
        return Err(ApiError::bad_request(
            "Days must be a positive whole number of half days",
        ));
    }
    let span = (end - start).num_days() + 1;
    if days > span as f64 {
        return Err(ApiError::bad_request(format!(
            "Days ({}) exceed the {} calendar day(s) between the dates",
            days, span
        )));
    }
    Ok(())
}

async fn fetch_view(pool: &MySqlPool, id: u64) -> Result<LeaveApplicationView, ApiError> {
    sqlx::query_as::<_, LeaveApplicationView>(&format!("{} WHERE la.id = ?", VIEW_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(ApiError::db("Failed to fetch leave application"))?
        .ok_or_else(|| ApiError::not_found("Leave application not found"))
}

#[utoipa::path(
    post,
    path = "/api/leave",
    request_body = ApplyLeave,
    responses(
        (status = 201, description = "Leave application submitted", body = LeaveApplicationView),
        (status = 400, description = "Invalid dates, days or leave type"),
        (status = 403, description = "Caller has no employee record"),
        (status = 409, description = "Overlaps an existing application", body = Object, example = json!({
            "message": "You already have a leave application for these dates"
        }))
    ),
    tag = "Leave",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn apply_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ApplyLeave>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    validate_request(payload.start_date, payload.end_date, payload.days_count)?;

    let applicant = sqlx::query_as::<_, (String, String, Option<u64>, bool)>(
        "SELECT first_name, last_name, reporting_manager_id, is_active FROM employees WHERE id = ?",
    )
    .bind(employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to load employee"))?
    .ok_or_else(|| ApiError::not_found("Employee not found"))?;
    let (first_name, last_name, manager_id, is_active) = applicant;
    if !is_active {
        return Err(ApiError::forbidden("Inactive employees cannot apply for leave").into());
    }

    let (leave_type_name, is_paid) = sqlx::query_as::<_, (String, bool)>(
        "SELECT name, is_paid FROM leave_types WHERE id = ? AND is_active = 1",
    )
    .bind(payload.leave_type_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to load leave type"))?
    .ok_or_else(|| ApiError::bad_request("Unknown leave type"))?;

    let overlapping = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM leave_applications
        WHERE employee_id = ?
        AND status IN ('pending', 'approved')
        AND start_date <= ? AND end_date >= ?
        "#,
    )
    .bind(employee_id)
    .bind(payload.end_date)
    .bind(payload.start_date)
    .fetch_one(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to check overlapping leave"))?;
    if overlapping > 0 {
        return Err(ApiError::conflict("You already have a leave application for these dates").into());
    }

    let year = payload.start_date.year();
    let balance = sqlx::query_as::<_, LeaveBalanceRow>(
        r#"
        SELECT id, employee_id, leave_type_id, year,
               entitled_days, used_days, carried_forward_days, adjusted_days
        FROM leave_balances
        WHERE employee_id = ? AND leave_type_id = ? AND year = ?
        "#,
    )
    .bind(employee_id)
    .bind(payload.leave_type_id)
    .bind(year)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to load leave balance"))?;

    let split = split_lop(
        balance.map(|b| b.figures().available()),
        payload.days_count,
        is_paid,
    );

    let reason = payload
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let result = sqlx::query(
        r#"
        INSERT INTO leave_applications
            (employee_id, leave_type_id, start_date, end_date, days_count, reason, status, is_lop, lop_days)
        VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.leave_type_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.days_count)
    .bind(reason)
    .bind(split.is_lop)
    .bind(split.lop_days)
    .execute(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to create leave application"))?;
    let application_id = result.last_insert_id();

    info!(
        application_id,
        employee_id,
        days = payload.days_count,
        lop_days = split.lop_days,
        "Leave application submitted"
    );

    if let Some(manager_id) = manager_id {
        let prefs = notification_preferences(pool.get_ref())
            .await
            .unwrap_or_default();
        if prefs.new_leave_request {
            let message = format!(
                "{} {} applied for {} day(s) of {} from {} to {}",
                first_name,
                last_name,
                payload.days_count,
                leave_type_name,
                payload.start_date,
                payload.end_date
            );
            notify_best_effort(
                pool.get_ref(),
                NewNotification {
                    employee_id: manager_id,
                    kind: NotificationType::PendingApproval,
                    title: "New leave request",
                    message: &message,
                    related_id: Some(application_id),
                },
            )
            .await;
        }
    }

    query_cache::invalidate_analytics(year).await;

    let view = fetch_view(pool.get_ref(), application_id).await?;
    Ok(HttpResponse::Created().json(view))
}

#[utoipa::path(
    get,
    path = "/api/leave/pending",
    responses(
        (status = 200, description = "Pending applications the caller can decide", body = [LeaveApplicationView])
    ),
    tag = "Leave",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn pending_for_action(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let mut conditions = vec!["la.status = 'pending'"];
    let mut bindings = Vec::new();

    if !auth.role.is_hr_or_admin() {
        let Some(caller) = auth.employee_id else {
            return Ok(HttpResponse::Ok().json(Vec::<LeaveApplicationView>::new()));
        };
        conditions.push("e.reporting_manager_id = ?");
        bindings.push(SqlValue::U64(caller));
    }
    if let Some(caller) = auth.employee_id {
        // nobody decides their own request
        conditions.push("la.employee_id <> ?");
        bindings.push(SqlValue::U64(caller));
    }

    let sql = format!(
        "{} WHERE {} ORDER BY la.created_at ASC",
        VIEW_SELECT,
        conditions.join(" AND ")
    );

    let pending = bind_query_as(sqlx::query_as::<_, LeaveApplicationView>(&sql), &bindings)
        .fetch_all(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to fetch pending applications"))?;

    Ok(HttpResponse::Ok().json(pending))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DecisionPayload {
    #[schema(example = "approve")]
    pub action: ApprovalAction,
    #[schema(example = "Enjoy your break", nullable = true)]
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DecisionResponse {
    #[schema(example = 41)]
    pub id: u64,
    #[schema(example = "approved")]
    pub status: LeaveStatus,
    /// Days added to the balance's used_days
    #[schema(example = 2.5)]
    pub days_booked: f64,
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/decision",
    params(
        ("leave_id", Path, description = "Leave application ID")
    ),
    request_body = DecisionPayload,
    responses(
        (status = 200, description = "Decision recorded", body = DecisionResponse),
        (status = 403, description = "Not the approver of this application"),
        (status = 404, description = "Leave application not found"),
        (status = 409, description = "Already processed or insufficient balance", body = Object, example = json!({
            "message": "Leave request not found or already processed"
        }))
    ),
    tag = "Leave",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn decide_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<DecisionPayload>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();
    let decision = decide_application(
        pool.get_ref(),
        &auth.actor(),
        path.into_inner(),
        payload.action,
        payload.remarks,
    )
    .await
    .map_err(ApiError::from)?;

    info!(
        application_id = decision.application_id,
        status = %decision.new_status,
        approver = auth.user_id,
        days_booked = decision.days_to_book,
        "Leave application decided"
    );

    query_cache::invalidate_balances(decision.employee_id, decision.year).await;
    query_cache::invalidate_analytics(decision.year).await;

    let prefs = notification_preferences(pool.get_ref())
        .await
        .unwrap_or_default();
    let (enabled, title) = match decision.action {
        ApprovalAction::Approve => (prefs.leave_approved, "Leave approved"),
        ApprovalAction::Reject => (prefs.leave_rejected, "Leave rejected"),
    };
    if enabled {
        let message = match &decision.remarks {
            Some(remarks) => format!("Your leave request was {}: {}", decision.new_status, remarks),
            None => format!("Your leave request was {}", decision.new_status),
        };
        notify_best_effort(
            pool.get_ref(),
            NewNotification {
                employee_id: decision.employee_id,
                kind: NotificationType::LeaveStatus,
                title,
                message: &message,
                related_id: Some(decision.application_id),
            },
        )
        .await;
    }

    Ok(HttpResponse::Ok().json(DecisionResponse {
        id: decision.application_id,
        status: decision.new_status,
        days_booked: decision.days_to_book,
    }))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(
        ("leave_id", Path, description = "Leave application ID")
    ),
    responses(
        (status = 200, description = "Leave application cancelled", body = Object, example = json!({
            "message": "Leave application cancelled"
        })),
        (status = 403, description = "Not your application"),
        (status = 409, description = "Application is no longer pending")
    ),
    tag = "Leave",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn cancel_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let application = cancel_application(pool.get_ref(), &auth.actor(), path.into_inner())
        .await
        .map_err(ApiError::from)?;

    query_cache::invalidate_analytics(application.year).await;
    info!(application_id = application.id, "Leave application cancelled");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave application cancelled"
    })))
}

#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id", Path, description = "Leave application ID")
    ),
    responses(
        (status = 200, description = "Leave application", body = LeaveApplicationView),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave application not found")
    ),
    tag = "Leave",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let view = fetch_view(pool.get_ref(), path.into_inner()).await?;

    let allowed = auth.role.is_hr_or_admin() || auth.employee_id == Some(view.application.employee_id) || {
        let manager = sqlx::query_scalar::<_, Option<u64>>(
            "SELECT reporting_manager_id FROM employees WHERE id = ?",
        )
        .bind(view.application.employee_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to check reporting line"))?
        .flatten();
        auth.employee_id.is_some() && manager == auth.employee_id
    };

    if !allowed {
        return Err(ApiError::forbidden("Not allowed to view this leave application").into());
    }

    Ok(HttpResponse::Ok().json(view))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Page number (starts at 1)
    pub page: Option<u32>,
    /// Items per page (max 100)
    pub per_page: Option<u32>,
    /// Year of the start date
    pub year: Option<i32>,
    /// pending, approved, rejected or cancelled
    pub status: Option<String>,
    pub department_id: Option<u64>,
    pub employee_id: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveHistoryResponse {
    pub data: Vec<LeaveApplicationView>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 3)]
    pub total: i64,
}

#[utoipa::path(
    get,
    path = "/api/leave",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Paginated leave history visible to the caller", body = LeaveHistoryResponse),
        (status = 400, description = "Unknown status")
    ),
    tag = "Leave",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn leave_history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<HistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut conditions: Vec<&str> = Vec::new();
    let mut bindings: Vec<SqlValue> = Vec::new();

    // HR/Admin see everything; everybody else themselves and direct reports
    if !auth.role.is_hr_or_admin() {
        let caller = auth.require_employee()?;
        conditions.push("(la.employee_id = ? OR e.reporting_manager_id = ?)");
        bindings.push(SqlValue::U64(caller));
        bindings.push(SqlValue::U64(caller));
    }

    if let Some(year) = query.year {
        conditions.push("YEAR(la.start_date) = ?");
        bindings.push(SqlValue::I64(year as i64));
    }

    if let Some(status) = &query.status {
        let status = LeaveStatus::from_str(status)
            .map_err(|_| ApiError::bad_request(format!("Unknown status '{}'", status)))?;
        conditions.push("la.status = ?");
        bindings.push(SqlValue::String(status.to_string()));
    }

    if let Some(department_id) = query.department_id {
        conditions.push("e.department_id = ?");
        bindings.push(SqlValue::U64(department_id));
    }

    if let Some(employee_id) = query.employee_id {
        conditions.push("la.employee_id = ?");
        bindings.push(SqlValue::U64(employee_id));
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!(
        "SELECT COUNT(*) FROM leave_applications la JOIN employees e ON e.id = la.employee_id {}",
        where_clause
    );
    debug!(sql = %count_sql, bindings = ?bindings, "Counting leave applications");

    let total = bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql), &bindings)
        .fetch_one(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to count leave applications"))?;

    let data_sql = format!(
        "{} {} ORDER BY la.start_date DESC, la.id DESC LIMIT ? OFFSET ?",
        VIEW_SELECT, where_clause
    );

    let data = bind_query_as(sqlx::query_as::<_, LeaveApplicationView>(&data_sql), &bindings)
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to fetch leave applications"))?;

    Ok(HttpResponse::Ok().json(LeaveHistoryResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn accepts_half_days_within_the_span() {
        assert!(validate_request(date(2026, 3, 2), date(2026, 3, 2), 0.5).is_ok());
        assert!(validate_request(date(2026, 3, 2), date(2026, 3, 4), 2.5).is_ok());
        assert!(validate_request(date(2026, 3, 2), date(2026, 3, 4), 3.0).is_ok());
    }

    #[test]
    fn rejects_bad_requests() {
        let cases = [
            (date(2026, 3, 4), date(2026, 3, 2), 1.0),
            (date(2026, 3, 2), date(2026, 3, 2), 0.0),
            (date(2026, 3, 2), date(2026, 3, 2), -1.0),
            (date(2026, 3, 2), date(2026, 3, 3), 1.25),
            (date(2026, 3, 2), date(2026, 3, 3), 2.5),
            (date(2026, 3, 2), date(2026, 3, 3), f64::NAN),
        ];
        for (start, end, days) in cases {
            assert!(
                matches!(validate_request(start, end, days), Err(ApiError::BadRequest(_))),
                "{start} {end} {days}"
            );
        }
    }

    #[test]
    fn decision_payload_parses_lowercase_actions() {
        let payload: DecisionPayload =
            serde_json::from_value(json!({ "action": "reject", "remarks": null })).unwrap();
        assert_eq!(payload.action, ApprovalAction::Reject);
        assert!(serde_json::from_value::<DecisionPayload>(json!({ "action": "cancel" })).is_err());
    }
}
