use crate::{auth::auth::AuthUser, error::ApiError, model::notification::Notification};
use actix_web::{HttpResponse, Responder, web};
use serde_json::json;
use sqlx::MySqlPool;

const LATEST_LIMIT: i64 = 50;

#[utoipa::path(
    get,
    path = "/api/notifications",
    responses(
        (status = 200, description = "Latest 50 notifications of the caller, newest first", body = [Notification])
    ),
    tag = "Notification",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_notifications(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let notifications = sqlx::query_as::<_, Notification>(
        r#"
        SELECT id, employee_id, notification_type, title, message, related_id, is_read, created_at
        FROM notifications
        WHERE employee_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(employee_id)
    .bind(LATEST_LIMIT)
    .fetch_all(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to fetch notifications"))?;

    Ok(HttpResponse::Ok().json(notifications))
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    responses(
        (status = 200, description = "Number of unread notifications", body = Object, example = json!({
            "count": 3
        }))
    ),
    tag = "Notification",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn unread_count(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE employee_id = ? AND is_read = 0",
    )
    .bind(employee_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to count notifications"))?;

    Ok(HttpResponse::Ok().json(json!({ "count": count })))
}

#[utoipa::path(
    put,
    path = "/api/notifications/{notification_id}/read",
    params(
        ("notification_id", Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Marked as read"),
        (status = 404, description = "Notification not found")
    ),
    tag = "Notification",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn mark_read(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let notification_id = path.into_inner();

    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE id = ? AND employee_id = ?",
    )
    .bind(notification_id)
    .bind(employee_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to load notification"))?;
    if exists == 0 {
        return Err(ApiError::not_found("Notification not found").into());
    }

    sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND employee_id = ?")
        .bind(notification_id)
        .bind(employee_id)
        .execute(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to mark notification read"))?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Notification marked as read" })))
}

#[utoipa::path(
    put,
    path = "/api/notifications/read-all",
    responses(
        (status = 200, description = "All notifications marked as read", body = Object, example = json!({
            "updated": 4
        }))
    ),
    tag = "Notification",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn mark_all_read(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let result = sqlx::query(
        "UPDATE notifications SET is_read = 1 WHERE employee_id = ? AND is_read = 0",
    )
    .bind(employee_id)
    .execute(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to mark notifications read"))?;

    Ok(HttpResponse::Ok().json(json!({ "updated": result.rows_affected() })))
}
