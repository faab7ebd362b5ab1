use crate::{auth::auth::AuthUser, error::ApiError, model::audit_log::AuditLog};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AuditQuery {
    /// Number of entries, 1..=500 (default 100)
    pub limit: Option<u32>,
    /// Only entries of this table, e.g. `leave_balances`
    pub table_name: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/audit-logs",
    params(AuditQuery),
    responses(
        (status = 200, description = "Latest audit entries, newest first", body = [AuditLog]),
        (status = 403, description = "Admin only")
    ),
    tag = "Audit",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_audit_logs(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AuditQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let limit = query.limit.unwrap_or(100).clamp(1, 500) as i64;

    let logs = match query.table_name.as_deref().filter(|t| !t.is_empty()) {
        Some(table) => sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, user_id, table_name, action, record_id, old_values, new_values, created_at
            FROM audit_logs
            WHERE table_name = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(table)
        .bind(limit)
        .fetch_all(pool.get_ref())
        .await,
        None => sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, user_id, table_name, action, record_id, old_values, new_values, created_at
            FROM audit_logs
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(pool.get_ref())
        .await,
    }
    .map_err(ApiError::db("Failed to fetch audit logs"))?;

    Ok(HttpResponse::Ok().json(logs))
}
