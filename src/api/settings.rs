use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::settings::{AnnouncementBanner, BannerColor, OrganizationSettings},
    store::notification_preferences,
    utils::db_utils::{build_update_sql, execute_update},
};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::info;
use utoipa::ToSchema;

pub const ORGANIZATION_COLUMNS: &[&str] = &[
    "name",
    "email",
    "address",
    "fiscal_year_start",
    "working_days",
    "leave_policy_url",
    "employee_handbook_url",
    "posh_policy_url",
    "cpp_url",
];

pub const PREFERENCE_COLUMNS: &[&str] = &[
    "new_leave_request",
    "leave_approved",
    "leave_rejected",
    "low_balance_alert",
    "upcoming_holiday",
    "probation_ending",
];

async fn fetch_organization(pool: &MySqlPool) -> Result<OrganizationSettings, ApiError> {
    sqlx::query_as::<_, OrganizationSettings>(
        r#"
        SELECT id, name, email, address, fiscal_year_start, working_days,
               leave_policy_url, employee_handbook_url, posh_policy_url, cpp_url
        FROM organization_settings
        ORDER BY id
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await
    .map_err(ApiError::db("Failed to fetch organization settings"))?
    .ok_or_else(|| ApiError::not_found("Organization settings not found"))
}

#[utoipa::path(
    get,
    path = "/api/settings/organization",
    responses(
        (status = 200, description = "Organization settings", body = OrganizationSettings),
        (status = 404, description = "Settings row missing")
    ),
    tag = "Settings",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_organization(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(fetch_organization(pool.get_ref()).await?))
}

#[utoipa::path(
    put,
    path = "/api/settings/organization",
    request_body(
        content = Object,
        description = "Any subset of the organization settings fields",
        example = json!({ "name": "Acme India", "working_days": "monday-saturday" })
    ),
    responses(
        (status = 200, description = "Updated settings", body = OrganizationSettings),
        (status = 400, description = "Unknown field or empty body"),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "Settings",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_organization(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if let Some(name) = body.get("name") {
        if !name.as_str().is_some_and(|n| !n.trim().is_empty()) {
            return Err(ApiError::bad_request("Organization name cannot be empty").into());
        }
    }

    let current = fetch_organization(pool.get_ref()).await?;
    let update = build_update_sql(
        "organization_settings",
        &body,
        ORGANIZATION_COLUMNS,
        "id",
        current.id,
    )?;
    execute_update(pool.get_ref(), update)
        .await
        .map_err(ApiError::db("Failed to update organization settings"))?;

    info!(user_id = auth.user_id, "Organization settings updated");
    Ok(HttpResponse::Ok().json(fetch_organization(pool.get_ref()).await?))
}

#[utoipa::path(
    get,
    path = "/api/settings/notification-preferences",
    responses(
        (status = 200, description = "Notification switches", body = NotificationPreferences)
    ),
    tag = "Settings",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_preferences(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let prefs = notification_preferences(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to fetch notification preferences"))?;
    Ok(HttpResponse::Ok().json(prefs))
}

#[utoipa::path(
    put,
    path = "/api/settings/notification-preferences",
    request_body(
        content = Object,
        description = "Any subset of the boolean switches",
        example = json!({ "leave_rejected": false })
    ),
    responses(
        (status = 200, description = "Updated preferences", body = NotificationPreferences),
        (status = 400, description = "Unknown switch or non-boolean value")
    ),
    tag = "Settings",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_preferences(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if let Some(obj) = body.as_object() {
        if obj.values().any(|v| !v.is_boolean()) {
            return Err(ApiError::bad_request("Preference values must be true or false").into());
        }
    }

    let current = notification_preferences(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to fetch notification preferences"))?;
    if current.id == 0 {
        sqlx::query("INSERT INTO notification_preferences () VALUES ()")
            .execute(pool.get_ref())
            .await
            .map_err(ApiError::db("Failed to create notification preferences"))?;
    }
    let current = notification_preferences(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to fetch notification preferences"))?;

    let update = build_update_sql(
        "notification_preferences",
        &body,
        PREFERENCE_COLUMNS,
        "id",
        current.id,
    )?;
    execute_update(pool.get_ref(), update)
        .await
        .map_err(ApiError::db("Failed to update notification preferences"))?;

    let prefs = notification_preferences(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to fetch notification preferences"))?;
    Ok(HttpResponse::Ok().json(prefs))
}

const BANNER_COLUMNS: &str = "id, message, color, is_active, position, created_at, updated_at";

#[utoipa::path(
    get,
    path = "/api/settings/banners",
    responses(
        (status = 200, description = "All announcement banners by position", body = [AnnouncementBanner])
    ),
    tag = "Settings",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_banners(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let banners = sqlx::query_as::<_, AnnouncementBanner>(&format!(
        "SELECT {} FROM announcement_banners ORDER BY position",
        BANNER_COLUMNS
    ))
    .fetch_all(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to fetch banners"))?;

    Ok(HttpResponse::Ok().json(banners))
}

#[utoipa::path(
    get,
    path = "/api/settings/banners/active",
    responses(
        (status = 200, description = "Active announcement banners by position", body = [AnnouncementBanner])
    ),
    tag = "Settings",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn active_banners(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let banners = sqlx::query_as::<_, AnnouncementBanner>(&format!(
        "SELECT {} FROM announcement_banners WHERE is_active = 1 ORDER BY position",
        BANNER_COLUMNS
    ))
    .fetch_all(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to fetch banners"))?;

    Ok(HttpResponse::Ok().json(banners))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertBanner {
    #[schema(example = 1)]
    pub position: i32,
    #[schema(example = "Office closed on Friday for maintenance")]
    pub message: String,
    #[schema(example = "yellow")]
    pub color: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl UpsertBanner {
    fn validated(&self) -> Result<(String, BannerColor), ApiError> {
        let message = self.message.trim();
        if message.is_empty() {
            return Err(ApiError::bad_request("Banner message is required"));
        }
        if self.position < 1 {
            return Err(ApiError::bad_request("Banner position must be at least 1"));
        }
        let color = BannerColor::from_str(&self.color.to_lowercase())
            .map_err(|_| ApiError::bad_request("Banner color must be red or yellow"))?;
        Ok((message.to_string(), color))
    }
}

/// Creates the banner at `position` or replaces the one already there.
#[utoipa::path(
    put,
    path = "/api/settings/banners",
    request_body = UpsertBanner,
    responses(
        (status = 200, description = "Banner stored", body = AnnouncementBanner),
        (status = 400, description = "Invalid message, color or position")
    ),
    tag = "Settings",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upsert_banner(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<UpsertBanner>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let (message, color) = payload.validated()?;

    sqlx::query(
        r#"
        INSERT INTO announcement_banners (message, color, is_active, position)
        VALUES (?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            message = VALUES(message),
            color = VALUES(color),
            is_active = VALUES(is_active)
        "#,
    )
    .bind(&message)
    .bind(color.as_ref())
    .bind(payload.is_active)
    .bind(payload.position)
    .execute(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to store banner"))?;

    let banner = sqlx::query_as::<_, AnnouncementBanner>(&format!(
        "SELECT {} FROM announcement_banners WHERE position = ?",
        BANNER_COLUMNS
    ))
    .bind(payload.position)
    .fetch_one(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to fetch banner"))?;

    Ok(HttpResponse::Ok().json(banner))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banner(message: &str, color: &str, position: i32) -> UpsertBanner {
        UpsertBanner {
            position,
            message: message.into(),
            color: color.into(),
            is_active: true,
        }
    }

    #[test]
    fn banner_validation() {
        assert_eq!(
            banner(" Hello ", "RED", 1).validated().unwrap(),
            ("Hello".to_string(), BannerColor::Red)
        );
        assert!(banner("Hello", "blue", 1).validated().is_err());
        assert!(banner("  ", "red", 1).validated().is_err());
        assert!(banner("Hello", "red", 0).validated().is_err());
    }

    #[test]
    fn banner_is_active_defaults_to_true() {
        let payload: UpsertBanner =
            serde_json::from_value(json!({ "position": 2, "message": "m", "color": "yellow" }))
                .unwrap();
        assert!(payload.is_active);
    }

    #[test]
    fn preference_columns_cannot_touch_the_id() {
        let err = build_update_sql(
            "notification_preferences",
            &json!({ "id": 9 }),
            PREFERENCE_COLUMNS,
            "id",
            1,
        );
        assert!(err.is_err());
    }
}
