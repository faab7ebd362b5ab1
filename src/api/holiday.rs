use crate::{
    auth::auth::AuthUser,
    domain::holidays::{
        HolidaySeed, HolidayType, OptInOutcome, builtin_holidays_2026, expand_states, plan_import,
        request_opt_in,
    },
    error::ApiError,
    model::holiday::Holiday,
    utils::db_utils::is_duplicate_key,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{MySql, MySqlPool, QueryBuilder, types::Json};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const HOLIDAY_COLUMNS: &str =
    "h.id, h.name, h.date, h.is_national, h.is_optional, h.states, h.holiday_type, h.year, h.created_at";

#[derive(Debug, Deserialize, IntoParams)]
pub struct HolidayQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
    /// State code or name; national holidays are always included
    pub state: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/holidays",
    params(HolidayQuery),
    responses(
        (status = 200, description = "Holidays of the year, ordered by date", body = [Holiday])
    ),
    tag = "Holiday",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_holidays(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<HolidayQuery>,
) -> actix_web::Result<impl Responder> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());

    let holidays = sqlx::query_as::<_, Holiday>(&format!(
        "SELECT {} FROM holidays h WHERE h.year = ? ORDER BY h.date, h.name",
        HOLIDAY_COLUMNS
    ))
    .bind(year)
    .fetch_all(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to fetch holidays"))?;

    let holidays: Vec<Holiday> = match query.state.as_deref().map(str::trim) {
        Some(state) if !state.is_empty() => holidays
            .into_iter()
            .filter(|h| h.to_seed().applies_to_state(state))
            .collect(),
        _ => holidays,
    };

    Ok(HttpResponse::Ok().json(holidays))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct HolidayPayload {
    #[schema(example = "Onam")]
    pub name: String,
    #[schema(example = "2026-08-26", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "regional")]
    pub holiday_type: HolidayType,
    #[serde(default)]
    pub is_optional: bool,
    /// State codes or names; codes are stored as full names
    #[schema(example = json!(["KL"]), nullable = true)]
    pub states: Option<Vec<String>>,
}

impl HolidayPayload {
    pub fn to_seed(&self) -> Result<HolidaySeed, ApiError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::bad_request("Holiday name is required"));
        }
        let states = self
            .states
            .as_deref()
            .map(expand_states)
            .filter(|s| !s.is_empty());
        if self.holiday_type == HolidayType::Regional && states.is_none() {
            return Err(ApiError::bad_request(
                "Regional holidays need at least one state",
            ));
        }
        Ok(HolidaySeed {
            name: name.to_string(),
            date: self.date,
            is_national: self.holiday_type == HolidayType::National,
            is_optional: self.is_optional,
            states,
            holiday_type: self.holiday_type,
        })
    }
}

async fn fetch_holiday(pool: &MySqlPool, id: u64) -> Result<Holiday, ApiError> {
    sqlx::query_as::<_, Holiday>(&format!(
        "SELECT {} FROM holidays h WHERE h.id = ?",
        HOLIDAY_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(ApiError::db("Failed to fetch holiday"))?
    .ok_or_else(|| ApiError::not_found("Holiday not found"))
}

fn map_write_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> ApiError {
    move |e| {
        if is_duplicate_key(&e) {
            ApiError::conflict("A holiday with this name already exists on that date")
        } else {
            ApiError::db(context)(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/holidays",
    request_body = HolidayPayload,
    responses(
        (status = 201, description = "Holiday created", body = Holiday),
        (status = 400, description = "Missing name or states"),
        (status = 409, description = "Same name and date already exist")
    ),
    tag = "Holiday",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<HolidayPayload>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let seed = payload.to_seed()?;

    let result = sqlx::query(
        r#"
        INSERT INTO holidays (name, date, is_national, is_optional, states, holiday_type, year)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&seed.name)
    .bind(seed.date)
    .bind(seed.is_national)
    .bind(seed.is_optional)
    .bind(seed.states.clone().map(Json))
    .bind(seed.holiday_type.as_ref())
    .bind(seed.year())
    .execute(pool.get_ref())
    .await
    .map_err(map_write_error("Failed to create holiday"))?;

    let holiday = fetch_holiday(pool.get_ref(), result.last_insert_id()).await?;
    Ok(HttpResponse::Created().json(holiday))
}

#[utoipa::path(
    put,
    path = "/api/holidays/{holiday_id}",
    params(
        ("holiday_id", Path, description = "Holiday ID")
    ),
    request_body = HolidayPayload,
    responses(
        (status = 200, description = "Holiday replaced", body = Holiday),
        (status = 404, description = "Holiday not found"),
        (status = 409, description = "Same name and date already exist")
    ),
    tag = "Holiday",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<HolidayPayload>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let holiday_id = path.into_inner();
    let seed = payload.to_seed()?;

    fetch_holiday(pool.get_ref(), holiday_id).await?;

    sqlx::query(
        r#"
        UPDATE holidays
        SET name = ?, date = ?, is_national = ?, is_optional = ?, states = ?, holiday_type = ?, year = ?
        WHERE id = ?
        "#,
    )
    .bind(&seed.name)
    .bind(seed.date)
    .bind(seed.is_national)
    .bind(seed.is_optional)
    .bind(seed.states.clone().map(Json))
    .bind(seed.holiday_type.as_ref())
    .bind(seed.year())
    .bind(holiday_id)
    .execute(pool.get_ref())
    .await
    .map_err(map_write_error("Failed to update holiday"))?;

    let holiday = fetch_holiday(pool.get_ref(), holiday_id).await?;
    Ok(HttpResponse::Ok().json(holiday))
}

#[utoipa::path(
    delete,
    path = "/api/holidays/{holiday_id}",
    params(
        ("holiday_id", Path, description = "Holiday ID")
    ),
    responses(
        (status = 200, description = "Holiday deleted", body = Object, example = json!({
            "message": "Holiday deleted successfully"
        })),
        (status = 404, description = "Holiday not found")
    ),
    tag = "Holiday",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let result = sqlx::query("DELETE FROM holidays WHERE id = ?")
        .bind(path.into_inner())
        .execute(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to delete holiday"))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Holiday not found").into());
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Holiday deleted successfully"
    })))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportSummary {
    #[schema(example = 158)]
    pub inserted: usize,
    #[schema(example = 0)]
    pub skipped: usize,
    #[schema(example = "Imported 158 holidays")]
    pub message: String,
}

/// Loads the built-in 2026 calendar, skipping `(name, date)` pairs that
/// already exist.
#[utoipa::path(
    post,
    path = "/api/holidays/import",
    responses(
        (status = 200, description = "Import result; nothing is written when every holiday exists", body = ImportSummary),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "Holiday",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn import_holidays(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let candidates = builtin_holidays_2026().map_err(ApiError::from)?;
    let years: Vec<i32> = {
        let mut years: Vec<i32> = candidates.iter().map(HolidaySeed::year).collect();
        years.sort_unstable();
        years.dedup();
        years
    };

    let mut existing = Vec::new();
    for year in years {
        let rows = sqlx::query_as::<_, (String, NaiveDate)>(
            "SELECT name, date FROM holidays WHERE year = ?",
        )
        .bind(year)
        .fetch_all(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to load existing holidays"))?;
        existing.extend(rows);
    }

    let plan = plan_import(&existing, candidates);
    if plan.is_empty() {
        return Ok(HttpResponse::Ok().json(ImportSummary {
            inserted: 0,
            skipped: plan.skipped,
            message: "All holidays already exist, nothing to import".to_string(),
        }));
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(ApiError::db("Failed to open transaction"))?;

    for batch in plan.batches() {
        let mut builder: QueryBuilder<MySql> = QueryBuilder::new(
            "INSERT INTO holidays (name, date, is_national, is_optional, states, holiday_type, year) ",
        );
        builder.push_values(batch, |mut row, h| {
            row.push_bind(h.name.clone())
                .push_bind(h.date)
                .push_bind(h.is_national)
                .push_bind(h.is_optional)
                .push_bind(h.states.clone().map(Json))
                .push_bind(h.holiday_type.to_string())
                .push_bind(h.year());
        });
        builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(map_write_error("Failed to import holidays"))?;
    }

    tx.commit()
        .await
        .map_err(ApiError::db("Failed to commit holiday import"))?;

    let inserted = plan.to_insert.len();
    info!(inserted, skipped = plan.skipped, "Holiday calendar imported");

    Ok(HttpResponse::Ok().json(ImportSummary {
        inserted,
        skipped: plan.skipped,
        message: format!("Imported {} holidays", inserted),
    }))
}

#[utoipa::path(
    post,
    path = "/api/holidays/{holiday_id}/opt-in",
    params(
        ("holiday_id", Path, description = "Holiday ID")
    ),
    responses(
        (status = 201, description = "Opted in", body = Object, example = json!({
            "message": "Opted in to regional holiday"
        })),
        (status = 400, description = "Not an optional regional holiday of your state"),
        (status = 404, description = "Holiday not found"),
        (status = 409, description = "Already opted in or yearly limit reached")
    ),
    tag = "Holiday",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn opt_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let holiday = fetch_holiday(pool.get_ref(), path.into_inner()).await?;

    let outcome = request_opt_in(
        pool.get_ref(),
        employee_id,
        holiday.id,
        holiday.year,
        &holiday.to_seed(),
    )
    .await
    .map_err(ApiError::from)?;

    match outcome {
        OptInOutcome::Recorded => Ok(HttpResponse::Created().json(json!({
            "message": "Opted in to regional holiday"
        }))),
        OptInOutcome::Refused(reason) => Err(ApiError::from(reason).into()),
        OptInOutcome::AlreadyOptedIn => {
            Err(ApiError::conflict("Already opted in to this holiday").into())
        }
        OptInOutcome::UnknownEmployee => Err(ApiError::not_found("Employee not found").into()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/holidays/{holiday_id}/opt-in",
    params(
        ("holiday_id", Path, description = "Holiday ID")
    ),
    responses(
        (status = 200, description = "Opt-in removed", body = Object, example = json!({
            "message": "Opt-in removed"
        })),
        (status = 404, description = "No opt-in for this holiday")
    ),
    tag = "Holiday",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn opt_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let result = sqlx::query(
        "DELETE FROM regional_holiday_opt_ins WHERE employee_id = ? AND holiday_id = ?",
    )
    .bind(employee_id)
    .bind(path.into_inner())
    .execute(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to remove opt-in"))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("No opt-in for this holiday").into());
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Opt-in removed" })))
}

#[utoipa::path(
    get,
    path = "/api/holidays/opt-ins",
    params(HolidayQuery),
    responses(
        (status = 200, description = "Regional holidays the caller opted into", body = [Holiday])
    ),
    tag = "Holiday",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn my_opt_ins(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<HolidayQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let year = query.year.unwrap_or_else(|| Utc::now().year());

    let holidays = sqlx::query_as::<_, Holiday>(&format!(
        r#"
        SELECT {}
        FROM regional_holiday_opt_ins o
        JOIN holidays h ON h.id = o.holiday_id
        WHERE o.employee_id = ? AND o.year = ?
        ORDER BY h.date
        "#,
        HOLIDAY_COLUMNS
    ))
    .bind(employee_id)
    .bind(year)
    .fetch_all(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to fetch opt-ins"))?;

    Ok(HttpResponse::Ok().json(holidays))
}
