use crate::{
    api::employee::EMPLOYEE_COLUMNS,
    auth::auth::AuthUser,
    domain::{
        balance::BalanceFigures,
        hierarchy::{is_reporting_manager, resolve_team, team_scope},
    },
    error::ApiError,
    model::{
        employee::Employee,
        leave_balance::{TeamMemberBalances, TeamTypeBalance},
    },
    store::load_org_nodes,
    utils::db_utils::{SqlValue, bind_query_as, bind_query_scalar, placeholders},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, Days, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub struct TeamQuery {
    /// HR/Admin only: the whole organization instead of direct reports
    pub show_all: Option<bool>,
    /// Balance year, defaults to the current year
    pub year: Option<i32>,
}

/// Employee ids of the caller's team, empty when they have none.
async fn team_ids(pool: &MySqlPool, auth: &AuthUser, show_all: bool) -> Result<Vec<u64>, ApiError> {
    let Some(scope) = team_scope(&auth.actor(), show_all) else {
        return Ok(Vec::new());
    };
    let nodes = load_org_nodes(pool)
        .await
        .map_err(ApiError::db("Failed to load reporting lines"))?;
    Ok(resolve_team(scope, &nodes))
}

fn id_values(ids: &[u64]) -> Vec<SqlValue> {
    ids.iter().copied().map(SqlValue::U64).collect()
}

#[utoipa::path(
    get,
    path = "/api/team/is-manager",
    responses(
        (status = 200, description = "Whether the caller has team access", body = Object, example = json!({
            "is_manager": true
        }))
    ),
    tag = "Team",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn is_manager(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let nodes = load_org_nodes(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to load reporting lines"))?;

    Ok(HttpResponse::Ok().json(json!({
        "is_manager": is_reporting_manager(&auth.actor(), &nodes)
    })))
}

#[utoipa::path(
    get,
    path = "/api/team/ids",
    params(TeamQuery),
    responses(
        (status = 200, description = "Employee ids of the caller's team", body = [u64])
    ),
    tag = "Team",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn member_ids(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TeamQuery>,
) -> actix_web::Result<impl Responder> {
    let ids = team_ids(pool.get_ref(), &auth, query.show_all.unwrap_or(false)).await?;
    Ok(HttpResponse::Ok().json(ids))
}

#[utoipa::path(
    get,
    path = "/api/team",
    params(TeamQuery),
    responses(
        (status = 200, description = "Active members of the caller's team", body = [Employee])
    ),
    tag = "Team",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn members(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TeamQuery>,
) -> actix_web::Result<impl Responder> {
    let ids = team_ids(pool.get_ref(), &auth, query.show_all.unwrap_or(false)).await?;
    if ids.is_empty() {
        return Ok(HttpResponse::Ok().json(Vec::<Employee>::new()));
    }

    let sql = format!(
        "SELECT {} FROM employees WHERE id IN ({}) ORDER BY first_name, last_name",
        EMPLOYEE_COLUMNS,
        placeholders(ids.len())
    );
    let employees = bind_query_as(sqlx::query_as::<_, Employee>(&sql), &id_values(&ids))
        .fetch_all(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to fetch team members"))?;

    Ok(HttpResponse::Ok().json(employees))
}

#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct TeamStats {
    #[schema(example = 6)]
    pub team_size: usize,
    #[schema(example = 1)]
    pub on_leave_today: i64,
    #[schema(example = 2)]
    pub pending_approvals: i64,
    /// Approved leaves starting today or within the next 7 days
    #[schema(example = 3)]
    pub upcoming_leaves: i64,
}

#[utoipa::path(
    get,
    path = "/api/team/stats",
    params(TeamQuery),
    responses(
        (status = 200, description = "Team overview counters", body = TeamStats)
    ),
    tag = "Team",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn stats(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TeamQuery>,
) -> actix_web::Result<impl Responder> {
    let ids = team_ids(pool.get_ref(), &auth, query.show_all.unwrap_or(false)).await?;
    if ids.is_empty() {
        return Ok(HttpResponse::Ok().json(TeamStats::default()));
    }

    let today = Utc::now().date_naive();
    let horizon = today.checked_add_days(Days::new(7)).unwrap_or(today);
    let in_team = format!("employee_id IN ({})", placeholders(ids.len()));
    let mut bindings = id_values(&ids);

    let pending_sql = format!(
        "SELECT COUNT(*) FROM leave_applications WHERE {} AND status = 'pending'",
        in_team
    );
    let pending_approvals = bind_query_scalar(sqlx::query_scalar::<_, i64>(&pending_sql), &bindings)
        .fetch_one(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to count pending approvals"))?;

    bindings.push(SqlValue::Date(today));
    bindings.push(SqlValue::Date(today));
    let on_leave_sql = format!(
        "SELECT COUNT(DISTINCT employee_id) FROM leave_applications \
         WHERE {} AND status = 'approved' AND start_date <= ? AND end_date >= ?",
        in_team
    );
    let on_leave_today = bind_query_scalar(sqlx::query_scalar::<_, i64>(&on_leave_sql), &bindings)
        .fetch_one(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to count team members on leave"))?;

    bindings.pop();
    bindings.pop();
    bindings.push(SqlValue::Date(today));
    bindings.push(SqlValue::Date(horizon));
    let upcoming_sql = format!(
        "SELECT COUNT(*) FROM leave_applications \
         WHERE {} AND status = 'approved' AND start_date >= ? AND start_date <= ?",
        in_team
    );
    let upcoming_leaves = bind_query_scalar(sqlx::query_scalar::<_, i64>(&upcoming_sql), &bindings)
        .fetch_one(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to count upcoming leaves"))?;

    Ok(HttpResponse::Ok().json(TeamStats {
        team_size: ids.len(),
        on_leave_today,
        pending_approvals,
        upcoming_leaves,
    }))
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TeamBalanceRow {
    pub employee_id: u64,
    pub leave_type_code: Option<String>,
    pub entitled_days: f64,
    pub used_days: f64,
    pub carried_forward_days: f64,
    pub adjusted_days: f64,
}

/// One entry per member in `members` order. Availability is floored at
/// zero here, unlike the employee's own balance view.
pub fn group_team_balances(
    members: &[(u64, String)],
    rows: &[TeamBalanceRow],
) -> Vec<TeamMemberBalances> {
    let mut by_employee: BTreeMap<u64, Vec<TeamTypeBalance>> = BTreeMap::new();
    for row in rows {
        let figures = BalanceFigures {
            entitled_days: row.entitled_days,
            used_days: row.used_days,
            carried_forward_days: row.carried_forward_days,
            adjusted_days: row.adjusted_days,
        };
        by_employee
            .entry(row.employee_id)
            .or_default()
            .push(TeamTypeBalance {
                leave_type_code: row.leave_type_code.clone().unwrap_or_else(|| "??".to_string()),
                available_days: figures.available_clamped(),
            });
    }

    members
        .iter()
        .map(|(employee_id, employee_name)| TeamMemberBalances {
            employee_id: *employee_id,
            employee_name: employee_name.clone(),
            balances: by_employee.remove(employee_id).unwrap_or_default(),
        })
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/team/balances",
    params(TeamQuery),
    responses(
        (status = 200, description = "Available days per member and leave type, floored at zero", body = [TeamMemberBalances])
    ),
    tag = "Team",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn balances(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TeamQuery>,
) -> actix_web::Result<impl Responder> {
    let ids = team_ids(pool.get_ref(), &auth, query.show_all.unwrap_or(false)).await?;
    if ids.is_empty() {
        return Ok(HttpResponse::Ok().json(Vec::<TeamMemberBalances>::new()));
    }
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let bindings = id_values(&ids);

    let members_sql = format!(
        "SELECT id, CONCAT(first_name, ' ', last_name) FROM employees \
         WHERE id IN ({}) ORDER BY first_name, last_name",
        placeholders(ids.len())
    );
    let members = bind_query_as(sqlx::query_as::<_, (u64, String)>(&members_sql), &bindings)
        .fetch_all(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to fetch team members"))?;

    let balances_sql = format!(
        r#"
        SELECT lb.employee_id, lt.code AS leave_type_code,
               lb.entitled_days, lb.used_days, lb.carried_forward_days, lb.adjusted_days
        FROM leave_balances lb
        LEFT JOIN leave_types lt ON lt.id = lb.leave_type_id
        WHERE lb.employee_id IN ({}) AND lb.year = ?
        ORDER BY lb.employee_id, lb.leave_type_id
        "#,
        placeholders(ids.len())
    );
    let rows = bind_query_as(sqlx::query_as::<_, TeamBalanceRow>(&balances_sql), &bindings)
        .bind(year)
        .fetch_all(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to fetch team balances"))?;

    Ok(HttpResponse::Ok().json(group_team_balances(&members, &rows)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(employee_id: u64, code: &str, entitled: f64, used: f64) -> TeamBalanceRow {
        TeamBalanceRow {
            employee_id,
            leave_type_code: Some(code.into()),
            entitled_days: entitled,
            used_days: used,
            carried_forward_days: 0.0,
            adjusted_days: 0.0,
        }
    }

    #[test]
    fn groups_by_member_and_floors_at_zero() {
        let members = vec![(2, "Bea Das".to_string()), (1, "Arun Iyer".to_string())];
        let rows = vec![
            row(1, "CL", 12.0, 3.0),
            row(1, "SL", 12.0, 14.5),
            row(2, "CL", 12.0, 0.5),
        ];

        let grouped = group_team_balances(&members, &rows);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].employee_id, 2);
        assert_eq!(grouped[0].balances[0].available_days, 11.5);

        let arun = &grouped[1];
        assert_eq!(arun.balances.len(), 2);
        assert_eq!(arun.balances[0].available_days, 9.0);
        assert_eq!(arun.balances[1].available_days, 0.0);
    }

    #[test]
    fn members_without_rows_get_empty_lists() {
        let members = vec![(5, "New Joiner".to_string())];
        let mut orphan = row(9, "EL", 1.0, 0.0);
        orphan.leave_type_code = None;

        let grouped = group_team_balances(&members, &[orphan]);
        assert_eq!(grouped.len(), 1);
        assert!(grouped[0].balances.is_empty());
    }
}
