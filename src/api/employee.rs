use crate::{
    auth::{auth::AuthUser, password},
    domain::{
        audit::{AuditEntry, record_best_effort},
        hierarchy::validate_assignment,
    },
    error::ApiError,
    model::{
        employee::{Employee, EmploymentType, Gender},
        role::Role,
    },
    store::load_org_nodes,
    utils::{
        db_utils::{
            SqlValue, bind_query_as, bind_query_scalar, build_update_sql, execute_update,
            is_duplicate_key,
        },
        employee_code_filter, query_cache,
    },
};
use actix_web::{HttpResponse, Responder, http::StatusCode, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

/// Columns a partial employee update may touch.
pub const UPDATABLE_COLUMNS: &[&str] = &[
    "first_name",
    "last_name",
    "email",
    "department_id",
    "employment_type",
    "date_of_joining",
    "gender",
    "work_location",
    "state",
    "is_active",
];

/// Body of the `create-employee` call. Every field arrives as optional
/// text so that all validation problems can be reported together.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionEmployee {
    #[schema(example = "EMP-042")]
    pub employee_id: Option<String>,
    #[schema(example = "Asha")]
    pub first_name: Option<String>,
    #[schema(example = "Rao")]
    pub last_name: Option<String>,
    #[schema(example = "asha.rao@company.com", format = "email")]
    pub email: Option<String>,
    /// Numeric department id, as a string or a number
    #[schema(value_type = String, example = "3")]
    pub department_id: Option<Value>,
    #[schema(example = "full_time")]
    pub employment_type: Option<String>,
    #[schema(example = "2026-04-01", format = "date")]
    pub date_of_joining: Option<String>,
    #[schema(example = "female", nullable = true)]
    pub gender: Option<String>,
    #[schema(example = "Bengaluru", nullable = true)]
    pub work_location: Option<String>,
    #[schema(example = "Karnataka", nullable = true)]
    pub state: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionResponse {
    #[schema(example = "bK7#pQ2mWx9!")]
    pub temp_password: String,
    /// No mail transport is configured, so this is always false
    #[schema(example = false)]
    pub email_sent: bool,
}

/// Provisioning input after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmployee {
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department_id: u64,
    pub employment_type: EmploymentType,
    pub date_of_joining: NaiveDate,
    pub gender: Option<Gender>,
    pub work_location: Option<String>,
    pub state: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|part| !part.is_empty())
}

fn parse_department_id(value: &Option<Value>) -> Option<u64> {
    match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|id| *id > 0)
}

/// Field name (request spelling) => message, for every invalid field.
pub type FieldErrors = BTreeMap<&'static str, String>;

pub fn validate_provision(req: &ProvisionEmployee) -> Result<NewEmployee, FieldErrors> {
    let mut errors = FieldErrors::new();

    let employee_code = non_empty(&req.employee_id);
    if employee_code.is_none() {
        errors.insert("employeeId", "Employee ID is required".into());
    }
    let first_name = non_empty(&req.first_name);
    if first_name.is_none() {
        errors.insert("firstName", "First name is required".into());
    }
    let last_name = non_empty(&req.last_name);
    if last_name.is_none() {
        errors.insert("lastName", "Last name is required".into());
    }

    let email = non_empty(&req.email).map(|e| e.to_lowercase());
    if !email.as_deref().is_some_and(is_valid_email) {
        errors.insert("email", "Invalid email".into());
    }

    let department_id = parse_department_id(&req.department_id);
    if department_id.is_none() {
        errors.insert("departmentId", "Department is required".into());
    }

    let employment_type = match non_empty(&req.employment_type) {
        None => {
            errors.insert("employmentType", "Employment type is required".into());
            None
        }
        Some(raw) => {
            let parsed = EmploymentType::from_str(&raw).ok();
            if parsed.is_none() {
                errors.insert(
                    "employmentType",
                    "Employment type must be one of full_time, part_time, contract".into(),
                );
            }
            parsed
        }
    };

    let date_of_joining = match non_empty(&req.date_of_joining) {
        None => {
            errors.insert("dateOfJoining", "Date of joining is required".into());
            None
        }
        Some(raw) => {
            let parsed = NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok();
            if parsed.is_none() {
                errors.insert("dateOfJoining", "Date of joining must be YYYY-MM-DD".into());
            }
            parsed
        }
    };

    let gender = match non_empty(&req.gender) {
        None => Some(None),
        Some(raw) => Gender::from_str(&raw).ok().map(Some),
    };
    if gender.is_none() {
        errors.insert("gender", "Gender must be one of male, female, other".into());
    }

    match (
        employee_code,
        first_name,
        last_name,
        email,
        department_id,
        employment_type,
        date_of_joining,
        gender,
    ) {
        (
            Some(employee_code),
            Some(first_name),
            Some(last_name),
            Some(email),
            Some(department_id),
            Some(employment_type),
            Some(date_of_joining),
            Some(gender),
        ) if errors.is_empty() => Ok(NewEmployee {
            employee_code,
            first_name,
            last_name,
            email,
            department_id,
            employment_type,
            date_of_joining,
            gender,
            work_location: non_empty(&req.work_location),
            state: non_empty(&req.state),
        }),
        _ => Err(errors),
    }
}

fn provision_error(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "error": message }))
}

/// Create an employee together with their login and this year's balances.
#[utoipa::path(
    post,
    path = "/api/employee/provision",
    request_body = ProvisionEmployee,
    responses(
        (status = 200, description = "Employee provisioned", body = ProvisionResponse),
        (status = 400, description = "Validation failed", body = Object, example = json!({
            "error": "Validation failed",
            "fields": { "email": "Invalid email" }
        })),
        (status = 403, description = "Forbidden", body = Object, example = json!({
            "error": "HR/Admin only"
        })),
        (status = 409, description = "Duplicate employee id or email", body = Object, example = json!({
            "error": "Employee ID already exists"
        })),
        (status = 500, description = "Internal server error", body = Object, example = json!({
            "error": "Failed to create employee"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn provision_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ProvisionEmployee>,
) -> HttpResponse {
    if !auth.role.is_hr_or_admin() {
        return provision_error(StatusCode::FORBIDDEN, "HR/Admin only");
    }

    let new = match validate_provision(&payload) {
        Ok(v) => v,
        Err(fields) => {
            return HttpResponse::BadRequest().json(json!({
                "error": "Validation failed",
                "fields": fields
            }));
        }
    };

    match provision(pool.get_ref(), &auth, &new).await {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(ApiError::Internal) => {
            provision_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create employee")
        }
        Err(e) => {
            let status = actix_web::ResponseError::status_code(&e);
            provision_error(status, &e.to_string())
        }
    }
}

async fn provision(
    pool: &MySqlPool,
    auth: &AuthUser,
    new: &NewEmployee,
) -> Result<ProvisionResponse, ApiError> {
    // The filter only answers "certainly not taken"; a hit is confirmed in the DB.
    if employee_code_filter::might_exist(&new.employee_code) {
        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM employees WHERE employee_code = ?",
        )
        .bind(&new.employee_code)
        .fetch_one(pool)
        .await
        .map_err(ApiError::db("Failed to check employee code"))?;
        if taken > 0 {
            return Err(ApiError::conflict("Employee ID already exists"));
        }
    }

    let email_taken = sqlx::query_scalar::<_, i64>(
        "SELECT (SELECT COUNT(*) FROM employees WHERE email = ?) + (SELECT COUNT(*) FROM users WHERE username = ?)",
    )
    .bind(&new.email)
    .bind(&new.email)
    .fetch_one(pool)
    .await
    .map_err(ApiError::db("Failed to check email"))?;
    if email_taken > 0 {
        return Err(ApiError::conflict("An account with this email already exists"));
    }

    let department_exists =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM departments WHERE id = ?")
            .bind(new.department_id)
            .fetch_one(pool)
            .await
            .map_err(ApiError::db("Failed to check department"))?;
    if department_exists == 0 {
        return Err(ApiError::bad_request("Department not found"));
    }

    let temp_password = password::generate_temp_password();
    let hashed = password::hash_password(&temp_password).map_err(|e| {
        error!(error = %e, "Failed to hash temporary password");
        ApiError::Internal
    })?;
    let year = Utc::now().year();

    let mut tx = pool
        .begin()
        .await
        .map_err(ApiError::db("Failed to open transaction"))?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO employees
            (employee_code, first_name, last_name, email, department_id, employment_type,
             date_of_joining, gender, work_location, state)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new.employee_code)
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(&new.email)
    .bind(new.department_id)
    .bind(new.employment_type.as_ref())
    .bind(new.date_of_joining)
    .bind(new.gender.map(|g| g.to_string()))
    .bind(new.work_location.as_deref())
    .bind(new.state.as_deref())
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_duplicate_key(&e) {
            ApiError::conflict("Employee ID or email already exists")
        } else {
            error!(error = %e, code = %new.employee_code, "Failed to insert employee");
            ApiError::Internal
        }
    })?;
    let employee_id = inserted.last_insert_id();

    sqlx::query(
        r#"
        INSERT INTO users (username, password, role_id, employee_id, must_change_password)
        VALUES (?, ?, ?, ?, 1)
        "#,
    )
    .bind(&new.email)
    .bind(&hashed)
    .bind(Role::TeamMember.id())
    .bind(employee_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_duplicate_key(&e) {
            ApiError::conflict("An account with this email already exists")
        } else {
            error!(error = %e, employee_id, "Failed to insert user");
            ApiError::Internal
        }
    })?;

    let balances = sqlx::query(
        r#"
        INSERT INTO leave_balances (employee_id, leave_type_id, year, entitled_days)
        SELECT ?, id, ?, default_days
        FROM leave_types
        WHERE is_active = 1
        "#,
    )
    .bind(employee_id)
    .bind(year)
    .execute(&mut *tx)
    .await
    .map_err(ApiError::db("Failed to create leave balances"))?;

    tx.commit()
        .await
        .map_err(ApiError::db("Failed to commit employee provisioning"))?;

    employee_code_filter::insert(&new.employee_code);
    query_cache::invalidate_departments().await;
    query_cache::invalidate_analytics(year).await;

    record_best_effort(
        pool,
        &AuditEntry {
            user_id: Some(auth.user_id),
            table_name: "employees",
            action: "employee_created",
            record_id: Some(employee_id),
            old_values: None,
            new_values: Some(json!({
                "employee_code": new.employee_code,
                "email": new.email,
                "department_id": new.department_id,
            })),
        },
    )
    .await;

    info!(
        employee_id,
        code = %new.employee_code,
        balances = balances.rows_affected(),
        "Employee provisioned"
    );

    Ok(ProvisionResponse {
        temp_password,
        email_sent: false,
    })
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeQuery {
    /// Page number (starts at 1)
    pub page: Option<u32>,
    /// Items per page (max 100)
    pub per_page: Option<u32>,
    pub department_id: Option<u64>,
    pub reporting_manager_id: Option<u64>,
    /// full_time, part_time or contract
    pub employment_type: Option<String>,
    pub is_active: Option<bool>,
    /// Matches name, email or employee code
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 57)]
    pub total: i64,
}

pub const EMPLOYEE_COLUMNS: &str = "id, employee_code, first_name, last_name, email, department_id, \
     reporting_manager_id, employment_type, date_of_joining, gender, work_location, state, is_active";

#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 403, description = "Forbidden")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<SqlValue> = Vec::new();

    if let Some(department_id) = query.department_id {
        conditions.push("department_id = ?");
        bindings.push(SqlValue::U64(department_id));
    }

    if let Some(manager_id) = query.reporting_manager_id {
        conditions.push("reporting_manager_id = ?");
        bindings.push(SqlValue::U64(manager_id));
    }

    if let Some(employment_type) = &query.employment_type {
        conditions.push("employment_type = ?");
        bindings.push(SqlValue::String(employment_type.clone()));
    }

    if let Some(is_active) = query.is_active {
        conditions.push("is_active = ?");
        bindings.push(SqlValue::Bool(is_active));
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push(
            "(first_name LIKE ? OR last_name LIKE ? OR email LIKE ? OR employee_code LIKE ?)",
        );
        let like = format!("%{}%", search);
        for _ in 0..4 {
            bindings.push(SqlValue::String(like.clone()));
        }
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM employees {}", where_clause);
    debug!(sql = %count_sql, bindings = ?bindings, "Counting employees");

    let total = bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql), &bindings)
        .fetch_one(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to count employees"))?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT {} FROM employees {} ORDER BY id DESC LIMIT ? OFFSET ?",
        EMPLOYEE_COLUMNS, where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

    let employees = bind_query_as(sqlx::query_as::<_, Employee>(&data_sql), &bindings)
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to fetch employees"))?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

pub async fn fetch_employee(pool: &MySqlPool, employee_id: u64) -> Result<Employee, ApiError> {
    sqlx::query_as::<_, Employee>(&format!(
        "SELECT {} FROM employees WHERE id = ?",
        EMPLOYEE_COLUMNS
    ))
    .bind(employee_id)
    .fetch_optional(pool)
    .await
    .map_err(ApiError::db("Failed to fetch employee"))?
    .ok_or_else(|| ApiError::not_found("Employee not found"))
}

/// HR/Admin see everyone, others themselves and their direct reports.
fn can_view(auth: &AuthUser, employee: &Employee) -> bool {
    auth.role.is_hr_or_admin()
        || auth.employee_id == Some(employee.id)
        || (auth.employee_id.is_some() && employee.reporting_manager_id == auth.employee_id)
}

#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee = fetch_employee(pool.get_ref(), path.into_inner()).await?;

    if !can_view(&auth, &employee) {
        return Err(ApiError::forbidden("Not allowed to view this employee").into());
    }

    Ok(HttpResponse::Ok().json(employee))
}

/// Checks enum-valued columns of a partial update before it reaches SQL.
fn validate_update_values(body: &Value) -> Result<(), ApiError> {
    if let Some(v) = body.get("employment_type") {
        if !v.as_str().is_some_and(|s| EmploymentType::from_str(s).is_ok()) {
            return Err(ApiError::bad_request(
                "employment_type must be one of full_time, part_time, contract",
            ));
        }
    }
    if let Some(v) = body.get("gender") {
        if !(v.is_null() || v.as_str().is_some_and(|s| Gender::from_str(s).is_ok())) {
            return Err(ApiError::bad_request("gender must be one of male, female, other"));
        }
    }
    if let Some(v) = body.get("email") {
        if !v.as_str().is_some_and(is_valid_email) {
            return Err(ApiError::bad_request("Invalid email"));
        }
    }
    Ok(())
}

#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body(
        content = Object,
        description = "Any subset of first_name, last_name, email, department_id, employment_type, date_of_joining, gender, work_location, state, is_active",
        example = json!({ "work_location": "Pune", "state": "Maharashtra" })
    ),
    responses(
        (status = 200, description = "Employee updated successfully", body = Object, example = json!({
            "message": "Employee updated successfully"
        })),
        (status = 400, description = "Invalid field or value"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    validate_update_values(&body)?;
    let update = build_update_sql("employees", &body, UPDATABLE_COLUMNS, "id", employee_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(ApiError::db("Failed to update employee"))?;

    if affected == 0 {
        // unchanged values also report 0 rows; tell the two apart
        fetch_employee(pool.get_ref(), employee_id).await?;
    }

    if body.get("department_id").is_some() || body.get("is_active").is_some() {
        query_cache::invalidate_departments().await;
    }
    if body.get("department_id").is_some() {
        query_cache::invalidate_all_analytics();
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee updated successfully"
    })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignManager {
    /// `null` clears the reporting manager
    #[schema(example = 4, nullable = true)]
    pub manager_id: Option<u64>,
}

#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}/manager",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body = AssignManager,
    responses(
        (status = 200, description = "Reporting manager updated", body = Object, example = json!({
            "message": "Reporting manager updated"
        })),
        (status = 400, description = "Self assignment or unknown manager"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Assignment would create a reporting cycle")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn assign_manager(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<AssignManager>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    let nodes = load_org_nodes(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to load reporting lines"))?;
    validate_assignment(&nodes, employee_id, payload.manager_id).map_err(ApiError::from)?;

    let previous = nodes
        .iter()
        .find(|n| n.id == employee_id)
        .and_then(|n| n.reporting_manager_id);

    sqlx::query("UPDATE employees SET reporting_manager_id = ? WHERE id = ?")
        .bind(payload.manager_id)
        .bind(employee_id)
        .execute(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to assign manager"))?;

    record_best_effort(
        pool.get_ref(),
        &AuditEntry {
            user_id: Some(auth.user_id),
            table_name: "employees",
            action: "manager_assignment",
            record_id: Some(employee_id),
            old_values: Some(json!({ "reporting_manager_id": previous })),
            new_values: Some(json!({ "reporting_manager_id": payload.manager_id })),
        },
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Reporting manager updated"
    })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRole {
    #[schema(example = "manager")]
    pub role: Role,
}

#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}/role",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body = SetRole,
    responses(
        (status = 200, description = "Role replaced", body = Object, example = json!({
            "message": "Role updated",
            "role": "manager"
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "No user account for this employee")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn set_role(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<SetRole>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    let (user_id, old_role_id) = sqlx::query_as::<_, (u64, u8)>(
        "SELECT id, role_id FROM users WHERE employee_id = ?",
    )
    .bind(employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(ApiError::db("Failed to load user account"))?
    .ok_or_else(|| ApiError::not_found("No user account for this employee"))?;

    sqlx::query("UPDATE users SET role_id = ? WHERE id = ?")
        .bind(payload.role.id())
        .bind(user_id)
        .execute(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to update role"))?;

    record_best_effort(
        pool.get_ref(),
        &AuditEntry {
            user_id: Some(auth.user_id),
            table_name: "users",
            action: "role_change",
            record_id: Some(user_id),
            old_values: Some(json!({ "role": Role::from_id(old_role_id) })),
            new_values: Some(json!({ "role": payload.role })),
        },
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Role updated",
        "role": payload.role
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ProvisionEmployee {
        ProvisionEmployee {
            employee_id: Some(" EMP-042 ".into()),
            first_name: Some("Asha".into()),
            last_name: Some("Rao".into()),
            email: Some("Asha.Rao@Company.com".into()),
            department_id: Some(json!("3")),
            employment_type: Some("part_time".into()),
            date_of_joining: Some("2026-04-01".into()),
            gender: Some("female".into()),
            work_location: Some("".into()),
            state: Some("Karnataka".into()),
        }
    }

    #[test]
    fn accepts_a_complete_request() {
        let new = validate_provision(&valid()).unwrap();
        assert_eq!(new.employee_code, "EMP-042");
        assert_eq!(new.email, "asha.rao@company.com");
        assert_eq!(new.department_id, 3);
        assert_eq!(new.employment_type, EmploymentType::PartTime);
        assert_eq!(new.gender, Some(Gender::Female));
        assert_eq!(new.work_location, None);
    }

    #[test]
    fn reports_every_invalid_field_at_once() {
        let req = ProvisionEmployee {
            email: Some("not-an-email".into()),
            employment_type: Some("intern".into()),
            date_of_joining: Some("01/04/2026".into()),
            gender: Some("unknown".into()),
            ..Default::default()
        };

        let errors = validate_provision(&req).unwrap_err();
        let fields: Vec<_> = errors.keys().copied().collect();
        assert_eq!(
            fields,
            vec![
                "dateOfJoining",
                "departmentId",
                "email",
                "employeeId",
                "employmentType",
                "firstName",
                "gender",
                "lastName",
            ]
        );
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let req = ProvisionEmployee {
            gender: None,
            state: None,
            department_id: Some(json!(7)),
            ..valid()
        };
        let new = validate_provision(&req).unwrap();
        assert_eq!(new.gender, None);
        assert_eq!(new.department_id, 7);
    }

    #[test]
    fn employment_type_is_required() {
        for missing in [None, Some("  ".to_string())] {
            let req = ProvisionEmployee {
                employment_type: missing,
                ..valid()
            };
            let errors = validate_provision(&req).unwrap_err();
            assert_eq!(
                errors.get("employmentType").map(String::as_str),
                Some("Employment type is required")
            );
            assert_eq!(errors.len(), 1);
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a b@c.co"));
        assert!(!is_valid_email("a@@b.co"));
        assert!(!is_valid_email("a@b..co"));
    }

    #[test]
    fn camel_case_payload_deserializes() {
        let req: ProvisionEmployee = serde_json::from_value(json!({
            "employeeId": "E1",
            "firstName": "A",
            "lastName": "B",
            "email": "a@b.co",
            "departmentId": 2,
            "employmentType": "contract",
            "dateOfJoining": "2026-01-05",
            "gender": null,
            "workLocation": null,
            "state": null
        }))
        .unwrap();
        assert!(validate_provision(&req).is_ok());
    }

    #[test]
    fn update_values_are_checked() {
        assert!(validate_update_values(&json!({ "employment_type": "intern" })).is_err());
        assert!(validate_update_values(&json!({ "gender": null })).is_ok());
        assert!(validate_update_values(&json!({ "email": "x" })).is_err());
        assert!(validate_update_values(&json!({ "state": "Goa" })).is_ok());
    }

    #[test]
    fn response_uses_the_published_field_names() {
        let body = serde_json::to_value(ProvisionResponse {
            temp_password: "x".into(),
            email_sent: false,
        })
        .unwrap();
        assert_eq!(body, json!({ "tempPassword": "x", "emailSent": false }));
    }
}
