use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::department::{Department, DepartmentWithCount},
    utils::query_cache,
};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DepartmentPayload {
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(example = "Product and platform engineering", nullable = true)]
    pub description: Option<String>,
}

impl DepartmentPayload {
    fn validated(&self) -> Result<(String, Option<String>), ApiError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::bad_request("Department name is required"));
        }
        if name.chars().count() > 120 {
            return Err(ApiError::bad_request(
                "Department name must be at most 120 characters",
            ));
        }
        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        Ok((name.to_string(), description))
    }
}

#[derive(sqlx::FromRow)]
struct DepartmentCountRow {
    id: u64,
    name: String,
    description: Option<String>,
    employee_count: i64,
}

async fn load_departments(pool: &MySqlPool) -> sqlx::Result<Vec<DepartmentWithCount>> {
    let rows = sqlx::query_as::<_, DepartmentCountRow>(
        r#"
        SELECT d.id, d.name, d.description, COUNT(e.id) AS employee_count
        FROM departments d
        LEFT JOIN employees e ON e.department_id = d.id
        GROUP BY d.id, d.name, d.description
        ORDER BY d.name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| DepartmentWithCount {
            department: Department {
                id: r.id,
                name: r.name,
                description: r.description,
            },
            employee_count: r.employee_count,
        })
        .collect())
}

fn map_write_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> ApiError {
    move |e| match &e {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000") => {
            ApiError::conflict("A department with this name already exists")
        }
        _ => ApiError::db(context)(e),
    }
}

#[utoipa::path(
    get,
    path = "/api/departments",
    responses(
        (status = 200, description = "Departments with their employee counts", body = [DepartmentWithCount])
    ),
    tag = "Department",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_departments(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let departments = query_cache::departments(load_departments(pool.get_ref())).await?;
    Ok(HttpResponse::Ok().json(departments.as_ref()))
}

#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = DepartmentPayload,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 400, description = "Missing name"),
        (status = 403, description = "HR/Admin only"),
        (status = 409, description = "Duplicate name")
    ),
    tag = "Department",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<DepartmentPayload>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let (name, description) = payload.validated()?;

    let result = sqlx::query("INSERT INTO departments (name, description) VALUES (?, ?)")
        .bind(&name)
        .bind(description.as_deref())
        .execute(pool.get_ref())
        .await
        .map_err(map_write_error("Failed to create department"))?;

    query_cache::invalidate_departments().await;
    info!(department_id = result.last_insert_id(), name = %name, "Department created");

    Ok(HttpResponse::Created().json(Department {
        id: result.last_insert_id(),
        name,
        description,
    }))
}

#[utoipa::path(
    put,
    path = "/api/departments/{department_id}",
    params(
        ("department_id", Path, description = "Department ID")
    ),
    request_body = DepartmentPayload,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Duplicate name")
    ),
    tag = "Department",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<DepartmentPayload>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let department_id = path.into_inner();
    let (name, description) = payload.validated()?;

    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM departments WHERE id = ?")
        .bind(department_id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to load department"))?;
    if exists == 0 {
        return Err(ApiError::not_found("Department not found").into());
    }

    sqlx::query("UPDATE departments SET name = ?, description = ? WHERE id = ?")
        .bind(&name)
        .bind(description.as_deref())
        .bind(department_id)
        .execute(pool.get_ref())
        .await
        .map_err(map_write_error("Failed to update department"))?;

    query_cache::invalidate_departments().await;
    query_cache::invalidate_all_analytics();

    Ok(HttpResponse::Ok().json(Department {
        id: department_id,
        name,
        description,
    }))
}

/// Employees of a deleted department become unassigned.
#[utoipa::path(
    delete,
    path = "/api/departments/{department_id}",
    params(
        ("department_id", Path, description = "Department ID")
    ),
    responses(
        (status = 200, description = "Department deleted", body = Object, example = json!({
            "message": "Department deleted successfully"
        })),
        (status = 404, description = "Department not found")
    ),
    tag = "Department",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let department_id = path.into_inner();

    let result = sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(department_id)
        .execute(pool.get_ref())
        .await
        .map_err(ApiError::db("Failed to delete department"))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Department not found").into());
    }

    query_cache::invalidate_departments().await;
    query_cache::invalidate_all_analytics();
    info!(department_id, "Department deleted");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Department deleted successfully"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_trimmed() {
        let payload = DepartmentPayload {
            name: "  Finance ".into(),
            description: Some("   ".into()),
        };
        assert_eq!(payload.validated().unwrap(), ("Finance".to_string(), None));
    }

    #[test]
    fn blank_or_long_names_are_rejected() {
        let blank = DepartmentPayload {
            name: " ".into(),
            description: None,
        };
        assert!(matches!(blank.validated(), Err(ApiError::BadRequest(_))));

        let long = DepartmentPayload {
            name: "x".repeat(121),
            description: None,
        };
        assert!(long.validated().is_err());
    }
}
