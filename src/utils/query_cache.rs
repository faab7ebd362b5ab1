//! Read-model caches. Entries are dropped by the mutations that affect
//! them; the TTL bounds anything a missed invalidation leaves behind.

use moka::future::Cache;
use once_cell::sync::{Lazy, OnceCell};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::analytics::LeaveAnalytics;
use crate::error::ApiError;
use crate::model::department::DepartmentWithCount;
use crate::model::leave_balance::EmployeeLeaveBalance;

const DEFAULT_TTL: Duration = Duration::from_secs(60);

static TTL: OnceCell<Duration> = OnceCell::new();

fn ttl() -> Duration {
    TTL.get().copied().unwrap_or(DEFAULT_TTL)
}

/// Sets the TTL; only the first call counts and it must run before the
/// caches are first touched.
pub fn configure(ttl_secs: u64) {
    let _ = TTL.set(Duration::from_secs(ttl_secs));
}

/// (employee id, year) => that employee's balances
static BALANCE_CACHE: Lazy<Cache<(u64, i32), Arc<Vec<EmployeeLeaveBalance>>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(ttl())
        .build()
});

/// year => analytics report
static ANALYTICS_CACHE: Lazy<Cache<i32, Arc<LeaveAnalytics>>> =
    Lazy::new(|| Cache::builder().max_capacity(16).time_to_live(ttl()).build());

static DEPARTMENT_CACHE: Lazy<Cache<(), Arc<Vec<DepartmentWithCount>>>> =
    Lazy::new(|| Cache::builder().max_capacity(1).time_to_live(ttl()).build());

fn load_failed(e: Arc<sqlx::Error>) -> ApiError {
    tracing::error!(error = %e, "Failed to load cached read model");
    ApiError::Internal
}

pub async fn balances<F>(
    employee_id: u64,
    year: i32,
    load: F,
) -> Result<Arc<Vec<EmployeeLeaveBalance>>, ApiError>
where
    F: Future<Output = sqlx::Result<Vec<EmployeeLeaveBalance>>>,
{
    BALANCE_CACHE
        .try_get_with((employee_id, year), async { load.await.map(Arc::new) })
        .await
        .map_err(load_failed)
}

pub async fn invalidate_balances(employee_id: u64, year: i32) {
    BALANCE_CACHE.invalidate(&(employee_id, year)).await;
}

pub async fn analytics<F>(year: i32, load: F) -> Result<Arc<LeaveAnalytics>, ApiError>
where
    F: Future<Output = sqlx::Result<LeaveAnalytics>>,
{
    ANALYTICS_CACHE
        .try_get_with(year, async { load.await.map(Arc::new) })
        .await
        .map_err(load_failed)
}

pub async fn invalidate_analytics(year: i32) {
    ANALYTICS_CACHE.invalidate(&year).await;
}

/// Reports group by the current department, so a department change or a
/// reassignment affects every cached year.
pub fn invalidate_all_analytics() {
    ANALYTICS_CACHE.invalidate_all();
}

pub async fn departments<F>(load: F) -> Result<Arc<Vec<DepartmentWithCount>>, ApiError>
where
    F: Future<Output = sqlx::Result<Vec<DepartmentWithCount>>>,
{
    DEPARTMENT_CACHE
        .try_get_with((), async { load.await.map(Arc::new) })
        .await
        .map_err(load_failed)
}

pub async fn invalidate_departments() {
    DEPARTMENT_CACHE.invalidate(&()).await;
}
