//! MySQL implementations of the domain store traits, plus the shared reads
//! several handlers need.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::MySqlPool;
use sqlx::types::Json;
use std::str::FromStr;

use crate::domain::adjustment::{BalanceRecord, BalanceStore};
use crate::domain::analytics::{ApplicationFact, LeaveTypeRef};
use crate::domain::approval::{
    ApplicationSnapshot, ApplicationStore, CommitOutcome, Decision, LeaveStatus,
};
use crate::domain::audit::{AuditEntry, AuditSink};
use crate::domain::balance::BalanceFigures;
use crate::domain::hierarchy::OrgNode;
use crate::domain::holidays::{OptInOutcome, OptInRule, OptInStore};
use crate::model::leave_balance::LeaveBalanceRow;
use crate::model::notification::NotificationType;
use crate::model::settings::NotificationPreferences;
use crate::utils::db_utils::is_duplicate_key;

#[async_trait]
impl BalanceStore for MySqlPool {
    async fn find_balance(&self, id: u64) -> anyhow::Result<Option<BalanceRecord>> {
        let row = sqlx::query_as::<_, LeaveBalanceRow>(
            r#"
            SELECT id, employee_id, leave_type_id, year,
                   entitled_days, used_days, carried_forward_days, adjusted_days
            FROM leave_balances
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self)
        .await?;

        Ok(row.map(BalanceRecord::from))
    }

    async fn set_adjusted_days(&self, id: u64, adjusted_days: f64) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE leave_balances SET adjusted_days = ? WHERE id = ?")
            .bind(adjusted_days)
            .bind(id)
            .execute(self)
            .await?;

        // MySQL reports 0 affected rows when the value is unchanged, so
        // confirm the row exists before calling it gone.
        if result.rows_affected() > 0 {
            return Ok(true);
        }
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leave_balances WHERE id = ?")
            .bind(id)
            .fetch_one(self)
            .await?;
        Ok(exists > 0)
    }
}

#[async_trait]
impl AuditSink for MySqlPool {
    async fn append(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (user_id, table_name, action, record_id, old_values, new_values)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.table_name)
        .bind(entry.action)
        .bind(entry.record_id)
        .bind(entry.old_values.clone().map(Json))
        .bind(entry.new_values.clone().map(Json))
        .execute(self)
        .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    id: u64,
    employee_id: u64,
    reporting_manager_id: Option<u64>,
    leave_type_id: u64,
    start_date: NaiveDate,
    days_count: f64,
    lop_days: f64,
    status: String,
    entitled_days: Option<f64>,
    used_days: Option<f64>,
    carried_forward_days: Option<f64>,
    adjusted_days: Option<f64>,
}

#[async_trait]
impl ApplicationStore for MySqlPool {
    async fn load_application(&self, id: u64) -> anyhow::Result<Option<ApplicationSnapshot>> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT la.id, la.employee_id, e.reporting_manager_id, la.leave_type_id,
                   la.start_date, la.days_count, la.lop_days, la.status,
                   lb.entitled_days, lb.used_days, lb.carried_forward_days, lb.adjusted_days
            FROM leave_applications la
            JOIN employees e ON e.id = la.employee_id
            LEFT JOIN leave_balances lb
                   ON lb.employee_id = la.employee_id
                  AND lb.leave_type_id = la.leave_type_id
                  AND lb.year = YEAR(la.start_date)
            WHERE la.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status = LeaveStatus::from_str(&row.status)
            .map_err(|_| anyhow::anyhow!("unknown leave status '{}'", row.status))?;

        let balance = match (
            row.entitled_days,
            row.used_days,
            row.carried_forward_days,
            row.adjusted_days,
        ) {
            (Some(entitled), Some(used), Some(carried), Some(adjusted)) => Some(BalanceFigures {
                entitled_days: entitled,
                used_days: used,
                carried_forward_days: carried,
                adjusted_days: adjusted,
            }),
            _ => None,
        };

        Ok(Some(ApplicationSnapshot {
            id: row.id,
            employee_id: row.employee_id,
            reporting_manager_id: row.reporting_manager_id,
            leave_type_id: row.leave_type_id,
            year: chrono::Datelike::year(&row.start_date),
            days_count: row.days_count,
            lop_days: row.lop_days,
            status,
            balance,
        }))
    }

    async fn commit_decision(&self, decision: &Decision) -> anyhow::Result<CommitOutcome> {
        let mut tx = self.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE leave_applications
            SET status = ?, approver_id = ?, decided_by = ?, decided_at = NOW(), remarks = ?
            WHERE id = ?
            AND status = 'pending'
            "#,
        )
        .bind(decision.new_status.as_ref())
        .bind(decision.approver_employee_id)
        .bind(decision.approver_user_id)
        .bind(decision.remarks.as_deref())
        .bind(decision.application_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(CommitOutcome::NotPending);
        }

        if decision.days_to_book > 0.0 {
            let booked = sqlx::query(
                r#"
                UPDATE leave_balances
                SET used_days = used_days + ?
                WHERE employee_id = ? AND leave_type_id = ? AND year = ?
                AND entitled_days + carried_forward_days + adjusted_days - used_days >= ?
                "#,
            )
            .bind(decision.days_to_book)
            .bind(decision.employee_id)
            .bind(decision.leave_type_id)
            .bind(decision.year)
            .bind(decision.days_to_book)
            .execute(&mut *tx)
            .await?;

            if booked.rows_affected() == 0 {
                tx.rollback().await?;
                tracing::info!(
                    employee_id = decision.employee_id,
                    application_id = decision.application_id,
                    "Leave balance changed while approving"
                );
                return Ok(CommitOutcome::BalanceChanged);
            }
        }

        tx.commit().await?;
        Ok(CommitOutcome::Committed)
    }

    async fn commit_cancellation(
        &self,
        application_id: u64,
        employee_id: u64,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE leave_applications
            SET status = 'cancelled'
            WHERE id = ? AND employee_id = ? AND status = 'pending'
            "#,
        )
        .bind(application_id)
        .bind(employee_id)
        .execute(self)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OptInStore for MySqlPool {
    async fn record_opt_in(
        &self,
        employee_id: u64,
        holiday_id: u64,
        year: i32,
        rule: OptInRule<'_>,
    ) -> anyhow::Result<OptInOutcome> {
        let mut tx = self.begin().await?;

        // row lock serializes opt-ins of this employee until commit
        let state = sqlx::query_scalar::<_, Option<String>>(
            "SELECT state FROM employees WHERE id = ? FOR UPDATE",
        )
        .bind(employee_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(state) = state else {
            tx.rollback().await?;
            return Ok(OptInOutcome::UnknownEmployee);
        };

        let already_opted = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM regional_holiday_opt_ins WHERE employee_id = ? AND year = ?",
        )
        .bind(employee_id)
        .bind(year)
        .fetch_one(&mut *tx)
        .await?;

        if let Err(refusal) = rule(state.as_deref(), already_opted.max(0) as usize) {
            tx.rollback().await?;
            return Ok(OptInOutcome::Refused(refusal));
        }

        let inserted = sqlx::query(
            "INSERT INTO regional_holiday_opt_ins (employee_id, holiday_id, year) VALUES (?, ?, ?)",
        )
        .bind(employee_id)
        .bind(holiday_id)
        .bind(year)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {
                tx.commit().await?;
                Ok(OptInOutcome::Recorded)
            }
            Err(e) if is_duplicate_key(&e) => {
                tx.rollback().await?;
                Ok(OptInOutcome::AlreadyOptedIn)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Every employee with their reporting line.
pub async fn load_org_nodes(pool: &MySqlPool) -> sqlx::Result<Vec<OrgNode>> {
    let rows = sqlx::query_as::<_, (u64, Option<u64>, bool)>(
        "SELECT id, reporting_manager_id, is_active FROM employees",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, reporting_manager_id, is_active)| OrgNode {
            id,
            reporting_manager_id,
            is_active,
        })
        .collect())
}

#[derive(sqlx::FromRow)]
struct FactRow {
    days_count: f64,
    start_date: NaiveDate,
    status: String,
    employee_id: u64,
    department_name: Option<String>,
    leave_type_id: Option<u64>,
    leave_type_name: Option<String>,
    leave_type_code: Option<String>,
}

/// Applications starting in `year`, shaped for the analytics fold.
pub async fn load_application_facts(
    pool: &MySqlPool,
    year: i32,
) -> sqlx::Result<Vec<ApplicationFact>> {
    let rows = sqlx::query_as::<_, FactRow>(
        r#"
        SELECT la.days_count, la.start_date, la.status, la.employee_id,
               d.name AS department_name,
               lt.id AS leave_type_id, lt.name AS leave_type_name, lt.code AS leave_type_code
        FROM leave_applications la
        LEFT JOIN employees e ON e.id = la.employee_id
        LEFT JOIN departments d ON d.id = e.department_id
        LEFT JOIN leave_types lt ON lt.id = la.leave_type_id
        WHERE YEAR(la.start_date) = ?
        "#,
    )
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            // rows with a status outside the state machine are skipped
            let status = LeaveStatus::from_str(&row.status).ok()?;
            let leave_type = match (row.leave_type_id, row.leave_type_name, row.leave_type_code) {
                (Some(id), Some(name), Some(code)) => Some(LeaveTypeRef { id, name, code }),
                _ => None,
            };
            Some(ApplicationFact {
                days_count: row.days_count,
                start_date: row.start_date,
                status,
                employee_id: Some(row.employee_id),
                department_name: row.department_name,
                leave_type,
            })
        })
        .collect())
}

pub async fn load_year_balances(pool: &MySqlPool, year: i32) -> sqlx::Result<Vec<BalanceFigures>> {
    let rows = sqlx::query_as::<_, LeaveBalanceRow>(
        r#"
        SELECT id, employee_id, leave_type_id, year,
               entitled_days, used_days, carried_forward_days, adjusted_days
        FROM leave_balances
        WHERE year = ?
        "#,
    )
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(LeaveBalanceRow::figures).collect())
}

pub async fn notification_preferences(pool: &MySqlPool) -> sqlx::Result<NotificationPreferences> {
    let prefs = sqlx::query_as::<_, NotificationPreferences>(
        r#"
        SELECT id, new_leave_request, leave_approved, leave_rejected,
               low_balance_alert, upcoming_holiday, probation_ending
        FROM notification_preferences
        ORDER BY id
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    Ok(prefs.unwrap_or_default())
}

pub struct NewNotification<'a> {
    pub employee_id: u64,
    pub kind: NotificationType,
    pub title: &'a str,
    pub message: &'a str,
    pub related_id: Option<u64>,
}

/// Inserts a notification; failures are logged and reported as `false`.
pub async fn notify_best_effort(pool: &MySqlPool, n: NewNotification<'_>) -> bool {
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (employee_id, notification_type, title, message, related_id)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(n.employee_id)
    .bind(n.kind.as_ref())
    .bind(n.title)
    .bind(n.message)
    .bind(n.related_id)
    .execute(pool)
    .await;

    match result {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(
                error = %e,
                employee_id = n.employee_id,
                kind = %n.kind,
                "Failed to create notification"
            );
            false
        }
    }
}
