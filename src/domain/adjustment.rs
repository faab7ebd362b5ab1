//! Manual leave balance adjustments.
//!
//! The submitted value replaces `adjusted_days`; it is not added to it. The
//! audit trail is best effort: a failed audit write is logged and the
//! adjustment still stands.

use async_trait::async_trait;
use derive_more::Display;
use serde_json::json;

use super::audit::{AuditEntry, AuditSink, record_best_effort};
use super::balance::{BalanceFigures, is_half_day_multiple};

pub const MAX_REASON_LEN: usize = 500;

/// A balance row as the adjustment flow needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceRecord {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type_id: u64,
    pub year: i32,
    pub figures: BalanceFigures,
}

#[derive(Debug, Clone)]
pub struct AdjustmentRequest {
    pub balance_id: u64,
    pub adjusted_days: f64,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct AdjustmentOutcome {
    pub balance: BalanceRecord,
    pub previous_adjusted_days: f64,
    pub audit_recorded: bool,
}

#[derive(Debug, Display)]
pub enum AdjustmentError {
    #[display(fmt = "Leave balance not found")]
    NotFound,
    #[display(fmt = "{}", _0)]
    InvalidReason(&'static str),
    #[display(fmt = "Adjusted days must be a whole number of half days, got {}", _0)]
    InvalidDays(f64),
    #[display(fmt = "{}", _0)]
    Store(anyhow::Error),
}

#[async_trait]
pub trait BalanceStore: Send + Sync {
    async fn find_balance(&self, id: u64) -> anyhow::Result<Option<BalanceRecord>>;

    /// Overwrites `adjusted_days`; false when the row no longer exists.
    async fn set_adjusted_days(&self, id: u64, adjusted_days: f64) -> anyhow::Result<bool>;
}

/// Checks the request and returns the trimmed reason.
pub fn validate(request: &AdjustmentRequest) -> Result<String, AdjustmentError> {
    let reason = request.reason.trim();
    if reason.is_empty() {
        return Err(AdjustmentError::InvalidReason("Please provide a reason"));
    }
    if reason.chars().count() > MAX_REASON_LEN {
        return Err(AdjustmentError::InvalidReason(
            "Reason must be less than 500 characters",
        ));
    }
    if !is_half_day_multiple(request.adjusted_days) {
        return Err(AdjustmentError::InvalidDays(request.adjusted_days));
    }
    Ok(reason.to_string())
}

pub async fn adjust_balance<B, A>(
    balances: &B,
    audit: &A,
    actor_user_id: u64,
    request: AdjustmentRequest,
) -> Result<AdjustmentOutcome, AdjustmentError>
where
    B: BalanceStore + ?Sized,
    A: AuditSink + ?Sized,
{
    let reason = validate(&request)?;

    let mut balance = balances
        .find_balance(request.balance_id)
        .await
        .map_err(AdjustmentError::Store)?
        .ok_or(AdjustmentError::NotFound)?;

    let updated = balances
        .set_adjusted_days(balance.id, request.adjusted_days)
        .await
        .map_err(AdjustmentError::Store)?;
    if !updated {
        return Err(AdjustmentError::NotFound);
    }

    let previous_adjusted_days = balance.figures.adjusted_days;
    balance.figures.adjusted_days = request.adjusted_days;

    let entry = AuditEntry {
        user_id: Some(actor_user_id),
        table_name: "leave_balances",
        action: "balance_adjustment",
        record_id: Some(balance.id),
        old_values: Some(json!({ "adjusted_days": previous_adjusted_days })),
        new_values: Some(json!({ "adjusted_days": request.adjusted_days, "reason": reason })),
    };
    let audit_recorded = record_best_effort(audit, &entry).await;

    tracing::info!(
        balance_id = balance.id,
        employee_id = balance.employee_id,
        previous_adjusted_days,
        adjusted_days = request.adjusted_days,
        audit_recorded,
        "Leave balance adjusted"
    );

    Ok(AdjustmentOutcome {
        balance,
        previous_adjusted_days,
        audit_recorded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audit::testing::MemoryAudit;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MemoryBalances {
        rows: Mutex<HashMap<u64, BalanceRecord>>,
    }

    impl MemoryBalances {
        fn with(record: BalanceRecord) -> Self {
            let mut rows = HashMap::new();
            rows.insert(record.id, record);
            Self {
                rows: Mutex::new(rows),
            }
        }

        fn adjusted(&self, id: u64) -> f64 {
            self.rows.lock().unwrap()[&id].figures.adjusted_days
        }
    }

    #[async_trait]
    impl BalanceStore for MemoryBalances {
        async fn find_balance(&self, id: u64) -> anyhow::Result<Option<BalanceRecord>> {
            Ok(self.rows.lock().unwrap().get(&id).cloned())
        }

        async fn set_adjusted_days(&self, id: u64, adjusted_days: f64) -> anyhow::Result<bool> {
            match self.rows.lock().unwrap().get_mut(&id) {
                Some(row) => {
                    row.figures.adjusted_days = adjusted_days;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    fn record() -> BalanceRecord {
        BalanceRecord {
            id: 11,
            employee_id: 3,
            leave_type_id: 1,
            year: 2026,
            figures: BalanceFigures {
                entitled_days: 12.0,
                used_days: 4.0,
                carried_forward_days: 1.0,
                adjusted_days: 0.5,
            },
        }
    }

    fn request(days: f64, reason: &str) -> AdjustmentRequest {
        AdjustmentRequest {
            balance_id: 11,
            adjusted_days: days,
            reason: reason.to_string(),
        }
    }

    #[actix_web::test]
    async fn replaces_adjusted_days_and_writes_audit() {
        let store = MemoryBalances::with(record());
        let audit = MemoryAudit::default();

        let outcome = adjust_balance(&store, &audit, 99, request(-2.0, "  correction  "))
            .await
            .unwrap();

        assert_eq!(store.adjusted(11), -2.0);
        assert_eq!(outcome.previous_adjusted_days, 0.5);
        assert_eq!(outcome.balance.figures.available(), 12.0 + 1.0 - 2.0 - 4.0);
        assert!(outcome.audit_recorded);

        let entries = audit.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "balance_adjustment");
        assert_eq!(entries[0].record_id, Some(11));
        assert_eq!(entries[0].user_id, Some(99));
        assert_eq!(
            entries[0].new_values,
            Some(json!({ "adjusted_days": -2.0, "reason": "correction" }))
        );
    }

    #[actix_web::test]
    async fn rerunning_keeps_value_and_appends_audit_rows() {
        let store = MemoryBalances::with(record());
        let audit = MemoryAudit::default();

        for _ in 0..3 {
            adjust_balance(&store, &audit, 1, request(3.5, "year-end top up"))
                .await
                .unwrap();
        }

        assert_eq!(store.adjusted(11), 3.5);
        assert_eq!(audit.len(), 3);
    }

    #[actix_web::test]
    async fn audit_failure_does_not_fail_the_adjustment() {
        let store = MemoryBalances::with(record());
        let audit = MemoryAudit::broken();

        let outcome = adjust_balance(&store, &audit, 1, request(2.0, "manual fix"))
            .await
            .unwrap();

        assert!(!outcome.audit_recorded);
        assert_eq!(store.adjusted(11), 2.0);
    }

    #[actix_web::test]
    async fn unknown_balance_is_not_found() {
        let store = MemoryBalances::with(record());
        let audit = MemoryAudit::default();

        let err = adjust_balance(
            &store,
            &audit,
            1,
            AdjustmentRequest {
                balance_id: 404,
                adjusted_days: 1.0,
                reason: "x".into(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AdjustmentError::NotFound));
        assert_eq!(audit.len(), 0);
    }

    #[test]
    fn rejects_blank_or_long_reasons_and_odd_fractions() {
        assert!(matches!(
            validate(&request(1.0, "   ")),
            Err(AdjustmentError::InvalidReason(_))
        ));
        assert!(matches!(
            validate(&request(1.0, &"a".repeat(501))),
            Err(AdjustmentError::InvalidReason(_))
        ));
        assert!(matches!(
            validate(&request(0.3, "ok")),
            Err(AdjustmentError::InvalidDays(_))
        ));
        assert_eq!(validate(&request(-1.5, " ok ")).unwrap(), "ok");
    }
}
