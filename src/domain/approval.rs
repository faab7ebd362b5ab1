//! Leave application status machine and the approval decision flow.
//!
//! ```text
//! pending ──approve──▶ approved
//!    │ └────reject───▶ rejected
//!    └──────cancel───▶ cancelled
//! ```
//!
//! Approval books the paid days against the balance in the same store
//! write as the status change.

use async_trait::async_trait;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use utoipa::ToSchema;

use super::Actor;
use super::balance::BalanceFigures;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(fmt = "Leave application is already {}", _0)]
pub struct TransitionError(pub LeaveStatus);

impl LeaveStatus {
    pub fn decide(self, action: ApprovalAction) -> Result<LeaveStatus, TransitionError> {
        match (self, action) {
            (LeaveStatus::Pending, ApprovalAction::Approve) => Ok(LeaveStatus::Approved),
            (LeaveStatus::Pending, ApprovalAction::Reject) => Ok(LeaveStatus::Rejected),
            (current, _) => Err(TransitionError(current)),
        }
    }

    pub fn cancel(self) -> Result<LeaveStatus, TransitionError> {
        match self {
            LeaveStatus::Pending => Ok(LeaveStatus::Cancelled),
            current => Err(TransitionError(current)),
        }
    }
}

/// What the decision flow needs to know about an application.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationSnapshot {
    pub id: u64,
    pub employee_id: u64,
    pub reporting_manager_id: Option<u64>,
    pub leave_type_id: u64,
    /// Balance year, taken from the start date.
    pub year: i32,
    pub days_count: f64,
    pub lop_days: f64,
    pub status: LeaveStatus,
    pub balance: Option<BalanceFigures>,
}

impl ApplicationSnapshot {
    /// Days that count against the balance.
    pub fn paid_days(&self) -> f64 {
        (self.days_count - self.lop_days).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub application_id: u64,
    pub employee_id: u64,
    pub leave_type_id: u64,
    pub year: i32,
    pub action: ApprovalAction,
    pub new_status: LeaveStatus,
    pub approver_user_id: u64,
    pub approver_employee_id: Option<u64>,
    pub remarks: Option<String>,
    /// Added to `used_days` when the decision is committed.
    pub days_to_book: f64,
}

/// Result of the conditional decision write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// Someone else decided or cancelled the application first.
    NotPending,
    /// The balance no longer covered the paid days at write time.
    BalanceChanged,
}

#[derive(Debug, Display)]
pub enum ApprovalError {
    #[display(fmt = "Leave application not found")]
    NotFound,
    #[display(fmt = "Not allowed to act on this leave application")]
    Forbidden,
    #[display(fmt = "{}", _0)]
    Transition(TransitionError),
    #[display(fmt = "Leave request not found or already processed")]
    AlreadyProcessed,
    #[display(
        fmt = "Insufficient balance: {} day(s) requested, {} available",
        requested,
        available
    )]
    InsufficientBalance { requested: f64, available: f64 },
    #[display(fmt = "Insufficient balance: the leave balance changed while approving")]
    BalanceChanged,
    #[display(fmt = "{}", _0)]
    Store(anyhow::Error),
}

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn load_application(&self, id: u64) -> anyhow::Result<Option<ApplicationSnapshot>>;

    /// Writes the decision only if the application is still pending and
    /// books `days_to_book` in the same transaction, only if the balance
    /// still covers it. Nothing is written unless the outcome is `Committed`.
    async fn commit_decision(&self, decision: &Decision) -> anyhow::Result<CommitOutcome>;

    /// Marks a pending application of `employee_id` as cancelled.
    async fn commit_cancellation(&self, application_id: u64, employee_id: u64)
    -> anyhow::Result<bool>;
}

/// HR/Admin may decide any application, everybody else only those of their
/// direct reports. Nobody decides their own.
pub fn can_decide(actor: &Actor, application: &ApplicationSnapshot) -> bool {
    if actor.employee_id == Some(application.employee_id) {
        return false;
    }
    if actor.role.is_hr_or_admin() {
        return true;
    }
    actor.employee_id.is_some() && application.reporting_manager_id == actor.employee_id
}

pub async fn decide_application<S: ApplicationStore + ?Sized>(
    store: &S,
    actor: &Actor,
    application_id: u64,
    action: ApprovalAction,
    remarks: Option<String>,
) -> Result<Decision, ApprovalError> {
    let application = store
        .load_application(application_id)
        .await
        .map_err(ApprovalError::Store)?
        .ok_or(ApprovalError::NotFound)?;

    if !can_decide(actor, &application) {
        return Err(ApprovalError::Forbidden);
    }

    let new_status = application
        .status
        .decide(action)
        .map_err(ApprovalError::Transition)?;

    let days_to_book = match action {
        ApprovalAction::Approve => application.paid_days(),
        ApprovalAction::Reject => 0.0,
    };

    if days_to_book > 0.0 {
        let available = application
            .balance
            .map(|b| b.available())
            .unwrap_or(0.0);
        if days_to_book > available {
            return Err(ApprovalError::InsufficientBalance {
                requested: days_to_book,
                available,
            });
        }
    }

    let decision = Decision {
        application_id,
        employee_id: application.employee_id,
        leave_type_id: application.leave_type_id,
        year: application.year,
        action,
        new_status,
        approver_user_id: actor.user_id,
        approver_employee_id: actor.employee_id,
        remarks: remarks
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty()),
        days_to_book,
    };

    match store
        .commit_decision(&decision)
        .await
        .map_err(ApprovalError::Store)?
    {
        CommitOutcome::Committed => Ok(decision),
        CommitOutcome::NotPending => Err(ApprovalError::AlreadyProcessed),
        CommitOutcome::BalanceChanged => Err(ApprovalError::BalanceChanged),
    }
}

pub async fn cancel_application<S: ApplicationStore + ?Sized>(
    store: &S,
    actor: &Actor,
    application_id: u64,
) -> Result<ApplicationSnapshot, ApprovalError> {
    let application = store
        .load_application(application_id)
        .await
        .map_err(ApprovalError::Store)?
        .ok_or(ApprovalError::NotFound)?;

    if actor.employee_id != Some(application.employee_id) {
        return Err(ApprovalError::Forbidden);
    }

    application
        .status
        .cancel()
        .map_err(ApprovalError::Transition)?;

    if !store
        .commit_cancellation(application_id, application.employee_id)
        .await
        .map_err(ApprovalError::Store)?
    {
        return Err(ApprovalError::AlreadyProcessed);
    }

    Ok(application)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryApplications {
        rows: Mutex<HashMap<u64, ApplicationSnapshot>>,
        /// Simulates another approver winning the race.
        lose_race: bool,
        /// Simulates the balance being spent between read and write.
        balance_drained: bool,
    }

    impl MemoryApplications {
        fn with(snapshot: ApplicationSnapshot) -> Self {
            let store = Self::default();
            store.rows.lock().unwrap().insert(snapshot.id, snapshot);
            store
        }

        fn get(&self, id: u64) -> ApplicationSnapshot {
            self.rows.lock().unwrap()[&id].clone()
        }
    }

    #[async_trait]
    impl ApplicationStore for MemoryApplications {
        async fn load_application(&self, id: u64) -> anyhow::Result<Option<ApplicationSnapshot>> {
            Ok(self.rows.lock().unwrap().get(&id).cloned())
        }

        async fn commit_decision(&self, decision: &Decision) -> anyhow::Result<CommitOutcome> {
            if self.lose_race {
                return Ok(CommitOutcome::NotPending);
            }
            let mut rows = self.rows.lock().unwrap();
            let row = rows.get_mut(&decision.application_id).unwrap();
            if row.status != LeaveStatus::Pending {
                return Ok(CommitOutcome::NotPending);
            }
            if self.balance_drained && decision.days_to_book > 0.0 {
                return Ok(CommitOutcome::BalanceChanged);
            }
            row.status = decision.new_status;
            if let Some(balance) = row.balance.as_mut() {
                balance.used_days += decision.days_to_book;
            }
            Ok(CommitOutcome::Committed)
        }

        async fn commit_cancellation(
            &self,
            application_id: u64,
            employee_id: u64,
        ) -> anyhow::Result<bool> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows.get_mut(&application_id).unwrap();
            if row.status != LeaveStatus::Pending || row.employee_id != employee_id {
                return Ok(false);
            }
            row.status = LeaveStatus::Cancelled;
            Ok(true)
        }
    }

    fn snapshot() -> ApplicationSnapshot {
        ApplicationSnapshot {
            id: 5,
            employee_id: 20,
            reporting_manager_id: Some(10),
            leave_type_id: 1,
            year: 2026,
            days_count: 3.0,
            lop_days: 0.0,
            status: LeaveStatus::Pending,
            balance: Some(BalanceFigures {
                entitled_days: 10.0,
                used_days: 2.0,
                carried_forward_days: 0.0,
                adjusted_days: 0.0,
            }),
        }
    }

    fn actor(role: Role, employee_id: Option<u64>) -> Actor {
        Actor {
            user_id: 1,
            role,
            employee_id,
        }
    }

    #[test]
    fn only_pending_applications_move() {
        use ApprovalAction::*;
        use LeaveStatus::*;

        assert_eq!(Pending.decide(Approve), Ok(Approved));
        assert_eq!(Pending.decide(Reject), Ok(Rejected));
        assert_eq!(Pending.cancel(), Ok(Cancelled));

        for terminal in [Approved, Rejected, Cancelled] {
            assert_eq!(terminal.decide(Approve), Err(TransitionError(terminal)));
            assert_eq!(terminal.decide(Reject), Err(TransitionError(terminal)));
            assert_eq!(terminal.cancel(), Err(TransitionError(terminal)));
        }
    }

    #[test]
    fn status_text_matches_stored_values() {
        use std::str::FromStr;
        assert_eq!(LeaveStatus::from_str("approved"), Ok(LeaveStatus::Approved));
        assert_eq!(LeaveStatus::Cancelled.as_ref(), "cancelled");
    }

    #[test]
    fn who_may_decide() {
        let app = snapshot();
        assert!(can_decide(&actor(Role::Hr, None), &app));
        assert!(can_decide(&actor(Role::Admin, Some(99)), &app));
        assert!(can_decide(&actor(Role::Manager, Some(10)), &app));
        assert!(!can_decide(&actor(Role::Manager, Some(11)), &app));
        assert!(!can_decide(&actor(Role::TeamMember, None), &app));
        // not even HR on their own request
        assert!(!can_decide(&actor(Role::Hr, Some(20)), &app));
    }

    #[actix_web::test]
    async fn approval_books_paid_days() {
        let mut app = snapshot();
        app.days_count = 4.0;
        app.lop_days = 1.5;
        let store = MemoryApplications::with(app);

        let decision = decide_application(
            &store,
            &actor(Role::Manager, Some(10)),
            5,
            ApprovalAction::Approve,
            Some("  enjoy  ".into()),
        )
        .await
        .unwrap();

        assert_eq!(decision.new_status, LeaveStatus::Approved);
        assert_eq!(decision.days_to_book, 2.5);
        assert_eq!(decision.remarks.as_deref(), Some("enjoy"));

        let stored = store.get(5);
        assert_eq!(stored.status, LeaveStatus::Approved);
        assert_eq!(stored.balance.unwrap().used_days, 4.5);
    }

    #[actix_web::test]
    async fn rejection_books_nothing() {
        let store = MemoryApplications::with(snapshot());

        let decision = decide_application(
            &store,
            &actor(Role::Hr, Some(1)),
            5,
            ApprovalAction::Reject,
            Some("   ".into()),
        )
        .await
        .unwrap();

        assert_eq!(decision.days_to_book, 0.0);
        assert_eq!(decision.remarks, None);
        assert_eq!(store.get(5).balance.unwrap().used_days, 2.0);
    }

    #[actix_web::test]
    async fn approval_refused_when_balance_would_go_negative() {
        let mut app = snapshot();
        app.days_count = 9.0;
        let store = MemoryApplications::with(app);

        let err = decide_application(
            &store,
            &actor(Role::Hr, None),
            5,
            ApprovalAction::Approve,
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            ApprovalError::InsufficientBalance { requested, available } if requested == 9.0 && available == 8.0
        ));
        assert_eq!(store.get(5).status, LeaveStatus::Pending);
    }

    #[actix_web::test]
    async fn fully_lop_request_needs_no_balance() {
        let mut app = snapshot();
        app.lop_days = 3.0;
        app.balance = None;
        let store = MemoryApplications::with(app);

        let decision =
            decide_application(&store, &actor(Role::Hr, None), 5, ApprovalAction::Approve, None)
                .await
                .unwrap();
        assert_eq!(decision.days_to_book, 0.0);
    }

    #[actix_web::test]
    async fn decided_applications_stay_decided() {
        let mut app = snapshot();
        app.status = LeaveStatus::Rejected;
        let store = MemoryApplications::with(app);

        let err =
            decide_application(&store, &actor(Role::Hr, None), 5, ApprovalAction::Approve, None)
                .await
                .unwrap_err();
        assert!(matches!(
            err,
            ApprovalError::Transition(TransitionError(LeaveStatus::Rejected))
        ));
    }

    #[actix_web::test]
    async fn lost_race_reports_already_processed() {
        let store = MemoryApplications {
            lose_race: true,
            ..MemoryApplications::with(snapshot())
        };

        let err =
            decide_application(&store, &actor(Role::Hr, None), 5, ApprovalAction::Reject, None)
                .await
                .unwrap_err();
        assert!(matches!(err, ApprovalError::AlreadyProcessed));
    }

    #[actix_web::test]
    async fn balance_spent_during_approval_is_a_conflict_not_a_failure() {
        let store = MemoryApplications {
            balance_drained: true,
            ..MemoryApplications::with(snapshot())
        };

        let err =
            decide_application(&store, &actor(Role::Hr, None), 5, ApprovalAction::Approve, None)
                .await
                .unwrap_err();
        assert!(matches!(err, ApprovalError::BalanceChanged));

        let stored = store.get(5);
        assert_eq!(stored.status, LeaveStatus::Pending);
        assert_eq!(stored.balance.unwrap().used_days, 2.0);
    }

    #[actix_web::test]
    async fn strangers_and_missing_rows() {
        let store = MemoryApplications::with(snapshot());

        let err = decide_application(
            &store,
            &actor(Role::TeamMember, Some(30)),
            5,
            ApprovalAction::Approve,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApprovalError::Forbidden));

        let err =
            decide_application(&store, &actor(Role::Hr, None), 6, ApprovalAction::Approve, None)
                .await
                .unwrap_err();
        assert!(matches!(err, ApprovalError::NotFound));
    }

    #[actix_web::test]
    async fn applicant_cancels_pending_request() {
        let store = MemoryApplications::with(snapshot());

        let err = cancel_application(&store, &actor(Role::Manager, Some(10)), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::Forbidden));

        cancel_application(&store, &actor(Role::TeamMember, Some(20)), 5)
            .await
            .unwrap();
        assert_eq!(store.get(5).status, LeaveStatus::Cancelled);

        let err = cancel_application(&store, &actor(Role::TeamMember, Some(20)), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::Transition(_)));
    }
}
