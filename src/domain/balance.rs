//! Leave balance arithmetic.
//!
//! A balance row stores four quantities; the number of days an employee can
//! still take is always derived from them and never persisted.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Stored quantities of a leave balance row, in days (half-day granularity).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct BalanceFigures {
    #[schema(example = 18.0)]
    pub entitled_days: f64,
    #[schema(example = 4.5)]
    pub used_days: f64,
    #[schema(example = 2.0)]
    pub carried_forward_days: f64,
    #[schema(example = 0.0)]
    pub adjusted_days: f64,
}

impl BalanceFigures {
    /// Everything granted for the year: `entitled + carried_forward + adjusted`.
    pub fn total_entitlement(&self) -> f64 {
        self.entitled_days + self.carried_forward_days + self.adjusted_days
    }

    /// `entitled + carried_forward + adjusted - used`. May be negative.
    pub fn available(&self) -> f64 {
        self.total_entitlement() - self.used_days
    }

    /// Availability floored at zero. Only the team overview uses this; the
    /// employee and adjustment views show negative balances as they are.
    pub fn available_clamped(&self) -> f64 {
        self.available().max(0.0)
    }
}

/// True when `days` is finite and a whole number of half days.
pub fn is_half_day_multiple(days: f64) -> bool {
    days.is_finite() && (days * 2.0).fract() == 0.0
}

/// Loss-of-pay portion of a leave request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LopSplit {
    pub is_lop: bool,
    pub lop_days: f64,
}

/// Splits a request into paid and LOP days.
///
/// Unpaid leave types are LOP in full. For paid types, whatever exceeds the
/// non-negative part of `available` is LOP; a missing balance row counts as
/// nothing available.
pub fn split_lop(available: Option<f64>, requested: f64, is_paid: bool) -> LopSplit {
    let lop_days = if is_paid {
        let covered = available.unwrap_or(0.0).max(0.0);
        (requested - covered).max(0.0)
    } else {
        requested
    };

    LopSplit {
        is_lop: lop_days > 0.0,
        lop_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn figures(entitled: f64, used: f64, carried: f64, adjusted: f64) -> BalanceFigures {
        BalanceFigures {
            entitled_days: entitled,
            used_days: used,
            carried_forward_days: carried,
            adjusted_days: adjusted,
        }
    }

    #[test]
    fn available_sums_all_components() {
        let cases = [
            (figures(18.0, 4.5, 2.0, 0.0), 15.5),
            (figures(12.0, 0.0, 0.0, 1.5), 13.5),
            (figures(10.0, 10.0, 0.0, 0.0), 0.0),
            (figures(0.0, 0.0, 0.0, 0.0), 0.0),
            (figures(6.5, 2.0, 0.5, -3.0), 2.0),
        ];

        for (balance, expected) in cases {
            assert_eq!(balance.available(), expected, "{balance:?}");
        }
    }

    #[test]
    fn available_can_go_negative() {
        let balance = figures(5.0, 8.5, 0.0, -1.0);
        assert_eq!(balance.available(), -4.5);
        assert_eq!(balance.available_clamped(), 0.0);
    }

    #[test]
    fn clamped_matches_available_when_positive() {
        let balance = figures(20.0, 3.0, 1.0, 0.5);
        assert_eq!(balance.available_clamped(), balance.available());
        assert_eq!(balance.total_entitlement(), 21.5);
    }

    #[test]
    fn half_day_granularity() {
        assert!(is_half_day_multiple(0.5));
        assert!(is_half_day_multiple(3.0));
        assert!(is_half_day_multiple(-2.5));
        assert!(!is_half_day_multiple(0.25));
        assert!(!is_half_day_multiple(1.3));
        assert!(!is_half_day_multiple(f64::NAN));
        assert!(!is_half_day_multiple(f64::INFINITY));
    }

    #[test]
    fn lop_covers_only_the_shortfall() {
        assert_eq!(
            split_lop(Some(3.0), 5.0, true),
            LopSplit { is_lop: true, lop_days: 2.0 }
        );
        assert_eq!(
            split_lop(Some(10.0), 2.5, true),
            LopSplit { is_lop: false, lop_days: 0.0 }
        );
    }

    #[test]
    fn negative_or_missing_balance_makes_everything_lop() {
        assert_eq!(split_lop(Some(-2.0), 1.5, true).lop_days, 1.5);
        assert_eq!(split_lop(None, 4.0, true).lop_days, 4.0);
    }

    #[test]
    fn unpaid_types_are_lop_in_full() {
        let split = split_lop(Some(30.0), 2.0, false);
        assert!(split.is_lop);
        assert_eq!(split.lop_days, 2.0);
    }
}
