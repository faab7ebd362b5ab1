//! Holiday calendar: state names, the built-in 2026 calendar, import
//! planning and regional opt-in rules.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use utoipa::ToSchema;

pub const MAX_REGIONAL_HOLIDAYS_PER_YEAR: usize = 6;
pub const IMPORT_BATCH_SIZE: usize = 50;

const BUILTIN_2026: &str = include_str!("../../data/holidays_2026.json");

pub const STATE_CODES: [(&str, &str); 37] = [
    ("AN", "Andaman and Nicobar Islands"),
    ("AP", "Andhra Pradesh"),
    ("AR", "Arunachal Pradesh"),
    ("AS", "Assam"),
    ("BR", "Bihar"),
    ("CG", "Chhattisgarh"),
    ("CH", "Chandigarh"),
    ("DD", "Daman and Diu"),
    ("DL", "Delhi"),
    ("DN", "Dadra and Nagar Haveli"),
    ("GA", "Goa"),
    ("GJ", "Gujarat"),
    ("HP", "Himachal Pradesh"),
    ("HR", "Haryana"),
    ("JH", "Jharkhand"),
    ("JK", "Jammu and Kashmir"),
    ("KA", "Karnataka"),
    ("KL", "Kerala"),
    ("LA", "Ladakh"),
    ("LD", "Lakshadweep"),
    ("MH", "Maharashtra"),
    ("ML", "Meghalaya"),
    ("MN", "Manipur"),
    ("MP", "Madhya Pradesh"),
    ("MZ", "Mizoram"),
    ("NL", "Nagaland"),
    ("OR", "Odisha"),
    ("PB", "Punjab"),
    ("PY", "Puducherry"),
    ("RJ", "Rajasthan"),
    ("SK", "Sikkim"),
    ("TG", "Telangana"),
    ("TN", "Tamil Nadu"),
    ("TR", "Tripura"),
    ("UK", "Uttarakhand"),
    ("UP", "Uttar Pradesh"),
    ("WB", "West Bengal"),
];

pub fn state_name(code: &str) -> Option<&'static str> {
    STATE_CODES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}

/// Full name for a known state code; anything else is returned unchanged,
/// so expanding twice gives the same result as expanding once.
pub fn expand_state(value: &str) -> String {
    let value = value.trim();
    state_name(value).unwrap_or(value).to_string()
}

pub fn expand_states(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| expand_state(v))
        .filter(|v| !v.is_empty())
        .collect()
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HolidayType {
    National,
    Regional,
    Company,
}

/// A holiday before it has a row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HolidaySeed {
    #[schema(example = "Republic Day")]
    pub name: String,
    #[schema(value_type = String, format = "date", example = "2026-01-26")]
    pub date: NaiveDate,
    pub is_national: bool,
    pub is_optional: bool,
    pub states: Option<Vec<String>>,
    pub holiday_type: HolidayType,
}

impl HolidaySeed {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// National holidays apply everywhere; others only in the listed states.
    pub fn applies_to_state(&self, state: &str) -> bool {
        if self.is_national {
            return true;
        }
        let wanted = expand_state(state);
        self.states
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|s| expand_state(s).eq_ignore_ascii_case(&wanted))
    }
}

/// The 2026 calendar shipped with the service, states given by full name.
pub fn builtin_holidays_2026() -> anyhow::Result<Vec<HolidaySeed>> {
    let mut seeds: Vec<HolidaySeed> = serde_json::from_str(BUILTIN_2026)?;
    for seed in &mut seeds {
        if let Some(states) = seed.states.as_mut() {
            *states = expand_states(states);
        }
    }
    Ok(seeds)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportPlan {
    pub to_insert: Vec<HolidaySeed>,
    pub skipped: usize,
}

impl ImportPlan {
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty()
    }

    pub fn batches(&self) -> std::slice::Chunks<'_, HolidaySeed> {
        self.to_insert.chunks(IMPORT_BATCH_SIZE)
    }
}

/// Drops candidates whose `(name, date)` is already stored or appeared
/// earlier in the same batch.
pub fn plan_import(existing: &[(String, NaiveDate)], candidates: Vec<HolidaySeed>) -> ImportPlan {
    let mut seen: HashSet<(String, NaiveDate)> = existing.iter().cloned().collect();
    let total = candidates.len();

    let to_insert: Vec<HolidaySeed> = candidates
        .into_iter()
        .filter(|h| seen.insert((h.name.clone(), h.date)))
        .collect();

    ImportPlan {
        skipped: total - to_insert.len(),
        to_insert,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum OptInError {
    #[display(fmt = "Only optional regional holidays can be opted into")]
    NotRegional,
    #[display(fmt = "This holiday does not apply to your state")]
    OutsideState,
    #[display(
        fmt = "You can opt for at most {} regional holidays per year",
        MAX_REGIONAL_HOLIDAYS_PER_YEAR
    )]
    LimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptInOutcome {
    Recorded,
    Refused(OptInError),
    AlreadyOptedIn,
    UnknownEmployee,
}

/// The opt-in rule as the store sees it: employee state and opt-ins already
/// held in the year.
pub type OptInRule<'a> = &'a (dyn Fn(Option<&str>, usize) -> Result<(), OptInError> + Sync);

#[async_trait]
pub trait OptInStore: Send + Sync {
    /// Reads the employee's state and their opt-ins for `year`, asks `rule`
    /// and inserts the opt-in when allowed, all while holding a lock on the
    /// employee so concurrent opt-ins cannot both pass the yearly cap.
    async fn record_opt_in(
        &self,
        employee_id: u64,
        holiday_id: u64,
        year: i32,
        rule: OptInRule<'_>,
    ) -> anyhow::Result<OptInOutcome>;
}

pub async fn request_opt_in<S: OptInStore + ?Sized>(
    store: &S,
    employee_id: u64,
    holiday_id: u64,
    year: i32,
    holiday: &HolidaySeed,
) -> anyhow::Result<OptInOutcome> {
    let rule: OptInRule<'_> = &|state, already| check_opt_in(holiday, state, already);
    store.record_opt_in(employee_id, holiday_id, year, rule).await
}

/// Checks one more opt-in for an employee who already holds
/// `already_opted` opt-ins in the holiday's year.
pub fn check_opt_in(
    holiday: &HolidaySeed,
    employee_state: Option<&str>,
    already_opted: usize,
) -> Result<(), OptInError> {
    if holiday.is_national || !holiday.is_optional || holiday.holiday_type != HolidayType::Regional
    {
        return Err(OptInError::NotRegional);
    }
    if let Some(state) = employee_state.filter(|s| !s.trim().is_empty()) {
        if !holiday.applies_to_state(state) {
            return Err(OptInError::OutsideState);
        }
    }
    if already_opted >= MAX_REGIONAL_HOLIDAYS_PER_YEAR {
        return Err(OptInError::LimitReached);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn regional(name: &str, day: NaiveDate, states: &[&str]) -> HolidaySeed {
        HolidaySeed {
            name: name.into(),
            date: day,
            is_national: false,
            is_optional: true,
            states: Some(states.iter().map(|s| s.to_string()).collect()),
            holiday_type: HolidayType::Regional,
        }
    }

    #[test]
    fn expansion_is_idempotent() {
        let raw = vec!["KA".to_string(), "tn".to_string(), "Atlantis".to_string()];
        let once = expand_states(&raw);
        assert_eq!(once, vec!["Karnataka", "Tamil Nadu", "Atlantis"]);
        assert_eq!(expand_states(&once), once);
        assert_eq!(expand_state("West Bengal"), "West Bengal");
    }

    #[test]
    fn builtin_calendar_loads_with_full_state_names() {
        let seeds = builtin_holidays_2026().unwrap();
        assert_eq!(seeds.len(), 158);
        assert_eq!(seeds.iter().filter(|h| h.is_national).count(), 3);
        assert!(seeds.iter().all(|h| h.year() == 2026));

        let pongal = seeds.iter().find(|h| h.name == "Pongal").unwrap();
        assert!(pongal.states.as_ref().unwrap().contains(&"Tamil Nadu".to_string()));
        assert!(
            seeds
                .iter()
                .flat_map(|h| h.states.iter().flatten())
                .all(|s| s.len() > 2)
        );
    }

    #[test]
    fn import_skips_existing_and_repeated_pairs() {
        let existing = vec![("Holi".to_string(), date(2026, 3, 3))];
        let candidates = vec![
            regional("Holi", date(2026, 3, 3), &["UP"]),
            regional("State Day", date(2026, 1, 25), &["HP"]),
            regional("State Day", date(2026, 2, 20), &["MZ"]),
            regional("State Day", date(2026, 1, 25), &["HP"]),
        ];

        let plan = plan_import(&existing, candidates);
        assert_eq!(plan.skipped, 2);
        assert_eq!(plan.to_insert.len(), 2);
        assert_eq!(plan.to_insert[1].date, date(2026, 2, 20));
    }

    #[test]
    fn reimporting_everything_is_a_no_op() {
        let seeds = builtin_holidays_2026().unwrap();
        let existing: Vec<_> = seeds.iter().map(|h| (h.name.clone(), h.date)).collect();

        let first = plan_import(&[], seeds.clone());
        assert_eq!(first.batches().count(), 4);
        assert!(first.batches().all(|b| b.len() <= IMPORT_BATCH_SIZE));

        let again = plan_import(&existing, seeds);
        assert!(again.is_empty());
        assert_eq!(again.skipped, 158);
    }

    #[test]
    fn opt_in_rules() {
        let onam = regional("Onam", date(2026, 8, 26), &["Kerala"]);

        assert_eq!(check_opt_in(&onam, Some("KL"), 0), Ok(()));
        assert_eq!(check_opt_in(&onam, Some("Kerala"), 5), Ok(()));
        assert_eq!(check_opt_in(&onam, None, 0), Ok(()));
        assert_eq!(
            check_opt_in(&onam, Some("Goa"), 0),
            Err(OptInError::OutsideState)
        );
        assert_eq!(
            check_opt_in(&onam, Some("KL"), MAX_REGIONAL_HOLIDAYS_PER_YEAR),
            Err(OptInError::LimitReached)
        );

        let republic_day = HolidaySeed {
            name: "Republic Day".into(),
            date: date(2026, 1, 26),
            is_national: true,
            is_optional: false,
            states: None,
            holiday_type: HolidayType::National,
        };
        assert_eq!(
            check_opt_in(&republic_day, None, 0),
            Err(OptInError::NotRegional)
        );
        assert!(republic_day.applies_to_state("Goa"));
    }

    /// (employee id, holiday id, year) rows behind one lock, like the
    /// employee row lock of the MySQL store.
    #[derive(Default)]
    struct MemoryOptIns {
        rows: std::sync::Mutex<Vec<(u64, u64, i32)>>,
    }

    impl MemoryOptIns {
        fn record(
            &self,
            employee_id: u64,
            holiday_id: u64,
            year: i32,
            rule: OptInRule<'_>,
        ) -> OptInOutcome {
            let mut rows = self.rows.lock().unwrap();
            if rows.iter().any(|r| r.0 == employee_id && r.1 == holiday_id) {
                return OptInOutcome::AlreadyOptedIn;
            }
            let held = rows
                .iter()
                .filter(|r| r.0 == employee_id && r.2 == year)
                .count();
            if let Err(refusal) = rule(Some("Kerala"), held) {
                return OptInOutcome::Refused(refusal);
            }
            rows.push((employee_id, holiday_id, year));
            OptInOutcome::Recorded
        }
    }

    #[async_trait]
    impl OptInStore for MemoryOptIns {
        async fn record_opt_in(
            &self,
            employee_id: u64,
            holiday_id: u64,
            year: i32,
            rule: OptInRule<'_>,
        ) -> anyhow::Result<OptInOutcome> {
            Ok(self.record(employee_id, holiday_id, year, rule))
        }
    }

    #[actix_web::test]
    async fn concurrent_opt_ins_stop_at_the_yearly_cap() {
        let store = MemoryOptIns::default();
        for holiday_id in 1..=5 {
            store.rows.lock().unwrap().push((7, holiday_id, 2026));
        }
        let onam = regional("Onam", date(2026, 8, 26), &["Kerala"]);

        let outcomes = futures::future::join_all(
            (10..13).map(|holiday_id| request_opt_in(&store, 7, holiday_id, 2026, &onam)),
        )
        .await;

        let recorded = outcomes
            .iter()
            .filter(|o| matches!(o, Ok(OptInOutcome::Recorded)))
            .count();
        let capped = outcomes
            .iter()
            .filter(|o| matches!(o, Ok(OptInOutcome::Refused(OptInError::LimitReached))))
            .count();
        assert_eq!((recorded, capped), (1, 2));
        assert_eq!(store.rows.lock().unwrap().len(), MAX_REGIONAL_HOLIDAYS_PER_YEAR);
    }

    #[actix_web::test]
    async fn repeated_opt_in_is_reported_not_counted() {
        let store = MemoryOptIns::default();
        let onam = regional("Onam", date(2026, 8, 26), &["Kerala"]);

        let first = request_opt_in(&store, 7, 3, 2026, &onam).await.unwrap();
        let second = request_opt_in(&store, 7, 3, 2026, &onam).await.unwrap();
        assert_eq!(first, OptInOutcome::Recorded);
        assert_eq!(second, OptInOutcome::AlreadyOptedIn);

        let goa_only = regional("Bonderam", date(2026, 8, 22), &["Goa"]);
        assert_eq!(
            request_opt_in(&store, 7, 4, 2026, &goa_only).await.unwrap(),
            OptInOutcome::Refused(OptInError::OutsideState)
        );
    }
}
