use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::{PoisonError, RwLock};

/// Expected capacity and false-positive rate.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static EMPLOYEE_CODE_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// Employee codes are compared case-insensitively and without surrounding blanks.
#[inline]
fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}

/// `false` means the code is certainly unused; `true` still needs a
/// database check.
pub fn might_exist(code: &str) -> bool {
    let code = normalize(code);
    EMPLOYEE_CODE_FILTER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(&code)
}

pub fn insert(code: &str) {
    let code = normalize(code);
    EMPLOYEE_CODE_FILTER
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .add(&code);
}

pub fn remove(code: &str) {
    let code = normalize(code);
    EMPLOYEE_CODE_FILTER
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&code);
}

/// Loads every existing employee code, streaming in batches.
pub async fn warmup_employee_code_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream =
        sqlx::query_as::<_, (String,)>("SELECT employee_code FROM employees").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (code,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(normalize(&code));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    log::info!("Employee code filter warmup complete: {} employees", total);
    Ok(())
}

fn insert_batch(codes: &[String]) {
    let mut filter = EMPLOYEE_CODE_FILTER
        .write()
        .unwrap_or_else(PoisonError::into_inner);

    for code in codes {
        filter.add(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_codes_are_found_regardless_of_case() {
        insert(" flt-0001 ");
        assert!(might_exist("FLT-0001"));
        assert!(might_exist("flt-0001"));
    }

    #[test]
    fn removed_codes_are_gone() {
        insert("FLT-0002");
        remove("flt-0002");
        assert!(!might_exist("FLT-0002"));
    }

    #[test]
    fn unknown_codes_are_absent() {
        assert!(!might_exist("FLT-NEVER-ADDED-42"));
    }
}
