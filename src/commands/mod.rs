use colored::Colorize;

use crate::error::StoreError;
use crate::models::{EntityKind, Exercise, Record, Workout, WorkoutSession};

pub mod config;
pub mod exercise;
pub mod session;
pub mod stats;
pub mod workout;

/// Something the user can refer to by list index, id or name.
pub trait Named: Record {
    fn name(&self) -> &str;
}

impl Named for Exercise {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Workout {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for WorkoutSession {
    // Sessions have no name; only index and id match.
    fn name(&self) -> &str {
        ""
    }
}

/// Resolve `key` as a 1-based index (from the matching `list`), an exact
/// id, or a case-insensitive name, in that order.
pub fn pick<'a, R: Named>(records: &'a [R], key: &str) -> Option<&'a R> {
    let key = key.trim();

    if let Ok(idx) = key.parse::<usize>() {
        if let Some(r) = idx.checked_sub(1).and_then(|i| records.get(i)) {
            return Some(r);
        }
    }

    records.iter().find(|r| r.id() == key).or_else(|| {
        records
            .iter()
            .find(|r| !r.name().is_empty() && r.name().eq_ignore_ascii_case(key))
    })
}

pub fn report_missing(kind: EntityKind, key: &str) {
    println!("{} no {} matching `{}`", "error:".red().bold(), kind, key);
}

/// Turn a `NotFound` into the usual one-line report; pass other errors on.
pub fn report_store_error(err: StoreError) -> anyhow::Result<()> {
    match err {
        StoreError::NotFound { kind, id } => {
            report_missing(kind, &id);
            Ok(())
        }
        other => Err(other.into()),
    }
}
