use chrono::NaiveDateTime;

use crate::models::WorkoutSession;

/// Sessions dated strictly after `start` and strictly before `end`.
///
/// Both endpoints are excluded: a caller wanting an inclusive last day must
/// pass midnight of the following day as `end`. Dates compare as local
/// wall-clock time.
pub fn in_range(
    sessions: impl IntoIterator<Item = WorkoutSession>,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Vec<WorkoutSession> {
    sessions
        .into_iter()
        .filter(|s| is_between(s, start, end))
        .collect()
}

pub(crate) fn is_between(session: &WorkoutSession, start: NaiveDateTime, end: NaiveDateTime) -> bool {
    let date = session.date.naive_local();
    date > start && date < end
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Local, NaiveDate, TimeZone};

    fn session(id: &str, date: DateTime<Local>) -> WorkoutSession {
        WorkoutSession::start(id.into(), "w".into(), date)
    }

    fn local(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, 0, 0).single().unwrap()
    }

    fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn boundaries_are_excluded() {
        let sessions = vec![
            session("on-start", local(2024, 1, 10, 0)),
            session("inside", local(2024, 1, 12, 18)),
            session("on-end", local(2024, 1, 15, 0)),
            session("after", local(2024, 1, 16, 9)),
        ];

        let picked = in_range(sessions, midnight(2024, 1, 10), midnight(2024, 1, 15));
        let ids: Vec<_> = picked.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["inside"]);
    }

    #[test]
    fn later_same_day_as_start_is_included() {
        let sessions = vec![session("morning", local(2024, 1, 10, 7))];

        let picked = in_range(sessions, midnight(2024, 1, 10), midnight(2024, 1, 11));
        assert_eq!(picked.len(), 1);
    }

    #[test]
    fn order_is_preserved() {
        let sessions = vec![
            session("b", local(2024, 2, 3, 10)),
            session("a", local(2024, 2, 2, 10)),
        ];

        let picked = in_range(sessions, midnight(2024, 2, 1), midnight(2024, 2, 5));
        let ids: Vec<_> = picked.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }
}
