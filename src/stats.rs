use std::collections::HashMap;

use chrono::{DateTime, Datelike, Days, Local, NaiveDate, NaiveDateTime, NaiveTime};
use itertools::Itertools;
use serde::Serialize;

use crate::models::{Exercise, WorkoutSession};
use crate::query::is_between;
use crate::utils::{format_date, format_duration};

/// Label every completed exercise gets when body parts are not resolved.
pub const PLACEHOLDER_BODY_PART: &str = "full-body";
/// Label for exercises missing from the catalog or carrying no tag.
pub const UNKNOWN_BODY_PART: &str = "unknown";

/// How completed exercises are attributed to body parts.
#[derive(Debug, Clone, Copy)]
pub enum BodyPartMode<'a> {
    /// Every completed exercise counts toward [`PLACEHOLDER_BODY_PART`].
    Placeholder,
    /// Look the body part up in the exercise catalog by id.
    Catalog(&'a [Exercise]),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsResponse {
    pub today_stats: DayStats,
    pub week_stats: WeekStats,
    pub month_stats: MonthStats,
    pub body_part_data: Vec<BodyPartStatistics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStats {
    pub date: String,
    pub total_time: String,
    pub workout_count: usize,
    pub exercises: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekStats {
    pub start_date: String,
    pub end_date: String,
    pub total_time: String,
    pub workout_count: usize,
    pub avg_per_day: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthStats {
    pub month: String,
    pub total_time: String,
    pub workout_count: usize,
    pub avg_per_day: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyPartStatistics {
    pub body_part: String,
    pub count: usize,
    pub percent: usize,
}

/// Summarize the whole session history relative to `now`.
///
/// Each bucket is computed independently over the full list; only completed
/// sessions count anywhere.
pub fn format_statistics(
    sessions: &[WorkoutSession],
    now: DateTime<Local>,
    body_parts: BodyPartMode<'_>,
) -> StatisticsResponse {
    let today = now.date_naive();
    let week_start = today - Days::new(u64::from(today.weekday().num_days_from_sunday()));
    let month_start = today.with_day(1).unwrap_or(today);
    let tomorrow = today + Days::new(1);

    StatisticsResponse {
        today_stats: day_stats(sessions, today),
        week_stats: week_stats(sessions, week_start, tomorrow),
        month_stats: month_stats(sessions, month_start, tomorrow),
        body_part_data: body_part_stats(sessions, body_parts),
    }
}

fn midnight(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

fn completed(sessions: &[WorkoutSession]) -> impl Iterator<Item = &WorkoutSession> {
    sessions.iter().filter(|s| s.is_completed)
}

/// Total seconds and session count for completed sessions strictly inside
/// `(start, end)`, both taken at midnight.
fn window_totals(sessions: &[WorkoutSession], start: NaiveDate, end: NaiveDate) -> (i64, usize) {
    let (start, end) = (midnight(start), midnight(end));
    completed(sessions)
        .filter(|s| is_between(s, start, end))
        .fold((0, 0), |(secs, n), s| (secs + s.total_time, n + 1))
}

fn day_stats(sessions: &[WorkoutSession], day: NaiveDate) -> DayStats {
    let mut total_time = 0;
    let mut workout_count = 0;
    let mut exercises = 0;

    for s in completed(sessions).filter(|s| s.date.date_naive() == day) {
        total_time += s.total_time;
        workout_count += 1;
        exercises += s.exercises.len();
    }

    DayStats {
        date: format_date(day),
        total_time: format_duration(total_time),
        workout_count,
        exercises,
    }
}

fn week_stats(sessions: &[WorkoutSession], start: NaiveDate, end: NaiveDate) -> WeekStats {
    let (total_time, workout_count) = window_totals(sessions, start, end);

    // Always over the full week, however many days of it have passed.
    let avg = if workout_count > 0 { total_time / 7 } else { 0 };

    WeekStats {
        start_date: format_date(start),
        end_date: format_date(end - Days::new(1)),
        total_time: format_duration(total_time),
        workout_count,
        avg_per_day: format_duration(avg),
    }
}

fn month_stats(sessions: &[WorkoutSession], start: NaiveDate, end: NaiveDate) -> MonthStats {
    let (total_time, workout_count) = window_totals(sessions, start, end);

    let avg = if workout_count > 0 {
        total_time / i64::from(days_in_month(start))
    } else {
        0
    };

    MonthStats {
        month: start.format("%Y-%m").to_string(),
        total_time: format_duration(total_time),
        workout_count,
        avg_per_day: format_duration(avg),
    }
}

/// Number of days in the month containing `day`.
pub fn days_in_month(day: NaiveDate) -> u32 {
    let first = day.with_day(1).unwrap_or(day);
    let next = first
        .checked_add_months(chrono::Months::new(1))
        .unwrap_or(first);
    next.signed_duration_since(first).num_days() as u32
}

fn body_part_stats(sessions: &[WorkoutSession], mode: BodyPartMode<'_>) -> Vec<BodyPartStatistics> {
    let catalog: HashMap<&str, &str> = match mode {
        BodyPartMode::Placeholder => HashMap::new(),
        BodyPartMode::Catalog(exercises) => exercises
            .iter()
            .map(|e| (e.id.as_str(), e.body_part.as_str()))
            .collect(),
    };

    let label = |exercise_id: &str| -> String {
        match mode {
            BodyPartMode::Placeholder => PLACEHOLDER_BODY_PART.to_string(),
            BodyPartMode::Catalog(_) => match catalog.get(exercise_id) {
                Some(part) if !part.trim().is_empty() => part.trim().to_string(),
                _ => UNKNOWN_BODY_PART.to_string(),
            },
        }
    };

    let counts = completed(sessions)
        .flat_map(|s| s.completed_exercises())
        .map(|e| label(&e.exercise_id))
        .counts();
    let total: usize = counts.values().sum();

    counts
        .into_iter()
        .map(|(body_part, count)| BodyPartStatistics {
            percent: if total > 0 { count * 100 / total } else { 0 },
            body_part,
            count,
        })
        .sorted_by(|a, b| b.count.cmp(&a.count).then_with(|| a.body_part.cmp(&b.body_part)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CompletedExercise;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn local(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, 0, 0).single().unwrap()
    }

    fn done(id: &str, date: DateTime<Local>, secs: i64, exercise_ids: &[&str]) -> WorkoutSession {
        let mut s = WorkoutSession::start(id.into(), "w".into(), date);
        s.is_completed = true;
        s.end_time = Some(date);
        s.total_time = secs;
        s.exercises = exercise_ids
            .iter()
            .map(|ex| CompletedExercise {
                exercise_id: ex.to_string(),
                completed_sets: 3,
                is_completed: true,
                ..Default::default()
            })
            .collect();
        s
    }

    fn catalog_entry(id: &str, body_part: &str) -> Exercise {
        Exercise {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            image_url: String::new(),
            body_part: body_part.into(),
            calories_per_rep: None,
            calories_per_minute: None,
            created_at: local(2024, 1, 1, 8),
        }
    }

    // Wednesday.
    fn now() -> DateTime<Local> {
        local(2024, 3, 13, 15)
    }

    #[test]
    fn today_counts_same_calendar_day_only() {
        let mut open = WorkoutSession::start("open".into(), "w".into(), local(2024, 3, 13, 7));
        open.total_time = 999;

        let sessions = vec![
            done("a", local(2024, 3, 13, 6), 1800, &["e1", "e2"]),
            done("b", local(2024, 3, 13, 20), 600, &["e3"]),
            done("yesterday", local(2024, 3, 12, 23), 5000, &["e1"]),
            open,
        ];

        let stats = format_statistics(&sessions, now(), BodyPartMode::Placeholder);
        assert_eq!(
            stats.today_stats,
            DayStats {
                date: "2024-03-13".into(),
                total_time: "40m 0s".into(),
                workout_count: 2,
                exercises: 3,
            }
        );
    }

    #[test]
    fn week_runs_from_sunday_through_today() {
        let sessions = vec![
            done("sat", local(2024, 3, 9, 12), 3600, &[]),
            done("sun", local(2024, 3, 10, 9), 1200, &[]),
            done("wed", local(2024, 3, 13, 9), 1200, &[]),
            done("thu", local(2024, 3, 14, 9), 1200, &[]),
        ];

        let week = format_statistics(&sessions, now(), BodyPartMode::Placeholder).week_stats;
        assert_eq!(week.start_date, "2024-03-10");
        assert_eq!(week.end_date, "2024-03-13");
        assert_eq!(week.workout_count, 2);
        assert_eq!(week.total_time, "40m 0s");
    }

    #[test]
    fn weekly_average_always_divides_by_seven() {
        // A single session on the week's first day, checked on that same day.
        let sunday = local(2024, 3, 10, 9);
        let sessions = vec![done("sun", sunday, 7000, &[])];

        let week = format_statistics(&sessions, local(2024, 3, 10, 18), BodyPartMode::Placeholder)
            .week_stats;
        assert_eq!(week.total_time, "1h 56m 40s");
        assert_eq!(week.avg_per_day, "16m 40s");
    }

    #[test]
    fn empty_history_averages_to_zero() {
        let stats = format_statistics(&[], now(), BodyPartMode::Placeholder);
        assert_eq!(stats.week_stats.avg_per_day, "0s");
        assert_eq!(stats.month_stats.avg_per_day, "0s");
        assert_eq!(stats.today_stats.workout_count, 0);
        assert!(stats.body_part_data.is_empty());
    }

    #[test]
    fn monthly_average_uses_days_in_month() {
        let cases = [
            (2023, 2, 28),
            (2024, 2, 29),
            (2024, 4, 30),
            (2024, 1, 31),
        ];

        for (year, month, days) in cases {
            // One minute per calendar day, logged on the 2nd, checked on the 3rd.
            let sessions = vec![done("s", local(year, month, 2, 10), 60 * days, &[])];
            let stats = format_statistics(&sessions, local(year, month, 3, 10), BodyPartMode::Placeholder);

            assert_eq!(stats.month_stats.avg_per_day, "1m 0s", "{year}-{month}");
            assert_eq!(stats.month_stats.month, format!("{year}-{month:02}"));
        }
    }

    #[test]
    fn month_window_excludes_other_months() {
        let sessions = vec![
            done("feb", local(2024, 2, 29, 10), 600, &[]),
            done("mar", local(2024, 3, 5, 10), 600, &[]),
            done("future", local(2024, 3, 20, 10), 600, &[]),
        ];

        let month = format_statistics(&sessions, now(), BodyPartMode::Placeholder).month_stats;
        assert_eq!(month.workout_count, 1);
        assert_eq!(month.total_time, "10m 0s");
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        let d = |y, m| NaiveDate::from_ymd_opt(y, m, 15).unwrap();
        assert_eq!(days_in_month(d(2024, 2)), 29);
        assert_eq!(days_in_month(d(2100, 2)), 28);
        assert_eq!(days_in_month(d(2024, 12)), 31);
        assert_eq!(days_in_month(d(2024, 11)), 30);
    }

    #[test]
    fn placeholder_mode_lumps_everything_together() {
        let mut partial = done("b", local(2024, 3, 11, 10), 60, &["e1", "e2"]);
        partial.exercises[1].is_completed = false;

        let sessions = vec![done("a", local(2024, 3, 10, 10), 60, &["e1", "e2", "e3"]), partial];
        let stats = format_statistics(&sessions, now(), BodyPartMode::Placeholder);

        assert_eq!(
            stats.body_part_data,
            vec![BodyPartStatistics {
                body_part: PLACEHOLDER_BODY_PART.into(),
                count: 4,
                percent: 100,
            }]
        );
    }

    #[test]
    fn catalog_mode_resolves_body_parts() {
        let catalog = vec![
            catalog_entry("bench", "chest"),
            catalog_entry("fly", "chest"),
            catalog_entry("squat", "legs"),
            catalog_entry("plank", ""),
        ];
        let sessions = vec![
            done("a", local(2024, 3, 10, 10), 60, &["bench", "fly", "squat"]),
            done("b", local(2024, 3, 11, 10), 60, &["bench", "plank", "gone"]),
        ];

        let data = format_statistics(&sessions, now(), BodyPartMode::Catalog(&catalog)).body_part_data;
        let rows: Vec<_> = data
            .iter()
            .map(|b| (b.body_part.as_str(), b.count, b.percent))
            .collect();
        assert_eq!(
            rows,
            [("chest", 3, 50), ("unknown", 2, 33), ("legs", 1, 16)]
        );
    }

    proptest! {
        /// Floored percentages fall short of 100 by less than one point per tag.
        #[test]
        fn prop_percentages_sum_to_about_100(
            picks in proptest::collection::vec(0usize..5, 1..60)
        ) {
            let parts = ["chest", "back", "legs", "arms", "core"];
            let catalog: Vec<_> = parts
                .iter()
                .map(|p| catalog_entry(p, p))
                .collect();
            let ids: Vec<&str> = picks.iter().map(|&i| parts[i]).collect();
            let sessions = vec![done("s", local(2024, 3, 12, 10), 60, &ids)];

            let data = format_statistics(&sessions, now(), BodyPartMode::Catalog(&catalog)).body_part_data;
            let sum: usize = data.iter().map(|b| b.percent).sum();
            let counted: usize = data.iter().map(|b| b.count).sum();

            prop_assert_eq!(counted, picks.len());
            prop_assert!(sum <= 100);
            prop_assert!(sum + data.len() > 100);
        }
    }
}
