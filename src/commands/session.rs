use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;
use colored::Colorize;
use serde::Serialize;
use tracing::warn;

use crate::{
    OutputFmt, Repository,
    cli::SessionCmd,
    clock::Clock,
    commands::{pick, report_missing, report_store_error},
    models::{CompletedExercise, EntityKind, WorkoutSession},
    storage::CollectionStore,
    types::emit,
    utils::{format_date, format_duration, format_time, parse_day},
};

#[derive(Serialize)]
struct SessionJson<'a> {
    idx: usize,
    #[serde(flatten)]
    session: &'a WorkoutSession,
}

/// Both bounds must parse for the list to be filtered; anything else lists
/// every session.
fn day_filter(start: Option<&str>, end: Option<&str>) -> Option<(NaiveDate, NaiveDate)> {
    let (a, b) = (start?, end?);
    match (parse_day(a), parse_day(b)) {
        (Some(first), Some(last)) => Some((first, last)),
        _ => {
            warn!(start = a, end = b, "invalid date filter, listing every session");
            None
        }
    }
}

fn status_badge(s: &WorkoutSession) -> colored::ColoredString {
    if s.is_completed {
        "done".green()
    } else {
        "open".yellow()
    }
}

pub async fn handle<S: CollectionStore, C: Clock>(
    cmd: SessionCmd,
    repo: &Repository<S, C>,
    fmt: OutputFmt,
) -> Result<()> {
    match cmd {
        SessionCmd::Start { workout } => {
            let workouts = repo.get_all_workouts().await?;
            let Some(w) = pick(&workouts, &workout) else {
                report_missing(EntityKind::Workout, &workout);
                return Ok(());
            };

            let session = match repo.start_session(&w.id).await {
                Ok(s) => s,
                Err(e) => return report_store_error(e),
            };

            emit(fmt, &session, || {
                println!(
                    "{} Started session {} ({}) at {}",
                    "info:".blue().bold(),
                    session.id.dimmed(),
                    w.name.bold(),
                    format_time(session.start_time)
                )
            })?;
        }

        SessionCmd::Log {
            session,
            exercise,
            reps,
            rest,
            calories,
        } => {
            let sessions = repo.get_all_sessions().await?;
            let Some(current) = pick(&sessions, &session) else {
                report_missing(EntityKind::Session, &session);
                return Ok(());
            };
            let catalog = repo.get_all_exercises().await?;
            let Some(ex) = pick(&catalog, &exercise) else {
                report_missing(EntityKind::Exercise, &exercise);
                return Ok(());
            };

            if current.is_completed {
                println!(
                    "{} session is already completed; logging anyway",
                    "warning:".yellow().bold()
                );
            }

            let logged = CompletedExercise {
                exercise_id: ex.id.clone(),
                completed_sets: reps.len() as u32,
                completed_reps: reps,
                actual_rest_times: rest,
                calories_burned: 0.0,
                is_completed: true,
            };
            let burned = calories.unwrap_or_else(|| logged.estimate_calories(ex));

            let mut updated = current.clone();
            match updated
                .exercises
                .iter_mut()
                .find(|e| e.exercise_id == ex.id)
            {
                Some(entry) => {
                    entry.completed_reps.extend(&logged.completed_reps);
                    entry.actual_rest_times.extend(&logged.actual_rest_times);
                    entry.completed_sets = entry.completed_reps.len() as u32;
                    entry.calories_burned += burned;
                    entry.is_completed = true;
                }
                None => updated.exercises.push(CompletedExercise {
                    calories_burned: burned,
                    ..logged.clone()
                }),
            }

            let saved = match repo.update_session(&current.id, updated).await {
                Ok(s) => s,
                Err(e) => return report_store_error(e),
            };

            emit(fmt, &saved, || {
                println!(
                    "{} logged {} set(s) of {} — {:.1} kcal (session total {:.1})",
                    "info:".blue().bold(),
                    logged.completed_sets,
                    ex.name.green(),
                    burned,
                    saved.total_calories
                )
            })?;
        }

        SessionCmd::Note { session, note } => {
            let sessions = repo.get_all_sessions().await?;
            let Some(current) = pick(&sessions, &session) else {
                report_missing(EntityKind::Session, &session);
                return Ok(());
            };

            let mut updated = current.clone();
            updated.notes = note;
            if let Err(e) = repo.update_session(&current.id, updated).await {
                return report_store_error(e);
            }
            println!("{} note saved", "info:".blue().bold());
        }

        SessionCmd::Finish { session } => {
            let sessions = repo.get_all_sessions().await?;
            let Some(current) = pick(&sessions, &session) else {
                report_missing(EntityKind::Session, &session);
                return Ok(());
            };

            if current.is_completed {
                println!(
                    "{} session was already completed",
                    "warning:".yellow().bold()
                );
            }

            let mut updated = current.clone();
            updated.is_completed = true;
            let saved = match repo.update_session(&current.id, updated).await {
                Ok(s) => s,
                Err(e) => return report_store_error(e),
            };

            emit(fmt, &saved, || {
                println!(
                    "{} Finished session in {} ({:.1} kcal)",
                    "ok:".green().bold(),
                    format_duration(saved.total_time),
                    saved.total_calories
                )
            })?;
        }

        SessionCmd::Show { session } => {
            let sessions = repo.get_all_sessions().await?;
            let Some(s) = pick(&sessions, &session) else {
                report_missing(EntityKind::Session, &session);
                return Ok(());
            };
            let names: HashMap<String, String> = repo
                .get_all_exercises()
                .await?
                .into_iter()
                .map(|e| (e.id, e.name))
                .collect();
            let workout_name = repo
                .get_workout_by_id(&s.workout_id)
                .await
                .map(|w| w.name)
                .unwrap_or_else(|_| "(deleted workout)".to_string());

            emit(fmt, s, || {
                println!(
                    "🏋️ {} — {} [{}]",
                    workout_name.bold(),
                    format_date(s.date.date_naive()),
                    status_badge(s)
                );
                println!("⏱ Started: {}", format_time(s.start_time));
                if let Some(end) = s.end_time {
                    println!(
                        "🏁 Finished: {} ({})",
                        format_time(end),
                        format_duration(s.total_time)
                    );
                }

                for (i, e) in s.exercises.iter().enumerate() {
                    let name = names
                        .get(&e.exercise_id)
                        .map(String::as_str)
                        .unwrap_or("(deleted exercise)");
                    let mark = if e.is_completed { "✓".green() } else { "·".dimmed() };
                    let reps = e
                        .completed_reps
                        .iter()
                        .map(u32::to_string)
                        .collect::<Vec<_>>()
                        .join("/");
                    println!(
                        "  {} {}. {} {} {}",
                        mark,
                        i + 1,
                        name,
                        reps.dimmed(),
                        format!("{:.1} kcal", e.calories_burned).dimmed()
                    );
                }

                if !s.notes.is_empty() {
                    println!("  {}", s.notes.dimmed());
                }
            })?;
        }

        SessionCmd::List { start, end } => {
            let all = repo.get_all_sessions().await?;
            let index_of: HashMap<&str, usize> = all
                .iter()
                .enumerate()
                .map(|(i, s)| (s.id.as_str(), i + 1))
                .collect();

            let picked = match day_filter(start.as_deref(), end.as_deref()) {
                Some((first, last)) => repo.get_sessions_between_days(first, last).await?,
                None => all.clone(),
            };

            let rows: Vec<SessionJson> = picked
                .iter()
                .map(|s| SessionJson {
                    idx: index_of.get(s.id.as_str()).copied().unwrap_or(0),
                    session: s,
                })
                .collect();

            emit(fmt, &rows, || {
                if rows.is_empty() {
                    println!("{}", "  (no sessions found)".dimmed());
                    return;
                }
                println!("{}", "Sessions:".cyan().bold());
                for row in &rows {
                    let s = row.session;
                    println!(
                        "{:>3}. {} {} [{}] {} {}",
                        row.idx,
                        format_date(s.date.date_naive()).green(),
                        format_time(s.start_time),
                        status_badge(s),
                        format_duration(s.total_time),
                        format!("{} exercises", s.exercises.len()).dimmed()
                    );
                }
            })?;
        }

        SessionCmd::Delete { session } => {
            let sessions = repo.get_all_sessions().await?;
            let Some(s) = pick(&sessions, &session) else {
                report_missing(EntityKind::Session, &session);
                return Ok(());
            };

            if let Err(e) = repo.delete_session(&s.id).await {
                return report_store_error(e);
            }
            println!("{} session {} deleted", "info:".blue().bold(), s.id.dimmed());
        }
    }

    Ok(())
}
