use std::collections::HashMap;

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use crate::{
    OutputFmt, Repository,
    cli::WorkoutCmd,
    clock::Clock,
    commands::{pick, report_missing, report_store_error},
    models::{EntityKind, ExerciseSet, Workout},
    storage::CollectionStore,
    types::emit,
};

#[derive(Serialize)]
struct WorkoutJson<'a> {
    idx: usize,
    #[serde(flatten)]
    workout: &'a Workout,
}

pub async fn handle<S: CollectionStore, C: Clock>(
    cmd: WorkoutCmd,
    repo: &Repository<S, C>,
    fmt: OutputFmt,
) -> Result<()> {
    match cmd {
        WorkoutCmd::Add {
            name,
            desc,
            body_part,
        } => {
            let draft = Workout {
                id: String::new(),
                name,
                description: desc.unwrap_or_default(),
                body_part: body_part.map(|p| p.to_string()).unwrap_or_default(),
                exercises: Vec::new(),
                created_at: repo.clock().now(),
            };
            let w = repo.create_workout(draft).await?;

            emit(fmt, &w, || {
                println!(
                    "{} Workout \"{}\" created — add exercises with `w add-ex`",
                    "info:".blue().bold(),
                    w.name
                )
            })?;
        }

        WorkoutCmd::AddEx {
            workout,
            exercise,
            sets,
            reps,
            weight,
            rest,
        } => {
            let workouts = repo.get_all_workouts().await?;
            let Some(w) = pick(&workouts, &workout) else {
                report_missing(EntityKind::Workout, &workout);
                return Ok(());
            };
            let exercises = repo.get_all_exercises().await?;
            let Some(ex) = pick(&exercises, &exercise) else {
                report_missing(EntityKind::Exercise, &exercise);
                return Ok(());
            };

            let mut updated = w.clone();
            updated.exercises.push(ExerciseSet {
                exercise_id: ex.id.clone(),
                sets,
                reps,
                weight,
                rest_time: rest,
            });

            match repo.update_workout(&w.id, updated).await {
                Ok(w) => emit(fmt, &w, || {
                    println!(
                        "{} added {} ({}x{}) to \"{}\"",
                        "info:".blue().bold(),
                        ex.name.green(),
                        sets,
                        reps,
                        w.name
                    )
                })?,
                Err(e) => return report_store_error(e),
            }
        }

        WorkoutCmd::List => {
            let workouts = repo.get_all_workouts().await?;
            let rows: Vec<WorkoutJson> = workouts
                .iter()
                .enumerate()
                .map(|(i, w)| WorkoutJson {
                    idx: i + 1,
                    workout: w,
                })
                .collect();

            emit(fmt, &rows, || {
                if rows.is_empty() {
                    println!("{}", "  (no workouts found)".dimmed());
                    return;
                }
                println!("{}", "Workouts:".cyan().bold());
                for row in &rows {
                    let w = row.workout;
                    let tag = if w.body_part.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", w.body_part)
                    };
                    println!(
                        "{:>3}. {}{} {}",
                        row.idx,
                        w.name.bold(),
                        tag.cyan(),
                        format!("({} exercises)", w.exercises.len()).dimmed()
                    );
                }
            })?;
        }

        WorkoutCmd::Show { workout } => {
            let workouts = repo.get_all_workouts().await?;
            let Some(w) = pick(&workouts, &workout) else {
                report_missing(EntityKind::Workout, &workout);
                return Ok(());
            };
            let names: HashMap<String, String> = repo
                .get_all_exercises()
                .await?
                .into_iter()
                .map(|e| (e.id, e.name))
                .collect();

            emit(fmt, w, || {
                println!("{}", w.name.bold().cyan());
                if !w.description.is_empty() {
                    println!("{}", w.description.dimmed());
                }
                for (i, set) in w.exercises.iter().enumerate() {
                    let name = names
                        .get(&set.exercise_id)
                        .map(String::as_str)
                        .unwrap_or("(deleted exercise)");
                    println!(
                        "  {}. {} — {}x{} @ {}kg, rest {}s",
                        i + 1,
                        name.bold(),
                        set.sets,
                        set.reps,
                        set.weight,
                        set.rest_time
                    );
                }
            })?;
        }

        WorkoutCmd::Delete { workout } => {
            let workouts = repo.get_all_workouts().await?;
            let Some(w) = pick(&workouts, &workout) else {
                report_missing(EntityKind::Workout, &workout);
                return Ok(());
            };

            if let Err(e) = repo.delete_workout(&w.id).await {
                return report_store_error(e);
            }
            println!("{} Workout \"{}\" deleted", "info:".blue().bold(), w.name);
        }
    }

    Ok(())
}
