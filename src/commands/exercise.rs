use std::collections::BTreeSet;

use crate::{
    OutputFmt, Repository,
    cli::ExerciseCmd,
    clock::Clock,
    commands::{pick, report_missing, report_store_error},
    config::Settings,
    media,
    models::{EntityKind, Exercise},
    storage::CollectionStore,
    types::{ExerciseImport, best_body_part_suggestion, canonical_body_part, emit},
};
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use tracing::warn;

#[derive(Serialize)]
struct ExJson<'a> {
    idx: usize,
    #[serde(flatten)]
    exercise: &'a Exercise,
}

fn print_exercise(idx: usize, ex: &Exercise) {
    println!(
        "{:>3}. {} {}",
        idx,
        ex.name.bold(),
        format!("[{}]", ex.body_part).cyan()
    );
    if !ex.description.is_empty() {
        println!("     {}", ex.description.dimmed());
    }
}

pub async fn handle<S: CollectionStore, C: Clock>(
    cmd: ExerciseCmd,
    repo: &Repository<S, C>,
    settings: &Settings,
    fmt: OutputFmt,
) -> Result<()> {
    match cmd {
        ExerciseCmd::Add {
            name,
            body_part,
            desc,
            image,
            cal_per_rep,
            cal_per_min,
        } => {
            let existing = repo.get_all_exercises().await?;
            if existing.iter().any(|e| e.name.eq_ignore_ascii_case(&name)) {
                println!(
                    "{} Exercise \"{}\" already exists — use `ex list` to view all exercises",
                    "warning:".yellow().bold(),
                    name
                );
                return Ok(());
            }

            let draft = Exercise {
                id: String::new(),
                name,
                description: desc.unwrap_or_default(),
                image_url: image.unwrap_or_default(),
                body_part: body_part.to_string(),
                calories_per_rep: cal_per_rep,
                calories_per_minute: cal_per_min,
                created_at: repo.clock().now(),
            };
            let ex = repo.create_exercise(draft).await?;

            emit(fmt, &ex, || {
                println!("{} Exercise \"{}\" added", "info:".blue().bold(), ex.name)
            })?;
        }

        ExerciseCmd::Import { file } => {
            let toml_str = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Could not read file: `{}`", file.display()))?;

            let import: ExerciseImport = toml::from_str(&toml_str)
                .context("Failed to parse TOML: Expected `[[exercise]] entries`")?;

            if import.exercise.is_empty() {
                println!("{}", "warning: no [[exercise]] entries found".yellow().bold());
                return Ok(());
            }

            let mut known: BTreeSet<String> = repo
                .get_all_exercises()
                .await?
                .into_iter()
                .map(|e| e.name.to_ascii_lowercase())
                .collect();

            let mut inserted = 0;
            let mut skipped = 0;
            let mut unknowns: BTreeSet<String> = BTreeSet::new();

            for def in import.exercise {
                if def.name.trim().is_empty() {
                    warn!("skipping exercise with empty name");
                    skipped += 1;
                    continue;
                }

                let Some(part) = canonical_body_part(&def.body_part) else {
                    match best_body_part_suggestion(&def.body_part) {
                        Some(sug) => println!(
                            "{} `{}` skipped – unknown body part `{}` -- did you mean: `{}`?",
                            "warning:".yellow().bold(),
                            def.name,
                            def.body_part,
                            sug.green()
                        ),
                        None => println!(
                            "{} `{}` skipped – unknown body part `{}`",
                            "warning:".yellow().bold(),
                            def.name,
                            def.body_part
                        ),
                    }
                    unknowns.insert(def.body_part);
                    skipped += 1;
                    continue;
                };

                if !known.insert(def.name.to_ascii_lowercase()) {
                    skipped += 1;
                    continue;
                }

                repo.create_exercise(Exercise {
                    id: String::new(),
                    name: def.name,
                    description: def.description.unwrap_or_default(),
                    image_url: def.image_url.unwrap_or_default(),
                    body_part: part,
                    calories_per_rep: def.calories_per_rep,
                    calories_per_minute: def.calories_per_minute,
                    created_at: repo.clock().now(),
                })
                .await?;
                inserted += 1;
            }

            println!(
                "{} Imported {} exercises ({} skipped)",
                "info:".blue().bold(),
                inserted,
                skipped
            );
            if !unknowns.is_empty() {
                println!(
                    "{} unknown body parts: {}",
                    "hint:".cyan().bold(),
                    unknowns.into_iter().collect::<Vec<_>>().join(", ")
                );
            }
        }

        ExerciseCmd::List { body_part } => {
            let filter = body_part.map(|p| p.to_string());
            let all = repo.get_all_exercises().await?;

            // Indices always refer to the unfiltered list so they stay usable.
            let rows: Vec<ExJson> = all
                .iter()
                .enumerate()
                .filter(|(_, e)| filter.as_deref().is_none_or(|p| e.body_part == p))
                .map(|(i, e)| ExJson {
                    idx: i + 1,
                    exercise: e,
                })
                .collect();

            emit(fmt, &rows, || {
                if rows.is_empty() {
                    println!("{}", "  (no exercises found)".dimmed());
                    return;
                }
                println!("{}", "Exercises:".cyan().bold());
                for row in &rows {
                    print_exercise(row.idx, row.exercise);
                }
            })?;
        }

        ExerciseCmd::Show { exercise } => {
            let all = repo.get_all_exercises().await?;
            let Some(ex) = pick(&all, &exercise) else {
                report_missing(EntityKind::Exercise, &exercise);
                return Ok(());
            };

            emit(fmt, ex, || {
                println!("{}", ex.name.bold().cyan());
                println!("  id:          {}", ex.id.dimmed());
                println!("  body part:   {}", ex.body_part);
                if !ex.description.is_empty() {
                    println!("  description: {}", ex.description);
                }
                if !ex.image_url.is_empty() {
                    println!("  image:       {}", ex.image_url);
                }
                if let Some(c) = ex.calories_per_rep {
                    println!("  kcal/rep:    {:.2}", c);
                }
                if let Some(c) = ex.calories_per_minute {
                    println!("  kcal/min:    {:.2}", c);
                }
                println!("  created:     {}", ex.created_at.format("%Y-%m-%d %H:%M"));
            })?;
        }

        ExerciseCmd::Edit {
            exercise,
            name,
            desc,
            body_part,
            cal_per_rep,
            cal_per_min,
        } => {
            let all = repo.get_all_exercises().await?;
            let Some(current) = pick(&all, &exercise) else {
                report_missing(EntityKind::Exercise, &exercise);
                return Ok(());
            };

            let mut updated = current.clone();
            if let Some(n) = name {
                updated.name = n;
            }
            if let Some(d) = desc {
                updated.description = d;
            }
            if let Some(p) = body_part {
                updated.body_part = p.to_string();
            }
            if cal_per_rep.is_some() {
                updated.calories_per_rep = cal_per_rep;
            }
            if cal_per_min.is_some() {
                updated.calories_per_minute = cal_per_min;
            }

            match repo.update_exercise(&current.id, updated).await {
                Ok(ex) => emit(fmt, &ex, || {
                    println!("{} Exercise \"{}\" updated", "info:".blue().bold(), ex.name)
                })?,
                Err(e) => return report_store_error(e),
            }
        }

        ExerciseCmd::Image { exercise, file } => {
            let all = repo.get_all_exercises().await?;
            let Some(current) = pick(&all, &exercise) else {
                report_missing(EntityKind::Exercise, &exercise);
                return Ok(());
            };

            let url = media::store_upload(&settings.upload_dir, &file).await?;
            let mut updated = current.clone();
            updated.image_url = url.clone();
            repo.update_exercise(&current.id, updated).await?;

            emit(fmt, &serde_json::json!({ "url": url }), || {
                println!(
                    "{} image for \"{}\" stored at {}",
                    "info:".blue().bold(),
                    current.name,
                    url.green()
                )
            })?;
        }

        ExerciseCmd::Delete { exercise } => {
            let all = repo.get_all_exercises().await?;
            let Some(ex) = pick(&all, &exercise) else {
                report_missing(EntityKind::Exercise, &exercise);
                return Ok(());
            };

            if let Err(e) = repo.delete_exercise(&ex.id).await {
                return report_store_error(e);
            }
            println!("{} Exercise \"{}\" deleted", "info:".blue().bold(), ex.name);
        }
    }

    Ok(())
}
