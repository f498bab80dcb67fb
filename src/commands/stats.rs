use anyhow::Result;
use colored::Colorize;

use crate::{
    OutputFmt, Repository, clock::Clock, stats::StatisticsResponse, storage::CollectionStore,
    types::emit,
};

const BAR_WIDTH: usize = 30;

fn bar(percent: usize) -> String {
    let filled = (percent.min(100) * BAR_WIDTH) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn pretty_print(stats: &StatisticsResponse) {
    let today = &stats.today_stats;
    println!("{} {}", "Today".cyan().bold(), today.date.dimmed());
    println!(
        "  {} in {} workout(s), {} exercise(s)",
        today.total_time.bold(),
        today.workout_count,
        today.exercises
    );

    let week = &stats.week_stats;
    println!(
        "{} {}",
        "This week".cyan().bold(),
        format!("{} → {}", week.start_date, week.end_date).dimmed()
    );
    println!(
        "  {} in {} workout(s), {} per day",
        week.total_time.bold(),
        week.workout_count,
        week.avg_per_day
    );

    let month = &stats.month_stats;
    println!("{} {}", "This month".cyan().bold(), month.month.dimmed());
    println!(
        "  {} in {} workout(s), {} per day",
        month.total_time.bold(),
        month.workout_count,
        month.avg_per_day
    );

    println!("{}", "Body parts".cyan().bold());
    if stats.body_part_data.is_empty() {
        println!("{}", "  (no completed exercises yet)".dimmed());
        return;
    }

    let label_w = stats
        .body_part_data
        .iter()
        .map(|b| b.body_part.chars().count())
        .max()
        .unwrap_or(0);
    for b in &stats.body_part_data {
        println!(
            "  {:<w$} {} {:>3}% ({})",
            b.body_part,
            bar(b.percent).green(),
            b.percent,
            b.count,
            w = label_w
        );
    }
}

pub async fn handle<S: CollectionStore, C: Clock>(
    repo: &Repository<S, C>,
    resolve_body_parts: bool,
    fmt: OutputFmt,
) -> Result<()> {
    let stats = repo.statistics(resolve_body_parts).await?;
    emit(fmt, &stats, || pretty_print(&stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_scales_to_width() {
        assert_eq!(bar(0).chars().filter(|c| *c == '█').count(), 0);
        assert_eq!(bar(50).chars().filter(|c| *c == '█').count(), 15);
        assert_eq!(bar(100).chars().count(), BAR_WIDTH);
        assert_eq!(bar(250).chars().filter(|c| *c == '░').count(), 0);
    }
}
