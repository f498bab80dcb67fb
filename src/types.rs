use once_cell::sync::Lazy;
use std::{collections::HashSet, fmt::Display};
use strsim::jaro_winkler;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BodyPart {
    Chest,
    Back,
    Shoulders,
    Arms,
    Legs,
    Glutes,
    Core,
    FullBody,
    Cardio,
}

impl Display for BodyPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Chest => "chest",
            Self::Back => "back",
            Self::Shoulders => "shoulders",
            Self::Arms => "arms",
            Self::Legs => "legs",
            Self::Glutes => "glutes",
            Self::Core => "core",
            Self::FullBody => "full-body",
            Self::Cardio => "cardio",
        };

        write!(f, "{}", s)
    }
}

pub static ALLOWED_BODY_PARTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "chest",
        "back",
        "shoulders",
        "arms",
        "legs",
        "glutes",
        "core",
        "full-body",
        "cardio",
    ])
});

/// Returns the canonical lowercase body-part tag or `None` if not allowed.
pub fn canonical_body_part<S: AsRef<str>>(raw: S) -> Option<String> {
    let part = raw.as_ref().trim().to_ascii_lowercase().replace([' ', '_'], "-");
    if ALLOWED_BODY_PARTS.contains(part.as_str()) {
        Some(part)
    } else {
        None
    }
}

/// Return the closest allowed body part for `input`
/// if similarity ≥ 0.80 *and* clearly better than the runner-up.
pub fn best_body_part_suggestion(input: &str) -> Option<&'static str> {
    let inp = input.trim().to_ascii_lowercase();
    if inp.is_empty() {
        return None;
    }

    let mut scores: Vec<(&'static str, f64)> = ALLOWED_BODY_PARTS
        .iter()
        .copied()
        .map(|p| (p, jaro_winkler(&inp, p)))
        .collect();

    // Highest score first, ties broken by name so the answer is stable.
    scores.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let (best, best_score) = scores[0];
    let second_score = scores.get(1).map(|(_, s)| *s).unwrap_or(0.0);

    const MIN_SCORE: f64 = 0.80;
    const GAP: f64 = 0.02;

    if best_score >= MIN_SCORE && best_score - second_score >= GAP {
        Some(best)
    } else {
        None
    }
}

/// `[[exercise]]` entries of an import file.
#[derive(Debug, Deserialize)]
pub struct ExerciseDef {
    pub name: String,
    pub description: Option<String>,
    pub body_part: String,
    pub image_url: Option<String>,
    pub calories_per_rep: Option<f64>,
    pub calories_per_minute: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ExerciseImport {
    pub exercise: Vec<ExerciseDef>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFmt {
    Pretty,
    Json,
}

impl OutputFmt {
    pub fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Pretty }
    }
}

/// Print `value` as JSON, or run `pretty` for human output.
pub fn emit<T: Serialize>(fmt: OutputFmt, value: &T, pretty: impl FnOnce()) -> anyhow::Result<()> {
    match fmt {
        OutputFmt::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFmt::Pretty => pretty(),
    }
    Ok(())
}
