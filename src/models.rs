use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// The three record kinds the tracker persists. Each kind owns its own
/// backing resource (a JSON file, or a partition of the SQLite table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Exercise,
    Workout,
    Session,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [Self::Exercise, Self::Workout, Self::Session];

    /// Stable name used for file names and the `kind` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exercise => "exercises",
            Self::Workout => "workouts",
            Self::Session => "sessions",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Exercise => "exercise",
            Self::Workout => "workout",
            Self::Session => "session",
        };

        write!(f, "{}", s)
    }
}

/// A persisted record: anything the collection store can keep keyed by id.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &str;
}

/// An exercise from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub body_part: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories_per_rep: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories_per_minute: Option<f64>,
    pub created_at: DateTime<Local>,
}

impl Record for Exercise {
    const KIND: EntityKind = EntityKind::Exercise;

    fn id(&self) -> &str {
        &self.id
    }
}

/// One planned exercise inside a workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSet {
    pub exercise_id: String,
    #[serde(default)]
    pub sets: u32,
    #[serde(default)]
    pub reps: u32,
    #[serde(default)]
    pub weight: u32,
    /// Rest between sets, in seconds.
    #[serde(default)]
    pub rest_time: u32,
}

/// A workout plan: an ordered list of exercise sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub body_part: String,
    #[serde(default)]
    pub exercises: Vec<ExerciseSet>,
    pub created_at: DateTime<Local>,
}

impl Record for Workout {
    const KIND: EntityKind = EntityKind::Workout;

    fn id(&self) -> &str {
        &self.id
    }
}

/// A logged training session.
/// `end_time` and `total_time` only carry meaning once `is_completed` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSession {
    pub id: String,
    #[serde(default)]
    pub workout_id: String,
    pub date: DateTime<Local>,
    pub start_time: DateTime<Local>,
    #[serde(default)]
    pub end_time: Option<DateTime<Local>>,
    /// Elapsed seconds between start and end.
    #[serde(default)]
    pub total_time: i64,
    #[serde(default)]
    pub total_calories: f64,
    #[serde(default)]
    pub exercises: Vec<CompletedExercise>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub is_completed: bool,
}

impl Record for WorkoutSession {
    const KIND: EntityKind = EntityKind::Session;

    fn id(&self) -> &str {
        &self.id
    }
}

impl WorkoutSession {
    /// A fresh, not yet completed session dated and started at `now`.
    pub fn start(id: String, workout_id: String, now: DateTime<Local>) -> Self {
        Self {
            id,
            workout_id,
            date: now,
            start_time: now,
            end_time: None,
            total_time: 0,
            total_calories: 0.0,
            exercises: Vec::new(),
            notes: String::new(),
            is_completed: false,
        }
    }

    /// Stamp end time and elapsed seconds the first time the session is
    /// marked completed. Returns whether anything changed.
    pub fn apply_completion(&mut self, now: DateTime<Local>) -> bool {
        if !self.is_completed || self.end_time.is_some() {
            return false;
        }

        self.end_time = Some(now);
        self.total_time = (now - self.start_time).num_seconds().max(0);
        true
    }

    pub fn recompute_calories(&mut self) {
        self.total_calories = self.exercises.iter().map(|e| e.calories_burned).sum();
    }

    pub fn completed_exercises(&self) -> impl Iterator<Item = &CompletedExercise> {
        self.exercises.iter().filter(|e| e.is_completed)
    }
}

/// What was actually done for one exercise during a session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedExercise {
    pub exercise_id: String,
    #[serde(default)]
    pub completed_sets: u32,
    /// Reps done in each set.
    #[serde(default)]
    pub completed_reps: Vec<u32>,
    /// Rest taken after each set, in seconds.
    #[serde(default)]
    pub actual_rest_times: Vec<u32>,
    #[serde(default)]
    pub calories_burned: f64,
    #[serde(default)]
    pub is_completed: bool,
}

impl CompletedExercise {
    /// Per-rep calorie estimate from the catalog coefficient, 0 when unknown.
    pub fn estimate_calories(&self, exercise: &Exercise) -> f64 {
        let reps: u32 = self.completed_reps.iter().sum();
        exercise
            .calories_per_rep
            .map_or(0.0, |per_rep| per_rep * f64::from(reps))
    }
}
