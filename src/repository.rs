use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::StoreResult;
use crate::models::{CompletedExercise, Exercise, Workout, WorkoutSession};
use crate::query;
use crate::stats::{self, BodyPartMode, StatisticsResponse};
use crate::storage::CollectionStore;

/// Everything the command layer needs, on top of one collection store and
/// one clock. Records handed out are owned copies.
pub struct Repository<S, C> {
    store: S,
    clock: C,
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl<S: CollectionStore, C: Clock> Repository<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /* ───────────────────────────── exercises ───────────────────────────── */

    pub async fn get_all_exercises(&self) -> StoreResult<Vec<Exercise>> {
        self.store.load_all().await
    }

    pub async fn get_exercise_by_id(&self, id: &str) -> StoreResult<Exercise> {
        self.store.find_by_id(id).await
    }

    pub async fn save_exercise(&self, exercise: &Exercise) -> StoreResult<()> {
        self.store.upsert(exercise).await
    }

    pub async fn delete_exercise(&self, id: &str) -> StoreResult<()> {
        self.store.delete_by_id::<Exercise>(id).await
    }

    /// Assign a fresh id and creation time, then store.
    pub async fn create_exercise(&self, mut exercise: Exercise) -> StoreResult<Exercise> {
        exercise.id = new_id();
        exercise.created_at = self.clock.now();
        self.save_exercise(&exercise).await?;
        info!(id = %exercise.id, name = %exercise.name, "exercise created");
        Ok(exercise)
    }

    pub async fn update_exercise(&self, id: &str, mut exercise: Exercise) -> StoreResult<Exercise> {
        exercise.id = id.to_string();
        self.store.replace_existing(&exercise).await?;
        Ok(exercise)
    }

    /* ───────────────────────────── workouts ────────────────────────────── */

    pub async fn get_all_workouts(&self) -> StoreResult<Vec<Workout>> {
        self.store.load_all().await
    }

    pub async fn get_workout_by_id(&self, id: &str) -> StoreResult<Workout> {
        self.store.find_by_id(id).await
    }

    pub async fn save_workout(&self, workout: &Workout) -> StoreResult<()> {
        self.store.upsert(workout).await
    }

    pub async fn delete_workout(&self, id: &str) -> StoreResult<()> {
        self.store.delete_by_id::<Workout>(id).await
    }

    pub async fn create_workout(&self, mut workout: Workout) -> StoreResult<Workout> {
        workout.id = new_id();
        workout.created_at = self.clock.now();
        self.save_workout(&workout).await?;
        info!(id = %workout.id, name = %workout.name, "workout created");
        Ok(workout)
    }

    pub async fn update_workout(&self, id: &str, mut workout: Workout) -> StoreResult<Workout> {
        workout.id = id.to_string();
        self.store.replace_existing(&workout).await?;
        Ok(workout)
    }

    /* ───────────────────────────── sessions ────────────────────────────── */

    pub async fn get_all_sessions(&self) -> StoreResult<Vec<WorkoutSession>> {
        self.store.load_all().await
    }

    pub async fn get_session_by_id(&self, id: &str) -> StoreResult<WorkoutSession> {
        self.store.find_by_id(id).await
    }

    pub async fn save_session(&self, session: &WorkoutSession) -> StoreResult<()> {
        self.store.upsert(session).await
    }

    pub async fn delete_session(&self, id: &str) -> StoreResult<()> {
        self.store.delete_by_id::<WorkoutSession>(id).await
    }

    /// Open a session for an existing workout, dated and started now, with
    /// one not-yet-completed entry per planned exercise.
    pub async fn start_session(&self, workout_id: &str) -> StoreResult<WorkoutSession> {
        let workout = self.get_workout_by_id(workout_id).await?;

        let mut session = WorkoutSession::start(new_id(), workout.id, self.clock.now());
        session.exercises = workout
            .exercises
            .iter()
            .map(|planned| CompletedExercise {
                exercise_id: planned.exercise_id.clone(),
                ..Default::default()
            })
            .collect();
        self.save_session(&session).await?;
        info!(id = %session.id, workout = workout_id, "session started");
        Ok(session)
    }

    /// Replace a session, applying the completion transition and
    /// recomputing total calories.
    pub async fn update_session(
        &self,
        id: &str,
        mut session: WorkoutSession,
    ) -> StoreResult<WorkoutSession> {
        session.id = id.to_string();

        if session.apply_completion(self.clock.now()) {
            info!(id, total_time = session.total_time, "session completed");
        }
        session.recompute_calories();

        self.store.replace_existing(&session).await?;
        Ok(session)
    }

    /// Sessions dated strictly between the two instants.
    pub async fn get_sessions_by_date_range(
        &self,
        start: chrono::NaiveDateTime,
        end: chrono::NaiveDateTime,
    ) -> StoreResult<Vec<WorkoutSession>> {
        let sessions = self.get_all_sessions().await?;
        Ok(query::in_range(sessions, start, end))
    }

    /// Sessions from `first` through `last`, both days included.
    ///
    /// The range opens at midnight of `first`, exclusive: a session logged
    /// exactly at that midnight does not count.
    pub async fn get_sessions_between_days(
        &self,
        first: NaiveDate,
        last: NaiveDate,
    ) -> StoreResult<Vec<WorkoutSession>> {
        let start = first.and_time(NaiveTime::MIN);
        let end = (last + chrono::Days::new(1)).and_time(NaiveTime::MIN);
        debug!(%start, %end, "session range query");
        self.get_sessions_by_date_range(start, end).await
    }

    /* ──────────────────────────── statistics ───────────────────────────── */

    pub async fn statistics(&self, resolve_body_parts: bool) -> StoreResult<StatisticsResponse> {
        let sessions = self.get_all_sessions().await?;
        let now = self.clock.now();

        if resolve_body_parts {
            let catalog = self.get_all_exercises().await?;
            Ok(stats::format_statistics(&sessions, now, BodyPartMode::Catalog(&catalog)))
        } else {
            Ok(stats::format_statistics(&sessions, now, BodyPartMode::Placeholder))
        }
    }
}
