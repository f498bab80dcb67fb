use std::collections::HashMap;
use std::future::Future;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::error::{StoreError, StoreResult};
use crate::models::{EntityKind, Record};

/// Durable id → record mapping, one independent collection per entity kind.
///
/// Every mutation is a read-modify-write of the whole collection: nothing
/// is cached between calls, and the stored snapshot is always complete.
pub trait CollectionStore: Send + Sync {
    /// The full collection in stored order. A kind that was never written
    /// yields an empty vec.
    fn load_all<R: Record>(&self) -> impl Future<Output = StoreResult<Vec<R>>> + Send;

    /// Replace the record with the same id in place, or append it.
    fn upsert<R: Record>(&self, record: &R) -> impl Future<Output = StoreResult<()>> + Send;

    /// Overwrite the record with the same id, or `NotFound` when there is
    /// none. The check and the write happen under one lock.
    fn replace_existing<R: Record>(&self, record: &R) -> impl Future<Output = StoreResult<()>> + Send;

    /// Remove the record with `id`, keeping the order of the rest.
    fn delete_by_id<R: Record>(&self, id: &str) -> impl Future<Output = StoreResult<()>> + Send;

    fn find_by_id<R: Record>(&self, id: &str) -> impl Future<Output = StoreResult<R>> + Send {
        async move {
            self.load_all::<R>()
                .await?
                .into_iter()
                .find(|r| r.id() == id)
                .ok_or_else(|| StoreError::not_found(R::KIND, id))
        }
    }
}

/// Merge `record` into `records`. Returns true when an existing entry was replaced.
pub fn merge_upsert<R: Record>(records: &mut Vec<R>, record: &R) -> bool {
    match records.iter_mut().find(|r| r.id() == record.id()) {
        Some(slot) => {
            *slot = record.clone();
            true
        }
        None => {
            records.push(record.clone());
            false
        }
    }
}

/// Overwrite the entry with `record`'s id in place, or `NotFound`.
pub fn replace_by_id<R: Record>(records: &mut [R], record: &R) -> StoreResult<()> {
    let slot = records
        .iter_mut()
        .find(|r| r.id() == record.id())
        .ok_or_else(|| StoreError::not_found(R::KIND, record.id()))?;
    *slot = record.clone();
    Ok(())
}

/// Remove the first record with `id`, or `NotFound`.
pub fn remove_by_id<R: Record>(records: &mut Vec<R>, id: &str) -> StoreResult<R> {
    let pos = records
        .iter()
        .position(|r| r.id() == id)
        .ok_or_else(|| StoreError::not_found(R::KIND, id))?;
    Ok(records.remove(pos))
}

/* ───────────────────────────── flat files ───────────────────────────── */

/// One pretty-printed JSON array per kind inside `data_dir`.
pub struct FileStore {
    data_dir: PathBuf,
    locks: HashMap<EntityKind, Mutex<()>>,
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let locks = EntityKind::ALL
            .into_iter()
            .map(|kind| (kind, Mutex::new(())))
            .collect();

        Self {
            data_dir: data_dir.into(),
            locks,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, kind: EntityKind) -> PathBuf {
        self.data_dir.join(format!("{}.json", kind.as_str()))
    }

    fn lock(&self, kind: EntityKind) -> &Mutex<()> {
        // Populated for every kind in `new`.
        &self.locks[&kind]
    }

    async fn read_collection<R: Record>(&self) -> StoreResult<Vec<R>> {
        let path = self.path_for(R::KIND);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(path = %path.display(), "collection file absent, treating as empty");
                return Ok(Vec::new());
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse { path, source })
    }

    async fn write_collection<R: Record>(&self, records: &[R]) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|source| StoreError::Io {
                path: self.data_dir.clone(),
                source,
            })?;

        let content = serde_json::to_vec_pretty(records).map_err(|source| StoreError::Encode {
            kind: R::KIND,
            source,
        })?;

        let path = self.path_for(R::KIND);
        let (dir, target) = (self.data_dir.clone(), path.clone());
        tokio::task::spawn_blocking(move || persist_atomically(&dir, &target, &content))
            .await
            .map_err(|join| StoreError::Io {
                path: path.clone(),
                source: io::Error::other(join),
            })??;

        debug!(kind = %R::KIND, records = records.len(), path = %path.display(), "collection saved");
        Ok(())
    }
}

/// Write `content` to a uniquely named temp file in `dir`, then rename it
/// over `path`. Readers only ever see a whole snapshot, and the temp file is
/// removed if anything fails before the rename.
fn persist_atomically(dir: &Path, path: &Path, content: &[u8]) -> StoreResult<()> {
    let io_err = |source: io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    tmp.write_all(content).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

impl CollectionStore for FileStore {
    async fn load_all<R: Record>(&self) -> StoreResult<Vec<R>> {
        self.read_collection().await
    }

    async fn upsert<R: Record>(&self, record: &R) -> StoreResult<()> {
        let _guard = self.lock(R::KIND).lock().await;

        let mut records = self.read_collection::<R>().await?;
        let replaced = merge_upsert(&mut records, record);
        trace!(kind = %R::KIND, id = record.id(), replaced, "upsert");

        self.write_collection(&records).await
    }

    async fn replace_existing<R: Record>(&self, record: &R) -> StoreResult<()> {
        let _guard = self.lock(R::KIND).lock().await;

        let mut records = self.read_collection::<R>().await?;
        replace_by_id(&mut records, record)?;
        trace!(kind = %R::KIND, id = record.id(), "replace");

        self.write_collection(&records).await
    }

    async fn delete_by_id<R: Record>(&self, id: &str) -> StoreResult<()> {
        let _guard = self.lock(R::KIND).lock().await;

        let mut records = self.read_collection::<R>().await?;
        remove_by_id(&mut records, id)?;
        trace!(kind = %R::KIND, id, "delete");

        self.write_collection(&records).await
    }
}

/* ───────────────────────────── in memory ────────────────────────────── */

/// Keeps collections as JSON values in memory. Records go through the same
/// serde round trip as the persistent adapters.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<EntityKind, Vec<serde_json::Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn decode<R: Record>(values: &[serde_json::Value]) -> StoreResult<Vec<R>> {
        values
            .iter()
            .cloned()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()
            .map_err(|source| StoreError::Parse {
                path: PathBuf::from(format!("memory:{}", R::KIND.as_str())),
                source,
            })
    }

    fn encode<R: Record>(records: &[R]) -> StoreResult<Vec<serde_json::Value>> {
        records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()
            .map_err(|source| StoreError::Encode {
                kind: R::KIND,
                source,
            })
    }
}

impl CollectionStore for MemoryStore {
    async fn load_all<R: Record>(&self) -> StoreResult<Vec<R>> {
        let collections = self.collections.lock().await;
        match collections.get(&R::KIND) {
            Some(values) => Self::decode(values),
            None => Ok(Vec::new()),
        }
    }

    async fn upsert<R: Record>(&self, record: &R) -> StoreResult<()> {
        let mut collections = self.collections.lock().await;
        let slot = collections.entry(R::KIND).or_default();

        let mut records: Vec<R> = Self::decode(slot)?;
        merge_upsert(&mut records, record);
        *slot = Self::encode(&records)?;
        Ok(())
    }

    async fn replace_existing<R: Record>(&self, record: &R) -> StoreResult<()> {
        let mut collections = self.collections.lock().await;
        let slot = collections.entry(R::KIND).or_default();

        let mut records: Vec<R> = Self::decode(slot)?;
        replace_by_id(&mut records, record)?;
        *slot = Self::encode(&records)?;
        Ok(())
    }

    async fn delete_by_id<R: Record>(&self, id: &str) -> StoreResult<()> {
        let mut collections = self.collections.lock().await;
        let slot = collections.entry(R::KIND).or_default();

        let mut records: Vec<R> = Self::decode(slot)?;
        remove_by_id(&mut records, id)?;
        *slot = Self::encode(&records)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Exercise, Workout, WorkoutSession};
    use crate::models::CompletedExercise;
    use chrono::{Local, TimeZone};
    use proptest::prelude::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn exercise(id: &str, name: &str) -> Exercise {
        Exercise {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            image_url: String::new(),
            body_part: "legs".into(),
            calories_per_rep: Some(0.4),
            calories_per_minute: None,
            created_at: Local.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).single().unwrap(),
        }
    }

    async fn upsert_then_find<S: CollectionStore>(store: &S) {
        let ex = exercise("e1", "Squat");
        store.upsert(&ex).await.unwrap();

        let found: Exercise = store.find_by_id("e1").await.unwrap();
        assert_eq!(found, ex);
    }

    async fn upsert_replaces_in_place<S: CollectionStore>(store: &S) {
        store.upsert(&exercise("a", "A")).await.unwrap();
        store.upsert(&exercise("b", "B")).await.unwrap();
        store.upsert(&exercise("c", "C")).await.unwrap();

        store.upsert(&exercise("b", "B2")).await.unwrap();

        let all: Vec<Exercise> = store.load_all().await.unwrap();
        let names: Vec<_> = all.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["A", "B2", "C"]);
    }

    async fn delete_missing_is_not_found<S: CollectionStore>(store: &S) {
        store.upsert(&exercise("a", "A")).await.unwrap();

        let err = store.delete_by_id::<Exercise>("zzz").await.unwrap_err();
        assert!(err.is_not_found());

        let all: Vec<Exercise> = store.load_all().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    async fn delete_keeps_order<S: CollectionStore>(store: &S) {
        for id in ["a", "b", "c", "d"] {
            store.upsert(&exercise(id, id)).await.unwrap();
        }
        store.delete_by_id::<Exercise>("b").await.unwrap();

        let all: Vec<Exercise> = store.load_all().await.unwrap();
        let ids: Vec<_> = all.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "c", "d"]);
    }

    async fn kinds_are_independent<S: CollectionStore>(store: &S) {
        store.upsert(&exercise("x", "X")).await.unwrap();

        let workouts: Vec<Workout> = store.load_all().await.unwrap();
        let sessions: Vec<WorkoutSession> = store.load_all().await.unwrap();
        assert!(workouts.is_empty());
        assert!(sessions.is_empty());

        let err = store.find_by_id::<Workout>("x").await.unwrap_err();
        assert!(err.is_not_found());
    }

    async fn replace_needs_an_existing_record<S: CollectionStore>(store: &S) {
        let err = store.replace_existing(&exercise("a", "A")).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(store.load_all::<Exercise>().await.unwrap().is_empty());

        store.upsert(&exercise("a", "A")).await.unwrap();
        store.upsert(&exercise("b", "B")).await.unwrap();
        store.replace_existing(&exercise("a", "A2")).await.unwrap();

        let all: Vec<Exercise> = store.load_all().await.unwrap();
        let names: Vec<_> = all.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["A2", "B"]);
    }

    #[tokio::test]
    async fn file_store_contract() {
        for case in 0..6 {
            let dir = TempDir::new().unwrap();
            let store = FileStore::new(dir.path().join("data"));
            match case {
                0 => upsert_then_find(&store).await,
                1 => upsert_replaces_in_place(&store).await,
                2 => delete_missing_is_not_found(&store).await,
                3 => delete_keeps_order(&store).await,
                4 => replace_needs_an_existing_record(&store).await,
                _ => kinds_are_independent(&store).await,
            }
        }
    }

    #[tokio::test]
    async fn memory_store_contract() {
        upsert_then_find(&MemoryStore::new()).await;
        upsert_replaces_in_place(&MemoryStore::new()).await;
        delete_missing_is_not_found(&MemoryStore::new()).await;
        delete_keeps_order(&MemoryStore::new()).await;
        replace_needs_an_existing_record(&MemoryStore::new()).await;
        kinds_are_independent(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn never_written_kind_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("missing"));

        let all: Vec<WorkoutSession> = store.load_all().await.unwrap();
        assert!(all.is_empty());
        assert!(!store.data_dir().exists());
    }

    #[tokio::test]
    async fn empty_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        std::fs::write(store.path_for(EntityKind::Exercise), "").unwrap();

        let all: Vec<Exercise> = store.load_all().await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn corrupted_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        std::fs::write(store.path_for(EntityKind::Workout), "[{\"id\": ").unwrap();

        let err = store.load_all::<Workout>().await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[tokio::test]
    async fn snapshot_is_pretty_json_array() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("data"));
        store.upsert(&exercise("e1", "Row")).await.unwrap();

        let raw = std::fs::read_to_string(store.path_for(EntityKind::Exercise)).unwrap();
        assert!(raw.starts_with("[\n  {"));
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(1));
        assert_eq!(file_names(store.data_dir()), ["exercises.json"]);
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory cannot be renamed over.
        let target = dir.path().join("exercises.json");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), "x").unwrap();

        let err = persist_atomically(dir.path(), &target, b"[]").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(file_names(dir.path()), ["exercises.json"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn two_stores_on_one_dir_never_tear_the_file() {
        let dir = TempDir::new().unwrap();
        let first = Arc::new(FileStore::new(dir.path()));
        let second = Arc::new(FileStore::new(dir.path()));

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(if i % 2 == 0 { &first } else { &second });
            handles.push(tokio::spawn(async move {
                store.upsert(&exercise(&format!("e{i}"), "Curl")).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        // Separate stores do not share a lock, so updates may be lost, but
        // every snapshot on disk is whole.
        let all: Vec<Exercise> = first.load_all().await.unwrap();
        assert!(!all.is_empty());
        assert_eq!(file_names(dir.path()), ["exercises.json"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_upserts_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::new(dir.path()));

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.upsert(&exercise(&format!("e{i}"), "Curl")).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let all: Vec<Exercise> = store.load_all().await.unwrap();
        assert_eq!(all.len(), 16);
    }

    #[test]
    fn merge_upsert_reports_replacement() {
        let mut records = vec![exercise("a", "A")];
        assert!(!merge_upsert(&mut records, &exercise("b", "B")));
        assert!(merge_upsert(&mut records, &exercise("a", "A2")));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "A2");
    }

    fn calorie_value() -> impl Strategy<Value = f64> {
        prop::num::f64::NORMAL | prop::num::f64::SUBNORMAL | prop::num::f64::ZERO
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Whatever goes in through upsert comes back bit for bit.
        #[test]
        fn prop_file_store_returns_what_was_stored(
            name in "[A-Za-z ]{1,16}",
            per_rep in proptest::option::of(calorie_value()),
            per_minute in proptest::option::of(calorie_value()),
            burned in proptest::collection::vec(calorie_value(), 0..4),
            total in calorie_value(),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let dir = TempDir::new().unwrap();
            let store = FileStore::new(dir.path());

            let mut ex = exercise("e1", &name);
            ex.calories_per_rep = per_rep;
            ex.calories_per_minute = per_minute;

            let mut session = WorkoutSession::start("s1".into(), "w1".into(), ex.created_at);
            session.total_calories = total;
            session.exercises = burned
                .iter()
                .map(|&kcal| CompletedExercise {
                    exercise_id: "e1".into(),
                    calories_burned: kcal,
                    ..Default::default()
                })
                .collect();

            let (found_ex, found_session) = rt.block_on(async {
                store.upsert(&ex).await.unwrap();
                store.upsert(&session).await.unwrap();
                (
                    store.find_by_id::<Exercise>("e1").await.unwrap(),
                    store.find_by_id::<WorkoutSession>("s1").await.unwrap(),
                )
            });
            prop_assert_eq!(found_ex, ex);
            prop_assert_eq!(found_session, session);
        }
    }
}
