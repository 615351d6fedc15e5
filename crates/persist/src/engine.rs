//! Save/restore engine over the four typed stores.

use crossbeam_channel::{bounded, Receiver};
use ember_bus::Publisher;
use ember_core::{Error, Result, ValueKind};
use ember_store::{HashSections, ListSections, SetSections, Store, StringSections};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a `bg_save` request.
pub enum SaveOutcome {
    /// Nothing was published since the last save; no work was scheduled.
    Clean,
    /// A background save was scheduled; the ticket reports completion.
    Started(SaveTicket),
}

impl SaveOutcome {
    /// Whether a background save was actually scheduled.
    pub fn is_started(&self) -> bool {
        matches!(self, SaveOutcome::Started(_))
    }
}

/// Completed-save summary delivered through a [`SaveTicket`].
#[derive(Debug)]
pub struct SaveReport {
    /// Where the snapshot was written.
    pub path: PathBuf,
    /// Publish counter value the save was scheduled at.
    pub published: u64,
}

/// Completion signal for one in-flight background save.
pub struct SaveTicket {
    rx: Receiver<Result<SaveReport>>,
    cancel: Arc<AtomicBool>,
}

impl SaveTicket {
    /// Block until the background writer finishes, yielding its result.
    pub fn wait(self) -> Result<SaveReport> {
        self.rx.recv().unwrap_or_else(|_| {
            Err(Error::Io(io::Error::new(
                io::ErrorKind::Other,
                "save worker exited without reporting a result",
            )))
        })
    }

    /// Result if the writer has already finished.
    pub fn try_wait(&self) -> Option<Result<SaveReport>> {
        self.rx.try_recv().ok()
    }

    /// Ask the writer to abort. Takes effect at the next section boundary;
    /// an aborted save reports [`Error::Cancelled`] and leaves no file
    /// behind (the previous snapshot, if any, is untouched).
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

/// Summary of a snapshot load.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Keys restored across all sections read so far.
    pub keys_loaded: usize,
    /// Cross-section duplicate keys skipped to keep kind exclusivity.
    pub keys_skipped: usize,
}

impl LoadReport {
    fn apply(&mut self, (loaded, skipped): (usize, usize)) {
        self.keys_loaded += loaded;
        self.keys_skipped += skipped;
    }
}

/// Background snapshot writer and startup loader.
pub struct PersistenceEngine {
    store: Arc<Store>,
    publisher: Publisher,
    last_saved: Arc<AtomicU64>,
    file_lock: Arc<Mutex<()>>,
}

impl PersistenceEngine {
    /// Engine over `store`, using `publisher`'s counter to skip clean saves.
    pub fn new(store: Arc<Store>, publisher: Publisher) -> Self {
        PersistenceEngine {
            store,
            publisher,
            last_saved: Arc::new(AtomicU64::new(0)),
            file_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Save the store to `path` in the background.
    ///
    /// Returns immediately. When nothing has been published since the last
    /// save this is a no-op ([`SaveOutcome::Clean`]); otherwise the new
    /// counter value is recorded up front and a `SaveTicket` is returned.
    /// A save that fails (or is cancelled) rolls the record back, so a
    /// retry is not short-circuited as clean. Concurrent saves serialize
    /// on the engine's file lock. I/O failures surface through the ticket,
    /// not in logs alone.
    pub fn bg_save(&self, path: impl Into<PathBuf>) -> SaveOutcome {
        let published = self.publisher.published();
        // swap stores the same value back when nothing changed, which is
        // harmless and keeps the check-and-record a single atomic step.
        let previous = self.last_saved.swap(published, Ordering::AcqRel);
        if previous == published {
            debug!(published, "no changes since last save, skipping");
            return SaveOutcome::Clean;
        }

        let path = path.into();
        let (tx, rx) = bounded(1);
        let cancel = Arc::new(AtomicBool::new(false));

        let store = Arc::clone(&self.store);
        let file_lock = Arc::clone(&self.file_lock);
        let last_saved = Arc::clone(&self.last_saved);
        let worker_cancel = Arc::clone(&cancel);
        let spawned = std::thread::Builder::new()
            .name("ember-bgsave".to_string())
            .spawn(move || {
                let result = write_snapshot(&store, &file_lock, &path, &worker_cancel, published);
                if let Err(err) = &result {
                    warn!(%err, "background save failed");
                    // Nothing was saved; re-arm the gate unless a newer
                    // save already recorded a later counter.
                    let _ = last_saved.compare_exchange(
                        published,
                        previous,
                        Ordering::AcqRel,
                        Ordering::Relaxed,
                    );
                }
                // Receiver may have been dropped; the save itself still ran.
                let _ = tx.send(result);
            });
        if let Err(err) = spawned {
            // tx went down with the unspawned closure, so the ticket will
            // report the worker as gone.
            warn!(%err, "failed to spawn background save thread");
            let _ = self.last_saved.compare_exchange(
                published,
                previous,
                Ordering::AcqRel,
                Ordering::Relaxed,
            );
        }
        SaveOutcome::Started(SaveTicket { rx, cancel })
    }

    /// Load a snapshot from `path`, repopulating all four stores.
    ///
    /// A missing file is a no-op. A decode failure is reported per section:
    /// sections before the bad one stay applied, the error names the section
    /// that failed, and later sections are not read.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<LoadReport> {
        load_snapshot(&self.store, &self.file_lock, path.as_ref())
    }
}

pub(crate) fn write_snapshot(
    store: &Store,
    file_lock: &Mutex<()>,
    path: &Path,
    cancel: &AtomicBool,
    published: u64,
) -> Result<SaveReport> {
    let _guard = file_lock.lock();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("tmp");
    let result = write_sections(store, &tmp, cancel)
        .and_then(|()| fs::rename(&tmp, path).map_err(Error::from));
    match result {
        Ok(()) => {
            info!(path = %path.display(), published, "snapshot written");
            Ok(SaveReport {
                path: path.to_path_buf(),
                published,
            })
        }
        Err(err) => {
            let _ = fs::remove_file(&tmp);
            Err(err)
        }
    }
}

fn write_sections(store: &Store, tmp: &Path, cancel: &AtomicBool) -> Result<()> {
    let file = File::create(tmp)?;
    let mut writer = BufWriter::new(file);

    // Fixed section order: hash, list, set, string. Each dump takes only
    // its own store lock, right before serialization.
    write_section(&mut writer, cancel, &store.dump_hashes())?;
    write_section(&mut writer, cancel, &store.dump_lists())?;
    write_section(&mut writer, cancel, &store.dump_sets())?;
    write_section(&mut writer, cancel, &store.dump_strings())?;

    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

fn write_section<T: Serialize>(
    writer: &mut BufWriter<File>,
    cancel: &AtomicBool,
    data: &T,
) -> Result<()> {
    if cancel.load(Ordering::Relaxed) {
        return Err(Error::Cancelled);
    }
    serde_json::to_writer_pretty(&mut *writer, data).map_err(io::Error::from)?;
    writer.write_all(b"\n")?;
    Ok(())
}

fn load_snapshot(store: &Store, file_lock: &Mutex<()>, path: &Path) -> Result<LoadReport> {
    let _guard = file_lock.lock();

    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no snapshot file, starting empty");
            return Ok(LoadReport::default());
        }
        Err(err) => return Err(err.into()),
    };

    let mut de = serde_json::Deserializer::from_reader(BufReader::new(file));
    let mut report = LoadReport::default();

    let hashes: HashSections = decode_section(&mut de, ValueKind::Hash)?;
    report.apply(store.restore_hashes(hashes));

    let lists: ListSections = decode_section(&mut de, ValueKind::List)?;
    report.apply(store.restore_lists(lists));

    let sets: SetSections = decode_section(&mut de, ValueKind::Set)?;
    report.apply(store.restore_sets(sets));

    let strings: StringSections = decode_section(&mut de, ValueKind::String)?;
    report.apply(store.restore_strings(strings));

    info!(
        loaded = report.keys_loaded,
        skipped = report.keys_skipped,
        path = %path.display(),
        "snapshot loaded"
    );
    Ok(report)
}

fn decode_section<'de, R, T>(
    de: &mut serde_json::Deserializer<R>,
    section: ValueKind,
) -> Result<T>
where
    R: serde_json::de::Read<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(&mut *de).map_err(|err| Error::Decode {
        section,
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_bus::NotificationBus;
    use tempfile::TempDir;

    fn setup() -> (TempDir, NotificationBus, Arc<Store>, PersistenceEngine) {
        let temp = TempDir::new().unwrap();
        let bus = NotificationBus::new(256, 256);
        let store = Arc::new(Store::new(bus.publisher()));
        let engine = PersistenceEngine::new(Arc::clone(&store), bus.publisher());
        (temp, bus, store, engine)
    }

    fn populate(store: &Store) {
        store.hset("my first hash", "my key", "yo yo yo").unwrap();
        store.rpush("a list", &["A", "B", "C"]).unwrap();
        store.sadd("a set", &["X", "Y"]).unwrap();
        store.set("a string", "fun is ok").unwrap();
        store.incr("my counter").unwrap();
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let (temp, bus, store, engine) = setup();
        populate(&store);
        let path = temp.path().join("ember.dump.json");

        match engine.bg_save(&path) {
            SaveOutcome::Started(ticket) => {
                let report = ticket.wait().unwrap();
                assert_eq!(report.path, path);
            }
            SaveOutcome::Clean => panic!("save should have been scheduled"),
        }

        let restored_bus = NotificationBus::new(256, 256);
        let restored = Arc::new(Store::new(restored_bus.publisher()));
        let restored_engine =
            PersistenceEngine::new(Arc::clone(&restored), restored_bus.publisher());
        let report = restored_engine.load(&path).unwrap();
        assert_eq!(report.keys_loaded, 5);
        assert_eq!(report.keys_skipped, 0);

        assert_eq!(
            restored.hget("my first hash", "my key").unwrap().as_deref(),
            Some("yo yo yo")
        );
        assert_eq!(restored.lrange("a list", 0, -1).unwrap(), ["A", "B", "C"]);
        assert_eq!(restored.scard("a set").unwrap(), 2);
        assert_eq!(restored.get("a string").unwrap().as_deref(), Some("fun is ok"));
        assert_eq!(restored.get("my counter").unwrap().as_deref(), Some("1"));
        drop(bus);
    }

    #[test]
    fn test_clean_save_is_skipped() {
        let (temp, _bus, store, engine) = setup();
        populate(&store);
        let path = temp.path().join("ember.dump.json");

        match engine.bg_save(&path) {
            SaveOutcome::Started(ticket) => ticket.wait().map(|_| ()).unwrap(),
            SaveOutcome::Clean => panic!("first save should run"),
        }
        // Nothing published since; the second request is a no-op.
        assert!(!engine.bg_save(&path).is_started());

        // A new mutation re-arms the save.
        store.set("k", "v").unwrap();
        assert!(engine.bg_save(&path).is_started());
    }

    #[test]
    fn test_empty_store_save_is_clean() {
        let (temp, _bus, _store, engine) = setup();
        assert!(!engine.bg_save(temp.path().join("d.json")).is_started());
    }

    #[test]
    fn test_load_missing_file_is_noop() {
        let (temp, _bus, store, engine) = setup();
        let report = engine.load(temp.path().join("absent.json")).unwrap();
        assert_eq!(report, LoadReport::default());
        assert!(store.keys(".*").unwrap().is_empty());
    }

    #[test]
    fn test_load_reports_failing_section() {
        let (temp, _bus, _store, engine) = setup();
        let path = temp.path().join("corrupt.json");
        fs::write(&path, "this is not json").unwrap();

        let err = engine.load(&path).unwrap_err();
        match err {
            Error::Decode { section, .. } => assert_eq!(section, ValueKind::Hash),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_keeps_sections_before_a_bad_one() {
        let (temp, _bus, store, engine) = setup();
        let path = temp.path().join("partial.json");
        // Valid hash section, then garbage where the list section should be.
        fs::write(&path, "{\"h\": {\"f\": \"v\"}}\n[not a map").unwrap();

        let err = engine.load(&path).unwrap_err();
        match err {
            Error::Decode { section, .. } => assert_eq!(section, ValueKind::List),
            other => panic!("unexpected error: {other:?}"),
        }
        // The hash section was applied before the failure was reported.
        assert_eq!(store.hget("h", "f").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_snapshot_has_four_json_sections() {
        let (temp, _bus, store, engine) = setup();
        populate(&store);
        let path = temp.path().join("dump.json");
        match engine.bg_save(&path) {
            SaveOutcome::Started(ticket) => ticket.wait().map(|_| ()).unwrap(),
            SaveOutcome::Clean => panic!("save should run"),
        }

        let text = fs::read_to_string(&path).unwrap();
        let mut de = serde_json::Deserializer::from_str(&text);
        let hashes: HashSections = decode_section(&mut de, ValueKind::Hash).unwrap();
        let lists: ListSections = decode_section(&mut de, ValueKind::List).unwrap();
        let sets: SetSections = decode_section(&mut de, ValueKind::Set).unwrap();
        let strings: StringSections = decode_section(&mut de, ValueKind::String).unwrap();

        assert!(hashes.contains_key("my first hash"));
        assert!(lists.contains_key("a list"));
        assert!(sets.contains_key("a set"));
        assert!(strings.contains_key("a string"));
        assert!(strings.contains_key("my counter"));
    }

    #[test]
    fn test_cancelled_save_leaves_no_file() {
        let (temp, _bus, store, _engine) = setup();
        populate(&store);
        let path = temp.path().join("cancelled.json");

        let cancel = AtomicBool::new(true);
        let file_lock = Mutex::new(());
        let err = write_snapshot(&store, &file_lock, &path, &cancel, 1).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(!path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_save_failure_reports_through_ticket() {
        let (temp, _bus, store, engine) = setup();
        populate(&store);
        // A directory path as destination makes the rename/create fail.
        let path = temp.path().to_path_buf();

        match engine.bg_save(&path) {
            SaveOutcome::Started(ticket) => {
                assert!(ticket.wait().is_err());
            }
            SaveOutcome::Clean => panic!("save should run"),
        }
    }

    #[test]
    fn test_failed_save_rearms_the_gate() {
        let (temp, _bus, store, engine) = setup();
        populate(&store);

        // A directory path as destination makes the rename fail.
        match engine.bg_save(temp.path().to_path_buf()) {
            SaveOutcome::Started(ticket) => assert!(ticket.wait().is_err()),
            SaveOutcome::Clean => panic!("save should run"),
        }

        // The failure was not recorded as a save; a retry with no new
        // mutations still runs.
        let path = temp.path().join("retry.json");
        match engine.bg_save(&path) {
            SaveOutcome::Started(ticket) => ticket.wait().map(|_| ()).unwrap(),
            SaveOutcome::Clean => panic!("retry must not be short-circuited"),
        }
        assert!(path.exists());
    }

    #[test]
    fn test_try_wait_reports_after_completion() {
        let (temp, _bus, store, engine) = setup();
        populate(&store);
        let path = temp.path().join("ember.json");

        let ticket = match engine.bg_save(&path) {
            SaveOutcome::Started(ticket) => ticket,
            SaveOutcome::Clean => panic!("save should run"),
        };

        let mut outcome = None;
        for _ in 0..200 {
            if let Some(result) = ticket.try_wait() {
                outcome = Some(result);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(25));
        }
        assert!(outcome.expect("save did not finish in time").is_ok());
        assert!(path.exists());
    }
}
