//! Lazily loaded, process-wide cache of the permission table.
//!
//! The first caller of [`AccessControlStore::ensure_loaded`] reads and parses
//! the backing source while concurrent callers wait on a condition variable,
//! so a single load result is ever cached. Failed loads leave the store
//! unloaded; every permission check then denies and the next caller retries
//! the load.

use std::fmt;
use std::fs;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::context::Context;

use super::ACL_TARGET;
use super::errors::AclLoadError;
use super::list::AccessControlList;

/// Durable source of the permission document.
pub trait AclSource: Send + Sync {
    /// Reads the raw document for `context`.
    ///
    /// # Errors
    ///
    /// Returns [`AclLoadError`] when the document cannot be read.
    fn read(&self, context: &Context) -> Result<Vec<u8>, AclLoadError>;
}

/// Reads `<root>/sec/acl.json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileAclSource;

impl AclSource for FileAclSource {
    fn read(&self, context: &Context) -> Result<Vec<u8>, AclLoadError> {
        let path = context.acl_path();
        fs::read(&path).map_err(|source| AclLoadError::read(path, source))
    }
}

/// Observable load state of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AclState {
    /// Nothing cached; permission checks deny.
    Unloaded,
    /// A caller is reading the backing source.
    Loading,
    /// A table is cached and shared read-only.
    Loaded,
}

enum Slot {
    Unloaded,
    Loading,
    Loaded(Arc<AccessControlList>),
}

impl Slot {
    fn state(&self) -> AclState {
        match self {
            Self::Unloaded => AclState::Unloaded,
            Self::Loading => AclState::Loading,
            Self::Loaded(_) => AclState::Loaded,
        }
    }
}

/// Single-flight cache over an [`AclSource`].
pub struct AccessControlStore {
    source: Box<dyn AclSource>,
    slot: Mutex<Slot>,
    settled: Condvar,
}

impl fmt::Debug for AccessControlStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AccessControlStore")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Default for AccessControlStore {
    fn default() -> Self {
        Self::new(FileAclSource)
    }
}

impl AccessControlStore {
    /// Builds an unloaded store over `source`.
    #[must_use]
    pub fn new(source: impl AclSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            slot: Mutex::new(Slot::Unloaded),
            settled: Condvar::new(),
        }
    }

    /// Loads the permission table unless one is already cached.
    ///
    /// Read and parse failures are logged and leave the store unloaded; they
    /// never propagate.
    pub fn ensure_loaded(&self, context: &Context) {
        let mut slot = self.lock();
        loop {
            match slot.state() {
                AclState::Loaded => return,
                AclState::Loading => slot = self.wait(slot),
                AclState::Unloaded => break,
            }
        }
        *slot = Slot::Loading;
        drop(slot);

        let mut reset = LoadReset {
            store: self,
            settled: false,
        };
        let outcome = self
            .source
            .read(context)
            .and_then(|bytes| AccessControlList::from_json(&bytes));
        reset.settle(outcome, context);
    }

    /// Returns `true` when `fingerprint` may run `action`.
    ///
    /// Denies whenever no table is cached.
    #[must_use]
    pub fn is_permitted(&self, fingerprint: &str, action: &str) -> bool {
        self.snapshot()
            .is_some_and(|acl| acl.is_permitted(fingerprint, action))
    }

    /// Currently cached table, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<AccessControlList>> {
        match &*self.lock() {
            Slot::Loaded(acl) => Some(Arc::clone(acl)),
            Slot::Unloaded | Slot::Loading => None,
        }
    }

    /// Drops the cached table so the next [`Self::ensure_loaded`] re-reads it.
    ///
    /// Waits for an in-flight load to settle first.
    pub fn invalidate(&self) {
        let mut slot = self.lock();
        while matches!(*slot, Slot::Loading) {
            slot = self.wait(slot);
        }
        *slot = Slot::Unloaded;
        debug!(target: ACL_TARGET, "access control list invalidated");
    }

    /// Current load state.
    #[must_use]
    pub fn state(&self) -> AclState {
        self.lock().state()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| {
            warn!(target: ACL_TARGET, "access control cache lock poisoned; recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, Slot>) -> MutexGuard<'a, Slot> {
        self.settled
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Publishes the load outcome, or resets the slot if the source panicked.
struct LoadReset<'a> {
    store: &'a AccessControlStore,
    settled: bool,
}

impl LoadReset<'_> {
    fn settle(&mut self, outcome: Result<AccessControlList, AclLoadError>, context: &Context) {
        let next = match outcome {
            Ok(acl) => {
                debug!(
                    target: ACL_TARGET,
                    path = %context.acl_path(),
                    allow_all = acl.allows_all(),
                    "access control list loaded"
                );
                Slot::Loaded(Arc::new(acl))
            }
            Err(error) => {
                warn!(
                    target: ACL_TARGET,
                    %error,
                    "access control list unavailable; secure actions will be denied"
                );
                Slot::Unloaded
            }
        };
        *self.store.lock() = next;
        self.settled = true;
        self.store.settled.notify_all();
    }
}

impl Drop for LoadReset<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        *self.store.lock() = Slot::Unloaded;
        self.store.settled.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;

    /// Source serving a fixed document and counting reads.
    #[derive(Clone)]
    struct CountingSource {
        document: Arc<Mutex<Result<Vec<u8>, ()>>>,
        reads: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl CountingSource {
        fn serving(document: &str) -> Self {
            Self {
                document: Arc::new(Mutex::new(Ok(document.as_bytes().to_vec()))),
                reads: Arc::new(AtomicUsize::new(0)),
                delay: Duration::ZERO,
            }
        }

        fn failing() -> Self {
            Self {
                document: Arc::new(Mutex::new(Err(()))),
                ..Self::serving("{}")
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn replace(&self, document: &str) {
            *self.document.lock().expect("document lock") = Ok(document.as_bytes().to_vec());
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl AclSource for CountingSource {
        fn read(&self, context: &Context) -> Result<Vec<u8>, AclLoadError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            self.document.lock().expect("document lock").clone().map_err(|()| {
                AclLoadError::read(
                    context.acl_path(),
                    std::io::Error::from(std::io::ErrorKind::NotFound),
                )
            })
        }
    }

    #[fixture]
    fn context() -> Context {
        Context::new("/srv/api")
    }

    #[rstest]
    fn repeated_loads_reuse_the_cache(context: Context) {
        let source = CountingSource::serving(r#"{"alice":{"getStatus":true}}"#);
        let store = AccessControlStore::new(source.clone());

        store.ensure_loaded(&context);
        store.ensure_loaded(&context);
        store.ensure_loaded(&context);

        assert_eq!(source.reads(), 1);
        assert_eq!(store.state(), AclState::Loaded);
        assert!(store.is_permitted("alice", "getStatus"));
    }

    #[rstest]
    fn unloaded_store_denies_everything() {
        let store = AccessControlStore::new(CountingSource::serving(r#"{"*":true}"#));
        assert_eq!(store.state(), AclState::Unloaded);
        assert!(!store.is_permitted("alice", "getStatus"));
    }

    #[rstest]
    fn failed_load_fails_closed_and_retries(context: Context) {
        let source = CountingSource::failing();
        let store = AccessControlStore::new(source.clone());

        store.ensure_loaded(&context);
        assert_eq!(store.state(), AclState::Unloaded);
        assert!(!store.is_permitted("alice", "getStatus"));

        store.ensure_loaded(&context);
        assert_eq!(source.reads(), 2);
    }

    #[rstest]
    fn unparsable_document_fails_closed(context: Context) {
        let store = AccessControlStore::new(CountingSource::serving("[\"*\"]"));
        store.ensure_loaded(&context);
        assert_eq!(store.state(), AclState::Unloaded);
        assert!(!store.is_permitted("*", "*"));
    }

    #[rstest]
    fn concurrent_first_access_reads_once(context: Context) {
        let source =
            CountingSource::serving(r#"{"*":true}"#).slow(Duration::from_millis(50));
        let store = Arc::new(AccessControlStore::new(source.clone()));
        let context = Arc::new(context);
        let barrier = Arc::new(Barrier::new(8));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let context = Arc::clone(&context);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.ensure_loaded(&context);
                    store.is_permitted("anyone", "anything")
                })
            })
            .collect();

        for worker in workers {
            assert!(worker.join().expect("worker join"));
        }
        assert_eq!(source.reads(), 1);
    }

    #[rstest]
    fn invalidate_forces_a_fresh_read(context: Context) {
        let source = CountingSource::serving(r#"{"alice":{"getStatus":true}}"#);
        let store = AccessControlStore::new(source.clone());
        store.ensure_loaded(&context);
        assert!(!store.is_permitted("bob", "getStatus"));

        source.replace(r#"{"bob":"*"}"#);
        store.invalidate();
        assert_eq!(store.state(), AclState::Unloaded);

        store.ensure_loaded(&context);
        assert_eq!(source.reads(), 2);
        assert!(store.is_permitted("bob", "getStatus"));
        assert!(!store.is_permitted("alice", "getStatus"));
    }

    #[test]
    fn file_source_reads_from_security_directory() {
        let root = TempDir::new().expect("temp dir");
        let sec = root.path().join("sec");
        fs::create_dir_all(&sec).expect("create sec dir");
        fs::write(sec.join("acl.json"), r#"{"alice":{"getStatus":true}}"#).expect("write acl");
        let context = Context::new(
            camino::Utf8PathBuf::from_path_buf(root.path().to_path_buf()).expect("utf8 root"),
        );

        let store = AccessControlStore::default();
        store.ensure_loaded(&context);
        assert!(store.is_permitted("alice", "getStatus"));
    }

    #[test]
    fn missing_file_denies_everything() {
        let root = TempDir::new().expect("temp dir");
        let context = Context::new(
            camino::Utf8PathBuf::from_path_buf(root.path().to_path_buf()).expect("utf8 root"),
        );

        let store = AccessControlStore::default();
        store.ensure_loaded(&context);
        assert_eq!(store.state(), AclState::Unloaded);
        assert!(!store.is_permitted("alice", "getStatus"));
    }
}
