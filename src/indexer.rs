//! The indexing coordinator.
//!
//! Accepts index and reindex requests, de-duplicates them by input
//! path, fans extraction jobs out over a bounded worker pool, and
//! merges staged results into the persistent databases whenever the
//! pool goes quiescent or every `sync_interval` completions.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, mpsc, Notify, Semaphore};
use tracing::{debug, info, warn};

use crate::config::IndexerConfig;
use crate::error::IndexerError;
use crate::job::{IndexJob, JobId};
use crate::path_resolver::PathResolver;
use crate::resource::ResourceStore;
use crate::semantic::{ParseMode, UnitCache};
use crate::staging::{Category, StagingArea};
use crate::sync::{sync_all, SyncStats};

/// Events published by the coordinator.
#[derive(Debug, Clone)]
pub enum IndexEvent {
    /// The job finished, successfully or after an early abort. Any sync
    /// triggered by this completion has already run.
    Done { job: JobId, input: PathBuf },
}

#[derive(Debug, Default)]
struct CoordinatorState {
    /// Input paths with an active job.
    indexing: HashSet<PathBuf>,
    /// Active jobs by id.
    jobs: HashMap<JobId, PathBuf>,
    /// Next candidate job id.
    last_job_id: JobId,
    /// Completions since the last sync.
    job_counter: u32,
}

struct JobCompletion {
    id: JobId,
    input: PathBuf,
}

/// Coordinates extraction jobs and owns the staged data they produce.
pub struct Indexer {
    config: IndexerConfig,
    state: Arc<Mutex<CoordinatorState>>,
    staging: Arc<StagingArea>,
    unit_cache: Arc<dyn UnitCache>,
    resolver: Arc<PathResolver>,
    resources: ResourceStore,
    workers: Arc<Semaphore>,
    done_tx: mpsc::UnboundedSender<JobCompletion>,
    events: broadcast::Sender<IndexEvent>,
    quiescent: Arc<Notify>,
    shutting_down: AtomicBool,
}

impl Indexer {
    /// Create a coordinator rooted at `config.root` and start its
    /// completion loop. Must be called from within a Tokio runtime.
    pub fn new(config: IndexerConfig, unit_cache: Arc<dyn UnitCache>) -> Result<Self, IndexerError> {
        config.validate()?;
        fs::create_dir_all(&config.root)?;

        let state = Arc::new(Mutex::new(CoordinatorState::default()));
        let staging = Arc::new(StagingArea::new());
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(256);
        let quiescent = Arc::new(Notify::new());

        tokio::spawn(completion_loop(
            done_rx,
            Arc::clone(&state),
            Arc::clone(&staging),
            config.root.clone(),
            config.sync_interval,
            events.clone(),
            Arc::clone(&quiescent),
        ));

        let resources = ResourceStore::new(&config.resource_dir);
        let workers = Arc::new(Semaphore::new(config.max_workers.max(1)));

        info!(
            root = %config.root.display(),
            workers = config.max_workers,
            "indexer started"
        );

        Ok(Self {
            config,
            state,
            staging,
            unit_cache,
            resolver: Arc::new(PathResolver::new()),
            resources,
            workers,
            done_tx,
            events,
            quiescent,
            shutting_down: AtomicBool::new(false),
        })
    }

    /// Submit one translation unit for indexing.
    ///
    /// Rejected with [`IndexerError::DuplicateInput`] while a job for
    /// the same input is still active; the path may be resubmitted once
    /// that job completes.
    pub fn index(
        &self,
        input: impl Into<PathBuf>,
        arguments: Vec<String>,
        mode: ParseMode,
    ) -> Result<JobId, IndexerError> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(IndexerError::ShuttingDown);
        }
        let input = input.into();

        let id = {
            let mut state = self.lock_state();
            if state.indexing.contains(&input) {
                debug!(input = %input.display(), "rejecting duplicate index request");
                return Err(IndexerError::DuplicateInput(input));
            }
            let id = next_job_id(&mut state);
            state.indexing.insert(input.clone());
            state.jobs.insert(id, input.clone());
            id
        };

        self.spawn_job(IndexJob {
            id,
            mode,
            input: input.clone(),
            arguments,
        });

        debug!(job = id, input = %input.display(), "job dispatched");
        Ok(id)
    }

    /// Resubmit a file from its stored compile information.
    pub fn reindex(&self, filename: &Path, mode: ParseMode) -> Result<JobId, IndexerError> {
        debug!(
            filename = %filename.display(),
            record = %self.resources.information_path(filename).display(),
            "reindex requested"
        );

        let record = match self.resources.read_information(filename) {
            Ok(Some(record)) => record,
            Ok(None) => return Err(IndexerError::MissingResource(filename.to_path_buf())),
            Err(e) => {
                warn!(filename = %filename.display(), error = %e, "unreadable information record");
                return Err(IndexerError::MissingResource(filename.to_path_buf()));
            }
        };

        debug!(
            input = %record.input.display(),
            args = record.arguments.len(),
            "reindexing"
        );
        self.index(record.input, record.arguments, mode)
    }

    /// Subscribe to coordinator events.
    pub fn subscribe(&self) -> broadcast::Receiver<IndexEvent> {
        self.events.subscribe()
    }

    /// Number of jobs admitted and not yet completed.
    pub fn active_jobs(&self) -> usize {
        self.lock_state().jobs.len()
    }

    pub fn is_idle(&self) -> bool {
        self.active_jobs() == 0
    }

    /// The staged, not-yet-persisted data. Mainly for tests and tools.
    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Merge everything currently staged into the databases.
    ///
    /// Safe alongside active jobs; each category is merged under its
    /// own lock.
    pub fn sync_now(&self) -> Vec<(Category, SyncStats)> {
        sync_all(&self.config.root, &self.staging)
    }

    /// Stop admitting work, drain outstanding jobs, and run one final
    /// sync so nothing staged outlives the coordinator.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);

        loop {
            // Register for the wakeup before checking, so a notification
            // landing in between is not lost.
            let notified = self.quiescent.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_idle() {
                break;
            }
            notified.await;
        }

        let _ = sync_all(&self.config.root, &self.staging);
        info!("indexer drained and synced");
    }

    fn spawn_job(&self, job: IndexJob) {
        let staging = Arc::clone(&self.staging);
        let unit_cache = Arc::clone(&self.unit_cache);
        let resolver = Arc::clone(&self.resolver);
        let workers = Arc::clone(&self.workers);
        let done_tx = self.done_tx.clone();

        tokio::spawn(async move {
            // The semaphore is never closed; a failed acquire still runs
            // the job so completion bookkeeping stays correct.
            let _permit = workers.acquire_owned().await.ok();
            let completion = JobCompletion {
                id: job.id,
                input: job.input.clone(),
            };
            job.run(staging.as_ref(), unit_cache.as_ref(), resolver.as_ref())
                .await;
            let _ = done_tx.send(completion);
        });
    }

    fn lock_state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Monotonically advancing id, probing past ids still in use.
fn next_job_id(state: &mut CoordinatorState) -> JobId {
    loop {
        let id = state.last_job_id;
        state.last_job_id = state.last_job_id.wrapping_add(1);
        if !state.jobs.contains_key(&id) {
            return id;
        }
    }
}

/// Serialized completion handling. A single task drains the channel, so
/// bookkeeping and sync triggering never race between completions, and
/// the coordinator lock is only ever taken from here and the submitters.
async fn completion_loop(
    mut done_rx: mpsc::UnboundedReceiver<JobCompletion>,
    state: Arc<Mutex<CoordinatorState>>,
    staging: Arc<StagingArea>,
    root: PathBuf,
    sync_interval: u32,
    events: broadcast::Sender<IndexEvent>,
    quiescent: Arc<Notify>,
) {
    while let Some(done) = done_rx.recv().await {
        let (should_sync, idle) = {
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            state.jobs.remove(&done.id);
            state.indexing.remove(&done.input);
            state.job_counter += 1;

            let idle = state.jobs.is_empty();
            let should_sync = idle || state.job_counter == sync_interval;
            if should_sync {
                state.job_counter = 0;
            }
            (should_sync, idle)
        };

        if should_sync {
            debug!("syncing");
            sync_all(&root, &staging);
            debug!("synced");
        }

        let _ = events.send(IndexEvent::Done {
            job: done.id,
            input: done.input,
        });
        if idle {
            quiescent.notify_waiters();
        }
    }

    debug!("completion loop stopped");
}
