//! Cache manager for previously captured images.
//!
//! Accumulates a record per captured file, decodes pixel data and metadata on
//! one background thread, and answers navigation requests either immediately
//! (already decoded) or by notifying the caller once the decode finishes.
//! Guarantees, under arbitrary concurrent callers:
//!
//! - no image is ever decoded twice concurrently;
//! - no public operation blocks the calling thread beyond brief bookkeeping;
//! - every registered callback for an image fires exactly once, after that
//!   image finished decoding successfully.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::decode::{DecodePipeline, FileDecodePipeline};
use crate::error::{Error, Result};
use crate::executor::SingleThreadExecutor;
use crate::record::{ImagePayload, ImageRecord, LoadState, RecordHandle, RecordId};
use crate::store::{RecordStore, RequestKind};

/// Callback invoked once the requested image has its data available.
///
/// Runs with the manager's internal lock released, either on the caller's
/// thread (image already decoded) or on the background worker (decode just
/// finished), so it may call back into the manager.
pub type ImageReadyFn = Box<dyn FnOnce(RecordHandle) + Send + 'static>;

struct CacheState {
    store: RecordStore,
    /// Pending notification callbacks per record, in registration order.
    waiters: HashMap<RecordId, Vec<ImageReadyFn>>,
    /// Records with a decode task submitted but not yet completed.
    loading: HashSet<RecordId>,
    /// Total bytes of decoded pixel data held so far.
    cached_bytes: usize,
    budget_reported: bool,
}

struct Shared {
    pipeline: Box<dyn DecodePipeline>,
    state: Mutex<CacheState>,
    max_cached_bytes: usize,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        // The lock only guards bookkeeping; a poisoned guard still holds
        // consistent data, so recover rather than cascade the panic.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Manages the list of images taken during this session, loading each one in
/// the background. Access to the stored images is asynchronous throughout,
/// as an image may still be decoding when it is requested.
pub struct PreviousImagesManager {
    shared: Arc<Shared>,
    // Declared last: drop joins the worker while `shared` is still alive.
    executor: SingleThreadExecutor,
}

impl PreviousImagesManager {
    /// Creates a manager decoding from the filesystem.
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_pipeline(config, Box::new(FileDecodePipeline))
    }

    /// Creates a manager with a custom decode pipeline; used by the embedding
    /// application for alternate sources and by tests for stubbing.
    pub fn with_pipeline(config: CacheConfig, pipeline: Box<dyn DecodePipeline>) -> Result<Self> {
        let executor = SingleThreadExecutor::new(&config.worker_thread_name)?;
        let shared = Arc::new(Shared {
            pipeline,
            state: Mutex::new(CacheState {
                store: RecordStore::new(),
                waiters: HashMap::new(),
                loading: HashSet::new(),
                cached_bytes: 0,
                budget_reported: false,
            }),
            max_cached_bytes: config.max_cached_bytes,
        });
        Ok(Self { shared, executor })
    }

    /// Returns whether any images have been added at all.
    pub fn images_available(&self) -> bool {
        !self.shared.lock_state().store.is_empty()
    }

    /// Appends a newly captured image to the end of the list and starts
    /// decoding it in the background. Returns immediately.
    pub fn add_new_image(&self, filename: impl Into<PathBuf>) {
        let record = {
            let mut state = self.shared.lock_state();
            let record = state.store.append(filename.into());
            state.loading.insert(record.id());
            record
        };
        debug!(path = %record.filename().display(), "new capture added, scheduling decode");
        self.submit_decode(record);
    }

    /// Asynchronously gets an image relative to `reference` (ignored for
    /// [`RequestKind::Last`]).
    ///
    /// When the target is already decoded, `on_ready` is invoked before this
    /// call returns, on the calling thread. When it is still pending,
    /// `on_ready` is registered and fires on the worker thread once the
    /// decode completes. When the store is empty, the reference is unknown,
    /// the request walks past an end of the list, or the target's decode
    /// failed earlier, there is nothing to show and `on_ready` is never
    /// invoked.
    pub fn request<F>(&self, kind: RequestKind, reference: Option<&RecordHandle>, on_ready: F)
    where
        F: FnOnce(RecordHandle) + Send + 'static,
    {
        let on_ready: ImageReadyFn = Box::new(on_ready);
        let mut invoke_now = None;
        let mut to_decode = None;
        {
            let mut state = self.shared.lock_state();
            let Some(target) = state.store.navigate(kind, reference.map(|handle| handle.as_ref())) else {
                return; // nothing to show; silent by contract
            };
            match target.state() {
                LoadState::Loaded => invoke_now = Some((on_ready, target)),
                LoadState::Failed => {
                    debug!(
                        path = %target.filename().display(),
                        "requested image failed to decode earlier, dropping request"
                    );
                }
                LoadState::Pending => {
                    let id = target.id();
                    state.waiters.entry(id).or_default().push(on_ready);
                    if state.loading.insert(id) {
                        to_decode = Some(target);
                    }
                }
            }
        }

        if let Some((on_ready, target)) = invoke_now {
            on_ready(target);
        }
        if let Some(record) = to_decode {
            debug!(path = %record.filename().display(), "scheduling decode for requested image");
            self.submit_decode(record);
        }
    }

    /// Total bytes of decoded pixel data currently held by the cache.
    ///
    /// Grows monotonically; nothing is evicted when the configured
    /// `max_cached_bytes` budget is exceeded, the overrun is only reported
    /// via a `warn!` event. Exposed so the embedding application can surface
    /// cache growth in its own diagnostics.
    pub fn cached_bytes(&self) -> usize {
        self.shared.lock_state().cached_bytes
    }

    /// Returns whether `record` is the first image in the list.
    pub fn is_first_image(&self, record: &RecordHandle) -> bool {
        self.shared.lock_state().store.is_first(record)
    }

    /// Returns whether `record` is the last image in the list.
    pub fn is_last_image(&self, record: &RecordHandle) -> bool {
        self.shared.lock_state().store.is_last(record)
    }

    fn submit_decode(&self, record: RecordHandle) {
        let shared = Arc::clone(&self.shared);
        self.executor.submit(move || decode_task(&shared, record));
    }
}

/// Runs on the worker thread: decode one record, then notify its waiters.
fn decode_task(shared: &Shared, record: RecordHandle) {
    let waiters = match run_pipeline(shared.pipeline.as_ref(), &record) {
        Ok(payload) => complete_loaded(shared, &record, payload),
        Err(err) => {
            complete_failed(shared, &record, &err);
            Vec::new()
        }
    };
    // Lock released; each waiter fires exactly once, in registration order.
    for on_ready in waiters {
        on_ready(record.clone());
    }
}

fn run_pipeline(pipeline: &dyn DecodePipeline, record: &ImageRecord) -> Result<ImagePayload> {
    let bytes = pipeline.load_bytes(record.filename())?;
    let decoded = pipeline.decode(&bytes)?;
    let metadata = pipeline.extract_metadata(&bytes);
    Ok(ImagePayload {
        width: decoded.width,
        height: decoded.height,
        pixels: decoded.pixels,
        metadata,
    })
}

fn complete_loaded(
    shared: &Shared,
    record: &RecordHandle,
    payload: ImagePayload,
) -> Vec<ImageReadyFn> {
    let byte_len = payload.byte_len();
    let mut state = shared.lock_state();
    record.publish(payload);
    state.loading.remove(&record.id());
    state.cached_bytes += byte_len;
    if state.cached_bytes > shared.max_cached_bytes && !state.budget_reported {
        state.budget_reported = true;
        warn!(
            cached_bytes = state.cached_bytes,
            max_cached_bytes = shared.max_cached_bytes,
            "decoded image cache exceeds its configured budget; nothing is evicted"
        );
    }
    debug!(path = %record.filename().display(), bytes = byte_len, "image decoded");
    state.waiters.remove(&record.id()).unwrap_or_default()
}

fn complete_failed(shared: &Shared, record: &RecordHandle, err: &Error) {
    let mut state = shared.lock_state();
    record.mark_failed();
    state.loading.remove(&record.id());
    let dropped = state
        .waiters
        .remove(&record.id())
        .map_or(0, |waiters| waiters.len());
    warn!(
        path = %record.filename().display(),
        error = %err,
        dropped_waiters = dropped,
        "image decode failed, record will stay unavailable"
    );
}
