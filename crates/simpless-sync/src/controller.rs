//! # Sync Controller
//!
//! Single owner of the published product list.
//!
//! ## Command Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Controller                                   │
//! │                                                                         │
//! │  ConnectivityMonitor ──connectivity_changed()──┐                       │
//! │  Consumer ───────────refresh() / delete_*()────┤                       │
//! │                                                 ▼                       │
//! │                                   ┌─────────────────────────┐          │
//! │                                   │ unbounded mpsc (FIFO)   │          │
//! │                                   └────────────┬────────────┘          │
//! │                                                │ one at a time         │
//! │                                                ▼                       │
//! │  ┌───────────────────────────────────────────────────────────────┐     │
//! │  │ controller task (only writer of SyncState)                    │     │
//! │  │                                                               │     │
//! │  │  Online  ──► catalog.fetch_catalog() ─► dedupe ─► publish     │     │
//! │  │                                              └──► cache.upsert│     │
//! │  │  Offline ──► cache.fetch_all() ─────────► dedupe ─► publish   │     │
//! │  │  Delete  ──► cache.delete_where() ──────► filter ─► publish   │     │
//! │  └──────────────────────────────┬────────────────────────────────┘     │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │            watch::Sender<SyncState> ──► snapshot() / subscribe()       │
//! │                                 └─────► SyncEventEmitter               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Queue Policy
//! Wait-and-run: every trigger is queued and executed in arrival order.
//! A run of connectivity signals queued back to back collapses into the
//! newest one, since only the final mode matters. Refreshes, deletes and
//! flushes are never skipped or reordered. The last connectivity signal is
//! always the last one applied, so `is_offline` always matches the monitor.
//!
//! ## Failure Handling
//! Dependency failures never corrupt `products`. They are logged, recorded
//! in `last_error` and reported to the emitter; command calls also get the
//! error back.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use simpless_core::{dedupe, Product, ProductId};

use crate::cache::ProductCache;
use crate::catalog::CatalogSource;
use crate::connectivity::NetworkStatus;
use crate::error::{SyncError, SyncResult};

// =============================================================================
// Published State
// =============================================================================

/// Everything a consumer needs to render the product list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncState {
    /// Unique by id, in fetch/load order.
    pub products: Vec<Product>,

    /// True after the monitor's last signal was `offline`.
    pub is_offline: bool,

    /// When `products` was last rebuilt from the catalog or the cache.
    pub last_synced_at: Option<DateTime<Utc>>,

    /// Most recent absorbed failure; cleared by the next successful rebuild.
    pub last_error: Option<String>,
}

impl SyncState {
    /// Product ids in published order.
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.products.iter().map(|p| p.id).collect()
    }
}

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Receives every published state and every absorbed error.
///
/// Called on the controller task; implementations must not block.
pub trait SyncEventEmitter: Send + Sync {
    /// Emits the state just committed.
    fn emit_state(&self, state: &SyncState);

    /// Emits an absorbed failure.
    fn emit_error(&self, message: &str, retryable: bool);
}

/// No-op event emitter.
pub struct NoOpEmitter;

impl SyncEventEmitter for NoOpEmitter {
    fn emit_state(&self, _state: &SyncState) {}
    fn emit_error(&self, _message: &str, _retryable: bool) {}
}

// =============================================================================
// Commands
// =============================================================================

type Reply = oneshot::Sender<SyncResult<()>>;

/// Work items processed by the controller task.
#[derive(Debug)]
enum SyncCommand {
    /// New status from the connectivity monitor.
    Connectivity(NetworkStatus),
    /// Re-run the branch for the current mode.
    Refresh { reply: Reply },
    /// Remove these ids from cache, then from `products`.
    Delete {
        ids: HashSet<ProductId>,
        reply: Reply,
    },
    /// Empty cache, then `products`.
    DeleteAll { reply: Reply },
    /// Replies once everything queued before it has run.
    Flush { reply: Reply },
    /// Stop the loop.
    Shutdown,
}

// =============================================================================
// Handle
// =============================================================================

/// Cloneable handle to a running controller.
///
/// The loop stops on [`shutdown`](Self::shutdown) or when every handle is
/// dropped.
#[derive(Clone)]
pub struct SyncControllerHandle {
    cmd_tx: mpsc::UnboundedSender<SyncCommand>,
    state_rx: watch::Receiver<SyncState>,
}

impl SyncControllerHandle {
    /// Last committed state. Never waits on I/O.
    pub fn snapshot(&self) -> SyncState {
        self.state_rx.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state_rx.clone()
    }

    /// Queues a connectivity transition. Non-blocking; safe to call from
    /// the monitor callback.
    pub fn connectivity_changed(&self, status: NetworkStatus) -> SyncResult<()> {
        self.send(SyncCommand::Connectivity(status))
    }

    /// Re-fetches (online) or reloads the cache (offline).
    pub async fn refresh(&self) -> SyncResult<()> {
        self.request(|reply| SyncCommand::Refresh { reply }).await
    }

    /// Deletes one product from cache and list.
    pub async fn delete_product(&self, id: ProductId) -> SyncResult<()> {
        self.delete_selected([id]).await
    }

    /// Deletes several products in one cache transaction.
    pub async fn delete_selected(
        &self,
        ids: impl IntoIterator<Item = ProductId>,
    ) -> SyncResult<()> {
        let ids: HashSet<ProductId> = ids.into_iter().collect();
        self.request(|reply| SyncCommand::Delete { ids, reply }).await
    }

    /// Deletes every cached product and clears the list.
    pub async fn delete_all_products(&self) -> SyncResult<()> {
        self.request(|reply| SyncCommand::DeleteAll { reply }).await
    }

    /// Waits until every command queued before this call has finished.
    pub async fn flush(&self) -> SyncResult<()> {
        self.request(|reply| SyncCommand::Flush { reply }).await
    }

    /// Stops the controller after the commands already queued.
    pub fn shutdown(&self) -> SyncResult<()> {
        self.send(SyncCommand::Shutdown)
    }

    fn send(&self, cmd: SyncCommand) -> SyncResult<()> {
        self.cmd_tx.send(cmd).map_err(|_| SyncError::ShuttingDown)
    }

    async fn request(&self, make: impl FnOnce(Reply) -> SyncCommand) -> SyncResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make(reply_tx))?;
        reply_rx.await.map_err(|_| SyncError::ShuttingDown)?
    }
}

// =============================================================================
// Sync Controller
// =============================================================================

/// Owns [`SyncState`] and serializes every transition.
pub struct SyncController {
    catalog: Arc<dyn CatalogSource>,
    cache: Arc<dyn ProductCache>,
    emitter: Arc<dyn SyncEventEmitter>,
    state_tx: watch::Sender<SyncState>,
    /// Last connectivity signal; online until told otherwise.
    mode: NetworkStatus,
}

impl SyncController {
    /// Creates a controller with no emitter.
    pub fn new(catalog: Arc<dyn CatalogSource>, cache: Arc<dyn ProductCache>) -> Self {
        Self::with_emitter(catalog, cache, Arc::new(NoOpEmitter))
    }

    /// Creates a controller with an event emitter.
    pub fn with_emitter(
        catalog: Arc<dyn CatalogSource>,
        cache: Arc<dyn ProductCache>,
        emitter: Arc<dyn SyncEventEmitter>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SyncState::default());

        SyncController {
            catalog,
            cache,
            emitter,
            state_tx,
            mode: NetworkStatus::Online,
        }
    }

    /// Spawns the command loop and returns a handle.
    ///
    /// Nothing is fetched until the first connectivity signal or refresh.
    pub fn start(self) -> SyncControllerHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let state_rx = self.state_tx.subscribe();

        tokio::spawn(async move {
            self.run(cmd_rx).await;
        });

        SyncControllerHandle { cmd_tx, state_rx }
    }

    /// Main loop.
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<SyncCommand>) {
        info!("Sync controller started");

        let mut pending: Option<SyncCommand> = None;

        loop {
            let cmd = match pending.take() {
                Some(cmd) => cmd,
                None => match cmd_rx.recv().await {
                    Some(cmd) => cmd,
                    None => break,
                },
            };

            match cmd {
                SyncCommand::Connectivity(status) => {
                    let status = Self::newest_signal(status, &mut cmd_rx, &mut pending);
                    debug!(%status, "Connectivity changed");
                    self.mode = status;
                    // failures are already recorded in state
                    let _ = self.sync_current_mode().await;
                }
                SyncCommand::Refresh { reply } => {
                    let result = self.sync_current_mode().await;
                    let _ = reply.send(result);
                }
                SyncCommand::Delete { ids, reply } => {
                    let result = self.delete(ids).await;
                    let _ = reply.send(result);
                }
                SyncCommand::DeleteAll { reply } => {
                    let result = self.delete_all().await;
                    let _ = reply.send(result);
                }
                SyncCommand::Flush { reply } => {
                    let _ = reply.send(Ok(()));
                }
                SyncCommand::Shutdown => {
                    info!("Sync controller shutting down");
                    break;
                }
            }
        }

        info!("Sync controller stopped");
    }

    /// Skips past connectivity signals already queued behind `status`,
    /// stopping at the first other command, which is parked in `pending`.
    fn newest_signal(
        mut status: NetworkStatus,
        cmd_rx: &mut mpsc::UnboundedReceiver<SyncCommand>,
        pending: &mut Option<SyncCommand>,
    ) -> NetworkStatus {
        let mut skipped = 0usize;
        while let Ok(cmd) = cmd_rx.try_recv() {
            match cmd {
                SyncCommand::Connectivity(newer) => {
                    status = newer;
                    skipped += 1;
                }
                other => {
                    *pending = Some(other);
                    break;
                }
            }
        }
        if skipped > 0 {
            debug!(skipped, %status, "Collapsed queued connectivity signals");
        }
        status
    }

    async fn sync_current_mode(&mut self) -> SyncResult<()> {
        match self.mode {
            NetworkStatus::Online => self.sync_from_catalog().await,
            NetworkStatus::Offline => self.load_from_cache().await,
        }
    }

    /// Online branch: fetch, publish, then persist best-effort.
    async fn sync_from_catalog(&mut self) -> SyncResult<()> {
        let fetched = match self.catalog.fetch_catalog().await {
            Ok(products) => products,
            Err(e) => {
                warn!(error = %e, "Catalog fetch failed, keeping current products");
                self.absorb(&e, |state| state.is_offline = false);
                return Err(e);
            }
        };

        let fetched_count = fetched.len();
        let products = dedupe(fetched);
        if products.len() != fetched_count {
            debug!(
                fetched = fetched_count,
                unique = products.len(),
                "Dropped duplicate catalog entries"
            );
        }

        self.commit(|state| {
            state.products = products.clone();
            state.is_offline = false;
            state.last_synced_at = Some(Utc::now());
            state.last_error = None;
        });
        info!(count = products.len(), "Published catalog products");

        match self.cache.upsert_missing(&products).await {
            Ok(inserted) => debug!(inserted, "Persisted new products to cache"),
            Err(e) => {
                let e = SyncError::Storage(e);
                error!(error = %e, "Failed to persist fetched products");
                self.emitter.emit_error(&e.to_string(), e.is_retryable());
            }
        }

        Ok(())
    }

    /// Offline branch: reload everything from the cache.
    async fn load_from_cache(&mut self) -> SyncResult<()> {
        match self.cache.fetch_all().await {
            Ok(cached) => {
                let products = dedupe(cached);
                info!(count = products.len(), "Loaded products from cache");
                self.commit(|state| {
                    state.products = products;
                    state.is_offline = true;
                    state.last_synced_at = Some(Utc::now());
                    state.last_error = None;
                });
                Ok(())
            }
            Err(e) => {
                let e = SyncError::Storage(e);
                error!(error = %e, "Failed to load cached products");
                self.absorb(&e, |state| state.is_offline = true);
                Err(e)
            }
        }
    }

    async fn delete(&mut self, ids: HashSet<ProductId>) -> SyncResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        match self.cache.delete_where(&ids).await {
            Ok(removed) => {
                debug!(requested = ids.len(), removed, "Deleted cached products");
                self.commit(|state| state.products.retain(|p| !ids.contains(&p.id)));
                Ok(())
            }
            Err(e) => {
                let e = SyncError::Storage(e);
                error!(error = %e, "Delete failed, products unchanged");
                self.absorb(&e, |_| {});
                Err(e)
            }
        }
    }

    async fn delete_all(&mut self) -> SyncResult<()> {
        match self.cache.delete_all().await {
            Ok(removed) => {
                info!(removed, "Cleared product cache");
                self.commit(|state| state.products.clear());
                Ok(())
            }
            Err(e) => {
                let e = SyncError::Storage(e);
                error!(error = %e, "Delete all failed, products unchanged");
                self.absorb(&e, |_| {});
                Err(e)
            }
        }
    }

    /// Applies `update`, publishes the result and notifies the emitter.
    fn commit(&self, update: impl FnOnce(&mut SyncState)) {
        self.state_tx.send_modify(update);
        let snapshot = self.state_tx.borrow().clone();
        self.emitter.emit_state(&snapshot);
    }

    /// Records a failure without touching `products`.
    fn absorb(&self, err: &SyncError, update: impl FnOnce(&mut SyncState)) {
        let message = err.to_string();
        self.emitter.emit_error(&message, err.is_retryable());
        self.commit(|state| {
            update(state);
            state.last_error = Some(message);
        });
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for creating a SyncController with options.
#[derive(Default)]
pub struct SyncControllerBuilder {
    catalog: Option<Arc<dyn CatalogSource>>,
    cache: Option<Arc<dyn ProductCache>>,
    emitter: Option<Arc<dyn SyncEventEmitter>>,
}

impl SyncControllerBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the remote catalog.
    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogSource>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Sets the product cache.
    pub fn with_cache(mut self, cache: Arc<dyn ProductCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the event emitter.
    pub fn with_emitter(mut self, emitter: Arc<dyn SyncEventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Builds the SyncController.
    pub fn build(self) -> SyncResult<SyncController> {
        let catalog = self
            .catalog
            .ok_or_else(|| SyncError::InvalidConfig("Catalog source required".into()))?;
        let cache = self
            .cache
            .ok_or_else(|| SyncError::InvalidConfig("Product cache required".into()))?;
        let emitter = self.emitter.unwrap_or_else(|| Arc::new(NoOpEmitter));

        Ok(SyncController::with_emitter(catalog, cache, emitter))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use simpless_db::{CachedProductRepository, Database, DbConfig, DbError, DbResult};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn product(id: ProductId, title: &str) -> Product {
        Product::new(id, title, format!("about {title}"), format!("https://img/{id}.png"))
    }

    fn ids_sorted(mut ids: Vec<ProductId>) -> Vec<ProductId> {
        ids.sort_unstable();
        ids
    }

    // -------------------------------------------------------------------------
    // Fakes
    // -------------------------------------------------------------------------

    /// Catalog whose response is set by the test.
    struct FakeCatalog {
        response: Mutex<Result<Vec<Product>, String>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FakeCatalog {
        fn returning(products: Vec<Product>) -> Arc<Self> {
            Arc::new(FakeCatalog {
                response: Mutex::new(Ok(products)),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(products: Vec<Product>, delay: Duration) -> Arc<Self> {
            Arc::new(FakeCatalog {
                response: Mutex::new(Ok(products)),
                delay,
                calls: AtomicUsize::new(0),
            })
        }

        fn fail_with(&self, message: &str) {
            *self.response.lock().unwrap() = Err(message.to_string());
        }
    }

    #[async_trait]
    impl CatalogSource for FakeCatalog {
        async fn fetch_catalog(&self) -> SyncResult<Vec<Product>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &*self.response.lock().unwrap() {
                Ok(products) => Ok(products.clone()),
                Err(message) => Err(SyncError::Network(message.clone())),
            }
        }
    }

    /// Real SQLite cache with switchable read/write failures.
    struct FlakyCache {
        inner: CachedProductRepository,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
        /// Ids passed to each `upsert_missing` call.
        upserts: Mutex<Vec<Vec<ProductId>>>,
    }

    impl FlakyCache {
        fn new(inner: CachedProductRepository) -> Arc<Self> {
            Arc::new(FlakyCache {
                inner,
                fail_reads: AtomicBool::new(false),
                fail_writes: AtomicBool::new(false),
                upserts: Mutex::new(Vec::new()),
            })
        }

        fn check(flag: &AtomicBool) -> DbResult<()> {
            if flag.load(Ordering::SeqCst) {
                Err(DbError::QueryFailed("disk I/O error".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl ProductCache for FlakyCache {
        async fn upsert_missing(&self, products: &[Product]) -> DbResult<u64> {
            self.upserts
                .lock()
                .unwrap()
                .push(products.iter().map(|p| p.id).collect());
            Self::check(&self.fail_writes)?;
            self.inner.upsert_missing(products).await
        }

        async fn fetch_all(&self) -> DbResult<Vec<Product>> {
            Self::check(&self.fail_reads)?;
            self.inner.fetch_all().await
        }

        async fn delete_where(&self, ids: &HashSet<ProductId>) -> DbResult<u64> {
            Self::check(&self.fail_writes)?;
            self.inner.delete_where(ids).await
        }

        async fn delete_all(&self) -> DbResult<u64> {
            Self::check(&self.fail_writes)?;
            self.inner.delete_all().await
        }
    }

    #[derive(Default)]
    struct RecordingEmitter {
        states: Mutex<Vec<SyncState>>,
        errors: Mutex<Vec<String>>,
    }

    impl SyncEventEmitter for RecordingEmitter {
        fn emit_state(&self, state: &SyncState) {
            self.states.lock().unwrap().push(state.clone());
        }

        fn emit_error(&self, message: &str, _retryable: bool) {
            self.errors.lock().unwrap().push(message.to_string());
        }
    }

    struct Harness {
        _db: Database,
        repo: CachedProductRepository,
        catalog: Arc<FakeCatalog>,
        cache: Arc<FlakyCache>,
        handle: SyncControllerHandle,
    }

    async fn harness(catalog: Arc<FakeCatalog>) -> Harness {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let cache = FlakyCache::new(repo.clone());
        let handle = SyncController::new(catalog.clone(), cache.clone()).start();

        Harness {
            _db: db,
            repo,
            catalog,
            cache,
            handle,
        }
    }

    async fn signal(handle: &SyncControllerHandle, status: NetworkStatus) {
        handle.connectivity_changed(status).unwrap();
        handle.flush().await.unwrap();
    }

    // -------------------------------------------------------------------------
    // Scenarios
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_online_fetch_then_offline_fallback() {
        let h = harness(FakeCatalog::returning(vec![product(1, "a"), product(2, "b")])).await;

        signal(&h.handle, NetworkStatus::Online).await;
        let state = h.handle.snapshot();
        assert_eq!(state.product_ids(), vec![1, 2]);
        assert!(!state.is_offline);
        assert!(state.last_synced_at.is_some());

        let cached: Vec<ProductId> = h.repo.fetch_all().await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids_sorted(cached), vec![1, 2]);

        signal(&h.handle, NetworkStatus::Offline).await;
        let state = h.handle.snapshot();
        assert_eq!(ids_sorted(state.product_ids()), vec![1, 2]);
        assert!(state.is_offline);
    }

    #[tokio::test]
    async fn test_delete_while_offline_persists() {
        let h = harness(FakeCatalog::returning(vec![])).await;
        h.repo
            .upsert_missing(&[product(1, "a"), product(2, "b")])
            .await
            .unwrap();

        signal(&h.handle, NetworkStatus::Offline).await;
        assert_eq!(h.handle.snapshot().product_ids(), vec![1, 2]);

        h.handle.delete_product(1).await.unwrap();

        assert_eq!(h.handle.snapshot().product_ids(), vec![2]);
        let cached: Vec<ProductId> = h.repo.fetch_all().await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(cached, vec![2]);
    }

    #[tokio::test]
    async fn test_fetch_failure_does_not_flip_offline_flag() {
        let h = harness(FakeCatalog::returning(vec![product(1, "a"), product(2, "b")])).await;
        signal(&h.handle, NetworkStatus::Online).await;

        h.catalog.fail_with("connection reset");
        let err = h.handle.refresh().await.unwrap_err();

        assert!(err.is_network_error());
        let state = h.handle.snapshot();
        assert!(!state.is_offline);
        assert_eq!(state.product_ids(), vec![1, 2]);
        assert!(state.last_error.as_deref().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_duplicate_payload_publishes_one_entry_per_id() {
        let h = harness(FakeCatalog::returning(vec![
            product(5, "first"),
            product(6, "six"),
            product(5, "second"),
        ]))
        .await;

        signal(&h.handle, NetworkStatus::Online).await;

        let state = h.handle.snapshot();
        assert_eq!(state.product_ids(), vec![5, 6]);
        assert_eq!(state.products[0].title, "first");
        assert_eq!(h.repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_cache_receives_deduplicated_products() {
        let h = harness(FakeCatalog::returning(vec![
            product(5, "first"),
            product(6, "six"),
            product(5, "second"),
            product(6, "six again"),
        ]))
        .await;

        h.handle.refresh().await.unwrap();

        assert_eq!(*h.cache.upserts.lock().unwrap(), vec![vec![5, 6]]);
        let cached = h.repo.fetch_all().await.unwrap();
        assert_eq!(cached[0].title, "first");
    }

    // -------------------------------------------------------------------------
    // Failure handling
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_storage_failure_on_delete_keeps_products() {
        let h = harness(FakeCatalog::returning(vec![product(1, "a"), product(2, "b")])).await;
        signal(&h.handle, NetworkStatus::Online).await;

        h.cache.fail_writes.store(true, Ordering::SeqCst);

        let err = h.handle.delete_product(1).await.unwrap_err();
        assert!(matches!(err, SyncError::Storage(_)));
        assert_eq!(h.handle.snapshot().product_ids(), vec![1, 2]);

        let err = h.handle.delete_all_products().await.unwrap_err();
        assert!(matches!(err, SyncError::Storage(_)));
        assert_eq!(h.handle.snapshot().product_ids(), vec![1, 2]);
        assert!(h.handle.snapshot().last_error.is_some());
    }

    #[tokio::test]
    async fn test_offline_load_failure_keeps_products_and_sets_flag() {
        let h = harness(FakeCatalog::returning(vec![product(1, "a")])).await;
        signal(&h.handle, NetworkStatus::Online).await;

        h.cache.fail_reads.store(true, Ordering::SeqCst);
        signal(&h.handle, NetworkStatus::Offline).await;

        let state = h.handle.snapshot();
        assert!(state.is_offline);
        assert_eq!(state.product_ids(), vec![1]);
        assert!(state.last_error.is_some());
    }

    #[tokio::test]
    async fn test_persist_failure_after_fetch_keeps_published_list() {
        let h = harness(FakeCatalog::returning(vec![product(1, "a"), product(2, "b")])).await;
        h.cache.fail_writes.store(true, Ordering::SeqCst);

        h.handle.refresh().await.unwrap();

        let state = h.handle.snapshot();
        assert_eq!(state.product_ids(), vec![1, 2]);
        assert!(state.last_error.is_none());
        assert_eq!(h.repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reconnect_with_failing_fetch_clears_offline_flag() {
        let h = harness(FakeCatalog::returning(vec![])).await;
        h.repo.upsert_missing(&[product(3, "cached")]).await.unwrap();
        signal(&h.handle, NetworkStatus::Offline).await;

        h.catalog.fail_with("dns failure");
        signal(&h.handle, NetworkStatus::Online).await;

        let state = h.handle.snapshot();
        assert!(!state.is_offline);
        assert_eq!(state.product_ids(), vec![3]);
        assert!(state.last_error.is_some());
    }

    #[tokio::test]
    async fn test_successful_rebuild_clears_last_error() {
        let h = harness(FakeCatalog::returning(vec![product(1, "a")])).await;
        h.catalog.fail_with("timeout");
        assert!(h.handle.refresh().await.is_err());
        assert!(h.handle.snapshot().last_error.is_some());

        *h.catalog.response.lock().unwrap() = Ok(vec![product(1, "a")]);
        h.handle.refresh().await.unwrap();
        assert!(h.handle.snapshot().last_error.is_none());
    }

    // -------------------------------------------------------------------------
    // Ordering
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_back_to_back_signals_end_on_last() {
        let catalog = FakeCatalog::slow(vec![product(1, "net")], Duration::from_millis(20));
        let h = harness(catalog).await;
        h.repo.upsert_missing(&[product(9, "cached")]).await.unwrap();

        // queued before the controller task gets to run
        for status in [
            NetworkStatus::Online,
            NetworkStatus::Offline,
            NetworkStatus::Online,
            NetworkStatus::Offline,
        ] {
            h.handle.connectivity_changed(status).unwrap();
        }
        h.handle.flush().await.unwrap();

        let state = h.handle.snapshot();
        assert!(state.is_offline);
        // stale online signals never reached the catalog
        assert_eq!(h.catalog.calls.load(Ordering::SeqCst), 0);
        assert_eq!(state.product_ids(), vec![9]);
    }

    #[tokio::test]
    async fn test_flush_waits_for_queued_sync_to_finish() {
        let catalog = FakeCatalog::slow(vec![product(1, "a")], Duration::from_millis(50));
        let h = harness(catalog).await;

        h.handle.connectivity_changed(NetworkStatus::Online).unwrap();
        h.handle.flush().await.unwrap();

        // the fetch and its cache write are both done
        assert_eq!(h.handle.snapshot().product_ids(), vec![1]);
        assert_eq!(h.repo.count().await.unwrap(), 1);

        h.handle.shutdown().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(matches!(h.handle.refresh().await, Err(SyncError::ShuttingDown)));
    }

    #[tokio::test]
    async fn test_collapsed_signals_keep_deletes_in_order() {
        let h = harness(FakeCatalog::returning(vec![
            product(1, "a"),
            product(2, "b"),
            product(9, "c"),
        ]))
        .await;
        h.repo
            .upsert_missing(&[product(1, "a"), product(9, "c")])
            .await
            .unwrap();

        h.handle.connectivity_changed(NetworkStatus::Online).unwrap();
        h.handle.connectivity_changed(NetworkStatus::Offline).unwrap();
        let (deleted, _) = tokio::join!(h.handle.delete_product(9), async {
            h.handle.connectivity_changed(NetworkStatus::Online).unwrap();
        });
        deleted.unwrap();
        h.handle.flush().await.unwrap();

        // offline load, then the delete, then one fetch that brings 9 back
        assert_eq!(h.catalog.calls.load(Ordering::SeqCst), 1);
        let state = h.handle.snapshot();
        assert!(!state.is_offline);
        assert_eq!(state.product_ids(), vec![1, 2, 9]);
        assert_eq!(h.repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_refresh_while_offline_reloads_cache() {
        let h = harness(FakeCatalog::returning(vec![])).await;
        signal(&h.handle, NetworkStatus::Offline).await;
        assert!(h.handle.snapshot().products.is_empty());

        h.repo.upsert_missing(&[product(4, "late")]).await.unwrap();
        h.handle.refresh().await.unwrap();

        assert_eq!(h.handle.snapshot().product_ids(), vec![4]);
        assert_eq!(h.catalog.calls.load(Ordering::SeqCst), 0);
    }

    // -------------------------------------------------------------------------
    // Deletes
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_delete_selected_keeps_survivor_order() {
        let h = harness(FakeCatalog::returning(vec![
            product(4, "d"),
            product(1, "a"),
            product(3, "c"),
            product(2, "b"),
        ]))
        .await;
        signal(&h.handle, NetworkStatus::Online).await;

        h.handle.delete_selected([1, 2]).await.unwrap();

        assert_eq!(h.handle.snapshot().product_ids(), vec![4, 3]);
        assert_eq!(h.repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_noop() {
        let h = harness(FakeCatalog::returning(vec![product(1, "a")])).await;
        signal(&h.handle, NetworkStatus::Online).await;

        h.handle.delete_product(42).await.unwrap();
        h.handle.delete_selected(Vec::new()).await.unwrap();

        assert_eq!(h.handle.snapshot().product_ids(), vec![1]);
    }

    #[tokio::test]
    async fn test_delete_all_clears_cache_and_list() {
        let h = harness(FakeCatalog::returning(vec![product(1, "a"), product(2, "b")])).await;
        signal(&h.handle, NetworkStatus::Online).await;

        h.handle.delete_all_products().await.unwrap();

        assert!(h.handle.snapshot().products.is_empty());
        assert_eq!(h.repo.count().await.unwrap(), 0);

        // the next fetch repopulates the cache
        h.handle.refresh().await.unwrap();
        assert_eq!(h.repo.count().await.unwrap(), 2);
    }

    // -------------------------------------------------------------------------
    // Publishing & lifecycle
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let h = harness(FakeCatalog::returning(vec![product(1, "a")])).await;
        let mut rx = h.handle.subscribe();

        h.handle.connectivity_changed(NetworkStatus::Online).unwrap();

        let state = tokio::time::timeout(
            Duration::from_secs(2),
            rx.wait_for(|s| !s.products.is_empty()),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert_eq!(state.product_ids(), vec![1]);
    }

    #[tokio::test]
    async fn test_emitter_receives_states_and_errors() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = FakeCatalog::returning(vec![product(1, "a")]);
        let emitter = Arc::new(RecordingEmitter::default());

        let handle = SyncControllerBuilder::new()
            .with_catalog(catalog.clone())
            .with_cache(Arc::new(db.products()))
            .with_emitter(emitter.clone())
            .build()
            .unwrap()
            .start();

        handle.refresh().await.unwrap();
        catalog.fail_with("offline");
        assert!(handle.refresh().await.is_err());

        let states = emitter.states.lock().unwrap();
        assert_eq!(states[0].product_ids(), vec![1]);
        assert!(states.last().unwrap().last_error.is_some());
        assert_eq!(emitter.errors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_builder_requires_dependencies() {
        let err = SyncControllerBuilder::new()
            .with_catalog(FakeCatalog::returning(vec![]))
            .build()
            .err()
            .unwrap();
        assert!(err.is_config_error());
    }

    #[tokio::test]
    async fn test_commands_fail_after_shutdown() {
        let h = harness(FakeCatalog::returning(vec![])).await;

        h.handle.shutdown().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(matches!(
            h.handle.refresh().await,
            Err(SyncError::ShuttingDown)
        ));
        assert!(h
            .handle
            .connectivity_changed(NetworkStatus::Online)
            .is_err());
    }

    #[test]
    fn test_default_state() {
        let state = SyncState::default();
        assert!(state.products.is_empty());
        assert!(!state.is_offline);
        assert!(state.last_synced_at.is_none());
    }
}
