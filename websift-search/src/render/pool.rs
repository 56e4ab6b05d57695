//! Bounded pool of isolated rendering contexts.
//!
//! The pool owns a fixed-capacity slot table and at most one live engine
//! process per [`EngineKind`], never more engines than slots. Slots are
//! granted through a FIFO semaphore, so waiters are served in request order
//! and an acquire that cannot get a slot within the configured timeout fails
//! with [`SearchError::PoolUnavailable`] instead of hanging.
//!
//! Every acquired [`RenderingContext`] is a brand-new session that is
//! destroyed on release; nothing is reused between fetches. A context that
//! is dropped without an explicit [`RenderingContext::release`] (for
//! example because its task was cancelled by a timeout) closes itself on a
//! background task.
//!
//! Launching a kind while every slot's worth of engines is running shuts
//! down an engine of another kind that no context is using. Apart from that,
//! engines live until [`RenderPool::close_all`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::{Engine, EngineKind, EngineLauncher, RenderSession};
use crate::error::SearchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Free,
    Busy(EngineKind),
}

struct PoolInner {
    launcher: Arc<dyn EngineLauncher>,
    enabled: Vec<EngineKind>,
    acquire_timeout: Duration,
    permits: Arc<Semaphore>,
    slots: Mutex<Vec<Slot>>,
    engines: tokio::sync::Mutex<HashMap<EngineKind, Arc<dyn Engine>>>,
    closed: AtomicBool,
}

impl PoolInner {
    fn slots(&self) -> MutexGuard<'_, Vec<Slot>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn claim_slot(&self, kind: EngineKind) -> Option<SlotClaim<'_>> {
        let mut slots = self.slots();
        let index = slots.iter().position(|s| *s == Slot::Free)?;
        slots[index] = Slot::Busy(kind);
        Some(SlotClaim {
            pool: self,
            index,
            armed: true,
        })
    }

    fn free_slot(&self, index: usize) {
        let mut slots = self.slots();
        if let Some(slot) = slots.get_mut(index) {
            *slot = Slot::Free;
        }
    }

    fn resolve_kind(&self, requested: EngineKind) -> EngineKind {
        if self.enabled.contains(&requested) {
            requested
        } else {
            let fallback = self.enabled.first().copied().unwrap_or_default();
            tracing::debug!(%requested, %fallback, "engine kind not enabled, using fallback");
            fallback
        }
    }

    async fn engine(&self, kind: EngineKind) -> Result<Arc<dyn Engine>, SearchError> {
        let mut engines = self.engines.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(SearchError::PoolClosed);
        }
        if let Some(engine) = engines.get(&kind) {
            return Ok(Arc::clone(engine));
        }
        let capacity = self.slots().len();
        if engines.len() >= capacity {
            let busy: Vec<EngineKind> = self
                .slots()
                .iter()
                .filter_map(|slot| match slot {
                    Slot::Busy(in_use) => Some(*in_use),
                    Slot::Free => None,
                })
                .collect();
            let Some(idle) = engines.keys().copied().find(|k| !busy.contains(k)) else {
                return Err(SearchError::PoolUnavailable(
                    "every engine is serving a context".into(),
                ));
            };
            if let Some(evicted) = engines.remove(&idle) {
                match evicted.shutdown().await {
                    Ok(()) => {
                        tracing::info!(engine = %idle, replacement = %kind, "idle rendering engine shut down")
                    }
                    Err(err) => {
                        tracing::warn!(engine = %idle, error = %err, "idle rendering engine shutdown failed")
                    }
                }
            }
        }
        tracing::info!(engine = %kind, "launching rendering engine");
        let engine: Arc<dyn Engine> = Arc::from(self.launcher.launch(kind).await?);
        engines.insert(kind, Arc::clone(&engine));
        Ok(engine)
    }
}

/// A claimed slot that is freed again unless the acquire completes, so a
/// cancelled acquire cannot leak its slot.
struct SlotClaim<'a> {
    pool: &'a PoolInner,
    index: usize,
    armed: bool,
}

impl SlotClaim<'_> {
    fn keep(mut self) -> usize {
        self.armed = false;
        self.index
    }
}

impl Drop for SlotClaim<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.pool.free_slot(self.index);
        }
    }
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Slot table size.
    pub capacity: usize,
    /// Contexts currently handed out.
    pub live_contexts: usize,
    /// Engine processes currently running.
    pub live_engines: usize,
}

/// Shared handle to the rendering pool. Cloning is cheap.
#[derive(Clone)]
pub struct RenderPool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for RenderPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPool")
            .field("capacity", &self.capacity())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl RenderPool {
    /// Create a pool with `capacity` slots.
    ///
    /// `enabled` lists the engine kinds that may be launched; an empty list
    /// means [`EngineKind::default`]. A `capacity` of zero is raised to one.
    pub fn new(
        launcher: Arc<dyn EngineLauncher>,
        capacity: usize,
        enabled: Vec<EngineKind>,
        acquire_timeout: Duration,
    ) -> Self {
        let capacity = capacity.max(1);
        let enabled = if enabled.is_empty() {
            vec![EngineKind::default()]
        } else {
            enabled
        };
        Self {
            inner: Arc::new(PoolInner {
                launcher,
                enabled,
                acquire_timeout,
                permits: Arc::new(Semaphore::new(capacity)),
                slots: Mutex::new(vec![Slot::Free; capacity]),
                engines: tokio::sync::Mutex::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.inner.slots().len()
    }

    /// Whether [`close_all`](Self::close_all) has run.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Acquire a fresh isolated context on an engine of the given kind.
    ///
    /// Waits in FIFO order for a free slot, launching the engine on first use.
    ///
    /// # Errors
    ///
    /// - [`SearchError::PoolUnavailable`] if no slot frees up within the acquire timeout
    /// - [`SearchError::PoolClosed`] if the pool is or becomes closed
    /// - [`SearchError::Browser`] if the engine or session cannot be created
    pub async fn acquire(&self, kind: EngineKind) -> Result<RenderingContext, SearchError> {
        if self.is_closed() {
            return Err(SearchError::PoolClosed);
        }
        let kind = self.inner.resolve_kind(kind);

        let permit = match tokio::time::timeout(
            self.inner.acquire_timeout,
            Arc::clone(&self.inner.permits).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(SearchError::PoolClosed),
            Err(_) => {
                return Err(SearchError::PoolUnavailable(format!(
                    "no rendering slot free within {}ms",
                    self.inner.acquire_timeout.as_millis()
                )))
            }
        };

        let Some(claim) = self.inner.claim_slot(kind) else {
            return Err(SearchError::PoolUnavailable("slot table exhausted".into()));
        };
        let session = self.open_session(kind).await?;
        let slot = claim.keep();

        tracing::debug!(slot, engine = %kind, "rendering context acquired");
        Ok(RenderingContext {
            pool: Arc::clone(&self.inner),
            slot,
            kind,
            session: Some(session),
            permit: Some(permit),
        })
    }

    async fn open_session(&self, kind: EngineKind) -> Result<Box<dyn RenderSession>, SearchError> {
        let engine = self.inner.engine(kind).await?;
        let session = engine.new_session().await?;
        if self.is_closed() {
            let _ = session.close().await;
            return Err(SearchError::PoolClosed);
        }
        Ok(session)
    }

    /// Release a context back to the pool. Equivalent to
    /// [`RenderingContext::release`]; safe to call more than once.
    pub async fn release(&self, context: &mut RenderingContext) {
        context.release().await;
    }

    /// Current occupancy.
    pub async fn stats(&self) -> PoolStats {
        let live_engines = self.inner.engines.lock().await.len();
        let slots = self.inner.slots();
        PoolStats {
            capacity: slots.len(),
            live_contexts: slots.iter().filter(|s| **s != Slot::Free).count(),
            live_engines,
        }
    }

    /// Shut down every engine process and refuse further acquires.
    ///
    /// Pending acquires fail with [`SearchError::PoolClosed`]. Calling this
    /// again is a no-op.
    pub async fn close_all(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("rendering pool already closed");
            return;
        }
        self.inner.permits.close();

        let engines: Vec<(EngineKind, Arc<dyn Engine>)> =
            self.inner.engines.lock().await.drain().collect();
        for (kind, engine) in engines {
            match engine.shutdown().await {
                Ok(()) => tracing::info!(engine = %kind, "rendering engine shut down"),
                Err(err) => {
                    tracing::warn!(engine = %kind, error = %err, "rendering engine shutdown failed")
                }
            }
        }
    }
}

/// An isolated browsing session held exclusively by one task.
pub struct RenderingContext {
    pool: Arc<PoolInner>,
    slot: usize,
    kind: EngineKind,
    session: Option<Box<dyn RenderSession>>,
    permit: Option<OwnedSemaphorePermit>,
}

impl std::fmt::Debug for RenderingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderingContext")
            .field("slot", &self.slot)
            .field("kind", &self.kind)
            .field("released", &self.is_released())
            .finish()
    }
}

impl RenderingContext {
    /// Slot index in the pool's table.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Engine kind backing this context.
    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    /// Whether the context has been released.
    pub fn is_released(&self) -> bool {
        self.session.is_none()
    }

    fn session(&mut self) -> Result<&mut Box<dyn RenderSession>, SearchError> {
        self.session
            .as_mut()
            .ok_or_else(|| SearchError::Browser("rendering context already released".into()))
    }

    /// Navigate to `url` with a load timeout.
    pub async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), SearchError> {
        self.session()?.navigate(url, timeout).await
    }

    /// Scroll down by `pixels`.
    pub async fn scroll_by(&mut self, pixels: u32) -> Result<(), SearchError> {
        self.session()?.scroll_by(pixels).await
    }

    /// Rendered document markup.
    pub async fn html(&mut self) -> Result<String, SearchError> {
        self.session()?.html().await
    }

    /// Close the session and return the slot. Idempotent.
    pub async fn release(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if let Err(err) = session.close().await {
            tracing::debug!(slot = self.slot, error = %err, "session close failed");
        }
        self.pool.free_slot(self.slot);
        self.permit.take();
        tracing::debug!(slot = self.slot, "rendering context released");
    }
}

impl Drop for RenderingContext {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            // A release cancelled mid-close still owns its slot.
            if let Some(permit) = self.permit.take() {
                self.pool.free_slot(self.slot);
                drop(permit);
            }
            return;
        };
        let pool = Arc::clone(&self.pool);
        let slot = self.slot;
        let permit = self.permit.take();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = session.close().await {
                        tracing::debug!(slot, error = %err, "session close on drop failed");
                    }
                    pool.free_slot(slot);
                    drop(permit);
                });
            }
            Err(_) => {
                drop(session);
                pool.free_slot(slot);
                drop(permit);
            }
        }
    }
}
