//! Headless rendering engines and the bounded context pool.
//!
//! The pool ([`RenderPool`]) is the only shared mutable resource in the
//! crate. Engines are abstracted behind [`EngineLauncher`], [`Engine`] and
//! [`RenderSession`] so the pool logic does not depend on a particular
//! browser driver; [`chromium::ChromiumLauncher`] is the production
//! implementation.

pub mod chromium;
pub mod pool;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::SearchError;

pub use pool::{PoolStats, RenderPool, RenderingContext};

/// Chromium-family browsers that can serve as rendering engines.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum EngineKind {
    /// Open-source Chromium.
    #[default]
    Chromium,
    /// Google Chrome.
    Chrome,
    /// Microsoft Edge.
    Edge,
}

impl EngineKind {
    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Chromium => "Chromium",
            Self::Chrome => "Chrome",
            Self::Edge => "Edge",
        }
    }

    /// All engine kinds.
    pub fn all() -> &'static [EngineKind] {
        &[Self::Chromium, Self::Chrome, Self::Edge]
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Starts engine processes.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    /// Launch one engine process of the given kind.
    async fn launch(&self, kind: EngineKind) -> Result<Box<dyn Engine>, SearchError>;
}

/// One live engine process.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Create a fresh, isolated browsing session (own cookies and storage).
    async fn new_session(&self) -> Result<Box<dyn RenderSession>, SearchError>;

    /// Terminate the engine process.
    async fn shutdown(&self) -> Result<(), SearchError>;
}

/// One isolated browsing session.
#[async_trait]
pub trait RenderSession: Send {
    /// Navigate to `url`, failing if the load exceeds `timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), SearchError>;

    /// Scroll the viewport down by `pixels`.
    async fn scroll_by(&mut self, pixels: u32) -> Result<(), SearchError>;

    /// Current rendered document markup.
    async fn html(&mut self) -> Result<String, SearchError>;

    /// Destroy the session and everything it stored.
    async fn close(self: Box<Self>) -> Result<(), SearchError>;
}

/// Scroll steps performed after a page loads.
const SCROLL_STEPS: usize = 2;

/// Load `url` in a fresh context, scroll a little with human-like pauses,
/// and return the rendered markup.
///
/// The context is released on every exit path; if this future is dropped
/// mid-flight the context's drop guard returns the slot.
///
/// # Errors
///
/// Propagates pool acquisition, navigation, and content errors.
pub async fn render_page(
    pool: &RenderPool,
    kind: EngineKind,
    url: &str,
    timeout: Duration,
    pause_ms: (u64, u64),
) -> Result<String, SearchError> {
    let mut context = pool.acquire(kind).await?;
    let result = drive(&mut context, url, timeout, pause_ms).await;
    context.release().await;
    result
}

async fn drive(
    context: &mut RenderingContext,
    url: &str,
    timeout: Duration,
    pause_ms: (u64, u64),
) -> Result<String, SearchError> {
    context.navigate(url, timeout).await?;
    for _ in 0..SCROLL_STEPS {
        let (pause, pixels) = {
            let mut rng = rand::thread_rng();
            let pause = rng.gen_range(pause_ms.0..=pause_ms.1.max(pause_ms.0));
            let pixels = rng.gen_range(300..=900);
            (pause, pixels)
        };
        tokio::time::sleep(Duration::from_millis(pause)).await;
        // Scrolling is cosmetic; a page that refuses it can still be read.
        if let Err(e) = context.scroll_by(pixels).await {
            tracing::debug!(url, error = %e, "scroll failed");
            break;
        }
    }
    context.html().await
}
