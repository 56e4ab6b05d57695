//! Chromium-family rendering engines driven over the DevTools protocol.
//!
//! Each [`EngineKind`] resolves to its own browser executable. A launched
//! engine keeps one browser process with a private profile directory;
//! every session is an incognito browser context holding a single page,
//! so cookies and storage never cross between fetches.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{BrowserContextId, CloseParams};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use super::{Engine, EngineKind, EngineLauncher, RenderSession};
use crate::error::SearchError;
use crate::http;

/// Hides the most common automation fingerprints before any page script runs.
const STEALTH_SCRIPT: &str = r#"
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
    Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
    Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
    window.chrome = { runtime: {} };
"#;

/// Launch arguments shared by every engine kind.
const LAUNCH_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-blink-features=AutomationControlled",
    "--disable-extensions",
    "--disable-default-apps",
    "--disable-background-networking",
    "--disable-sync",
    "--no-first-run",
    "--lang=en-US",
];

/// Locate the executable for an engine kind.
///
/// Checks, in order: the kind's environment override, well-known binary
/// names on `PATH`, then platform install locations.
pub fn find_executable(kind: EngineKind) -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(env_override(kind)).map(PathBuf::from) {
        if path.exists() {
            return Some(path);
        }
    }

    for name in binary_names(kind) {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    standard_paths(kind).into_iter().find(|p| p.exists())
}

fn env_override(kind: EngineKind) -> &'static str {
    match kind {
        EngineKind::Chromium => "WEBSIFT_CHROMIUM",
        EngineKind::Chrome => "WEBSIFT_CHROME",
        EngineKind::Edge => "WEBSIFT_EDGE",
    }
}

fn binary_names(kind: EngineKind) -> &'static [&'static str] {
    match kind {
        EngineKind::Chromium => &["chromium", "chromium-browser"],
        EngineKind::Chrome => &["google-chrome", "google-chrome-stable", "chrome"],
        EngineKind::Edge => &["microsoft-edge", "microsoft-edge-stable", "msedge"],
    }
}

fn standard_paths(kind: EngineKind) -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    let paths: &[&str] = match kind {
        EngineKind::Chromium => &["/Applications/Chromium.app/Contents/MacOS/Chromium"],
        EngineKind::Chrome => &["/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"],
        EngineKind::Edge => &["/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"],
    };

    #[cfg(target_os = "linux")]
    let paths: &[&str] = match kind {
        EngineKind::Chromium => &[
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ],
        EngineKind::Chrome => &["/usr/bin/google-chrome", "/opt/google/chrome/chrome"],
        EngineKind::Edge => &["/usr/bin/microsoft-edge", "/opt/microsoft/msedge/msedge"],
    };

    #[cfg(target_os = "windows")]
    let paths: &[&str] = match kind {
        EngineKind::Chromium => &["C:\\Program Files\\Chromium\\Application\\chrome.exe"],
        EngineKind::Chrome => &["C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe"],
        EngineKind::Edge => {
            &["C:\\Program Files (x86)\\Microsoft\\Edge\\Application\\msedge.exe"]
        }
    };

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    let paths: &[&str] = {
        let _ = kind;
        &[]
    };

    paths.iter().map(PathBuf::from).collect()
}

/// Launches headless Chromium-family browsers.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    user_agent: String,
}

impl ChromiumLauncher {
    /// Create a launcher presenting `user_agent` (or a rotated default).
    pub fn new(user_agent: Option<String>) -> Self {
        Self {
            user_agent: user_agent.unwrap_or_else(|| http::random_user_agent().to_owned()),
        }
    }
}

#[async_trait]
impl EngineLauncher for ChromiumLauncher {
    async fn launch(&self, kind: EngineKind) -> Result<Box<dyn Engine>, SearchError> {
        let executable = find_executable(kind).ok_or_else(|| {
            SearchError::Browser(format!("{kind} executable not found on this system"))
        })?;

        // A private profile directory per process avoids SingletonLock clashes.
        let profile = tempfile::Builder::new()
            .prefix("websift-profile-")
            .tempdir()
            .map_err(|e| SearchError::Browser(format!("failed to create profile dir: {e}")))?;

        let config = BrowserConfig::builder()
            .chrome_executable(&executable)
            .user_data_dir(profile.path())
            .window_size(1366, 768)
            .args(LAUNCH_ARGS.iter().copied())
            .arg(format!("--user-agent={}", self.user_agent))
            .build()
            .map_err(|e| SearchError::Browser(format!("invalid {kind} config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SearchError::Browser(format!("{kind} launch failed: {e}")))?;

        // The handler drives the CDP connection and must be polled for the
        // browser's lifetime. Unrecognised CDP messages are not fatal.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    let text = err.to_string();
                    if text.contains("connection closed") || text.contains("websocket") {
                        tracing::debug!(error = %text, "CDP connection ended");
                        break;
                    }
                }
            }
        });

        tracing::info!(engine = %kind, path = %executable.display(), "browser launched");
        Ok(Box::new(ChromiumEngine {
            kind,
            browser: Arc::new(browser),
            handler_task,
            _profile: profile,
        }))
    }
}

struct ChromiumEngine {
    kind: EngineKind,
    browser: Arc<Browser>,
    handler_task: JoinHandle<()>,
    _profile: tempfile::TempDir,
}

#[async_trait]
impl Engine for ChromiumEngine {
    async fn new_session(&self) -> Result<Box<dyn RenderSession>, SearchError> {
        let context_id = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| SearchError::Browser(format!("create browser context: {e}")))?
            .result
            .browser_context_id;

        let mut target = CreateTargetParams::new("about:blank");
        target.browser_context_id = Some(context_id.clone());

        let page = match self.browser.new_page(target).await {
            Ok(page) => page,
            Err(e) => {
                dispose_context(&self.browser, context_id).await;
                return Err(SearchError::Browser(format!("open page: {e}")));
            }
        };

        if let Err(e) = page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await
        {
            tracing::debug!(engine = %self.kind, error = %e, "stealth script injection failed");
        }

        Ok(Box::new(ChromiumSession {
            browser: Arc::clone(&self.browser),
            page: Some(page),
            context_id,
        }))
    }

    async fn shutdown(&self) -> Result<(), SearchError> {
        let result = self
            .browser
            .execute(CloseParams::default())
            .await
            .map(|_| ())
            .map_err(|e| SearchError::Browser(format!("{} close failed: {e}", self.kind)));
        self.handler_task.abort();
        result
    }
}

async fn dispose_context(browser: &Browser, context_id: BrowserContextId) {
    if let Err(e) = browser
        .execute(DisposeBrowserContextParams::new(context_id))
        .await
    {
        tracing::debug!(error = %e, "dispose browser context failed");
    }
}

struct ChromiumSession {
    browser: Arc<Browser>,
    page: Option<Page>,
    context_id: BrowserContextId,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, SearchError> {
        self.page
            .as_ref()
            .ok_or_else(|| SearchError::Browser("page already closed".into()))
    }
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), SearchError> {
        let page = self.page()?;
        match tokio::time::timeout(timeout, page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(SearchError::Browser(format!("navigation failed: {e}"))),
            Err(_) => Err(SearchError::Timeout(format!(
                "navigation exceeded {}ms",
                timeout.as_millis()
            ))),
        }
    }

    async fn scroll_by(&mut self, pixels: u32) -> Result<(), SearchError> {
        self.page()?
            .evaluate(format!("window.scrollBy(0, {pixels})"))
            .await
            .map(|_| ())
            .map_err(|e| SearchError::Browser(format!("scroll failed: {e}")))
    }

    async fn html(&mut self) -> Result<String, SearchError> {
        self.page()?
            .content()
            .await
            .map_err(|e| SearchError::Browser(format!("read content failed: {e}")))
    }

    async fn close(mut self: Box<Self>) -> Result<(), SearchError> {
        let closed = match self.page.take() {
            Some(page) => page
                .close()
                .await
                .map_err(|e| SearchError::Browser(format!("close page failed: {e}"))),
            None => Ok(()),
        };
        dispose_context(&self.browser, self.context_id.clone()).await;
        closed
    }
}
