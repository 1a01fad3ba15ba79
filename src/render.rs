use anyhow::{anyhow, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::harvester::{random_user_agent, CandidateLink};

/// Loads one URL and returns the rendered document.
///
/// Implementations are blocking; the pool runs them on the blocking thread
/// pool.
pub trait PageRenderer: Send + Sync {
    fn render(&self, url: &str, timeout: Duration) -> Result<String>;
}

/// Starts a browser for one batch of renders. The returned renderer owns the
/// browser process; dropping the last handle shuts it down.
pub trait BrowserLauncher: Send + Sync {
    fn launch(&self) -> Result<Arc<dyn PageRenderer>>;
}

#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    chrome_path: Option<PathBuf>,
    idle_timeout: Duration,
}

impl ChromeLauncher {
    /// `idle_timeout` must outlast the slowest render in a batch or Chrome's
    /// connection is dropped mid-request.
    pub fn new(chrome_path: Option<PathBuf>, idle_timeout: Duration) -> Self {
        Self {
            chrome_path,
            idle_timeout,
        }
    }
}

impl ChromeLauncher {
    fn start(&self) -> Result<ChromeSession> {
        let ua_arg = format!("--user-agent={}", random_user_agent());
        let args = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-infobars"),
            OsStr::new(&ua_arg),
        ];

        let browser = Browser::new(LaunchOptions {
            headless: true,
            window_size: Some((1920, 1080)),
            path: self.chrome_path.clone(),
            idle_browser_timeout: self.idle_timeout,
            args,
            ..Default::default()
        })?;
        tracing::info!("browser launched");

        Ok(ChromeSession { browser })
    }
}

impl BrowserLauncher for ChromeLauncher {
    fn launch(&self) -> Result<Arc<dyn PageRenderer>> {
        Ok(Arc::new(self.start()?))
    }
}

/// A running Chrome process. Each render gets its own tab.
pub struct ChromeSession {
    browser: Browser,
}

impl PageRenderer for ChromeSession {
    fn render(&self, url: &str, timeout: Duration) -> Result<String> {
        let started = Instant::now();
        let tab = TabGuard(self.browser.new_tab()?);
        tab.set_default_timeout(timeout);

        tab.navigate_to(url)?;
        wait_for_dom(&tab, url, started + timeout, timeout)?;

        let html = tab.get_content()?;
        tracing::debug!(url, bytes = html.len(), elapsed_ms = started.elapsed().as_millis() as u64, "page rendered");
        Ok(html)
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        tracing::info!("closing browser");
    }
}

/// Closes the tab on every exit path of a render.
struct TabGuard(Arc<Tab>);

impl Deref for TabGuard {
    type Target = Tab;

    fn deref(&self) -> &Tab {
        &self.0
    }
}

impl Drop for TabGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.close(false) {
            tracing::debug!("failed to close tab: {}", e);
        }
    }
}

const DOM_READY_PROBE: &str =
    "location.href !== 'about:blank' && document.readyState !== 'loading' && !!document.body";

/// Waits for DOMContentLoaded on the navigated document rather than for the
/// network to go idle.
fn wait_for_dom(tab: &Tab, url: &str, deadline: Instant, timeout: Duration) -> Result<()> {
    loop {
        match tab.evaluate(DOM_READY_PROBE, false) {
            Ok(result) if result.value == Some(serde_json::Value::Bool(true)) => return Ok(()),
            Ok(_) => {}
            // the execution context is torn down while the new document commits
            Err(e) => tracing::trace!(url, "dom probe failed: {}", e),
        }
        if Instant::now() >= deadline {
            return Err(anyhow!(
                "Navigation timeout of {} ms exceeded",
                timeout.as_millis()
            ));
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

/// Result of rendering one candidate link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered { url: String, html: String },
    Failed { url: String, message: String },
}

impl RenderOutcome {
    pub fn url(&self) -> &str {
        match self {
            RenderOutcome::Rendered { url, .. } | RenderOutcome::Failed { url, .. } => url,
        }
    }
}

/// Renders candidate links against one shared browser session.
#[derive(Clone)]
pub struct RenderPool {
    renderer: Arc<dyn PageRenderer>,
    timeout: Duration,
}

impl RenderPool {
    pub fn new(renderer: Arc<dyn PageRenderer>, timeout: Duration) -> Self {
        Self { renderer, timeout }
    }

    /// Never fails: errors, panics and timeouts all become
    /// `RenderOutcome::Failed` for this link only.
    pub async fn render(&self, link: &CandidateLink) -> RenderOutcome {
        let url = link.as_str().to_string();
        let timeout = self.timeout;
        let renderer = Arc::clone(&self.renderer);

        let task = tokio::task::spawn_blocking({
            let url = url.clone();
            move || renderer.render(&url, timeout)
        });

        let message = match tokio::time::timeout(timeout, task).await {
            Ok(Ok(Ok(html))) => return RenderOutcome::Rendered { url, html },
            Ok(Ok(Err(e))) => format!("{:#}", e),
            Ok(Err(join_err)) => format!("render task aborted: {}", join_err),
            Err(_) => format!("Navigation timeout of {} ms exceeded", timeout.as_millis()),
        };

        tracing::warn!(url = %url, "render failed: {}", message);
        RenderOutcome::Failed { url, message }
    }
}
