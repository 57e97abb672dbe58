//! Browser process lifecycle.
//!
//! Every [`BrowserLauncher::launch`] call yields a new, isolated browser with
//! its own throwaway profile. The [`PageSession`] it returns owns that process
//! and must be closed by the caller; dropping it without closing still tears
//! the process down.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::error::ExtractError;

const READY_STATE_POLL: Duration = Duration::from_millis(100);

/// Starts a fresh browser for one extraction.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ExtractError::Browser`] when the process cannot be started.
    async fn launch(&self) -> Result<Box<dyn PageSession>, ExtractError>;
}

/// A single page in a launched browser.
#[async_trait]
pub trait PageSession: Send {
    /// Navigates to `url` and returns once the document is no longer loading.
    /// Callers bound this with their own timeout.
    async fn navigate(&mut self, url: &str) -> Result<(), ExtractError>;

    /// Serialized DOM of the current document.
    async fn content(&mut self) -> Result<String, ExtractError>;

    /// URL of the current document after redirects.
    async fn final_url(&mut self) -> Result<Option<String>, ExtractError>;

    /// Shuts the browser down and removes its profile directory.
    async fn close(self: Box<Self>);
}

/// Launches headless Chromium through the DevTools protocol.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
}

impl ChromiumLauncher {
    /// `executable` overrides Chromium auto-detection.
    #[must_use]
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self { executable }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn PageSession>, ExtractError> {
        let profile_dir = ProfileDir::create()?;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile_dir.path())
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--no-first-run");
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| ExtractError::Browser(format!("invalid browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ExtractError::Browser(format!("failed to launch Chromium: {e}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let session = ChromiumSession {
                    browser,
                    handler_task,
                    page: None,
                    profile_dir: Some(profile_dir),
                };
                Box::new(session).close().await;
                return Err(ExtractError::Browser(format!("failed to open page: {e}")));
            }
        };

        tracing::debug!(profile = %profile_dir.path().display(), "browser launched");

        Ok(Box::new(ChromiumSession {
            browser,
            handler_task,
            page: Some(page),
            profile_dir: Some(profile_dir),
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Option<Page>,
    profile_dir: Option<ProfileDir>,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, ExtractError> {
        self.page
            .as_ref()
            .ok_or_else(|| ExtractError::Browser("page is not open".to_string()))
    }
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), ExtractError> {
        let page = self.page()?;
        page.execute(NavigateParams::new(url))
            .await
            .map_err(|e| ExtractError::Browser(format!("navigation failed: {e}")))?;

        loop {
            let state: String = page
                .evaluate("document.readyState")
                .await
                .map_err(|e| ExtractError::Browser(format!("readyState probe failed: {e}")))?
                .into_value()
                .map_err(|e| ExtractError::Browser(format!("readyState probe failed: {e}")))?;
            if state != "loading" {
                return Ok(());
            }
            tokio::time::sleep(READY_STATE_POLL).await;
        }
    }

    async fn content(&mut self) -> Result<String, ExtractError> {
        self.page()?
            .content()
            .await
            .map_err(|e| ExtractError::Browser(format!("failed to read page content: {e}")))
    }

    async fn final_url(&mut self) -> Result<Option<String>, ExtractError> {
        self.page()?
            .url()
            .await
            .map_err(|e| ExtractError::Browser(format!("failed to read page URL: {e}")))
    }

    async fn close(mut self: Box<Self>) {
        if let Some(page) = self.page.take() {
            let _ = page.close().await;
        }
        if let Err(e) = self.browser.close().await {
            tracing::debug!(error = %e, "browser close command failed");
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        if let Some(dir) = self.profile_dir.take() {
            dir.remove();
        }
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // `Browser`'s own drop kills the child process.
        self.handler_task.abort();
        if let Some(dir) = self.profile_dir.take() {
            dir.remove();
        }
    }
}

/// A per-launch Chromium user-data directory under the system temp dir.
struct ProfileDir(PathBuf);

impl ProfileDir {
    fn create() -> Result<Self, ExtractError> {
        let suffix: u64 = rand::random();
        let path = std::env::temp_dir().join(format!("saledesk-browser-{suffix:016x}"));
        std::fs::create_dir_all(&path).map_err(|e| {
            ExtractError::Browser(format!(
                "failed to create profile directory {}: {e}",
                path.display()
            ))
        })?;
        Ok(Self(path))
    }

    fn path(&self) -> &Path {
        &self.0
    }

    fn remove(self) {
        if let Err(e) = std::fs::remove_dir_all(&self.0) {
            tracing::debug!(path = %self.0.display(), error = %e, "failed to remove profile directory");
        }
    }
}
