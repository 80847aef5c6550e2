use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CrBrowser, BrowserConfig as CrBrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use futures::StreamExt;

use crate::config::{BrowserBuilder, BrowserConfig};
use crate::error::{Error, Result};
use crate::page::Page;
use crate::session::{Session, SessionLauncher};

/// Chrome flags that improve performance without affecting functionality.
const PERF_ARGS: &[&str] = &[
    "disable-gpu",
    "disable-extensions",
    "metrics-recording-only",
    "mute-audio",
    "no-default-browser-check",
    "no-first-run",
    "disable-client-side-phishing-detection",
    "disable-prompt-on-repost",
];

/// The main entry point for controlling a browser instance.
pub struct AgenticBrowser {
    browser: CrBrowser,
    default_timeout: std::time::Duration,
    handler_task: tokio::task::JoinHandle<()>,
}

impl AgenticBrowser {
    /// Create a new BrowserBuilder for configuring and launching a browser.
    pub fn builder() -> BrowserBuilder {
        BrowserBuilder::new()
    }

    /// Launch a browser instance with the given configuration.
    pub async fn launch(config: BrowserConfig) -> Result<Self> {
        let mut builder = CrBrowserConfig::builder();

        if config.headless {
            builder = builder.new_headless_mode().no_sandbox();
        } else {
            builder = builder.with_head().no_sandbox();
        }

        // chromiumoxide adds the `--` prefix itself
        for arg in PERF_ARGS {
            builder = builder.arg(*arg);
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder = builder.viewport(Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: false,
            has_touch: false,
        });

        let cr_config = builder
            .build()
            .map_err(|e| Error::LaunchError(e.to_string()))?;

        let (browser, mut handler) = CrBrowser::launch(cr_config)
            .await
            .map_err(|e| Error::LaunchError(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        tracing::debug!(headless = config.headless, "browser launched");

        Ok(Self {
            browser,
            default_timeout: config.default_timeout,
            handler_task,
        })
    }

    /// Open a new page (tab) navigated to the given URL.
    pub async fn new_page(&self, url: &str) -> Result<Page> {
        let cr_page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?;

        Ok(Page::new(cr_page, self.default_timeout))
    }

    /// Close the browser process and stop the CDP handler task.
    pub async fn close(mut self) -> Result<()> {
        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            tracing::warn!("waiting for browser process failed: {e}");
        }
        self.handler_task.abort();
        closed.map(|_| ()).map_err(Error::CdpError)
    }
}

/// One live browser plus the single page every scenario drives.
pub struct BrowserSession {
    browser: AgenticBrowser,
    page: Page,
}

impl BrowserSession {
    pub fn page(&self) -> &Page {
        &self.page
    }
}

#[async_trait]
impl Session for BrowserSession {
    async fn close(self) -> Result<()> {
        self.browser.close().await
    }
}

/// Launches a Chrome-backed [`BrowserSession`] opened on the storefront.
pub struct ChromeLauncher {
    headless: bool,
    chrome_path: Option<String>,
    start_url: String,
}

impl ChromeLauncher {
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            headless: true,
            chrome_path: None,
            start_url: start_url.into(),
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<String>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    fn browser_builder(&self) -> BrowserBuilder {
        let builder = AgenticBrowser::builder().headless(self.headless);
        match &self.chrome_path {
            Some(path) => builder.chrome_path(path.as_str()),
            None => builder,
        }
    }
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    type Session = BrowserSession;

    async fn launch(&self) -> Result<BrowserSession> {
        let browser = self.browser_builder().build().await?;
        let page = match browser.new_page(&self.start_url).await {
            Ok(page) => page,
            Err(e) => {
                // do not leak the process when the first page fails
                if let Err(close_err) = browser.close().await {
                    tracing::warn!("closing browser after failed page open: {close_err}");
                }
                return Err(e);
            }
        };
        Ok(BrowserSession { browser, page })
    }
}
