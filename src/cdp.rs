//! Chrome DevTools Protocol adapter implementation
//!
//! Drives headless Chrome through the `headless_chrome` crate. One
//! [`CdpBrowser`] owns the process; each [`CdpSession`] wraps an isolated tab
//! and implements the [`Session`] capture contract over it.

use crate::{Error, Result, Session, Viewport, WaitCondition, DEFAULT_TIMEOUT};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::types::Bounds;
use headless_chrome::{Browser, LaunchOptions};
use log::debug;
use serde_json::Value;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

// Consecutive stable samples of the resource-timing count required before the
// network is considered quiet. Strict waits for a longer window.
const QUIET_POLLS_RELAXED: u32 = 3;
const QUIET_POLLS_STRICT: u32 = 5;

/// Launch configuration for the CDP backend
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Run the browser without a visible window
    pub headless: bool,
    /// Initial window size; individual captures override it per request
    pub window_size: Viewport,
    /// Timeout for browser launch and DevTools calls
    pub timeout: Duration,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: Viewport::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A headless Chrome instance acting as a session pool
///
/// Each session created from it is an independent tab with its own
/// navigation state; no locking is required across sessions. Dropping the
/// browser reaps the Chrome process.
pub struct CdpBrowser {
    browser: Browser,
}

impl CdpBrowser {
    /// Launch a browser process.
    pub fn launch(config: &LaunchConfig) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.window_size.width, config.window_size.height)))
            .build()
            .map_err(|e| {
                Error::Initialization(format!("Failed to build launch options: {}", e))
            })?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::Initialization(format!("Failed to launch browser: {}", e)))?;

        Ok(Self { browser })
    }

    /// Open a fresh tab as an isolated capture session.
    pub fn new_session(&self) -> Result<CdpSession> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| Error::Initialization(format!("Failed to create tab: {}", e)))?;

        Ok(CdpSession {
            tab,
            url: String::new(),
            timeout: DEFAULT_TIMEOUT,
        })
    }
}

/// Handle to an element located by [`CdpSession::find_element`]
///
/// Holds the selector rather than a CDP node id; node ids go stale across
/// layout changes, so the element is re-resolved at capture time. The first
/// match wins, which is all the capture contract promises.
pub struct CdpElement {
    selector: String,
}

/// One isolated tab implementing the [`Session`] capture contract
pub struct CdpSession {
    tab: Arc<Tab>,
    url: String,
    timeout: Duration,
}

impl Session for CdpSession {
    type Element = CdpElement;

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.tab
            .set_bounds(Bounds::Normal {
                left: Some(0),
                top: Some(0),
                width: Some(viewport.width as f64),
                height: Some(viewport.height as f64),
            })
            .map_err(|e| {
                Error::Config(format!(
                    "Failed to resize viewport to {}x{}: {}",
                    viewport.width, viewport.height, e
                ))
            })?;
        Ok(())
    }

    fn navigate(&mut self, url: &str, wait: WaitCondition, timeout: Duration) -> Result<()> {
        self.url = url.to_string();
        self.timeout = timeout;
        let deadline = Instant::now() + timeout;

        self.tab.set_default_timeout(timeout);

        self.tab
            .navigate_to(url)
            .map_err(|e| self.navigation_failed(e.to_string()))?;

        self.tab.wait_until_navigated().map_err(|e| {
            if Instant::now() >= deadline {
                self.navigation_timeout()
            } else {
                self.navigation_failed(e.to_string())
            }
        })?;

        self.wait_for(wait, deadline)
    }

    fn find_element(&mut self, selector: &str) -> Result<Option<CdpElement>> {
        match self.tab.find_element(selector) {
            Ok(_) => Ok(Some(CdpElement {
                selector: selector.to_string(),
            })),
            Err(e) => {
                debug!("Selector {selector:?} matched nothing: {e}");
                Ok(None)
            }
        }
    }

    fn capture_element(&mut self, element: &CdpElement) -> Result<Vec<u8>> {
        let found = self
            .tab
            .find_element(&element.selector)
            .map_err(|e| self.capture_failed(e.to_string()))?;

        found
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png)
            .map_err(|e| self.capture_failed(e.to_string()))
    }

    fn capture_viewport(&mut self, full_page: bool) -> Result<Vec<u8>> {
        let clip = if full_page {
            let width = self
                .eval_number(
                    "Math.max(document.documentElement.scrollWidth, \
                     document.body ? document.body.scrollWidth : 0)",
                )
                .map_err(|reason| self.capture_failed(reason))?;
            let height = self
                .eval_number(
                    "Math.max(document.documentElement.scrollHeight, \
                     document.body ? document.body.scrollHeight : 0)",
                )
                .map_err(|reason| self.capture_failed(reason))?;

            Some(Page::Viewport {
                x: 0.0,
                y: 0.0,
                width,
                height,
                scale: 1.0,
            })
        } else {
            None
        };

        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, clip, true)
            .map_err(|e| self.capture_failed(e.to_string()))
    }
}

impl CdpSession {
    /// Suspend until the wait condition holds or the deadline passes.
    fn wait_for(&self, wait: WaitCondition, deadline: Instant) -> Result<()> {
        match wait {
            WaitCondition::DomContentLoaded => {
                self.wait_ready_state(&["interactive", "complete"], deadline)
            }
            WaitCondition::Load => self.wait_ready_state(&["complete"], deadline),
            WaitCondition::NetworkIdleRelaxed => {
                self.wait_ready_state(&["complete"], deadline)?;
                self.wait_network_quiet(QUIET_POLLS_RELAXED, deadline)
            }
            WaitCondition::NetworkIdleStrict => {
                self.wait_ready_state(&["complete"], deadline)?;
                self.wait_network_quiet(QUIET_POLLS_STRICT, deadline)
            }
        }
    }

    fn wait_ready_state(&self, accepted: &[&str], deadline: Instant) -> Result<()> {
        loop {
            let state = self
                .eval_string("document.readyState")
                .map_err(|reason| self.navigation_failed(reason))?;
            if accepted.contains(&state.as_str()) {
                return Ok(());
            }
            self.check_deadline(deadline)?;
            thread::sleep(POLL_INTERVAL);
        }
    }

    // The resource-timing entry count stops growing once in-flight requests
    // have drained; a run of stable samples approximates the network-idle
    // lifecycle events.
    fn wait_network_quiet(&self, quiet_polls: u32, deadline: Instant) -> Result<()> {
        let expr = "performance.getEntriesByType('resource').length";
        let mut last = self
            .eval_number(expr)
            .map_err(|reason| self.navigation_failed(reason))? as u64;
        let mut stable = 0;

        while stable < quiet_polls {
            self.check_deadline(deadline)?;
            thread::sleep(POLL_INTERVAL);

            let count = self
                .eval_number(expr)
                .map_err(|reason| self.navigation_failed(reason))? as u64;
            if count == last {
                stable += 1;
            } else {
                debug!("{}: network still active ({last} -> {count} resources)", self.url);
                stable = 0;
                last = count;
            }
        }
        Ok(())
    }

    fn check_deadline(&self, deadline: Instant) -> Result<()> {
        if Instant::now() >= deadline {
            Err(self.navigation_timeout())
        } else {
            Ok(())
        }
    }

    fn eval_json(&self, expr: &str) -> std::result::Result<Value, String> {
        let object = self.tab.evaluate(expr, false).map_err(|e| e.to_string())?;
        object
            .value
            .ok_or_else(|| format!("`{expr}` returned no value"))
    }

    fn eval_string(&self, expr: &str) -> std::result::Result<String, String> {
        self.eval_json(expr)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| format!("`{expr}` did not evaluate to a string"))
    }

    fn eval_number(&self, expr: &str) -> std::result::Result<f64, String> {
        self.eval_json(expr)?
            .as_f64()
            .ok_or_else(|| format!("`{expr}` did not evaluate to a number"))
    }

    fn navigation_failed(&self, reason: String) -> Error {
        Error::NavigationFailed {
            url: self.url.clone(),
            reason,
        }
    }

    fn navigation_timeout(&self) -> Error {
        Error::NavigationTimeout {
            url: self.url.clone(),
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }

    fn capture_failed(&self, reason: String) -> Error {
        Error::Capture {
            url: self.url.clone(),
            reason,
        }
    }
}
