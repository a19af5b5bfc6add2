//! Pagediff
//!
//! Captures rendered-page screenshots from two URLs under identical,
//! controlled conditions and produces a pixel-accurate visual difference
//! report, for visual-regression testing between two versions of a page.
//!
//! # Features
//!
//! - **CDP Backend** (default): drives headless Chrome over the DevTools
//!   Protocol to produce the screenshots
//! - **Backend-agnostic core**: capture logic runs against the [`Session`]
//!   trait, so it stays testable without a browser
//! - **Deterministic diffing**: fixed inputs always produce the same variant,
//!   pixel count, and diff image bytes
//!
//! # Example
//!
//! ```no_run
//! use pagediff::cdp::{CdpBrowser, LaunchConfig};
//! use pagediff::{CaptureRequest, Comparison, Viewport};
//!
//! # fn main() -> pagediff::Result<()> {
//! let browser = CdpBrowser::launch(&LaunchConfig::default())?;
//! let mut session = browser.new_session()?;
//!
//! let request = CaptureRequest {
//!     url: "https://example.com".to_string(),
//!     viewport: Some(Viewport { width: 1280, height: 720 }),
//!     ..Default::default()
//! };
//! let shot = pagediff::capture(&mut session, &request)?;
//!
//! match pagediff::compare(&shot, &shot)? {
//!     Comparison::Identical => println!("no visual change"),
//!     Comparison::DimensionMismatch => println!("screenshot dimensions differ"),
//!     Comparison::Different { pixels, .. } => println!("{pixels} pixels changed"),
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

pub mod error;
pub use error::{Error, Result};

pub mod compare;
pub use compare::{compare, Comparison};

// CDP-backed session implementation (feature-gated)
#[cfg(feature = "cdp")]
pub mod cdp;

// Async-friendly browser facade (worker-thread backed)
#[cfg(feature = "cdp")]
pub mod async_api;

// Re-export the Browser facade at the crate root for ergonomic use
#[cfg(feature = "cdp")]
pub use async_api::Browser;

/// Timeout applied to navigation when a request does not carry its own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Viewport dimensions a page is rendered into before capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Navigation-completion signal a capture waits for before screenshotting
///
/// The network-idle variants are quiescence heuristics: `NetworkIdleStrict`
/// demands a longer quiet period than `NetworkIdleRelaxed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// The DOM has been parsed; subresources may still be loading
    DomContentLoaded,
    /// The window `load` event has fired
    Load,
    /// Loading finished and the network has been quiet for a long window
    NetworkIdleStrict,
    /// Loading finished and the network has been quiet for a short window
    NetworkIdleRelaxed,
}

impl Default for WaitCondition {
    fn default() -> Self {
        WaitCondition::Load
    }
}

/// Configuration for a single screenshot capture
///
/// Constructed per comparison run and consumed once by [`capture`]. Both
/// sides of a comparison should use the same request (apart from `url`) so
/// the resulting rasters are comparable.
#[derive(Debug, Clone, Default)]
pub struct CaptureRequest {
    /// Page to capture
    pub url: String,
    /// Viewport applied to the session before navigation, when set
    pub viewport: Option<Viewport>,
    /// Capture the full scrollable page height instead of the viewport
    pub full_page: bool,
    /// Wait condition for navigation; [`WaitCondition::Load`] when unset
    pub wait: Option<WaitCondition>,
    /// When set, capture only the first element matching this selector.
    /// Takes precedence over `full_page`.
    pub target_selector: Option<String>,
    /// Per-capture navigation timeout; [`DEFAULT_TIMEOUT`] when unset
    pub timeout: Option<Duration>,
}

/// A live renderable-page session the capture component drives
///
/// The session is externally owned: [`capture`] mutates its viewport and
/// navigation state but never closes or disposes it. The default
/// implementation is [`cdp::CdpSession`]; tests substitute a fake.
pub trait Session {
    /// Backend-specific handle to a located element
    type Element;

    /// Resize the rendering surface before navigation
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Navigate to `url`, suspending until `wait` is satisfied or `timeout`
    /// elapses
    fn navigate(&mut self, url: &str, wait: WaitCondition, timeout: Duration) -> Result<()>;

    /// Locate the first element matching `selector`, if any
    fn find_element(&mut self, selector: &str) -> Result<Option<Self::Element>>;

    /// Screenshot one element's rendered bounds as encoded PNG bytes
    fn capture_element(&mut self, element: &Self::Element) -> Result<Vec<u8>>;

    /// Screenshot the viewport, or the full scrollable page when `full_page`
    /// is true, as encoded PNG bytes
    fn capture_viewport(&mut self, full_page: bool) -> Result<Vec<u8>>;
}

/// Capture a single screenshot of `request.url` from an open page session.
///
/// The viewport is applied before navigation when the request specifies one,
/// so both sides of a comparison render at identical dimensions. When
/// `target_selector` is set, element capture takes precedence over
/// `full_page`; zero matches fail with [`Error::SelectorNotFound`]. Capture
/// errors propagate unmodified; retrying is the caller's decision.
pub fn capture<S: Session>(session: &mut S, request: &CaptureRequest) -> Result<Vec<u8>> {
    if let Some(viewport) = request.viewport {
        session.set_viewport(viewport)?;
    }

    let wait = request.wait.unwrap_or_default();
    let timeout = request.timeout.unwrap_or(DEFAULT_TIMEOUT);
    session.navigate(&request.url, wait, timeout)?;

    if let Some(selector) = request.target_selector.as_deref() {
        let element =
            session
                .find_element(selector)?
                .ok_or_else(|| Error::SelectorNotFound {
                    url: request.url.clone(),
                    selector: selector.to_string(),
                })?;
        return session.capture_element(&element);
    }

    session.capture_viewport(request.full_page)
}
