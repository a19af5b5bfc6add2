//! Error types for capture and comparison

use thiserror::Error;

/// Result type alias for capture and comparison operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing or comparing screenshots
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to launch or attach to the browser
    #[error("Browser initialization failed: {0}")]
    Initialization(String),

    /// Navigation did not satisfy its wait condition in time
    #[error("Navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    /// The page load itself failed (network, DNS, security errors)
    #[error("Navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },

    /// The target element selector matched nothing on the page
    #[error("Selector {selector:?} did not match anything at {url}")]
    SelectorNotFound { url: String, selector: String },

    /// Screenshotting the page or element failed after navigation
    #[error("Screenshot capture failed for {url}: {reason}")]
    Capture { url: String, reason: String },

    /// A screenshot buffer could not be decoded into a pixel grid
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// The diff raster could not be encoded back to PNG
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
