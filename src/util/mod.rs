//! Utility functions for common operations.
//!
//! - **URL validation**: scheme and host checks for feed and webhook URLs
//! - **Text processing**: sanitizing and truncating feed-supplied text before
//!   it is forwarded to the webhook
//!
//! # Examples
//!
//! ```
//! use feedwatch::util::{validate_url, truncate_to_width};
//!
//! let url = validate_url("https://example.com/feed.xml", false).unwrap();
//! assert_eq!(url.host_str(), Some("example.com"));
//!
//! assert_eq!(truncate_to_width("Long article title", 10), "Long ar...");
//! ```

mod text;
mod url_validator;

pub use text::{strip_control_chars, truncate_to_width};
pub use url_validator::{validate_url, UrlValidationError};
