//! Utility functions for common operations.
//!
//! - **URL validation**: the catalog endpoint must be HTTPS (loopback excepted)
//! - **Text processing**: Unicode-aware width calculation and truncation for
//!   printing CJK plant names in aligned columns

mod text;
mod url_validator;

pub use text::{display_width, pad_to_width, strip_control_chars, truncate_to_width};
pub use url_validator::{validate_catalog_url, UrlValidationError};
