//! Windows utility functions

pub mod error_codes;
#[cfg(windows)]
pub mod string_conv;

pub use error_codes::ErrorCode;
#[cfg(windows)]
pub use string_conv::{string_to_wide, wide_to_string};
