//! Utility functions for check implementations.

pub mod text;

#[doc(inline)]
pub use text::{is_blank, length_expanded_tabs, split_lines};
