//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Per-section component generation prompt
pub const SECTION: &str = include_str!("../../prompts/section.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "section" => Some(SECTION),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
