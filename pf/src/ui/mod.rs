//! UI boundary
//!
//! Message types exchanged with a front end, the [`Session`] that answers
//! them, and a JSON-lines [`bridge`] for driving a session over stdio.

pub mod bridge;
mod messages;
mod session;

pub use messages::{GenerationStatus, UiEvent, UiRequest};
pub use session::{ClientFactory, Session};
