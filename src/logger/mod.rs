//! Tracing setup; the rest of the crate logs through the re-exported macros.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
