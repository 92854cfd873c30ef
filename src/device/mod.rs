//! Device under test representation.
//!
//! This module provides the vocabulary shared by every stage of the tracer:
//! the three physical [`Terminal`]s, the [`TerminalRole`] each one is
//! eventually assigned, the device family and subtype, the canonical
//! [`TerminalBias`] levels, and the aggregate [`ClassificationResult`].

mod result;
mod types;

pub use result::ClassificationResult;
pub use types::*;
