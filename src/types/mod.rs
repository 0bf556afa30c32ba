//! Core types used across the Apple Pay kit.

mod applepay;
mod generic;
mod version;

pub use applepay::*;
pub use generic::*;
pub use version::*;
