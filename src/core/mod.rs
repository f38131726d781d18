//! Core module - intent routing.
//!
//! The heart of Octavia's turn processing: extracting the intent envelope
//! from raw model output and dispatching it to the matching side effect.

pub mod router;

pub use router::{extract_envelope, Router};
