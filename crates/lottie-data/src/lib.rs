//! Serde schema of the bodymovin document, as decoded from JSON.
//!
//! Nothing here interprets the data; `lottie-core` turns these structures
//! into a typed composition.

pub mod model;
