//! # Firmware Code Generation
//!
//! C-like firmware generation from wiring models.

mod firmware;

pub use firmware::*;
