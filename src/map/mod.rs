//! Map presentation for the radar overlay.
//!
//! This module provides the presentation adapter the binary hands to the radar
//! client. It keeps the overlay's layer stack and reports changes through the log.

pub mod console;

pub use console::ConsoleMap;
