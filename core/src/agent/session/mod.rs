//! Session orchestration
//!
//! Coordinates cognition + runtime.

pub mod session;
pub mod input;

pub use session::*;
pub use input::*;
