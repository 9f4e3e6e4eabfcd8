//! Request handlers.

pub mod health;
pub mod pairings;

pub use health::*;
pub use pairings::*;
