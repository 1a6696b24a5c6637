//! Shared library for the dailycut generation service
//!
//! Provides error types, configuration resolution, day/week time
//! arithmetic, share-token minting, and the event bus used for
//! progress broadcasting.

pub mod config;
pub mod error;
pub mod events;
pub mod time;
pub mod token;

pub use error::{Error, Result};
