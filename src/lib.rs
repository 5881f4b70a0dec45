//! Preference synchronization for a movie/TV discovery client.
//!
//! Keeps a user's favorites consistent between a device-local cache and
//! the authoritative remote store, toggles comment reactions with
//! optimistic updates, and runs every remote call through a retry wrapper
//! that waits out a cold-starting backend without retrying rejected
//! credentials.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;

pub use error::{AppError, AppResult};
