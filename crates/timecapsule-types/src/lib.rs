//! Shared model and wire types for the timecapsule services.

pub mod api;
pub mod models;
pub mod stats;
