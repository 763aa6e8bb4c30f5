//! Command handlers.

pub mod classify;
pub mod config;
pub mod enhance;
pub mod models;
