// src/lib.rs

//! Arrival board normalization and fire-once arrival alerts.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;
